use chrono::NaiveTime;

use crate::models::RemainingTime;

/// Format a duration in seconds to "Xh Ym" or "Ym" string
pub fn format_duration_secs(secs: u64) -> String {
    if secs == 0 {
        return "now".to_string();
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", secs)
    }
}

/// Format a countdown as "HH:MM:SS"
pub fn format_remaining(r: &RemainingTime) -> String {
    format!("{:02}:{:02}:{:02}", r.hours, r.minutes, r.seconds)
}

/// Format a NaiveTime to "HH:MM"
pub fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}
