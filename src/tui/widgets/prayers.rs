use chrono::NaiveTime;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

use crate::models::{PrayerTimings, PrayerType};
use crate::tui::theme;
use crate::utils::format::format_time;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    timings: Option<&PrayerTimings>,
    next: Option<PrayerType>,
    reminders: &[PrayerType],
    now: NaiveTime,
) {
    let block = theme::panel("Prayers", false);

    let items: Vec<ListItem> = PrayerType::ALL
        .iter()
        .map(|&prayer| {
            let time = timings.map(|t| t.time_of(prayer));
            let time_str = time.map(format_time).unwrap_or_else(|| "--:--".to_string());

            let (icon, status_style, status_label) = if next == Some(prayer) {
                ("◆", theme::accent(), "next")
            } else if time.is_some_and(|t| t <= now) {
                ("●", theme::muted(), "passed")
            } else {
                ("○", theme::muted(), "upcoming")
            };

            let name_style = if next == Some(prayer) {
                theme::highlight()
            } else {
                theme::label()
            };

            let bell = if reminders.contains(&prayer) {
                Span::styled("  ⏰", theme::live())
            } else {
                Span::raw("")
            };

            let line = Line::from(vec![
                Span::styled(format!("  {:<8}", prayer.display_name()), name_style),
                Span::styled(format!("{:<7}", time_str), theme::muted()),
                Span::styled(icon, status_style),
                Span::styled(format!("  {:<8}", status_label), theme::muted()),
                bell,
            ]);

            ListItem::new(line)
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}
