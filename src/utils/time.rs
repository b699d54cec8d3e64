use chrono::{Days, NaiveDateTime, NaiveTime};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("expected HH:MM, got '{0}'")]
    Format(String),
    #[error("time out of range: '{0}'")]
    Range(String),
}

/// Parse a zero-padded 24-hour "HH:MM" string.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime, TimeParseError> {
    let bytes = s.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[3..].iter().all(u8::is_ascii_digit);
    if !well_formed {
        return Err(TimeParseError::Format(s.to_string()));
    }

    let hour: u32 = s[..2].parse().map_err(|_| TimeParseError::Format(s.to_string()))?;
    let minute: u32 = s[3..].parse().map_err(|_| TimeParseError::Format(s.to_string()))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| TimeParseError::Range(s.to_string()))
}

/// Today's wall-clock instant (relative to `now`) at `time`, seconds zeroed.
pub fn on_same_day(now: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    now.date().and_time(time)
}

/// The next occurrence of `time` strictly after `now`: today if still ahead,
/// otherwise the same wall-clock time tomorrow.
pub fn next_occurrence(now: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    let today = on_same_day(now, time);
    if today > now {
        return today;
    }
    // Only fails at the end of chrono's representable range.
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}

/// serde adapter that stores a `NaiveTime` as "HH:MM".
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parses_zero_padded_times() {
        assert_eq!(parse_hhmm("05:00").unwrap(), NaiveTime::from_hms_opt(5, 0, 0).unwrap());
        assert_eq!(parse_hhmm("23:59").unwrap(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert_eq!(parse_hhmm("00:00").unwrap(), NaiveTime::MIN);
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["5:00", "05:0", "0500", "05-00", "", "ab:cd", "05:00 (EET)"] {
            assert!(matches!(parse_hhmm(bad), Err(TimeParseError::Format(_))), "{bad}");
        }
        assert!(matches!(parse_hhmm("24:00"), Err(TimeParseError::Range(_))));
        assert!(matches!(parse_hhmm("12:60"), Err(TimeParseError::Range(_))));
    }

    #[test]
    fn next_occurrence_rolls_over_month_and_year() {
        let fajr = NaiveTime::from_hms_opt(5, 0, 0).unwrap();
        assert_eq!(next_occurrence(at(2024, 1, 31, 20, 0), fajr), at(2024, 2, 1, 5, 0));
        assert_eq!(next_occurrence(at(2024, 12, 31, 20, 0), fajr), at(2025, 1, 1, 5, 0));
        assert_eq!(next_occurrence(at(2024, 2, 28, 6, 0), fajr), at(2024, 2, 29, 5, 0));
    }

    #[test]
    fn equal_instant_counts_as_passed() {
        let t = NaiveTime::from_hms_opt(12, 30, 0).unwrap();
        assert_eq!(next_occurrence(at(2024, 6, 1, 12, 30), t), at(2024, 6, 2, 12, 30));
        assert_eq!(next_occurrence(at(2024, 6, 1, 12, 29), t), at(2024, 6, 1, 12, 30));
    }
}
