use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::utils::time::{hhmm, parse_hhmm, TimeParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrayerType {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerType {
    /// Canonical daily order.
    pub const ALL: [PrayerType; 5] = [
        PrayerType::Fajr,
        PrayerType::Dhuhr,
        PrayerType::Asr,
        PrayerType::Maghrib,
        PrayerType::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerType::Fajr => "fajr",
            PrayerType::Dhuhr => "dhuhr",
            PrayerType::Asr => "asr",
            PrayerType::Maghrib => "maghrib",
            PrayerType::Isha => "isha",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerType::Fajr => "Fajr",
            PrayerType::Dhuhr => "Dhuhr",
            PrayerType::Asr => "Asr",
            PrayerType::Maghrib => "Maghrib",
            PrayerType::Isha => "Isha",
        }
    }
}

impl std::fmt::Display for PrayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for PrayerType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fajr" => Ok(PrayerType::Fajr),
            "dhuhr" | "zuhr" | "dhuhur" => Ok(PrayerType::Dhuhr),
            "asr" => Ok(PrayerType::Asr),
            "maghrib" => Ok(PrayerType::Maghrib),
            "isha" => Ok(PrayerType::Isha),
            _ => Err(anyhow::anyhow!("Unknown prayer type: {}", s)),
        }
    }
}

/// The five daily prayer times for one date and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrayerTimings {
    #[serde(with = "hhmm")]
    pub fajr: NaiveTime,
    #[serde(with = "hhmm")]
    pub dhuhr: NaiveTime,
    #[serde(with = "hhmm")]
    pub asr: NaiveTime,
    #[serde(with = "hhmm")]
    pub maghrib: NaiveTime,
    #[serde(with = "hhmm")]
    pub isha: NaiveTime,
}

impl PrayerTimings {
    pub fn parse(
        fajr: &str,
        dhuhr: &str,
        asr: &str,
        maghrib: &str,
        isha: &str,
    ) -> Result<Self, TimeParseError> {
        Ok(Self {
            fajr: parse_hhmm(fajr)?,
            dhuhr: parse_hhmm(dhuhr)?,
            asr: parse_hhmm(asr)?,
            maghrib: parse_hhmm(maghrib)?,
            isha: parse_hhmm(isha)?,
        })
    }

    pub fn time_of(&self, prayer: PrayerType) -> NaiveTime {
        match prayer {
            PrayerType::Fajr => self.fajr,
            PrayerType::Dhuhr => self.dhuhr,
            PrayerType::Asr => self.asr,
            PrayerType::Maghrib => self.maghrib,
            PrayerType::Isha => self.isha,
        }
    }

    /// (prayer, time) pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (PrayerType, NaiveTime)> + '_ {
        PrayerType::ALL.into_iter().map(|p| (p, self.time_of(p)))
    }
}

/// Time left until the next prayer. Hours are not folded into days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RemainingTime {
    pub hours: u64,
    pub minutes: u32,
    pub seconds: u32,
}

impl RemainingTime {
    pub fn from_secs(total: u64) -> Self {
        Self {
            hours: total / 3600,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
        }
    }

    pub fn total_secs(&self) -> u64 {
        self.hours * 3600 + self.minutes as u64 * 60 + self.seconds as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prayer_aliases_parse() {
        assert_eq!("ZUHR".parse::<PrayerType>().unwrap(), PrayerType::Dhuhr);
        assert_eq!("dhuhur".parse::<PrayerType>().unwrap(), PrayerType::Dhuhr);
        assert!("sunrise".parse::<PrayerType>().is_err());
    }

    #[test]
    fn timings_serialize_with_api_keys() {
        let t = PrayerTimings::parse("05:00", "12:30", "15:45", "18:20", "19:50").unwrap();
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["Fajr"], "05:00");
        assert_eq!(json["Isha"], "19:50");

        let back: PrayerTimings = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn timings_reject_bad_values() {
        assert!(PrayerTimings::parse("05:00", "12:30", "25:00", "18:20", "19:50").is_err());
        let missing = serde_json::json!({"Fajr": "05:00", "Dhuhr": "12:30"});
        assert!(serde_json::from_value::<PrayerTimings>(missing).is_err());
    }

    #[test]
    fn remaining_time_decomposes_seconds() {
        let r = RemainingTime::from_secs(2 * 3600 + 45 * 60 + 7);
        assert_eq!((r.hours, r.minutes, r.seconds), (2, 45, 7));
        assert_eq!(r.total_secs(), 9907);
        assert_eq!(RemainingTime::from_secs(30 * 3600).hours, 30);
    }
}
