use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::models::PrayerTimings;
use crate::utils::time::TimeParseError;

#[derive(Debug, Clone, PartialEq)]
pub struct TimingsRequest {
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub method: u8,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("bad time in response: {0}")]
    Time(#[from] TimeParseError),
}

/// Anything that can answer "what are the five prayer times on this date here".
pub trait PrayerTimeProvider {
    fn fetch(&self, request: &TimingsRequest) -> Result<PrayerTimings, FetchError>;
}

// ─── Aladhan API ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse {
    data: ApiData,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    timings: ApiTimings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiTimings {
    fajr: String,
    dhuhr: String,
    asr: String,
    maghrib: String,
    isha: String,
}

/// Some methods annotate times, e.g. "05:12 (EET)".
fn strip_annotation(raw: &str) -> &str {
    raw.split_whitespace().next().unwrap_or("")
}

impl ApiTimings {
    fn into_timings(self) -> Result<PrayerTimings, TimeParseError> {
        PrayerTimings::parse(
            strip_annotation(&self.fajr),
            strip_annotation(&self.dhuhr),
            strip_annotation(&self.asr),
            strip_annotation(&self.maghrib),
            strip_annotation(&self.isha),
        )
    }
}

pub fn parse_response(body: &str) -> Result<PrayerTimings, FetchError> {
    let response: ApiResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    Ok(response.data.timings.into_timings()?)
}

pub struct AladhanClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl AladhanClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("miqat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, request: &TimingsRequest) -> String {
        format!(
            "{}/timings/{}",
            self.base_url,
            request.date.format("%d-%m-%Y")
        )
    }
}

impl PrayerTimeProvider for AladhanClient {
    fn fetch(&self, request: &TimingsRequest) -> Result<PrayerTimings, FetchError> {
        log::debug!("fetching prayer times for {} from {}", request.date, self.base_url);
        let body = self
            .client
            .get(self.url(request))
            .query(&[
                ("latitude", request.latitude.to_string()),
                ("longitude", request.longitude.to_string()),
                ("method", request.method.to_string()),
            ])
            .send()?
            .error_for_status()?
            .text()?;
        parse_response(&body)
    }
}

/// Aladhan method id for a calculation-method name.
pub fn method_id(name: &str) -> Option<u8> {
    let id = match name {
        "Jafari" => 0,
        "Karachi" => 1,
        "NorthAmerica" => 2,
        "MuslimWorldLeague" => 3,
        "UmmAlQura" => 4,
        "Egyptian" => 5,
        "Tehran" => 7,
        "Gulf" => 8,
        "Kuwait" => 9,
        "Qatar" => 10,
        "Singapore" => 11,
        "France" => 12,
        "Turkey" => 13,
        "Russia" => 14,
        "MoonsightingCommittee" => 15,
        "Dubai" => 16,
        _ => return None,
    };
    Some(id)
}

pub const CALC_METHODS: &[&str] = &[
    "MuslimWorldLeague",
    "Egyptian",
    "Karachi",
    "UmmAlQura",
    "Dubai",
    "MoonsightingCommittee",
    "NorthAmerica",
    "Kuwait",
    "Qatar",
    "Singapore",
    "Tehran",
    "Turkey",
    "Gulf",
    "France",
    "Russia",
    "Jafari",
];
