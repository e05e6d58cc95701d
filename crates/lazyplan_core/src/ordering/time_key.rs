//! Recency comparison over heterogeneous timestamp representations.
//!
//! # Responsibility
//! - Normalize native date-times, local `YYYY-MM-DD HH:MM` strings, ISO-8601
//!   strings and DB timestamps (`+HH` offsets, fractional seconds) into one
//!   lexicographically sortable key.
//! - Order values newest first.
//!
//! # Invariants
//! - Comparison is pure and total: unparsable text falls back to the trimmed
//!   literal as its key and never errors.
//! - Keys are fixed width (`YYYY-MM-DD HH:MM:SS.ffffff`), so string order
//!   equals chronological order for every parsed value.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const SORT_KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Zone-less layouts, tried in order after the zoned forms.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// `2024-01-01 09:00:00.123456+00` and `... +05:30` style DB timestamps.
static DB_TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})[ T](\d{2}:\d{2}:\d{2}(?:\.\d+)?)\s*([+-]\d{2})(?::?(\d{2}))?$")
        .expect("valid db timestamp regex")
});

/// A timestamp in any of the shapes the engine receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    /// Zoned date-time produced locally or parsed upstream.
    Native(DateTime<FixedOffset>),
    /// Wall-clock date-time without a zone.
    Naive(NaiveDateTime),
    /// Raw text as delivered by the remote store.
    Text(String),
}

impl<Tz: TimeZone> From<DateTime<Tz>> for TimeValue {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Native(value.fixed_offset())
    }
}

impl From<NaiveDateTime> for TimeValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Naive(value)
    }
}

impl From<&str> for TimeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TimeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Orders timestamps by descending recency in one wall-clock offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeComparator {
    offset: FixedOffset,
}

impl Default for TimeComparator {
    fn default() -> Self {
        Self::utc()
    }
}

impl TimeComparator {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Normalizes into the system's current local offset.
    pub fn local() -> Self {
        Self {
            offset: *Local::now().offset(),
        }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Returns the sortable key for one value.
    pub fn sort_key(&self, value: &TimeValue) -> String {
        match value {
            TimeValue::Native(date_time) => self.render(self.to_wall_clock(date_time)),
            TimeValue::Naive(naive) => self.render(*naive),
            TimeValue::Text(raw) => self.sort_key_str(raw),
        }
    }

    /// Returns the sortable key for raw text, or the trimmed text itself when
    /// no supported layout matches.
    pub fn sort_key_str(&self, raw: &str) -> String {
        match self.parse_text(raw) {
            Some(naive) => self.render(naive),
            None => raw.trim().to_string(),
        }
    }

    /// Negative (`Less`) when `a` is more recent than `b`.
    pub fn compare(&self, a: &TimeValue, b: &TimeValue) -> Ordering {
        self.sort_key(b).cmp(&self.sort_key(a))
    }

    fn parse_text(&self, raw: &str) -> Option<NaiveDateTime> {
        let trimmed = raw.trim();
        if let Ok(zoned) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(self.to_wall_clock(&zoned));
        }
        if let Some(caps) = DB_TIMESTAMP_RE.captures(trimmed) {
            let minutes = caps.get(4).map_or("00", |m| m.as_str());
            let rfc3339 = format!("{}T{}{}:{}", &caps[1], &caps[2], &caps[3], minutes);
            if let Ok(zoned) = DateTime::parse_from_rfc3339(&rfc3339) {
                return Some(self.to_wall_clock(&zoned));
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Some(naive);
            }
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }

    fn to_wall_clock(&self, value: &DateTime<FixedOffset>) -> NaiveDateTime {
        value.with_timezone(&self.offset).naive_local()
    }

    fn render(&self, naive: NaiveDateTime) -> String {
        naive.format(SORT_KEY_FORMAT).to_string()
    }
}

/// UTC shorthand for [`TimeComparator::compare`].
pub fn compare_recency(a: &TimeValue, b: &TimeValue) -> Ordering {
    TimeComparator::utc().compare(a, b)
}
