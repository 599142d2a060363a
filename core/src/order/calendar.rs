//! Lenient ISO 8601 parsing for the structured schedule.
//!
//! Models answer with whichever ISO 8601 form comes to mind, so a UTC marker,
//! an offset or a bare date all decode. Offsets are dropped and the wall-clock
//! value is kept, since deliveries happen in the customer's local time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{de, Deserialize, Deserializer};

/// `2024-07-04T16:00:00`, `2024-07-04T16:00:00Z`, `2024-07-04T16:00:00+04:00`
/// or `2024-07-04` (midnight).
pub(crate) fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    raw.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| {
            raw.parse::<NaiveDate>()
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// `16:00`, `16:00:00`, `16:00:00.5`, each optionally followed by `Z` or an offset.
pub(crate) fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    raw.parse::<NaiveTime>()
        .ok()
        .or_else(|| strip_offset(raw).and_then(|t| t.parse::<NaiveTime>().ok()))
}

fn strip_offset(raw: &str) -> Option<&str> {
    if let Some(time) = raw.strip_suffix(['Z', 'z']) {
        return Some(time);
    }
    let sign = raw.rfind(['+', '-'])?;
    let (time, offset) = raw.split_at(sign);
    let digits: String = offset[1..].chars().filter(|c| *c != ':').collect();
    let valid = matches!(digits.len(), 2 | 4) && digits.chars().all(|c| c.is_ascii_digit());
    valid.then_some(time)
}

pub(crate) fn deserialize_date_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date_time(&raw).ok_or_else(|| {
        de::Error::custom(format!("invalid date-time {raw:?}, expected ISO 8601"))
    })
}

pub(crate) fn deserialize_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid time {raw:?}, expected ISO 8601")))
}
