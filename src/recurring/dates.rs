//! Calendar-day helpers shared by the generator, the classifier and the stores.
//!
//! Every date in this crate is a `NaiveDate`: a local calendar day with no
//! time-of-day and no offset. Stored strings are read by looking only at their
//! first ten characters, so `2024-03-01T23:30:00-05:00` is March 1st regardless
//! of the offset that follows.

use chrono::{Datelike, NaiveDate};

use crate::errors::DateParseError;

const ISO_DATE_LEN: usize = 10;

/// Parses the leading `YYYY-MM-DD` of `raw` into a calendar date.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = raw.trim();
    let head = trimmed
        .get(..ISO_DATE_LEN)
        .ok_or_else(|| DateParseError::Malformed(raw.to_string()))?;
    let bytes = head.as_bytes();
    let shape_ok = bytes.iter().enumerate().all(|(idx, byte)| match idx {
        4 | 7 => *byte == b'-',
        _ => byte.is_ascii_digit(),
    });
    if !shape_ok {
        return Err(DateParseError::Malformed(raw.to_string()));
    }

    let field = |range: std::ops::Range<usize>| -> Result<u32, DateParseError> {
        head[range]
            .parse::<u32>()
            .map_err(|_| DateParseError::Malformed(raw.to_string()))
    };
    let year = field(0..4)? as i32;
    let month = field(5..7)?;
    let day = field(8..10)?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DateParseError::OutOfRange(head.to_string()))
}

/// Formats a date as `YYYY-MM-DD`.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a date as `YYYYMMDD`, the suffix used by instance ids.
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Number of days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// Shifts `date` by whole calendar months, clamping the day to the end of
/// shorter months (Jan 31 + 1 month is Feb 28/29, never early March).
pub fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let index = date.year().checked_mul(12)? + date.month0() as i32;
    let shifted = index.checked_add(months)?;
    let year = shifted.div_euclid(12);
    let month = shifted.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Shifts `date` by whole calendar years; Feb 29 clamps to Feb 28 in common years.
pub fn add_years(date: NaiveDate, years: i32) -> Option<NaiveDate> {
    let year = date.year().checked_add(years)?;
    let day = date.day().min(days_in_month(year, date.month()));
    NaiveDate::from_ymd_opt(year, date.month(), day)
}

/// Whole calendar months from the month of `from` to the month of `to`.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let from_idx = from.year() as i64 * 12 + from.month0() as i64;
    let to_idx = to.year() as i64 * 12 + to.month0() as i64;
    to_idx - from_idx
}

/// Serde adapter storing a `NaiveDate` as `YYYY-MM-DD`.
pub mod serde_iso {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::iso_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_iso_date(&raw).map_err(D::Error::custom)
    }
}

/// Serde adapter for optional dates. `null`, a missing field and an empty
/// string all read as `None`.
pub mod serde_iso_opt {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&super::iso_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => super::parse_iso_date(&raw)
                .map(Some)
                .map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}
