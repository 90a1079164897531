//! Timestamp normalization.
//!
//! Task dates travel as text (bulk load documents, the persisted state record,
//! imports). Every date-bearing field is rebuilt into a `DateTime<Utc>` through
//! this module when read back, and written as RFC 3339 with millisecond
//! precision.
//!
//! Accepted inputs:
//! - RFC 3339 (`2024-01-15T10:00:00.000Z`, `2024-01-15T10:00:00+02:00`)
//! - naive date-time, read as UTC (`2024-01-15T10:00:00`, `2024-01-15 10:00`)
//! - date only, midnight UTC (`2024-01-15`)
//! - integer epoch milliseconds
//!
//! Parsed values are truncated to milliseconds and must fall in years
//! 0000-9999, the range the RFC 3339 output can express, so every accepted
//! timestamp reads back unchanged after being written.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

use crate::error::{Error, Result};

const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMAT: &str = "%Y-%m-%d";
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// Parse a textual timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Timestamp {
            value: raw.to_string(),
            reason: "empty timestamp".to_string(),
        });
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return normalize(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return normalize(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return normalize(midnight.and_utc());
        }
    }

    Err(Error::Timestamp {
        value: raw.to_string(),
        reason: "expected RFC 3339, YYYY-MM-DD[THH:MM[:SS]], or epoch milliseconds".to_string(),
    })
}

/// Build a timestamp from epoch milliseconds.
pub fn from_epoch_millis(millis: i64) -> Result<DateTime<Utc>> {
    let value = DateTime::from_timestamp_millis(millis).ok_or_else(|| Error::Timestamp {
        value: millis.to_string(),
        reason: "epoch milliseconds out of range".to_string(),
    })?;
    normalize(value)
}

/// Truncate to milliseconds and reject years outside 0000-9999.
pub fn normalize(value: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&value.year()) {
        return Err(Error::Timestamp {
            value: value.to_rfc3339_opts(SecondsFormat::Millis, true),
            reason: format!("year must be between {MIN_YEAR:04} and {MAX_YEAR}"),
        });
    }
    Ok(value.trunc_subsecs(3))
}

/// Render a timestamp the way it is persisted.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(value))
}

pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(TimestampVisitor)
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = DateTime<Utc>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an ISO-8601 timestamp string or epoch milliseconds")
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        parse_timestamp(value).map_err(E::custom)
    }

    fn visit_i64<E>(self, value: i64) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        from_epoch_millis(value).map_err(E::custom)
    }

    fn visit_u64<E>(self, value: u64) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        let millis = i64::try_from(value).map_err(E::custom)?;
        self.visit_i64(millis)
    }

    fn visit_f64<E>(self, value: f64) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        if !value.is_finite() {
            return Err(E::custom("epoch milliseconds must be finite"));
        }
        self.visit_i64(value.trunc() as i64)
    }
}

/// `Option<DateTime<Utc>>` variant, `null` when absent.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    struct Wrapped(#[serde(with = "crate::timestamp")] DateTime<Utc>);

    pub fn serialize<S>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => super::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(value)| value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_with_millis_and_offset() {
        let utc = parse_timestamp("2024-01-15T10:00:00.250Z").unwrap();
        assert_eq!(utc.timestamp_millis() % 1000, 250);

        let offset = parse_timestamp("2024-01-15T12:00:00+02:00").unwrap();
        assert_eq!(offset, Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
    }

    #[test]
    fn parses_naive_and_date_only_as_utc() {
        assert_eq!(
            parse_timestamp("2024-01-15T10:30:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("2024-01-15 10:30").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp(" 2024-01-15 ").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_timestamp("next tuesday").unwrap_err();
        assert!(matches!(err, Error::Timestamp { .. }));
        assert!(parse_timestamp("   ").is_err());
    }

    #[test]
    fn rejects_years_the_output_cannot_express() {
        // 10000-01-01T00:00:00Z
        assert!(matches!(
            from_epoch_millis(253_402_300_800_000),
            Err(Error::Timestamp { .. })
        ));
        assert!(from_epoch_millis(253_402_300_799_999).is_ok());
        assert!(from_epoch_millis(-62_167_219_200_001).is_err());
        assert!(parse_timestamp("+10000-01-01T00:00:00.000Z").is_err());
        assert!(parse_timestamp("9999-12-31T23:00:00-02:00").is_err());
    }

    #[test]
    fn sub_millisecond_input_is_truncated() {
        let parsed = parse_timestamp("2024-01-15T10:00:00.123456789Z").unwrap();
        assert_eq!(format_timestamp(&parsed), "2024-01-15T10:00:00.123Z");
        assert_eq!(parse_timestamp(&format_timestamp(&parsed)).unwrap(), parsed);
    }

    #[test]
    fn formats_with_millisecond_precision() {
        let value = Utc.with_ymd_and_hms(2024, 3, 1, 8, 5, 0).unwrap();
        assert_eq!(format_timestamp(&value), "2024-03-01T08:05:00.000Z");
    }

    #[test]
    fn deserializes_numbers_as_epoch_millis() {
        #[derive(serde::Deserialize)]
        struct Holder {
            #[serde(with = "crate::timestamp")]
            at: DateTime<Utc>,
            #[serde(with = "crate::timestamp::option", default)]
            maybe: Option<DateTime<Utc>>,
        }

        let holder: Holder =
            serde_json::from_str(r#"{"at": 1705312800000, "maybe": null}"#).unwrap();
        assert_eq!(holder.at, Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
        assert!(holder.maybe.is_none());

        let holder: Holder =
            serde_json::from_str(r#"{"at": "2024-01-15", "maybe": "2024-01-16"}"#).unwrap();
        assert_eq!(
            holder.maybe,
            Some(Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap())
        );
    }
}
