//! Serde helpers for the dates and timestamps sent to clients.
//!
//! Dates are ISO 8601 calendar dates, e.g. "2025-03-14", and timestamps are
//! RFC 3339 date-times in UTC, e.g. "2025-03-14T09:26:53Z".

use time::{Date, macros::format_description};

use crate::Error;

/// Parse an ISO 8601 calendar date such as "2025-03-14".
///
/// # Errors
///
/// Returns an [Error::Validation] if `raw` is not a valid date.
pub fn parse_date(raw: &str) -> Result<Date, Error> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::Validation(format!("\"{raw}\" is not a valid date, use YYYY-MM-DD")))
}

/// Serialize a [time::Date] as "YYYY-MM-DD".
pub mod date_format {
    use serde::Serializer;
    use time::Date;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(date)
    }
}

/// Serialize a [time::OffsetDateTime] as an RFC 3339 string.
pub mod timestamp_format {
    use serde::Serializer;
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    pub fn serialize<S>(timestamp: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = timestamp
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use time::{
        Date, OffsetDateTime,
        macros::{date, datetime},
    };

    use crate::{
        Error,
        time_format::{date_format, parse_date, timestamp_format},
    };

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(parse_date("2025-03-14"), Ok(date!(2025 - 03 - 14)));
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert!(matches!(parse_date("14/03/2025"), Err(Error::Validation(_))));
    }

    #[test]
    fn serializes_dates_and_timestamps_as_strings() {
        #[derive(Serialize)]
        struct Wrapper {
            #[serde(serialize_with = "date_format::serialize")]
            date: Date,
            #[serde(serialize_with = "timestamp_format::serialize")]
            at: OffsetDateTime,
        }

        let json = serde_json::to_string(&Wrapper {
            date: date!(2025 - 03 - 04),
            at: datetime!(2025-03-04 09:26:53 UTC),
        })
        .unwrap();

        assert_eq!(json, r#"{"date":"2025-03-04","at":"2025-03-04T09:26:53Z"}"#);
    }
}
