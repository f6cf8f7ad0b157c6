//! Timestamp formats.
//!
//! Storage keeps microseconds so the post-insert re-read can match on the
//! exact value written; documents use second precision.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{ErrorCode, VellumError, VellumResult};

/// Format a timestamp for a storage column.
pub fn format_storage_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp read from a storage column.
pub fn parse_storage_timestamp(raw: &str) -> VellumResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            VellumError::parse(
                format!("invalid timestamp {:?}: {}", raw, e),
                ErrorCode::ParseInvalidTimestamp,
            )
        })
}

/// Format a timestamp for a rendered document (`2024-01-01T12:00:00Z`).
pub fn format_document_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_storage_format_preserves_micros() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()
            + chrono::Duration::microseconds(1234);
        let raw = format_storage_timestamp(&ts);
        assert_eq!(raw, "2024-03-01T08:30:00.001234Z");
        assert_eq!(parse_storage_timestamp(&raw).unwrap(), ts);
    }

    #[test]
    fn test_document_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 5).unwrap();
        assert_eq!(format_document_timestamp(&ts), "2024-03-01T08:30:05Z");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_storage_timestamp("yesterday").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseInvalidTimestamp);
    }
}
