//! Timestamp utilities
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text so that lexical
//! ordering in SQL matches chronological ordering.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp '{}': {}", s, e)))
}

/// Parse an optional stored timestamp
pub fn parse_optional_timestamp(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_timestamp).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2021, 12, 31, 23, 59, 59).unwrap();

        assert_eq!(format_timestamp(&a), "2021-01-01T00:00:00.000000Z");
        assert_eq!(format_timestamp(&a).len(), format_timestamp(&b).len());
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }

    #[test]
    fn test_parse_accepts_offsets() {
        let parsed = parse_timestamp("2021-03-04T12:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2021, 3, 4, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_timestamp("yesterday"), Err(Error::Internal(_))));
        assert_eq!(parse_optional_timestamp(None).unwrap(), None);
    }
}
