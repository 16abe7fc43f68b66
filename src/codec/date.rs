//! ISO date codec

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// Current instant in UTC
pub fn generate_iso_date() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a strict RFC3339 timestamp. The offset is normalized to UTC.
pub fn convert_string_to_iso_date(input: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Format(format!("invalid RFC3339 date {:?}: {}", input, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_zulu() {
        let dt = convert_string_to_iso_date("2024-05-11T11:11:11Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 11, 11, 11, 11).unwrap());
    }

    #[test]
    fn test_parse_offset_normalizes() {
        let dt = convert_string_to_iso_date("2024-05-11T13:11:11+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 11, 11, 11, 11).unwrap());
    }

    #[test]
    fn test_rejects_deviations() {
        for input in [
            "not-a-date",
            "2024-05-11T11:11:11",
            "2024-05-11",
            "2024-13-11T11:11:11Z",
            "2024-02-30T11:11:11Z",
            "2024/05/11T11:11:11Z",
        ] {
            assert!(
                matches!(convert_string_to_iso_date(input), Err(Error::Format(_))),
                "{} should fail",
                input
            );
        }
    }

    #[test]
    fn test_generate_is_recent() {
        let before = Utc::now();
        let now = generate_iso_date();
        assert!(now >= before);
    }
}
