use crate::core::{CrudError, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Layout of timestamps rendered by [`now_as_str`], e.g. `2024-03-01T10:15:30.123456789Z`.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC time with nanosecond precision.
pub fn now_as_str() -> String {
    now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Interprets `local` as wall-clock time at `offset` and returns the UTC equivalent.
pub fn convert_to_utc(local: NaiveDateTime, offset: FixedOffset) -> Option<NaiveDateTime> {
    offset
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.naive_utc())
}

/// Parses `value` with `input_format` and renders it with `output_format`.
pub fn reformat(value: &str, input_format: &str, output_format: &str) -> Result<String> {
    NaiveDateTime::parse_from_str(value, input_format)
        .map(|dt| dt.format(output_format).to_string())
        .map_err(|err| {
            CrudError::Precondition(format!(
                "cannot parse '{value}' as '{input_format}': {err}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn now_as_str_uses_default_format() {
        let rendered = now_as_str();
        assert!(rendered.ends_with('Z'), "{rendered}");
        assert!(NaiveDateTime::parse_from_str(&rendered, DEFAULT_TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn epoch_millis_round_trip() {
        let dt = from_epoch_millis(1_700_000_000_123).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_123);
        assert!(from_epoch_millis(i64::MAX).is_none());
    }

    #[test]
    fn offset_is_removed_when_converting_to_utc() {
        let local = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();

        let utc = convert_to_utc(local, offset).unwrap();
        assert_eq!(utc.format("%H:%M").to_string(), "08:00");
    }

    #[test]
    fn reformat_reports_bad_input() {
        assert_eq!(
            reformat("2024-02-03 04:05:06", "%Y-%m-%d %H:%M:%S", "%d/%m/%Y").unwrap(),
            "03/02/2024"
        );
        assert!(matches!(
            reformat("yesterday", "%Y-%m-%d %H:%M:%S", "%d/%m/%Y"),
            Err(CrudError::Precondition(_))
        ));
    }
}
