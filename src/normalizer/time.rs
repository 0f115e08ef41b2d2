//! Timestamp coercion. Every entry point yields `None` for absent or
//! unreadable input; callers never get a substitute date from here.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Epoch values at or above this magnitude are read as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;
/// Digit strings shorter than this are never epochs (`20240115` is a date).
const MIN_EPOCH_DIGITS: usize = 9;

/// Values that can be read as a point in time.
pub trait IntoTimestamp {
    fn to_timestamp(&self) -> Option<DateTime<Utc>>;
}

pub fn parse_timestamp<T: IntoTimestamp + ?Sized>(value: &T) -> Option<DateTime<Utc>> {
    value.to_timestamp()
}

impl IntoTimestamp for i64 {
    fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        let value = *self;
        if value.abs() >= MILLIS_THRESHOLD {
            Utc.timestamp_millis_opt(value).single()
        } else {
            Utc.timestamp_opt(value, 0).single()
        }
    }
}

impl IntoTimestamp for u64 {
    fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        i64::try_from(*self).ok().and_then(|v| v.to_timestamp())
    }
}

impl IntoTimestamp for f64 {
    fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        if !self.is_finite() {
            return None;
        }
        if self.abs() >= MILLIS_THRESHOLD as f64 {
            Utc.timestamp_millis_opt(self.round() as i64).single()
        } else {
            let secs = self.trunc() as i64;
            let nanos = ((self - self.trunc()).abs() * 1e9).round() as u32;
            Utc.timestamp_opt(secs, nanos.min(999_999_999)).single()
        }
    }
}

impl IntoTimestamp for str {
    fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_date_str(self)
    }
}

impl IntoTimestamp for String {
    fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_date_str(self)
    }
}

impl IntoTimestamp for DateTime<Utc> {
    fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

impl IntoTimestamp for DateTime<FixedOffset> {
    fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.with_timezone(&Utc))
    }
}

impl IntoTimestamp for serde_json::Value {
    fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(|v| v.to_timestamp())
                .or_else(|| n.as_f64().and_then(|v| v.to_timestamp())),
            serde_json::Value::String(s) => parse_date_str(s),
            _ => None,
        }
    }
}

impl<T: IntoTimestamp> IntoTimestamp for Option<T> {
    fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        self.as_ref().and_then(|v| v.to_timestamp())
    }
}

/// ISO-8601 / RFC 3339, RFC 2822, plain dates, and numeric epoch strings.
pub fn parse_date_str(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        if digits.len() >= MIN_EPOCH_DIGITS {
            return s.parse::<i64>().ok().and_then(|epoch| epoch.to_timestamp());
        }
        return NaiveDate::parse_from_str(s, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // RFC 2822 with a textual zone chrono rejects, e.g. "EST" or "UT".
    if let Some(dt) = parse_rfc2822_named_zone(s) {
        return Some(dt);
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S %z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_rfc2822_named_zone(s: &str) -> Option<DateTime<Utc>> {
    let (head, zone) = s.rsplit_once(' ')?;
    let offset_hours = match zone.to_ascii_uppercase().as_str() {
        "UT" | "UTC" | "GMT" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => return None,
    };
    let offset = FixedOffset::east_opt(offset_hours * 3600)?;
    let head = head.split_once(", ").map(|(_, rest)| rest).unwrap_or(head);
    ["%d %b %Y %H:%M:%S", "%d %b %Y %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(head, fmt).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_epoch_seconds_and_millis_agree() {
        let secs = instant().timestamp();
        let millis = instant().timestamp_millis();
        assert_eq!(parse_timestamp(&secs), Some(instant()));
        assert_eq!(parse_timestamp(&millis), Some(instant()));
        assert_eq!(parse_timestamp(&(secs as f64)), Some(instant()));
    }

    #[test]
    fn test_iso_and_rfc2822_strings() {
        assert_eq!(parse_timestamp("2024-01-15T12:30:45Z"), Some(instant()));
        assert_eq!(parse_timestamp("2024-01-15T14:30:45+02:00"), Some(instant()));
        assert_eq!(parse_timestamp("2024-01-15T12:30:45.000Z"), Some(instant()));
        assert_eq!(parse_timestamp("Mon, 15 Jan 2024 12:30:45 +0000"), Some(instant()));
        assert_eq!(parse_timestamp("Mon, 15 Jan 2024 12:30:45 GMT"), Some(instant()));
        assert_eq!(parse_timestamp("Mon, 15 Jan 2024 07:30:45 EST"), Some(instant()));
    }

    #[test]
    fn test_typed_values_pass_through() {
        assert_eq!(parse_timestamp(&instant()), Some(instant()));
        let fixed = instant().with_timezone(&FixedOffset::east_opt(3600).unwrap());
        assert_eq!(parse_timestamp(&fixed), Some(instant()));
    }

    #[test]
    fn test_json_values() {
        assert_eq!(parse_timestamp(&json!(instant().timestamp())), Some(instant()));
        assert_eq!(parse_timestamp(&json!("2024-01-15T12:30:45Z")), Some(instant()));
        assert_eq!(parse_timestamp(&json!(null)), None);
        assert_eq!(parse_timestamp(&json!({"a": 1})), None);
    }

    #[test]
    fn test_numeric_strings_are_epochs() {
        let secs = instant().timestamp().to_string();
        assert_eq!(parse_timestamp(secs.as_str()), Some(instant()));
    }

    #[test]
    fn test_unparseable_yields_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
        assert_eq!(parse_timestamp(&f64::NAN), None);
        assert_eq!(parse_timestamp(&None::<i64>), None);
    }

    #[test]
    fn test_short_digit_strings_are_not_epochs() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("20240115"), Some(expected));
        assert_eq!(parse_timestamp("12345"), None);
        assert_eq!(parse_timestamp("20241345"), None);
    }

    #[test]
    fn test_date_only() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15"), Some(expected));
    }
}
