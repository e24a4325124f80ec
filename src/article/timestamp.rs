use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses a `published_at` value into UTC.
///
/// Accepts RFC 3339, RFC 2822 (RSS `pubDate`), offset-less ISO-8601 date-times
/// (read as UTC) and bare dates. Anything else is "unknown" and yields `None`.
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Absolute gap between two timestamps in hours; `None` if either is unknown.
pub fn hours_between(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a - b).num_seconds().abs() as f64 / 3600.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso(raw: &str) -> Option<String> {
        parse_published_at(raw).map(|dt| dt.to_rfc3339())
    }

    #[test]
    fn test_parse_published_at_formats() {
        assert_eq!(iso("2024-03-01T10:00:00Z"), Some("2024-03-01T10:00:00+00:00".into()));
        assert_eq!(iso("2024-03-01T19:00:00+09:00"), Some("2024-03-01T10:00:00+00:00".into()));
        assert_eq!(iso("Fri, 01 Mar 2024 10:00:00 GMT"), Some("2024-03-01T10:00:00+00:00".into()));
        assert_eq!(iso("2024-03-01 10:00:00"), Some("2024-03-01T10:00:00+00:00".into()));
        assert_eq!(iso("2024-03-01T10:00:00.250"), Some("2024-03-01T10:00:00.250+00:00".into()));
        assert_eq!(iso("2024-03-01"), Some("2024-03-01T00:00:00+00:00".into()));
    }

    #[test]
    fn test_parse_published_at_unknown() {
        assert_eq!(iso(""), None);
        assert_eq!(iso("yesterday"), None);
        assert_eq!(iso("2024-13-45T99:00:00Z"), None);
    }

    #[test]
    fn test_hours_between() {
        let a = parse_published_at("2024-03-01T10:00:00Z");
        let b = parse_published_at("2024-03-01T13:30:00Z");
        assert_eq!(hours_between(a, b), Some(3.5));
        assert_eq!(hours_between(b, a), Some(3.5));
        assert_eq!(hours_between(a, None), None);
    }
}
