//! Timestamp parsing for the column time filter.
//!
//! The workflow engine reports index bounds as loosely formatted strings
//! ("2024-01-15", "2024-01-15T10:00", "2024-01-15 10:00:00", RFC 3339).
//! Every accepted form is normalized to a [`NaiveDateTime`]; a date without a
//! time of day means midnight.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.naive_utc());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Inclusive time window applied to column rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start <= time && time <= self.end
    }

    /// Parses both bounds; `None` when either is absent or unparseable.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Option<Self> {
        Some(Self {
            start: parse_timestamp(start?)?,
            end: parse_timestamp(end?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_means_midnight() {
        let parsed = parse_timestamp("2024-01-02").unwrap();
        assert_eq!(parsed.to_string(), "2024-01-02 00:00:00");
    }

    #[test]
    fn accepts_iso_and_space_separated_forms() {
        let iso = parse_timestamp("2024-01-15T10:00:00").unwrap();
        let spaced = parse_timestamp("2024-01-15 10:00:00").unwrap();
        let short = parse_timestamp("2024-01-15T10:00").unwrap();
        assert_eq!(iso, spaced);
        assert_eq!(iso, short);
    }

    #[test]
    fn rfc3339_is_normalized_to_utc() {
        let parsed = parse_timestamp("2024-01-15T12:00:00+02:00").unwrap();
        assert_eq!(parsed.to_string(), "2024-01-15 10:00:00");
    }

    #[test]
    fn garbage_and_blank_do_not_parse() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("   "), None);
    }

    #[test]
    fn range_is_inclusive() {
        let range = TimeRange::parse(Some("2024-01-01"), Some("2024-01-02")).unwrap();
        assert!(range.contains(parse_timestamp("2024-01-01").unwrap()));
        assert!(range.contains(parse_timestamp("2024-01-02").unwrap()));
        assert!(!range.contains(parse_timestamp("2024-01-02 00:00:01").unwrap()));
    }
}
