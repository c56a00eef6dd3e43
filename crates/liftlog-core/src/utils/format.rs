use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parse a date as stored by the backend.
///
/// Records use `2024-01-15 10:30:00.123Z`; values we send ourselves are
/// RFC 3339. A bare `YYYY-MM-DD` is read as midnight UTC.
pub fn parse_record_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = s.trim_end_matches('Z');
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Relative description of `date` as seen from `now`.
///
/// Anything a month or older falls back to an absolute `Jan 05, 2024`.
pub fn time_ago(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - date).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;

    if months > 0 {
        date.format("%b %d, %Y").to_string()
    } else if days > 0 {
        format!("{} days ago", days)
    } else if hours > 0 {
        format!("{} hours ago", hours)
    } else if minutes > 0 {
        format!("{} minutes ago", minutes)
    } else {
        format!("{} seconds ago", seconds)
    }
}

/// Display a weight rounded to two decimals, without trailing zeros.
/// Field text uses [`crate::editor::weight_text`] instead.
pub fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{:.0}", weight)
    } else {
        let s = format!("{:.2}", weight);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_parse_record_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_record_date("2024-01-15 10:30:00.000Z"), Some(expected));
        assert_eq!(parse_record_date("2024-01-15 10:30:00Z"), Some(expected));
        assert_eq!(parse_record_date("2024-01-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_record_date("2024-01-15T11:30:00+01:00"), Some(expected));
        assert_eq!(
            parse_record_date("2024-01-15"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_record_date(""), None);
        assert_eq!(parse_record_date("yesterday"), None);
    }

    #[test]
    fn test_time_ago() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(time_ago(now - Duration::seconds(5), now), "5 seconds ago");
        assert_eq!(time_ago(now - Duration::minutes(3), now), "3 minutes ago");
        assert_eq!(time_ago(now - Duration::hours(2), now), "2 hours ago");
        assert_eq!(time_ago(now - Duration::days(4), now), "4 days ago");
        assert_eq!(time_ago(now - Duration::days(45), now), "Jan 25, 2024");
        // Future dates clamp to zero
        assert_eq!(time_ago(now + Duration::minutes(3), now), "0 seconds ago");
    }

    #[test]
    fn test_format_weight() {
        assert_eq!(format_weight(10.0), "10");
        assert_eq!(format_weight(22.5), "22.5");
        assert_eq!(format_weight(0.25), "0.25");
        assert_eq!(format_weight(0.0), "0");
        assert_eq!(format_weight(22.0001), "22");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Romanian deadlift", 3), "Rom");
    }
}
