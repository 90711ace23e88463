use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

/// Rounds to two decimal places. Exact ties go to the even hundredth, so
/// `0.125` becomes `0.12`.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Formats an instant the way the vendor API expects: UTC, second precision,
/// `Z` suffix.
pub fn format_api_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// First and last second of the UTC calendar day containing `instant`.
pub fn utc_day_bounds(instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = instant.date_naive().and_time(NaiveTime::MIN).and_utc();
    let end = start + TimeDelta::days(1) - TimeDelta::seconds(1);
    (start, end)
}
