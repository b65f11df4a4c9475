//! Timestamp utilities

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC calendar date (streaks are counted in UTC days)
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Timestamp `seconds` from `from`; negative values go backwards
pub fn after_seconds(from: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    from + Duration::seconds(seconds)
}
