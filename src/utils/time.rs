use chrono::{DateTime, Duration, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub fn from_rfc3339(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// End of a session, fixed at start/resume time. Derived from when the
/// attempt actually started so that a reload never grants extra time.
pub fn compute_end_time(started_at: DateTime<Utc>, duration_minutes: i64) -> DateTime<Utc> {
    started_at + Duration::minutes(duration_minutes)
}
