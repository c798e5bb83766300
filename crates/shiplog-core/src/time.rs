use chrono::{DateTime, NaiveDate, Utc};

/// Overrides the wall clock for the current thread while `f` runs.
///
/// Edge ids embed a millisecond timestamp and backup file names embed the current date, which
/// makes outputs differ between runs. Tests and scripted replays use this to pin both. `None`
/// uses the system clock.
pub fn with_fixed_now<R>(now: Option<DateTime<Utc>>, f: impl FnOnce() -> R) -> R {
    crate::runtime::with_fixed_now(now, f)
}

/// Returns the active "now", honoring [`with_fixed_now`].
pub fn now() -> DateTime<Utc> {
    crate::runtime::now()
}

/// Returns the UTC calendar date used for date-stamped backup names.
pub fn today() -> NaiveDate {
    crate::runtime::today_utc()
}
