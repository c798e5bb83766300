use chrono::{DateTime, NaiveDate, Utc};
use std::cell::Cell;

thread_local! {
    static FIXED_NOW_MILLIS: Cell<Option<i64>> = const { Cell::new(None) };
}

pub(crate) fn with_fixed_now<R>(now: Option<DateTime<Utc>>, f: impl FnOnce() -> R) -> R {
    FIXED_NOW_MILLIS.with(|cell| {
        let prev = cell.replace(now.map(|dt| dt.timestamp_millis()));
        let out = f();
        cell.set(prev);
        out
    })
}

pub(crate) fn now() -> DateTime<Utc> {
    FIXED_NOW_MILLIS
        .with(|cell| cell.get())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

pub(crate) fn now_millis() -> i64 {
    now().timestamp_millis()
}

pub(crate) fn today_utc() -> NaiveDate {
    now().date_naive()
}
