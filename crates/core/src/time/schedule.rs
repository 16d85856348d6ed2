use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Local wall-clock time of the daily run.
pub const DAILY_TRIGGER: (u32, u32) = (5, 55);

pub fn daily_trigger_time() -> NaiveTime {
    NaiveTime::from_hms_opt(DAILY_TRIGGER.0, DAILY_TRIGGER.1, 0).unwrap_or_default()
}

/// Next occurrence of `at`: today if it has not passed yet, else tomorrow.
///
/// Missed triggers are never replayed.
pub fn next_trigger(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Time left until `next`, clamped at zero.
pub fn until(now: NaiveDateTime, next: NaiveDateTime) -> std::time::Duration {
    (next - now).to_std().unwrap_or_default()
}

/// Report date for a run: the explicit override, else the local calendar date.
pub fn resolve_target_date(arg: Option<&str>, now: NaiveDateTime) -> anyhow::Result<NaiveDate> {
    match arg {
        Some(s) => Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?),
        None => Ok(now.date()),
    }
}
