//! Tatkal opening schedule.
//!
//! Tatkal booking opens one day before travel at a fixed IST clock time that
//! depends on the class: AC classes at 10:00, the rest at 11:00.

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike, Utc};

/// AC class codes opening at 10:00 IST.
const AC_CLASSES: &[&str] = &["1A", "2A", "3A", "3E", "CC", "EC", "EA"];

const AC_OPENING_HOUR: u32 = 10;
const NON_AC_OPENING_HOUR: u32 = 11;

/// IST offset from UTC (+05:30).
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Whether a class code belongs to the AC opening window.
pub fn is_ac_class(coach: &str) -> bool {
    AC_CLASSES.iter().any(|c| c.eq_ignore_ascii_case(coach.trim()))
}

/// Today's scheduled Tatkal opening time for a class.
pub fn opening_time(coach: &str) -> NaiveTime {
    let hour = if is_ac_class(coach) {
        AC_OPENING_HOUR
    } else {
        NON_AC_OPENING_HOUR
    };
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Opening time as the header clock renders it (`HH:MM:SS`).
pub fn opening_clock_text(coach: &str) -> String {
    opening_time(coach).format("%H:%M:%S").to_string()
}

/// Whether today's opening for the class has already passed.
pub fn has_opened(coach: &str, now: NaiveTime) -> bool {
    let now = now.with_nanosecond(0).unwrap_or(now);
    now >= opening_time(coach)
}

/// Current time in IST.
pub fn ist_now() -> DateTime<FixedOffset> {
    to_ist(Utc::now())
}

/// Convert a UTC instant to IST.
pub fn to_ist(utc: DateTime<Utc>) -> DateTime<FixedOffset> {
    match FixedOffset::east_opt(IST_OFFSET_SECS) {
        Some(ist) => utc.with_timezone(&ist),
        None => utc.fixed_offset(),
    }
}
