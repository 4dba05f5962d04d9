//! Conversions between the FGDB day-count/fraction encodings and `chrono` types.
//!
//! All four date/time field types share the same epoch and the same "number of days as an
//! `f64`" encoding; only the interpretation differs (whole timestamp, date only, time-of-day
//! fraction, or timestamp plus a UTC offset).

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

/// The FGDB epoch: 1899-12-30, 00:00:00, in an unspecified zone.
fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .expect("1899-12-30 is a valid calendar date")
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
}

/// Converts a day count since the FGDB epoch into a timestamp.
pub fn days_to_datetime(days: f64) -> NaiveDateTime {
    epoch() + Duration::milliseconds((days * 86_400_000.0).round() as i64)
}

/// Converts a day count since the FGDB epoch into a calendar date.
pub fn days_to_date(days: f64) -> NaiveDate {
    days_to_datetime(days).date()
}

/// Converts a `[0,1]` fraction of a day into a time-of-day, clamping out-of-range input.
///
/// The format owner does not document behavior for persisted values outside `[0,1]`; this
/// implementation clamps rather than panicking or erroring, per the open question in the spec.
pub fn fraction_to_time(fraction: f64) -> NaiveTime {
    let clamped = fraction.clamp(0.0, 1.0);
    let millis_in_day = (clamped * 86_400_000.0).round() as u32;
    let millis_in_day = millis_in_day.min(86_399_999);
    NaiveTime::from_num_seconds_from_midnight_opt(
        millis_in_day / 1000,
        (millis_in_day % 1000) * 1_000_000,
    )
    .expect("millis_in_day is bounded to a single day")
}

/// Combines a day count and a UTC offset (in minutes) into an offset timestamp.
pub fn days_to_datetime_offset(days: f64, utc_offset_minutes: i16) -> DateTime<FixedOffset> {
    let naive = days_to_datetime(days);
    let offset = FixedOffset::east_opt(i32::from(utc_offset_minutes) * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    DateTime::from_naive_utc_and_offset(naive - Duration::minutes(i64::from(utc_offset_minutes)), offset)
}
