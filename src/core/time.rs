//! GPS time conversions

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use ndarray::Array1;

/// GPS epoch (1980-01-06T00:00:00 UTC) on the continuous TAI-aligned scale,
/// which runs 19 s ahead of UTC at that instant.
fn gps_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1980, 1, 6)
        .and_then(|d| d.and_hms_opt(0, 0, 19))
        .unwrap_or_default()
}

fn year_start(year: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Calendar instant for a GPS time in seconds; `None` when not representable
pub fn gps_to_datetime(gps_seconds: f64) -> Option<NaiveDateTime> {
    if !gps_seconds.is_finite() {
        return None;
    }
    let whole = gps_seconds.floor();
    let nanos = ((gps_seconds - whole) * 1e9).round() as i64;
    gps_epoch()
        .checked_add_signed(Duration::try_seconds(whole as i64)?)?
        .checked_add_signed(Duration::nanoseconds(nanos))
}

/// GPS seconds to decimal years, e.g. 2019.5 for mid-2019.
///
/// Times outside the calendar range (fill values) give NaN.
pub fn gps_to_decimal_year(gps_seconds: f64) -> f64 {
    let Some(t) = gps_to_datetime(gps_seconds) else {
        return f64::NAN;
    };
    let year = t.year();
    let (Some(start), Some(end)) = (year_start(year), year_start(year + 1)) else {
        return f64::NAN;
    };

    let elapsed = (t - start).num_nanoseconds().unwrap_or(0) as f64;
    let length = (end - start).num_nanoseconds().unwrap_or(1) as f64;
    year as f64 + elapsed / length
}

/// Vectorised [`gps_to_decimal_year`]
pub fn gps2dyr(gps_seconds: &Array1<f64>) -> Array1<f64> {
    gps_seconds.mapv(gps_to_decimal_year)
}

/// Absolute GPS time from the file reference epoch and per-segment delta time
pub fn gps_time(t_ref: f64, delta_time: &Array1<f64>) -> Array1<f64> {
    delta_time.mapv(|dt| t_ref + dt)
}
