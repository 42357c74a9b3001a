//! # Solar Geometry
//!
//! Solar position (azimuth and zenith) for a sequence of civil timestamps at
//! a fixed location, plus the daylight-saving rule and civil/UTC shifting
//! used by the cross-source checks.
//!
//! Angles are in radians throughout. Azimuth is measured from solar noon,
//! positive before it and negative after it; zenith is measured from the
//! vertical. The declination and equation-of-time terms are low-order
//! day-of-year approximations, accurate to a fraction of a degree, which is
//! plenty for flagging a tracker that points the wrong way.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Deserialize;
use std::f64::consts::PI;

use crate::series::TimeSeries;

/// Geographic location and clock offset of a station.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Location {
    /// Latitude in decimal degrees, north positive
    pub latitude: f64,
    /// Longitude in decimal degrees, east positive
    pub longitude: f64,
    /// Standard-time offset from UTC in hours (DST is handled separately)
    pub utc_offset: f64,
}

impl Default for Location {
    /// Madrid
    fn default() -> Self {
        Self {
            latitude: 40.45,
            longitude: -3.73,
            utc_offset: 1.0,
        }
    }
}

/// Solar position at one instant, radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    /// Angle from solar noon; positive in the morning, negative after noon
    pub azimuth: f64,
    /// Angle from the vertical
    pub zenith: f64,
}

/// Solar declination in radians for a day of year (1-based).
pub fn declination(day_of_year: u32) -> f64 {
    23.45_f64.to_radians() * (2.0 * PI * (day_of_year as f64 + 284.0) / 365.0).sin()
}

/// Equation-of-time correction in minutes for a day of year (1-based).
///
/// Two-harmonic approximation; positive when the sundial runs ahead of the
/// clock.
pub fn equation_of_time(day_of_year: u32) -> f64 {
    let d = day_of_year as f64;
    -7.64 * (d - 2.0).to_radians().sin() + 9.86 * (2.0 * (d - 80.0)).to_radians().sin()
}

/// Daylight-saving status of a calendar date.
///
/// DST runs from the Sunday strictly before March 31 through the Sunday
/// strictly before October 31, both endpoints inclusive and counted from
/// midnight of the changeover day.
pub fn is_dst(date: NaiveDate) -> bool {
    let spring = changeover(date.year(), 3);
    let autumn = changeover(date.year(), 10);
    date >= spring && date <= autumn
}

/// Sunday strictly before the 31st of the given month.
fn changeover(year: i32, month: u32) -> NaiveDate {
    let pivot = NaiveDate::from_ymd_opt(year, month, 31).expect("changeover month has 31 days");
    pivot - Duration::days(i64::from(pivot.weekday().number_from_monday()))
}

/// Raw (unsigned) azimuth and zenith at one instant.
fn position_at(time: NaiveDateTime, location: &Location) -> (f64, f64) {
    let phi = location.latitude.to_radians();
    let doy = time.ordinal();
    let decl = declination(doy);

    let civil_hour =
        time.hour() as f64 + time.minute() as f64 / 60.0 + time.second() as f64 / 3600.0;
    let dst_hours = if is_dst(time.date()) { 1.0 } else { 0.0 };
    let solar_hour = civil_hour - dst_hours + equation_of_time(doy) / 60.0
        - (location.utc_offset - location.longitude / 15.0);
    let hour_angle = (solar_hour - 12.0) * (2.0 * PI / 24.0);

    let zenith = (decl.cos() * hour_angle.cos() * phi.cos() + decl.sin() * phi.sin()).acos();
    let azimuth = ((zenith.cos() * phi.sin() - decl.sin()) / (zenith.sin() * phi.cos())).acos();

    (azimuth, zenith)
}

/// Solar position for every instant of a civil-time sequence.
///
/// The arccosine that yields azimuth cannot tell morning from afternoon, so
/// the sign is resolved from the zenith trend: wherever zenith is increasing
/// toward the next sample the azimuth is negated, and the final sample reuses
/// the previous sample's trend. A single-instant input gets the morning sign.
pub fn solar_positions(times: &[NaiveDateTime], location: &Location) -> Vec<SolarPosition> {
    let n = times.len();
    let mut azimuths = Vec::with_capacity(n);
    let mut zeniths = Vec::with_capacity(n);
    for t in times {
        let (az, zz) = position_at(*t, location);
        azimuths.push(az);
        zeniths.push(zz);
    }

    (0..n)
        .map(|i| {
            let sinking = if n >= 2 {
                let j = if i + 1 < n { i } else { n - 2 };
                zeniths[j + 1] > zeniths[j]
            } else {
                false
            };
            SolarPosition {
                azimuth: if sinking { -azimuths[i] } else { azimuths[i] },
                zenith: zeniths[i],
            }
        })
        .collect()
}

/// Solar position at a single instant.
///
/// With no neighbouring sample to read the zenith trend from, the azimuth
/// keeps the morning sign.
pub fn solar_position(time: NaiveDateTime, location: &Location) -> SolarPosition {
    let (azimuth, zenith) = position_at(time, location);
    SolarPosition { azimuth, zenith }
}

/// Direction of a civil/UTC clock shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockShift {
    /// Add the offsets: timestamps move from UTC to station-local civil time
    UtcToCivil,
    /// Subtract the offsets: timestamps move from civil time back to UTC
    CivilToUtc,
}

/// Shift a series between UTC and civil time.
///
/// Each timestamp moves by `summer_hours` when its (pre-shift) date falls in
/// the DST period and by `winter_hours` otherwise; samples keep their values
/// and the result is re-sorted by time.
pub fn shift_clock(
    series: &TimeSeries,
    shift: ClockShift,
    winter_hours: i64,
    summer_hours: i64,
) -> TimeSeries {
    let mut paired: Vec<(NaiveDateTime, f64)> = series
        .times
        .iter()
        .zip(&series.values)
        .map(|(t, v)| {
            let hours = if is_dst(t.date()) {
                summer_hours
            } else {
                winter_hours
            };
            let delta = Duration::hours(hours);
            let shifted = match shift {
                ClockShift::UtcToCivil => *t + delta,
                ClockShift::CivilToUtc => *t - delta,
            };
            (shifted, *v)
        })
        .collect();
    paired.sort_by_key(|(t, _)| *t);

    let (times, values) = paired.into_iter().unzip();
    TimeSeries {
        name: series.name.clone(),
        times,
        values,
    }
}
