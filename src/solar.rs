//! Solar geometry for rainbow prediction
//!
//! Pure functions from (location, instant) to solar altitude, compass
//! azimuth and the day's sun events. Uses the NOAA-style formulas (equation
//! of time, declination, hour angle); accuracy is a fraction of a degree,
//! comfortably inside what the favorability thresholds need.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::data::{Location, SunPosition};

/// Sun elevation at sunrise/sunset, accounting for refraction and the
/// sun's apparent radius.
const SUNRISE_SUNSET_ALTITUDE: f64 = -0.833;

/// Sun elevation at which evening golden hour begins.
const GOLDEN_HOUR_ALTITUDE: f64 = 6.0;

const EARTH_AXIAL_TILT: f64 = 23.45;
const DEGREES_PER_HOUR: f64 = 15.0;

fn deg_to_rad(deg: f64) -> f64 {
    deg.to_radians()
}

fn rad_to_deg(rad: f64) -> f64 {
    rad.to_degrees()
}

/// Equation of time in minutes for a day of the year.
fn equation_of_time(day_of_year: u32) -> f64 {
    let b = deg_to_rad((day_of_year as f64 - 1.0) * (360.0 / 365.0));
    229.18
        * (0.000075 + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.040849 * (2.0 * b).sin())
}

/// Solar declination in degrees for a day of the year.
fn solar_declination(day_of_year: u32) -> f64 {
    EARTH_AXIAL_TILT * deg_to_rad(360.0 * ((284 + day_of_year) as f64 / 365.0)).sin()
}

/// Offset from UTC time to local solar time, in hours.
fn solar_time_offset(longitude: f64, eot_minutes: f64) -> f64 {
    (4.0 * longitude + eot_minutes) / 60.0
}

/// Sun altitude above the horizon in degrees.
fn altitude_deg(latitude: f64, declination: f64, hour_angle: f64) -> f64 {
    let lat = deg_to_rad(latitude);
    let dec = deg_to_rad(declination);
    let ha = deg_to_rad(hour_angle);
    let sin_alt = lat.sin() * dec.sin() + lat.cos() * dec.cos() * ha.cos();
    rad_to_deg(sin_alt.clamp(-1.0, 1.0).asin())
}

/// Compass bearing to the sun in degrees, 0 = north, 90 = east.
///
/// The atan2 form yields azimuth measured from south; adding 180 and
/// renormalizing converts to a compass bearing.
fn compass_azimuth_deg(latitude: f64, declination: f64, hour_angle: f64) -> f64 {
    let lat = deg_to_rad(latitude);
    let dec = deg_to_rad(declination);
    let ha = deg_to_rad(hour_angle);
    let from_south = ha.sin().atan2(ha.cos() * lat.sin() - dec.tan() * lat.cos());
    (rad_to_deg(from_south) + 180.0).rem_euclid(360.0)
}

/// Hour angle (degrees from solar noon) at which the sun crosses the given
/// altitude, or `None` when it never does on this day (polar day/night).
fn crossing_hour_angle(latitude: f64, declination: f64, target_altitude: f64) -> Option<f64> {
    let lat = deg_to_rad(latitude);
    let dec = deg_to_rad(declination);
    let cos_ha = (deg_to_rad(target_altitude).sin() - lat.sin() * dec.sin())
        / (lat.cos() * dec.cos());
    if !(-1.0..=1.0).contains(&cos_ha) {
        return None;
    }
    Some(rad_to_deg(cos_ha.acos()))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Computes solar geometry for a location and instant.
///
/// Pure and total for any validated [`Location`]: polar day/night yields
/// `None` sun-event fields, never an error. Event instants are absolute UTC
/// timestamps for the UTC calendar day containing `instant`; zone
/// conversion is left to the caller.
pub fn solar_position(location: &Location, instant: DateTime<Utc>) -> SunPosition {
    let latitude = location.latitude();
    let longitude = location.longitude();

    let day_of_year = instant.ordinal();
    let eot = equation_of_time(day_of_year);
    let declination = solar_declination(day_of_year);
    let offset = solar_time_offset(longitude, eot);

    let utc_hours = instant.hour() as f64
        + instant.minute() as f64 / 60.0
        + instant.second() as f64 / 3600.0;
    let local_solar_time = (utc_hours + offset).rem_euclid(24.0);
    let hour_angle = DEGREES_PER_HOUR * (local_solar_time - 12.0);

    let altitude = round1(altitude_deg(latitude, declination, hour_angle));
    let azimuth = round1(compass_azimuth_deg(latitude, declination, hour_angle)).rem_euclid(360.0);

    let midnight = instant
        .date_naive()
        .and_time(chrono::NaiveTime::MIN)
        .and_utc();
    let event_at = |hours: f64| midnight + Duration::milliseconds((hours * 3_600_000.0) as i64);

    let noon_hours = 12.0 - offset;
    let solar_noon = event_at(noon_hours);

    let horizon_ha = crossing_hour_angle(latitude, declination, SUNRISE_SUNSET_ALTITUDE);
    let sunrise = horizon_ha.map(|ha| event_at(noon_hours - ha / DEGREES_PER_HOUR));
    let sunset = horizon_ha.map(|ha| event_at(noon_hours + ha / DEGREES_PER_HOUR));

    // Golden hour only exists when the sun both exceeds 6 degrees and sets.
    let golden_ha = crossing_hour_angle(latitude, declination, GOLDEN_HOUR_ALTITUDE);
    let golden_hour_start = match (golden_ha, sunset) {
        (Some(ha), Some(_)) => Some(event_at(noon_hours + ha / DEGREES_PER_HOUR)),
        _ => None,
    };
    let golden_hour_end = golden_hour_start.and(sunset);

    SunPosition {
        altitude,
        azimuth,
        is_daytime: altitude > 0.0,
        sunrise,
        sunset,
        solar_noon,
        golden_hour_start,
        golden_hour_end,
    }
}
