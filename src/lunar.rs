//! Low-precision lunar ephemeris (Schaefer 1985/1994).
//!
//! Accuracy: about a day for the lunation index, a few degrees for the
//! ecliptic position, which is plenty for a calendar glyph and a filled
//! altitude curve. References: Sky & Telescope BASIC "MOONFX.BAS"
//! (Apr 1994) and the original phase routine (Mar 1985).

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

/// Mean synodic month length in days.
const SYNODIC_MONTH: f64 = 29.530_588_2;

/// Mean obliquity of the ecliptic, degrees (J2000).
const OBLIQUITY_DEG: f64 = 23.439_291;

/// Number of lunation-day identifiers (phase glyphs) in one cycle.
pub const PHASE_IDS: u8 = 28;

/// Ecliptic position and synodic phase from Schaefer's routine.
#[derive(Debug, Clone, Copy)]
pub struct LunarEphemeris {
    /// Fraction of the synodic cycle elapsed since new moon, in [0, 1).
    pub synodic_frac: f64,
    /// Ecliptic longitude, degrees (low precision).
    pub lon_deg: f64,
    /// Ecliptic latitude, degrees (low precision).
    pub lat_deg: f64,
}

fn frac(mut v: f64) -> f64 {
    v -= v.floor();
    if v < 0.0 {
        v + 1.0
    } else {
        v
    }
}

/// Compute Schaefer's phase & position for a proleptic-Gregorian Y-M-D.
///
/// `day` can be fractional (UTC noon = 0.5).
pub fn schaefer_moon(year: i32, month: u32, day: f64) -> LunarEphemeris {
    // Calendar -> "March-based" year to simplify the day count.
    let (mut y, mut m) = (year, month as i32);
    if m < 3 {
        y -= 1;
        m += 12;
    }
    m += 1; // Mar = 1, Apr = 2, ...

    // Days from the 1900-01-00 12 UT new moon epoch (S&T 1985).
    let days = (365.25 * y as f64).floor() + (30.6 * m as f64).floor() + day - 694_039.09;

    // Synodic phase: whole cycles dropped, fractional part kept.
    let synodic_frac = frac(days / SYNODIC_MONTH);

    // 1994 add-ons: anomalistic, draconic and sidereal cycles, periods and
    // epochs straight from MOONFX.BAS.
    let phase_angle = synodic_frac * 2.0 * PI;
    let dp = frac((days + 245_1550.1 - 245_1562.2) / 27.554_549_88) * 2.0 * PI;

    let np = frac((days + 245_1550.1 - 245_1565.2) / 27.212_220_817) * 2.0 * PI;
    let lat_deg = 5.1 * np.sin();

    let rp = frac((days + 245_1550.1 - 245_1555.8) / 27.321_582_241);
    let lon_deg = (360.0 * rp
        + 6.3 * dp.sin()
        + 1.3 * (2.0 * phase_angle - dp).sin()
        + 0.7 * (2.0 * phase_angle).sin())
        % 360.0;

    LunarEphemeris {
        synodic_frac,
        lon_deg,
        lat_deg,
    }
}

fn fractional_day(t: DateTime<Utc>) -> f64 {
    t.day() as f64
        + (t.hour() as f64 + t.minute() as f64 / 60.0 + t.second() as f64 / 3600.0) / 24.0
}

/// Ephemeris at a UTC instant.
pub fn at(t: DateTime<Utc>) -> LunarEphemeris {
    schaefer_moon(t.year(), t.month(), fractional_day(t))
}

/// Lunation-day index in `0..PHASE_IDS` for a UTC instant: 0 = new moon,
/// 14 = full moon, scaled from the mean synodic fraction.
pub fn lunation_day(t: DateTime<Utc>) -> u8 {
    let num = (PHASE_IDS - 1) as f64;
    ((at(t).synodic_frac * num).round() as u8) % PHASE_IDS
}

/// Julian date of a UTC instant.
fn julian_date(t: DateTime<Utc>) -> f64 {
    t.timestamp() as f64 / 86_400.0 + t.timestamp_subsec_millis() as f64 / 86_400_000.0
        + 2_440_587.5
}

/// Greenwich mean sidereal time, degrees.
fn gmst_deg(t: DateTime<Utc>) -> f64 {
    let d = julian_date(t) - 2_451_545.0;
    (280.460_618_37 + 360.985_647_366_29 * d).rem_euclid(360.0)
}

/// Geocentric altitude of the Moon above the horizon, degrees, for an
/// observer at `lat_deg`/`lon_deg` (east positive).
///
/// Ecliptic position from [`schaefer_moon`], rotated through the mean
/// obliquity to equatorial coordinates, then through the local hour angle
/// to the horizon. Topocentric parallax (up to ~1 degree) is ignored,
/// consistent with the low-precision source routine.
pub fn altitude_deg(t: DateTime<Utc>, lat_deg: f64, lon_deg: f64) -> f64 {
    let eph = at(t);
    let lambda = eph.lon_deg.to_radians();
    let beta = eph.lat_deg.to_radians();
    let eps = OBLIQUITY_DEG.to_radians();

    let dec = (beta.sin() * eps.cos() + beta.cos() * eps.sin() * lambda.sin()).asin();
    let ra = (lambda.sin() * eps.cos() - beta.tan() * eps.sin()).atan2(lambda.cos());

    let lst = (gmst_deg(t) + lon_deg).to_radians();
    let hour_angle = lst - ra;

    let lat = lat_deg.to_radians();
    let sin_alt = lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.cos();
    sin_alt.asin().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    /// The index is cyclic; distance must respect the wrap at 28.
    fn cyclic_distance(a: u8, b: u8) -> u8 {
        let d = (a as i16 - b as i16).rem_euclid(PHASE_IDS as i16) as u8;
        d.min(PHASE_IDS - d)
    }

    #[test]
    fn new_moons_land_near_index_zero() {
        // Actual new moons: 2015-01-20, 2015-07-16, 2016-03-09.
        for t in [utc(2015, 1, 20, 13), utc(2015, 7, 16, 1), utc(2016, 3, 9, 2)] {
            let day = lunation_day(t);
            assert!(
                cyclic_distance(day, 0) <= 1,
                "{t}: lunation day {day} too far from new moon"
            );
        }
    }

    #[test]
    fn full_moons_land_near_index_fourteen() {
        // Actual full moons: 2015-07-02, 2015-12-25.
        for t in [utc(2015, 7, 2, 2), utc(2015, 12, 25, 11)] {
            let day = lunation_day(t);
            assert!(
                cyclic_distance(day, 14) <= 1,
                "{t}: lunation day {day} too far from full moon"
            );
        }
    }

    #[test]
    fn lunation_day_stays_in_range() {
        let mut t = utc(2015, 1, 1, 22);
        for _ in 0..365 {
            assert!(lunation_day(t) < PHASE_IDS);
            t += chrono::Duration::days(1);
        }
    }

    #[test]
    fn synodic_fraction_advances_daily() {
        let a = at(utc(2015, 6, 20, 0)).synodic_frac;
        let b = at(utc(2015, 6, 21, 0)).synodic_frac;
        let step = frac(b - a);
        // One day is about 1/29.53 of the cycle.
        assert!((step - 1.0 / SYNODIC_MONTH).abs() < 1e-3, "step {step}");
    }

    #[test]
    fn altitude_swings_above_and_below_horizon() {
        // Santa Cruz, CA over one day: the Moon both rises and sets.
        let mut highest = f64::MIN;
        let mut lowest = f64::MAX;
        for hour in 0..24 {
            let alt = altitude_deg(utc(2015, 7, 4, hour), 36.9581, -122.0172);
            assert!((-90.0..=90.0).contains(&alt));
            highest = highest.max(alt);
            lowest = lowest.min(alt);
        }
        assert!(highest > 5.0, "moon never rose: {highest}");
        assert!(lowest < -5.0, "moon never set: {lowest}");
    }
}
