//! Per-day Sun and Moon illumination contexts.
//!
//! An [`Astro`] holds, for every local calendar date of the year, the
//! body's sin(altitude) sampled every 10 minutes: the filled curve drawn
//! in each day's illumination strip. The Sun position comes from the NREL
//! SPA; the Moon from the Schaefer ephemeris in [`crate::lunar`]. The Moon
//! context additionally carries a per-date lunation-day index (sampled at
//! 22:00 local, matching the original calendar's convention) that selects
//! the phase glyph.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use solar_positioning::{spa, time::DeltaT, RefractionCorrection};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::{localize, lunar, DaySeries, Sample};

/// Sampling step for the altitude series.
const STEP_MINUTES: i64 = 10;

/// Which body an [`Astro`] context describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Body {
    Sun,
    Moon,
}

impl Body {
    pub fn name(self) -> &'static str {
        match self {
            Body::Sun => "Sun",
            Body::Moon => "Moon",
        }
    }
}

/// Errors while building an astronomical context.
#[derive(Error, Debug)]
pub enum AstroError {
    /// Year string did not parse as a 4-digit year.
    #[error("malformed year identifier {0:?} (expected YYYY)")]
    BadYear(String),

    /// A boundary wall-clock time does not exist in the zone.
    #[error("local time {0} does not exist in zone {1}")]
    NonexistentTime(String, Tz),

    /// The solar position algorithm rejected its inputs.
    #[error("solar position: {0}")]
    SolarPosition(String),
}

/// Year- and location-specific altitude series for one body.
#[derive(Debug, Clone)]
pub struct Astro {
    pub body: Body,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
    pub year: String,
    /// Local calendar date -> ascending sin(altitude) samples. Values are
    /// signed; the renderer clips below 0.
    pub heights: BTreeMap<NaiveDate, DaySeries>,
    /// Local calendar date -> lunation-day glyph index. Empty for the Sun.
    pub phase_day_num: BTreeMap<NaiveDate, u8>,
}

impl Astro {
    /// Sample `body` every 10 minutes from local Jan 1 00:00 through local
    /// Dec 31 23:59:59 of `year` at the given coordinates.
    pub fn new(
        body: Body,
        latitude: f64,
        longitude: f64,
        timezone: Tz,
        year: &str,
    ) -> Result<Self, AstroError> {
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AstroError::BadYear(year.to_string()));
        }
        let y: i32 = year
            .parse()
            .map_err(|_| AstroError::BadYear(year.to_string()))?;

        let begin_naive = NaiveDate::from_ymd_opt(y, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| AstroError::BadYear(year.to_string()))?;
        let end_naive = NaiveDate::from_ymd_opt(y, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .ok_or_else(|| AstroError::BadYear(year.to_string()))?;
        let begin = localize(begin_naive, timezone)
            .ok_or_else(|| AstroError::NonexistentTime(begin_naive.to_string(), timezone))?;
        let end = localize(end_naive, timezone)
            .ok_or_else(|| AstroError::NonexistentTime(end_naive.to_string(), timezone))?;

        // Estimated once for mid-year; DeltaT drifts by well under a
        // second across a single year.
        let delta_t =
            DeltaT::estimate_from_date(y, 6).map_err(|e| AstroError::SolarPosition(e.to_string()))?;

        let mut heights: BTreeMap<NaiveDate, DaySeries> = BTreeMap::new();
        let end_utc = end.with_timezone(&Utc);
        let mut t = begin.with_timezone(&Utc);
        while t < end_utc {
            Self::push_sample(&mut heights, body, t, latitude, longitude, delta_t, timezone)?;
            t += Duration::minutes(STEP_MINUTES);
        }
        // The exact stopping instant, so the last day reaches 23:59:59.
        Self::push_sample(&mut heights, body, end_utc, latitude, longitude, delta_t, timezone)?;

        // Daily lunation index for the Moon, sampled 22:00 local.
        let mut phase_day_num = BTreeMap::new();
        if body == Body::Moon {
            let mut date = begin.date_naive();
            let last = end.date_naive();
            while date <= last {
                let at_10pm = date
                    .and_hms_opt(22, 0, 0)
                    .and_then(|n| localize(n, timezone))
                    .ok_or_else(|| {
                        AstroError::NonexistentTime(format!("{date} 22:00:00"), timezone)
                    })?;
                phase_day_num.insert(date, lunar::lunation_day(at_10pm.with_timezone(&Utc)));
                date = match date.succ_opt() {
                    Some(next) => next,
                    None => break,
                };
            }
        }

        Ok(Astro {
            body,
            latitude,
            longitude,
            timezone,
            year: year.to_string(),
            heights,
            phase_day_num,
        })
    }

    fn push_sample(
        heights: &mut BTreeMap<NaiveDate, DaySeries>,
        body: Body,
        t: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        delta_t: f64,
        timezone: Tz,
    ) -> Result<(), AstroError> {
        let altitude_deg = match body {
            Body::Sun => spa::solar_position(
                t,
                latitude,
                longitude,
                0.0,
                delta_t,
                Some(
                    RefractionCorrection::new(1013.25, 15.0)
                        .map_err(|e| AstroError::SolarPosition(e.to_string()))?,
                ),
            )
            .map_err(|e| AstroError::SolarPosition(e.to_string()))?
                .elevation_angle(),
            Body::Moon => lunar::altitude_deg(t, latitude, longitude),
        };
        let local = t.with_timezone(&timezone);
        heights.entry(local.date_naive()).or_default().push(Sample {
            stamp: local,
            value: altitude_deg.to_radians().sin(),
        });
        Ok(())
    }
}
