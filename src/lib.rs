//! # Sun * Moon * Tide Calendar Core Library
//!
//! This library turns a NOAA annual tide-prediction file into a twelve-page
//! wall-calendar PDF. Each month page is a 7-column grid of paired day
//! cells: a sun/moon illumination strip on top of a tide-height curve.
//!
//! ## Pipeline
//!
//! 1. [`tides::Tides`] parses the NOAA file: station identity, time zone,
//!    annual tide bounds, and a per-day series of sine-interpolated heights.
//! 2. [`astro::Astro`] computes per-day sin(altitude) series for the Sun
//!    (NREL SPA) and Moon (Schaefer low-precision ephemeris), plus the
//!    Moon's daily lunation index for phase glyphs.
//! 3. [`renderer::generate_annual_calendar`] walks the year month by month
//!    via [`calendar`], lays each month out with [`layout`], and streams
//!    the composed pages into a [`document::CalendarDocument`].
//!
//! Everything is single-threaded and deterministic: the contexts are
//! read-only once built, pages are appended January through December, and
//! the only recoverable failure anywhere is the optional logo image.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

pub mod astro;
pub mod calendar;
pub mod config;
pub mod document;
pub mod layout;
pub mod lunar;
pub mod renderer;
pub mod tides;

/// A single plotted measurement: a zone-aware local timestamp and a value.
///
/// The value's meaning depends on the owning context: feet above datum for
/// tides, sin(altitude) in [-1, 1] for the Sun and Moon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Timestamp in the station's time zone.
    pub stamp: DateTime<Tz>,
    /// Height at that instant.
    pub value: f64,
}

/// One local calendar day's samples, ascending in time.
pub type DaySeries = Vec<Sample>;

/// Resolve a naive local wall-clock time in `tz`.
///
/// Ambiguous times (fall-back hour) resolve to the earlier instant;
/// nonexistent times (spring-forward gap) yield `None` and are treated as
/// input-context errors by callers.
pub(crate) fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(t) => Some(t),
        chrono::LocalResult::Ambiguous(earlier, _) => Some(earlier),
        chrono::LocalResult::None => None,
    }
}
