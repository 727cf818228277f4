//! NOAA annual tide-prediction file parsing.
//!
//! A NOAA annual file carries a `key: value` header block, a blank line, a
//! column-name line, then one whitespace-delimited row per predicted
//! high/low extreme. This module validates the format, resolves the
//! station against an embedded lookup table, and interpolates the sparse
//! extremes into a smooth per-day height series (tides are close enough to
//! half sine waves between successive highs and lows for a calendar plot).
//!
//! All failures here are fatal: a file that does not look like an annual
//! prediction, an unknown station id, or a malformed row aborts the run
//! with a diagnostic naming the offending piece of input.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

use crate::{localize, DaySeries, Sample};

/// Interpolation resolution per high/low interval, endpoints included.
/// High because some stations have sparse extremes.
const RESOLUTION: usize = 200;

/// Hours the interpolated series is extended past the first and last
/// extremes, so Jan 1 and Dec 31 do not start or stop mid-day.
const END_EXTENSION_HRS: i64 = 7;

/// Embedded station lookup table (id, name, state, coordinates, zone).
static STATION_INFO_CSV: &str = include_str!("../data/station_info.csv");

/// Errors from reading and interpreting a NOAA annual tide file.
#[derive(Error, Debug)]
pub enum TideError {
    /// The input file could not be read at all.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A header format check failed; the file is not an annual
    /// high/low prediction in the expected layout.
    #[error("NOAA header check failed: {0}")]
    Header(String),

    /// The station id is missing from the embedded lookup table.
    #[error("station id {0:?} is not in the station lookup table")]
    UnknownStation(String),

    /// The embedded lookup table itself failed to parse.
    #[error("station lookup table is corrupt: {0}")]
    StationTable(#[from] csv::Error),

    /// The station's time zone name is not a known IANA zone.
    #[error("unknown time zone {0:?} for station {1}")]
    BadTimezone(String, String),

    /// A prediction row did not parse.
    #[error("line {line}: malformed tide prediction row: {detail}")]
    BadRow { line: usize, detail: String },

    /// A row's wall-clock time does not exist in the station zone.
    #[error("line {line}: local time {time} does not exist in zone {zone}")]
    NonexistentTime {
        line: usize,
        time: String,
        zone: Tz,
    },

    /// Fewer than two extremes; nothing to interpolate between.
    #[error("file contains fewer than two tide extremes")]
    TooFewExtremes,
}

/// Station lookup record, one row of `station_info.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct StationInfo {
    #[serde(rename = "StationID")]
    pub id: String,
    #[serde(rename = "StationName")]
    pub name: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "StationType")]
    pub station_type: String,
    #[serde(rename = "Timezone")]
    pub timezone: String,
}

/// Look a NOAA station id up in the embedded table.
pub fn lookup_station_info(station_id: &str) -> Result<StationInfo, TideError> {
    let mut reader = csv::Reader::from_reader(STATION_INFO_CSV.as_bytes());
    for record in reader.deserialize() {
        let info: StationInfo = record?;
        if info.id == station_id {
            return Ok(info);
        }
    }
    Err(TideError::UnknownStation(station_id.to_string()))
}

/// Everything the calendar needs from one NOAA annual tide file.
#[derive(Debug, Clone)]
pub struct Tides {
    pub station_id: String,
    pub station_name: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Station IANA time zone; every timestamp below is in this zone.
    pub timezone: Tz,
    /// 4-digit prediction year.
    pub year: String,
    /// Lowest predicted height of the year (feet).
    pub annual_min: f64,
    /// Highest predicted height of the year (feet).
    pub annual_max: f64,
    /// Local calendar date -> ascending interpolated height samples.
    pub all_tides: BTreeMap<NaiveDate, DaySeries>,
}

impl Tides {
    /// Read and interpret a NOAA annual tide prediction file.
    pub fn from_noaa_file(path: &Path) -> Result<Self, TideError> {
        let text = fs::read_to_string(path).map_err(|source| TideError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_noaa_text(&text)
    }

    /// Interpret NOAA annual tide prediction file contents.
    pub fn from_noaa_text(text: &str) -> Result<Self, TideError> {
        let header = read_noaa_header(text)?;
        let station_id = header
            .metadata
            .get("Stationid")
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let info = lookup_station_info(&station_id)?;
        let timezone: Tz = info
            .timezone
            .parse()
            .map_err(|_| TideError::BadTimezone(info.timezone.clone(), station_id.clone()))?;

        let extremes = parse_rows(text, header.data_start_line, timezone)?;
        if extremes.len() < 2 {
            return Err(TideError::TooFewExtremes);
        }

        let annual_min = extremes.iter().map(|e| e.1).fold(f64::INFINITY, f64::min);
        let annual_max = extremes
            .iter()
            .map(|e| e.1)
            .fold(f64::NEG_INFINITY, f64::max);

        // Year from a mid-file extreme, dodging any edge rows.
        let year = extremes[extremes.len() / 2].0.year().to_string();

        let interpolated = build_all_tides(&extremes, RESOLUTION, true);
        let mut all_tides: BTreeMap<NaiveDate, DaySeries> = BTreeMap::new();
        for sample in interpolated {
            all_tides
                .entry(sample.stamp.date_naive())
                .or_default()
                .push(sample);
        }

        Ok(Tides {
            station_id,
            station_name: info.name,
            state: info.state,
            latitude: info.latitude,
            longitude: info.longitude,
            timezone,
            year,
            annual_min,
            annual_max,
            all_tides,
        })
    }

    /// `"Station Name, ST"` for page annotations and document metadata.
    pub fn place_name(&self) -> String {
        format!("{}, {}", self.station_name, self.state)
    }
}

#[derive(Debug)]
struct NoaaHeader {
    metadata: HashMap<String, String>,
    /// 0-based line index of the first data row.
    data_start_line: usize,
}

/// Parse the `key: value` header block and validate the file format.
///
/// The header ends at the first blank line; the line after it must be the
/// column-name row `Date Day Time Pred(Ft) Pred(cm) High/Low`.
fn read_noaa_header(text: &str) -> Result<NoaaHeader, TideError> {
    let mut metadata = HashMap::new();
    let mut lines = text.lines().enumerate();

    let mut column_line = None;
    while let Some((_, line)) = lines.next() {
        if line.trim().is_empty() {
            // Header done; the next line carries the column names.
            column_line = lines.next();
            break;
        }
        match line.split_once(": ") {
            Some((k, v)) => metadata.insert(k.to_string(), v.to_string()),
            None => metadata.insert(line.to_string(), String::new()),
        };
    }

    let check = |ok: bool, what: &str| -> Result<(), TideError> {
        if ok {
            Ok(())
        } else {
            Err(TideError::Header(format!(
                "{what}; expected a NOAA Annual Tide Prediction text file"
            )))
        }
    };

    check(
        metadata.contains_key("NOAA/NOS/CO-OPS"),
        "missing NOAA/NOS/CO-OPS banner",
    )?;
    check(
        metadata.get("Product Type").map(|v| v.trim()) == Some("Annual Tide Prediction"),
        "product type is not 'Annual Tide Prediction'",
    )?;
    check(
        metadata.get("Interval Type").map(|v| v.trim()) == Some("High/Low Tide Predictions"),
        "interval type is not 'High/Low Tide Predictions'",
    )?;
    check(
        metadata
            .get("Time Zone")
            .is_some_and(|v| v.contains("LST")),
        "time zone is not local standard time (LST)",
    )?;
    check(
        metadata.get("Stationid").is_some_and(|v| !v.trim().is_empty()),
        "missing Stationid",
    )?;

    let (column_idx, column_names) =
        column_line.ok_or_else(|| TideError::Header("missing column-name line".into()))?;
    let expected = ["Date", "Day", "Time", "Pred(Ft)", "Pred(cm)", "High/Low"];
    check(
        column_names.split_whitespace().eq(expected),
        "unexpected column names",
    )?;

    Ok(NoaaHeader {
        metadata,
        data_start_line: column_idx + 1,
    })
}

/// Parse the whitespace-delimited prediction rows into localized
/// `(timestamp, height-ft)` extremes.
fn parse_rows(
    text: &str,
    data_start_line: usize,
    tz: Tz,
) -> Result<Vec<(chrono::DateTime<Tz>, f64)>, TideError> {
    let mut extremes = Vec::new();
    for (idx, line) in text.lines().enumerate().skip(data_start_line) {
        if line.trim().is_empty() {
            continue;
        }
        let lineno = idx + 1;
        let bad_row = |detail: String| TideError::BadRow {
            line: lineno,
            detail,
        };

        let tokens: Vec<&str> = line.split_whitespace().collect();
        // Date, Day, Time, AM/PM, ft, cm, High/Low
        if tokens.len() != 7 {
            return Err(bad_row(format!(
                "expected 7 whitespace-separated fields, found {}",
                tokens.len()
            )));
        }

        let date = NaiveDate::parse_from_str(tokens[0], "%Y/%m/%d")
            .or_else(|_| NaiveDate::parse_from_str(tokens[0], "%m/%d/%Y"))
            .map_err(|_| bad_row(format!("unparseable date {:?}", tokens[0])))?;
        let time = NaiveTime::parse_from_str(&format!("{} {}", tokens[2], tokens[3]), "%I:%M %p")
            .map_err(|_| bad_row(format!("unparseable time {:?} {:?}", tokens[2], tokens[3])))?;
        let height: f64 = tokens[4]
            .parse()
            .map_err(|_| bad_row(format!("unparseable height {:?}", tokens[4])))?;

        let naive = date.and_time(time);
        let stamp = localize(naive, tz).ok_or_else(|| TideError::NonexistentTime {
            line: lineno,
            time: naive.to_string(),
            zone: tz,
        })?;
        extremes.push((stamp, height));
    }
    Ok(extremes)
}

/// Interpolate a half sine wave between two heights.
///
/// Returns `resolution` values with `y[0] == h1` and `y[last] == h2`:
/// peak-to-trough for `h1 > h2`, trough-to-peak for `h1 < h2`, flat when
/// equal. With `remove_end` the final value (`h2`) is dropped, which keeps
/// appended intervals free of duplicate points.
fn sine_interp(h1: f64, h2: f64, resolution: usize, remove_end: bool) -> Vec<f64> {
    assert!(resolution > 2);
    let amp = (h1.max(h2) - h1.min(h2)) / 2.0;
    let offset = h1.max(h2) - amp;
    let (x0, x1) = if h1 < h2 {
        (-PI / 2.0, PI / 2.0)
    } else {
        (PI / 2.0, 3.0 * PI / 2.0)
    };

    let n = if remove_end { resolution - 1 } else { resolution };
    (0..n)
        .map(|i| {
            let x = x0 + (x1 - x0) * i as f64 / (resolution - 1) as f64;
            amp * x.sin() + offset
        })
        .collect()
}

/// Expand sparse high/low extremes into a dense sine-interpolated series.
///
/// Each interval between successive extremes gets `resolution` evenly
/// spaced points (last point dropped except for the final extreme). With
/// `extend_ends` the series is padded [`END_EXTENSION_HRS`] before the
/// first extreme (mirroring the second height) and after the last
/// (mirroring the next-to-last), so the year's first and last days are
/// covered from midnight to midnight.
fn build_all_tides(
    extremes: &[(chrono::DateTime<Tz>, f64)],
    resolution: usize,
    extend_ends: bool,
) -> Vec<Sample> {
    let steps = (resolution - 1) as i32;
    let mut samples = Vec::new();

    if extend_ends {
        let lead = sine_interp(extremes[1].1, extremes[0].1, resolution, true);
        let start = extremes[0].0 - Duration::hours(END_EXTENSION_HRS);
        let step = Duration::hours(END_EXTENSION_HRS) / steps;
        for (i, value) in lead.into_iter().enumerate() {
            samples.push(Sample {
                stamp: start + step * i as i32,
                value,
            });
        }
    }

    for pair in extremes.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let values = sine_interp(a.1, b.1, resolution, true);
        let step = (b.0 - a.0) / steps;
        for (i, value) in values.into_iter().enumerate() {
            samples.push(Sample {
                stamp: a.0 + step * i as i32,
                value,
            });
        }
    }

    // The last extreme itself, left out by the interval loop.
    let last = extremes[extremes.len() - 1];
    samples.push(Sample {
        stamp: last.0,
        value: last.1,
    });

    if extend_ends {
        let tail = sine_interp(last.1, extremes[extremes.len() - 2].1, resolution, false);
        let start = last.0 + Duration::seconds(10);
        let step = Duration::hours(END_EXTENSION_HRS) / steps;
        for (i, value) in tail.into_iter().enumerate() {
            samples.push(Sample {
                stamp: start + step * i as i32,
                value,
            });
        }
    }

    samples
}
