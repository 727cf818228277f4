//! Month-grid placement for calendar pages.
//!
//! A month page is a 12-row, 7-column grid of subplot cells with no
//! spacing. Calendar weeks occupy two grid rows each: the upper row holds
//! sun/moon illumination strips, the lower row the paired tide curves, so
//! a day at grid index `i` draws into cells `i` and `i + 7`. The cursor
//! walks +1 per day and jumps +8 after a Saturday, skipping the tide row
//! to land on the next week's Sunday cell.
//!
//! Two weekday conventions are in play, on purpose: column placement uses
//! Sunday = 0 (US calendar convention), while the Saturday test uses the
//! Monday = 0 numbering. Both values are computed independently here.

use chrono::{DateTime, Datelike, NaiveDate};
use chrono_tz::Tz;

use crate::calendar::{self, CalendarError};
use crate::localize;

/// US Letter, in millimeters (8.5 x 11 in).
pub const PAGE_WIDTH_MM: f32 = 215.9;
pub const PAGE_HEIGHT_MM: f32 = 279.4;

/// Grid margins as fractions of the page.
const MARGIN_LEFT: f32 = 0.05;
const MARGIN_RIGHT: f32 = 0.95;
const MARGIN_BOTTOM: f32 = 0.10;
const MARGIN_TOP: f32 = 0.80;

pub const GRID_COLS: usize = 7;
pub const GRID_ROWS: usize = 12;

/// Weekday header labels, Sunday first.
pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// A cell rectangle in page millimeters; `y` is the bottom edge measured
/// from the page bottom (PDF orientation).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn top(&self) -> f32 {
        self.y + self.h
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }
}

/// Rectangle of the grid cell at `index` (row-major, row 0 at the top).
pub fn cell_rect(index: usize) -> Rect {
    debug_assert!(index < GRID_COLS * GRID_ROWS);
    let col = index % GRID_COLS;
    let row = index / GRID_COLS;
    let cell_w = PAGE_WIDTH_MM * (MARGIN_RIGHT - MARGIN_LEFT) / GRID_COLS as f32;
    let cell_h = PAGE_HEIGHT_MM * (MARGIN_TOP - MARGIN_BOTTOM) / GRID_ROWS as f32;
    Rect {
        x: PAGE_WIDTH_MM * MARGIN_LEFT + col as f32 * cell_w,
        y: PAGE_HEIGHT_MM * MARGIN_TOP - (row as f32 + 1.0) * cell_h,
        w: cell_w,
        h: cell_h,
    }
}

/// Column of the month's first day under the Sunday = 0 convention.
pub fn init_day(first_of_month: NaiveDate) -> usize {
    first_of_month.weekday().num_days_from_sunday() as usize
}

/// Next grid cursor position after drawing `date` at `index`: +8 after a
/// Saturday (Monday = 0 numbering), +1 otherwise.
pub fn advance(index: usize, date: NaiveDate) -> usize {
    if date.weekday().num_days_from_monday() == 5 {
        index + 8
    } else {
        index + 1
    }
}

/// The complete placement plan for one month page.
#[derive(Clone, Debug)]
pub struct MonthLayout {
    /// `YYYY-MM` identifier this plan was built from.
    pub year_month: String,
    /// Month name for the page title, e.g. `"July"`.
    pub month_title: String,
    /// Year for the page title, e.g. `"2015"`.
    pub year_title: String,
    /// Leading blank cell-pair count; also the first day's column.
    pub init_day: usize,
    /// `(date, illumination grid index)` per day, ascending. The paired
    /// tide cell is at `index + 7`.
    pub cells: Vec<(String, usize)>,
}

/// Build the grid placement for `year_month`, walking the cursor over the
/// month's days.
pub fn month_layout(year_month: &str) -> Result<MonthLayout, CalendarError> {
    let first = calendar::parse_year_month(year_month)?;
    let init = init_day(first);

    let mut cells = Vec::with_capacity(31);
    let mut cursor = init;
    for date in calendar::days_in_month(year_month)? {
        let day = calendar::parse_date(&date)?;
        cells.push((date, cursor));
        cursor = advance(cursor, day);
    }

    Ok(MonthLayout {
        year_month: year_month.to_string(),
        month_title: first.format("%B").to_string(),
        year_title: first.format("%Y").to_string(),
        init_day: init,
        cells,
    })
}

/// The plotting window for `date`: local midnight through 23:59, in the
/// station's zone. `None` if midnight falls in a DST gap (it does not, in
/// any real zone, but the contract is explicit).
pub fn day_window(date: NaiveDate, tz: Tz) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
    let start = localize(date.and_hms_opt(0, 0, 0)?, tz)?;
    let stop = localize(date.and_hms_opt(23, 59, 0)?, tz)?;
    Some((start, stop))
}

/// Horizontal position of `t` within `[start, stop]` as a fraction in
/// [0, 1]; `None` when `t` lies outside the window.
pub fn time_frac(start: DateTime<Tz>, stop: DateTime<Tz>, t: DateTime<Tz>) -> Option<f64> {
    if t < start || t > stop {
        return None;
    }
    let span = (stop - start).num_seconds() as f64;
    Some((t - start).num_seconds() as f64 / span)
}

/// Vertical position of `value` within `[lo, hi]`, clamped to [0, 1].
pub fn value_frac(value: f64, lo: f64, hi: f64) -> f64 {
    debug_assert!(hi > lo);
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}
