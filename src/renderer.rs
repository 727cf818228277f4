//! Month page composition and day cell rendering.
//!
//! One page per month: a title row, weekday headers, and a 7-column grid
//! where every calendar day owns a pair of vertically stacked cells: the
//! sun/moon illumination strip above, the tide curve below. Pages are
//! composed and flushed strictly in calendar order; the only non-fatal
//! failure on this path is the decorative logo.

use chrono::Datelike;
use chrono_tz::Tz;
use image::DynamicImage;
use printpdf::PdfLayerReference;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::astro::Astro;
use crate::calendar::{self, CalendarError};
use crate::config::AssetConfig;
use crate::document::{
    self, blend_over_white, centered_text, right_text, stroke_line, CalendarDocument,
    DocumentError, DocumentMeta, Fonts, Rgb01,
};
use crate::layout::{
    self, cell_rect, day_window, MonthLayout, Rect, DAY_NAMES, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
};
use crate::tides::Tides;

/// Fixed Author string for the document metadata.
const AUTHOR: &str = "Sara Hendrix, CruzViz";

/// 28-symbol lunar glyph table: position 0 is new moon, positions 1-27
/// are sequential phase letters with the 14th (`@`) marking full moon.
const MOON_GLYPHS: &str = "0ABCDEFGHIJKLM@NOPQRSTUVWXYZ";

const SUN_FILL: Rgb01 = (1.0, 0.922, 0.0); // #FFEB00
const MOON_FILL: Rgb01 = (0.843, 0.659, 0.659); // #D7A8A8 at alpha 0.2
const TIDE_FILL: Rgb01 = (0.322, 0.671, 0.718); // #52ABB7 at alpha 0.8
const MOON_ALPHA: f32 = 0.2;
const TIDE_ALPHA: f32 = 0.8;

const BORDER: Rgb01 = (0.0, 0.0, 0.0);
const HEAVY_PT: f32 = 1.5;
const LIGHT_PT: f32 = 0.5;

/// Errors during page composition.
#[derive(Error, Debug)]
pub enum RenderError {
    /// An upstream context is missing a date the calendar needs; a
    /// precondition violation, fatal for the run.
    #[error("{context} series has no entry for {date}")]
    MissingDate {
        context: &'static str,
        date: String,
    },

    /// Local midnight could not be resolved for a date.
    #[error("no local day window for {date} in zone {zone}")]
    DayWindow { date: String, zone: Tz },

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Generate the complete annual calendar PDF at `output`.
///
/// Pages are composed and appended January through December; each month's
/// drawing state is released before the next begins. Document metadata is
/// attached at the end.
pub fn generate_annual_calendar(
    tides: &Tides,
    sun: &Astro,
    moon: &Astro,
    assets: &AssetConfig,
    output: &Path,
) -> Result<(), RenderError> {
    let title = format!("Sun * Moon * Tide {} Calendar", tides.year);
    let mut doc = CalendarDocument::new(&title, assets)?;
    let logo = load_logo(assets);

    for month in calendar::months_in_year(&tides.year)? {
        let layer = doc.next_page();
        month_page(&layer, doc.fonts(), &month, tides, sun, moon, logo.as_ref())?;
        info!(month = %month, "page composed");
    }

    doc.save(
        output,
        &DocumentMeta {
            title,
            author: AUTHOR.to_string(),
            subject: tides.place_name(),
        },
    )?;
    Ok(())
}

/// Best-effort logo load; a failure is reported and rendering continues
/// without it.
fn load_logo(assets: &AssetConfig) -> Option<DynamicImage> {
    let path = assets.logo.as_ref()?;
    match image::open(path) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!(path = %path.display(), error = %e,
                  "could not load logo image, continuing without it");
            None
        }
    }
}

/// Compose one month's page onto `layer`.
pub fn month_page(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    year_month: &str,
    tides: &Tides,
    sun: &Astro,
    moon: &Astro,
    logo: Option<&DynamicImage>,
) -> Result<MonthLayout, RenderError> {
    let plan = layout::month_layout(year_month)?;

    for (date, index) in &plan.cells {
        plot_date(layer, fonts, *index, date, tides, sun, moon)?;
    }

    // Weekday names above the first calendar row, one per column.
    for (col, name) in DAY_NAMES.iter().enumerate() {
        let rect = cell_rect(col);
        centered_text(
            layer,
            &fonts.text,
            12.0,
            rect.x + rect.w / 2.0,
            rect.top() + 0.08 * rect.h,
            name,
        );
    }

    // Empty bordered cell pairs ahead of the month's first day.
    for col in 0..plan.init_day {
        blank_pair(layer, col, plan.init_day);
    }

    text_titles(layer, fonts, &plan, tides);

    if let Some(logo) = logo {
        // Matches the source artwork placement: right of center, just
        // above the bottom margin.
        document::embed_logo(
            layer,
            logo,
            PAGE_WIDTH_MM * 0.594,
            PAGE_HEIGHT_MM * 0.064,
            30.0,
        );
    }

    Ok(plan)
}

fn text_titles(layer: &PdfLayerReference, fonts: &Fonts, plan: &MonthLayout, tides: &Tides) {
    document::text(
        layer,
        &fonts.text,
        72.0,
        PAGE_WIDTH_MM * 0.05,
        PAGE_HEIGHT_MM * 0.875,
        &plan.month_title,
    );
    right_text(
        layer,
        &fonts.text,
        72.0,
        PAGE_WIDTH_MM * 0.92,
        PAGE_HEIGHT_MM * 0.875,
        &plan.year_title,
    );
    right_text(
        layer,
        &fonts.display,
        36.0,
        PAGE_WIDTH_MM * 0.92,
        PAGE_HEIGHT_MM * 0.13,
        "Sun * Moon * Tide",
    );
    right_text(
        layer,
        &fonts.text,
        16.0,
        PAGE_WIDTH_MM * 0.92,
        PAGE_HEIGHT_MM * 0.10,
        &tides.place_name(),
    );
}

/// Glyph for a lunation-day index.
fn moon_glyph(phase_day: u8) -> char {
    MOON_GLYPHS
        .chars()
        .nth(phase_day as usize % MOON_GLYPHS.len())
        .unwrap_or('0')
}

/// Draw one date's cell pair at grid `index` (illumination) and
/// `index + 7` (tide). Returns the two cell rectangles.
fn plot_date(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    index: usize,
    date: &str,
    tides: &Tides,
    sun: &Astro,
    moon: &Astro,
) -> Result<(Rect, Rect), RenderError> {
    let day = calendar::parse_date(date)?;
    let missing = |context: &'static str| RenderError::MissingDate {
        context,
        date: date.to_string(),
    };

    let day_of_sun = sun.heights.get(&day).ok_or_else(|| missing("sun"))?;
    let day_of_moon = moon.heights.get(&day).ok_or_else(|| missing("moon"))?;
    let day_of_tide = tides.all_tides.get(&day).ok_or_else(|| missing("tide"))?;
    let phase_day = *moon
        .phase_day_num
        .get(&day)
        .ok_or_else(|| missing("moon phase"))?;

    let (start, stop) = day_window(day, tides.timezone).ok_or_else(|| RenderError::DayWindow {
        date: date.to_string(),
        zone: tides.timezone,
    })?;

    let illum = cell_rect(index);
    let tide = cell_rect(index + 7);

    // Sun and moon heights on top, on a fixed [0, 1] scale.
    fill_series(layer, illum, day_of_sun, start, stop, 0.0, 1.0, SUN_FILL);
    fill_series(
        layer,
        illum,
        day_of_moon,
        start,
        stop,
        0.0,
        1.0,
        blend_over_white(MOON_FILL, MOON_ALPHA),
    );
    border(layer, illum, Edge::Top, HEAVY_PT);
    border(layer, illum, Edge::Left, HEAVY_PT);
    border(layer, illum, Edge::Right, HEAVY_PT);
    // No bottom border: the strip merges into the tide cell below.

    document::text(
        layer,
        &fonts.text,
        12.0,
        illum.x + 0.05 * illum.w,
        illum.y + 0.73 * illum.h,
        &day.day().to_string(),
    );
    right_text(
        layer,
        &fonts.moon,
        12.0,
        illum.x + 0.96 * illum.w,
        illum.y + 0.69 * illum.h,
        &moon_glyph(phase_day).to_string(),
    );

    // Tide magnitudes below, on the year's shared vertical scale.
    fill_series(
        layer,
        tide,
        day_of_tide,
        start,
        stop,
        tides.annual_min,
        tides.annual_max,
        blend_over_white(TIDE_FILL, TIDE_ALPHA),
    );
    border(layer, tide, Edge::Bottom, HEAVY_PT);
    border(layer, tide, Edge::Left, HEAVY_PT);
    border(layer, tide, Edge::Right, HEAVY_PT);
    border(layer, tide, Edge::Top, LIGHT_PT);

    Ok((illum, tide))
}

/// Fill the area between a day series and its zero line, clipped to the
/// cell and to the local-day window.
fn fill_series(
    layer: &PdfLayerReference,
    rect: Rect,
    series: &crate::DaySeries,
    start: chrono::DateTime<Tz>,
    stop: chrono::DateTime<Tz>,
    lo: f64,
    hi: f64,
    color: Rgb01,
) {
    let mut points: Vec<(f32, f32)> = Vec::with_capacity(series.len() + 2);
    for sample in series {
        let Some(frac) = layout::time_frac(start, stop, sample.stamp) else {
            continue;
        };
        let x = rect.x + frac as f32 * rect.w;
        let y = rect.y + layout::value_frac(sample.value, lo, hi) as f32 * rect.h;
        points.push((x, y));
    }
    if points.len() < 2 {
        return;
    }

    let baseline = rect.y + layout::value_frac(0.0, lo, hi) as f32 * rect.h;
    let first_x = points[0].0;
    let last_x = points[points.len() - 1].0;
    points.push((last_x, baseline));
    points.push((first_x, baseline));
    document::fill_polygon(layer, &points, color);
}

#[derive(Clone, Copy)]
enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

fn border(layer: &PdfLayerReference, rect: Rect, edge: Edge, width_pt: f32) {
    let (from, to) = match edge {
        Edge::Top => ((rect.x, rect.top()), (rect.right(), rect.top())),
        Edge::Bottom => ((rect.x, rect.y), (rect.right(), rect.y)),
        Edge::Left => ((rect.x, rect.y), (rect.x, rect.top())),
        Edge::Right => ((rect.right(), rect.y), (rect.right(), rect.top())),
    };
    stroke_line(layer, from, to, width_pt, BORDER);
}

/// An empty bordered cell pair in a leading column: light side borders,
/// with the grid's outer edges (first column's left, last leading
/// column's right) drawn heavy, and heavy top/bottom closing the pair.
fn blank_pair(layer: &PdfLayerReference, col: usize, init_day: usize) {
    let upper = cell_rect(col);
    let lower = cell_rect(col + 7);

    let left = if col == 0 { HEAVY_PT } else { LIGHT_PT };
    let right = if col + 1 == init_day { HEAVY_PT } else { LIGHT_PT };

    border(layer, upper, Edge::Left, left);
    border(layer, upper, Edge::Right, right);
    border(layer, upper, Edge::Top, HEAVY_PT);

    border(layer, lower, Edge::Left, left);
    border(layer, lower, Edge::Right, right);
    border(layer, lower, Edge::Bottom, HEAVY_PT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro::Body;
    use crate::{DaySeries, Sample};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn pacific() -> Tz {
        "US/Pacific".parse().unwrap()
    }

    fn day_series(date: NaiveDate, values: &[f64]) -> DaySeries {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| Sample {
                stamp: crate::localize(
                    date.and_hms_opt(i as u32 * 6, 30, 0).unwrap(),
                    pacific(),
                )
                .unwrap(),
                value,
            })
            .collect()
    }

    fn synth_tides(dates: &[NaiveDate]) -> Tides {
        let mut all_tides = BTreeMap::new();
        for &d in dates {
            all_tides.insert(d, day_series(d, &[1.0, 4.5, -0.5, 3.2]));
        }
        Tides {
            station_id: "9413745".into(),
            station_name: "Santa Cruz".into(),
            state: "CA".into(),
            latitude: 36.9581,
            longitude: -122.0172,
            timezone: pacific(),
            year: "2015".into(),
            annual_min: -1.5,
            annual_max: 6.0,
            all_tides,
        }
    }

    fn synth_astro(body: Body, dates: &[NaiveDate]) -> Astro {
        let mut heights = BTreeMap::new();
        let mut phase_day_num = BTreeMap::new();
        for (i, &d) in dates.iter().enumerate() {
            heights.insert(d, day_series(d, &[-0.3, 0.9, 0.4, -0.6]));
            if body == Body::Moon {
                phase_day_num.insert(d, (i % 28) as u8);
            }
        }
        Astro {
            body,
            latitude: 36.9581,
            longitude: -122.0172,
            timezone: pacific(),
            year: "2015".into(),
            heights,
            phase_day_num,
        }
    }

    fn july_dates() -> Vec<NaiveDate> {
        (1..=31)
            .map(|d| NaiveDate::from_ymd_opt(2015, 7, d).unwrap())
            .collect()
    }

    #[test]
    fn moon_glyph_table_mapping() {
        assert_eq!(moon_glyph(0), '0'); // new moon
        assert_eq!(moon_glyph(1), 'A');
        assert_eq!(moon_glyph(13), 'M');
        assert_eq!(moon_glyph(14), '@'); // full moon
        assert_eq!(moon_glyph(15), 'N');
        assert_eq!(moon_glyph(27), 'Z');
    }

    #[test]
    fn july_page_composes_with_three_leading_blanks() {
        let dates = july_dates();
        let tides = synth_tides(&dates);
        let sun = synth_astro(Body::Sun, &dates);
        let moon = synth_astro(Body::Moon, &dates);

        let mut doc = CalendarDocument::new("test", &AssetConfig::default()).unwrap();
        let layer = doc.next_page();
        let plan = month_page(&layer, doc.fonts(), "2015-07", &tides, &sun, &moon, None).unwrap();

        assert_eq!(plan.init_day, 3);
        assert_eq!(plan.cells.len(), 31);
        assert_eq!(plan.month_title, "July");
        assert_eq!(plan.year_title, "2015");
    }

    #[test]
    fn missing_tide_date_aborts_and_names_the_date() {
        let dates = july_dates();
        let mut tides = synth_tides(&dates);
        tides
            .all_tides
            .remove(&NaiveDate::from_ymd_opt(2015, 7, 20).unwrap());
        let sun = synth_astro(Body::Sun, &dates);
        let moon = synth_astro(Body::Moon, &dates);

        let mut doc = CalendarDocument::new("test", &AssetConfig::default()).unwrap();
        let layer = doc.next_page();
        let err = month_page(&layer, doc.fonts(), "2015-07", &tides, &sun, &moon, None)
            .unwrap_err();
        assert!(
            err.to_string().contains("2015-07-20"),
            "diagnostic must name the missing date: {err}"
        );
        assert!(err.to_string().contains("tide"), "{err}");
    }

    #[test]
    fn missing_phase_index_is_fatal_too() {
        let dates = july_dates();
        let tides = synth_tides(&dates);
        let sun = synth_astro(Body::Sun, &dates);
        let mut moon = synth_astro(Body::Moon, &dates);
        moon.phase_day_num
            .remove(&NaiveDate::from_ymd_opt(2015, 7, 4).unwrap());

        let mut doc = CalendarDocument::new("test", &AssetConfig::default()).unwrap();
        let layer = doc.next_page();
        let err = month_page(&layer, doc.fonts(), "2015-07", &tides, &sun, &moon, None)
            .unwrap_err();
        assert!(err.to_string().contains("2015-07-04"), "{err}");
    }

    #[test]
    fn unconfigured_logo_is_simply_absent() {
        assert!(load_logo(&AssetConfig::default()).is_none());
    }

    #[test]
    fn broken_logo_path_is_non_fatal() {
        let assets = AssetConfig {
            logo: Some("/nonexistent/logo.png".into()),
            ..Default::default()
        };
        assert!(load_logo(&assets).is_none());
    }
}
