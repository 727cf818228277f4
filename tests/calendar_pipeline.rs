//! End-to-end pipeline test: synthetic NOAA annual file -> tide and astro
//! contexts -> twelve-page calendar PDF.

use chrono::{Datelike, Duration, NaiveDate, Timelike};
use std::fmt::Write as _;
use std::fs;

use sunmoontide::astro::{Astro, Body};
use sunmoontide::config::AssetConfig;
use sunmoontide::layout;
use sunmoontide::renderer;
use sunmoontide::tides::Tides;

/// Build a plausible NOAA annual high/low prediction file for Santa Cruz,
/// 2015: alternating extremes roughly 6h13m apart, skipping wall-clock
/// times that never existed (the spring-forward hour), as real LST/LDT
/// files do.
fn synthetic_noaa_file() -> String {
    let mut text = String::from(
        "NOAA/NOS/CO-OPS\n\
         Disclaimer: These data are based upon the latest information available.\n\
         Product Type: Annual Tide Prediction\n\
         Interval Type: High/Low Tide Predictions\n\
         Time Zone: LST/LDT\n\
         Units: Feet\n\
         Stationid: 9413745\n\
         StationName: Santa Cruz\n\
         State: CA\n\
         \n\
         Date  Day  Time  Pred(Ft)  Pred(cm)  High/Low\n",
    );

    let heights = [1.2_f64, 5.8, -0.7, 4.6];
    let mut t = NaiveDate::from_ymd_opt(2015, 1, 1)
        .unwrap()
        .and_hms_opt(2, 0, 0)
        .unwrap();
    let mut i = 0usize;
    while t.year() == 2015 {
        // 2015-03-08 02:xx never happened in the Pacific zone.
        let spring_forward =
            t.date() == NaiveDate::from_ymd_opt(2015, 3, 8).unwrap() && t.hour() == 2;
        if !spring_forward {
            let h = heights[i % 4];
            writeln!(
                text,
                "{}  {}  {}  {:.2}  {:.0}  {}",
                t.format("%Y/%m/%d"),
                t.format("%a"),
                t.format("%I:%M %p"),
                h,
                h * 30.48,
                if h > 2.0 { "H" } else { "L" },
            )
            .unwrap();
        }
        t += Duration::minutes(373);
        i += 1;
    }
    text
}

#[test]
fn full_year_generates_a_twelve_page_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let noaa_path = dir.path().join("9413745_annual.txt");
    fs::write(&noaa_path, synthetic_noaa_file()).unwrap();

    let tides = Tides::from_noaa_file(&noaa_path).unwrap();
    assert_eq!(tides.place_name(), "Santa Cruz, CA");
    assert_eq!(tides.year, "2015");
    assert!((tides.annual_min - -0.7).abs() < 1e-9);
    assert!((tides.annual_max - 5.8).abs() < 1e-9);
    // Every day of the year has tide samples.
    for month in 1..=12u32 {
        for day in [1, 15] {
            let date = NaiveDate::from_ymd_opt(2015, month, day).unwrap();
            assert!(tides.all_tides.contains_key(&date), "no tides for {date}");
        }
    }

    let sun = Astro::new(
        Body::Sun,
        tides.latitude,
        tides.longitude,
        tides.timezone,
        &tides.year,
    )
    .unwrap();
    let moon = Astro::new(
        Body::Moon,
        tides.latitude,
        tides.longitude,
        tides.timezone,
        &tides.year,
    )
    .unwrap();

    let pdf_path = dir.path().join("SunMoonTide_9413745_2015.pdf");
    renderer::generate_annual_calendar(&tides, &sun, &moon, &AssetConfig::default(), &pdf_path)
        .unwrap();

    let bytes = fs::read(&pdf_path).unwrap();
    assert!(bytes.starts_with(b"%PDF"), "output is not a PDF");

    let reloaded = lopdf::Document::load(&pdf_path).unwrap();
    assert_eq!(reloaded.get_pages().len(), 12, "one page per month");

    let info_ref = reloaded
        .trailer
        .get(b"Info")
        .unwrap()
        .as_reference()
        .unwrap();
    let info = reloaded.get_object(info_ref).unwrap().as_dict().unwrap();
    assert!(info.has(b"Title"));
    assert!(info.has(b"Subject"));
    assert!(info.has(b"CreationDate"));
}

#[test]
fn july_2015_layout_matches_the_calendar() {
    // July 1, 2015 was a Wednesday: three leading blanks, 31 day pairs.
    let plan = layout::month_layout("2015-07").unwrap();
    assert_eq!(plan.init_day, 3);
    assert_eq!(plan.cells.len(), 31);
    assert_eq!(plan.cells[0], ("2015-07-01".to_string(), 3));
    assert_eq!(plan.month_title, "July");
    assert_eq!(plan.year_title, "2015");
}

#[test]
fn missing_tide_day_aborts_generation_with_the_date() {
    let dir = tempfile::tempdir().unwrap();
    let noaa_path = dir.path().join("9413745_annual.txt");
    fs::write(&noaa_path, synthetic_noaa_file()).unwrap();

    let mut tides = Tides::from_noaa_file(&noaa_path).unwrap();
    tides
        .all_tides
        .remove(&NaiveDate::from_ymd_opt(2015, 2, 14).unwrap());

    let sun = Astro::new(
        Body::Sun,
        tides.latitude,
        tides.longitude,
        tides.timezone,
        &tides.year,
    )
    .unwrap();
    let moon = Astro::new(
        Body::Moon,
        tides.latitude,
        tides.longitude,
        tides.timezone,
        &tides.year,
    )
    .unwrap();

    let pdf_path = dir.path().join("never_written.pdf");
    let err = renderer::generate_annual_calendar(
        &tides,
        &sun,
        &moon,
        &AssetConfig::default(),
        &pdf_path,
    )
    .unwrap_err();
    assert!(
        err.to_string().contains("2015-02-14"),
        "diagnostic must name the missing date: {err}"
    );
}
