//! Command-line entry point: NOAA annual tide file in, calendar PDF out.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sunmoontide::astro::{Astro, Body};
use sunmoontide::config::Config;
use sunmoontide::renderer;
use sunmoontide::tides::Tides;

/// Generate an annual Sun * Moon * Tide wall calendar PDF.
#[derive(Parser)]
#[command(name = "sunmoontide", version, about)]
struct Cli {
    /// NOAA annual tide prediction text file.
    input: PathBuf,

    /// Output PDF path; defaults to the config file's name, then to
    /// SunMoonTide_<station>_<year>.pdf.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(short, long, default_value = "sunmoontide.toml")]
    config: PathBuf,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Initialize tracing based on CLI verbosity; `RUST_LOG` overrides.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sunmoontide={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_from_path(&cli.config);

    let tides = Tides::from_noaa_file(&cli.input)
        .with_context(|| format!("reading NOAA tide file {}", cli.input.display()))?;
    info!(
        station = %tides.place_name(),
        year = %tides.year,
        "parsed NOAA tide predictions"
    );

    let sun = Astro::new(
        Body::Sun,
        tides.latitude,
        tides.longitude,
        tides.timezone,
        &tides.year,
    )
    .context("computing solar altitudes")?;
    info!("solar context complete");

    let moon = Astro::new(
        Body::Moon,
        tides.latitude,
        tides.longitude,
        tides.timezone,
        &tides.year,
    )
    .context("computing lunar altitudes and phases")?;
    info!("lunar context complete");

    let output = cli
        .output
        .or_else(|| config.output.file_name.clone().map(PathBuf::from))
        .unwrap_or_else(|| {
            PathBuf::from(format!(
                "SunMoonTide_{}_{}.pdf",
                tides.station_id, tides.year
            ))
        });

    renderer::generate_annual_calendar(&tides, &sun, &moon, &config.assets, &output)
        .context("generating calendar")?;
    info!(path = %output.display(), "calendar complete");
    println!("Calendar written to {}", output.display());

    Ok(())
}
