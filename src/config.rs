//! Configuration loaded from `sunmoontide.toml`.
//!
//! Everything here is optional: the calendar renders with builtin fonts
//! and no logo when the file is absent or incomplete. Invalid files fall
//! back to defaults with a warning rather than aborting, since none of
//! these settings affect the calendar's data.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Output document settings.
    pub output: OutputConfig,
    /// Optional decorative assets.
    pub assets: AssetConfig,
}

/// Output document settings.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output PDF file name. When unset, derived from the station id and
    /// year (`SunMoonTide_<station>_<year>.pdf`).
    pub file_name: Option<String>,
}

/// Optional decorative assets; all best-effort at render time.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Logo image overlaid on each month page.
    pub logo: Option<PathBuf>,
    /// TTF for titles, day numbers and labels; builtin Helvetica if unset
    /// or unloadable.
    pub title_font: Option<PathBuf>,
    /// TTF whose glyphs `0`, `A`-`M`, `@`, `N`-`Z` draw the 28 moon
    /// phases; builtin fallback renders the raw table characters.
    pub moon_font: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the given path, falling back to defaults
    /// if absent or invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(path = %path.as_ref().display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.as_ref().display(), error = %e,
                          "invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.as_ref().display(), "no config file, using defaults");
                Self::default()
            }
        }
    }
}
