//! # Configuration Module
//!
//! Data directory layout and tunable settings for Moodmix.
//!
//! ## Data Storage
//!
//! Moodmix keeps its library database and optional `config.json` in the
//! platform-standard data directory:
//! - Linux: `~/.local/share/moodmix/`
//! - macOS: `~/Library/Application Support/moodmix/`
//! - Windows: `%APPDATA%\moodmix\`
//!
//! Setting `MOODMIX_DATA_DIR` overrides the location.

use crate::batch::BatchScheduler;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "MOODMIX_DATA_DIR";

const DB_FILE: &str = "library.db";
const CONFIG_FILE: &str = "config.json";

/// Returns the Moodmix data directory, creating it if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The moodmix subdirectory cannot be created due to permissions
pub fn get_data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!(
                "Could not determine system data directory. Set {DATA_DIR_ENV} to choose one."
            ))?
            .join("moodmix"),
    };

    fs::create_dir_all(&dir).with_context(|| {
        format!(
            "Failed to create Moodmix data directory at {}. Please check file permissions.",
            dir.display()
        )
    })?;

    Ok(dir)
}

/// Returns the path of the library database.
///
/// # Errors
///
/// Fails when the data directory cannot be determined or created.
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Knobs for the mix engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Candidates requested per recipe slot.
    pub oversample: usize,
    /// Smallest fetch issued for a channel with a non-zero count.
    pub min_fetch: usize,
    /// Largest fetch issued for a single channel.
    pub max_fetch: usize,
    /// Concurrent discovery searches per batch.
    pub search_batch_size: usize,
    /// Pause between discovery search batches, in milliseconds.
    pub search_batch_delay_ms: u64,
    /// Discover levels at or below this use the listener's own artists.
    pub familiar_threshold: f64,
    /// Distinct artists searched in familiar mode.
    pub familiar_artist_limit: usize,
    /// Results requested per artist in familiar mode.
    pub per_artist_limit: usize,
    /// Extra results requested per seed term in outside mode.
    pub seed_padding: usize,
    /// Timeout for each provider call, in seconds.
    pub call_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            oversample: 4,
            min_fetch: 10,
            max_fetch: 200,
            search_batch_size: 5,
            search_batch_delay_ms: 250,
            familiar_threshold: 0.5,
            familiar_artist_limit: 5,
            per_artist_limit: 10,
            seed_padding: 5,
            call_timeout_secs: 15,
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }

    #[must_use]
    pub fn scheduler(&self) -> BatchScheduler {
        BatchScheduler::new(
            self.search_batch_size,
            Duration::from_millis(self.search_batch_delay_ms),
        )
    }

    /// Candidates to request for a channel allotted `count` tracks.
    #[must_use]
    pub fn fetch_limit(&self, count: usize) -> usize {
        count
            .saturating_mul(self.oversample)
            .max(self.min_fetch)
            .min(self.max_fetch.max(self.min_fetch))
    }
}

/// Defaults the command line falls back on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixDefaults {
    pub length: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub window_days: u32,
    /// Catalog document used when `--catalog` is not given.
    pub catalog: Option<PathBuf>,
}

impl Default for MixDefaults {
    fn default() -> Self {
        Self {
            length: 35,
            min_length: 15,
            max_length: 75,
            window_days: 7,
            catalog: None,
        }
    }
}

impl MixDefaults {
    /// Picks the requested length or the default, and checks it against the
    /// configured bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the length falls outside `min_length..=max_length`.
    pub fn resolve_length(&self, requested: Option<usize>) -> Result<usize> {
        let length = requested.unwrap_or(self.length);
        if length < self.min_length || length > self.max_length {
            anyhow::bail!(
                "Mix length {length} is out of range; choose between {} and {} tracks",
                self.min_length,
                self.max_length
            );
        }
        Ok(length)
    }
}

/// Contents of `config.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub engine: EngineSettings,
    pub mix: MixDefaults,
}

impl FileConfig {
    /// Reads `path`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path to the library database
    pub db_path: PathBuf,
    pub settings: FileConfig,
}

impl RuntimeConfig {
    /// Loads paths and `config.json` from the data directory.
    ///
    /// # Errors
    ///
    /// Fails if the data directory is unusable or the config file is invalid.
    pub fn new() -> Result<Self> {
        let data_dir = get_data_dir()?;
        Ok(Self {
            db_path: data_dir.join(DB_FILE),
            settings: FileConfig::load(&data_dir.join(CONFIG_FILE))?,
        })
    }

    /// Create configuration with explicit database path and default settings
    #[must_use]
    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self {
            db_path,
            settings: FileConfig::default(),
        }
    }
}
