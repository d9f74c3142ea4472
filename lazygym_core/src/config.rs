//! Configuration file support for LazyGym.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lazygym/config.toml`.

use crate::analytics::MAX_WINDOW_WEEKS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// AMRAP weight progression parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressionConfig {
    /// Failure-set reps below this keep the weight unchanged
    #[serde(default = "default_min_reps_to_progress")]
    pub min_reps_to_progress: u32,

    /// Failure-set reps at or above this earn the large increment
    #[serde(default = "default_large_jump_reps")]
    pub large_jump_reps: u32,

    #[serde(default = "default_upper_small_increment")]
    pub upper_small_increment: f64,

    #[serde(default = "default_lower_small_increment")]
    pub lower_small_increment: f64,

    #[serde(default = "default_upper_large_increment")]
    pub upper_large_increment: f64,

    #[serde(default = "default_lower_large_increment")]
    pub lower_large_increment: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            min_reps_to_progress: default_min_reps_to_progress(),
            large_jump_reps: default_large_jump_reps(),
            upper_small_increment: default_upper_small_increment(),
            lower_small_increment: default_lower_small_increment(),
            upper_large_increment: default_upper_large_increment(),
            lower_large_increment: default_lower_large_increment(),
        }
    }
}

/// Analytics window configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Trailing window used for the weekly average in stats
    #[serde(default = "default_weeks")]
    pub stats_window_weeks: u32,

    /// Default window for frequency and progression queries
    #[serde(default = "default_weeks")]
    pub default_timeframe_weeks: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            stats_window_weeks: default_weeks(),
            default_timeframe_weeks: default_weeks(),
        }
    }
}

/// First-run catalog configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Seed default exercises and template into empty collections
    #[serde(default = "default_true")]
    pub seed_defaults: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            seed_defaults: true,
        }
    }
}

/// Stored-data migration switches
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct MigrationConfig {
    /// Rewrite missing `body_part` from the legacy upper-body flag on open
    #[serde(default)]
    pub backfill_body_part: bool,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("lazygym")
}

fn default_min_reps_to_progress() -> u32 {
    5
}

fn default_large_jump_reps() -> u32 {
    10
}

fn default_upper_small_increment() -> f64 {
    1.0
}

fn default_lower_small_increment() -> f64 {
    2.5
}

fn default_upper_large_increment() -> f64 {
    2.0
}

fn default_lower_large_increment() -> f64 {
    5.0
}

fn default_weeks() -> u32 {
    12
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject settings the progression and analytics code cannot use
    pub fn validate(&self) -> Result<()> {
        let p = &self.progression;
        if p.large_jump_reps < p.min_reps_to_progress {
            return Err(Error::Config(format!(
                "large_jump_reps ({}) must not be below min_reps_to_progress ({})",
                p.large_jump_reps, p.min_reps_to_progress
            )));
        }
        let increments = [
            p.upper_small_increment,
            p.lower_small_increment,
            p.upper_large_increment,
            p.lower_large_increment,
        ];
        if increments.iter().any(|i| !i.is_finite() || *i < 0.0) {
            return Err(Error::Config(
                "weight increments must be finite and non-negative".into(),
            ));
        }
        let windows = [
            self.analytics.stats_window_weeks,
            self.analytics.default_timeframe_weeks,
        ];
        if windows.iter().any(|w| !(1..=MAX_WINDOW_WEEKS).contains(w)) {
            return Err(Error::Config(format!(
                "analytics windows must be between 1 and {} weeks",
                MAX_WINDOW_WEEKS
            )));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("lazygym").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
