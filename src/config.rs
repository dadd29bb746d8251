//! # Configuration Module
//!
//! Engine tuning parameters and data directory management.
//!
//! ## Data Storage
//!
//! The CLI keeps exported profiles in the platform-standard data directory:
//! - Linux: `~/.local/share/autoqueue/`
//! - macOS: `~/Library/Application Support/autoqueue/`
//! - Windows: `%APPDATA%\autoqueue\`
//!
//! ## Engine Parameters
//!
//! [`EngineConfig`] carries every numeric policy constant the engine uses. The
//! defaults are the reference policy; a JSON file may override any subset of
//! them (missing keys keep their default).

use crate::scoring::ScoringWeights;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Policy constants for the event recorder, blender and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Listening events kept in the rolling history.
    pub history_window: usize,
    /// Capacity of the recently-played track set.
    pub recent_played_capacity: usize,
    /// Capacity of the recently-skipped track set.
    pub recent_skipped_capacity: usize,
    /// Length of the favorite artist list.
    pub favorites_count: usize,
    /// Most recent history entries inspected for the skip rate.
    pub skip_window: usize,
    /// History events included in an exported profile.
    pub export_history: usize,
    pub openness_initial: f64,
    pub openness_min: f64,
    pub openness_max: f64,
    pub openness_step: f64,
    pub weights: ScoringWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_window: 50,
            recent_played_capacity: 20,
            recent_skipped_capacity: 500,
            favorites_count: 10,
            skip_window: 10,
            export_history: 20,
            openness_initial: 0.3,
            openness_min: 0.1,
            openness_max: 0.5,
            openness_step: 0.05,
            weights: ScoringWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Checks that the bounds are coherent.
    ///
    /// # Errors
    ///
    /// Returns an error if openness bounds are inverted or out of `[0, 1]`,
    /// the initial openness lies outside them, the openness step is negative,
    /// or a window is zero.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.openness_min)
            || !(0.0..=1.0).contains(&self.openness_max)
            || self.openness_min > self.openness_max
        {
            anyhow::bail!(
                "Invalid openness bounds [{}, {}]",
                self.openness_min,
                self.openness_max
            );
        }
        if !(self.openness_min..=self.openness_max).contains(&self.openness_initial) {
            anyhow::bail!(
                "Initial openness {} outside [{}, {}]",
                self.openness_initial,
                self.openness_min,
                self.openness_max
            );
        }
        if !self.openness_step.is_finite() || self.openness_step < 0.0 {
            anyhow::bail!("Openness step {} must be non-negative", self.openness_step);
        }
        if self.history_window == 0 || self.skip_window == 0 || self.recent_played_capacity == 0 {
            anyhow::bail!("History window, skip window and recent capacity must be non-zero");
        }
        Ok(())
    }
}

/// Loads an [`EngineConfig`] from a JSON file.
///
/// A missing file yields the defaults, so a fresh install needs no setup.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, is not valid JSON,
/// or fails [`EngineConfig::validate`].
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        log::debug!("No engine config at {}, using defaults", path.display());
        return Ok(EngineConfig::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read engine config {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&content)
        .with_context(|| format!("Engine config {} is not valid JSON", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Engine config {} rejected", path.display()))?;
    Ok(config)
}

/// Returns the platform-appropriate data directory for autoqueue, creating it
/// if needed.
///
/// # Errors
///
/// Returns an error if the system data directory cannot be determined or the
/// `autoqueue` subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join("autoqueue");
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create autoqueue data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Path of the SQLite profile store inside [`get_data_dir`].
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_store_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("profiles.db"))
}

/// Path of the optional engine config file inside [`get_data_dir`].
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("engine.json"))
}

/// Resolved locations for a CLI run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub store_path: PathBuf,
    pub config_path: PathBuf,
}

impl RuntimeConfig {
    /// Resolves paths, preferring explicit overrides over the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a default path is needed and the data directory is
    /// unavailable.
    pub fn resolve(store: Option<PathBuf>, config: Option<PathBuf>) -> Result<Self> {
        let store_path = match store {
            Some(path) => path,
            None => get_store_path()?,
        };
        let config_path = match config {
            Some(path) => path,
            None => get_config_path()?,
        };
        Ok(Self {
            store_path,
            config_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_window, 50);
        assert_eq!(config.recent_played_capacity, 20);
        assert_eq!(config.favorites_count, 10);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_engine_config(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_config_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{ "history_window": 100, "openness_initial": 0.4 }"#).unwrap();

        let config = load_engine_config(&path).unwrap();
        assert_eq!(config.history_window, 100);
        assert_eq!(config.openness_initial, 0.4);
        assert_eq!(config.skip_window, 10);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{ "openness_min": 0.6, "openness_max": 0.2 }"#).unwrap();
        assert!(load_engine_config(&path).is_err());
    }

    #[test]
    fn test_negative_openness_step_rejected() {
        let config = EngineConfig {
            openness_step: -0.1,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_runtime_config_overrides() {
        let runtime = RuntimeConfig::resolve(
            Some(PathBuf::from("/tmp/a.db")),
            Some(PathBuf::from("/tmp/b.json")),
        )
        .unwrap();
        assert_eq!(runtime.store_path, PathBuf::from("/tmp/a.db"));
        assert_eq!(runtime.config_path, PathBuf::from("/tmp/b.json"));
    }
}
