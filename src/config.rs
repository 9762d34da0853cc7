//! Configuration loading and persistence.
//!
//! Settings live in a JSON file in the platform config directory and can be
//! overridden per-invocation with `BUSCRIBE_*` environment variables. The
//! bridge address itself is a CLI argument, not configuration — it changes
//! per site, the timing knobs rarely do.

use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{ACTION_WINDOW, BASELINE_WINDOW, DEFAULT_TRIALS, INTER_PHASE_REST};

/// Operator-tunable settings for capture sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Baseline (quiet) window length in seconds.
    pub baseline_secs: u64,
    /// Action (stimulated) window length in seconds.
    pub action_secs: u64,
    /// Rest between phases in seconds.
    pub rest_secs: u64,
    /// Trials per logical command.
    pub trials: usize,
    /// Catalog file location.
    pub catalog_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baseline_secs: BASELINE_WINDOW.as_secs(),
            action_secs: ACTION_WINDOW.as_secs(),
            rest_secs: INTER_PHASE_REST.as_secs(),
            trials: DEFAULT_TRIALS,
            catalog_path: Self::config_dir()
                .map(|d| d.join("catalog.json"))
                .unwrap_or_else(|_| PathBuf::from("catalog.json")),
        }
    }
}

impl Config {
    /// Returns the configuration directory, creating it if necessary.
    ///
    /// `BUSCRIBE_CONFIG_DIR` overrides the platform default (used by the
    /// integration tests to stay inside a temp dir).
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(dir) = env::var("BUSCRIBE_CONFIG_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("buscribe")
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment overrides applied.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file().unwrap_or_default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::config_dir()?.join("config.json");
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(secs) = env_u64("BUSCRIBE_BASELINE_SECS") {
            self.baseline_secs = secs;
        }
        if let Some(secs) = env_u64("BUSCRIBE_ACTION_SECS") {
            self.action_secs = secs;
        }
        if let Some(secs) = env_u64("BUSCRIBE_REST_SECS") {
            self.rest_secs = secs;
        }
        if let Some(trials) = env_u64("BUSCRIBE_TRIALS") {
            self.trials = trials as usize;
        }
        if let Ok(path) = env::var("BUSCRIBE_CATALOG") {
            self.catalog_path = PathBuf::from(path);
        }
    }

    /// Persists the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_dir()?.join("config.json");
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Baseline window as a duration.
    pub fn baseline_window(&self) -> Duration {
        Duration::from_secs(self.baseline_secs)
    }

    /// Action window as a duration.
    pub fn action_window(&self) -> Duration {
        Duration::from_secs(self.action_secs)
    }

    /// Inter-phase rest as a duration.
    pub fn rest_window(&self) -> Duration {
        Duration::from_secs(self.rest_secs)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference_timing() {
        let config = Config::default();
        assert_eq!(config.baseline_window(), BASELINE_WINDOW);
        assert_eq!(config.action_window(), ACTION_WINDOW);
        assert_eq!(config.rest_window(), INTER_PHASE_REST);
        assert_eq!(config.trials, DEFAULT_TRIALS);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.baseline_secs, config.baseline_secs);
        assert_eq!(back.catalog_path, config.catalog_path);
    }
}
