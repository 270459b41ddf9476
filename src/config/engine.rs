// src/config/engine.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::decay::{DecayParams, DEFAULT_DECAY_WINDOW_MINUTES, DEFAULT_HALF_LIFE_MINUTES};
use crate::error::ConfigurationError;
use crate::spike::{Baseline, SpikeDetector, DEFAULT_SPIKE_WINDOW, DEFAULT_Z_THRESHOLD};

// --- env defaults & names ---
pub const DEFAULT_ENGINE_CONFIG_PATH: &str = "config/attribution.toml";

pub const ENV_ENGINE_CONFIG_PATH: &str = "ATTRIBUTION_CONFIG_PATH";
pub const ENV_DECAY_WINDOW_MINUTES: &str = "ATTRIBUTION_DECAY_WINDOW_MINUTES";
pub const ENV_HALF_LIFE_MINUTES: &str = "ATTRIBUTION_HALF_LIFE_MINUTES";
pub const ENV_Z_THRESHOLD: &str = "ATTRIBUTION_Z_THRESHOLD";
pub const ENV_SPIKE_WINDOW: &str = "ATTRIBUTION_SPIKE_WINDOW";

fn default_decay_window() -> f64 {
    DEFAULT_DECAY_WINDOW_MINUTES
}
fn default_half_life() -> f64 {
    DEFAULT_HALF_LIFE_MINUTES
}
fn default_z_threshold() -> f64 {
    DEFAULT_Z_THRESHOLD
}
fn default_spike_window() -> usize {
    DEFAULT_SPIKE_WINDOW
}

/// Engine + detector settings. Every field has a default, so an empty
/// TOML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_decay_window")]
    pub decay_window_minutes: f64,
    #[serde(default = "default_half_life")]
    pub half_life_minutes: f64,
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
    #[serde(default = "default_spike_window")]
    pub spike_window: usize,
    #[serde(default)]
    pub spike_baseline: Baseline,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decay_window_minutes: default_decay_window(),
            half_life_minutes: default_half_life(),
            z_threshold: default_z_threshold(),
            spike_window: default_spike_window(),
            spike_baseline: Baseline::default(),
        }
    }
}

impl EngineConfig {
    /// Resolve `$ATTRIBUTION_CONFIG_PATH`, then `config/attribution.toml`,
    /// then built-in defaults; apply env overrides; validate.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_ENGINE_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(PathBuf::from(p))?,
            Err(_) => {
                let p = PathBuf::from(DEFAULT_ENGINE_CONFIG_PATH);
                if p.exists() {
                    Self::load_from_file(&p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        info!(
            target: "attribution",
            decay_window = cfg.decay_window_minutes,
            half_life = cfg.half_life_minutes,
            z_threshold = cfg.z_threshold,
            spike_window = cfg.spike_window,
            "engine config loaded"
        );
        Ok(cfg)
    }

    /// Read and validate a TOML file; no env overrides.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing engine config at {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: EngineConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Override individual fields from the environment. A set but
    /// unparseable variable is an error, not a silent fallback.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigurationError> {
        if let Some(v) = parse_env(ENV_DECAY_WINDOW_MINUTES)? {
            self.decay_window_minutes = v;
        }
        if let Some(v) = parse_env(ENV_HALF_LIFE_MINUTES)? {
            self.half_life_minutes = v;
        }
        if let Some(v) = parse_env(ENV_Z_THRESHOLD)? {
            self.z_threshold = v;
        }
        if let Some(v) = parse_env(ENV_SPIKE_WINDOW)? {
            self.spike_window = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.decay_params()?;
        self.spike_detector()?;
        Ok(())
    }

    pub fn decay_params(&self) -> Result<DecayParams, ConfigurationError> {
        DecayParams::new(self.decay_window_minutes, self.half_life_minutes)
    }

    pub fn spike_detector(&self) -> Result<SpikeDetector, ConfigurationError> {
        Ok(SpikeDetector::new(self.spike_window, self.z_threshold)?
            .with_baseline(self.spike_baseline))
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigurationError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigurationError::Override { key, raw }),
        Err(_) => Ok(None),
    }
}
