//! Configuration Management

use crate::classify::motion::MotionClassifierConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Sample stream settings
    #[serde(default)]
    pub stream: StreamConfig,
    /// Classifier tunables
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Replay settings
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Sample stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample buffer size (power of 2)
    pub buffer_size: usize,
    /// Consumer poll interval (ms)
    pub poll_interval_ms: u64,
    /// Minimum position delta worth emitting (meters, 0 = off)
    pub distance_filter_m: f64,
}

/// Classifier tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Speed above which movement is detected (m/s)
    pub speed_threshold_mps: f64,
    /// Position delta above which movement is inferred (meters)
    pub distance_threshold_m: f64,
    /// Seconds to keep reporting moving after the last detection
    pub decay_secs: f64,
}

/// Replay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Playback rate multiplier (1.0 = recorded pace)
    pub rate: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            poll_interval_ms: 10,
            distance_filter_m: 1.0,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            speed_threshold_mps: 0.7,
            distance_threshold_m: 3.0,
            decay_secs: 3.0,
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { rate: 1.0 }
    }
}

impl ClassifierConfig {
    /// Convert to the classifier's runtime configuration.
    pub fn to_motion_config(&self) -> MotionClassifierConfig {
        MotionClassifierConfig {
            speed_threshold_mps: self.speed_threshold_mps,
            distance_threshold_m: self.distance_threshold_m,
            decay: Duration::from_secs_f64(self.decay_secs),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.stream.buffer_size == 0 || !self.stream.buffer_size.is_power_of_two() {
            return Err(crate::Error::Config(format!(
                "buffer_size must be a power of 2, got {}",
                self.stream.buffer_size
            )));
        }
        if self.stream.poll_interval_ms == 0 {
            return Err(crate::Error::Config("poll_interval_ms must be > 0".to_string()));
        }
        if self.stream.distance_filter_m < 0.0 {
            return Err(crate::Error::Config(format!(
                "distance_filter_m must be >= 0, got {}",
                self.stream.distance_filter_m
            )));
        }
        if self.classifier.speed_threshold_mps <= 0.0 {
            return Err(crate::Error::Config(format!(
                "speed_threshold_mps must be > 0, got {}",
                self.classifier.speed_threshold_mps
            )));
        }
        if self.classifier.distance_threshold_m <= 0.0 {
            return Err(crate::Error::Config(format!(
                "distance_threshold_m must be > 0, got {}",
                self.classifier.distance_threshold_m
            )));
        }
        if self.classifier.decay_secs < 0.0 {
            return Err(crate::Error::Config(format!(
                "decay_secs must be >= 0, got {}",
                self.classifier.decay_secs
            )));
        }
        if self.replay.rate <= 0.0 || self.replay.rate > 1_000.0 {
            return Err(crate::Error::Config(format!(
                "replay rate must be in (0, 1000], got {}",
                self.replay.rate
            )));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;

        // Create parent directories
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save to default location
    pub fn save_default(&self) -> Result<(), crate::Error> {
        self.save(&Self::default_path())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".motion_sense").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}
