//! Configuration management for the nanoKONTROL gateway
//!
//! Loads the YAML configuration naming the surface ports and the timer
//! intervals of the event loop.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// MIDI port configuration
///
/// Ports are matched by case-insensitive substring of the port name.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MidiConfig {
    #[serde(default = "default_port")]
    pub input_port: String,
    #[serde(default = "default_port")]
    pub output_port: String,
}

/// Event loop timers
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct TimingConfig {
    /// Seconds between keepalive messages
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// Milliseconds between full LED flushes
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl TimingConfig {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            input_port: default_port(),
            output_port: default_port(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        Ok(config)
    }

    /// Load from `path` when it exists, defaults otherwise
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.trim().is_empty() {
            anyhow::bail!("MIDI input_port cannot be empty");
        }
        if self.midi.output_port.trim().is_empty() {
            anyhow::bail!("MIDI output_port cannot be empty");
        }
        if self.timing.keepalive_secs == 0 {
            anyhow::bail!("timing.keepalive_secs must be greater than zero");
        }
        if self.timing.flush_interval_ms == 0 {
            anyhow::bail!("timing.flush_interval_ms must be greater than zero");
        }
        Ok(())
    }
}

// Default value functions
fn default_port() -> String { "nanoKONTROL Studio".to_string() }
fn default_keepalive_secs() -> u64 { 30 }
fn default_flush_interval_ms() -> u64 { 1000 }
