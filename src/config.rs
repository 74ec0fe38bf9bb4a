//! Configuration management for Anyma Pal
//!
//! Handles loading, parsing and validation of the YAML configuration file.
//! Every section is optional; missing values fall back to the protocol
//! defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::session::SessionTiming;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MIDI port configuration (names are case-insensitive substrings)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MidiConfig {
    #[serde(default = "default_device_port")]
    pub device_input: String,
    #[serde(default = "default_device_port")]
    pub device_output: String,
    /// Virtual port created for the sequencer (unix), or existing port to match
    #[serde(default = "default_sequencer_port")]
    pub sequencer_port: String,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            device_input: default_device_port(),
            device_output: default_device_port(),
            sequencer_port: default_sequencer_port(),
        }
    }
}

/// Editor session timing
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,
    #[serde(default = "default_status_poll_ms")]
    pub status_poll_ms: u64,
    #[serde(default = "default_start_settle_ms")]
    pub start_settle_ms: u64,
    #[serde(default = "default_stop_settle_ms")]
    pub stop_settle_ms: u64,
    /// Start the session as soon as the ports are open
    #[serde(default)]
    pub auto_start: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keep_alive_ms: default_keep_alive_ms(),
            status_poll_ms: default_status_poll_ms(),
            start_settle_ms: default_start_settle_ms(),
            stop_settle_ms: default_stop_settle_ms(),
            auto_start: false,
        }
    }
}

impl SessionConfig {
    pub fn timing(&self) -> SessionTiming {
        SessionTiming {
            keep_alive_interval: Duration::from_millis(self.keep_alive_ms),
            status_poll_interval: Duration::from_millis(self.status_poll_ms),
            start_settle: Duration::from_millis(self.start_settle_ms),
            stop_settle: Duration::from_millis(self.stop_settle_ms),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Also write logs to a daily rolling file
    #[serde(default)]
    pub file: bool,
    /// Override the log directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load the file if it exists, otherwise use defaults
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        if self.midi.device_input.trim().is_empty() {
            anyhow::bail!("midi.device_input cannot be empty");
        }
        if self.midi.device_output.trim().is_empty() {
            anyhow::bail!("midi.device_output cannot be empty");
        }
        if self.midi.sequencer_port.trim().is_empty() {
            anyhow::bail!("midi.sequencer_port cannot be empty");
        }

        // Settle delays may be zero, repeater intervals may not
        if self.session.keep_alive_ms == 0 {
            anyhow::bail!("session.keep_alive_ms must be greater than zero");
        }
        if self.session.status_poll_ms == 0 {
            anyhow::bail!("session.status_poll_ms must be greater than zero");
        }

        Ok(())
    }
}

// Default value functions
fn default_device_port() -> String { "Anyma Phi".to_string() }
fn default_sequencer_port() -> String { "from Anyma Pal".to_string() }
fn default_keep_alive_ms() -> u64 { 1000 }
fn default_status_poll_ms() -> u64 { 200 }
fn default_start_settle_ms() -> u64 { 1000 }
fn default_stop_settle_ms() -> u64 { 5000 }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.midi.device_input, "Anyma Phi");
        assert_eq!(config.midi.sequencer_port, "from Anyma Pal");
        assert_eq!(config.session.timing(), SessionTiming::default());
        assert!(!config.session.auto_start);
    }

    #[test]
    fn test_partial_sections() {
        let yaml = r#"
midi:
  device_output: "USB MIDI"
session:
  stop_settle_ms: 0
  auto_start: true
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.midi.device_input, "Anyma Phi");
        assert_eq!(config.midi.device_output, "USB MIDI");
        assert_eq!(config.session.timing().stop_settle, Duration::ZERO);
        assert_eq!(config.session.keep_alive_ms, 1000);
        assert!(config.session.auto_start);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = AppConfig::from_yaml("session:\n  status_poll_ms: 0\n").unwrap_err();
        assert!(err.to_string().contains("status_poll_ms"));
    }

    #[test]
    fn test_rejects_empty_port() {
        let err = AppConfig::from_yaml("midi:\n  device_input: \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("device_input"));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        assert!(AppConfig::from_yaml("session: [1, 2").is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.yaml");

        let mut config = AppConfig::default();
        config.midi.device_input = "Anyma In".to_string();
        config.logging.file = true;
        config.save(&path).await.unwrap();

        let loaded = AppConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.yaml");

        assert!(AppConfig::load(&path).await.is_err());
        assert_eq!(AppConfig::load_or_default(&path).await.unwrap(), AppConfig::default());
    }
}
