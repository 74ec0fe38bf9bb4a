//! Application path management.
//!
//! Resolves where the configuration file and log directory live:
//!
//! - **Explicit**: a `--config` path always wins; logs go next to it.
//! - **Working directory**: `config.yaml` in the cwd (typical during development).
//! - **Installed** (default): `<data_dir>/Anyma Pal/` (`%APPDATA%` on Windows,
//!   `~/.local/share` on Linux, `~/Library/Application Support` on macOS).

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "Anyma Pal";

const CONFIG_FILE: &str = "config.yaml";

/// Application paths for config and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Path to the configuration file (may not exist)
    pub config: PathBuf,
    /// Path to the logs directory
    pub logs_dir: PathBuf,
}

impl AppPaths {
    /// Detect the appropriate paths, honoring an explicit config path.
    ///
    /// Note: This is called before logging is initialized.
    pub fn detect(explicit_config: Option<&Path>) -> Self {
        if let Some(config) = explicit_config {
            return Self::beside(config.to_path_buf());
        }

        let cwd_config = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(CONFIG_FILE);
        if cwd_config.exists() {
            return Self::beside(cwd_config);
        }

        let app_data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME);

        Self {
            config: app_data.join(CONFIG_FILE),
            logs_dir: app_data.join("logs"),
        }
    }

    /// Paths for a config file, with logs in a sibling `logs` directory
    fn beside(config: PathBuf) -> Self {
        let logs_dir = config
            .parent()
            .map(|p| p.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"));
        Self { config, logs_dir }
    }

    /// Ensure the log directory exists.
    pub fn ensure_logs_dir(&self) -> anyhow::Result<()> {
        if !self.logs_dir.exists() {
            debug!("Creating logs directory: {}", self.logs_dir.display());
            std::fs::create_dir_all(&self.logs_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_wins() {
        let paths = AppPaths::detect(Some(Path::new("/etc/anyma/pal.yaml")));
        assert_eq!(paths.config, PathBuf::from("/etc/anyma/pal.yaml"));
        assert_eq!(paths.logs_dir, PathBuf::from("/etc/anyma/logs"));
    }

    #[test]
    fn test_detected_config_is_named_config_yaml() {
        let paths = AppPaths::detect(None);
        assert_eq!(paths.config.file_name().unwrap(), CONFIG_FILE);
    }

    #[test]
    fn test_ensure_logs_dir_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let paths = AppPaths::detect(Some(&temp.path().join("config.yaml")));

        paths.ensure_logs_dir().unwrap();
        assert!(temp.path().join("logs").is_dir());
    }
}
