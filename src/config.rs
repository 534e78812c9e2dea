//! On-disk configuration (`config.toml`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::providers::FALLBACK_PROVIDER;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `config.toml` and, unless `log_dir` says
    /// otherwise, the `logs/` folder.
    #[serde(skip)]
    pub settings_dir: PathBuf,
    /// Base URL of the matcher backend.
    pub backend_url: String,
    /// Provider selected when the backend has no saved configuration.
    pub fallback_provider: String,
    /// Seconds to wait after queueing a model pull before refreshing the
    /// model list.
    pub model_refresh_delay_secs: u64,
    /// Per-request timeout.  Unset means requests may wait indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// Host and port prefilled for locally hosted providers.
    pub default_host: String,
    pub default_port: u16,
    pub log_dir: Option<PathBuf>,
    /// Open the settings dialog as soon as the TUI starts.
    pub open_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_dir: default_settings_dir(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            fallback_provider: FALLBACK_PROVIDER.to_string(),
            model_refresh_delay_secs: 5,
            request_timeout_secs: None,
            default_host: "localhost".to_string(),
            default_port: 11434,
            log_dir: None,
            open_on_start: true,
        }
    }
}

fn default_settings_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("matcher-settings")
}

impl Config {
    /// Load from `path`, or from `<config_dir>/matcher-settings/config.toml`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(|| default_settings_dir().join("config.toml"));
        let settings_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(default_settings_dir);

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str::<Config>(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Config::default()
        };
        config.settings_dir = settings_dir;
        Ok(config)
    }

    /// Write to `path`, or to `config.toml` inside `settings_dir`.
    #[cfg(test)]
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.settings_dir.join("config.toml"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.settings_dir.join("logs"))
    }

    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        self.request_timeout_secs.map(std::time::Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("config.toml"))).unwrap();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.fallback_provider, "gemini");
        assert_eq!(config.model_refresh_delay_secs, 5);
        assert!(config.request_timeout().is_none());
        assert_eq!(config.settings_dir, dir.path());
        assert_eq!(config.log_dir(), dir.path().join("logs"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "backend_url = \"http://matcher:8000/\"\nrequest_timeout_secs = 30\n",
        )
        .unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.backend_url, "http://matcher:8000/");
        assert_eq!(
            config.request_timeout(),
            Some(std::time::Duration::from_secs(30))
        );
        assert_eq!(config.default_port, 11434);
        assert!(config.open_on_start);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            fallback_provider: "huggingface".into(),
            default_host: "ollama".into(),
            open_on_start: false,
            ..Config::default()
        };
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(path)).unwrap();
        assert_eq!(loaded.fallback_provider, "huggingface");
        assert_eq!(loaded.default_host, "ollama");
        assert!(!loaded.open_on_start);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_port = \"not a number\"").unwrap();
        let err = Config::load(Some(path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
