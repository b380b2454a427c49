// Calculator settings
// Loaded from ~/.config/integral-calculator/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::api::DEFAULT_BACKEND_URL;
use crate::chart::svg::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

#[derive(Error, Debug)]
pub enum SettingsError {
  #[error("cannot read {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("invalid settings in {path}: {source}")]
  Parse {
    path: PathBuf,
    source: toml::de::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
  /// SVG display width in px
  pub width: u32,
  /// SVG display height in px
  pub height: u32,
}

impl Default for ChartSettings {
  fn default() -> Self {
    Self {
      width: DEFAULT_WIDTH,
      height: DEFAULT_HEIGHT,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub backend_url: String,
  /// Quiet period after the last edit before recalculating
  pub debounce_ms: u64,
  /// Delay before the deferred formula pass runs
  pub render_delay_ms: u64,
  /// 0 disables the timeout
  pub request_timeout_secs: u64,
  pub chart: ChartSettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      backend_url: DEFAULT_BACKEND_URL.to_string(),
      debounce_ms: 300,
      render_delay_ms: 100,
      request_timeout_secs: 30,
      chart: ChartSettings::default(),
    }
  }
}

impl Settings {
  /// Get the settings file path
  pub fn config_path() -> PathBuf {
    dirs::config_dir()
      .unwrap_or_else(|| PathBuf::from("."))
      .join("integral-calculator")
      .join("config.toml")
  }

  /// Load from the default location. A missing file means defaults.
  pub fn load() -> Result<Self, SettingsError> {
    Self::load_from(&Self::config_path())
  }

  pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
    if !path.exists() {
      log::debug!("no settings at {}, using defaults", path.display());
      return Ok(Self::default());
    }

    let contents =
      fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
      })?;
    Self::parse(&contents).map_err(|source| SettingsError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(contents)
  }

  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }

  pub fn render_delay(&self) -> Duration {
    Duration::from_millis(self.render_delay_ms)
  }

  pub fn request_timeout(&self) -> Option<Duration> {
    (self.request_timeout_secs > 0)
      .then(|| Duration::from_secs(self.request_timeout_secs))
  }
}
