use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration. Every field has a default, so running without
/// a config file is fine.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
  /// Name of the acting administrator recorded on activity-log entries
  #[serde(default)]
  pub administrator: Option<String>,
  /// Rows per page in the user table
  #[serde(default)]
  pub page_size: Option<u32>,
  /// Simulated backend latency in milliseconds
  #[serde(default)]
  pub latency_ms: Option<u64>,
  /// Override for the state database location
  #[serde(default)]
  pub state_path: Option<PathBuf>,
}

impl Config {
  pub const DEFAULT_ADMINISTRATOR: &'static str = "Leanne";
  pub const DEFAULT_PAGE_SIZE: u32 = 5;
  pub const DEFAULT_LATENCY_MS: u64 = 500;

  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (an error if it does not exist)
  /// 2. ./udash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/udash/config.yaml
  ///
  /// Falls back to defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("udash.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("udash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  pub fn administrator(&self) -> String {
    self
      .administrator
      .clone()
      .unwrap_or_else(|| Self::DEFAULT_ADMINISTRATOR.to_string())
  }

  pub fn page_size(&self) -> u32 {
    self.page_size.unwrap_or(Self::DEFAULT_PAGE_SIZE).max(1)
  }

  pub fn latency_ms(&self) -> u64 {
    self.latency_ms.unwrap_or(Self::DEFAULT_LATENCY_MS)
  }
}
