use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// Base URL of the hosted document backend
  pub url: String,
  /// Collection holding the event documents
  #[serde(default = "default_collection")]
  pub collection: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Freshness window in seconds before a listing refetches
  #[serde(default = "default_max_age_secs")]
  pub max_age_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      max_age_secs: default_max_age_secs(),
    }
  }
}

fn default_collection() -> String {
  "events".to_string()
}

fn default_max_age_secs() -> u64 {
  60
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./jamhub.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jamhub/config.yaml
  /// 4. ~/.config/jamhub/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/jamhub/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("jamhub.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jamhub").join("config.yaml");
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

  /// Get the backend API token from environment variables.
  ///
  /// Checks JAMHUB_API_TOKEN first, then GGJ_API_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("JAMHUB_API_TOKEN")
      .or_else(|_| std::env::var("GGJ_API_TOKEN"))
      .map_err(|_| {
        eyre!(
          "Backend API token not found. Set JAMHUB_API_TOKEN or GGJ_API_TOKEN environment variable."
        )
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_with_defaults() {
    let yaml = "backend:\n  url: https://api.example.org\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.backend.collection, "events");
    assert_eq!(config.cache.max_age_secs, 60);
  }

  #[test]
  fn test_parse_overrides() {
    let yaml = concat!(
      "backend:\n",
      "  url: https://api.example.org\n",
      "  collection: jams\n",
      "cache:\n",
      "  max_age_secs: 120\n",
    );
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.backend.collection, "jams");
    assert_eq!(config.cache.max_age_secs, 120);
  }
}
