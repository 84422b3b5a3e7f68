use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Repository holding the shared collection file. Absent means local-only.
  pub remote: Option<RemoteConfig>,
  #[serde(default)]
  pub sync: SyncConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub drive: DriveConfig,
  #[serde(default)]
  pub grading: GradingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  pub owner: String,
  pub repo: String,
  /// File path inside the repository
  #[serde(default = "default_remote_path")]
  pub path: String,
  /// Branch to read and commit to (repository default if unset)
  pub branch: Option<String>,
  #[serde(default = "default_github_api")]
  pub api_base: String,
}

fn default_remote_path() -> String {
  "data/collection.json".to_string()
}

fn default_github_api() -> String {
  "https://api.github.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Quiet period before a batch of edits is pushed
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
  crate::sync::DEFAULT_QUIET_PERIOD.as_millis() as u64
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      debounce_ms: default_debounce_ms(),
    }
  }
}

impl SyncConfig {
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite file for the local cache (default: data dir/store.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
  #[serde(default = "default_folder_name")]
  pub folder_name: String,
  #[serde(default = "default_drive_api")]
  pub api_base: String,
}

fn default_folder_name() -> String {
  "Card Collection Backups".to_string()
}

fn default_drive_api() -> String {
  "https://www.googleapis.com".to_string()
}

impl Default for DriveConfig {
  fn default() -> Self {
    Self {
      folder_name: default_folder_name(),
      api_base: default_drive_api(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradingConfig {
  #[serde(default = "default_psa_api")]
  pub api_base: String,
}

fn default_psa_api() -> String {
  "https://api.psacard.com/publicapi".to_string()
}

impl Default for GradingConfig {
  fn default() -> Self {
    Self {
      api_base: default_psa_api(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cardkeep.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cardkeep/config.yaml
  ///
  /// With no file anywhere the defaults apply and the collection stays local.
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
      Some(p) => {
        tracing::debug!("Loading config from {}", p.display());
        Self::load_from_path(&p)
      }
      None => {
        tracing::info!("No configuration file found, running local-only");
        Ok(Self::default())
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("cardkeep.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cardkeep").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file is a null document; treat it like no file
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Repository write token from the environment.
  ///
  /// Checks CARDKEEP_GITHUB_TOKEN. The token stored with
  /// `cardkeep token set` is used when it is not set.
  pub fn github_token() -> Option<String> {
    env_secret("CARDKEEP_GITHUB_TOKEN")
  }

  /// OAuth access token for Drive backups (CARDKEEP_DRIVE_TOKEN).
  pub fn drive_token() -> Result<String> {
    env_secret("CARDKEEP_DRIVE_TOKEN")
      .ok_or_else(|| eyre!("Drive access token not found. Set CARDKEEP_DRIVE_TOKEN environment variable."))
  }

  /// PSA public API token (CARDKEEP_PSA_TOKEN).
  pub fn psa_token() -> Result<String> {
    env_secret("CARDKEEP_PSA_TOKEN")
      .ok_or_else(|| eyre!("PSA API token not found. Set CARDKEEP_PSA_TOKEN environment variable."))
  }
}

fn env_secret(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_without_file_content() {
    let config = Config::parse("").unwrap();
    assert!(config.remote.is_none());
    assert_eq!(config.sync.debounce(), Duration::from_secs(3));
    assert_eq!(config.drive.folder_name, "Card Collection Backups");
    assert_eq!(config.grading.api_base, "https://api.psacard.com/publicapi");
  }

  #[test]
  fn test_remote_section_defaults() {
    let config = Config::parse(
      "remote:\n  owner: letreetop\n  repo: cards\nsync:\n  debounce_ms: 500\n",
    )
    .unwrap();

    let remote = config.remote.unwrap();
    assert_eq!(remote.owner, "letreetop");
    assert_eq!(remote.path, "data/collection.json");
    assert_eq!(remote.api_base, "https://api.github.com");
    assert_eq!(remote.branch, None);
    assert_eq!(config.sync.debounce(), Duration::from_millis(500));
  }

  #[test]
  fn test_remote_requires_owner_and_repo() {
    assert!(Config::parse("remote:\n  owner: letreetop\n").is_err());
  }

  #[test]
  fn test_load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cardkeep.yaml");
    std::fs::write(&path, "storage:\n  path: /tmp/cards.db\ndrive:\n  folder_name: Binder\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/cards.db")));
    assert_eq!(config.drive.folder_name, "Binder");
    assert_eq!(config.drive.api_base, "https://www.googleapis.com");

    assert!(Config::load(Some(&dir.path().join("missing.yaml"))).is_err());
  }
}
