//! Control-layer configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::recent::DEFAULT_RECENT_FOLDER_LIMIT;

/// Directory name under the platform config directory.
pub const APP_DIR: &str = "mailsteer";

/// Returns the application's config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Tunables of the control layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// How many recent folders are offered for quick navigation.
    pub recent_folder_limit: usize,
    /// Where control state is persisted; `None` for the default location.
    pub state_file: Option<PathBuf>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            recent_folder_limit: DEFAULT_RECENT_FOLDER_LIMIT,
            state_file: None,
        }
    }
}

impl ControlConfig {
    /// Default location of the config file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        config_dir().join("config.json")
    }

    /// Loads the config from `path`, or the defaults if there is no file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(Self::default());
        }
        let contents = tokio::fs::read_to_string(path).await?;
        let config = serde_json::from_str(&contents)?;
        info!("Config loaded from {:?}", path);
        Ok(config)
    }

    /// Where control state is persisted.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(crate::state::StateStore::default_path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ControlConfig::load(&dir.path().join("config.json"))
            .await
            .unwrap();
        assert_eq!(config, ControlConfig::default());
        assert_eq!(config.recent_folder_limit, 10);
    }

    #[tokio::test]
    async fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"recent_folder_limit": 3}"#)
            .await
            .unwrap();

        let config = ControlConfig::load(&path).await.unwrap();
        assert_eq!(config.recent_folder_limit, 3);
        assert_eq!(config.state_file, None);
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, "{").await.unwrap();
        assert!(ControlConfig::load(&path).await.is_err());
    }

    #[test]
    fn state_file_override() {
        let config = ControlConfig {
            state_file: Some(PathBuf::from("/tmp/state.json")),
            ..ControlConfig::default()
        };
        assert_eq!(config.state_path(), PathBuf::from("/tmp/state.json"));
    }
}
