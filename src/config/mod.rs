//! Workspace configuration, persisted as TOML under the user's home.

use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const WORKSPACE_DIR: &str = ".agora";
const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";
const KEYSTORE_DIR: &str = "keys";

fn default_service() -> String {
    "http://localhost:2583".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized.
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Base URL of the repository service.
    #[serde(default = "default_service")]
    pub service: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::new(),
            config_path: PathBuf::new(),
            service: default_service(),
        }
    }
}

impl Config {
    /// Load from the default workspace, creating defaults on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let workspace = Self::default_workspace()?;
        Self::load_from(&workspace)
    }

    pub fn load_from(workspace: &Path) -> Result<Self, ConfigError> {
        let config_path = workspace.join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            let raw = fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&raw).map_err(|e| ConfigError::Load(e.to_string()))?
        } else {
            Config::default()
        };
        config.workspace_dir = workspace.to_path_buf();
        config.config_path = config_path;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.workspace_dir)?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::Save(e.to_string()))?;
        fs::write(&self.config_path, raw)?;
        Ok(())
    }

    pub fn session_path(&self) -> PathBuf {
        self.workspace_dir.join(SESSION_FILE)
    }

    pub fn keystore_dir(&self) -> PathBuf {
        self.workspace_dir.join(KEYSTORE_DIR)
    }

    fn default_workspace() -> Result<PathBuf, ConfigError> {
        let dirs = UserDirs::new()
            .ok_or_else(|| ConfigError::Load("could not determine home directory".into()))?;
        Ok(dirs.home_dir().join(WORKSPACE_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_run_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.service, default_service());
        assert_eq!(config.workspace_dir, dir.path());
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load_from(dir.path()).unwrap();
        config.service = "https://pds.example.com".into();
        config.save().unwrap();

        let reloaded = Config::load_from(dir.path()).unwrap();
        assert_eq!(reloaded.service, "https://pds.example.com");
    }

    #[test]
    fn derived_paths_live_in_the_workspace() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert!(config.session_path().starts_with(dir.path()));
        assert!(config.keystore_dir().starts_with(dir.path()));
    }
}
