use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::domain::{AppConfig, DomainError};
use crate::ports::ConfigStore;

/// Application directory name under the OS config/data roots.
const APP_DIR: &str = "TierChat";

/// Environment variable consulted when the config carries no API key.
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// TOML-based configuration store with OS-specific paths.
pub struct TomlConfigStore {
    data_dir: PathBuf,
    config_path: PathBuf,
}

impl TomlConfigStore {
    /// Create a new TomlConfigStore.
    /// Uses OS-specific application data directories.
    pub fn new() -> Result<Self, DomainError> {
        let data_dir = Self::get_data_dir()?;
        Self::with_data_dir(data_dir)
    }

    /// Store rooted at an explicit data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Result<Self, DomainError> {
        fs::create_dir_all(&data_dir)?;

        info!(data_dir = ?data_dir, "ConfigStore initialized");

        Ok(Self {
            config_path: data_dir.join("config.toml"),
            data_dir,
        })
    }

    /// Store reading an explicit config file; its directory holds the data.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, DomainError> {
        let data_dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&data_dir)?;

        info!(config_path = ?config_path, "ConfigStore initialized");

        Ok(Self {
            data_dir,
            config_path,
        })
    }

    /// Get the OS-specific application data directory.
    /// - macOS: ~/Library/Application Support/TierChat/
    /// - Windows: %APPDATA%\TierChat\
    /// - Linux: ~/.config/TierChat/
    fn get_data_dir() -> Result<PathBuf, DomainError> {
        #[cfg(target_os = "macos")]
        let base = dirs::data_dir();

        #[cfg(not(target_os = "macos"))]
        let base = dirs::config_dir();

        base.map(|p| p.join(APP_DIR)).ok_or_else(|| {
            DomainError::Config("Could not find application data directory".to_string())
        })
    }

    /// Get the OS-specific log directory.
    /// - macOS: ~/Library/Application Support/TierChat/logs/
    /// - Windows: %LOCALAPPDATA%\TierChat\logs\
    /// - Linux: ~/.local/share/TierChat/logs/
    fn get_logs_dir(&self) -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            dirs::data_local_dir()
                .map(|p| p.join(APP_DIR).join("logs"))
                .unwrap_or_else(|| self.data_dir.join("logs"))
        }

        #[cfg(target_os = "linux")]
        {
            dirs::data_dir()
                .map(|p| p.join(APP_DIR).join("logs"))
                .unwrap_or_else(|| self.data_dir.join("logs"))
        }

        #[cfg(not(any(target_os = "windows", target_os = "linux")))]
        {
            self.data_dir.join("logs")
        }
    }

    /// Fill a missing API key from the environment.
    fn apply_env(config: &mut AppConfig) {
        if config.credentials.openai_api_key().is_some() {
            return;
        }
        if let Ok(key) = std::env::var(OPENAI_KEY_ENV) {
            if !key.trim().is_empty() {
                debug!(var = OPENAI_KEY_ENV, "Using API key from environment");
                config.credentials.openai_api_key = Some(key);
            }
        }
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<AppConfig, DomainError> {
        let config_path = self.config_path();

        let mut config = if config_path.exists() {
            debug!(path = ?config_path, "Loading configuration");
            let content = fs::read_to_string(&config_path)?;
            let config: AppConfig = toml::from_str(&content)?;
            info!(path = ?config_path, "Configuration loaded");
            config
        } else {
            info!(path = ?config_path, "Configuration file not found, creating default");
            let config = AppConfig::new();
            self.save(&config)?;
            config
        };

        Self::apply_env(&mut config);
        Ok(config)
    }

    fn save(&self, config: &AppConfig) -> Result<(), DomainError> {
        let config_path = self.config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&config_path, content)?;

        info!(path = ?config_path, "Configuration saved");
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    fn logs_dir(&self) -> PathBuf {
        self.get_logs_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_config_store_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlConfigStore::with_data_dir(temp_dir.path().to_path_buf()).unwrap();

        let config_path = store.config_path();
        assert!(config_path.ends_with("config.toml"));

        let logs_dir = store.logs_dir();
        assert!(logs_dir.to_string_lossy().contains("logs"));
    }

    #[test]
    #[serial]
    fn test_config_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlConfigStore::with_data_dir(temp_dir.path().to_path_buf()).unwrap();

        let mut config = AppConfig::new();
        config.backend.preference = "openvino".to_string();
        config.logging.level = "debug".to_string();

        store.save(&config).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.backend.preference, "openvino");
        assert_eq!(loaded.logging.level, "debug");
    }

    #[test]
    #[serial]
    fn test_first_load_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("tierchat.toml");
        let store = TomlConfigStore::with_config_path(config_path.clone()).unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.backend.preference, "auto");
        assert!(config_path.exists());
        assert_eq!(store.data_dir(), temp_dir.path().join("nested"));
    }

    #[test]
    #[serial]
    fn test_env_key_fills_missing_credential() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlConfigStore::with_data_dir(temp_dir.path().to_path_buf()).unwrap();

        std::env::set_var(OPENAI_KEY_ENV, "sk-from-env");
        let config = store.load().unwrap();
        std::env::remove_var(OPENAI_KEY_ENV);

        assert_eq!(config.credentials.openai_api_key(), Some("sk-from-env"));
    }

    #[test]
    #[serial]
    fn test_config_key_wins_over_env() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlConfigStore::with_data_dir(temp_dir.path().to_path_buf()).unwrap();

        let mut config = AppConfig::new();
        config.credentials.openai_api_key = Some("sk-from-file".to_string());
        store.save(&config).unwrap();

        std::env::set_var(OPENAI_KEY_ENV, "sk-from-env");
        let loaded = store.load().unwrap();
        std::env::remove_var(OPENAI_KEY_ENV);

        assert_eq!(loaded.credentials.openai_api_key(), Some("sk-from-file"));
    }

    #[test]
    fn test_data_path_anchoring() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlConfigStore::with_data_dir(temp_dir.path().to_path_buf()).unwrap();

        assert_eq!(
            store.data_path(Path::new("chat_history.json")),
            temp_dir.path().join("chat_history.json")
        );
        let absolute = temp_dir.path().join("elsewhere.json");
        assert_eq!(store.data_path(&absolute), absolute);
    }
}
