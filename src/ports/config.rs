use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, DomainError};

/// Configuration store port for loading the startup configuration.
pub trait ConfigStore: Send + Sync {
    /// Load configuration from persistent storage.
    /// Creates default config if none exists.
    fn load(&self) -> Result<AppConfig, DomainError>;

    /// Save configuration to persistent storage.
    fn save(&self, config: &AppConfig) -> Result<(), DomainError>;

    /// Path of the configuration file.
    fn config_path(&self) -> PathBuf;

    /// Application data directory (history, logs).
    fn data_dir(&self) -> PathBuf;

    /// Logs directory.
    fn logs_dir(&self) -> PathBuf;

    /// Anchor a relative path from the config at the data directory.
    fn data_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}
