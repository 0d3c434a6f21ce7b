use std::path::PathBuf;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::{JsonHistoryStore, LocalModelResolver, SystemHardwareDetector, TomlConfigStore};
use crate::app::Session;
use crate::domain::{
    active_backend, text_generation_backend, AppConfig, Backend, DomainError, HardwareProfile,
};
use crate::factory;
use crate::infrastructure::init_logging;
use crate::ports::{ConfigStore, HardwareDetector, ModelResolver, SpeechToText, TextGenerator};

/// Startup overrides, usually from the command line.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// Explicit config file instead of the OS default location.
    pub config_path: Option<PathBuf>,
    /// Backend identifier overriding the configured preference.
    pub backend: Option<String>,
    /// Log level overriding the configured one.
    pub log_level: Option<String>,
}

/// Application controller: owns the configuration, the hardware profile and
/// the active backend, and wires providers together.
pub struct AppController {
    config: AppConfig,
    config_store: Box<dyn ConfigStore>,
    profile: HardwareProfile,
    active_backend: String,
    _log_guard: Option<WorkerGuard>,
}

impl AppController {
    /// Initialize the application controller.
    /// This loads configuration, sets up logging and probes the hardware.
    pub fn new(options: StartupOptions) -> Result<Self, DomainError> {
        // Step 1: Initialize config store
        let config_store: Box<dyn ConfigStore> = match &options.config_path {
            Some(path) => Box::new(TomlConfigStore::with_config_path(path.clone())?),
            None => Box::new(TomlConfigStore::new()?),
        };

        // Step 2: Load configuration
        let mut config = config_store.load()?;
        if let Some(level) = options.log_level {
            config.logging.level = level;
        }
        if let Some(backend) = options.backend {
            config.backend.preference = backend;
        }

        // Step 3: Initialize logging
        let log_guard = init_logging(
            &config_store.logs_dir(),
            &config.logging.level,
            config.logging.file_logging,
            config.logging.max_files,
        )?;

        info!(version = env!("CARGO_PKG_VERSION"), "TierChat starting up");

        // Step 4: Probe hardware and settle on a backend
        let mut controller = Self::from_parts(config, config_store, &SystemHardwareDetector::new());
        controller._log_guard = log_guard;
        Ok(controller)
    }

    /// Assemble a controller from already loaded parts. No logging setup.
    pub fn from_parts(
        config: AppConfig,
        config_store: Box<dyn ConfigStore>,
        detector: &dyn HardwareDetector,
    ) -> Self {
        let profile = detector.detect();
        let active_backend = active_backend(&config.backend.preference, &profile);

        info!(
            preference = %config.backend.preference,
            active_backend = %active_backend,
            "Backend selected"
        );

        Self {
            config,
            config_store,
            profile,
            active_backend,
            _log_guard: None,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn profile(&self) -> &HardwareProfile {
        &self.profile
    }

    /// Identifier every capability starts from.
    pub fn active_backend(&self) -> &str {
        &self.active_backend
    }

    /// Backend used for text generation.
    pub fn text_backend(&self) -> Backend {
        text_generation_backend(&self.active_backend)
    }

    pub fn resolver(&self) -> LocalModelResolver {
        LocalModelResolver::new(self.config.backend.models_dir.clone())
    }

    /// Model reference handed to the text-generation factory: the resolved
    /// artifact for local backends, the remote model name otherwise.
    pub fn llm_model_ref(&self) -> String {
        let backend = self.text_backend();
        match backend {
            Backend::Openai => self.config.llm.remote_model.clone(),
            _ => self
                .resolver()
                .resolve(&self.config.llm.local_model, backend)
                .to_string_lossy()
                .into_owned(),
        }
    }

    /// Build the text-generation provider.
    pub fn create_llm(&self) -> Result<Box<dyn TextGenerator>, DomainError> {
        let backend = self.text_backend();
        factory::llm::create(
            backend.as_str(),
            &self.llm_model_ref(),
            &self.config,
            &self.profile,
        )
    }

    /// Build the speech provider for the active backend.
    pub fn create_asr(&self) -> Result<Box<dyn SpeechToText>, DomainError> {
        factory::asr::create(
            &self.active_backend,
            &self.config.asr.model,
            &self.config,
            &self.profile,
        )
    }

    /// History store at the configured location.
    pub fn history_store(&self) -> JsonHistoryStore {
        JsonHistoryStore::new(
            self.config_store
                .data_path(&self.config.conversation.history_file),
            self.config.conversation.system_prompt.clone(),
        )
    }

    /// Create providers and load history.
    ///
    /// Without `voice` no speech provider is built. A speech provider that
    /// fails to load is fatal only when voice was asked for.
    pub fn start_session(&self, voice: bool) -> Result<Session, DomainError> {
        let llm = self.create_llm()?;
        let asr = if voice {
            match self.create_asr() {
                Ok(asr) => Some(asr),
                Err(e) => {
                    warn!(error = %e, backend = %self.active_backend, "Speech provider unavailable");
                    return Err(e);
                }
            }
        } else {
            None
        };

        Session::new(llm, asr, Box::new(self.history_store()))
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        self.config_store.data_dir()
    }

    /// Get the logs directory path.
    pub fn logs_dir(&self) -> PathBuf {
        self.config_store.logs_dir()
    }

    /// Get the config file path.
    pub fn config_path(&self) -> PathBuf {
        self.config_store.config_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeviceTier;
    use std::fs;
    use tempfile::TempDir;

    struct FixedDetector(Vec<DeviceTier>);

    impl HardwareDetector for FixedDetector {
        fn detect(&self) -> HardwareProfile {
            HardwareProfile::with_priority(self.0.iter().copied())
        }
    }

    fn controller(dir: &TempDir, config: AppConfig, tiers: &[DeviceTier]) -> AppController {
        let store = TomlConfigStore::with_data_dir(dir.path().to_path_buf()).unwrap();
        AppController::from_parts(config, Box::new(store), &FixedDetector(tiers.to_vec()))
    }

    #[test]
    fn test_auto_selects_from_profile() {
        let dir = TempDir::new().unwrap();
        let c = controller(
            &dir,
            AppConfig::default(),
            &[DeviceTier::OpenvinoGpu, DeviceTier::OpenvinoCpu, DeviceTier::CpuLegacy],
        );
        assert_eq!(c.active_backend(), "openvino");
        assert_eq!(c.text_backend(), Backend::Openvino);
    }

    #[test]
    fn test_explicit_preference_short_circuits() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.backend.preference = "cpu_legacy".to_string();

        let c = controller(&dir, config, &[DeviceTier::Cuda, DeviceTier::CpuAvx2]);
        assert_eq!(c.active_backend(), "cpu_legacy");
    }

    #[test]
    fn test_cuda_routes_text_to_cloud() {
        let dir = TempDir::new().unwrap();
        let c = controller(&dir, AppConfig::default(), &[DeviceTier::Cuda, DeviceTier::CpuAvx2]);

        assert_eq!(c.active_backend(), "cuda");
        assert_eq!(c.text_backend(), Backend::Openai);
        assert_eq!(c.llm_model_ref(), "gpt-4.1-mini");

        // No key configured: startup-class error.
        let err = c.create_llm().err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_local_model_ref_is_resolved() {
        let dir = TempDir::new().unwrap();
        let models = dir.path().join("models");
        fs::create_dir_all(&models).unwrap();
        fs::write(models.join("assistant.q4_k_m.gguf"), b"gguf").unwrap();

        let mut config = AppConfig::default();
        config.backend.models_dir = models.clone();
        config.llm.local_model = "assistant".to_string();

        let c = controller(&dir, config, &[DeviceTier::CpuLegacy]);
        assert_eq!(
            PathBuf::from(c.llm_model_ref()),
            models.join("assistant.q4_k_m.gguf")
        );
    }

    #[test]
    fn test_history_lives_in_data_dir() {
        let dir = TempDir::new().unwrap();
        let c = controller(&dir, AppConfig::default(), &[DeviceTier::CpuLegacy]);

        assert_eq!(
            c.history_store().path(),
            dir.path().join("chat_history.json")
        );
        assert_eq!(c.data_dir(), dir.path());
    }
}
