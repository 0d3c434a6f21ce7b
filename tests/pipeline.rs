use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use tierchat::adapters::{LocalModelResolver, TomlConfigStore};
use tierchat::domain::{active_backend, text_generation_backend, Backend, DeviceTier, HardwareProfile};
use tierchat::factory::{asr, llm, AsrProviderKind, LlmProviderKind};
use tierchat::ports::{HardwareDetector, ModelResolver};
use tierchat::{AppConfig, AppController};

struct LegacyCpu;

impl HardwareDetector for LegacyCpu {
    fn detect(&self) -> HardwareProfile {
        HardwareProfile::with_priority([DeviceTier::CpuLegacy])
    }
}

#[test]
fn legacy_cpu_picks_the_quantized_local_provider() {
    let models = TempDir::new().unwrap();
    let only = models.path().join("chat.gguf");
    fs::write(&only, b"gguf").unwrap();

    let profile = LegacyCpu.detect();
    let backend = active_backend("auto", &profile);
    assert_eq!(backend, "cpu_legacy");

    let resolver = LocalModelResolver::new(models.path());
    let resolved = resolver.resolve("chat", backend.parse::<Backend>().unwrap());
    assert_eq!(resolved, only);

    assert_eq!(llm::provider_kind(&backend).unwrap(), LlmProviderKind::Gguf);
    assert_eq!(asr::provider_kind(&backend), AsrProviderKind::WhisperCpu);
}

#[test]
fn controller_wires_the_same_pipeline() {
    let data = TempDir::new().unwrap();
    let models = data.path().join("models");
    fs::create_dir_all(&models).unwrap();
    fs::write(models.join("chat.gguf"), b"gguf").unwrap();

    let mut config = AppConfig::default();
    config.backend.models_dir = models.clone();
    config.llm.local_model = "chat".to_string();

    let store = TomlConfigStore::with_data_dir(data.path().to_path_buf()).unwrap();
    let controller = AppController::from_parts(config, Box::new(store), &LegacyCpu);

    assert_eq!(controller.active_backend(), "cpu_legacy");
    assert_eq!(controller.text_backend(), Backend::CpuLegacy);
    assert_eq!(PathBuf::from(controller.llm_model_ref()), models.join("chat.gguf"));

    // The file is not a real model, so loading fails, but never as a
    // configuration error.
    let err = controller.create_llm().err().unwrap();
    assert!(!err.is_configuration());
}

#[test]
fn unknown_override_is_rejected_only_by_text_generation() {
    let profile = LegacyCpu.detect();
    let backend = active_backend("TPU", &profile);
    assert_eq!(backend, "tpu");

    assert!(llm::provider_kind(&backend).unwrap_err().is_configuration());
    assert_eq!(asr::provider_kind(&backend), AsrProviderKind::WhisperCpu);

    // Routing still lands text generation on the local path.
    assert_eq!(text_generation_backend(&backend), Backend::CpuLegacy);
}
