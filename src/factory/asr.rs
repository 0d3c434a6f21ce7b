use tracing::{debug, info};

use crate::adapters::openai::OpenAiTranscriber;
use crate::domain::{AppConfig, DomainError, HardwareProfile};
use crate::ports::SpeechToText;

/// Speech provider a backend identifier maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsrProviderKind {
    /// whisper.cpp with GPU offload.
    WhisperGpu,
    /// Whisper IR on the OpenVINO runtime.
    Openvino,
    /// whisper.cpp on the CPU. Also the fallback for unknown identifiers.
    WhisperCpu,
    /// OpenAI transcription endpoint.
    Openai,
}

/// Pick the provider for `backend`. Never fails: unknown identifiers get the
/// CPU provider.
pub fn provider_kind(backend: &str) -> AsrProviderKind {
    match backend.trim().to_lowercase().as_str() {
        "cuda" => AsrProviderKind::WhisperGpu,
        "openvino" => AsrProviderKind::Openvino,
        "cpu_legacy" | "whisper_cpp" => AsrProviderKind::WhisperCpu,
        "openai" => AsrProviderKind::Openai,
        other => {
            debug!(backend = other, "No dedicated speech provider, using whisper.cpp on CPU");
            AsrProviderKind::WhisperCpu
        }
    }
}

/// Build the speech provider for `backend`.
///
/// `model_ref` is a ggml file or name for whisper.cpp and an exported model
/// directory or name for OpenVINO; the cloud provider uses the configured
/// remote model instead.
pub fn create(
    backend: &str,
    model_ref: &str,
    config: &AppConfig,
    profile: &HardwareProfile,
) -> Result<Box<dyn SpeechToText>, DomainError> {
    let kind = provider_kind(backend);
    info!(backend, kind = ?kind, model = model_ref, "Creating speech provider");

    let language = config.asr.language_hint().map(str::to_string);

    match kind {
        AsrProviderKind::WhisperGpu => whisper_cpp(backend, model_ref, true, config, profile),
        AsrProviderKind::WhisperCpu => whisper_cpp(backend, model_ref, false, config, profile),
        AsrProviderKind::Openvino => openvino(backend, model_ref, config, profile),
        AsrProviderKind::Openai => Ok(Box::new(OpenAiTranscriber::new(
            &config.credentials,
            config.asr.remote_model.as_str(),
            language,
        )?)),
    }
}

#[cfg(feature = "whisper-cpp")]
fn whisper_cpp(
    _backend: &str,
    model_ref: &str,
    gpu: bool,
    config: &AppConfig,
    profile: &HardwareProfile,
) -> Result<Box<dyn SpeechToText>, DomainError> {
    use crate::adapters::whisper_cpp::{locate_ggml_model, WhisperCppTranscriber};

    let model_path = locate_ggml_model(model_ref, &config.backend.models_dir);
    let threads = match config.asr.threads {
        0 => profile.recommended_threads(),
        n => n,
    };
    let language = config.asr.language_hint().map(str::to_string);

    Ok(Box::new(WhisperCppTranscriber::load(
        &model_path,
        gpu,
        threads,
        language,
    )?))
}

#[cfg(not(feature = "whisper-cpp"))]
fn whisper_cpp(
    backend: &str,
    _model_ref: &str,
    _gpu: bool,
    _config: &AppConfig,
    _profile: &HardwareProfile,
) -> Result<Box<dyn SpeechToText>, DomainError> {
    Err(DomainError::not_compiled(backend, "whisper-cpp"))
}

#[cfg(feature = "openvino")]
fn openvino(
    _backend: &str,
    model_ref: &str,
    config: &AppConfig,
    profile: &HardwareProfile,
) -> Result<Box<dyn SpeechToText>, DomainError> {
    use crate::adapters::openvino_whisper::{locate_whisper_dir, OpenvinoWhisper};

    let model_dir = locate_whisper_dir(model_ref, &config.backend.models_dir);
    Ok(Box::new(OpenvinoWhisper::load(
        &model_dir,
        profile.openvino_device(),
        config.asr.language_hint(),
    )?))
}

#[cfg(not(feature = "openvino"))]
fn openvino(
    backend: &str,
    _model_ref: &str,
    _config: &AppConfig,
    _profile: &HardwareProfile,
) -> Result<Box<dyn SpeechToText>, DomainError> {
    Err(DomainError::not_compiled(backend, "openvino"))
}
