use tracing::info;

use crate::adapters::openai::OpenAiChat;
use crate::domain::{AppConfig, DomainError, HardwareProfile};
use crate::ports::TextGenerator;

/// Text-generation provider a backend identifier maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    /// OpenAI chat completions.
    Openai,
    /// Quantized GGUF model on the CPU.
    Gguf,
    /// IR model on the OpenVINO runtime.
    Openvino,
}

/// Pick the provider for `backend`.
///
/// Unlike speech, there is no silent fallback: an unknown identifier (the
/// accelerator one included, which is routed to the cloud before it gets
/// here) is a configuration error.
pub fn provider_kind(backend: &str) -> Result<LlmProviderKind, DomainError> {
    match backend.trim().to_lowercase().as_str() {
        "openai" => Ok(LlmProviderKind::Openai),
        "cpu_legacy" | "cpu" | "llama_cpp" => Ok(LlmProviderKind::Gguf),
        "openvino" => Ok(LlmProviderKind::Openvino),
        other => Err(DomainError::UnsupportedBackend {
            capability: "text generation",
            backend: other.to_string(),
        }),
    }
}

/// Build the text-generation provider for `backend`.
///
/// `model_ref` is the resolved artifact for local backends and the model
/// identifier for the cloud one.
pub fn create(
    backend: &str,
    model_ref: &str,
    config: &AppConfig,
    profile: &HardwareProfile,
) -> Result<Box<dyn TextGenerator>, DomainError> {
    let kind = provider_kind(backend)?;
    info!(backend, kind = ?kind, model = model_ref, "Creating text-generation provider");

    match kind {
        LlmProviderKind::Openai => Ok(Box::new(OpenAiChat::new(&config.credentials, model_ref)?)),
        LlmProviderKind::Gguf => gguf(backend, model_ref, config),
        LlmProviderKind::Openvino => openvino(backend, model_ref, config, profile),
    }
}

#[cfg(feature = "gguf")]
fn gguf(
    _backend: &str,
    model_ref: &str,
    config: &AppConfig,
) -> Result<Box<dyn TextGenerator>, DomainError> {
    use crate::adapters::gguf_llm::GgufChat;

    Ok(Box::new(GgufChat::load(
        std::path::Path::new(model_ref),
        &config.llm,
    )?))
}

#[cfg(not(feature = "gguf"))]
fn gguf(
    backend: &str,
    _model_ref: &str,
    _config: &AppConfig,
) -> Result<Box<dyn TextGenerator>, DomainError> {
    Err(DomainError::not_compiled(backend, "gguf"))
}

#[cfg(feature = "openvino")]
fn openvino(
    _backend: &str,
    model_ref: &str,
    config: &AppConfig,
    profile: &HardwareProfile,
) -> Result<Box<dyn TextGenerator>, DomainError> {
    use crate::adapters::openvino_llm::OpenvinoChat;

    Ok(Box::new(OpenvinoChat::load(
        std::path::Path::new(model_ref),
        &config.llm,
        profile.openvino_device(),
    )?))
}

#[cfg(not(feature = "openvino"))]
fn openvino(
    backend: &str,
    _model_ref: &str,
    _config: &AppConfig,
    _profile: &HardwareProfile,
) -> Result<Box<dyn TextGenerator>, DomainError> {
    Err(DomainError::not_compiled(backend, "openvino"))
}
