use thiserror::Error;

/// Domain-level errors for TierChat.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Unsupported {capability} backend: {backend}")]
    UnsupportedBackend {
        capability: &'static str,
        backend: String,
    },

    #[error("Backend '{backend}' is unavailable: {reason}")]
    DependencyMissing { backend: String, reason: String },

    #[error("Hardware detection error: {0}")]
    Hardware(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("HTTP request failed: {0}")]
    HttpRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl DomainError {
    /// Errors that should stop startup rather than a single turn.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DomainError::Config(_)
                | DomainError::MissingCredential(_)
                | DomainError::UnsupportedBackend { .. }
        )
    }

    /// Shorthand for a backend whose engine feature was not compiled in.
    pub fn not_compiled(backend: &str, feature: &str) -> Self {
        DomainError::DependencyMissing {
            backend: backend.to_string(),
            reason: format!("the `{}` feature is not compiled in", feature),
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DomainError {
    fn from(err: toml::ser::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for DomainError {
    fn from(err: reqwest::Error) -> Self {
        DomainError::HttpRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_class() {
        assert!(DomainError::Config("bad".into()).is_configuration());
        assert!(DomainError::MissingCredential("OPENAI_API_KEY".into()).is_configuration());
        assert!(DomainError::UnsupportedBackend {
            capability: "text generation",
            backend: "tpu".into(),
        }
        .is_configuration());

        assert!(!DomainError::Inference("boom".into()).is_configuration());
        assert!(!DomainError::not_compiled("openvino", "openvino").is_configuration());
    }

    #[test]
    fn test_not_compiled_message() {
        let err = DomainError::not_compiled("cpu_legacy", "gguf");
        assert_eq!(
            err.to_string(),
            "Backend 'cpu_legacy' is unavailable: the `gguf` feature is not compiled in"
        );
    }
}
