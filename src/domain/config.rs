use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::backend::AUTO;

/// Placeholder shipped in sample configs; treated as "no key".
const API_KEY_PLACEHOLDER: &str = "sk-YOURAPIKEY";

/// Backend selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// "auto" or a backend identifier ("cuda", "openvino", "cpu_legacy", "cpu", "openai").
    pub preference: String,
    /// Directory searched for bare model names.
    pub models_dir: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            preference: AUTO.to_string(),
            models_dir: PathBuf::from("models"),
        }
    }
}

/// Speech-to-text configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    /// Local model name or path.
    pub model: String,
    /// Language code (e.g., "en", "fr", "auto").
    pub language: String,
    /// Number of threads for whisper.cpp (0 = auto).
    pub threads: u32,
    /// Model name for the cloud transcription endpoint.
    pub remote_model: String,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            model: "base.en".to_string(),
            language: "auto".to_string(),
            threads: 0,
            remote_model: "whisper-1".to_string(),
        }
    }
}

impl AsrConfig {
    /// Language hint, or `None` for auto-detection.
    pub fn language_hint(&self) -> Option<&str> {
        match self.language.trim() {
            "" | "auto" => None,
            lang => Some(lang),
        }
    }
}

/// Text-generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Local model name or path, resolved per backend.
    pub local_model: String,
    /// Model identifier for the cloud API.
    pub remote_model: String,
    /// Context window for GGUF models, in tokens.
    pub context_length: usize,
    /// Upper bound on generated tokens.
    pub max_tokens: usize,
    /// Sampling temperature for local engines.
    pub temperature: f64,
    /// Sampling seed for local engines.
    pub seed: u64,
    /// Fixed prompt length for OpenVINO models (static shapes).
    pub openvino_prompt_length: usize,
    /// Generated-token limit for OpenVINO models.
    pub openvino_max_new_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            local_model: "models/assistant-llm".to_string(),
            remote_model: "gpt-4.1-mini".to_string(),
            context_length: 2048,
            max_tokens: 2048,
            temperature: 0.7,
            seed: 42,
            openvino_prompt_length: 512,
            openvino_max_new_tokens: 128,
        }
    }
}

/// Credentials for remote backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// OpenAI API key. Empty or placeholder values count as missing.
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible API base URL.
    pub openai_base_url: String,
    /// Request timeout for remote calls, in seconds.
    pub timeout_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

impl CredentialsConfig {
    /// The usable API key, if any.
    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != API_KEY_PLACEHOLDER)
    }
}

/// Conversation loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// System prompt seeded into a fresh history.
    pub system_prompt: String,
    /// History file; relative paths live under the data directory.
    pub history_file: PathBuf,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a friendly, concise voice assistant.".to_string(),
            history_file: PathBuf::from("chat_history.json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
    /// Maximum number of log files to keep.
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
            max_files: 7,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub asr: AsrConfig,
    pub llm: LlmConfig,
    pub credentials: CredentialsConfig,
    pub conversation: ConversationConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::new();
        assert_eq!(config.backend.preference, "auto");
        assert_eq!(config.llm.context_length, 2048);
        assert_eq!(config.llm.openvino_prompt_length, 512);
        assert!(config.credentials.openai_api_key().is_none());
    }

    #[test]
    fn test_placeholder_key_is_absent() {
        let mut creds = CredentialsConfig::default();

        creds.openai_api_key = Some(String::new());
        assert!(creds.openai_api_key().is_none());

        creds.openai_api_key = Some("sk-YOURAPIKEY".to_string());
        assert!(creds.openai_api_key().is_none());

        creds.openai_api_key = Some("  sk-live  ".to_string());
        assert_eq!(creds.openai_api_key(), Some("sk-live"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [backend]
            preference = "cpu_legacy"

            [llm]
            local_model = "models/chat"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.preference, "cpu_legacy");
        assert_eq!(config.backend.models_dir, PathBuf::from("models"));
        assert_eq!(config.llm.local_model, "models/chat");
        assert_eq!(config.llm.remote_model, "gpt-4.1-mini");
        assert_eq!(config.asr.model, "base.en");
    }

    #[test]
    fn test_language_hint() {
        let mut asr = AsrConfig::default();
        assert_eq!(asr.language_hint(), None);
        asr.language = "de".to_string();
        assert_eq!(asr.language_hint(), Some("de"));
    }
}
