//! OpenAI cloud providers.
//!
//! Chat completions for text generation and the transcription endpoint for
//! speech. Both use a blocking reqwest client built once at construction.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::domain::config::CredentialsConfig;
use crate::domain::conversation::normalize_messages;
use crate::domain::{ConversationMessage, DomainError, PlainMessage};
use crate::ports::{SpeechToText, TextGenerator};

/// Sampling temperature sent with chat requests.
const CHAT_TEMPERATURE: f32 = 1.0;
/// Nucleus sampling cutoff sent with chat requests.
const CHAT_TOP_P: f32 = 1.0;
/// Reply length cap sent with chat requests.
const CHAT_MAX_TOKENS: u32 = 2048;

/// Shared HTTP plumbing for the OpenAI endpoints.
struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Zeroizing<String>,
}

impl OpenAiClient {
    fn new(credentials: &CredentialsConfig) -> Result<Self, DomainError> {
        let api_key = credentials.openai_api_key().ok_or_else(|| {
            DomainError::MissingCredential(
                "OpenAI API key (credentials.openai_api_key or OPENAI_API_KEY)".to_string(),
            )
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(credentials.timeout_secs))
            .build()
            .map_err(|e| DomainError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: credentials.openai_base_url.trim_end_matches('/').to_string(),
            api_key: Zeroizing::new(api_key.to_string()),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Turn a non-success response into an error carrying the API message.
    fn check(response: Response) -> Result<Response, DomainError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(DomainError::HttpRequest(api_error_message(status.as_u16(), &body)))
    }
}

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PlainMessage],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

/// Chat completions response body (only the fields we read).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Transcription response body.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Readable message for a failed call, preferring the API's own explanation.
fn api_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => match api_error.error.code {
            Some(code) => format!("OpenAI API error {} ({}): {}", status, code, api_error.error.message),
            None => format!("OpenAI API error {}: {}", status, api_error.error.message),
        },
        Err(_) => format!("OpenAI API error {}: {}", status, body.trim()),
    }
}

/// Text of the first choice.
fn first_choice(response: ChatResponse) -> Result<String, DomainError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| DomainError::Inference("OpenAI response contained no choices".to_string()))
}

/// Text generation through the chat completions endpoint.
pub struct OpenAiChat {
    http: OpenAiClient,
    model: String,
}

impl OpenAiChat {
    /// Build the client. Fails when no usable API key is configured.
    pub fn new(credentials: &CredentialsConfig, model: impl Into<String>) -> Result<Self, DomainError> {
        let http = OpenAiClient::new(credentials)?;
        let model = model.into();
        info!(model = %model, base_url = %http.base_url, "OpenAI chat client ready");
        Ok(Self { http, model })
    }
}

impl TextGenerator for OpenAiChat {
    fn generate(&self, messages: &[ConversationMessage]) -> Result<String, DomainError> {
        let messages = normalize_messages(messages);
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            temperature: CHAT_TEMPERATURE,
            top_p: CHAT_TOP_P,
            max_tokens: CHAT_MAX_TOKENS,
        };

        debug!(model = %self.model, messages = messages.len(), "Sending chat request");

        let response = self
            .http
            .client
            .post(self.http.url("chat/completions"))
            .bearer_auth(self.http.api_key.as_str())
            .json(&request)
            .send()?;

        let body: ChatResponse = OpenAiClient::check(response)
            .inspect_err(|e| warn!(error = %e, "Chat request failed"))?
            .json()?;

        first_choice(body)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Speech-to-text through the transcription endpoint.
pub struct OpenAiTranscriber {
    http: OpenAiClient,
    model: String,
    language: Option<String>,
}

impl OpenAiTranscriber {
    /// Build the client. Fails when no usable API key is configured.
    pub fn new(
        credentials: &CredentialsConfig,
        model: impl Into<String>,
        language: Option<String>,
    ) -> Result<Self, DomainError> {
        let http = OpenAiClient::new(credentials)?;
        let model = model.into();
        info!(model = %model, "OpenAI transcription client ready");
        Ok(Self {
            http,
            model,
            language,
        })
    }
}

impl SpeechToText for OpenAiTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, DomainError> {
        let data = fs::read(audio_path)
            .map_err(|e| DomainError::Audio(format!("Failed to read {}: {}", audio_path.display(), e)))?;
        if data.is_empty() {
            return Err(DomainError::Audio("Audio file is empty".to_string()));
        }

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let file_part = Part::bytes(data)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| DomainError::Audio(format!("Invalid MIME type: {}", e)))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());
        if let Some(lang) = &self.language {
            form = form.text("language", lang.clone());
        }

        debug!(path = ?audio_path, model = %self.model, "Sending transcription request");

        let response = self
            .http
            .client
            .post(self.http.url("audio/transcriptions"))
            .bearer_auth(self.http.api_key.as_str())
            .multipart(form)
            .send()?;

        let body: TranscriptionResponse = OpenAiClient::check(response)?.json()?;
        Ok(body.text.trim().to_string())
    }

    fn name(&self) -> &str {
        "openai-whisper"
    }
}
