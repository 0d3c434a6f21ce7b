use std::path::Path;

use crate::domain::DomainError;

/// Port for speech-to-text providers.
///
/// A provider is ready once constructed; each call is independent and a
/// failed call leaves the provider usable.
pub trait SpeechToText: Send {
    /// Transcribe an audio file to text.
    fn transcribe(&self, audio_path: &Path) -> Result<String, DomainError>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}
