use std::path::Path;

use tracing::{debug, info, warn};

use crate::domain::{ConversationMessage, DomainError};
use crate::ports::{HistoryStore, SpeechToText, TextGenerator};

/// One running conversation: providers, the history store and the messages
/// exchanged so far.
pub struct Session {
    llm: Box<dyn TextGenerator>,
    asr: Option<Box<dyn SpeechToText>>,
    history: Box<dyn HistoryStore>,
    messages: Vec<ConversationMessage>,
}

impl Session {
    /// Start a session from the stored history.
    pub fn new(
        llm: Box<dyn TextGenerator>,
        asr: Option<Box<dyn SpeechToText>>,
        history: Box<dyn HistoryStore>,
    ) -> Result<Self, DomainError> {
        let messages = history.load()?;
        info!(
            llm = llm.name(),
            asr = ?asr.as_ref().map(|a| a.name()),
            messages = messages.len(),
            "Session started"
        );
        Ok(Self {
            llm,
            asr,
            history,
            messages,
        })
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn has_voice(&self) -> bool {
        self.asr.is_some()
    }

    /// Answer one user turn.
    ///
    /// History only changes when generation succeeds; a failed turn leaves
    /// both memory and file as they were.
    pub fn respond(&mut self, user_text: &str) -> Result<String, DomainError> {
        let mut turn = self.messages.clone();
        turn.push(ConversationMessage::user(user_text));

        let reply = self.llm.generate(&turn)?;
        debug!(reply_chars = reply.len(), "Reply generated");

        turn.push(ConversationMessage::assistant(reply.as_str()));
        self.messages = turn;

        if let Err(e) = self.history.save(&self.messages) {
            warn!(error = %e, "Failed to persist history");
        }
        Ok(reply)
    }

    /// Transcribe an audio file. Empty transcripts come back as `None`.
    pub fn listen(&self, audio_path: &Path) -> Result<Option<String>, DomainError> {
        let asr = self
            .asr
            .as_ref()
            .ok_or_else(|| DomainError::Config("Voice input is not enabled".to_string()))?;

        let text = asr.transcribe(audio_path)?;
        let text = text.trim();
        if text.is_empty() {
            debug!(path = ?audio_path, "Empty transcript, skipping turn");
            return Ok(None);
        }
        Ok(Some(text.to_string()))
    }

    /// Forget the conversation and start again from the seeded history.
    pub fn clear(&mut self) -> Result<(), DomainError> {
        self.history.clear()?;
        self.messages = self.history.load()?;
        info!("Conversation cleared");
        Ok(())
    }
}
