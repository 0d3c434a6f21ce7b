use crate::domain::{ConversationMessage, DomainError};

/// Port for text-generation providers.
///
/// Implementations normalize message content with
/// [`normalize_messages`](crate::domain::conversation::normalize_messages)
/// before handing it to their engine.
pub trait TextGenerator: Send {
    /// Generate the assistant's reply to a conversation.
    fn generate(&self, messages: &[ConversationMessage]) -> Result<String, DomainError>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}
