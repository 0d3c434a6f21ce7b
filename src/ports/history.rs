use crate::domain::{ConversationMessage, DomainError};

/// Port for conversation history persistence.
pub trait HistoryStore: Send + Sync {
    /// Load the stored conversation, or a fresh one seeded with the system prompt.
    fn load(&self) -> Result<Vec<ConversationMessage>, DomainError>;

    /// Replace the stored conversation with `messages`.
    fn save(&self, messages: &[ConversationMessage]) -> Result<(), DomainError>;

    /// Delete the stored conversation.
    fn clear(&self) -> Result<(), DomainError>;
}
