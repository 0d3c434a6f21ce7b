use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Block kinds whose `text` is kept when flattening content.
const TEXT_BLOCK_KINDS: [&str; 3] = ["input_text", "output_text", "text"];

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled block of structured content.
///
/// Fields other than `type` and `text` are kept so history files round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContentBlock {
    /// A plain `text` block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            extra: serde_json::Map::new(),
        }
    }

    fn is_text_bearing(&self) -> bool {
        TEXT_BLOCK_KINDS.contains(&self.kind.as_str())
    }
}

/// Message content: either a plain string or a list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Flatten to plain text.
    ///
    /// Strings pass through untouched. For block lists, text-bearing blocks
    /// contribute their `text` (empty when missing) joined by single spaces;
    /// every other block is dropped.
    pub fn normalized(&self) -> Cow<'_, str> {
        match self {
            MessageContent::Text(text) => Cow::Borrowed(text),
            MessageContent::Blocks(blocks) => Cow::Owned(
                blocks
                    .iter()
                    .filter(|b| b.is_text_bearing())
                    .map(|b| b.text.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// A single turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Content flattened to plain text.
    pub fn text(&self) -> Cow<'_, str> {
        self.content.normalized()
    }
}

/// A message reduced to role and plain text, ready for an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainMessage {
    pub role: Role,
    pub content: String,
}

/// Normalize a whole conversation. Every text-generation provider goes
/// through this before talking to its engine.
pub fn normalize_messages(messages: &[ConversationMessage]) -> Vec<PlainMessage> {
    messages
        .iter()
        .map(|m| PlainMessage {
            role: m.role,
            content: m.text().into_owned(),
        })
        .collect()
}
