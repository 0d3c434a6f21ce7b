use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::domain::{ConversationMessage, DomainError};
use crate::ports::HistoryStore;

/// Conversation history kept as a pretty-printed JSON array.
///
/// Writes go to a temporary sibling that is renamed over the target, so an
/// interrupted save leaves the previous file intact.
pub struct JsonHistoryStore {
    path: PathBuf,
    system_prompt: String,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>, system_prompt: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seed(&self) -> Vec<ConversationMessage> {
        vec![ConversationMessage::system(self.system_prompt.as_str())]
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load(&self) -> Result<Vec<ConversationMessage>, DomainError> {
        if !self.path.exists() {
            debug!(path = ?self.path, "No history file, starting fresh");
            return Ok(self.seed());
        }

        let content = fs::read_to_string(&self.path)?;
        let messages: Vec<ConversationMessage> = serde_json::from_str(&content)?;
        info!(path = ?self.path, messages = messages.len(), "History loaded");
        Ok(messages)
    }

    fn save(&self, messages: &[ConversationMessage]) -> Result<(), DomainError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(messages)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| DomainError::Io(format!("Failed to replace history file: {}", e)))?;

        debug!(path = ?self.path, messages = messages.len(), "History saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), DomainError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = ?self.path, "History cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> JsonHistoryStore {
        JsonHistoryStore::new(dir.path().join("chat_history.json"), "Be brief.")
    }

    #[test]
    fn test_fresh_history_is_seeded() {
        let dir = TempDir::new().unwrap();
        let messages = store(&dir).load().unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].text(), "Be brief.");
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut messages = store.load().unwrap();
        messages.push(ConversationMessage::user("hello"));
        messages.push(ConversationMessage::assistant("hi"));
        store.save(&messages).unwrap();

        assert_eq!(store.load().unwrap(), messages);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  {"), "history should be pretty-printed");
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.save(&[ConversationMessage::user("one")]).unwrap();
        store.save(&[ConversationMessage::user("two")]).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_structured_content_survives() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(
            store.path(),
            r#"[{"role":"user","content":[{"type":"input_text","text":"hey"},{"type":"image","url":"x.png"}]}]"#,
        )
        .unwrap();

        let messages = store.load().unwrap();
        assert_eq!(messages[0].text(), "hey");

        store.save(&messages).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("x.png"));
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.save(&[ConversationMessage::user("hello")]).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());

        // Clearing twice is fine.
        store.clear().unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(
            store.load(),
            Err(DomainError::Serialization(_))
        ));
    }
}
