//! Tokenizer discovery shared by the local text engines.

use std::path::{Path, PathBuf};

use tokenizers::Tokenizer;
use tracing::debug;

use crate::domain::prompt::STOP_TOKENS;
use crate::domain::{DomainError, PromptTemplate};

/// Candidate `tokenizer.json` locations for a model artifact.
///
/// A model directory is searched inside; a model file is searched next to it,
/// first as `{stem}.tokenizer.json`, then as a plain `tokenizer.json`.
pub fn tokenizer_candidates(model_path: &Path) -> Vec<PathBuf> {
    if model_path.is_dir() {
        return vec![model_path.join("tokenizer.json")];
    }

    let dir = match model_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut candidates = Vec::with_capacity(2);
    if let Some(stem) = model_path.file_stem() {
        candidates.push(dir.join(format!("{}.tokenizer.json", stem.to_string_lossy())));
    }
    candidates.push(dir.join("tokenizer.json"));
    candidates
}

/// Load the tokenizer belonging to a model artifact.
pub fn load_tokenizer(model_path: &Path) -> Result<Tokenizer, DomainError> {
    let candidates = tokenizer_candidates(model_path);
    let path = candidates.iter().find(|p| p.is_file()).ok_or_else(|| {
        DomainError::ModelNotFound(format!(
            "tokenizer.json for {} (looked in {:?})",
            model_path.display(),
            candidates
        ))
    })?;

    debug!(path = ?path, "Loading tokenizer");
    Tokenizer::from_file(path)
        .map_err(|e| DomainError::ModelLoad(format!("Failed to load tokenizer: {}", e)))
}

/// Prompt layout matching the tokenizer's special tokens.
pub fn prompt_template(tokenizer: &Tokenizer) -> PromptTemplate {
    PromptTemplate::detect(|token| tokenizer.token_to_id(token).is_some())
}

/// Ids of the end-of-turn tokens present in the vocabulary.
pub fn stop_token_ids(tokenizer: &Tokenizer) -> Vec<u32> {
    STOP_TOKENS
        .iter()
        .filter_map(|token| tokenizer.token_to_id(token))
        .collect()
}
