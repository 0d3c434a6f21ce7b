use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::model::has_4bit_marker;
use crate::domain::{Backend, ModelFamily};
use crate::ports::ModelResolver;

/// Resolver over a local models directory.
///
/// Only reads the filesystem. A miss is not an error: the input comes back
/// unchanged and the provider reports whatever it fails to load.
#[derive(Debug, Clone)]
pub struct LocalModelResolver {
    models_dir: PathBuf,
}

impl LocalModelResolver {
    /// Create a resolver searching `models_dir` for bare model names.
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Split the input into (search directory, base name).
    ///
    /// An existing path is searched next to itself under its stem. A bare
    /// name is searched under the models directory; any directory part it
    /// carries is appended to that directory.
    fn search_root(&self, name_or_path: &str) -> (PathBuf, String) {
        let path = Path::new(name_or_path);
        let (dir, base) = if path.exists() {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            (dir, path.file_stem())
        } else {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => self.models_dir.join(parent),
                _ => self.models_dir.clone(),
            };
            (dir, path.file_name())
        };
        let base = base
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name_or_path.to_string());
        (dir, base)
    }

    /// Probe the family's candidate names in preference order.
    fn probe_candidates(dir: &Path, base: &str, family: ModelFamily) -> Option<PathBuf> {
        family
            .preference()
            .iter()
            .map(|quant| dir.join(quant.artifact_name(base)))
            .find(|candidate| candidate.is_file())
    }

    /// Scan for `{base}*.gguf`, preferring a 4-bit file.
    ///
    /// Names are sorted first so the pick does not depend on listing order.
    fn scan_gguf(dir: &Path, base: &str) -> Option<PathBuf> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = ?dir, error = %e, "Models directory not readable");
                return None;
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(base) && name.ends_with(".gguf"))
            .collect();
        names.sort();

        let pick = names
            .iter()
            .find(|name| has_4bit_marker(name))
            .or_else(|| names.first())?;

        Some(dir.join(pick))
    }
}

impl ModelResolver for LocalModelResolver {
    fn resolve(&self, name_or_path: &str, backend: Backend) -> PathBuf {
        let family = backend.model_family();
        let fallback = PathBuf::from(name_or_path);

        let resolved = match family {
            ModelFamily::Remote => None,
            ModelFamily::OpenvinoIr => {
                let (dir, base) = self.search_root(name_or_path);
                Self::probe_candidates(&dir, &base, family)
            }
            ModelFamily::Gguf => {
                let (dir, base) = self.search_root(name_or_path);
                Self::probe_candidates(&dir, &base, family)
                    .or_else(|| Self::scan_gguf(&dir, &base))
            }
        };

        match resolved {
            Some(path) => {
                info!(input = name_or_path, backend = %backend, path = ?path, "Model resolved");
                path
            }
            None => {
                debug!(input = name_or_path, backend = %backend, "No artifact found, using input as-is");
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"weights").unwrap();
        path
    }

    #[test]
    fn test_ir_int4_beats_int8() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "chat_int8.xml");
        let int4 = touch(dir.path(), "chat_int4.xml");
        touch(dir.path(), "chat.xml");

        let resolver = LocalModelResolver::new(dir.path());
        assert_eq!(resolver.resolve("chat", Backend::Openvino), int4);
    }

    #[test]
    fn test_ir_plain_xml_last() {
        let dir = TempDir::new().unwrap();
        let plain = touch(dir.path(), "chat.xml");

        let resolver = LocalModelResolver::new(dir.path());
        assert_eq!(resolver.resolve("chat", Backend::Openvino), plain);
    }

    #[test]
    fn test_existing_xml_returned_unchanged() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "chat_int4.xml");
        let fp16 = touch(dir.path(), "chat_fp16.xml");
        let input = fp16.to_string_lossy().into_owned();

        let resolver = LocalModelResolver::new("unused");
        assert_eq!(resolver.resolve(&input, Backend::Openvino), fp16);
    }

    #[test]
    fn test_existing_plain_xml_prefers_int4_sibling() {
        let dir = TempDir::new().unwrap();
        let plain = touch(dir.path(), "chat.xml");
        let int4 = touch(dir.path(), "chat_int4.xml");
        let input = plain.to_string_lossy().into_owned();

        let resolver = LocalModelResolver::new("unused");
        assert_eq!(resolver.resolve(&input, Backend::Openvino), int4);
    }

    #[test]
    fn test_gguf_q4_k_m_beats_q8_0() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "chat.q8_0.gguf");
        let q4 = touch(dir.path(), "chat.q4_k_m.gguf");

        let resolver = LocalModelResolver::new(dir.path());
        assert_eq!(resolver.resolve("chat", Backend::CpuLegacy), q4);
        assert_eq!(resolver.resolve("chat", Backend::Cpu), q4);
    }

    #[test]
    fn test_existing_path_uses_parent_and_stem() {
        let dir = TempDir::new().unwrap();
        let plain = touch(dir.path(), "chat.gguf");
        let q8 = touch(dir.path(), "chat.q8_0.gguf");
        let input = plain.to_string_lossy().into_owned();

        // Search happens next to the file, not in the configured directory.
        let resolver = LocalModelResolver::new("elsewhere");
        assert_eq!(resolver.resolve(&input, Backend::CpuLegacy), q8);
    }

    #[test]
    fn test_scan_prefers_4bit_marker() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "chat-7b-Q8.gguf");
        let q4 = touch(dir.path(), "chat-7b-Q4_0.gguf");
        touch(dir.path(), "other-q4.gguf");

        let resolver = LocalModelResolver::new(dir.path());
        assert_eq!(resolver.resolve("chat", Backend::CpuLegacy), q4);
    }

    #[test]
    fn test_scan_follows_directory_in_name() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        let q4 = touch(&sub, "chat-Q4_0.gguf");
        touch(dir.path(), "chat-Q4_0.gguf");

        let resolver = LocalModelResolver::new(dir.path());
        assert_eq!(resolver.resolve("sub/chat", Backend::CpuLegacy), q4);
    }

    #[test]
    fn test_candidates_follow_directory_in_name() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        let q4 = touch(&sub, "chat.q4_k_m.gguf");

        let resolver = LocalModelResolver::new(dir.path());
        assert_eq!(resolver.resolve("sub/chat", Backend::CpuLegacy), q4);
    }

    #[test]
    fn test_scan_is_sorted_without_marker() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "chat-b-f16.gguf");
        let first = touch(dir.path(), "chat-a-f16.gguf");

        let resolver = LocalModelResolver::new(dir.path());
        assert_eq!(resolver.resolve("chat", Backend::CpuLegacy), first);
    }

    #[test]
    fn test_no_match_returns_input() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "unrelated.bin");

        let resolver = LocalModelResolver::new(dir.path());
        assert_eq!(
            resolver.resolve("chat", Backend::Openvino),
            PathBuf::from("chat")
        );
        assert_eq!(
            resolver.resolve("chat", Backend::CpuLegacy),
            PathBuf::from("chat")
        );
    }

    #[test]
    fn test_missing_directory_returns_input() {
        let resolver = LocalModelResolver::new("/nonexistent/models/dir");
        assert_eq!(
            resolver.resolve("chat", Backend::CpuLegacy),
            PathBuf::from("chat")
        );
    }

    #[test]
    fn test_remote_backends_bypass() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "gpt-4.1-mini.gguf");

        let resolver = LocalModelResolver::new(dir.path());
        assert_eq!(
            resolver.resolve("gpt-4.1-mini", Backend::Openai),
            PathBuf::from("gpt-4.1-mini")
        );
        assert_eq!(
            resolver.resolve("gpt-4.1-mini", Backend::Cuda),
            PathBuf::from("gpt-4.1-mini")
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "chat.q8_0.gguf");
        touch(dir.path(), "chat-extra.gguf");

        let resolver = LocalModelResolver::new(dir.path());
        let first = resolver.resolve("chat", Backend::CpuLegacy);
        let second = resolver.resolve("chat", Backend::CpuLegacy);
        assert_eq!(first, second);

        // Feeding the result back in lands on the same file.
        let again = resolver.resolve(&first.to_string_lossy(), Backend::CpuLegacy);
        assert_eq!(again, first);
    }
}
