use std::path::{Path, PathBuf};

use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::adapters::audio_file::load_wav_mono_16k;
use crate::domain::DomainError;
use crate::ports::SpeechToText;

/// Speech-to-text through whisper.cpp via whisper-rs.
pub struct WhisperCppTranscriber {
    context: WhisperContext,
    threads: u32,
    language: Option<String>,
    name: String,
}

impl WhisperCppTranscriber {
    /// Load a ggml model.
    ///
    /// `threads` of 0 means auto-detect (cores - 1). `gpu` asks whisper.cpp to
    /// offload to the GPU when it was built with CUDA.
    pub fn load(
        model_path: &Path,
        gpu: bool,
        threads: u32,
        language: Option<String>,
    ) -> Result<Self, DomainError> {
        if !model_path.exists() {
            return Err(DomainError::ModelNotFound(
                model_path.to_string_lossy().to_string(),
            ));
        }

        let actual_threads = if threads == 0 {
            std::thread::available_parallelism()
                .map(|p| std::cmp::max(1, p.get() as u32 - 1))
                .unwrap_or(1)
        } else {
            threads
        };

        info!(path = ?model_path, gpu, threads = actual_threads, "Loading whisper model");

        let mut params = WhisperContextParameters::default();
        params.use_gpu(gpu);

        let path_str = model_path.to_string_lossy().to_string();
        let context = WhisperContext::new_with_params(&path_str, params)
            .map_err(|e| DomainError::ModelLoad(format!("Failed to load whisper model: {}", e)))?;

        info!(path = ?model_path, "Whisper model loaded successfully");

        Ok(Self {
            context,
            threads: actual_threads,
            language,
            name: if gpu { "whisper.cpp (gpu)" } else { "whisper.cpp" }.to_string(),
        })
    }

    /// Run inference over 16 kHz mono samples.
    fn transcribe_samples(&self, samples: &[f32]) -> Result<String, DomainError> {
        if samples.is_empty() {
            return Ok(String::new());
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.threads as i32);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        // Set language if specified, otherwise auto-detect
        if let Some(ref lang) = self.language {
            params.set_language(Some(lang));
        }

        let mut state = self.context.create_state().map_err(|e| {
            DomainError::Inference(format!("Failed to create whisper state: {}", e))
        })?;

        state
            .full(params, samples)
            .map_err(|e| DomainError::Inference(format!("Transcription failed: {}", e)))?;

        let num_segments = state.full_n_segments().map_err(|e| {
            DomainError::Inference(format!("Failed to get segment count: {}", e))
        })?;

        let mut text = String::new();
        for i in 0..num_segments {
            if let Ok(segment_text) = state.full_get_segment_text(i) {
                text.push_str(&segment_text);
            }
        }

        Ok(text.trim().to_string())
    }
}

impl SpeechToText for WhisperCppTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, DomainError> {
        let samples = load_wav_mono_16k(audio_path)?;
        debug!(samples = samples.len(), threads = self.threads, "Starting transcription");

        let start = std::time::Instant::now();
        let text = self.transcribe_samples(&samples)?;

        info!(
            text_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Transcription complete"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Locate a ggml model for a configured name.
///
/// An existing path wins; otherwise `ggml-{name}.bin` then `{name}.bin` in the
/// models directory. Returns the input when nothing matches so the load error
/// names what was configured.
pub fn locate_ggml_model(name_or_path: &str, models_dir: &Path) -> PathBuf {
    let direct = PathBuf::from(name_or_path);
    if direct.is_file() {
        return direct;
    }

    [
        format!("ggml-{}.bin", name_or_path),
        format!("{}.bin", name_or_path),
    ]
    .iter()
    .map(|name| models_dir.join(name))
    .find(|candidate| candidate.is_file())
    .unwrap_or(direct)
}
