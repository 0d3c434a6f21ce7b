//! Whisper speech recognition on the OpenVINO runtime.
//!
//! Expects an exported model directory holding `openvino_encoder_model.xml`,
//! `openvino_decoder_model.xml` (stateless, with `.bin` weights), `config.json`
//! and `tokenizer.json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_transformers::models::whisper::audio::pcm_to_mel;
use candle_transformers::models::whisper::Config as WhisperConfig;
use parking_lot::Mutex;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::adapters::audio_file::{load_wav_mono_16k, WHISPER_SAMPLE_RATE};
use crate::adapters::openvino_runtime::{f32_tensor, i64_tensor, last_logits, load_core, IrModel};
use crate::adapters::tokenizer::load_tokenizer;
use crate::domain::DomainError;
use crate::ports::SpeechToText;

const ENCODER_FILE: &str = "openvino_encoder_model.xml";
const DECODER_FILE: &str = "openvino_decoder_model.xml";

const N_FFT: usize = 400;
/// Frames in one 30 s window.
const N_FRAMES: usize = 3000;
/// Samples in one 30 s window.
const N_SAMPLES: usize = 30 * WHISPER_SAMPLE_RATE as usize;
/// Generated-token limit.
const MAX_NEW_TOKENS: usize = 448;
/// Vocabulary size from which a checkpoint is multilingual.
const MULTILINGUAL_VOCAB: usize = 51865;

/// Token ids steering the decoder.
#[derive(Debug, Clone, PartialEq)]
struct PromptTokens {
    prefix: Vec<u32>,
    end_of_text: u32,
}

impl PromptTokens {
    fn new(
        lookup: impl Fn(&str) -> Option<u32>,
        multilingual: bool,
        language: Option<&str>,
    ) -> Result<Self, DomainError> {
        let required = |token: &str| {
            lookup(token).ok_or_else(|| {
                DomainError::ModelLoad(format!("Tokenizer lacks special token {}", token))
            })
        };

        let mut prefix = vec![required("<|startoftranscript|>")?];
        if multilingual {
            if let Some(lang) = language {
                prefix.push(required(&format!("<|{}|>", lang))?);
            }
            prefix.push(required("<|transcribe|>")?);
        }
        prefix.push(required("<|notimestamps|>")?);

        Ok(Self {
            prefix,
            end_of_text: required("<|endoftext|>")?,
        })
    }
}

/// Slaney-style mel filter bank, `[n_mels, n_fft / 2 + 1]` row-major.
fn mel_filters(n_mels: usize, n_fft: usize, sample_rate: f64) -> Vec<f32> {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let log_step = (6.4f64).ln() / 27.0;

    let hz_to_mel = |hz: f64| {
        if hz < MIN_LOG_HZ {
            hz / F_SP
        } else {
            min_log_mel + (hz / MIN_LOG_HZ).ln() / log_step
        }
    };
    let mel_to_hz = |mel: f64| {
        if mel < min_log_mel {
            mel * F_SP
        } else {
            MIN_LOG_HZ * ((mel - min_log_mel) * log_step).exp()
        }
    };

    let n_bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();

    let max_mel = hz_to_mel(sample_rate / 2.0);
    let hz_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut filters = vec![0f32; n_mels * n_bins];
    for m in 0..n_mels {
        let (lo, center, hi) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
        let norm = 2.0 / (hi - lo);
        for (k, &f) in fft_freqs.iter().enumerate() {
            let rising = (f - lo) / (center - lo);
            let falling = (hi - f) / (hi - center);
            let weight = rising.min(falling).max(0.0) * norm;
            filters[m * n_bins + k] = weight as f32;
        }
    }
    filters
}

/// Log-mel features for exactly one 30 s window, `[n_mels, N_FRAMES]`.
fn log_mel_window(config: &WhisperConfig, samples: &[f32], filters: &[f32]) -> Vec<f32> {
    let mut padded = samples[..samples.len().min(N_SAMPLES)].to_vec();
    padded.resize(N_SAMPLES, 0.0);

    let mel = pcm_to_mel(config, &padded, filters);
    let n_mels = config.num_mel_bins;
    let frames = mel.len() / n_mels.max(1);
    let floor = mel.iter().copied().fold(f32::INFINITY, f32::min);

    let mut window = Vec::with_capacity(n_mels * N_FRAMES);
    for bin in 0..n_mels {
        let row = &mel[bin * frames..(bin + 1) * frames];
        let take = frames.min(N_FRAMES);
        window.extend_from_slice(&row[..take]);
        window.extend(std::iter::repeat(floor).take(N_FRAMES - take));
    }
    window
}

struct Models {
    encoder: IrModel,
    decoder: IrModel,
}

/// Whisper on OpenVINO: encoder on the selected device, decoder on CPU.
pub struct OpenvinoWhisper {
    models: Mutex<Models>,
    config: WhisperConfig,
    filters: Vec<f32>,
    tokenizer: Tokenizer,
    prompt: PromptTokens,
}

impl OpenvinoWhisper {
    pub fn load(model_dir: &Path, device: &str, language: Option<&str>) -> Result<Self, DomainError> {
        let start = Instant::now();
        let config_path = model_dir.join("config.json");
        let config: WhisperConfig = serde_json::from_str(&fs::read_to_string(&config_path).map_err(
            |e| DomainError::ModelNotFound(format!("{}: {}", config_path.display(), e)),
        )?)?;

        let mut core = load_core()?;
        let encoder = IrModel::compile(&mut core, &model_dir.join(ENCODER_FILE), device)?;
        // Autoregressive decoding is faster on CPU than on integrated GPUs.
        let decoder = IrModel::compile(&mut core, &model_dir.join(DECODER_FILE), "CPU")?;

        let tokenizer = load_tokenizer(model_dir)?;
        let multilingual = config.vocab_size >= MULTILINGUAL_VOCAB;
        let prompt = PromptTokens::new(|t| tokenizer.token_to_id(t), multilingual, language)?;
        let filters = mel_filters(config.num_mel_bins, N_FFT, WHISPER_SAMPLE_RATE as f64);

        info!(
            path = ?model_dir,
            device,
            multilingual,
            load_ms = start.elapsed().as_millis() as u64,
            "OpenVINO Whisper loaded"
        );

        Ok(Self {
            models: Mutex::new(Models { encoder, decoder }),
            config,
            filters,
            tokenizer,
            prompt,
        })
    }

    fn decode(&self, samples: &[f32]) -> Result<String, DomainError> {
        let n_mels = self.config.num_mel_bins;
        let features = log_mel_window(&self.config, samples, &self.filters);

        let mut models = self.models.lock();
        models.encoder.set(
            "input_features",
            &f32_tensor(&[1, n_mels as i64, N_FRAMES as i64], &features)?,
        )?;
        models.encoder.infer()?;
        let hidden = models.encoder.output("last_hidden_state")?;
        models.decoder.set("encoder_hidden_states", &hidden)?;

        let mut tokens: Vec<u32> = self.prompt.prefix.clone();
        let limit = MAX_NEW_TOKENS.min(self.config.max_target_positions.saturating_sub(tokens.len()));

        for _ in 0..limit {
            let ids: Vec<i64> = tokens.iter().map(|&t| t as i64).collect();
            models
                .decoder
                .set("input_ids", &i64_tensor(&[1, ids.len() as i64], &ids)?)?;
            models.decoder.infer()?;

            let logits = last_logits(&models.decoder.output("logits")?)?;
            let next = argmax(&logits);
            if next == self.prompt.end_of_text {
                break;
            }
            tokens.push(next);
        }

        debug!(tokens = tokens.len() - self.prompt.prefix.len(), "Whisper decoding finished");

        self.tokenizer
            .decode(&tokens[self.prompt.prefix.len()..], true)
            .map_err(|e| DomainError::Inference(format!("Decoding failed: {}", e)))
    }
}

fn argmax(values: &[f32]) -> u32 {
    values
        .iter()
        .enumerate()
        .fold((0usize, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0 as u32
}

impl SpeechToText for OpenvinoWhisper {
    fn transcribe(&self, audio_path: &Path) -> Result<String, DomainError> {
        let samples = load_wav_mono_16k(audio_path)?;
        if samples.is_empty() {
            return Ok(String::new());
        }

        let start = Instant::now();
        let text = self.decode(&samples)?;
        info!(
            text_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Transcription complete"
        );
        Ok(text.trim().to_string())
    }

    fn name(&self) -> &str {
        "openvino-whisper"
    }
}

/// Locate an exported Whisper directory for a configured name.
pub fn locate_whisper_dir(name_or_path: &str, models_dir: &Path) -> PathBuf {
    let direct = PathBuf::from(name_or_path);
    if direct.join(ENCODER_FILE).is_file() {
        return direct;
    }
    let nested = models_dir.join(name_or_path);
    if nested.join(ENCODER_FILE).is_file() {
        return nested;
    }
    direct
}
