//! Quantized GGUF text generation on candle.

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use candle_core::quantized::gguf_file;
use candle_core::{Device, IndexOp, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights as QuantizedLlama;
use candle_transformers::models::quantized_qwen2::ModelWeights as QuantizedQwen2;
use parking_lot::Mutex;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::adapters::tokenizer::{load_tokenizer, prompt_template, stop_token_ids};
use crate::domain::config::LlmConfig;
use crate::domain::conversation::normalize_messages;
use crate::domain::{ConversationMessage, DomainError, PromptTemplate};
use crate::ports::TextGenerator;

fn candle_err(context: &str) -> impl Fn(candle_core::Error) -> DomainError + '_ {
    move |e| DomainError::Inference(format!("{}: {}", context, e))
}

/// Weights of the architectures we can run.
enum Weights {
    Llama(QuantizedLlama),
    Qwen2(QuantizedQwen2),
}

impl Weights {
    fn forward(&mut self, input: &Tensor, position: usize) -> candle_core::Result<Tensor> {
        match self {
            Weights::Llama(model) => model.forward(input, position),
            Weights::Qwen2(model) => model.forward(input, position),
        }
    }
}

/// Architecture key from GGUF metadata.
fn architecture(content: &gguf_file::Content) -> String {
    content
        .metadata
        .get("general.architecture")
        .and_then(|v| v.to_string().ok())
        .cloned()
        .unwrap_or_else(|| "llama".to_string())
}

/// Local text generation from a quantized GGUF file.
pub struct GgufChat {
    model: Mutex<Weights>,
    tokenizer: Tokenizer,
    template: PromptTemplate,
    stop_tokens: Vec<u32>,
    device: Device,
    context_length: usize,
    max_tokens: usize,
    temperature: f64,
    seed: u64,
}

impl GgufChat {
    /// Load weights and tokenizer. Fails when either is missing or unreadable.
    pub fn load(model_path: &Path, config: &LlmConfig) -> Result<Self, DomainError> {
        if !model_path.is_file() {
            return Err(DomainError::ModelNotFound(
                model_path.to_string_lossy().to_string(),
            ));
        }

        let start = Instant::now();
        let device = Device::Cpu;

        let mut file = File::open(model_path)?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| DomainError::ModelLoad(format!("Failed to read GGUF file: {}", e)))?;

        let eos_from_metadata = content
            .metadata
            .get("tokenizer.ggml.eos_token_id")
            .and_then(|v| v.to_u32().ok());

        let arch = architecture(&content);
        info!(path = ?model_path, arch = %arch, "Loading GGUF model");

        let model = match arch.as_str() {
            "qwen2" => QuantizedQwen2::from_gguf(content, &mut file, &device).map(Weights::Qwen2),
            "llama" | "mistral" => {
                QuantizedLlama::from_gguf(content, &mut file, &device).map(Weights::Llama)
            }
            other => {
                return Err(DomainError::ModelLoad(format!(
                    "Unsupported GGUF architecture: {}",
                    other
                )))
            }
        }
        .map_err(|e| DomainError::ModelLoad(format!("Failed to load model weights: {}", e)))?;

        let tokenizer = load_tokenizer(model_path)?;
        let template = prompt_template(&tokenizer);
        let mut stop_tokens = stop_token_ids(&tokenizer);
        if let Some(eos) = eos_from_metadata {
            if !stop_tokens.contains(&eos) {
                stop_tokens.push(eos);
            }
        }

        info!(
            template = ?template,
            stop_tokens = stop_tokens.len(),
            load_ms = start.elapsed().as_millis() as u64,
            "GGUF model loaded"
        );

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            template,
            stop_tokens,
            device,
            context_length: config.context_length,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            seed: config.seed,
        })
    }

    /// Sample a completion for an already rendered prompt.
    fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| DomainError::Inference(format!("Tokenization failed: {}", e)))?;

        let (input_ids, budget) = fit_context(encoding.get_ids(), self.context_length, self.max_tokens);
        if input_ids.len() < encoding.get_ids().len() {
            warn!(
                dropped = encoding.get_ids().len() - input_ids.len(),
                "Prompt exceeds context window, dropping oldest tokens"
            );
        }

        let mut model = self.model.lock();
        let temperature = (self.temperature > 0.0).then_some(self.temperature);
        let mut logits_processor = LogitsProcessor::new(self.seed, temperature, None);

        let mut generated: Vec<u32> = Vec::new();
        let mut next_input = input_ids.to_vec();
        let mut position = 0;

        for _ in 0..budget {
            let input = Tensor::new(next_input.as_slice(), &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(candle_err("Failed to build input"))?;
            let logits = model
                .forward(&input, position)
                .map_err(candle_err("Forward pass failed"))?;

            // [batch, vocab] or [batch, seq, vocab]
            let logits = if logits.dims().len() == 3 {
                let seq_len = logits.dim(1).map_err(candle_err("Bad logits shape"))?;
                logits.i((0, seq_len - 1))
            } else {
                logits.squeeze(0)
            }
            .map_err(candle_err("Bad logits shape"))?;

            let token = logits_processor
                .sample(&logits)
                .map_err(candle_err("Sampling failed"))?;
            if self.stop_tokens.contains(&token) {
                break;
            }

            position += next_input.len();
            generated.push(token);
            next_input = vec![token];
        }

        self.tokenizer
            .decode(&generated, true)
            .map_err(|e| DomainError::Inference(format!("Decoding failed: {}", e)))
    }
}

/// Trim a prompt to the context window, keeping the most recent tokens.
///
/// Returns the tokens to feed and how many may be generated after them.
fn fit_context(tokens: &[u32], context_length: usize, max_tokens: usize) -> (&[u32], usize) {
    let reserve = max_tokens.min(context_length / 2).max(1);
    let keep = context_length.saturating_sub(reserve).max(1);
    let tokens = if tokens.len() > keep {
        &tokens[tokens.len() - keep..]
    } else {
        tokens
    };
    let budget = max_tokens.min(context_length.saturating_sub(tokens.len()));
    (tokens, budget)
}

impl TextGenerator for GgufChat {
    fn generate(&self, messages: &[ConversationMessage]) -> Result<String, DomainError> {
        let prompt = self.template.render(&normalize_messages(messages));
        debug!(prompt_chars = prompt.len(), "Generating with GGUF model");

        let start = Instant::now();
        let reply = self.complete(&prompt)?;

        info!(
            reply_chars = reply.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "GGUF generation complete"
        );
        Ok(reply.trim().to_string())
    }

    fn name(&self) -> &str {
        "gguf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_context_short_prompt() {
        let tokens: Vec<u32> = (0..100).collect();
        let (kept, budget) = fit_context(&tokens, 2048, 2048);
        assert_eq!(kept.len(), 100);
        assert_eq!(budget, 1948);
    }

    #[test]
    fn test_fit_context_keeps_latest_tokens() {
        let tokens: Vec<u32> = (0..3000).collect();
        let (kept, budget) = fit_context(&tokens, 2048, 2048);
        assert_eq!(kept.len(), 1024);
        assert_eq!(kept[kept.len() - 1], 2999);
        assert_eq!(budget, 1024);
    }

    #[test]
    fn test_missing_model_file() {
        let result = GgufChat::load(Path::new("/nonexistent/chat.gguf"), &LlmConfig::default());
        assert!(matches!(result, Err(DomainError::ModelNotFound(_))));
    }
}
