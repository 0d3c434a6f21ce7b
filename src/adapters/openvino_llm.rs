//! Text generation from an OpenVINO IR decoder.
//!
//! The IR is run with a fixed `[1, prompt_length]` input so the device never
//! sees a dynamic shape. Each step slides the window left by one token. The
//! model must be exported without KV-cache state.

use std::path::Path;
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use parking_lot::Mutex;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::adapters::openvino_runtime::{i64_tensor, last_logits, load_core, IrModel};
use crate::adapters::tokenizer::{load_tokenizer, prompt_template, stop_token_ids};
use crate::domain::config::LlmConfig;
use crate::domain::conversation::normalize_messages;
use crate::domain::{ConversationMessage, DomainError, PromptTemplate};
use crate::ports::TextGenerator;

/// Fixed-length token window fed to the IR.
#[derive(Debug, Clone, PartialEq)]
struct Window {
    ids: Vec<i64>,
    mask: Vec<i64>,
}

impl Window {
    /// Left-pad (or keep the latest `length` tokens of) a prompt.
    fn new(tokens: &[u32], length: usize, pad_id: u32) -> Self {
        let tokens = if tokens.len() > length {
            &tokens[tokens.len() - length..]
        } else {
            tokens
        };
        let padding = length - tokens.len();

        let mut ids = vec![pad_id as i64; padding];
        ids.extend(tokens.iter().map(|&t| t as i64));
        let mut mask = vec![0; padding];
        mask.extend(std::iter::repeat(1).take(tokens.len()));

        Self { ids, mask }
    }

    /// Drop the oldest slot and append a generated token.
    fn push(&mut self, token: u32) {
        self.ids.remove(0);
        self.mask.remove(0);
        self.ids.push(token as i64);
        self.mask.push(1);
    }

    /// Positions counted over real tokens only; padding sits at 0.
    fn position_ids(&self) -> Vec<i64> {
        let mut seen = 0i64;
        self.mask
            .iter()
            .map(|&m| {
                seen += m;
                (seen - 1).max(0)
            })
            .collect()
    }
}

/// Local text generation on the OpenVINO runtime.
pub struct OpenvinoChat {
    model: Mutex<IrModel>,
    tokenizer: Tokenizer,
    template: PromptTemplate,
    stop_tokens: Vec<u32>,
    pad_id: u32,
    prompt_length: usize,
    max_new_tokens: usize,
    temperature: f64,
    seed: u64,
}

impl OpenvinoChat {
    /// Compile the IR for `device` and load its tokenizer.
    pub fn load(xml: &Path, config: &LlmConfig, device: &str) -> Result<Self, DomainError> {
        let start = Instant::now();
        let mut core = load_core()?;
        let model = IrModel::compile(&mut core, xml, device)?;

        if model.has_input("beam_idx") {
            return Err(DomainError::ModelLoad(
                "Stateful IR is not supported; export the model without KV-cache state".to_string(),
            ));
        }

        let tokenizer = load_tokenizer(xml)?;
        let template = prompt_template(&tokenizer);
        let stop_tokens = stop_token_ids(&tokenizer);
        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| stop_tokens.first().copied())
            .unwrap_or(0);

        info!(
            path = ?xml,
            device,
            template = ?template,
            prompt_length = config.openvino_prompt_length,
            load_ms = start.elapsed().as_millis() as u64,
            "OpenVINO model loaded"
        );

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            template,
            stop_tokens,
            pad_id,
            prompt_length: config.openvino_prompt_length.max(1),
            max_new_tokens: config.openvino_max_new_tokens,
            temperature: config.temperature,
            seed: config.seed,
        })
    }

    fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| DomainError::Inference(format!("Tokenization failed: {}", e)))?;

        let mut window = Window::new(encoding.get_ids(), self.prompt_length, self.pad_id);
        let dims = [1, self.prompt_length as i64];

        let temperature = (self.temperature > 0.0).then_some(self.temperature);
        let mut logits_processor = LogitsProcessor::new(self.seed, temperature, None);
        let mut model = self.model.lock();
        let mut generated = Vec::new();

        for _ in 0..self.max_new_tokens {
            model.set("input_ids", &i64_tensor(&dims, &window.ids)?)?;
            model.set("attention_mask", &i64_tensor(&dims, &window.mask)?)?;
            if model.has_input("position_ids") {
                model.set("position_ids", &i64_tensor(&dims, &window.position_ids())?)?;
            }
            model.infer()?;

            let logits = last_logits(&model.output("logits")?)?;
            let vocab = logits.len();
            let token = Tensor::from_vec(logits, vocab, &Device::Cpu)
                .and_then(|t| logits_processor.sample(&t))
                .map_err(|e| DomainError::Inference(format!("Sampling failed: {}", e)))?;

            if self.stop_tokens.contains(&token) {
                break;
            }
            generated.push(token);
            window.push(token);
        }

        debug!(tokens = generated.len(), "OpenVINO generation finished");

        self.tokenizer
            .decode(&generated, true)
            .map_err(|e| DomainError::Inference(format!("Decoding failed: {}", e)))
    }
}

impl TextGenerator for OpenvinoChat {
    fn generate(&self, messages: &[ConversationMessage]) -> Result<String, DomainError> {
        let prompt = self.template.render(&normalize_messages(messages));
        let start = Instant::now();
        let reply = self.complete(&prompt)?;

        info!(
            reply_chars = reply.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenVINO generation complete"
        );
        Ok(reply.trim().to_string())
    }

    fn name(&self) -> &str {
        "openvino"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_left_pads() {
        let window = Window::new(&[5, 6, 7], 6, 0);
        assert_eq!(window.ids, vec![0, 0, 0, 5, 6, 7]);
        assert_eq!(window.mask, vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(window.position_ids(), vec![0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_window_truncates_to_latest() {
        let window = Window::new(&[1, 2, 3, 4, 5], 3, 0);
        assert_eq!(window.ids, vec![3, 4, 5]);
        assert_eq!(window.mask, vec![1, 1, 1]);
    }

    #[test]
    fn test_window_slides() {
        let mut window = Window::new(&[5, 6], 4, 9);
        window.push(7);
        assert_eq!(window.ids, vec![9, 5, 6, 7]);
        assert_eq!(window.mask, vec![0, 1, 1, 1]);
        assert_eq!(window.ids.len(), 4);
    }
}
