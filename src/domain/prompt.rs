use super::conversation::PlainMessage;

/// Tokens that end a turn in the templates below.
pub const STOP_TOKENS: [&str; 5] = ["<|im_end|>", "</s>", "<|endoftext|>", "<|eot_id|>", "<|end|>"];

/// Chat prompt layout for local engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// `<|im_start|>role\n...<|im_end|>` (Qwen, many fine-tunes).
    ChatMl,
    /// `<|role|>\n...</s>` (Zephyr, TinyLlama chat).
    Zephyr,
    /// `role: content` lines.
    Plain,
}

impl PromptTemplate {
    /// Pick a template from the tokenizer vocabulary.
    pub fn detect(has_token: impl Fn(&str) -> bool) -> Self {
        if has_token("<|im_start|>") {
            PromptTemplate::ChatMl
        } else if has_token("<|assistant|>") {
            PromptTemplate::Zephyr
        } else {
            PromptTemplate::Plain
        }
    }

    /// Render messages, ending with an open assistant turn.
    pub fn render(&self, messages: &[PlainMessage]) -> String {
        let mut prompt = String::new();
        for m in messages {
            match self {
                PromptTemplate::ChatMl => {
                    prompt.push_str(&format!("<|im_start|>{}\n{}<|im_end|>\n", m.role, m.content))
                }
                PromptTemplate::Zephyr => {
                    prompt.push_str(&format!("<|{}|>\n{}</s>\n", m.role, m.content))
                }
                PromptTemplate::Plain => prompt.push_str(&format!("{}: {}\n", m.role, m.content)),
            }
        }
        prompt.push_str(match self {
            PromptTemplate::ChatMl => "<|im_start|>assistant\n",
            PromptTemplate::Zephyr => "<|assistant|>\n",
            PromptTemplate::Plain => "assistant: ",
        });
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Role;

    fn messages() -> Vec<PlainMessage> {
        vec![
            PlainMessage {
                role: Role::System,
                content: "Be kind.".into(),
            },
            PlainMessage {
                role: Role::User,
                content: "Hi".into(),
            },
        ]
    }

    #[test]
    fn test_detect() {
        assert_eq!(
            PromptTemplate::detect(|t| t == "<|im_start|>"),
            PromptTemplate::ChatMl
        );
        assert_eq!(
            PromptTemplate::detect(|t| t == "<|assistant|>"),
            PromptTemplate::Zephyr
        );
        assert_eq!(PromptTemplate::detect(|_| false), PromptTemplate::Plain);
    }

    #[test]
    fn test_render_chatml() {
        let prompt = PromptTemplate::ChatMl.render(&messages());
        assert_eq!(
            prompt,
            "<|im_start|>system\nBe kind.<|im_end|>\n<|im_start|>user\nHi<|im_end|>\n<|im_start|>assistant\n"
        );
    }

    #[test]
    fn test_render_zephyr() {
        let prompt = PromptTemplate::Zephyr.render(&messages());
        assert_eq!(
            prompt,
            "<|system|>\nBe kind.</s>\n<|user|>\nHi</s>\n<|assistant|>\n"
        );
    }

    #[test]
    fn test_render_plain() {
        let prompt = PromptTemplate::Plain.render(&messages());
        assert_eq!(prompt, "system: Be kind.\nuser: Hi\nassistant: ");
    }
}
