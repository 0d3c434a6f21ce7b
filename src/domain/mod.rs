pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod hardware;
pub mod model;
pub mod prompt;

pub use backend::{active_backend, text_generation_backend, Backend};
pub use config::AppConfig;
pub use conversation::{ConversationMessage, MessageContent, PlainMessage, Role};
pub use error::DomainError;
pub use hardware::{CpuArch, DeviceTier, HardwareProfile, ProbeReadings, SimdCapabilities};
pub use model::{ModelFamily, Quantization};
pub use prompt::PromptTemplate;
