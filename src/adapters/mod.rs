pub mod config_store;
pub mod hardware_detector;
pub mod history_store;
pub mod model_resolver;
pub mod openai;

#[cfg(any(feature = "whisper-cpp", feature = "openvino"))]
pub mod audio_file;
#[cfg(feature = "gguf")]
pub mod gguf_llm;
#[cfg(feature = "openvino")]
pub mod openvino_llm;
#[cfg(feature = "openvino")]
mod openvino_runtime;
#[cfg(feature = "openvino")]
pub mod openvino_whisper;
#[cfg(any(feature = "gguf", feature = "openvino"))]
pub mod tokenizer;
#[cfg(feature = "whisper-cpp")]
pub mod whisper_cpp;

pub use config_store::TomlConfigStore;
pub use hardware_detector::SystemHardwareDetector;
pub use history_store::JsonHistoryStore;
pub use model_resolver::LocalModelResolver;
pub use openai::{OpenAiChat, OpenAiTranscriber};
