pub mod config;
pub mod generation;
pub mod hardware;
pub mod history;
pub mod model_resolver;
pub mod speech;

pub use config::ConfigStore;
pub use generation::TextGenerator;
pub use hardware::HardwareDetector;
pub use history::HistoryStore;
pub use model_resolver::ModelResolver;
pub use speech::SpeechToText;
