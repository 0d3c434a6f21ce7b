//! Capability factories.
//!
//! Each factory maps a backend identifier to exactly one provider type and
//! only touches that provider's engine inside the matching branch. Engines
//! left out of the build surface as [`DomainError::DependencyMissing`].
//!
//! [`DomainError::DependencyMissing`]: crate::domain::DomainError::DependencyMissing

pub mod asr;
pub mod llm;

pub use asr::AsrProviderKind;
pub use llm::LlmProviderKind;
