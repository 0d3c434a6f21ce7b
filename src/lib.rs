//! Hardware-aware voice and text assistant.
//!
//! The host is probed once, reduced to one active backend, and speech and
//! text providers are built for it through the capability factories.

#![forbid(unsafe_code)]

pub mod adapters;
pub mod app;
pub mod domain;
pub mod factory;
pub mod infrastructure;
pub mod ports;

pub use app::{AppController, Session, StartupOptions};
pub use domain::{AppConfig, Backend, ConversationMessage, DeviceTier, DomainError, HardwareProfile};
