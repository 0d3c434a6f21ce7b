pub mod controller;
pub mod session;

pub use controller::{AppController, StartupOptions};
pub use session::Session;
