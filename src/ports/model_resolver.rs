use std::path::PathBuf;

use crate::domain::Backend;

/// Port for locating the concrete model artifact a backend should load.
pub trait ModelResolver: Send + Sync {
    /// Map a model name or path to the best local artifact for `backend`.
    ///
    /// Never fails: when nothing better is found the input comes back as-is,
    /// and loading it is left to the provider.
    fn resolve(&self, name_or_path: &str, backend: Backend) -> PathBuf;
}
