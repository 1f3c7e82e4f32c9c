//! Port for sandbox assembly and teardown.

use std::path::PathBuf;

use crate::error::AppError;
use crate::ports::AppView;

/// Filesystem sandbox control for one application.
pub trait Sandbox: Send + Sync {
    /// Resolves the sandbox root path for an app name.
    fn get_path(&self, app_name: &str) -> Result<PathBuf, AppError>;

    /// Assembles the sandbox (chroot tree, imports, mounts).
    fn setup(&self, app: &AppView<'_>) -> Result<(), AppError>;

    /// Tears the sandbox down.
    fn remove(&self, app: &AppView<'_>) -> Result<(), AppError>;
}
