//! Port for per-application resource limits.

use crate::error::AppError;
use crate::ports::AppView;

/// Applies and clears per-app resource caps.
pub trait ResourceLimits: Send + Sync {
    /// Applies the configured limits before any process launches.
    fn apply(&self, app: &AppView<'_>) -> Result<(), AppError>;

    /// Clears the applied limits during cleanup.
    fn clear(&self, app: &AppView<'_>) -> Result<(), AppError>;
}
