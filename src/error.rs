//! # Error types used by the supervisor core.
//!
//! [`AppError`] covers application construction and lifecycle transitions.
//! Event handlers (`sigchild`, `watchdog_expired`) never raise; they always
//! return a fault action, and best-effort failures (freezer, ledger) are
//! published on the event bus instead of propagated.
//!
//! `as_label` provides short stable labels for logs and metrics.

use thiserror::Error;

/// # Errors produced by application construction and lifecycle operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AppError {
    /// A required config node is absent.
    #[error("config node '{path}' is missing")]
    ConfigMissing {
        /// Path of the missing node.
        path: String,
    },

    /// A bounded config value (or list) exceeded its cap.
    #[error("config value at '{path}' exceeds its bound")]
    ConfigOverflow {
        /// Path of the offending node.
        path: String,
    },

    /// A user or group could not be resolved or created.
    #[error("could not resolve user or group '{name}'")]
    ResolveFailure {
        /// The user or group name.
        name: String,
    },

    /// The sandbox could not be assembled or resolved.
    #[error("sandbox failure for app '{app}'")]
    SandboxFailure {
        /// The application name.
        app: String,
    },

    /// Resource limits could not be applied.
    #[error("could not apply resource limits for app '{app}'")]
    ResourceLimitFailure {
        /// The application name.
        app: String,
    },

    /// A process failed to launch; the application is driven back to Stopped.
    #[error("could not launch process '{proc_name}' in app '{app}'")]
    LaunchFailure {
        /// The application name.
        app: String,
        /// The process name.
        proc_name: String,
    },

    /// `start()` was called on a running application.
    #[error("application '{app}' is already running")]
    AlreadyRunning {
        /// The application name.
        app: String,
    },

    /// `stop()` was called on a stopped application.
    #[error("application '{app}' is already stopped")]
    AlreadyStopped {
        /// The application name.
        app: String,
    },

    /// An application, process, or PID could not be found.
    #[error("'{what}' not found")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// The cgroup freezer reported a fault; treated as best-effort.
    #[error("freezer fault for app '{app}'")]
    FreezerFault {
        /// The application name.
        app: String,
    },

    /// Reboot-fault record IO failed; the fault limit may be under-enforced.
    #[error("reboot fault record io failed: {reason}")]
    LedgerIo {
        /// What went wrong.
        reason: String,
    },
}

impl AppError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AppError::ConfigMissing { .. } => "config_missing",
            AppError::ConfigOverflow { .. } => "config_overflow",
            AppError::ResolveFailure { .. } => "resolve_failure",
            AppError::SandboxFailure { .. } => "sandbox_failure",
            AppError::ResourceLimitFailure { .. } => "resource_limit_failure",
            AppError::LaunchFailure { .. } => "launch_failure",
            AppError::AlreadyRunning { .. } => "already_running",
            AppError::AlreadyStopped { .. } => "already_stopped",
            AppError::NotFound { .. } => "not_found",
            AppError::FreezerFault { .. } => "freezer_fault",
            AppError::LedgerIo { .. } => "ledger_io",
        }
    }
}
