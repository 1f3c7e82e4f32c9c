//! Port for the process-group freezer.
//!
//! Freezing the group before signalling guarantees no process misses the
//! signal or reacts mid-flight; the group is thawed afterwards so processes
//! can run and observe it.

use nix::sys::signal::Signal;

use crate::error::AppError;

/// Freeze state of a named process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeState {
    /// All processes are runnable.
    Thawed,
    /// A freeze is in progress.
    Freezing,
    /// All processes are frozen.
    Frozen,
    /// The freezer could not report a state.
    Fault,
}

/// Freezer-backed group control for one application's processes.
pub trait Freezer: Send + Sync {
    /// Starts freezing the group.
    fn freeze(&self, app_name: &str) -> Result<(), AppError>;

    /// Thaws the group.
    fn thaw(&self, app_name: &str) -> Result<(), AppError>;

    /// Reports the group's freeze state.
    fn state(&self, app_name: &str) -> FreezeState;

    /// Delivers `signal` to every process in the group.
    ///
    /// Returns the number of processes signalled; an error means the freezer
    /// faulted and the caller should treat the group as empty.
    fn send_signal(&self, app_name: &str, signal: Signal) -> Result<usize, AppError>;

    /// True when the group holds no processes.
    fn is_empty(&self, app_name: &str) -> bool;
}
