//! Port for the per-process launcher.
//!
//! The launcher owns the low-level process records: it forks and execs,
//! reaps exits, tracks PIDs and fault times, and classifies each exit against
//! the process's configured fault policy (the classification contract is
//! [`classify_exit`](crate::policies::classify_exit)).

use std::path::Path;
use std::time::SystemTime;

use nix::unistd::{Gid, Pid, Uid};

use crate::error::AppError;
use crate::policies::{ExitStatus, ProcFaultAction, WatchdogAction};

/// Opaque handle to a launcher-side process record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcId(pub u64);

/// Running state of one monitored process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    /// No live PID backs the record.
    Stopped,
    /// The record references a running process.
    Running,
    /// The process was suspended (SIGSTOP).
    Paused,
}

/// Fork/exec, reaping, and per-process policy access.
pub trait Launcher: Send + Sync {
    /// Creates a process record from its config subtree.
    fn create(&self, cfg_path: &str, app_name: &str) -> Result<ProcId, AppError>;

    /// Frees a process record. The process must be stopped.
    fn destroy(&self, proc: ProcId);

    /// The process name (config node basename).
    fn name(&self, proc: ProcId) -> String;

    /// The current PID, if the process is running or paused.
    fn pid(&self, proc: ProcId) -> Option<Pid>;

    /// The process state.
    fn state(&self, proc: ProcId) -> ProcState;

    /// Time of the last fault; `None` if the process has never faulted.
    fn fault_time(&self, proc: ProcId) -> Option<SystemTime>;

    /// The process's configured watchdog action.
    ///
    /// [`WatchdogAction::NotFound`] when none is configured,
    /// [`WatchdogAction::Error`] when the configured value is unreadable.
    fn watchdog_action(&self, proc: ProcId) -> WatchdogAction;

    /// Launches the process unsandboxed, rooted in the install directory.
    fn start(&self, proc: ProcId, install_path: &Path) -> Result<(), AppError>;

    /// Launches the process chrooted into the sandbox with the app identity.
    #[allow(clippy::too_many_arguments)]
    fn start_sandboxed(
        &self,
        proc: ProcId,
        working_dir: &Path,
        uid: Uid,
        gid: Gid,
        supplement_gids: &[Gid],
        sandbox_path: &Path,
    ) -> Result<(), AppError>;

    /// Marks the process as deliberately stopping so the subsequent exit is
    /// classified as a kill, not a fault.
    fn stopping(&self, proc: ProcId);

    /// Sends SIGKILL straight to a PID (single-process stop).
    fn kill_hard(&self, pid: Pid);

    /// Reaps one exit: updates the record's PID, state, and fault time, then
    /// classifies the exit against the configured fault policy.
    fn sigchild(&self, proc: ProcId, status: ExitStatus) -> ProcFaultAction;
}
