//! Policies for fault remediation and watchdog handling:
//!  - [`FaultAction`] / [`ProcFaultAction`] / [`AppFaultAction`] for process exits;
//!  - [`WatchdogAction`] for watchdog expiries.
//!
//! ## Overview
//! - [`fault`] — classify one process exit against its configured policy and
//!   account for the fault limit (a second fault inside the window downgrades
//!   the action to stopping the application).
//! - [`watchdog`] — map configured watchdog-action strings to their enum.
//!
//! ## Example
//! ```rust
//! use appvisor::{ExitStatus, FaultAction, ProcFaultAction};
//! use appvisor::policies::classify_exit;
//!
//! // A clean exit is never a fault, whatever the policy says.
//! let act = classify_exit(ExitStatus::Exited(0), false, FaultAction::Reboot);
//! assert_eq!(act, ProcFaultAction::NoFault);
//!
//! // A crash maps the configured policy onto the exit.
//! let act = classify_exit(ExitStatus::Exited(1), false, FaultAction::Restart);
//! assert_eq!(act, ProcFaultAction::Restart);
//! ```

mod fault;
mod watchdog;

pub use fault::{
    classify_exit, within_fault_window, AppFaultAction, ExitStatus, FaultAction, ProcFaultAction,
};
pub use watchdog::WatchdogAction;
