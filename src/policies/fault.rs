//! # Fault policy: exit classification and fault-limit accounting.
//!
//! A process carries a configured [`FaultAction`] (what to do when it
//! faults). When the launcher reaps an exit it classifies it into a
//! [`ProcFaultAction`]; the application folds that, together with the
//! fault-limit window, into the single [`AppFaultAction`] handed to the
//! supervisor.
//!
//! ## Rules
//! - Deliberate kills (supervisor- or watchdog-initiated) and clean exits are
//!   **never** faults.
//! - Every other exit maps the configured policy onto the classification.
//! - [`classify_exit`] is the contract a launcher implementation must
//!   satisfy; it is exported so launcher adapters and test fakes share one
//!   implementation.

use std::time::{Duration, SystemTime};

use nix::sys::signal::Signal;

/// Configured per-process fault policy, read from the process config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// Log the fault and do nothing else (default).
    Ignore,
    /// Relaunch the faulted process in place.
    Restart,
    /// Stop and restart the whole application.
    RestartApp,
    /// Stop the whole application.
    StopApp,
    /// Reboot the system.
    Reboot,
}

impl FaultAction {
    /// Parses the config-tree string form of a fault action.
    ///
    /// Returns `None` for unknown strings so the caller can report the bad
    /// value and fall back to the default.
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s {
            "ignore" => Some(FaultAction::Ignore),
            "restart" => Some(FaultAction::Restart),
            "restartApp" => Some(FaultAction::RestartApp),
            "stopApp" => Some(FaultAction::StopApp),
            "reboot" => Some(FaultAction::Reboot),
            _ => None,
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            FaultAction::Ignore => "ignore",
            FaultAction::Restart => "restart",
            FaultAction::RestartApp => "restartApp",
            FaultAction::StopApp => "stopApp",
            FaultAction::Reboot => "reboot",
        }
    }
}

impl Default for FaultAction {
    /// Returns [`FaultAction::Ignore`].
    fn default() -> Self {
        FaultAction::Ignore
    }
}

/// How a process left the running state, as reported by `wait()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The process exited on its own with this code.
    Exited(i32),
    /// The process was terminated by this signal.
    Signaled(Signal),
}

/// Classification of one reaped exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcFaultAction {
    /// There wasn't a fault.
    NoFault,
    /// A fault occurred but no further action is required.
    Ignore,
    /// The process should be relaunched.
    Restart,
    /// The application should be restarted.
    RestartApp,
    /// The application should be stopped.
    StopApp,
    /// The system should be rebooted.
    Reboot,
}

impl ProcFaultAction {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcFaultAction::NoFault => "no_fault",
            ProcFaultAction::Ignore => "ignore",
            ProcFaultAction::Restart => "restart",
            ProcFaultAction::RestartApp => "restartApp",
            ProcFaultAction::StopApp => "stopApp",
            ProcFaultAction::Reboot => "reboot",
        }
    }
}

/// The remediation the supervisor must enact for an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppFaultAction {
    /// Nothing to do.
    Ignore,
    /// Stop the application, then start it again once it has stopped.
    RestartApp,
    /// Stop the application.
    StopApp,
    /// Reboot the system.
    Reboot,
}

impl AppFaultAction {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            AppFaultAction::Ignore => "ignore",
            AppFaultAction::RestartApp => "restartApp",
            AppFaultAction::StopApp => "stopApp",
            AppFaultAction::Reboot => "reboot",
        }
    }
}

/// Classifies one reaped exit against the configured policy.
///
/// This is the contract every launcher implementation must satisfy:
/// - `stopping` (the process was deliberately killed) → [`ProcFaultAction::NoFault`]
/// - clean exit (`Exited(0)`) → [`ProcFaultAction::NoFault`]
/// - anything else → the configured action, mapped one-to-one
pub fn classify_exit(status: ExitStatus, stopping: bool, configured: FaultAction) -> ProcFaultAction {
    if stopping {
        return ProcFaultAction::NoFault;
    }
    if let ExitStatus::Exited(0) = status {
        return ProcFaultAction::NoFault;
    }

    match configured {
        FaultAction::Ignore => ProcFaultAction::Ignore,
        FaultAction::Restart => ProcFaultAction::Restart,
        FaultAction::RestartApp => ProcFaultAction::RestartApp,
        FaultAction::StopApp => ProcFaultAction::StopApp,
        FaultAction::Reboot => ProcFaultAction::Reboot,
    }
}

/// Returns true when two consecutive faults landed inside the limit window.
///
/// `prev` is the fault time recorded before the current exit was classified;
/// `current` is the fault time afterwards. A process that has never faulted
/// before (no `prev`) can not trip the limit, and a non-faulty exit (no
/// `current` update) never does either.
pub fn within_fault_window(
    prev: Option<SystemTime>,
    current: Option<SystemTime>,
    window: Duration,
) -> bool {
    match (prev, current) {
        (Some(p), Some(c)) => c.duration_since(p).map(|d| d <= window).unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_strings_round_trip() {
        for s in ["ignore", "restart", "restartApp", "stopApp", "reboot"] {
            let action = FaultAction::from_config_str(s).unwrap();
            assert_eq!(action.as_label(), s);
        }
        assert!(FaultAction::from_config_str("explode").is_none());
        assert!(FaultAction::from_config_str("").is_none());
    }

    #[test]
    fn clean_exit_is_never_a_fault() {
        let act = classify_exit(ExitStatus::Exited(0), false, FaultAction::Reboot);
        assert_eq!(act, ProcFaultAction::NoFault);
    }

    #[test]
    fn deliberate_kill_is_never_a_fault() {
        let act = classify_exit(
            ExitStatus::Signaled(Signal::SIGKILL),
            true,
            FaultAction::RestartApp,
        );
        assert_eq!(act, ProcFaultAction::NoFault);
    }

    #[test]
    fn crash_maps_configured_policy() {
        let act = classify_exit(
            ExitStatus::Signaled(Signal::SIGSEGV),
            false,
            FaultAction::Restart,
        );
        assert_eq!(act, ProcFaultAction::Restart);

        let act = classify_exit(ExitStatus::Exited(1), false, FaultAction::StopApp);
        assert_eq!(act, ProcFaultAction::StopApp);
    }

    #[test]
    fn first_fault_never_trips_the_window() {
        let now = SystemTime::now();
        assert!(!within_fault_window(None, Some(now), Duration::from_secs(10)));
        assert!(!within_fault_window(None, None, Duration::from_secs(10)));
    }

    #[test]
    fn second_fault_inside_window_trips() {
        let t0 = SystemTime::now();
        let t1 = t0 + Duration::from_secs(5);
        assert!(within_fault_window(Some(t0), Some(t1), Duration::from_secs(10)));
    }

    #[test]
    fn second_fault_outside_window_does_not_trip() {
        let t0 = SystemTime::now();
        let t1 = t0 + Duration::from_secs(11);
        assert!(!within_fault_window(Some(t0), Some(t1), Duration::from_secs(10)));
    }
}
