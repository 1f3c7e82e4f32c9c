//! # Watchdog policy: what to do when a process goes silent.
//!
//! Each process may carry a configured watchdog action; when none is
//! configured the application-level `watchdogAction` config key is consulted,
//! and when that is also missing the supervisor synthesizes a restart.
//!
//! [`WatchdogAction`] doubles as the return value of the watchdog-expiry
//! handler: actions the application dealt with itself come back as
//! [`WatchdogAction::Handled`]; the app-level actions (`RestartApp`,
//! `StopApp`, `Reboot`) come back verbatim for the supervisor to enact.

/// Action taken when a process watchdog expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    /// No action is configured at this level.
    NotFound,
    /// Log the expiry and carry on.
    Ignore,
    /// Terminate the process and leave it stopped.
    Stop,
    /// Terminate the process and relaunch it once it has been reaped.
    Restart,
    /// Stop and restart the whole application.
    RestartApp,
    /// Stop the whole application.
    StopApp,
    /// Reboot the system.
    Reboot,
    /// The configured value could not be read or is unknown.
    Error,
    /// The expiry was fully handled inside the application.
    Handled,
}

impl WatchdogAction {
    /// Parses the config-tree string form of a watchdog action.
    ///
    /// An empty string means the key is absent ([`WatchdogAction::NotFound`]);
    /// an unknown string is reported as [`WatchdogAction::Error`].
    pub fn from_config_str(s: &str) -> Self {
        match s {
            "" => WatchdogAction::NotFound,
            "ignore" => WatchdogAction::Ignore,
            "stop" => WatchdogAction::Stop,
            "restart" => WatchdogAction::Restart,
            "restartApp" => WatchdogAction::RestartApp,
            "stopApp" => WatchdogAction::StopApp,
            "reboot" => WatchdogAction::Reboot,
            _ => WatchdogAction::Error,
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            WatchdogAction::NotFound => "not_found",
            WatchdogAction::Ignore => "ignore",
            WatchdogAction::Stop => "stop",
            WatchdogAction::Restart => "restart",
            WatchdogAction::RestartApp => "restartApp",
            WatchdogAction::StopApp => "stopApp",
            WatchdogAction::Reboot => "reboot",
            WatchdogAction::Error => "error",
            WatchdogAction::Handled => "handled",
        }
    }
}
