//! # Global supervisor configuration.
//!
//! [`Config`] defines the supervisor's behavior: the apps install root, the
//! reboot-fault record location, kill escalation timing, fault-limit windows,
//! the supplementary-group cap, and the event bus capacity.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use appvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.kill_timeout = Duration::from_millis(500);
//! cfg.max_supplementary_groups = 8;
//!
//! assert_eq!(cfg.max_supplementary_groups, 8);
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Global configuration for the supervisor core.
///
/// Controls filesystem locations, kill escalation, fault-limit accounting,
/// identity caps, and event bus sizing.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory under which every application is installed; an app's install
    /// path is `apps_install_dir/<name>`.
    pub apps_install_dir: PathBuf,
    /// Location of the persistent reboot-fault record file.
    pub reboot_fault_record_path: PathBuf,
    /// Grace given to soft-killed processes before the hard kill fires.
    pub kill_timeout: Duration,
    /// Window within which a second Restart/RestartApp fault trips the limit.
    pub fault_limit_window: Duration,
    /// Window within which a second reboot-class fault from the same process
    /// is suppressed to prevent reboot loops.
    pub reboot_grace: Duration,
    /// Upper bound on freeze-state poll iterations during group termination.
    pub freeze_poll_max: u32,
    /// Maximum number of supplementary groups per application; exceeding it
    /// fails construction.
    pub max_supplementary_groups: usize,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `apps_install_dir = /opt/appvisor/apps`
    /// - `reboot_fault_record_path = /opt/appvisor/app-reboot-fault`
    /// - `kill_timeout = 300ms`
    /// - `fault_limit_window = 10s`
    /// - `reboot_grace = 120s`
    /// - `freeze_poll_max = 1024`
    /// - `max_supplementary_groups = 30`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            apps_install_dir: PathBuf::from("/opt/appvisor/apps"),
            reboot_fault_record_path: PathBuf::from("/opt/appvisor/app-reboot-fault"),
            kill_timeout: Duration::from_millis(300),
            fault_limit_window: Duration::from_secs(10),
            reboot_grace: Duration::from_secs(120),
            freeze_poll_max: 1024,
            max_supplementary_groups: 30,
            bus_capacity: 1024,
        }
    }
}
