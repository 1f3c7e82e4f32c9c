//! # Lifecycle events emitted by the supervisor core.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Application lifecycle**: start/stop flow of whole applications
//! - **Process lifecycle**: launches, exits, restarts
//! - **Faults**: policy hits, limit trips, watchdog expiries, reboot requests
//! - **Plumbing**: subscriber fan-out diagnostics, best-effort IO failures
//!
//! The [`Event`] struct carries additional metadata such as the application
//! and process names, the PID, the chosen fault action, and error text.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. This guarantees that events can be ordered correctly even
//! when delivered out-of-order through async channels.
//!
//! ## Event flow examples
//!
//! ### Happy start/stop
//! ```text
//! Supervisor::start()
//!   → AppStarting
//!   → ProcLaunched (per process, config order)
//!   → AppStarted
//! Supervisor::stop()
//!   → AppStopping → SoftKill
//!   → ProcExited (per process, as reaped)
//!   → AppStopped
//! ```
//!
//! ### Fault with restart
//! ```text
//! ProcExited (action=restart)
//!   → FaultDetected
//!   → ProcRestarted
//! ```
//!
//! ## Example
//! ```rust
//! use appvisor::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::FaultDetected)
//!     .with_app("sensord")
//!     .with_proc("poller")
//!     .with_action("restart");
//!
//! assert_eq!(ev.kind, EventKind::FaultDetected);
//! assert_eq!(ev.app.as_deref(), Some("sensord"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    SubscriberPanicked,
    /// Subscriber dropped an event (queue full or worker closed).
    SubscriberOverflow,

    // === Application lifecycle events ===
    /// Application start sequence has begun.
    AppStarting,
    /// Application reached the Running state.
    AppStarted,
    /// Application start failed; the app is driven back to Stopped.
    AppStartFailed,
    /// Stop was requested; a soft kill is under way.
    AppStopping,
    /// Application reached the Stopped state and was cleaned up.
    AppStopped,

    // === Process lifecycle events ===
    /// A process was launched (initial start or relaunch).
    ProcLaunched,
    /// A monitored process exited and was classified.
    ProcExited,
    /// A faulted or watchdog-stopped process was relaunched in place.
    ProcRestarted,

    // === Kill escalation ===
    /// SIGTERM delivered to the whole frozen group.
    SoftKill,
    /// SIGKILL delivered to the whole frozen group.
    HardKill,

    // === Faults ===
    /// A process fault matched its configured policy.
    FaultDetected,
    /// The fault limit was reached; the configured action was downgraded to
    /// stopping the application.
    FaultLimitReached,
    /// A process watchdog expired.
    WatchdogExpired,
    /// A reboot-class fault asks the supervisor to reboot the system.
    RebootRequested,
    /// The reboot-fault record was cleared by the grace timer.
    RebootRecordCleared,

    // === Best-effort failures ===
    /// The cgroup freezer reported a fault; the transition continues.
    FreezerFault,
    /// Reboot-fault record IO failed; the limit may be under-enforced.
    LedgerFault,
}

/// Lifecycle event with optional metadata.
///
/// Carries information about applications, processes, fault actions, and
/// failures.
///
/// ## Fields
///
/// - `seq`: Unique sequence number for ordering (monotonically increasing)
/// - `at`: Wall-clock timestamp (may go backwards due to NTP, use for logging only)
/// - `kind`: Event classification
/// - `app`, `proc_name`, `pid`, `action`, `delay`, `error`: Optional metadata
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    /// Used to determine event ordering across async boundaries.
    pub seq: u64,
    /// Wall-clock timestamp (may go backwards, use for logging only).
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Name of the application, if applicable.
    pub app: Option<String>,
    /// Name of the process, if applicable.
    pub proc_name: Option<String>,
    /// PID of the process, if applicable.
    pub pid: Option<i32>,
    /// Fault or watchdog action label, if the event carries one.
    pub action: Option<&'static str>,
    /// Delay metadata (e.g. the armed kill timeout).
    pub delay: Option<Duration>,
    /// Error message, if the event represents a failure.
    pub error: Option<String>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            app: None,
            proc_name: None,
            pid: None,
            action: None,
            delay: None,
            error: None,
        }
    }

    /// Attaches an application name.
    pub fn with_app(mut self, name: impl Into<String>) -> Self {
        self.app = Some(name.into());
        self
    }

    /// Attaches a process name.
    pub fn with_proc(mut self, name: impl Into<String>) -> Self {
        self.proc_name = Some(name.into());
        self
    }

    /// Attaches a PID.
    pub fn with_pid(mut self, pid: i32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a fault/watchdog action label.
    pub fn with_action(mut self, action: &'static str) -> Self {
        self.action = Some(action);
        self
    }

    /// Attaches a delay.
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Creates a subscriber overflow event.
    ///
    /// Emitted when a subscriber's queue cannot take an event; `dropped` is
    /// that subscriber's running drop count.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str, dropped: u64) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_error(format!("subscriber={subscriber} reason={reason} dropped={dropped}"))
    }

    /// Creates a subscriber panic event.
    ///
    /// Emitted when a subscriber panics during event processing.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_app(subscriber)
            .with_error(info)
    }

    /// Returns true for subscriber-overflow plumbing events.
    pub fn is_subscriber_overflow(&self) -> bool {
        self.kind == EventKind::SubscriberOverflow
    }

    /// Returns true for subscriber-panic plumbing events.
    pub fn is_subscriber_panic(&self) -> bool {
        self.kind == EventKind::SubscriberPanicked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::now(EventKind::AppStarting);
        let b = Event::now(EventKind::AppStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builder_attaches_metadata() {
        let ev = Event::now(EventKind::ProcExited)
            .with_app("cam")
            .with_proc("encoder")
            .with_pid(42)
            .with_action("stopApp")
            .with_error("boom");

        assert_eq!(ev.app.as_deref(), Some("cam"));
        assert_eq!(ev.proc_name.as_deref(), Some("encoder"));
        assert_eq!(ev.pid, Some(42));
        assert_eq!(ev.action, Some("stopApp"));
        assert_eq!(ev.error.as_deref(), Some("boom"));
    }
}
