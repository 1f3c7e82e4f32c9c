//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [app-starting] app=sensord
//! [proc-launched] app=sensord proc=poller pid=1204
//! [fault] app=sensord proc=poller action=restart
//! [soft-kill] app=sensord
//! [hard-kill] app=sensord
//! [app-stopped] app=sensord
//! [reboot-requested] app=sensord
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::AppStarting => {
                println!("[app-starting] app={:?}", e.app);
            }
            EventKind::AppStarted => {
                println!("[app-started] app={:?}", e.app);
            }
            EventKind::AppStartFailed => {
                println!("[app-start-failed] app={:?} err={:?}", e.app, e.error);
            }
            EventKind::AppStopping => {
                println!("[app-stopping] app={:?}", e.app);
            }
            EventKind::AppStopped => {
                println!("[app-stopped] app={:?} err={:?}", e.app, e.error);
            }
            EventKind::ProcLaunched => {
                println!(
                    "[proc-launched] app={:?} proc={:?} pid={:?}",
                    e.app, e.proc_name, e.pid
                );
            }
            EventKind::ProcExited => {
                println!(
                    "[proc-exited] app={:?} proc={:?} pid={:?} action={:?}",
                    e.app, e.proc_name, e.pid, e.action
                );
            }
            EventKind::ProcRestarted => {
                println!(
                    "[proc-restarted] app={:?} proc={:?} pid={:?}",
                    e.app, e.proc_name, e.pid
                );
            }
            EventKind::SoftKill => {
                println!("[soft-kill] app={:?}", e.app);
            }
            EventKind::HardKill => {
                println!("[hard-kill] app={:?}", e.app);
            }
            EventKind::FaultDetected => {
                println!(
                    "[fault] app={:?} proc={:?} action={:?}",
                    e.app, e.proc_name, e.action
                );
            }
            EventKind::FaultLimitReached => {
                println!(
                    "[fault-limit] app={:?} proc={:?} action={:?}",
                    e.app, e.proc_name, e.action
                );
            }
            EventKind::WatchdogExpired => {
                println!(
                    "[watchdog] app={:?} proc={:?} action={:?} err={:?}",
                    e.app, e.proc_name, e.action, e.error
                );
            }
            EventKind::RebootRequested => {
                println!("[reboot-requested] app={:?}", e.app);
            }
            EventKind::RebootRecordCleared => {
                println!("[reboot-record-cleared]");
            }
            EventKind::FreezerFault => {
                println!("[freezer-fault] app={:?} err={:?}", e.app, e.error);
            }
            EventKind::LedgerFault => {
                println!("[ledger-fault] err={:?}", e.error);
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                println!("[subscriber] kind={:?} err={:?}", e.kind, e.error);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
