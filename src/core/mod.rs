//! Supervisor core: the application/process lifecycle engine.
//!
//! The only broadly public API re-exported from here is [`Supervisor`];
//! [`Application`] is exposed for embedders that manage application objects
//! directly. Everything else is an internal building block.
//!
//! ## Files & responsibilities
//! - **supervisor.rs**: registry of applications; routes SIGCHLD and
//!   watchdog expiries to the owning app; enacts the returned fault actions
//!   (restart-app, stop-app, reboot); arms the 300 ms soft-to-hard kill
//!   timer with a weak registry handle.
//! - **app.rs**: the application state machine: construction from config,
//!   identity resolution, SMACK rule installation, config-ordered process
//!   launch, two-phase freezer-backed termination, fault-limit accounting,
//!   watchdog dispatch, cleanup on every stop.
//! - **proc.rs**: per-process bookkeeping (launcher handle + the watchdog's
//!   restart-on-stop handler slot).
//! - **ledger.rs**: the persistent reboot-fault record and its grace timer.
//!
//! ## Event data-plane (who publishes)
//! - **Application** → AppStarting/AppStarted/AppStartFailed, AppStopping/
//!   AppStopped, ProcLaunched/ProcExited/ProcRestarted, SoftKill/HardKill,
//!   FaultDetected/FaultLimitReached/WatchdogExpired, FreezerFault
//! - **Supervisor** → RebootRequested
//! - **RebootFaultLedger** → RebootRecordCleared, LedgerFault
//!
//! All of it flows through one [`Bus`](crate::events::Bus) into the
//! subscriber fan-out.

mod app;
mod ledger;
mod proc;
mod supervisor;

pub use app::{AppState, Application, StopOutcome};
pub use ledger::RebootFaultLedger;
pub use supervisor::{AppId, Supervisor};
