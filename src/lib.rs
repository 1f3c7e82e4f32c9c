//! # appvisor
//!
//! **Appvisor** is the application supervisor core of an embedded service
//! framework.
//!
//! An *application* is a named bundle of long-running processes sharing one
//! identity, one sandbox, and one configuration subtree. The supervisor starts
//! applications, watches their processes, reacts to process death and watchdog
//! timeouts by applying a configured fault policy, and escalates to a system
//! reboot when a fault persists across a reboot boundary.
//!
//! ## Features
//!
//! | Area              | Description                                                         | Key types / traits                      |
//! |-------------------|---------------------------------------------------------------------|-----------------------------------------|
//! | **Supervision**   | Registry of applications, event routing, fault-action dispatch.     | [`Supervisor`], [`AppFaultAction`]      |
//! | **Lifecycle**     | Two-level state machine with soft/hard group termination.           | [`Application`], [`AppState`]           |
//! | **Policies**      | Pure fault and watchdog policy types and window accounting.         | [`FaultAction`], [`WatchdogAction`]     |
//! | **Ports**         | Collaborator interfaces: config tree, sandbox, freezer, launcher.   | [`ports`]                               |
//! | **Subscribers**   | Hook into lifecycle events (logging, metrics, custom observers).    | [`Subscribe`], [`Event`], [`EventKind`] |
//! | **Errors**        | Typed errors for construction and lifecycle transitions.            | [`AppError`]                            |
//! | **Configuration** | Centralize paths, timeouts, and fault windows.                      | [`Config`]                              |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber _(demo/reference only)_.
//!
//! ## Overview
//!
//! The core is single-threaded and event-driven: process-exit notifications,
//! watchdog expiries, and lifecycle commands all funnel through the
//! [`Supervisor`], which routes them to the owning [`Application`]. The
//! application consults its fault policy and the persistent reboot-fault
//! record, then hands a single [`AppFaultAction`] back for the supervisor to
//! enact. All collaborator access (sandbox assembly, resource limits, SMACK
//! rules, cgroup freezer, user database, per-process launcher) goes through
//! the traits in [`ports`], so the engine itself carries no platform code.
//!
//! ```no_run
//! use appvisor::{Config, Supervisor};
//! # fn ports() -> appvisor::ports::Ports { unimplemented!() }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::new(Config::default(), ports(), Vec::new());
//!
//!     // Construct and start the app rooted at this config path.
//!     let id = sup.start("/apps/sensord").await?;
//!     println!("started {id:?}");
//!
//!     // Drive it back down; processes are reaped via handle_sigchild().
//!     sup.stop("sensord").await?;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
mod error;
mod subscribers;

pub mod core;
pub mod events;
pub mod policies;
pub mod ports;

// ---- Public re-exports ----

pub use crate::config::Config;
pub use crate::core::{AppId, AppState, Application, StopOutcome, Supervisor};
pub use crate::error::AppError;
pub use crate::events::{Event, EventKind};
pub use crate::policies::{AppFaultAction, ExitStatus, FaultAction, ProcFaultAction, WatchdogAction};
pub use crate::ports::ProcState;
pub use crate::subscribers::Subscribe;

// Optional: expose a simple built-in logging subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use crate::subscribers::LogWriter;
