//! # Collaborator interfaces (ports).
//!
//! The supervisor core carries no platform code: everything that touches the
//! kernel, the filesystem, or system databases sits behind one of these
//! traits. Adapters implement them against the real subsystems; tests
//! implement them in memory.
//!
//! | Port              | Concern                                              |
//! |-------------------|------------------------------------------------------|
//! | [`ConfigTree`]    | Transactional read-only config tree access           |
//! | [`Sandbox`]       | Filesystem chroot assembly and teardown              |
//! | [`ResourceLimits`]| Per-application resource caps                        |
//! | [`SmackCtl`]      | Mandatory-access-control labels and rules            |
//! | [`Freezer`]       | Process-group freeze / thaw / group signal           |
//! | [`UserDb`]        | Name → uid/gid resolution and group creation         |
//! | [`Launcher`]      | Fork/exec, reaping, and per-process fault policy     |
//! | [`System`]        | System reboot initiation                             |
//!
//! Ports are interfaces only; every policy decision stays in
//! [`core`](crate::core) and [`policies`](crate::policies).

mod config_tree;
mod freezer;
mod launcher;
mod limits;
mod sandbox;
mod smack;
mod system;
mod users;

use std::path::Path;
use std::sync::Arc;

use nix::unistd::{Gid, Uid};

pub use config_tree::{ConfigTree, ConfigTxn};
pub use freezer::{FreezeState, Freezer};
pub use launcher::{Launcher, ProcId, ProcState};
pub use limits::ResourceLimits;
pub use sandbox::Sandbox;
pub use smack::{SmackCtl, FRAMEWORK_LABEL};
pub use system::System;
pub use users::UserDb;

/// Borrowed view of an application handed to sandbox and resource-limit
/// adapters, so they never see the application type itself.
#[derive(Debug, Clone, Copy)]
pub struct AppView<'a> {
    /// The application name.
    pub name: &'a str,
    /// Resolved user id (0 for unsandboxed apps).
    pub uid: Uid,
    /// Resolved primary group id (0 for unsandboxed apps).
    pub gid: Gid,
    /// Whether the app runs inside a sandbox.
    pub sandboxed: bool,
    /// The app's install directory.
    pub install_path: &'a Path,
    /// The app's sandbox root (empty for unsandboxed apps).
    pub sandbox_path: &'a Path,
}

/// The full collaborator bundle the supervisor is constructed with.
#[derive(Clone)]
pub struct Ports {
    /// Config tree reader.
    pub config: Arc<dyn ConfigTree>,
    /// Sandbox assembly/teardown.
    pub sandbox: Arc<dyn Sandbox>,
    /// Per-app resource caps.
    pub limits: Arc<dyn ResourceLimits>,
    /// SMACK label/rule control.
    pub smack: Arc<dyn SmackCtl>,
    /// Process-group freezer.
    pub freezer: Arc<dyn Freezer>,
    /// User/group database.
    pub users: Arc<dyn UserDb>,
    /// Per-process launcher.
    pub launcher: Arc<dyn Launcher>,
    /// Reboot hook.
    pub system: Arc<dyn System>,
}
