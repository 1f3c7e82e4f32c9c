//! # Persistent reboot-fault record.
//!
//! When a reboot-class fault fires, the supervisor notes `"<app>/<proc>"` in
//! a single-record file *before* initiating the reboot. The record survives
//! the reboot; if the same process faults with a reboot action again inside
//! the grace interval, the fault limit trips and the action is downgraded to
//! stopping the application, breaking the reboot loop.
//!
//! ## Rules
//! - The file holds exactly one NUL-terminated `"<app>/<proc>"` string.
//! - A one-shot grace timer started at supervisor init unconditionally
//!   deletes the record on expiry.
//! - IO failures are best-effort: published as [`EventKind::LedgerFault`] and
//!   never allowed to abort a lifecycle transition (at worst the limit is
//!   under-enforced).

use std::fs;
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::events::{Bus, Event, EventKind};

/// Single-record file noting the (app, process) behind the last reboot-class
/// fault.
pub struct RebootFaultLedger {
    path: PathBuf,
    bus: Bus,
}

impl RebootFaultLedger {
    /// Creates a ledger over the given record path.
    pub fn new(path: PathBuf, bus: Bus) -> Self {
        Self { path, bus }
    }

    /// Starts the one-shot grace timer.
    ///
    /// The task holds only a weak handle: if the supervisor (and with it the
    /// ledger) is dropped before expiry, the timer resolves to a no-op.
    pub(crate) fn spawn_grace_timer(this: &Arc<Self>, interval: Duration) {
        let weak: Weak<Self> = Arc::downgrade(this);

        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(ledger) = weak.upgrade() {
                ledger.clear();
                ledger
                    .bus
                    .publish(Event::now(EventKind::RebootRecordCleared));
            }
        });
    }

    /// Create-or-replace the record with `"<app>/<proc>"`.
    ///
    /// Owner-only mode; failures are published, not returned, so the caller's
    /// fault dispatch is never interrupted.
    pub fn write(&self, app: &str, proc_name: &str) {
        let record = format!("{app}/{proc_name}\0");

        let result = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o700)
            .open(&self.path)
            .and_then(|mut f| f.write_all(record.as_bytes()));

        if let Err(e) = result {
            self.bus.publish(
                Event::now(EventKind::LedgerFault)
                    .with_app(app)
                    .with_proc(proc_name)
                    .with_error(format!("write failed: {e}")),
            );
        }
    }

    /// True iff the record exists and names exactly this (app, process).
    pub fn is_for(&self, app: &str, proc_name: &str) -> bool {
        let mut file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return false,
            Err(e) => {
                self.bus.publish(
                    Event::now(EventKind::LedgerFault)
                        .with_app(app)
                        .with_error(format!("open failed: {e}")),
                );
                return false;
            }
        };

        let mut contents = Vec::new();
        if let Err(e) = file.read_to_end(&mut contents) {
            self.bus.publish(
                Event::now(EventKind::LedgerFault)
                    .with_app(app)
                    .with_error(format!("read failed: {e}")),
            );
            return false;
        }

        contents == format!("{app}/{proc_name}\0").as_bytes()
    }

    /// Removes the record; a missing file is not an error.
    pub fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                self.bus.publish(
                    Event::now(EventKind::LedgerFault)
                        .with_error(format!("clear failed: {e}")),
                );
            }
        }
    }
}
