//! # Per-process bookkeeping inside an application.
//!
//! A [`ProcObject`] pairs the launcher-side process record with the one piece
//! of state the application layer keeps for it: the optional stop handler the
//! watchdog path plants to request a relaunch on the next clean exit.
//!
//! ## Rules
//! - The stop handler is set **only** by the watchdog path.
//! - Every supervisor-initiated kill (soft or hard group kill) clears it, so
//!   a deliberate shutdown never resurrects the process.
//! - It is consumed (taken) when invoked.

use crate::ports::ProcId;

/// What to do when the process next stops without fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcStopHandler {
    /// Relaunch the process through the same path `start()` used.
    Restart,
}

/// One monitored process of an application.
pub(crate) struct ProcObject {
    proc: ProcId,
    stop_handler: Option<ProcStopHandler>,
}

impl ProcObject {
    pub(crate) fn new(proc: ProcId) -> Self {
        Self {
            proc,
            stop_handler: None,
        }
    }

    /// Handle to the launcher-side record.
    pub(crate) fn proc(&self) -> ProcId {
        self.proc
    }

    /// Plants the handler invoked on the next no-fault stop.
    pub(crate) fn set_stop_handler(&mut self, handler: ProcStopHandler) {
        self.stop_handler = Some(handler);
    }

    /// Clears the handler without invoking it.
    pub(crate) fn clear_stop_handler(&mut self) {
        self.stop_handler = None;
    }

    /// Takes the handler for invocation, leaving the slot empty.
    pub(crate) fn take_stop_handler(&mut self) -> Option<ProcStopHandler> {
        self.stop_handler.take()
    }
}
