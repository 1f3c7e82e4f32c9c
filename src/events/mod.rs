//! # Lifecycle events: kinds, metadata, and the broadcast bus.
//!
//! - [`event`] — [`Event`] and [`EventKind`]: what happened, to which app and
//!   process, with ordering guarantees.
//! - [`bus`] — [`Bus`]: broadcast channel the supervisor and applications
//!   publish into and subscribers drain from.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
