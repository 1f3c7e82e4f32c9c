//! Event subscribers: the fan-out extension point for observability.
//!
//! - [`subscriber`] — the [`Subscribe`] trait.
//! - [`set`] — [`SubscriberSet`]: per-subscriber delivery lanes with drop
//!   accounting, panic containment, and a drain-on-shutdown path.
//! - [`log`] — a stdout [`LogWriter`] (feature `logging`).

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
