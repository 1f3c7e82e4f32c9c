//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] — the extension point for plugging custom event
//! handlers into the supervisor.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Bounded queue** (configurable capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics caught, reported as `SubscriberPanicked` event)
//!
//! ## Rules
//! - Slow subscribers only affect themselves (queue overflow → event drop)
//! - Panics are **isolated** (do not crash the supervisor or other subscribers)
//! - Subscribers **do not block** publishers or other subscribers
//! - Queue capacity is **per-subscriber** (not global)

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for supervisor observability.
///
/// Receives events from the supervisor via a dedicated worker task with a
/// bounded queue.
///
/// ### Implementation requirements
/// - **Async-friendly**: avoid blocking operations, use async I/O
/// - **Error handling**: handle errors internally, do not panic
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, sequentially, in FIFO order.
    /// Panics are caught and reported as `SubscriberPanicked`.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name for logging and diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber.
    ///
    /// When the queue is full the incoming event is dropped for this
    /// subscriber only and a `SubscriberOverflow` event is published.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
