//! # Subscriber fan-out.
//!
//! [`SubscriberSet`] owns one delivery *lane* per subscriber: a bounded
//! queue feeding a worker task that drives [`Subscribe::on_event`].
//! Publishing never waits on a subscriber; a lane that cannot keep up loses
//! events (counted and reported), and a panicking subscriber is reported and
//! kept running.
//!
//! ## Rules
//! - Per-lane FIFO; no ordering guarantees across lanes.
//! - `try_send` delivery: a full or closed lane drops that one event and a
//!   `SubscriberOverflow` event carries the lane's running drop count.
//! - Overflow/panic diagnostics are never re-reported for themselves, so a
//!   saturated lane cannot start an event storm.
//! - [`SubscriberSet::shutdown`] closes every lane and waits for the workers
//!   to drain what was already queued; the supervisor invokes it at the end
//!   of its shutdown sweep.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// One subscriber's delivery lane.
struct Lane {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
    dropped: AtomicU64,
    worker: JoinHandle<()>,
}

impl Lane {
    /// Opens the lane: bounded queue sized by the subscriber, plus the
    /// worker that feeds it events until the queue closes.
    fn open(sub: Arc<dyn Subscribe>, bus: Bus) -> Self {
        let capacity = sub.queue_capacity().max(1);
        let name = sub.name();
        let (queue, mut feed) = mpsc::channel::<Arc<Event>>(capacity);

        let worker = tokio::spawn(async move {
            while let Some(ev) = feed.recv().await {
                let attempt = std::panic::AssertUnwindSafe(sub.on_event(&ev))
                    .catch_unwind()
                    .await;
                if let Err(payload) = attempt {
                    bus.publish(Event::subscriber_panicked(sub.name(), panic_message(payload)));
                }
            }
        });

        Self {
            name,
            queue,
            dropped: AtomicU64::new(0),
            worker,
        }
    }

    /// Queues one event without waiting. Drops are counted per lane and
    /// reported unless `suppress` marks the event as a diagnostic itself.
    fn offer(&self, event: &Arc<Event>, suppress: bool, bus: &Bus) {
        let reason = match self.queue.try_send(Arc::clone(event)) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Full(_)) => "full",
            Err(mpsc::error::TrySendError::Closed(_)) => "closed",
        };

        let dropped = self.dropped.fetch_add(1, AtomicOrdering::Relaxed) + 1;
        if !suppress {
            bus.publish(Event::subscriber_overflow(self.name, reason, dropped));
        }
    }
}

/// Fan-out of lifecycle events to the registered subscribers.
pub struct SubscriberSet {
    lanes: Mutex<Vec<Lane>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Opens one lane per subscriber.
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let lanes = subscribers
            .into_iter()
            .map(|sub| Lane::open(sub, bus.clone()))
            .collect();

        Self {
            lanes: Mutex::new(lanes),
            bus,
        }
    }

    /// Hands an event to every lane without waiting for any of them.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let suppress = event.is_subscriber_overflow() || event.is_subscriber_panic();

        let lanes = match self.lanes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for lane in lanes.iter() {
            lane.offer(&event, suppress, &self.bus);
        }
    }

    /// Closes every lane and waits for the workers to finish draining the
    /// events already queued. Emitting afterwards is a silent no-op.
    pub async fn shutdown(&self) {
        let drained: Vec<Lane> = {
            let mut lanes = match self.lanes.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            lanes.drain(..).collect()
        };

        for lane in drained {
            drop(lane.queue);
            let _ = lane.worker.await;
        }
    }
}

/// Renders a panic payload for the diagnostic event.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(text) => *text,
        Err(payload) => match payload.downcast::<&str>() {
            Ok(text) => (*text).to_string(),
            Err(_) => "opaque panic payload".to_string(),
        },
    }
}
