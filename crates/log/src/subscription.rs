//! Subscription handles for event delivery.
//!
//! Subscriptions are explicit handles over an mpsc channel. Liveness
//! is channel-closed detection: when a subscriber drops its
//! [`EventSubscription`], the next delivery attempt fails on the
//! sender side and the log prunes the registration silently. The
//! appending caller never sees an error from a dead subscriber.

use ledger_core::Event;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// What a subscriber wants delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionTarget {
    /// Every event, regardless of stream.
    All,
    /// Only events appended to the named stream.
    Stream(String),
}

impl SubscriptionTarget {
    /// True when an event on `stream_id` matches this target.
    pub fn matches(&self, stream_id: &str) -> bool {
        match self {
            SubscriptionTarget::All => true,
            SubscriptionTarget::Stream(wanted) => wanted == stream_id,
        }
    }
}

/// Message delivered to subscribers: one committed event, carrying
/// every event field.
#[derive(Debug, Clone, PartialEq)]
pub struct EventNotification {
    /// The committed event.
    pub event: Event,
}

/// Receiving end of a subscription.
///
/// Dropping the handle unsubscribes: the log notices the closed
/// channel on its next delivery attempt.
#[derive(Debug)]
pub struct EventSubscription {
    rx: Receiver<EventNotification>,
}

impl EventSubscription {
    pub(crate) fn new(rx: Receiver<EventNotification>) -> Self {
        Self { rx }
    }

    /// Block until the next notification arrives.
    ///
    /// Returns `None` when the log side has gone away.
    pub fn recv(&self) -> Option<EventNotification> {
        self.rx.recv().ok()
    }

    /// Wait up to `timeout` for the next notification.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<EventNotification, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Take the next notification without blocking.
    pub fn try_recv(&self) -> Result<EventNotification, TryRecvError> {
        self.rx.try_recv()
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<EventNotification> {
        let mut out = Vec::new();
        while let Ok(notification) = self.rx.try_recv() {
            out.push(notification);
        }
        out
    }
}
