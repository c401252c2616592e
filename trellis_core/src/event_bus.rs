//! Event Bus: synchronous publish/subscribe between module instances.
//!
//! Dispatch is synchronous on the publisher's thread: `publish` returns only
//! after every receiving module's `handle_event` has returned and the
//! envelope has been released. Subscribers for the exact event name run
//! first, in subscription order, then wildcard (`"*"`) subscribers that have
//! not already received this publish.
//!
//! The subscription table lock is never held across a module callback; the
//! target list is snapshotted first, so a handler may subscribe, unsubscribe
//! or publish without deadlocking the bus. A target busy with another
//! publish blocks this one until it is free; the only delivery ever skipped
//! is an instance's publish arriving back at itself, which would deadlock on
//! its own state lock.

use crate::context::{CoreContext, ModuleContext};
use crate::envelope::EventEnvelope;
use crate::error::CoreError;
use crate::events::EVENT_WILDCARD;
use crate::module::ModuleSlot;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

/// Upper bound on subscriptions per event name.
pub const MAX_SUBSCRIBERS_PER_EVENT: usize = 16;

struct Subscription {
    event: String,
    instance: String,
    slot: Weak<ModuleSlot>,
}

/// Synchronous publish/subscribe fabric.
#[derive(Default)]
pub struct EventBus {
    subs: Mutex<Vec<Subscription>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            subs: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe an instance to an event name (or [`EVENT_WILDCARD`]).
    ///
    /// Subscribing twice to the same name is an idempotent no-op.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigInvalid`] for an empty name and
    /// [`CoreError::CapacityExceeded`] when the per-event bound is hit.
    pub fn subscribe(&self, event: &str, slot: &Arc<ModuleSlot>) -> Result<(), CoreError> {
        if event.is_empty() {
            return Err(CoreError::ConfigInvalid("event name is empty".to_string()));
        }
        let mut subs = self.subs.lock();
        if subs
            .iter()
            .any(|s| s.event == event && s.instance == slot.name())
        {
            debug!("'{}' already subscribed to '{event}'", slot.name());
            return Ok(());
        }
        if subs.iter().filter(|s| s.event == event).count() >= MAX_SUBSCRIBERS_PER_EVENT {
            return Err(CoreError::CapacityExceeded("subscribers per event"));
        }
        subs.push(Subscription {
            event: event.to_string(),
            instance: slot.name().to_string(),
            slot: Arc::downgrade(slot),
        });
        info!("'{}' subscribed to '{event}'", slot.name());
        Ok(())
    }

    /// Remove one subscription. Unsubscribing a name that was never
    /// subscribed is a no-op.
    pub fn unsubscribe(&self, event: &str, instance: &str) {
        let mut subs = self.subs.lock();
        subs.retain(|s| !(s.event == event && s.instance == instance));
    }

    /// Remove every subscription held by `instance`. Returns the number
    /// removed.
    pub(crate) fn unsubscribe_all(&self, instance: &str) -> usize {
        let mut subs = self.subs.lock();
        let before = subs.len();
        subs.retain(|s| s.instance != instance);
        let removed = before - subs.len();
        if removed > 0 {
            warn!("swept {removed} stale subscription(s) held by '{instance}'");
        }
        removed
    }

    /// Number of live subscriptions for an event name.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subs.lock().iter().filter(|s| s.event == event).count()
    }

    /// Deliver an envelope to every subscriber, then release it.
    ///
    /// Exact-name subscribers run first in subscription order, then wildcard
    /// subscribers that have not already been delivered to. Targets that are
    /// not routable or already gone are skipped; a busy target is waited
    /// for. `publisher` names the instance publishing from inside one of its
    /// own lifecycle or handler calls; delivery back to it is skipped.
    pub(crate) fn publish(
        &self,
        core: &CoreContext,
        envelope: EventEnvelope,
        publisher: Option<&str>,
    ) {
        let event = envelope.name().to_string();

        // Snapshot targets under the lock, dispatch outside it.
        let targets: Vec<Arc<ModuleSlot>> = {
            let subs = self.subs.lock();
            let mut targets: Vec<Arc<ModuleSlot>> = Vec::new();
            for sub in subs.iter().filter(|s| s.event == event) {
                if let Some(slot) = sub.slot.upgrade() {
                    targets.push(slot);
                }
            }
            for sub in subs.iter().filter(|s| s.event == EVENT_WILDCARD) {
                if targets.iter().any(|t| t.name() == sub.instance) {
                    continue;
                }
                if let Some(slot) = sub.slot.upgrade() {
                    targets.push(slot);
                }
            }
            targets
        };

        trace!("publishing '{event}' to {} subscriber(s)", targets.len());
        for slot in &targets {
            if publisher == Some(slot.name()) {
                debug!("skipping '{}' for '{event}': self-delivery", slot.name());
                continue;
            }
            if !slot.is_routable() {
                debug!(
                    "skipping '{}' for '{event}': status {}",
                    slot.name(),
                    slot.status()
                );
                continue;
            }
            // Blocks until the target finishes its current call, so a
            // racing publish from another thread is delivered, not dropped.
            let mut guard = slot.lock_inner();
            if let Some(module) = guard.as_mut() {
                let ctx = ModuleContext::new(core, slot);
                module.handle_event(&ctx, &event, &envelope);
            }
        }

        // The publisher handed ownership to us; release here exactly once.
        drop(envelope);
    }
}
