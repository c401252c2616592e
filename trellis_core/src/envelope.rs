//! Event envelope: a named, opaque payload with a release hook.
//!
//! Ownership of the envelope transfers to the event bus at publish time; the
//! bus is sole owner during dispatch and the release hook runs exactly once
//! when dispatch completes, even for a publish with zero subscribers.
//! Subscribers see the payload by reference only; one that needs it beyond
//! its own `handle_event` call must copy it.

use std::any::Any;
use std::fmt;

/// Hook invoked with the payload when the envelope is released.
pub type ReleaseFn = Box<dyn FnOnce(Box<dyn Any + Send>) + Send>;

/// A published message: event name + opaque payload + release hook.
pub struct EventEnvelope {
    name: String,
    payload: Option<Box<dyn Any + Send>>,
    release: Option<ReleaseFn>,
}

impl EventEnvelope {
    /// A payload-less notification.
    pub fn signal(name: &str) -> Self {
        Self {
            name: name.to_string(),
            payload: None,
            release: None,
        }
    }

    /// An envelope carrying `payload`, released by dropping it.
    pub fn with_payload<T: Any + Send>(name: &str, payload: T) -> Self {
        Self {
            name: name.to_string(),
            payload: Some(Box::new(payload)),
            release: None,
        }
    }

    /// An envelope with a publisher-supplied release hook.
    ///
    /// The hook runs exactly once, after the last subscriber for the publish
    /// has returned, and receives the payload back for cleanup.
    pub fn with_release<T, F>(name: &str, payload: T, release: F) -> Self
    where
        T: Any + Send,
        F: FnOnce(Box<dyn Any + Send>) + Send + 'static,
    {
        Self {
            name: name.to_string(),
            payload: Some(Box::new(payload)),
            release: Some(Box::new(release)),
        }
    }

    /// The event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the envelope carries a payload.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Borrow the payload downcast to `T`, if present and of that type.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }
}

// fmt::Debug by hand: the payload is opaque and the hook is not printable.
impl fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEnvelope")
            .field("name", &self.name)
            .field("has_payload", &self.payload.is_some())
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

impl Drop for EventEnvelope {
    fn drop(&mut self) {
        let payload = self.payload.take();
        if let Some(release) = self.release.take() {
            if let Some(payload) = payload {
                release(payload);
            }
        }
    }
}
