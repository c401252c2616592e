//! Module trait and per-instance lifecycle state.
//!
//! A module is a self-contained unit of functionality driven through a fixed
//! lifecycle: construct, `init()`, `start()`, then event dispatch until
//! `deinit()`. Construction and `init()` are separate on purpose: every
//! instance is constructed before any is initialized, so init-time service
//! lookups only depend on init ordering, not construction ordering.

use crate::context::ModuleContext;
use crate::envelope::EventEnvelope;
use crate::error::CoreError;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;

/// Lifecycle status of a module instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    /// Constructed, `init()` not yet run.
    Uninitialized,
    /// `init()` succeeded, not yet started.
    Initialized,
    /// `start()` succeeded; the instance receives events.
    Running,
    /// Administratively stopped; resources released, not routable.
    Disabled,
    /// A lifecycle call failed; not routable.
    Error,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Disabled => "disabled",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// A pluggable unit of functionality.
///
/// All methods run on the orchestrator's thread or the publisher's thread;
/// implementations must not block for long. Publishing from inside a
/// lifecycle call or `handle_event` is allowed; the bus skips delivering
/// that publish back to the publishing instance itself.
pub trait Module: Send {
    /// Acquire resources and register services. Runs once per enable cycle,
    /// in ascending level order across instances.
    fn init(&mut self, _ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        Ok(())
    }

    /// Begin active operation. Runs after every instance has initialized.
    fn start(&mut self, _ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        Ok(())
    }

    /// Deliver a subscribed event. `event` is the published name, which for
    /// a wildcard subscriber differs from the subscribed name.
    fn handle_event(&mut self, _ctx: &ModuleContext<'_>, _event: &str, _data: &EventEnvelope) {}

    /// Apply a new configuration at runtime.
    ///
    /// # Errors
    /// The default rejects with [`CoreError::NotSupported`].
    fn reconfigure(
        &mut self,
        _ctx: &ModuleContext<'_>,
        _config: &toml::Table,
    ) -> Result<(), CoreError> {
        Err(CoreError::NotSupported)
    }

    /// Release everything acquired in `init()`/`start()`. The orchestrator
    /// sweeps leftover claims, services and subscriptions afterwards, but a
    /// well-behaved module releases its own.
    fn deinit(&mut self, _ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Orchestrator-owned slot for one module instance.
///
/// The slot outlives the boxed module inside it: disable drops the module but
/// keeps the slot so the instance can be re-enabled from its stored
/// descriptor later. The event bus holds `Weak` references to slots.
pub struct ModuleSlot {
    name: String,
    module_type: String,
    level: u8,
    required: bool,
    status: Mutex<ModuleStatus>,
    inner: Mutex<Option<Box<dyn Module>>>,
}

impl ModuleSlot {
    pub(crate) fn new(name: &str, module_type: &str, level: u8, required: bool) -> Self {
        Self {
            name: name.to_string(),
            module_type: module_type.to_string(),
            level,
            required,
            status: Mutex::new(ModuleStatus::Uninitialized),
            inner: Mutex::new(None),
        }
    }

    /// Unique instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered type tag the instance was constructed from.
    pub fn module_type(&self) -> &str {
        &self.module_type
    }

    /// Init-ordering level (lower initializes first).
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Whether a lifecycle failure of this instance aborts boot.
    pub fn required(&self) -> bool {
        self.required
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ModuleStatus {
        *self.status.lock()
    }

    pub(crate) fn set_status(&self, status: ModuleStatus) {
        *self.status.lock() = status;
    }

    /// Whether events are routed to this instance.
    pub fn is_routable(&self) -> bool {
        matches!(self.status(), ModuleStatus::Initialized | ModuleStatus::Running)
    }

    pub(crate) fn install(&self, module: Box<dyn Module>) {
        *self.inner.lock() = Some(module);
    }

    pub(crate) fn lock_inner(&self) -> MutexGuard<'_, Option<Box<dyn Module>>> {
        self.inner.lock()
    }
}

impl fmt::Debug for ModuleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSlot")
            .field("name", &self.name)
            .field("module_type", &self.module_type)
            .field("level", &self.level)
            .field("required", &self.required)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        assert_eq!(ModuleStatus::Uninitialized.to_string(), "uninitialized");
        assert_eq!(ModuleStatus::Running.to_string(), "running");
    }

    #[test]
    fn routable_statuses() {
        let slot = ModuleSlot::new("x", "test", 50, false);
        assert!(!slot.is_routable());
        slot.set_status(ModuleStatus::Initialized);
        assert!(slot.is_routable());
        slot.set_status(ModuleStatus::Running);
        assert!(slot.is_routable());
        slot.set_status(ModuleStatus::Disabled);
        assert!(!slot.is_routable());
        slot.set_status(ModuleStatus::Error);
        assert!(!slot.is_routable());
    }
}
