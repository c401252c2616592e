//! Core context and the per-module view of it.
//!
//! [`CoreContext`] bundles the three shared subsystems. Modules never touch
//! it directly: every lifecycle call receives a [`ModuleContext`] that stamps
//! the calling instance's identity onto claims, registrations and
//! subscriptions, so ownership bookkeeping cannot be forged or forgotten.

use crate::envelope::EventEnvelope;
use crate::error::CoreError;
use crate::event_bus::EventBus;
use crate::module::ModuleSlot;
use crate::resource::{ResourceKind, ResourceManager};
use crate::scheduler::{JobId, JobScheduler};
use crate::service::{ServiceHandle, ServiceLocator, ServiceType};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// Shared state of a running system.
#[derive(Default)]
pub struct CoreContext {
    resources: ResourceManager,
    services: ServiceLocator,
    events: EventBus,
    scheduler: JobScheduler,
}

impl CoreContext {
    /// Create a context with empty subsystems.
    pub fn new() -> Self {
        Self {
            resources: ResourceManager::new(),
            services: ServiceLocator::new(),
            events: EventBus::new(),
            scheduler: JobScheduler::new(),
        }
    }

    /// The resource ledger.
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    /// The service registry.
    pub fn services(&self) -> &ServiceLocator {
        &self.services
    }

    /// The event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The periodic-job scheduler.
    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    /// Publish an envelope from outside any module (supervisor code, tests).
    pub fn publish(&self, envelope: EventEnvelope) {
        self.events.publish(self, envelope, None);
    }
}

/// A module's handle to the core, carrying its identity.
pub struct ModuleContext<'a> {
    core: &'a CoreContext,
    slot: &'a Arc<ModuleSlot>,
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(core: &'a CoreContext, slot: &'a Arc<ModuleSlot>) -> Self {
        Self { core, slot }
    }

    /// The calling instance's name.
    pub fn instance(&self) -> &str {
        self.slot.name()
    }

    /// Direct access to the resource ledger (queries only; use
    /// [`claim`](Self::claim)/[`release`](Self::release) for ownership).
    pub fn resources(&self) -> &ResourceManager {
        self.core.resources()
    }

    /// Direct access to the service registry.
    pub fn services(&self) -> &ServiceLocator {
        self.core.services()
    }

    /// Claim a resource for this instance.
    ///
    /// # Errors
    /// Returns [`CoreError::ResourceBusy`] if another instance holds it.
    pub fn claim(&self, kind: ResourceKind, id: u16) -> Result<(), CoreError> {
        self.core.resources().lock(kind, id, self.instance())
    }

    /// Release a resource this instance holds.
    ///
    /// # Errors
    /// Returns [`CoreError::NotOwner`] if this instance does not hold it.
    pub fn release(&self, kind: ResourceKind, id: u16) -> Result<(), CoreError> {
        self.core.resources().release(kind, id, self.instance())
    }

    /// Register a service owned by this instance.
    ///
    /// # Errors
    /// Returns [`CoreError::DuplicateName`] if the name is taken.
    pub fn register_service(
        &self,
        name: &str,
        service_type: ServiceType,
        handle: ServiceHandle,
    ) -> Result<(), CoreError> {
        self.core
            .services()
            .register(name, service_type, handle, self.instance())
    }

    /// Unregister a service by name.
    ///
    /// # Errors
    /// Returns [`CoreError::ServiceNotFound`] if the name is absent.
    pub fn unregister_service(&self, name: &str) -> Result<(), CoreError> {
        self.core.services().unregister(name)
    }

    /// Resolve a service as an untyped handle.
    ///
    /// # Errors
    /// Returns [`CoreError::ServiceNotFound`] if absent or dead.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Any + Send + Sync>, CoreError> {
        self.core.services().get(name)
    }

    /// Resolve a service downcast to its concrete API type.
    ///
    /// # Errors
    /// A type mismatch reports [`CoreError::ServiceNotFound`]: to the caller
    /// a wrongly-typed service is as unusable as a missing one.
    pub fn resolve_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, CoreError> {
        self.resolve(name)?
            .downcast::<T>()
            .map_err(|_| CoreError::ServiceNotFound(name.to_string()))
    }

    /// Subscribe this instance to an event name.
    ///
    /// # Errors
    /// See [`EventBus::subscribe`].
    pub fn subscribe(&self, event: &str) -> Result<(), CoreError> {
        self.core.events().subscribe(event, self.slot)
    }

    /// Drop one of this instance's subscriptions.
    pub fn unsubscribe(&self, event: &str) {
        self.core.events().unsubscribe(event, self.instance());
    }

    /// Publish an envelope. Dispatch is synchronous; see [`EventBus`].
    ///
    /// The bus knows this instance is the publisher, so an event it also
    /// subscribes to is not delivered back to it mid-call.
    pub fn publish(&self, envelope: EventEnvelope) {
        self.core
            .events()
            .publish(self.core, envelope, Some(self.instance()));
    }

    /// Submit periodic background work owned by this instance.
    ///
    /// The job is cancelled automatically when the instance is disabled.
    ///
    /// # Errors
    /// See [`JobScheduler::schedule_periodic`].
    pub fn schedule_periodic(
        &self,
        name: &str,
        interval: Duration,
        run: impl FnMut() + Send + 'static,
    ) -> Result<JobId, CoreError> {
        self.core
            .scheduler()
            .schedule_periodic(name, self.instance(), interval, run)
    }

    /// Cancel one of this instance's jobs. Returns whether it was still
    /// scheduled.
    pub fn cancel_job(&self, id: JobId) -> bool {
        self.core.scheduler().cancel(id)
    }
}
