//! Service Locator: a name-keyed capability registry without ownership.
//!
//! A module publishes a capability during its own `init()` under a unique
//! name; consumers resolve it by name without any compile-time coupling. The
//! locator holds a [`Weak`] handle only; the registering module governs the
//! API object's lifetime, and a lookup against a dead handle reports
//! [`CoreError::ServiceNotFound`] instead of dangling.
//!
//! There is no reference counting in the table itself: a consumer must
//! re-resolve a handle after the producing module's disable/enable transition
//! rather than caching it across such transitions.

use crate::error::CoreError;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Non-owning handle to a service API object.
///
/// Producers keep the `Arc` inside their own state and register the
/// downgraded `Weak`; consumers upgrade on lookup and downcast to the
/// concrete API type.
pub type ServiceHandle = Weak<dyn Any + Send + Sync>;

/// Enumerated type tag for optional type-checked lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    /// Communication bus host (I2C, SPI, ...).
    BusHost,
    /// Persistent storage backend.
    Storage,
    /// Display or indicator renderer.
    Display,
    /// Telemetry/sensor data source.
    Telemetry,
    /// Actuator control surface.
    Actuator,
    /// System-level management API.
    SystemApi,
    /// Anything that does not fit a well-known category.
    Custom,
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BusHost => "bus_host",
            Self::Storage => "storage",
            Self::Display => "display",
            Self::Telemetry => "telemetry",
            Self::Actuator => "actuator",
            Self::SystemApi => "system_api",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

struct ServiceRecord {
    service_type: ServiceType,
    handle: ServiceHandle,
    owner: String,
    // During staged boot, a registration stays invisible until the whole
    // boot level completes, so same-level init order cannot leak a service
    // to a peer that should not be able to see it yet.
    visible: bool,
}

/// Name-keyed registry of service handles.
#[derive(Default)]
pub struct ServiceLocator {
    table: Mutex<HashMap<String, ServiceRecord>>,
    deferring: AtomicBool,
}

impl ServiceLocator {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            deferring: AtomicBool::new(false),
        }
    }

    /// While on, new registrations are held invisible until
    /// [`commit_deferred`](Self::commit_deferred). The orchestrator turns
    /// this on for the boot init phase only.
    pub(crate) fn defer_registrations(&self, on: bool) {
        self.deferring.store(on, Ordering::SeqCst);
    }

    /// Make every held registration resolvable. Called by the orchestrator
    /// after each boot level's `init()` round completes.
    pub(crate) fn commit_deferred(&self) -> usize {
        let mut table = self.table.lock();
        let mut committed = 0;
        for (name, record) in table.iter_mut() {
            if !record.visible {
                record.visible = true;
                committed += 1;
                debug!("service '{name}' now visible");
            }
        }
        committed
    }

    /// Register a service handle under a unique name.
    ///
    /// `owner` is the registering instance; the orchestrator uses it to
    /// sweep registrations when the instance is disabled.
    ///
    /// # Errors
    /// Returns [`CoreError::DuplicateName`] if the name is taken.
    pub fn register(
        &self,
        name: &str,
        service_type: ServiceType,
        handle: ServiceHandle,
        owner: &str,
    ) -> Result<(), CoreError> {
        if name.is_empty() {
            return Err(CoreError::ConfigInvalid("service name is empty".to_string()));
        }
        let mut table = self.table.lock();
        if table.contains_key(name) {
            return Err(CoreError::DuplicateName(name.to_string()));
        }
        let visible = !self.deferring.load(Ordering::SeqCst);
        table.insert(
            name.to_string(),
            ServiceRecord {
                service_type,
                handle,
                owner: owner.to_string(),
                visible,
            },
        );
        info!("service '{name}' ({service_type}) registered by '{owner}'");
        Ok(())
    }

    /// Remove a registration by name.
    ///
    /// # Errors
    /// Returns [`CoreError::ServiceNotFound`] if the name is absent.
    pub fn unregister(&self, name: &str) -> Result<(), CoreError> {
        let mut table = self.table.lock();
        if table.remove(name).is_none() {
            return Err(CoreError::ServiceNotFound(name.to_string()));
        }
        info!("service '{name}' unregistered");
        Ok(())
    }

    /// Remove every registration made by `owner`. Returns the number removed.
    pub fn unregister_owned(&self, owner: &str) -> usize {
        let mut table = self.table.lock();
        let before = table.len();
        table.retain(|_, record| record.owner != owner);
        let removed = before - table.len();
        if removed > 0 {
            warn!("swept {removed} stale service registration(s) owned by '{owner}'");
        }
        removed
    }

    /// Resolve a service by name.
    ///
    /// # Errors
    /// Returns [`CoreError::ServiceNotFound`] if the name is absent, still
    /// held invisible for the current boot level, or the producer's API
    /// object has already been dropped.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Any + Send + Sync>, CoreError> {
        let table = self.table.lock();
        let record = table
            .get(name)
            .filter(|record| record.visible)
            .ok_or_else(|| CoreError::ServiceNotFound(name.to_string()))?;
        match record.handle.upgrade() {
            Some(api) => {
                debug!("service '{name}' resolved");
                Ok(api)
            }
            None => {
                warn!("service '{name}' is registered but its provider is gone");
                Err(CoreError::ServiceNotFound(name.to_string()))
            }
        }
    }

    /// Look up a service's type tag by name.
    ///
    /// # Errors
    /// Returns [`CoreError::ServiceNotFound`] if the name is absent.
    pub fn get_type(&self, name: &str) -> Result<ServiceType, CoreError> {
        let table = self.table.lock();
        table
            .get(name)
            .filter(|record| record.visible)
            .map(|record| record.service_type)
            .ok_or_else(|| CoreError::ServiceNotFound(name.to_string()))
    }

    /// First live service with the given type tag, if any.
    pub fn lookup_by_type(
        &self,
        service_type: ServiceType,
    ) -> Option<(String, Arc<dyn Any + Send + Sync>)> {
        let table = self.table.lock();
        table
            .iter()
            .filter(|(_, record)| record.visible && record.service_type == service_type)
            .find_map(|(name, record)| record.handle.upgrade().map(|api| (name.clone(), api)))
    }

    /// Number of registered names (live or not).
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeApi {
        #[allow(dead_code)]
        port: u16,
    }

    fn handle(api: &Arc<FakeApi>) -> ServiceHandle {
        let weak: Weak<FakeApi> = Arc::downgrade(api);
        weak
    }

    #[test]
    fn register_and_resolve() {
        let locator = ServiceLocator::new();
        let api = Arc::new(FakeApi { port: 0 });
        locator
            .register("i2c0", ServiceType::BusHost, handle(&api), "i2c_host")
            .unwrap();

        let resolved = locator.get("i2c0").unwrap();
        assert!(resolved.downcast::<FakeApi>().is_ok());
        assert_eq!(locator.get_type("i2c0").unwrap(), ServiceType::BusHost);
    }

    #[test]
    fn duplicate_name_rejected_until_unregistered() {
        let locator = ServiceLocator::new();
        let api = Arc::new(FakeApi { port: 0 });
        locator
            .register("i2c0", ServiceType::BusHost, handle(&api), "a")
            .unwrap();

        let err = locator
            .register("i2c0", ServiceType::BusHost, handle(&api), "b")
            .unwrap_err();
        assert_eq!(err, CoreError::DuplicateName("i2c0".to_string()));

        locator.unregister("i2c0").unwrap();
        locator
            .register("i2c0", ServiceType::BusHost, handle(&api), "b")
            .unwrap();
    }

    #[test]
    fn unregister_unknown_name() {
        let locator = ServiceLocator::new();
        let err = locator.unregister("nope").unwrap_err();
        assert_eq!(err, CoreError::ServiceNotFound("nope".to_string()));
    }

    #[test]
    fn dead_handle_reports_not_found() {
        let locator = ServiceLocator::new();
        let api = Arc::new(FakeApi { port: 0 });
        locator
            .register("i2c0", ServiceType::BusHost, handle(&api), "a")
            .unwrap();

        drop(api);
        let err = locator.get("i2c0").unwrap_err();
        assert_eq!(err, CoreError::ServiceNotFound("i2c0".to_string()));
        // The type tag is still queryable until the entry is swept.
        assert_eq!(locator.get_type("i2c0").unwrap(), ServiceType::BusHost);
    }

    #[test]
    fn unregister_owned_sweeps_only_that_owner() {
        let locator = ServiceLocator::new();
        let api = Arc::new(FakeApi { port: 0 });
        locator
            .register("a0", ServiceType::Custom, handle(&api), "mod_a")
            .unwrap();
        locator
            .register("a1", ServiceType::Custom, handle(&api), "mod_a")
            .unwrap();
        locator
            .register("b0", ServiceType::Custom, handle(&api), "mod_b")
            .unwrap();

        assert_eq!(locator.unregister_owned("mod_a"), 2);
        assert_eq!(locator.len(), 1);
        assert!(locator.get("b0").is_ok());
    }

    #[test]
    fn deferred_registration_is_invisible_until_committed() {
        let locator = ServiceLocator::new();
        let api = Arc::new(FakeApi { port: 0 });

        locator.defer_registrations(true);
        locator
            .register("i2c0", ServiceType::BusHost, handle(&api), "i2c_host")
            .unwrap();

        // Held registrations resolve as absent but still occupy the name.
        assert!(matches!(locator.get("i2c0"), Err(CoreError::ServiceNotFound(_))));
        assert!(locator.get_type("i2c0").is_err());
        assert!(locator.lookup_by_type(ServiceType::BusHost).is_none());
        assert!(matches!(
            locator.register("i2c0", ServiceType::BusHost, handle(&api), "other"),
            Err(CoreError::DuplicateName(_))
        ));

        assert_eq!(locator.commit_deferred(), 1);
        assert!(locator.get("i2c0").is_ok());

        // Once deferral is off again, registrations are visible immediately.
        locator.defer_registrations(false);
        locator
            .register("spi0", ServiceType::BusHost, handle(&api), "spi_host")
            .unwrap();
        assert!(locator.get("spi0").is_ok());
    }

    #[test]
    fn lookup_by_type_skips_dead_handles() {
        let locator = ServiceLocator::new();
        let dead = Arc::new(FakeApi { port: 0 });
        let live = Arc::new(FakeApi { port: 1 });
        locator
            .register("dead", ServiceType::BusHost, handle(&dead), "a")
            .unwrap();
        locator
            .register("live", ServiceType::BusHost, handle(&live), "b")
            .unwrap();
        drop(dead);

        let (name, _) = locator.lookup_by_type(ServiceType::BusHost).unwrap();
        assert_eq!(name, "live");
        assert!(locator.lookup_by_type(ServiceType::Storage).is_none());
    }
}
