//! Lifecycle orchestrator: boot, runtime enable/disable, shutdown.
//!
//! Boot is two-phase. Every enabled descriptor is constructed first, then
//! all instances run `init()` in ascending level order, then all run
//! `start()`. The split guarantees that a consumer at a higher level can
//! resolve services its producers registered during their own `init()`,
//! regardless of file order.
//!
//! A failure in a `required` instance aborts boot with an error. A failure
//! in a non-required instance degrades it to `Error` status, sweeps its
//! leftover claims, registrations and subscriptions, and boot continues.

use crate::context::{CoreContext, ModuleContext};
use crate::descriptor::SystemConfig;
use crate::envelope::EventEnvelope;
use crate::error::CoreError;
use crate::events::{
    EVENT_CONFIG_UPDATED, EVENT_MODULE_DISABLED, EVENT_MODULE_ENABLED,
    EVENT_SYSTEM_SHUTDOWN, EVENT_SYSTEM_START_COMPLETE, LifecyclePayload,
};
use crate::factory::ModuleFactory;
use crate::module::{ModuleSlot, ModuleStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Snapshot of one instance for status reporting.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Instance name.
    pub name: String,
    /// Registered type tag.
    pub module_type: String,
    /// Init-ordering level.
    pub level: u8,
    /// Current lifecycle status.
    pub status: ModuleStatus,
}

/// Owner of all module instances and their lifecycle.
pub struct SystemManager {
    ctx: Arc<CoreContext>,
    factory: ModuleFactory,
    slots: Vec<Arc<ModuleSlot>>,
    configs: HashMap<String, toml::Table>,
}

impl SystemManager {
    /// Create a manager with an empty instance set.
    pub fn new(factory: ModuleFactory) -> Self {
        Self {
            ctx: Arc::new(CoreContext::new()),
            factory,
            slots: Vec::new(),
            configs: HashMap::new(),
        }
    }

    /// The shared core context.
    pub fn context(&self) -> &Arc<CoreContext> {
        &self.ctx
    }

    /// Construct, initialize and start every enabled instance in `system`.
    ///
    /// Publishes [`EVENT_SYSTEM_START_COMPLETE`] once the start phase is
    /// done, even if non-required instances degraded along the way.
    ///
    /// # Errors
    /// Returns the first error raised by a `required` instance; the caller
    /// should treat that as fatal.
    pub fn boot(&mut self, system: SystemConfig) -> Result<(), CoreError> {
        // Phase 0: construct.
        for descriptor in &system.modules {
            if !descriptor.enabled {
                info!("descriptor of type '{}' is disabled, skipping", descriptor.module_type);
                continue;
            }
            let name = match descriptor.instance_name() {
                Ok(name) => name.to_string(),
                Err(e) if descriptor.required => return Err(e),
                Err(e) => {
                    warn!("skipping descriptor: {e}");
                    continue;
                }
            };
            if self.slots.iter().any(|s| s.name() == name) {
                let e = CoreError::DuplicateName(name);
                if descriptor.required {
                    return Err(e);
                }
                warn!("skipping descriptor: {e}");
                continue;
            }

            let slot = Arc::new(ModuleSlot::new(
                &name,
                &descriptor.module_type,
                descriptor.level,
                descriptor.required,
            ));
            match self.factory.construct(&descriptor.module_type, &descriptor.config) {
                Ok(module) => slot.install(module),
                Err(e) if descriptor.required => {
                    error!("required instance '{name}' failed to construct: {e}");
                    return Err(e);
                }
                Err(e) => {
                    warn!("instance '{name}' failed to construct: {e}");
                    slot.set_status(ModuleStatus::Error);
                }
            }
            self.configs.insert(name, descriptor.config.clone());
            self.slots.push(slot);
        }

        // Level order for init/start; stable, so ties keep file order.
        self.slots.sort_by_key(|slot| slot.level());

        // Phase 1: init, lowest level first. Services registered during a
        // level stay unresolvable until the level completes, so a producer
        // is visible to strictly higher levels only; the deferral must be
        // switched off again even when a required instance aborts boot.
        self.ctx.services().defer_registrations(true);
        let init_result = self.init_phase();
        self.ctx.services().defer_registrations(false);
        init_result?;

        // Phase 2: start, same order.
        for slot in &self.slots {
            if slot.status() != ModuleStatus::Initialized {
                continue;
            }
            match self.run_lifecycle(slot, "start") {
                Ok(()) => slot.set_status(ModuleStatus::Running),
                Err(e) if slot.required() => {
                    error!("required instance '{}' failed to start: {e}", slot.name());
                    return Err(e);
                }
                Err(e) => {
                    warn!("instance '{}' failed to start: {e}", slot.name());
                    self.degrade(slot);
                }
            }
        }

        info!("boot complete: {} instance(s)", self.slots.len());
        self.ctx.publish(EventEnvelope::signal(EVENT_SYSTEM_START_COMPLETE));
        Ok(())
    }

    /// Re-enable a disabled (or errored) instance from its stored
    /// descriptor, running a fresh construct → init → start cycle.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidState`] unless the instance is
    /// `Disabled` or `Error`, or the lifecycle error that re-degrades it.
    pub fn enable(&self, name: &str) -> Result<(), CoreError> {
        let slot = self.find(name)?;
        match slot.status() {
            ModuleStatus::Disabled | ModuleStatus::Error => {}
            status => {
                return Err(CoreError::InvalidState {
                    instance: name.to_string(),
                    status,
                    command: "enable",
                });
            }
        }

        let config = self
            .configs
            .get(name)
            .ok_or_else(|| CoreError::InstanceNotFound(name.to_string()))?;
        let module = self.factory.construct(slot.module_type(), config)?;
        slot.install(module);
        slot.set_status(ModuleStatus::Uninitialized);

        for (phase, next) in [("init", ModuleStatus::Initialized), ("start", ModuleStatus::Running)]
        {
            if let Err(e) = self.run_lifecycle(&slot, phase) {
                warn!("instance '{name}' failed to {phase} on enable: {e}");
                self.degrade(&slot);
                return Err(e);
            }
            slot.set_status(next);
        }

        info!("instance '{name}' enabled");
        self.ctx.publish(EventEnvelope::with_payload(
            EVENT_MODULE_ENABLED,
            LifecyclePayload { instance: name.to_string() },
        ));
        Ok(())
    }

    /// Stop an instance: `deinit()`, sweep its claims, registrations and
    /// subscriptions, drop the module, mark it `Disabled`.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidState`] unless the instance is
    /// `Running` or `Initialized`. A `deinit()` error is logged, not
    /// returned; the sweep makes the outcome the same either way.
    pub fn disable(&self, name: &str) -> Result<(), CoreError> {
        let slot = self.find(name)?;
        match slot.status() {
            ModuleStatus::Running | ModuleStatus::Initialized => {}
            status => {
                return Err(CoreError::InvalidState {
                    instance: name.to_string(),
                    status,
                    command: "disable",
                });
            }
        }

        self.stop(&slot);
        info!("instance '{name}' disabled");
        self.ctx.publish(EventEnvelope::with_payload(
            EVENT_MODULE_DISABLED,
            LifecyclePayload { instance: name.to_string() },
        ));
        Ok(())
    }

    /// Hand a new config table to a running instance.
    ///
    /// The stored descriptor config is updated only if the module accepts,
    /// so a later disable/enable cycle replays the accepted configuration.
    ///
    /// # Errors
    /// Passes through the module's own error, [`CoreError::NotSupported`]
    /// if it does not implement reconfiguration, or
    /// [`CoreError::InvalidState`] if the instance is not routable.
    pub fn reconfigure(&mut self, name: &str, config: toml::Table) -> Result<(), CoreError> {
        let slot = self.find(name)?;
        if !slot.is_routable() {
            return Err(CoreError::InvalidState {
                instance: name.to_string(),
                status: slot.status(),
                command: "reconfigure",
            });
        }

        {
            let mut guard = slot.lock_inner();
            let module = guard
                .as_mut()
                .ok_or_else(|| CoreError::InstanceNotFound(name.to_string()))?;
            let ctx = ModuleContext::new(&self.ctx, &slot);
            module.reconfigure(&ctx, &config)?;
        }

        self.configs.insert(name.to_string(), config);
        info!("instance '{name}' reconfigured");
        self.ctx.publish(EventEnvelope::with_payload(
            EVENT_CONFIG_UPDATED,
            LifecyclePayload { instance: name.to_string() },
        ));
        Ok(())
    }

    /// Current status of an instance.
    ///
    /// # Errors
    /// Returns [`CoreError::InstanceNotFound`] for an unknown name.
    pub fn status(&self, name: &str) -> Result<ModuleStatus, CoreError> {
        Ok(self.find(name)?.status())
    }

    /// Snapshot of every instance, in init order.
    pub fn modules(&self) -> Vec<ModuleInfo> {
        self.slots
            .iter()
            .map(|slot| ModuleInfo {
                name: slot.name().to_string(),
                module_type: slot.module_type().to_string(),
                level: slot.level(),
                status: slot.status(),
            })
            .collect()
    }

    /// Orderly shutdown: publish [`EVENT_SYSTEM_SHUTDOWN`], then stop every
    /// live instance in reverse init order.
    pub fn shutdown(&mut self) {
        info!("shutting down");
        self.ctx.publish(EventEnvelope::signal(EVENT_SYSTEM_SHUTDOWN));
        for slot in self.slots.iter().rev() {
            if matches!(slot.status(), ModuleStatus::Running | ModuleStatus::Initialized) {
                self.stop(slot);
            }
        }
    }

    fn init_phase(&self) -> Result<(), CoreError> {
        let mut start = 0;
        while start < self.slots.len() {
            let level = self.slots[start].level();
            let end = start
                + self.slots[start..]
                    .iter()
                    .take_while(|slot| slot.level() == level)
                    .count();
            for slot in &self.slots[start..end] {
                if slot.status() != ModuleStatus::Uninitialized {
                    continue;
                }
                info!("init '{}' (level {level})", slot.name());
                match self.run_lifecycle(slot, "init") {
                    Ok(()) => slot.set_status(ModuleStatus::Initialized),
                    Err(e) if slot.required() => {
                        error!("required instance '{}' failed to init: {e}", slot.name());
                        return Err(e);
                    }
                    Err(e) => {
                        warn!("instance '{}' failed to init: {e}", slot.name());
                        self.degrade(slot);
                    }
                }
            }
            self.ctx.services().commit_deferred();
            start = end;
        }
        Ok(())
    }

    fn find(&self, name: &str) -> Result<Arc<ModuleSlot>, CoreError> {
        self.slots
            .iter()
            .find(|slot| slot.name() == name)
            .cloned()
            .ok_or_else(|| CoreError::InstanceNotFound(name.to_string()))
    }

    fn run_lifecycle(&self, slot: &Arc<ModuleSlot>, phase: &str) -> Result<(), CoreError> {
        let mut guard = slot.lock_inner();
        let module = guard
            .as_mut()
            .ok_or_else(|| CoreError::InstanceNotFound(slot.name().to_string()))?;
        let ctx = ModuleContext::new(&self.ctx, slot);
        match phase {
            "init" => module.init(&ctx),
            "start" => module.start(&ctx),
            _ => unreachable!("unknown lifecycle phase"),
        }
    }

    /// Drop a failed instance and sweep everything it left behind.
    fn degrade(&self, slot: &Arc<ModuleSlot>) {
        *slot.lock_inner() = None;
        self.sweep(slot.name());
        slot.set_status(ModuleStatus::Error);
    }

    fn stop(&self, slot: &Arc<ModuleSlot>) {
        {
            let mut guard = slot.lock_inner();
            if let Some(module) = guard.as_mut() {
                let ctx = ModuleContext::new(&self.ctx, slot);
                if let Err(e) = module.deinit(&ctx) {
                    warn!("instance '{}' deinit failed: {e}", slot.name());
                }
            }
            *guard = None;
        }
        self.sweep(slot.name());
        slot.set_status(ModuleStatus::Disabled);
    }

    /// A stopped instance must leave no trace in the shared tables.
    fn sweep(&self, name: &str) {
        self.ctx.resources().release_all(name);
        self.ctx.services().unregister_owned(name);
        self.ctx.events().unsubscribe_all(name);
        self.ctx.scheduler().cancel_owned(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;

    struct Noop;
    impl Module for Noop {}

    fn manager_with_noop() -> SystemManager {
        let mut factory = ModuleFactory::new();
        factory.register("noop", |_| Ok(Box::new(Noop)));
        SystemManager::new(factory)
    }

    #[test]
    fn boot_skips_disabled_descriptors() {
        let mut manager = manager_with_noop();
        let system = SystemConfig::from_toml(
            r#"
            [[modules]]
            type = "noop"
            config = { instance_name = "a" }

            [[modules]]
            type = "noop"
            enabled = false
            config = { instance_name = "b" }
            "#,
        )
        .unwrap();

        manager.boot(system).unwrap();
        assert_eq!(manager.status("a").unwrap(), ModuleStatus::Running);
        assert!(matches!(
            manager.status("b"),
            Err(CoreError::InstanceNotFound(_))
        ));
    }

    #[test]
    fn unknown_name_everywhere() {
        let manager = manager_with_noop();
        assert!(matches!(manager.status("ghost"), Err(CoreError::InstanceNotFound(_))));
        assert!(matches!(manager.enable("ghost"), Err(CoreError::InstanceNotFound(_))));
        assert!(matches!(manager.disable("ghost"), Err(CoreError::InstanceNotFound(_))));
    }

    #[test]
    fn lifecycle_commands_reject_wrong_status() {
        let mut manager = manager_with_noop();
        let system = SystemConfig::from_toml(
            r#"
            [[modules]]
            type = "noop"
            config = { instance_name = "a" }
            "#,
        )
        .unwrap();
        manager.boot(system).unwrap();

        // Running cannot be enabled again.
        assert!(matches!(
            manager.enable("a"),
            Err(CoreError::InvalidState { command: "enable", .. })
        ));
        manager.disable("a").unwrap();
        // Disabled cannot be disabled again.
        assert!(matches!(
            manager.disable("a"),
            Err(CoreError::InvalidState { command: "disable", .. })
        ));
        manager.enable("a").unwrap();
        assert_eq!(manager.status("a").unwrap(), ModuleStatus::Running);
    }
}
