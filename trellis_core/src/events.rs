//! Well-known framework event names and their payload types.
//!
//! Module-defined events use their own names; these constants cover the
//! lifecycle and connectivity notifications the framework itself publishes.

/// Published once after the boot sequence has started every module.
pub const EVENT_SYSTEM_START_COMPLETE: &str = "SYSTEM_START_COMPLETE";
/// Published when an orderly shutdown begins.
pub const EVENT_SYSTEM_SHUTDOWN: &str = "SYSTEM_SHUTDOWN";
/// Published after a successful runtime reconfiguration of an instance.
pub const EVENT_CONFIG_UPDATED: &str = "CONFIG_UPDATED";
/// Published after a disabled instance has been re-enabled.
pub const EVENT_MODULE_ENABLED: &str = "MODULE_ENABLED";
/// Published after an instance has been disabled.
pub const EVENT_MODULE_DISABLED: &str = "MODULE_DISABLED";
/// Published by connectivity modules when a link comes up.
pub const EVENT_CONNECTIVITY_ESTABLISHED: &str = "CONNECTIVITY_ESTABLISHED";
/// Published by connectivity modules when a link goes down.
pub const EVENT_CONNECTIVITY_LOST: &str = "CONNECTIVITY_LOST";
/// Subscribing to this name delivers every published event.
pub const EVENT_WILDCARD: &str = "*";

/// Payload for [`EVENT_MODULE_ENABLED`] / [`EVENT_MODULE_DISABLED`] /
/// [`EVENT_CONFIG_UPDATED`].
#[derive(Debug, Clone)]
pub struct LifecyclePayload {
    /// Instance the lifecycle transition applies to.
    pub instance: String,
}

/// Payload for the connectivity events.
#[derive(Debug, Clone)]
pub struct ConnectivityPayload {
    /// Interface name, e.g. `"wifi0"`.
    pub interface: String,
}
