//! Prelude module for common re-exports.
//!
//! `use trellis_core::prelude::*;` brings in everything a typical module
//! implementation or supervisor needs without listing individual paths.

// ─── Lifecycle ──────────────────────────────────────────────────────
pub use crate::factory::ModuleFactory;
pub use crate::module::{Module, ModuleStatus};
pub use crate::system::{ModuleInfo, SystemManager};

// ─── Context & Errors ───────────────────────────────────────────────
pub use crate::context::{CoreContext, ModuleContext};
pub use crate::error::CoreError;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::descriptor::{ModuleDescriptor, SystemConfig, parse_config};

// ─── Resources & Services ───────────────────────────────────────────
pub use crate::resource::ResourceKind;
pub use crate::service::{ServiceHandle, ServiceType};

// ─── Background work ────────────────────────────────────────────────
pub use crate::scheduler::JobId;

// ─── Events ─────────────────────────────────────────────────────────
pub use crate::envelope::EventEnvelope;
pub use crate::events::{
    ConnectivityPayload, EVENT_CONFIG_UPDATED, EVENT_CONNECTIVITY_ESTABLISHED,
    EVENT_CONNECTIVITY_LOST, EVENT_MODULE_DISABLED, EVENT_MODULE_ENABLED,
    EVENT_SYSTEM_SHUTDOWN, EVENT_SYSTEM_START_COMPLETE, EVENT_WILDCARD, LifecyclePayload,
};
