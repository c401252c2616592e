//! Trellis Core
//!
//! Composition framework for firmware-style systems built from pluggable
//! modules. The core owns four cooperating subsystems behind one shared
//! context:
//!
//! # Module Structure
//!
//! - [`resource`] - Exclusive-ownership ledger for finite hardware resources
//! - [`service`] - Name-keyed capability registry with non-owning handles
//! - [`event_bus`] - Synchronous publish/subscribe between instances
//! - [`system`] - Lifecycle orchestrator (boot, enable/disable, shutdown)
//! - [`scheduler`] - Shared periodic-job scheduler
//! - [`module`] - The [`Module`] trait and per-instance state
//! - [`factory`] - Type tag → constructor registry
//! - [`descriptor`] - TOML system configuration
//! - [`envelope`] - Event envelope with release-on-drop payloads
//! - [`events`] - Well-known framework event names
//! - [`context`] - Core context and the per-module view of it
//! - [`error`] - The [`CoreError`] taxonomy
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use trellis_core::prelude::*;
//!
//! struct Heartbeat;
//! impl Module for Heartbeat {}
//!
//! let mut factory = ModuleFactory::new();
//! factory.register("heartbeat", |_| Ok(Box::new(Heartbeat)));
//!
//! let mut manager = SystemManager::new(factory);
//! let system = SystemConfig::from_toml(
//!     "[[modules]]\ntype = \"heartbeat\"\nconfig = { instance_name = \"hb0\" }\n",
//! )
//! .unwrap();
//! manager.boot(system).unwrap();
//! assert_eq!(manager.status("hb0").unwrap(), ModuleStatus::Running);
//! ```

pub mod context;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod factory;
pub mod module;
pub mod prelude;
pub mod resource;
pub mod scheduler;
pub mod service;
pub mod system;

pub use context::{CoreContext, ModuleContext};
pub use descriptor::{ModuleDescriptor, SystemConfig, parse_config};
pub use envelope::{EventEnvelope, ReleaseFn};
pub use error::CoreError;
pub use event_bus::{EventBus, MAX_SUBSCRIBERS_PER_EVENT};
pub use factory::ModuleFactory;
pub use module::{Module, ModuleSlot, ModuleStatus};
pub use resource::{ResourceKind, ResourceManager};
pub use scheduler::{JobId, JobScheduler, MAX_SCHEDULED_JOBS};
pub use service::{ServiceHandle, ServiceLocator, ServiceType};
pub use system::{ModuleInfo, SystemManager};
