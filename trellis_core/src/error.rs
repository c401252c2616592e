//! Core error taxonomy.
//!
//! All core subsystems report failures through the narrow result codes in
//! [`CoreError`]. Modules surface their own lifecycle failures through the
//! same type so the orchestrator can apply its required/degraded boot policy
//! uniformly. A constructor or `init()` that fails must unwind any partial
//! resource claims and service registrations before returning.

use crate::module::ModuleStatus;
use crate::resource::ResourceKind;
use thiserror::Error;

/// Error type shared by the core subsystems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Malformed or missing configuration field. Fatal to that instance only.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Hardware resource already claimed by a different instance.
    #[error("resource {kind}:{id} is busy (held by '{held_by}')")]
    ResourceBusy {
        /// Resource kind of the contested claim.
        kind: ResourceKind,
        /// Resource id of the contested claim.
        id: u16,
        /// Instance currently holding the claim.
        held_by: String,
    },

    /// Release attempted by an instance that does not hold the claim.
    #[error("resource {kind}:{id} is not held by '{caller}'")]
    NotOwner {
        /// Resource kind of the claim.
        kind: ResourceKind,
        /// Resource id of the claim.
        id: u16,
        /// Instance that attempted the release.
        caller: String,
    },

    /// No live service registered under the given name.
    #[error("service '{0}' not found")]
    ServiceNotFound(String),

    /// A service with the same name is already registered.
    #[error("service '{0}' is already registered")]
    DuplicateName(String),

    /// A bounded table is full.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(&'static str),

    /// The type tag has no registered constructor.
    #[error("unknown module type '{0}'")]
    UnknownType(String),

    /// No module instance with the given name.
    #[error("module instance '{0}' not found")]
    InstanceNotFound(String),

    /// Lifecycle command not valid for the instance's current status.
    #[error("module '{instance}' is {status}, cannot {command}")]
    InvalidState {
        /// Instance the command was addressed to.
        instance: String,
        /// Status the instance was in when the command arrived.
        status: ModuleStatus,
        /// The rejected command.
        command: &'static str,
    },

    /// The module does not implement the requested optional capability.
    #[error("operation not supported")]
    NotSupported,

    /// Module-specific failure raised from a lifecycle call.
    #[error("module error: {0}")]
    Module(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::ResourceBusy {
            kind: ResourceKind::Gpio,
            id: 4,
            held_by: "relay0".to_string(),
        };
        assert!(err.to_string().contains("gpio:4"));
        assert!(err.to_string().contains("relay0"));

        let err = CoreError::ServiceNotFound("bus0".to_string());
        assert!(err.to_string().contains("bus0"));
    }

    #[test]
    fn invalid_state_display() {
        let err = CoreError::InvalidState {
            instance: "display0".to_string(),
            status: ModuleStatus::Disabled,
            command: "disable",
        };
        assert!(err.to_string().contains("disabled"));
        assert!(err.to_string().contains("display0"));
    }
}
