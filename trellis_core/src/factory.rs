//! Module factory: type tag to constructor registry.
//!
//! The supervisor registers one constructor per module type at startup; the
//! orchestrator then instantiates modules from configuration descriptors by
//! type tag. Registration of a duplicate tag is a programming error and
//! panics, the same way a doubly-registered driver would.

use crate::error::CoreError;
use crate::module::Module;
use std::collections::HashMap;
use tracing::debug;

type Constructor = Box<dyn Fn(&toml::Table) -> Result<Box<dyn Module>, CoreError> + Send + Sync>;

/// Registry of module constructors keyed by type tag.
#[derive(Default)]
pub struct ModuleFactory {
    constructors: HashMap<&'static str, Constructor>,
}

impl ModuleFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor for `module_type`.
    ///
    /// # Panics
    /// Panics if the type tag is already registered.
    pub fn register<F>(&mut self, module_type: &'static str, constructor: F)
    where
        F: Fn(&toml::Table) -> Result<Box<dyn Module>, CoreError> + Send + Sync + 'static,
    {
        if self
            .constructors
            .insert(module_type, Box::new(constructor))
            .is_some()
        {
            panic!("module type '{module_type}' registered twice");
        }
        debug!("module type '{module_type}' registered");
    }

    /// Instantiate a module from its per-instance configuration.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownType`] for an unregistered tag, or
    /// whatever the constructor itself reports.
    pub fn construct(
        &self,
        module_type: &str,
        config: &toml::Table,
    ) -> Result<Box<dyn Module>, CoreError> {
        let constructor = self
            .constructors
            .get(module_type)
            .ok_or_else(|| CoreError::UnknownType(module_type.to_string()))?;
        constructor(config)
    }

    /// Whether a constructor is registered for the tag.
    pub fn has_type(&self, module_type: &str) -> bool {
        self.constructors.contains_key(module_type)
    }

    /// Registered type tags, sorted.
    pub fn list_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.constructors.keys().copied().collect();
        types.sort_unstable();
        types
    }
}
