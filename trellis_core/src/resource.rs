//! Resource Manager: exclusive-ownership ledger for finite hardware
//! resources.
//!
//! A driver whose `init()` claims a pin that an unrelated driver also wants
//! must fail loudly at init time instead of corrupting hardware state
//! silently at runtime. Every claim is `(kind, id) → owner instance name`,
//! with at most one claim per `(kind, id)` at any instant.
//!
//! All operations take one short-held mutex; no blocking I/O happens while
//! it is held.

use crate::error::CoreError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Kinds of finite hardware resources arbitrated by the manager.
///
/// The `(kind, id)` pair is globally unique per device; what an `id` means
/// (pin number, bus index, timer slot) is defined by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// General-purpose I/O pin.
    Gpio,
    /// I2C bus controller.
    I2cBus,
    /// SPI bus controller.
    SpiBus,
    /// UART peripheral.
    UartPort,
    /// Hardware timer slot.
    Timer,
    /// ADC input channel.
    AdcChannel,
    /// DMA channel.
    DmaChannel,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gpio => "gpio",
            Self::I2cBus => "i2c_bus",
            Self::SpiBus => "spi_bus",
            Self::UartPort => "uart_port",
            Self::Timer => "timer",
            Self::AdcChannel => "adc_channel",
            Self::DmaChannel => "dma_channel",
        };
        f.write_str(name)
    }
}

/// Exclusive-ownership ledger over `(kind, id)` resources.
#[derive(Debug, Default)]
pub struct ResourceManager {
    claims: Mutex<HashMap<(ResourceKind, u16), String>>,
}

impl ResourceManager {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            claims: Mutex::new(HashMap::new()),
        }
    }

    /// Claim a resource for `owner`.
    ///
    /// Re-claiming a resource the same owner already holds is an idempotent
    /// no-op.
    ///
    /// # Errors
    /// Returns [`CoreError::ResourceBusy`] if a different instance holds the
    /// claim.
    pub fn lock(&self, kind: ResourceKind, id: u16, owner: &str) -> Result<(), CoreError> {
        let mut claims = self.claims.lock();
        match claims.get(&(kind, id)) {
            Some(held_by) if held_by == owner => {
                debug!("'{owner}' re-claimed {kind}:{id} (no-op)");
                Ok(())
            }
            Some(held_by) => Err(CoreError::ResourceBusy {
                kind,
                id,
                held_by: held_by.clone(),
            }),
            None => {
                claims.insert((kind, id), owner.to_string());
                info!("resource {kind}:{id} claimed by '{owner}'");
                Ok(())
            }
        }
    }

    /// Release a resource held by `owner`.
    ///
    /// # Errors
    /// Returns [`CoreError::NotOwner`] if the caller does not hold the
    /// claim; the ledger is left unchanged.
    pub fn release(&self, kind: ResourceKind, id: u16, owner: &str) -> Result<(), CoreError> {
        let mut claims = self.claims.lock();
        match claims.get(&(kind, id)) {
            Some(held_by) if held_by == owner => {
                claims.remove(&(kind, id));
                info!("resource {kind}:{id} released by '{owner}'");
                Ok(())
            }
            _ => Err(CoreError::NotOwner {
                kind,
                id,
                caller: owner.to_string(),
            }),
        }
    }

    /// Current owner of a resource, or `None` if unclaimed.
    pub fn owner_of(&self, kind: ResourceKind, id: u16) -> Option<String> {
        self.claims.lock().get(&(kind, id)).cloned()
    }

    /// Whether the resource is currently claimed.
    pub fn is_locked(&self, kind: ResourceKind, id: u16) -> bool {
        self.claims.lock().contains_key(&(kind, id))
    }

    /// Release every claim held by `owner`. Returns the number removed.
    ///
    /// Used by the orchestrator after `deinit()` so a disabled instance
    /// cannot leave stale claims behind.
    pub fn release_all(&self, owner: &str) -> usize {
        let mut claims = self.claims.lock();
        let before = claims.len();
        claims.retain(|_, held_by| held_by != owner);
        let removed = before - claims.len();
        if removed > 0 {
            warn!("swept {removed} stale resource claim(s) held by '{owner}'");
        }
        removed
    }

    /// Number of active claims across all kinds.
    pub fn claim_count(&self) -> usize {
        self.claims.lock().len()
    }
}
