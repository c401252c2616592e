//! I2C bus host.
//!
//! Claims one I2C bus controller and publishes a shared [`I2cHostApi`] under
//! a service name, so display and sensor modules can share the bus without
//! knowing which module drives it. The transfer path here is a simulation
//! stub; a real port would sit behind the same API.

use parking_lot::Mutex;
use serde::Deserialize;
use std::any::Any;
use std::sync::{Arc, Weak};
use tracing::{debug, info};
use trellis_core::prelude::*;

/// Shared bus API resolved by consumer modules.
pub struct I2cHostApi {
    port: u16,
    transfers: Mutex<u64>,
}

impl I2cHostApi {
    /// Write `data` to the device at `addr`.
    ///
    /// # Errors
    /// Returns [`CoreError::Module`] for an out-of-range address.
    pub fn write(&self, addr: u8, data: &[u8]) -> Result<(), CoreError> {
        if addr > 0x77 {
            return Err(CoreError::Module(format!("i2c address {addr:#04x} out of range")));
        }
        *self.transfers.lock() += 1;
        debug!("i2c{}: wrote {} byte(s) to {addr:#04x}", self.port, data.len());
        Ok(())
    }

    /// Number of transfers completed since init.
    pub fn transfer_count(&self) -> u64 {
        *self.transfers.lock()
    }
}

#[derive(Debug, Deserialize)]
struct Settings {
    instance_name: String,
    /// I2C controller index to claim.
    port: u16,
    /// Service name to register; defaults to `i2c<port>`.
    #[serde(default)]
    service_name: Option<String>,
}

pub struct I2cHost {
    settings: Settings,
    api: Option<Arc<I2cHostApi>>,
    stats_job: Option<JobId>,
}

/// Factory entry point for the `i2c_host` type tag.
pub fn construct(config: &toml::Table) -> Result<Box<dyn Module>, CoreError> {
    let settings: Settings = parse_config(config)?;
    Ok(Box::new(I2cHost {
        settings,
        api: None,
        stats_job: None,
    }))
}

impl I2cHost {
    fn service_name(&self) -> String {
        self.settings
            .service_name
            .clone()
            .unwrap_or_else(|| format!("i2c{}", self.settings.port))
    }
}

impl Module for I2cHost {
    fn init(&mut self, ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        ctx.claim(ResourceKind::I2cBus, self.settings.port)?;

        let api = Arc::new(I2cHostApi {
            port: self.settings.port,
            transfers: Mutex::new(0),
        });
        let weak: Weak<I2cHostApi> = Arc::downgrade(&api);
        let handle: Weak<dyn Any + Send + Sync> = weak;
        if let Err(e) = ctx.register_service(&self.service_name(), ServiceType::BusHost, handle) {
            // Unwind the claim so a failed init leaves no trace.
            let _ = ctx.release(ResourceKind::I2cBus, self.settings.port);
            return Err(e);
        }
        self.api = Some(api);
        info!(
            "[{}] i2c{} ready as service '{}'",
            self.settings.instance_name,
            self.settings.port,
            self.service_name()
        );
        Ok(())
    }

    fn start(&mut self, ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        if let Some(api) = &self.api {
            let api = Arc::clone(api);
            let port = self.settings.port;
            let job = ctx.schedule_periodic(
                "i2c_stats",
                std::time::Duration::from_secs(10),
                move || {
                    debug!("i2c{port}: {} transfer(s) so far", api.transfer_count());
                },
            )?;
            self.stats_job = Some(job);
        }
        Ok(())
    }

    fn deinit(&mut self, ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        if let Some(job) = self.stats_job.take() {
            ctx.cancel_job(job);
        }
        if let Some(api) = self.api.take() {
            info!(
                "[{}] i2c{} stopping after {} transfer(s)",
                self.settings.instance_name,
                self.settings.port,
                api.transfer_count()
            );
        }
        ctx.unregister_service(&self.service_name())?;
        ctx.release(ResourceKind::I2cBus, self.settings.port)
    }
}
