//! OLED status display.
//!
//! Resolves an I2C bus host service at init, then renders connectivity
//! changes as they arrive on the bus. Must run at a higher level than the
//! bus host so the service exists by the time `init()` resolves it.

use crate::modules::i2c_host::I2cHostApi;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use trellis_core::prelude::*;

fn default_address() -> u8 {
    0x3c
}

#[derive(Debug, Deserialize)]
struct Settings {
    instance_name: String,
    /// Service name of the bus host to render through.
    bus_service: String,
    /// Display controller address on the bus.
    #[serde(default = "default_address")]
    address: u8,
}

pub struct OledDisplay {
    settings: Settings,
    bus: Option<Arc<I2cHostApi>>,
}

/// Factory entry point for the `oled_display` type tag.
pub fn construct(config: &toml::Table) -> Result<Box<dyn Module>, CoreError> {
    let settings: Settings = parse_config(config)?;
    Ok(Box::new(OledDisplay { settings, bus: None }))
}

impl OledDisplay {
    fn render(&self, line: &str) {
        let Some(bus) = &self.bus else { return };
        if let Err(e) = bus.write(self.settings.address, line.as_bytes()) {
            warn!("[{}] render failed: {e}", self.settings.instance_name);
        }
    }
}

impl Module for OledDisplay {
    fn init(&mut self, ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        self.bus = Some(ctx.resolve_as::<I2cHostApi>(&self.settings.bus_service)?);
        Ok(())
    }

    fn start(&mut self, ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        ctx.subscribe(EVENT_SYSTEM_START_COMPLETE)?;
        ctx.subscribe(EVENT_CONNECTIVITY_ESTABLISHED)?;
        ctx.subscribe(EVENT_CONNECTIVITY_LOST)?;
        self.render("booting");
        Ok(())
    }

    fn handle_event(&mut self, _ctx: &ModuleContext<'_>, event: &str, data: &EventEnvelope) {
        match event {
            EVENT_SYSTEM_START_COMPLETE => self.render("system up"),
            EVENT_CONNECTIVITY_ESTABLISHED => {
                let interface = data
                    .payload::<ConnectivityPayload>()
                    .map(|p| p.interface.as_str())
                    .unwrap_or("?");
                self.render(&format!("online: {interface}"));
            }
            EVENT_CONNECTIVITY_LOST => self.render("offline"),
            _ => {}
        }
    }

    fn deinit(&mut self, ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        self.render("shutting down");
        ctx.unsubscribe(EVENT_SYSTEM_START_COMPLETE);
        ctx.unsubscribe(EVENT_CONNECTIVITY_ESTABLISHED);
        ctx.unsubscribe(EVENT_CONNECTIVITY_LOST);
        self.bus = None;
        info!("[{}] stopped", self.settings.instance_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_requires_bus_service() {
        let config: toml::Table = toml::from_str("instance_name = \"display0\"").unwrap();
        assert!(matches!(
            construct(&config),
            Err(CoreError::ConfigInvalid(_))
        ));

        let config: toml::Table =
            toml::from_str("instance_name = \"display0\"\nbus_service = \"i2c0\"").unwrap();
        assert!(construct(&config).is_ok());
    }
}
