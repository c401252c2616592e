//! Wildcard event logger.
//!
//! Subscribes to `"*"` and logs every event on the bus, with a running
//! count. Useful as a first module in a new configuration: if the logger
//! is silent, nothing is publishing.

use serde::Deserialize;
use tracing::info;
use trellis_core::prelude::*;

#[derive(Debug, Deserialize)]
struct Settings {
    instance_name: String,
    /// Log payload presence alongside the event name.
    #[serde(default)]
    log_payloads: bool,
}

pub struct EventLogger {
    settings: Settings,
    seen: u64,
}

/// Factory entry point for the `event_logger` type tag.
pub fn construct(config: &toml::Table) -> Result<Box<dyn Module>, CoreError> {
    let settings: Settings = parse_config(config)?;
    Ok(Box::new(EventLogger { settings, seen: 0 }))
}

impl Module for EventLogger {
    fn init(&mut self, ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        ctx.subscribe(EVENT_WILDCARD)
    }

    fn handle_event(&mut self, _ctx: &ModuleContext<'_>, event: &str, data: &EventEnvelope) {
        self.seen += 1;
        if self.settings.log_payloads {
            info!(
                "[{}] #{} {event} (payload: {})",
                self.settings.instance_name, self.seen, data.has_payload()
            );
        } else {
            info!("[{}] #{} {event}", self.settings.instance_name, self.seen);
        }
    }

    fn deinit(&mut self, ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        ctx.unsubscribe(EVENT_WILDCARD);
        info!("[{}] saw {} event(s)", self.settings.instance_name, self.seen);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_with_defaults() {
        let config: toml::Table = toml::from_str("instance_name = \"log0\"").unwrap();
        assert!(construct(&config).is_ok());
    }

    #[test]
    fn construct_requires_instance_name() {
        let config = toml::Table::new();
        assert!(matches!(
            construct(&config),
            Err(CoreError::ConfigInvalid(_))
        ));
    }
}
