//! Built-in module set shipped with the supervisor.
//!
//! Each submodule implements one module type; `register_builtin` wires all
//! of them into a factory under their configuration type tags.

pub mod event_logger;
pub mod i2c_host;
pub mod oled_display;

use trellis_core::ModuleFactory;

/// Register every built-in module type.
pub fn register_builtin(factory: &mut ModuleFactory) {
    factory.register("event_logger", event_logger::construct);
    factory.register("i2c_host", i2c_host::construct);
    factory.register("oled_display", oled_display::construct);
}
