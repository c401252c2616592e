//! System configuration: module descriptors loaded from TOML.
//!
//! The supervisor loads one file describing every module instance to create
//! at boot. Each descriptor carries the type tag, orchestration attributes
//! and an opaque per-instance config table that is handed to the module's
//! constructor untouched.

use crate::error::CoreError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

fn default_level() -> u8 {
    50
}

fn default_enabled() -> bool {
    true
}

/// One module instance to create at boot.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDescriptor {
    /// Registered type tag.
    #[serde(rename = "type")]
    pub module_type: String,
    /// Init-ordering level; lower initializes first.
    #[serde(default = "default_level")]
    pub level: u8,
    /// Whether a lifecycle failure aborts boot.
    #[serde(default)]
    pub required: bool,
    /// A disabled descriptor is skipped entirely at boot.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Opaque per-instance configuration; must contain `instance_name`.
    #[serde(default)]
    pub config: toml::Table,
}

impl ModuleDescriptor {
    /// The unique instance name from the config table.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigInvalid`] if `instance_name` is missing or
    /// not a string.
    pub fn instance_name(&self) -> Result<&str, CoreError> {
        self.config
            .get("instance_name")
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                CoreError::ConfigInvalid(format!(
                    "descriptor of type '{}' has no instance_name",
                    self.module_type
                ))
            })
    }
}

/// Root of the system configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemConfig {
    /// Declared module instances, in file order.
    #[serde(default)]
    pub modules: Vec<ModuleDescriptor>,
}

impl SystemConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigInvalid`] on malformed TOML.
    pub fn from_toml(text: &str) -> Result<Self, CoreError> {
        toml::from_str(text).map_err(|e| CoreError::ConfigInvalid(e.to_string()))
    }

    /// Load a configuration file from disk.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigInvalid`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigInvalid(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }
}

/// Deserialize a module's typed settings out of its opaque config table.
///
/// # Errors
/// Returns [`CoreError::ConfigInvalid`] with the serde message on mismatch.
pub fn parse_config<T: DeserializeOwned>(table: &toml::Table) -> Result<T, CoreError> {
    T::deserialize(toml::Value::Table(table.clone()))
        .map_err(|e| CoreError::ConfigInvalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [[modules]]
        type = "i2c_host"
        level = 10
        required = true
        config = { instance_name = "i2c0", port = 0 }

        [[modules]]
        type = "oled_display"
        config = { instance_name = "display0", bus_service = "i2c0" }

        [[modules]]
        type = "debug_probe"
        enabled = false
        config = { instance_name = "probe0" }
    "#;

    #[test]
    fn parse_sample() {
        let system = SystemConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(system.modules.len(), 3);

        let host = &system.modules[0];
        assert_eq!(host.module_type, "i2c_host");
        assert_eq!(host.level, 10);
        assert!(host.required);
        assert!(host.enabled);
        assert_eq!(host.instance_name().unwrap(), "i2c0");

        // Defaults kick in where the descriptor is silent.
        let display = &system.modules[1];
        assert_eq!(display.level, 50);
        assert!(!display.required);
        assert!(display.enabled);

        assert!(!system.modules[2].enabled);
    }

    #[test]
    fn missing_instance_name() {
        let system = SystemConfig::from_toml(
            r#"
            [[modules]]
            type = "i2c_host"
            "#,
        )
        .unwrap();
        let err = system.modules[0].instance_name().unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid(_)));
    }

    #[test]
    fn malformed_toml() {
        assert!(matches!(
            SystemConfig::from_toml("[[modules]\ntype ="),
            Err(CoreError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let system = SystemConfig::load(file.path()).unwrap();
        assert_eq!(system.modules.len(), 3);

        assert!(matches!(
            SystemConfig::load(Path::new("/nonexistent/system.toml")),
            Err(CoreError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn typed_settings_from_table() {
        #[derive(Debug, Deserialize)]
        struct HostSettings {
            port: u16,
            #[serde(default)]
            frequency_hz: Option<u32>,
        }

        let system = SystemConfig::from_toml(SAMPLE).unwrap();
        let settings: HostSettings = parse_config(&system.modules[0].config).unwrap();
        assert_eq!(settings.port, 0);
        assert!(settings.frequency_hz.is_none());

        let err = parse_config::<HostSettings>(&system.modules[2].config).unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid(_)));
    }
}
