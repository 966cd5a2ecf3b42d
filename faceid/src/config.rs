//! Sample configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `FACEID_`-prefixed environment variables. Nested keys use a double
//! underscore, e.g. `FACEID_RELAY__PORT=/dev/ttymxc2`.

use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use faceid_types::{Framing, SerialConfig, DEFAULT_CAMERA_PORT};

use crate::error::Result;
use crate::gpio;

/// Default relay board port
pub const DEFAULT_RELAY_PORT: &str = "/dev/ttymxc1";

/// Default administrator allowed to enroll new users
pub const DEFAULT_ADMIN_ID: &str = "noah";

/// Default user id of the faceprints sample
pub const DEFAULT_SAMPLE_USER: &str = "my-username";

const ENV_PREFIX: &str = "FACEID";

/// Relay board serial link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayBoardConfig {
    pub port: String,
    pub baud_rate: u32,
    pub framing: Framing,

    /// Maximum age of a partial command, in milliseconds
    pub poll_window_ms: u64,
}

impl RelayBoardConfig {
    pub fn poll_window(&self) -> Duration {
        Duration::from_millis(self.poll_window_ms)
    }
}

impl Default for RelayBoardConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_RELAY_PORT.to_string(),
            baud_rate: faceid_transport::serial::DEFAULT_BAUD_RATE,
            framing: Framing::EIGHT_N_ONE,
            poll_window_ms: 2000,
        }
    }
}

/// Relay GPIO line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpioConfig {
    /// GPIO bank, counting from 1
    pub chip: u32,
    pub index: u32,
}

impl GpioConfig {
    pub fn pin_number(&self) -> Option<u32> {
        gpio::pin_number(self.chip, self.index)
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self { chip: 1, index: 6 }
    }
}

/// Settings of the relay gate sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostModeConfig {
    pub camera: SerialConfig,
    pub relay: RelayBoardConfig,
    pub gpio: GpioConfig,
    pub admin_id: String,
}

impl Default for HostModeConfig {
    fn default() -> Self {
        Self {
            camera: SerialConfig::default(),
            relay: RelayBoardConfig::default(),
            gpio: GpioConfig::default(),
            admin_id: DEFAULT_ADMIN_ID.to_string(),
        }
    }
}

impl HostModeConfig {
    /// Load from `faceid.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from_file("faceid.toml")
    }

    /// Load from `path` (if present) and the environment
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy();
        debug!("Loading host mode configuration from {}", path);

        let config: Self = Self::defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        config.validate()?;
        info!(
            camera = %config.camera,
            relay = %config.relay.port,
            pin = ?config.gpio.pin_number(),
            "Host mode configuration loaded"
        );
        Ok(config)
    }

    /// Parse TOML on top of the defaults, ignoring the environment
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let d = Self::default();

        let builder = Config::builder()
            .set_default("camera.port", d.camera.port)?
            .set_default("relay.port", d.relay.port)?
            .set_default("relay.baud_rate", i64::from(d.relay.baud_rate))?
            .set_default("relay.framing", d.relay.framing.to_string())?
            .set_default("relay.poll_window_ms", d.relay.poll_window_ms as i64)?
            .set_default("gpio.chip", i64::from(d.gpio.chip))?
            .set_default("gpio.index", i64::from(d.gpio.index))?
            .set_default("admin_id", d.admin_id)?;

        Ok(builder)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.camera.port.is_empty() {
            return Err(invalid("camera.port must not be empty"));
        }
        if self.relay.port.is_empty() {
            return Err(invalid("relay.port must not be empty"));
        }
        if self.relay.baud_rate == 0 {
            return Err(invalid("relay.baud_rate must be greater than 0"));
        }
        if self.relay.poll_window_ms == 0 {
            return Err(invalid("relay.poll_window_ms must be greater than 0"));
        }
        if self.gpio.chip == 0 {
            return Err(invalid("gpio.chip counts from 1"));
        }
        if self.gpio.pin_number().is_none() {
            return Err(invalid("gpio.chip is too large"));
        }
        if self.admin_id.is_empty() {
            return Err(invalid("admin_id must not be empty"));
        }
        Ok(())
    }
}

/// Settings of the faceprints sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceprintsConfig {
    pub camera: SerialConfig,

    /// Id stored for the enrolled person
    pub user_id: String,
}

impl Default for FaceprintsConfig {
    fn default() -> Self {
        Self {
            camera: SerialConfig::default(),
            user_id: DEFAULT_SAMPLE_USER.to_string(),
        }
    }
}

impl FaceprintsConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_file("faceid.toml")
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy();
        debug!("Loading faceprints configuration from {}", path);

        let config: Self = Self::defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        if config.user_id.is_empty() {
            return Err(invalid("user_id must not be empty"));
        }
        Ok(config)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("camera.port", DEFAULT_CAMERA_PORT)?
            .set_default("user_id", DEFAULT_SAMPLE_USER)?)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn invalid(message: &str) -> crate::Error {
    ConfigError::Message(message.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceid_types::Parity;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = HostModeConfig::from_toml_str("").unwrap();
        assert_eq!(config, HostModeConfig::default());
        assert_eq!(config.relay.port, "/dev/ttymxc1");
        assert_eq!(config.relay.baud_rate, 115_200);
        assert_eq!(config.relay.poll_window(), Duration::from_secs(2));
        assert_eq!(config.gpio.pin_number(), Some(6));
        assert_eq!(config.camera.port, DEFAULT_CAMERA_PORT);
    }

    #[test]
    fn test_toml_overrides() {
        let config = HostModeConfig::from_toml_str(
            r#"
            admin_id = "root"

            [camera]
            port = "/dev/ttyACM1"

            [relay]
            baud_rate = 9600
            framing = "7E2"

            [gpio]
            chip = 2
            index = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.admin_id, "root");
        assert_eq!(config.camera.port, "/dev/ttyACM1");
        assert_eq!(config.relay.port, DEFAULT_RELAY_PORT);
        assert_eq!(config.relay.baud_rate, 9600);
        assert_eq!(config.relay.framing.parity, Parity::Even);
        assert_eq!(config.relay.framing.stop_bits, 2);
        assert_eq!(config.gpio.pin_number(), Some(35));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(HostModeConfig::from_toml_str("admin_id = \"\"").is_err());
        assert!(HostModeConfig::from_toml_str("[gpio]\nchip = 0").is_err());
        assert!(HostModeConfig::from_toml_str("[gpio]\nchip = 4294967295").is_err());
        assert!(HostModeConfig::from_toml_str("[relay]\npoll_window_ms = 0").is_err());
        assert!(HostModeConfig::from_toml_str("[relay]\nframing = \"9X1\"").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = FaceprintsConfig::load_from_file("/nonexistent/faceid-sample").unwrap();
        assert_eq!(config.user_id, DEFAULT_SAMPLE_USER);
    }

    #[test]
    fn test_faceprints_config() {
        let config = FaceprintsConfig::from_toml_str("user_id = \"alice\"").unwrap();
        assert_eq!(
            config,
            FaceprintsConfig {
                camera: SerialConfig::default(),
                user_id: "alice".into(),
            }
        );
    }
}
