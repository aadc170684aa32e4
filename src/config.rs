//! Device configuration
//!
//! Devices are described in a JSON file:
//!
//! ```json
//! {
//!   "devices": [
//!     { "name": "rack", "host": "192.168.1.50", "port": 5000, "inputs": 8, "outputs": 8 }
//!   ]
//! }
//! ```
//!
//! Everything except `host` is optional.

use crate::error::{Error, Result};
use crate::{DEFAULT_INPUTS, DEFAULT_OUTPUTS, DEFAULT_PORT, MANUFACTURER, MAX_PORTS, MODEL};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One matrix switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Friendly name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Host name or address
    pub host: String,

    /// TCP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of inputs
    #[serde(default = "default_inputs")]
    pub inputs: u32,

    /// Number of outputs
    #[serde(default = "default_outputs")]
    pub outputs: u32,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_inputs() -> u32 {
    DEFAULT_INPUTS
}

fn default_outputs() -> u32 {
    DEFAULT_OUTPUTS
}

impl MatrixConfig {
    /// Config for `host` with default port and port counts
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            name: None,
            host: host.into(),
            port: DEFAULT_PORT,
            inputs: DEFAULT_INPUTS,
            outputs: DEFAULT_OUTPUTS,
        }
    }

    /// Identifier used to detect the same device configured twice
    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.host, self.port)
    }

    /// Display title for the device
    pub fn title(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.host),
            None => format!("J-Tech Matrix ({})", self.host),
        }
    }

    /// Address of the device's web interface
    pub fn configuration_url(&self) -> String {
        if self.host.contains(':') {
            format!("http://[{}]", self.host)
        } else {
            format!("http://{}", self.host)
        }
    }

    /// Metadata describing the device all outputs belong to
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifier: self.unique_id(),
            name: self.title(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
            configuration_url: self.configuration_url(),
        }
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config(format!(
                "{}: port must be between 1 and 65535",
                self.host
            )));
        }
        check_count(&self.host, "inputs", self.inputs)?;
        check_count(&self.host, "outputs", self.outputs)?;
        Ok(())
    }
}

/// Device metadata shared by every output of one matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Stable identifier, see [`MatrixConfig::unique_id`]
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub configuration_url: String,
}

fn check_count(host: &str, what: &str, value: u32) -> Result<()> {
    if !(1..=MAX_PORTS).contains(&value) {
        return Err(Error::Config(format!(
            "{}: {} must be between 1 and {}, got {}",
            host, what, MAX_PORTS, value
        )));
    }
    Ok(())
}

/// Set of configured matrix switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Configured devices
    #[serde(default)]
    pub devices: Vec<MatrixConfig>,
}

impl Config {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    ///
    /// A file that cannot be read is reported as [`Error::IO`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Validate every device and reject duplicates
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for device in &self.devices {
            device.validate()?;
            if !seen.insert(device.unique_id()) {
                return Err(Error::Config(format!(
                    "{}:{} is configured more than once",
                    device.host, device.port
                )));
            }
        }
        Ok(())
    }

    /// Find a device by name or host
    pub fn find(&self, selector: &str) -> Option<&MatrixConfig> {
        self.devices
            .iter()
            .find(|d| d.name.as_deref() == Some(selector))
            .or_else(|| self.devices.iter().find(|d| d.host == selector))
    }
}
