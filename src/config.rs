use crate::error::Result;
use crate::types::{Zone, DEFAULT_NAME, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_name")]
    pub name: String,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub zone: Zone,

    /// How long `refresh` waits for each step of the probe exchange
    #[serde(default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_refresh_timeout_secs() -> u64 {
    2
}

impl DeviceConfig {
    /// Settings for `host` with every other field defaulted
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            host: host.into(),
            port: default_port(),
            zone: Zone::default(),
            refresh_timeout_secs: default_refresh_timeout_secs(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    /// Whole seconds only, and never less than one
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
