//! Session configuration: which device port, channel and timeout every remote
//! command is sent with.
//!
//! Persisted as a single JSON document under [`CONFIG_KEY`]:
//!
//! ```json
//! { "port": "", "channel": 1, "timeoutSeconds": 180 }
//! ```
//!
//! An empty port means "let the backend auto-select".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logging;
use crate::storage::{CONFIG_KEY, Storage};

pub const DEFAULT_CHANNEL: u32 = 1;
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 180;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub port: String,
    pub channel: u32,
    pub timeout_seconds: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            port: String::new(),
            channel: DEFAULT_CHANNEL,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl Configuration {
    /// Port as shown to the user: the device path, or `Auto` when empty.
    pub fn port_label(&self) -> &str {
        if self.port.is_empty() { "Auto" } else { &self.port }
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel < 1 {
            anyhow::bail!("channel must be at least 1");
        }
        if self.timeout_seconds < 1 {
            anyhow::bail!("timeout must be at least 1 second");
        }
        Ok(())
    }

    /// Return a copy with one field replaced, parsing `raw` for the field's type.
    ///
    /// Accepted keys: `port`, `channel`, `timeout` (alias `timeoutSeconds`).
    pub fn with_value(&self, key: &str, raw: &str) -> Result<Self> {
        let mut next = self.clone();
        let raw = raw.trim();
        match key {
            "port" => next.port = raw.to_string(),
            "channel" => {
                next.channel = raw
                    .parse()
                    .with_context(|| format!("expected integer for 'channel', got '{raw}'"))?;
            }
            "timeout" | "timeoutSeconds" | "timeout_seconds" => {
                next.timeout_seconds = raw
                    .parse()
                    .with_context(|| format!("expected integer for 'timeout', got '{raw}'"))?;
            }
            _ => anyhow::bail!("unknown config key '{key}' (expected port, channel or timeout)"),
        }
        next.validate()?;
        Ok(next)
    }

    /// Overlay whatever valid fields a persisted document carries onto the
    /// defaults. Invalid or missing fields keep their default value.
    fn merge_over_defaults(value: &Value) -> Self {
        let mut config = Self::default();
        if let Some(port) = value.get("port").and_then(Value::as_str) {
            config.port = port.to_string();
        }
        if let Some(channel) = positive_u32(value.get("channel")) {
            config.channel = channel;
        }
        if let Some(timeout) = positive_u32(value.get("timeoutSeconds")) {
            config.timeout_seconds = timeout;
        }
        config
    }
}

fn positive_u32(value: Option<&Value>) -> Option<u32> {
    let n = value?.as_u64()?;
    u32::try_from(n).ok().filter(|n| *n >= 1)
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Load/save/reset contract over a [`Storage`].
#[derive(Debug)]
pub struct ConfigStore<S> {
    storage: S,
}

impl<S: Storage> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Persisted values merged over the defaults. Never fails: corrupt
    /// storage is logged and replaced by defaults. When nothing is
    /// persisted yet, the defaults are written.
    pub fn load(&self) -> Configuration {
        let Some(raw) = self.storage.read(CONFIG_KEY) else {
            let config = Configuration::default();
            if let Err(e) = self.write(&config) {
                logging::warn(&format!("could not create default config: {e:#}"));
            }
            return config;
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) if value.is_object() => Configuration::merge_over_defaults(&value),
            Ok(_) => {
                logging::warn("persisted config is not a JSON object, using defaults");
                Configuration::default()
            }
            Err(e) => {
                logging::warn(&format!("persisted config is corrupt, using defaults: {e}"));
                Configuration::default()
            }
        }
    }

    /// Overwrite the persisted configuration in full.
    pub fn save(&self, config: &Configuration) -> Result<()> {
        config.validate()?;
        self.write(config)
    }

    /// Write and return the default configuration.
    pub fn reset(&self) -> Result<Configuration> {
        let config = Configuration::default();
        self.write(&config)?;
        Ok(config)
    }

    fn write(&self, config: &Configuration) -> Result<()> {
        let json = serde_json::to_string(config).context("failed to serialize config")?;
        self.storage.write(CONFIG_KEY, &json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
