//! Wire types for the backend's device-control API.
//!
//! - `POST /api/command` takes a [`CommandRequest`] and answers with a
//!   [`CommandReply`] on success, or a non-2xx status with an [`ErrorBody`].
//! - `GET /api/ports` answers with a [`PortsReply`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::session::config::Configuration;

/// Request body for `POST /api/command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRequest {
    pub command: String,
    pub port: String,
    pub channel: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

impl CommandRequest {
    /// Build the request for `command` under the active configuration.
    pub fn new(command: &str, config: &Configuration) -> Self {
        Self {
            command: command.trim().to_string(),
            port: config.port.trim().to_string(),
            channel: config.channel,
            timeout: Some(config.timeout_seconds),
        }
    }
}

/// Success body from `POST /api/command`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandReply {
    /// Whether the device produced any output. Accepts any JSON value and
    /// applies the usual truthiness rules, since some backends send `1`/`0`.
    #[serde(default, deserialize_with = "truthy")]
    pub received: bool,
    #[serde(default)]
    pub output: Option<String>,
    /// Round-trip time in seconds as measured by the backend.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub raw: Option<Vec<String>>,
}

/// Error body sent with a non-2xx status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `GET /api/ports`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortsReply {
    #[serde(default)]
    pub ports: Vec<String>,
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}
