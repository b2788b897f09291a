//! Transport to the device-control backend.
//!
//! [`HttpBackend`] talks to the real API with the blocking `ureq` client.
//! The dispatcher and the port selector only see the [`Backend`] trait, so
//! tests can substitute a scripted backend.

use std::time::Duration;

use anyhow::{Context, Result};

use super::RequestFailure;
use super::protocol::{CommandReply, CommandRequest, ErrorBody, PortsReply};
use crate::settings::schema::BackendSettings;

pub trait Backend {
    /// One round trip for one command. No retries.
    fn send_command(&self, request: &CommandRequest) -> Result<CommandReply, RequestFailure>;

    /// Device ports the backend can see, in the backend's order.
    fn list_ports(&self) -> Result<Vec<String>>;
}

impl<T: Backend + ?Sized> Backend for &T {
    fn send_command(&self, request: &CommandRequest) -> Result<CommandReply, RequestFailure> {
        (**self).send_command(request)
    }

    fn list_ports(&self) -> Result<Vec<String>> {
        (**self).list_ports()
    }
}

/// Synchronous HTTP client for the backend API.
///
/// Only the connect phase is bounded. The configured command timeout is
/// advisory and enforced by the backend, so a slow device keeps the request
/// open for as long as the backend does.
#[derive(Debug)]
pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn from_settings(settings: &BackendSettings) -> Self {
        Self::new(
            &settings.url,
            Duration::from_millis(settings.connect_timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        // "localhost" may resolve to ::1 first while the backend only binds IPv4.
        format!("{}{path}", self.base_url).replace("://localhost", "://127.0.0.1")
    }
}

impl Backend for HttpBackend {
    fn send_command(&self, request: &CommandRequest) -> Result<CommandReply, RequestFailure> {
        let url = self.endpoint("/api/command");
        match self.agent.post(&url).send_json(request) {
            Ok(response) => {
                let body = response
                    .into_string()
                    .map_err(|e| RequestFailure::Transport(e.to_string()))?;
                parse_reply(&body)
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(protocol_failure(status, &body))
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(RequestFailure::Transport(transport.to_string()))
            }
        }
    }

    fn list_ports(&self) -> Result<Vec<String>> {
        let url = self.endpoint("/api/ports");
        let reply: PortsReply = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("port enumeration request to {url} failed"))?
            .into_json()
            .context("failed to parse port enumeration response")?;
        Ok(reply.ports)
    }
}

/// Parse a 2xx body. Anything that is not a well-formed reply is malformed.
pub fn parse_reply(body: &str) -> Result<CommandReply, RequestFailure> {
    serde_json::from_str(body).map_err(|e| RequestFailure::Malformed(e.to_string()))
}

/// Build the failure for a non-2xx response, preferring the server's
/// `error` field.
pub fn protocol_failure(status: u16, body: &str) -> RequestFailure {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty());
    RequestFailure::Protocol { status, message }
}
