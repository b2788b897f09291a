//! Remote command dispatch.
//!
//! Sends a non-local command to the backend once and turns whatever came
//! back (reply, HTTP error, garbage, or no connection at all) into a
//! [`Resolution`]: the terminal block state plus every piece of text the
//! console shows for it. Resolution is a pure function of the round-trip
//! result so the lifecycle can be tested without a network.

pub mod backend;
pub mod protocol;

use std::fmt;

pub use backend::{Backend, HttpBackend};
pub use protocol::{CommandReply, CommandRequest};

use crate::console::state::BlockState;
use crate::logging;

/// Placeholder response text when the device returned no output.
pub const NO_OUTPUT_PLACEHOLDER: &str = "<no output>";

/// Generic failure text, used as meta text on every failure and as the
/// message when nothing more specific is available.
pub const REQUEST_FAILED: &str = "Request failed";

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Why a round trip did not produce a usable reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// The request never completed: connection refused, reset, DNS, ...
    Transport(String),
    /// Non-2xx status. `message` is the server's `error` field, if any.
    Protocol { status: u16, message: Option<String> },
    /// 2xx status but the body was not a well-formed reply.
    Malformed(String),
}

impl RequestFailure {
    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(message) if !message.is_empty() => message.clone(),
            Self::Protocol {
                message: Some(message),
                ..
            } => message.clone(),
            _ => REQUEST_FAILED.to_string(),
        }
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport failure: {message}"),
            Self::Protocol {
                status,
                message: Some(message),
            } => write!(f, "HTTP {status}: {message}"),
            Self::Protocol {
                status,
                message: None,
            } => write!(f, "HTTP {status}"),
            Self::Malformed(detail) => write!(f, "malformed response: {detail}"),
        }
    }
}

impl std::error::Error for RequestFailure {}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Everything the console needs to finalize one remote submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// `Ok`, `Warn` or `Error`; never `Pending`.
    pub state: BlockState,
    pub response_text: String,
    pub meta_text: String,
    /// Text for the global status line.
    pub status_text: String,
    /// Messages for the raw panel.
    pub raw: Vec<String>,
}

impl Resolution {
    /// Output to persist in history. Failed attempts store none.
    pub fn history_output(&self) -> String {
        if self.state == BlockState::Error {
            String::new()
        } else {
            self.response_text.clone()
        }
    }
}

/// Map a round-trip result onto the terminal block state and its texts.
pub fn resolve(result: &Result<CommandReply, RequestFailure>) -> Resolution {
    match result {
        Ok(reply) => {
            let response_text = reply
                .output
                .as_deref()
                .filter(|o| !o.is_empty())
                .unwrap_or(NO_OUTPUT_PLACEHOLDER)
                .to_string();
            let (state, meta_text) = if reply.received {
                (BlockState::Ok, done_text(reply.duration))
            } else {
                (BlockState::Warn, "No output".to_string())
            };
            Resolution {
                state,
                response_text,
                status_text: meta_text.clone(),
                meta_text,
                raw: reply.raw.clone().unwrap_or_default(),
            }
        }
        Err(failure) => {
            let message = failure.user_message();
            Resolution {
                state: BlockState::Error,
                response_text: message.clone(),
                meta_text: REQUEST_FAILED.to_string(),
                status_text: message,
                raw: Vec::new(),
            }
        }
    }
}

fn done_text(duration: Option<f64>) -> String {
    match duration {
        Some(seconds) => format!("Done in {seconds}s"),
        None => "Done".to_string(),
    }
}

/// Send one request and log the failure, if any. Never retries.
pub fn dispatch<B: Backend>(
    backend: &B,
    request: &CommandRequest,
) -> Result<CommandReply, RequestFailure> {
    let result = backend.send_command(request);
    if let Err(failure) = &result {
        logging::error(&format!("command '{}' failed: {failure}", request.command));
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
