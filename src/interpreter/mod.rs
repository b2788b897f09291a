//! Commands resolved entirely on the client.
//!
//! A handful of exact, case-sensitive command names never reach the
//! backend. Everything else is [`LocalOutcome::NotLocal`] and goes to the
//! dispatcher; nothing is ever rejected for being unrecognized.

use crate::session::config::Configuration;

/// Local commands and their one-line descriptions, in help order.
pub const LOCAL_COMMANDS: &[(&str, &str)] = &[
    ("help", "show this help"),
    ("?", "same as help"),
    ("status", "show the active port, channel and timeout"),
    ("clear", "clear the transcript"),
    ("config", "open the configuration surface"),
];

/// Side effect a local command asks the console to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Truncate the live transcript.
    ClearTranscript,
    /// Leave the console for the configuration surface. Terminal: nothing
    /// is recorded for the submission.
    OpenConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOutcome {
    Handled {
        output: String,
        summary: String,
        effect: Option<SideEffect>,
    },
    NotLocal,
}

impl LocalOutcome {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }
}

/// Classify a trimmed, non-empty command.
pub fn interpret(command: &str, config: &Configuration) -> LocalOutcome {
    match command {
        "help" | "?" => LocalOutcome::Handled {
            output: help_text(),
            summary: "Help".to_string(),
            effect: None,
        },
        "status" => LocalOutcome::Handled {
            output: status_text(config),
            summary: "Status".to_string(),
            effect: None,
        },
        "clear" => LocalOutcome::Handled {
            output: String::new(),
            summary: String::new(),
            effect: Some(SideEffect::ClearTranscript),
        },
        "config" => LocalOutcome::Handled {
            output: String::new(),
            summary: String::new(),
            effect: Some(SideEffect::OpenConfig),
        },
        _ => LocalOutcome::NotLocal,
    }
}

pub fn help_text() -> String {
    let mut text = String::from("Local commands:\n");
    for (name, description) in LOCAL_COMMANDS {
        text.push_str(&format!("  {name:<8} {description}\n"));
    }
    text.push_str("Anything else is sent to the device.");
    text
}

pub fn status_text(config: &Configuration) -> String {
    format!(
        "Port: {}\nChannel: {}\nTimeout: {}s",
        config.port_label(),
        config.channel,
        config.timeout_seconds
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
