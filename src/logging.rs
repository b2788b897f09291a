//! Best-effort diagnostic logging.
//!
//! Two append-only files live next to the persisted session state:
//!
//! - `console.log`: one plain-text line per diagnostic event
//!   (`<rfc3339> <LEVEL> <message>`), used for storage corruption, port
//!   enumeration failures and backend errors that are never surfaced as
//!   blocking errors.
//! - `events.jsonl`: one JSON object per resolved submission, for later
//!   inspection of what was sent and how it ended.
//!
//! Nothing is written until [`init`] has been called with logging enabled,
//! and every failure here is swallowed: logging must never fail a command.

use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::Utc;
use serde::Serialize;

static TARGET: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Enable logging into `dir`. Later calls are ignored.
pub fn init(enabled: bool, dir: Option<PathBuf>) {
    let _ = TARGET.set(if enabled { dir } else { None });
}

fn log_dir() -> Option<&'static PathBuf> {
    TARGET.get()?.as_ref()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

pub fn info(message: &str) {
    log(Level::Info, message);
}

pub fn warn(message: &str) {
    log(Level::Warn, message);
}

pub fn error(message: &str) {
    log(Level::Error, message);
}

pub fn log(level: Level, message: &str) {
    let Some(dir) = log_dir() else {
        return;
    };
    let _ = append_line(dir.join("console.log"), &format_line(level, message));
}

fn format_line(level: Level, message: &str) -> String {
    let flat = message.replace(['\r', '\n'], " ");
    format!("{} {} {}", Utc::now().to_rfc3339(), level, flat)
}

// ---------------------------------------------------------------------------
// Submission events
// ---------------------------------------------------------------------------

/// One resolved submission, written to `events.jsonl`.
#[derive(Debug, Serialize)]
pub struct SubmissionEvent {
    pub timestamp: String,
    pub command: String,
    /// `"local"` or `"remote"`.
    pub route: String,
    /// `"ok"`, `"warn"`, `"error"` or `"navigate"`.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmissionEvent {
    pub fn new(command: &str, route: &str, outcome: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            command: command.to_string(),
            route: route.to_string(),
            outcome: outcome.to_string(),
            duration: None,
            error: None,
        }
    }
}

pub fn log_submission(event: &SubmissionEvent) {
    let Some(dir) = log_dir() else {
        return;
    };
    let Ok(json) = serde_json::to_string(event) else {
        return;
    };
    let _ = append_line(dir.join("events.jsonl"), &json);
}

fn append_line(path: PathBuf, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
