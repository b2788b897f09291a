/// Application settings schema and defaults.
///
/// These are the settings of the console program itself (where the backend
/// lives, where state is kept, whether to log), as opposed to the per-session
/// [`Configuration`](crate::session::config::Configuration) the user edits
/// from inside the console.
///
/// Sections: `[backend]`, `[storage]`, `[logging]`. Every field has a
/// built-in default; files only need the keys they change.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Default connect timeout for backend requests (milliseconds).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub backend: BackendSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL serving `/api/command` and `/api/ports`.
    pub url: String,
    /// How long to wait for the TCP connection. Command round trips
    /// themselves are not bounded client-side.
    pub connect_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// [storage]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding `config.json`, `history.json` and the logs.
    /// Empty means `~/.meshconsole/`.
    pub dir: String,
}

impl StorageSettings {
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        let dir = self.dir.trim();
        if dir.is_empty() {
            return crate::storage::default_dir();
        }
        if let Some(rest) = dir.strip_prefix("~/") {
            return dirs::home_dir().map(|home| home.join(rest));
        }
        Some(PathBuf::from(dir))
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Write `console.log` and `events.jsonl` into the storage directory.
    pub enabled: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ConsoleSettings {
    /// Annotated default settings file, written by `settings init`.
    pub fn default_toml() -> &'static str {
        r#"# meshconsole settings
#
# Precedence (lowest to highest): built-in defaults, this file,
# .meshconsole.toml in the working directory, MESHCONSOLE_* env vars.

[backend]
# Base URL of the device-control API.
url = "http://127.0.0.1:5000"
# TCP connect timeout in milliseconds.
connect_timeout_ms = 5000

[storage]
# Where session config, history and logs are kept. Empty = ~/.meshconsole
dir = ""

[logging]
enabled = true
"#
    }
}
