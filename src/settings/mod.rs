/// Application settings for meshconsole.
///
/// Layered, later layers override earlier ones key by key:
///
/// 1. **Built-in defaults**: [`schema::ConsoleSettings::default()`]
/// 2. **User global settings**: `~/.meshconsole/settings.toml`
/// 3. **Project local settings**: `.meshconsole.toml` in the current directory
/// 4. **Environment variables**: `MESHCONSOLE_*` (highest precedence)
///
/// Malformed files are ignored: a broken settings file must never keep the
/// console from starting.
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::ConsoleSettings;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load the fully resolved settings.
pub fn load() -> ConsoleSettings {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for path in [global_settings_path(), project_settings_path()] {
        if let Some(layer) = load_toml_file(path) {
            merge_values(&mut merged, layer);
        }
    }

    let mut settings: ConsoleSettings = merged.try_into().unwrap_or_default();
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Read a TOML file as an untyped value. `None` if missing or malformed.
fn load_toml_file(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    // Reject files whose values do not fit the schema.
    value.clone().try_into::<ConsoleSettings>().ok()?;
    Some(value)
}

/// Recursively merge `overlay` into `base`. Tables merge key by key; any
/// other value replaces what was there.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

fn global_settings_path() -> Option<PathBuf> {
    crate::storage::default_dir().map(|dir| dir.join("settings.toml"))
}

fn project_settings_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".meshconsole.toml"))
}

pub fn global_settings_file() -> Option<PathBuf> {
    global_settings_path()
}

pub fn project_settings_file() -> Option<PathBuf> {
    project_settings_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment overrides read through `lookup`.
///
/// Supported variables:
/// - `MESHCONSOLE_URL`: backend base URL
/// - `MESHCONSOLE_CONNECT_TIMEOUT_MS`: connect timeout
/// - `MESHCONSOLE_STORAGE_DIR`: state directory
/// - `MESHCONSOLE_LOG`: logging on/off (`1`/`true`/`yes`/`on`)
fn apply_env_overrides<F>(settings: &mut ConsoleSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("MESHCONSOLE_URL")
        && !val.is_empty()
    {
        settings.backend.url = val;
    }
    if let Some(val) = lookup("MESHCONSOLE_CONNECT_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        settings.backend.connect_timeout_ms = ms;
    }
    if let Some(val) = lookup("MESHCONSOLE_STORAGE_DIR")
        && !val.is_empty()
    {
        settings.storage.dir = val;
    }
    if let Some(val) = lookup("MESHCONSOLE_LOG") {
        settings.logging.enabled = is_truthy(&val);
    }
}

fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Init / reset / show
// ---------------------------------------------------------------------------

/// Write the annotated defaults to `~/.meshconsole/settings.toml`.
pub fn init_settings(force: bool) -> Result<PathBuf> {
    let path = global_settings_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "settings file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.meshconsole/ directory")?;
    }
    fs::write(&path, ConsoleSettings::default_toml()).context("failed to write settings file")?;

    Ok(path)
}

pub fn reset_settings() -> Result<PathBuf> {
    init_settings(true)
}

pub fn show_effective_settings() -> Result<String> {
    toml::to_string_pretty(&load()).context("failed to serialize effective settings")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
