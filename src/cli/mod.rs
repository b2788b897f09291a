//! CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `meshconsole console`: interactive session (default)
//! - `meshconsole send "command"`: one command, rendered, then exit
//! - `meshconsole history [--replay N]`: list or replay stored history
//! - `meshconsole config show|set|reset`: session configuration
//! - `meshconsole ports`: device ports the backend can see
//! - `meshconsole settings show|init|reset`: application settings
//! - `meshconsole health`: settings, storage and backend reachability

use std::io::{self, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::console::render::{render_block, render_raw, render_status};
use crate::console::repl;
use crate::dispatcher::{Backend, HttpBackend};
use crate::logging;
use crate::ports;
use crate::session::Session;
use crate::session::history::HistoryEntry;
use crate::settings::{self, ConsoleSettings};
use crate::storage::FileStorage;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// Session wiring
// ---------------------------------------------------------------------------

fn open_storage(settings: &ConsoleSettings) -> Result<FileStorage> {
    let dir = settings
        .storage
        .resolved_dir()
        .context("could not determine storage directory (no home directory?)")?;
    logging::init(settings.logging.enabled, Some(dir.clone()));
    Ok(FileStorage::new(dir))
}

fn open_session(settings: &ConsoleSettings) -> Result<Session<FileStorage, HttpBackend>> {
    let storage = open_storage(settings)?;
    let backend = HttpBackend::from_settings(&settings.backend);
    logging::info(&format!("session opened against {}", backend.base_url()));
    Ok(Session::new(storage, backend))
}

// ---------------------------------------------------------------------------
// meshconsole console
// ---------------------------------------------------------------------------

pub fn run_console(settings: &ConsoleSettings) -> Result<()> {
    let mut session = open_session(settings)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    repl::run(&mut session, stdin.lock(), &mut stdout)
}

// ---------------------------------------------------------------------------
// meshconsole send
// ---------------------------------------------------------------------------

/// Submit one command through the same pipeline as the console and print
/// the resolved block. `config` has no surface here and is rejected.
pub fn run_send(settings: &ConsoleSettings, command: &str) -> Result<()> {
    if command.trim() == "config" {
        anyhow::bail!("`config` opens the interactive surface; use `meshconsole config` instead");
    }
    let mut session = open_session(settings)?;
    let mut stdout = io::stdout();
    repl::submit_and_render(&mut session, command, &mut stdout)
}

// ---------------------------------------------------------------------------
// meshconsole history
// ---------------------------------------------------------------------------

pub fn run_history(
    settings: &ConsoleSettings,
    format: OutputFormat,
    replay: Option<usize>,
) -> Result<()> {
    let mut session = open_session(settings)?;

    if let Some(index) = replay {
        if !session.replay(index) {
            anyhow::bail!("no history entry at index {index}");
        }
        let state = session.state();
        if let Some(block) = state.transcript.last() {
            print!("{}", render_block(block));
        }
        print!("{}", render_raw(&state.raw));
        return Ok(());
    }

    let entries = session.history_store().load();
    if entries.is_empty() {
        println!("{}", "No history yet. Send a command to start one.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&entries).context("failed to serialize history")?
            );
        }
        OutputFormat::Table => print_history_table(&entries),
    }
    Ok(())
}

fn print_history_table(entries: &[HistoryEntry]) {
    println!("{}", "Command History (newest first)".bold().cyan());
    println!("{}", "=".repeat(60));
    println!("  {:>3}  {:<20} Summary", "#", "Command");
    println!("  {}", "-".repeat(58));

    for (i, entry) in entries.iter().enumerate() {
        let line = format!(
            "  {:>3}  {:<20} {}",
            i,
            truncate(&entry.command, 20),
            entry.summary
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    println!();
    println!(
        "  {}",
        "Replay an entry with `meshconsole history --replay <#>`.".dimmed()
    );
}

// ---------------------------------------------------------------------------
// meshconsole config show | set | reset
// ---------------------------------------------------------------------------

pub fn run_config_show(settings: &ConsoleSettings) -> Result<()> {
    let storage = open_storage(settings)?;
    let config = crate::session::config::ConfigStore::new(&storage).load();

    println!("{}", "Session Configuration".bold().cyan());
    println!("{}", "=".repeat(40));
    println!("  {} {}", "Port:    ".bold(), config.port_label());
    println!("  {} {}", "Channel: ".bold(), config.channel);
    println!("  {} {}s", "Timeout: ".bold(), config.timeout_seconds);
    println!();
    println!(
        "  {} {}",
        "Stored at".dimmed(),
        storage.path_for(crate::storage::CONFIG_KEY).display()
    );
    Ok(())
}

pub fn run_config_set(settings: &ConsoleSettings, key: &str, value: &str) -> Result<()> {
    let storage = open_storage(settings)?;
    let store = crate::session::config::ConfigStore::new(&storage);
    let next = store.load().with_value(key, value)?;
    store.save(&next)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

pub fn run_config_reset(settings: &ConsoleSettings) -> Result<()> {
    let storage = open_storage(settings)?;
    let config = crate::session::config::ConfigStore::new(&storage).reset()?;
    println!(
        "{} Configuration reset to defaults (port {}, channel {}, timeout {}s)",
        "✓".green().bold(),
        config.port_label(),
        config.channel,
        config.timeout_seconds
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// meshconsole ports
// ---------------------------------------------------------------------------

pub fn run_ports(settings: &ConsoleSettings, format: OutputFormat) -> Result<()> {
    let session = open_session(settings)?;
    let found = session.fetch_ports();
    let options = ports::port_options(&found);
    let current = session.configuration();

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({ "ports": found, "selected": current.port });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => {
            println!("{}", "Device Ports".bold().cyan());
            println!("{}", "=".repeat(40));
            for (i, option) in options.iter().enumerate() {
                let marker = if option.value == current.port {
                    "●".green()
                } else {
                    "○".dimmed()
                };
                println!("  {marker} #{i} {}", option.label);
            }
            if found.is_empty() {
                println!();
                println!(
                    "  {}",
                    "No devices reported. Auto-select or `meshconsole config set port <path>`."
                        .dimmed()
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// meshconsole settings show | init | reset
// ---------------------------------------------------------------------------

pub fn run_settings_show() -> Result<()> {
    let toml_str = settings::show_effective_settings()?;
    println!("{}", "Effective meshconsole Settings".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = settings::global_settings_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = settings::project_settings_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.meshconsole/settings.toml");
    print_source(project_exists, ".meshconsole.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "MESHCONSOLE_* environment variables".dimmed()
    );
    Ok(())
}

fn print_source(exists: bool, label: &str) {
    if exists {
        println!("  {} {}", "✓".green(), label.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{label} (not found)").dimmed());
    }
}

pub fn run_settings_init(force: bool) -> Result<()> {
    let path = settings::init_settings(force)?;
    println!(
        "{} Settings written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

pub fn run_settings_reset() -> Result<()> {
    let path = settings::reset_settings()?;
    println!(
        "{} Settings reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// meshconsole health
// ---------------------------------------------------------------------------

pub fn run_health(settings: &ConsoleSettings) -> Result<()> {
    println!("{}", "meshconsole Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = settings::global_settings_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Settings file",
        global_exists,
        if global_exists {
            "~/.meshconsole/settings.toml found"
        } else {
            "not found (run `meshconsole settings init` to create)"
        },
    );

    let session = open_session(settings)?;
    let dir = settings
        .storage
        .resolved_dir()
        .map(|d| d.display().to_string())
        .unwrap_or_default();
    print_health_item("Storage", true, &dir);

    let config = session.configuration();
    print_health_item(
        "Session config",
        true,
        &format!(
            "port {} / channel {} / timeout {}s",
            config.port_label(),
            config.channel,
            config.timeout_seconds
        ),
    );

    let history = session.history_store().len();
    print_health_item("History", true, &format!("{history} entries"));

    let backend = session.backend();
    match backend.list_ports() {
        Ok(found) => print_health_item(
            "Backend",
            true,
            &format!("reachable at {} ({} ports)", backend.base_url(), found.len()),
        ),
        Err(e) => print_health_item(
            "Backend",
            false,
            &format!("not reachable at {}: {e}", backend.base_url()),
        ),
    }

    print_health_item(
        "Logging",
        settings.logging.enabled,
        if settings.logging.enabled {
            "console.log / events.jsonl"
        } else {
            "disabled"
        },
    );

    println!();
    println!("{}", render_status(&session.state().status));
    io::stdout().flush().context("failed to flush stdout")?;
    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<16} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
