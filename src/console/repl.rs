//! Interactive terminal loop.
//!
//! Reads one command per line and renders each block as it resolves. The
//! `config` command switches to a small configuration prompt; `back` returns
//! to the console. End of input (Ctrl+D) leaves the loop.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use super::render::{render_block, render_raw, render_status};
use super::state::{Effect, View};
use crate::dispatcher::Backend;
use crate::ports::{self, PortOption};
use crate::session::Session;
use crate::session::config::Configuration;
use crate::storage::Storage;

const PROMPT: &str = "> ";
const CONFIG_PROMPT: &str = "config> ";

pub fn run<S, B, R, W>(session: &mut Session<S, B>, mut input: R, out: &mut W) -> Result<()>
where
    S: Storage,
    B: Backend,
    R: BufRead,
    W: Write,
{
    writeln!(out, "{}", "meshconsole".bold().cyan())?;
    writeln!(out, "{}", "Type `help` for local commands. Ctrl+D to exit.".dimmed())?;
    writeln!(out, "{}", render_status(&session.state().status))?;

    while let Some(line) = read_line(&mut input, out, PROMPT)? {
        if line.trim().is_empty() {
            continue;
        }
        submit_and_render(session, &line, out)?;

        if session.state().view == View::Config {
            config_surface(session, &mut input, out)?;
            session.close_config();
        }
    }

    writeln!(out)?;
    Ok(())
}

/// Submit one line and print what changed: the pending block while the
/// backend is working, then the finalized block, raw panel and status.
pub fn submit_and_render<S, B, W>(session: &mut Session<S, B>, line: &str, out: &mut W) -> Result<()>
where
    S: Storage,
    B: Backend,
    W: Write,
{
    let before = session.state().transcript.last().map(|b| b.id);
    let mut write_err = None;
    let mut sent = false;

    session.submit_observed(line, |state, effect| {
        if let Effect::SendCommand { id, .. } = effect
            && let Some(block) = state.block(*id)
        {
            sent = true;
            let rendered = render_block(block);
            if let Err(e) = write!(out, "{rendered}").and_then(|_| out.flush()) {
                write_err = Some(e);
            }
        }
    });
    if let Some(e) = write_err {
        return Err(e).context("failed writing to terminal");
    }

    let state = session.state();
    match state.transcript.last() {
        None if before.is_some() => writeln!(out, "{}", "Transcript cleared.".dimmed())?,
        Some(block) if Some(block.id) != before => {
            write!(out, "{}", render_block(block))?;
            if sent {
                write!(out, "{}", render_raw(&state.raw))?;
            }
            writeln!(out, "{}", render_status(&state.status))?;
        }
        _ => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Configuration surface
// ---------------------------------------------------------------------------

fn config_surface<S, B, R, W>(session: &mut Session<S, B>, input: &mut R, out: &mut W) -> Result<()>
where
    S: Storage,
    B: Backend,
    R: BufRead,
    W: Write,
{
    let mut draft = session.configuration();
    let mut ports = session.fetch_ports();
    let mut options = ports::port_options(&ports);
    let mut dirty = false;

    writeln!(out, "{}", "Configuration".bold().cyan())?;
    if let Some(port) = ports::preferred_port(&ports, &draft) {
        writeln!(out, "  {} one device found: {port} (`port #1` to pin it)", "Hint:".dimmed())?;
    }
    print_config(out, &draft, &options)?;
    writeln!(
        out,
        "{}",
        "port <value|#n>, channel <n>, timeout <secs>, ports, save, reset, back".dimmed()
    )?;

    while let Some(line) = read_line(input, out, CONFIG_PROMPT)? {
        let line = line.trim();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
        match cmd {
            "" => {}
            "port" => match resolve_port_arg(arg.trim(), &options) {
                Some(port) => match draft.with_value("port", &port) {
                    Ok(next) => {
                        draft = next;
                        dirty = true;
                    }
                    Err(e) => writeln!(out, "{} {e:#}", "✗".red().bold())?,
                },
                None => writeln!(out, "{} no port option {}", "✗".red().bold(), arg.trim())?,
            },
            "channel" | "timeout" => match draft.with_value(cmd, arg) {
                Ok(next) => {
                    draft = next;
                    dirty = true;
                }
                Err(e) => writeln!(out, "{} {e:#}", "✗".red().bold())?,
            },
            "ports" => {
                ports = session.fetch_ports();
                options = ports::port_options(&ports);
                print_config(out, &draft, &options)?;
            }
            "show" => print_config(out, &draft, &options)?,
            "save" => match session.config_store().save(&draft) {
                Ok(()) => {
                    dirty = false;
                    writeln!(out, "{} Configuration saved", "✓".green().bold())?;
                }
                Err(e) => writeln!(out, "{} {e:#}", "✗".red().bold())?,
            },
            "reset" => match session.config_store().reset() {
                Ok(defaults) => {
                    draft = defaults;
                    dirty = false;
                    writeln!(out, "{} Configuration reset to defaults", "✓".green().bold())?;
                    print_config(out, &draft, &options)?;
                }
                Err(e) => writeln!(out, "{} {e:#}", "✗".red().bold())?,
            },
            "back" | "done" => break,
            other => writeln!(out, "{} unknown config command '{other}'", "✗".red().bold())?,
        }
    }

    if dirty {
        writeln!(out, "{}", "Unsaved changes discarded.".yellow())?;
    }
    Ok(())
}

/// `#n` picks option `n` as listed (`#0` is auto-select); `auto` or nothing
/// also selects auto. Anything else is taken as a literal port.
fn resolve_port_arg(arg: &str, options: &[PortOption]) -> Option<String> {
    if arg.is_empty() || arg.eq_ignore_ascii_case("auto") {
        return Some(String::new());
    }
    match arg.strip_prefix('#') {
        Some(index) => {
            let index: usize = index.parse().ok()?;
            options.get(index).map(|o| o.value.clone())
        }
        None => Some(arg.to_string()),
    }
}

fn print_config<W: Write>(out: &mut W, config: &Configuration, options: &[PortOption]) -> Result<()> {
    writeln!(out, "  {} {}", "Port:    ".bold(), config.port_label())?;
    writeln!(out, "  {} {}", "Channel: ".bold(), config.channel)?;
    writeln!(out, "  {} {}s", "Timeout: ".bold(), config.timeout_seconds)?;
    writeln!(out, "  {}", "Ports:".bold())?;
    for (i, option) in options.iter().enumerate() {
        let selected = option.value == config.port;
        let marker = if selected { "●".green() } else { "○".dimmed() };
        let note = if option.is_auto() { " (backend picks the device)" } else { "" };
        writeln!(out, "    {marker} #{i} {}{}", option.label, note.dimmed())?;
    }
    Ok(())
}

fn read_line<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush()?;
    let mut line = String::new();
    let read = input.read_line(&mut line).context("failed reading input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
