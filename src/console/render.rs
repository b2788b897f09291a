//! Terminal rendering of the console view.
//!
//! Every function returns a `String` so the REPL, the one-shot `send`
//! command and tests can share them.

use colored::{ColoredString, Colorize};

use super::state::{BlockState, RawPanel, StatusLine, StatusVariant, TranscriptBlock};

/// Render one transcript block: header line with the command, the response
/// body indented, and the meta text.
pub fn render_block(block: &TranscriptBlock) -> String {
    let marker = match block.state() {
        BlockState::Pending => "…".dimmed(),
        BlockState::Ok => "✓".green().bold(),
        BlockState::Warn => "!".yellow().bold(),
        BlockState::Error => "✗".red().bold(),
    };
    let prefix = if block.replayed { "↺ " } else { "" };

    let mut out = format!("{marker} {prefix}{}\n", block.command.bold());
    for line in block.response_text.lines() {
        out.push_str(&format!("    {line}\n"));
    }
    if !block.meta_text.is_empty() {
        out.push_str(&format!("    {}\n", colorize_meta(block.state(), &block.meta_text)));
    }
    out
}

pub fn render_status(status: &StatusLine) -> String {
    let text = status.text.as_str();
    let styled = match status.variant {
        StatusVariant::Idle => text.normal(),
        StatusVariant::Busy => text.cyan(),
        StatusVariant::Ok => text.green(),
        StatusVariant::Warn => text.yellow(),
        StatusVariant::Error => text.red(),
    };
    format!("{} {}", "Status:".bold(), styled)
}

pub fn render_raw(raw: &RawPanel) -> String {
    let mut out = format!("{}\n", "Raw messages".bold().cyan());
    for line in raw.lines() {
        out.push_str(&format!("  {}\n", line.dimmed()));
    }
    out
}

fn colorize_meta(state: BlockState, meta: &str) -> ColoredString {
    match state {
        BlockState::Pending => meta.dimmed(),
        BlockState::Ok => meta.dimmed(),
        BlockState::Warn => meta.yellow(),
        BlockState::Error => meta.red(),
    }
}
