//! Console state and the submission state machine.
//!
//! [`update`] is a pure transition `(state, event) -> effects`. It never
//! touches storage or the network; the session runtime executes the
//! returned [`Effect`]s and feeds round-trip results back in as
//! [`Event::Settled`].
//!
//! Per submission: `Idle -> Submitted -> {LocalHandled | RemoteSent}`, and
//! `RemoteSent -> {Ok | Warn | Error}`. Each remote submission gets its own
//! id, carried by its transcript block and its `Settled` event, so several
//! submissions can be in flight and settle in any order.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};

use crate::dispatcher::{self, CommandReply, CommandRequest, RequestFailure};
use crate::interpreter::{self, LocalOutcome, SideEffect};
use crate::session::config::Configuration;
use crate::session::history::HistoryEntry;

/// Raw panel placeholder when there is nothing to show.
pub const NO_MESSAGES: &str = "No messages yet.";

/// Status text while a remote command is in flight.
pub const TRANSMITTING: &str = "Transmitting...";

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Pending,
    Ok,
    Warn,
    Error,
}

impl std::fmt::Display for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ok => write!(f, "ok"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One command's lifecycle in the live transcript. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptBlock {
    pub id: u64,
    pub command: String,
    pub response_text: String,
    pub meta_text: String,
    pub replayed: bool,
    state: BlockState,
}

impl TranscriptBlock {
    fn pending(id: u64, command: &str) -> Self {
        Self {
            id,
            command: command.to_string(),
            response_text: String::new(),
            meta_text: TRANSMITTING.to_string(),
            replayed: false,
            state: BlockState::Pending,
        }
    }

    fn completed(id: u64, command: &str, response_text: String, meta_text: String) -> Self {
        Self {
            id,
            command: command.to_string(),
            response_text,
            meta_text,
            replayed: false,
            state: BlockState::Ok,
        }
    }

    /// Completed block projected from a stored entry.
    pub fn replayed(id: u64, entry: &HistoryEntry) -> Self {
        Self {
            replayed: true,
            ..Self::completed(id, &entry.command, entry.output.clone(), entry.summary.clone())
        }
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == BlockState::Pending
    }

    /// Leave `Pending` for a terminal state. Only the first call has an effect.
    fn finalize(&mut self, state: BlockState, response_text: String, meta_text: String) -> bool {
        if !self.is_pending() || state == BlockState::Pending {
            return false;
        }
        self.state = state;
        self.response_text = response_text;
        self.meta_text = meta_text;
        true
    }
}

// ---------------------------------------------------------------------------
// Status line and raw panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusVariant {
    Idle,
    Busy,
    Ok,
    Warn,
    Error,
}

impl From<BlockState> for StatusVariant {
    fn from(state: BlockState) -> Self {
        match state {
            BlockState::Pending => Self::Busy,
            BlockState::Ok => Self::Ok,
            BlockState::Warn => Self::Warn,
            BlockState::Error => Self::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub variant: StatusVariant,
}

impl StatusLine {
    pub fn idle() -> Self {
        Self {
            text: "Idle".to_string(),
            variant: StatusVariant::Idle,
        }
    }

    fn busy() -> Self {
        Self {
            text: TRANSMITTING.to_string(),
            variant: StatusVariant::Busy,
        }
    }
}

/// Low-level device messages from the most recent round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPanel {
    messages: Vec<String>,
}

impl RawPanel {
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Lines to display; the placeholder when empty.
    pub fn lines(&self) -> Vec<&str> {
        if self.messages.is_empty() {
            vec![NO_MESSAGES]
        } else {
            self.messages.iter().map(String::as_str).collect()
        }
    }

    fn clear(&mut self) {
        self.messages.clear();
    }

    fn set(&mut self, messages: Vec<String>) {
        self.messages = messages;
    }
}

// ---------------------------------------------------------------------------
// State, events, effects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Console,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleState {
    pub status: StatusLine,
    pub transcript: Vec<TranscriptBlock>,
    pub raw: RawPanel,
    pub view: View,
    next_id: u64,
    /// Commands of remote submissions still waiting for their round trip.
    pending: BTreeMap<u64, String>,
}

impl Default for ConsoleState {
    fn default() -> Self {
        Self {
            status: StatusLine::idle(),
            transcript: Vec::new(),
            raw: RawPanel::default(),
            view: View::Console,
            next_id: 1,
            pending: BTreeMap::new(),
        }
    }
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, id: u64) -> Option<&TranscriptBlock> {
        self.transcript.iter().find(|b| b.id == id)
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.pending.len()
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    /// The user submitted a line. `at` is the client-local submission time.
    Submit { line: String, at: DateTime<Local> },
    /// A remote round trip finished.
    Settled {
        id: u64,
        result: Result<CommandReply, RequestFailure>,
        at: DateTime<Local>,
    },
    /// Re-render a stored entry. Never produces effects.
    Replay { entry: HistoryEntry },
    /// Leave the configuration surface.
    CloseConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SendCommand { id: u64, request: CommandRequest },
    AppendHistory(HistoryEntry),
    Navigate(View),
}

/// Apply one event and return the effects the runtime must execute.
pub fn update(state: &mut ConsoleState, event: Event, config: &Configuration) -> Vec<Effect> {
    match event {
        Event::Submit { line, at } => submit(state, &line, config, at),
        Event::Settled { id, result, at } => settle(state, id, &result, at),
        Event::Replay { entry } => {
            let id = state.allocate_id();
            state.raw.set(entry.raw.clone());
            state.transcript.push(TranscriptBlock::replayed(id, &entry));
            Vec::new()
        }
        Event::CloseConfig => {
            state.view = View::Console;
            Vec::new()
        }
    }
}

fn submit(
    state: &mut ConsoleState,
    line: &str,
    config: &Configuration,
    at: DateTime<Local>,
) -> Vec<Effect> {
    let command = line.trim();
    if command.is_empty() {
        return Vec::new();
    }

    match interpreter::interpret(command, config) {
        LocalOutcome::Handled {
            effect: Some(SideEffect::OpenConfig),
            ..
        } => {
            state.view = View::Config;
            vec![Effect::Navigate(View::Config)]
        }
        LocalOutcome::Handled {
            output,
            summary,
            effect: Some(SideEffect::ClearTranscript),
        } => {
            state.transcript.clear();
            vec![Effect::AppendHistory(HistoryEntry {
                command: command.to_string(),
                summary: summarize(&summary, at),
                output,
                raw: Vec::new(),
            })]
        }
        LocalOutcome::Handled {
            output, summary, ..
        } => {
            let id = state.allocate_id();
            state.transcript.push(TranscriptBlock::completed(
                id,
                command,
                output.clone(),
                summary.clone(),
            ));
            vec![Effect::AppendHistory(HistoryEntry {
                command: command.to_string(),
                summary: summarize(&summary, at),
                output,
                raw: Vec::new(),
            })]
        }
        LocalOutcome::NotLocal => {
            state.status = StatusLine::busy();
            state.raw.clear();
            let id = state.allocate_id();
            state.transcript.push(TranscriptBlock::pending(id, command));
            state.pending.insert(id, command.to_string());
            vec![Effect::SendCommand {
                id,
                request: CommandRequest::new(command, config),
            }]
        }
    }
}

fn settle(
    state: &mut ConsoleState,
    id: u64,
    result: &Result<CommandReply, RequestFailure>,
    at: DateTime<Local>,
) -> Vec<Effect> {
    // A submission whose block was cleared away still resolves into history.
    // Unknown or already settled ids are dropped.
    let Some(command) = state.pending.remove(&id) else {
        return Vec::new();
    };

    let resolution = dispatcher::resolve(result);

    state.status = StatusLine {
        text: resolution.status_text.clone(),
        variant: resolution.state.into(),
    };
    if let Some(block) = state.transcript.iter_mut().find(|b| b.id == id) {
        block.finalize(
            resolution.state,
            resolution.response_text.clone(),
            resolution.meta_text.clone(),
        );
    }
    state.raw.set(resolution.raw.clone());

    vec![Effect::AppendHistory(HistoryEntry {
        command,
        summary: summarize(&resolution.status_text, at),
        output: resolution.history_output(),
        raw: resolution.raw,
    })]
}

/// Combine a status text with the client-local time. Empty status stays empty.
pub fn summarize(status: &str, at: DateTime<Local>) -> String {
    if status.is_empty() {
        String::new()
    } else {
        format!("{status} · {}", at.format("%Y-%m-%d %H:%M:%S"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
