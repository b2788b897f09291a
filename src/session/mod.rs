//! Session runtime: wires the console state machine to persistence and the
//! backend.
//!
//! [`Session`] owns both stores, the backend and the live [`ConsoleState`].
//! It feeds user input into [`update`], executes the returned effects in
//! order, and feeds each round-trip result back as a `Settled` event. The
//! backend call blocks, so one session never has two submissions in flight
//! at once.

pub mod config;
pub mod history;

use std::collections::VecDeque;

use chrono::Local;

use crate::console::state::{ConsoleState, Effect, Event, update};
use crate::dispatcher::{self, Backend, CommandReply, RequestFailure};
use crate::logging::{self, SubmissionEvent};
use crate::ports;
use crate::storage::Storage;

use config::{ConfigStore, Configuration};
use history::{HistoryEntry, HistoryStore};

pub struct Session<S, B> {
    config: ConfigStore<S>,
    history: HistoryStore<S>,
    backend: B,
    state: ConsoleState,
    /// Configuration as of the last submission.
    active: Configuration,
}

impl<S: Storage + Clone, B: Backend> Session<S, B> {
    pub fn new(storage: S, backend: B) -> Self {
        Self {
            config: ConfigStore::new(storage.clone()),
            history: HistoryStore::new(storage),
            backend,
            state: ConsoleState::new(),
            active: Configuration::default(),
        }
    }
}

impl<S: Storage, B: Backend> Session<S, B> {
    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    pub fn config_store(&self) -> &ConfigStore<S> {
        &self.config
    }

    pub fn history_store(&self) -> &HistoryStore<S> {
        &self.history
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn configuration(&self) -> Configuration {
        self.config.load()
    }

    /// Submit one line and run it to completion.
    pub fn submit(&mut self, line: &str) {
        self.submit_observed(line, |_, _| {});
    }

    /// Like [`submit`](Self::submit), but calls `observer` with the current
    /// state before each effect runs, so a caller can show the pending
    /// block while the backend call is still blocking.
    pub fn submit_observed<F>(&mut self, line: &str, mut observer: F)
    where
        F: FnMut(&ConsoleState, &Effect),
    {
        let config = self.config.load();
        self.active = config.clone();
        let command = line.trim().to_string();
        let mut effects: VecDeque<Effect> = update(
            &mut self.state,
            Event::Submit {
                line: line.to_string(),
                at: Local::now(),
            },
            &config,
        )
        .into();

        if let Some(outcome) = local_outcome(&effects) {
            logging::log_submission(&SubmissionEvent::new(&command, "local", outcome));
        }

        while let Some(effect) = effects.pop_front() {
            observer(&self.state, &effect);
            match effect {
                Effect::SendCommand { id, request } => {
                    let result = dispatcher::dispatch(&self.backend, &request);
                    log_remote(&request.command, &result);
                    effects.extend(update(
                        &mut self.state,
                        Event::Settled {
                            id,
                            result,
                            at: Local::now(),
                        },
                        &config,
                    ));
                }
                Effect::AppendHistory(entry) => self.record(entry),
                Effect::Navigate(view) => {
                    logging::info(&format!("navigated to {view:?} view"));
                }
            }
        }
    }

    /// Re-render the stored entry at `index` (0 = most recent). Reads
    /// history, never writes it, never contacts the backend.
    pub fn replay(&mut self, index: usize) -> bool {
        let Some(entry) = self.history.get(index) else {
            return false;
        };
        update(&mut self.state, Event::Replay { entry }, &self.active);
        true
    }

    /// Return from the configuration surface to the console.
    pub fn close_config(&mut self) {
        update(&mut self.state, Event::CloseConfig, &self.active);
    }

    /// Ask the backend for device ports. Failures are logged and yield none.
    pub fn fetch_ports(&self) -> Vec<String> {
        ports::fetch_ports(&self.backend)
    }

    fn record(&self, entry: HistoryEntry) {
        if let Err(e) = self.history.append(entry) {
            logging::error(&format!("failed to persist history: {e:#}"));
        }
    }
}

/// Outcome to log for a submission answered locally, read off the effects
/// `update` produced. `None` for blank input and remote submissions.
fn local_outcome<'a>(effects: impl IntoIterator<Item = &'a Effect>) -> Option<&'static str> {
    let mut outcome = None;
    for effect in effects {
        match effect {
            Effect::SendCommand { .. } => return None,
            Effect::Navigate(_) => outcome = Some("navigate"),
            Effect::AppendHistory(_) => outcome = outcome.or(Some("ok")),
        }
    }
    outcome
}

fn log_remote(command: &str, result: &Result<CommandReply, RequestFailure>) {
    let resolution = dispatcher::resolve(result);
    let mut event = SubmissionEvent::new(command, "remote", &resolution.state.to_string());
    match result {
        Ok(reply) => event.duration = reply.duration,
        Err(failure) => event.error = Some(failure.to_string()),
    }
    logging::log_submission(&event);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
