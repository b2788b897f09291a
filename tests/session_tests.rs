/// Integration tests for the console session.
///
/// Each test drives a [`Session`] over an in-memory store and a scripted
/// backend that replays canned round-trip results and records every request
/// it receives. Nothing touches the network or the home directory.
use std::cell::RefCell;
use std::collections::VecDeque;

use meshconsole::console::{BlockState, StatusVariant, View};
use meshconsole::dispatcher::{Backend, CommandReply, CommandRequest, RequestFailure};
use meshconsole::session::Session;
use meshconsole::session::config::{ConfigStore, Configuration};
use meshconsole::session::history::{HISTORY_LIMIT, HistoryEntry, HistoryStore};
use meshconsole::storage::{CONFIG_KEY, HISTORY_KEY, MemoryStorage, Storage};

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ScriptedBackend {
    script: RefCell<VecDeque<Result<CommandReply, RequestFailure>>>,
    requests: RefCell<Vec<CommandRequest>>,
}

impl ScriptedBackend {
    fn then(self, result: Result<CommandReply, RequestFailure>) -> Self {
        self.script.borrow_mut().push_back(result);
        self
    }

    fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Backend for ScriptedBackend {
    fn send_command(&self, request: &CommandRequest) -> Result<CommandReply, RequestFailure> {
        self.requests.borrow_mut().push(request.clone());
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(received("ok", 0.1)))
    }

    fn list_ports(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec!["/dev/ttyACM0".to_string()])
    }
}

fn received(output: &str, duration: f64) -> CommandReply {
    CommandReply {
        received: true,
        output: Some(output.to_string()),
        duration: Some(duration),
        raw: None,
    }
}

fn history(storage: &MemoryStorage) -> Vec<HistoryEntry> {
    HistoryStore::new(storage).load()
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[test]
fn local_commands_never_reach_the_backend() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default();
    let mut session = Session::new(&storage, &backend);

    for line in ["help", "?", "status", "  status  ", "clear", "config"] {
        session.submit(line);
        session.close_config();
    }

    assert_eq!(backend.request_count(), 0);
}

#[test]
fn remote_command_sends_exactly_one_trimmed_request() {
    let storage = MemoryStorage::new().with_value(
        CONFIG_KEY,
        r#"{"port":"/dev/ttyUSB0","channel":3,"timeoutSeconds":60}"#,
    );
    let backend = ScriptedBackend::default();
    let mut session = Session::new(&storage, &backend);

    session.submit("   nodes   ");

    let requests = backend.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].command, "nodes");
    assert_eq!(requests[0].port, "/dev/ttyUSB0");
    assert_eq!(requests[0].channel, 3);
    assert_eq!(requests[0].timeout, Some(60));
}

#[test]
fn blank_input_does_nothing() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default();
    let mut session = Session::new(&storage, &backend);

    session.submit("   ");

    assert_eq!(backend.request_count(), 0);
    assert!(session.state().transcript.is_empty());
    assert!(history(&storage).is_empty());
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn successful_scan_renders_ok_block_and_raw_messages() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default().then(Ok(CommandReply {
        received: true,
        output: Some("3 nodes found".to_string()),
        duration: Some(2.4),
        raw: Some(vec!["node1".into(), "node2".into(), "node3".into()]),
    }));
    let mut session = Session::new(&storage, &backend);

    session.submit("scan");

    let state = session.state();
    let block = &state.transcript[0];
    assert_eq!(block.command, "scan");
    assert_eq!(block.state(), BlockState::Ok);
    assert_eq!(block.response_text, "3 nodes found");
    assert_eq!(block.meta_text, "Done in 2.4s");
    assert_eq!(state.status.text, "Done in 2.4s");
    assert_eq!(state.status.variant, StatusVariant::Ok);
    assert_eq!(state.raw.messages(), ["node1", "node2", "node3"]);

    let entries = history(&storage);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].command, "scan");
    assert_eq!(entries[0].output, "3 nodes found");
    assert!(entries[0].summary.starts_with("Done in 2.4s · "));
    assert_eq!(entries[0].raw.len(), 3);
}

#[test]
fn server_error_surfaces_its_message() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default().then(Err(RequestFailure::Protocol {
        status: 500,
        message: Some("device busy".to_string()),
    }));
    let mut session = Session::new(&storage, &backend);

    session.submit("ping");

    let state = session.state();
    let block = &state.transcript[0];
    assert_eq!(block.state(), BlockState::Error);
    assert_eq!(block.response_text, "device busy");
    assert_eq!(block.meta_text, "Request failed");
    assert_eq!(state.status.text, "device busy");
    assert_eq!(state.status.variant, StatusVariant::Error);

    let entries = history(&storage);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].output, "");
    assert!(entries[0].summary.starts_with("device busy · "));
}

#[test]
fn unreceived_reply_is_a_warning_with_placeholder() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default().then(Ok(CommandReply::default()));
    let mut session = Session::new(&storage, &backend);

    session.submit("ping");

    let state = session.state();
    assert_eq!(state.transcript[0].state(), BlockState::Warn);
    assert_eq!(state.transcript[0].response_text, "<no output>");
    assert_eq!(state.transcript[0].meta_text, "No output");
    assert_eq!(state.status.variant, StatusVariant::Warn);
    assert_eq!(history(&storage)[0].output, "<no output>");
}

#[test]
fn transport_failure_is_an_error_block() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default().then(Err(RequestFailure::Transport(
        "Connection refused".to_string(),
    )));
    let mut session = Session::new(&storage, &backend);

    session.submit("ping");

    let block = &session.state().transcript[0];
    assert_eq!(block.state(), BlockState::Error);
    assert_eq!(block.response_text, "Connection refused");
    assert!(!block.is_pending());
}

#[test]
fn status_reflects_current_configuration() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default();
    let mut session = Session::new(&storage, &backend);

    session.submit("status");
    assert_eq!(
        session.state().transcript[0].response_text,
        "Port: Auto\nChannel: 1\nTimeout: 180s"
    );

    ConfigStore::new(&storage)
        .save(&Configuration {
            port: "COM4".to_string(),
            channel: 2,
            timeout_seconds: 30,
        })
        .unwrap();
    session.submit("status");
    assert_eq!(
        session.state().transcript[1].response_text,
        "Port: COM4\nChannel: 2\nTimeout: 30s"
    );
}

#[test]
fn clear_empties_transcript_and_records_history() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default();
    let mut session = Session::new(&storage, &backend);

    session.submit("help");
    session.submit("ping");
    assert_eq!(session.state().transcript.len(), 2);

    session.submit("clear");

    assert!(session.state().transcript.is_empty());
    let entries = history(&storage);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].command, "clear");
    assert_eq!(entries[0].output, "");
    assert_eq!(entries[0].summary, "");
}

#[test]
fn config_navigates_without_history_or_block() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default();
    let mut session = Session::new(&storage, &backend);

    session.submit("config");

    assert_eq!(session.state().view, View::Config);
    assert!(session.state().transcript.is_empty());
    assert!(history(&storage).is_empty());
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[test]
fn history_keeps_the_twenty_most_recent() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default();
    let mut session = Session::new(&storage, &backend);

    for i in 0..25 {
        session.submit(&format!("cmd{i}"));
    }

    let entries = history(&storage);
    assert_eq!(entries.len(), HISTORY_LIMIT);
    assert_eq!(entries[0].command, "cmd24");
    assert_eq!(entries[HISTORY_LIMIT - 1].command, "cmd5");
}

#[test]
fn replay_is_idempotent_and_never_writes() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default().then(Ok(CommandReply {
        received: true,
        output: Some("pong".to_string()),
        duration: Some(0.3),
        raw: Some(vec!["rx pong".to_string()]),
    }));
    let mut session = Session::new(&storage, &backend);
    session.submit("ping");

    let writes = storage.write_count();
    let before = history(&storage);

    assert!(session.replay(0));
    assert!(session.replay(0));

    assert_eq!(storage.write_count(), writes);
    assert_eq!(history(&storage), before);
    assert_eq!(backend.request_count(), 1);

    let transcript = &session.state().transcript;
    assert_eq!(transcript.len(), 3);
    for block in &transcript[1..] {
        assert!(block.replayed);
        assert_eq!(block.command, "ping");
        assert_eq!(block.response_text, "pong");
        assert_eq!(block.state(), BlockState::Ok);
    }
    assert_ne!(transcript[1].id, transcript[2].id);
    assert_eq!(session.state().raw.messages(), ["rx pong"]);
}

#[test]
fn replay_out_of_range_changes_nothing() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default();
    let mut session = Session::new(&storage, &backend);

    assert!(!session.replay(3));
    assert!(session.state().transcript.is_empty());
}

#[test]
fn corrupt_history_is_treated_as_empty() {
    let storage = MemoryStorage::new().with_value(HISTORY_KEY, "{not json");
    let backend = ScriptedBackend::default();
    let mut session = Session::new(&storage, &backend);

    assert!(session.history_store().is_empty());

    session.submit("help");
    let entries = history(&storage);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].command, "help");
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn config_round_trips_and_resets() {
    let storage = MemoryStorage::new();
    let store = ConfigStore::new(&storage);

    let custom = Configuration {
        port: "/dev/ttyUSB1".to_string(),
        channel: 5,
        timeout_seconds: 45,
    };
    store.save(&custom).unwrap();
    assert_eq!(store.load(), custom);

    let defaults = store.reset().unwrap();
    assert_eq!(defaults, Configuration::default());
    assert_eq!(store.load(), Configuration::default());
}

#[test]
fn first_load_persists_defaults() {
    let storage = MemoryStorage::new();
    let config = ConfigStore::new(&storage).load();

    assert_eq!(config, Configuration::default());
    assert!(storage.read(CONFIG_KEY).is_some());
}

#[test]
fn corrupt_config_falls_back_to_defaults() {
    let storage = MemoryStorage::new().with_value(CONFIG_KEY, "[1, 2");
    assert_eq!(ConfigStore::new(&storage).load(), Configuration::default());
}

#[test]
fn ports_come_from_the_backend() {
    let storage = MemoryStorage::new();
    let backend = ScriptedBackend::default();
    let session = Session::new(&storage, &backend);

    assert_eq!(session.fetch_ports(), ["/dev/ttyACM0"]);
}
