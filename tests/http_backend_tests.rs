/// Integration tests for the HTTP backend.
///
/// A throwaway `tiny_http` server on an ephemeral port plays the device
/// API: it answers a fixed number of requests with canned responses and
/// hands each received request (method, path, body) back over a channel.
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use meshconsole::console::BlockState;
use meshconsole::dispatcher::{self, Backend, CommandRequest, HttpBackend, RequestFailure};
use meshconsole::session::Session;
use meshconsole::session::config::Configuration;
use meshconsole::session::history::HistoryStore;
use meshconsole::storage::MemoryStorage;
use tiny_http::{Header, Response, Server, StatusCode};

struct Received {
    method: String,
    path: String,
    body: String,
}

struct MockBackend {
    url: String,
    requests: Receiver<Received>,
    handle: JoinHandle<()>,
}

impl MockBackend {
    /// Serve `responses` in order, one per incoming request, then stop.
    fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            for (status, body) in responses {
                let Ok(mut request) = server.recv() else {
                    return;
                };
                let mut received = String::new();
                let _ = request.as_reader().read_to_string(&mut received);
                let _ = tx.send(Received {
                    method: request.method().to_string(),
                    path: request.url().to_string(),
                    body: received,
                });
                let header =
                    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap();
                let response = Response::from_string(body)
                    .with_header(header)
                    .with_status_code(StatusCode(status));
                let _ = request.respond(response);
            }
        });

        Self {
            url: format!("http://127.0.0.1:{port}"),
            requests: rx,
            handle,
        }
    }

    fn backend(&self) -> HttpBackend {
        HttpBackend::new(&self.url, Duration::from_secs(2))
    }

    fn next_request(&self) -> Received {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("mock backend saw no request")
    }

    fn finish(self) {
        self.handle.join().unwrap();
    }
}

fn request(command: &str) -> CommandRequest {
    CommandRequest::new(command, &Configuration::default())
}

// ---------------------------------------------------------------------------
// POST /api/command
// ---------------------------------------------------------------------------

#[test]
fn posts_command_json_and_parses_reply() {
    let mock = MockBackend::start(vec![(
        200,
        r#"{"received": true, "output": "3 nodes found", "duration": 2.4, "raw": ["a", "b"]}"#,
    )]);
    let config = Configuration {
        port: "/dev/ttyACM0".to_string(),
        channel: 2,
        timeout_seconds: 90,
    };

    let reply = mock
        .backend()
        .send_command(&CommandRequest::new(" scan ", &config))
        .unwrap();

    assert!(reply.received);
    assert_eq!(reply.output.as_deref(), Some("3 nodes found"));
    assert_eq!(reply.duration, Some(2.4));
    assert_eq!(reply.raw, Some(vec!["a".to_string(), "b".to_string()]));

    let seen = mock.next_request();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.path, "/api/command");
    let body: serde_json::Value = serde_json::from_str(&seen.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "command": "scan",
            "port": "/dev/ttyACM0",
            "channel": 2,
            "timeout": 90
        })
    );
    mock.finish();
}

#[test]
fn truthy_received_values_are_accepted() {
    let mock = MockBackend::start(vec![
        (200, r#"{"received": 1, "output": "x"}"#),
        (200, r#"{"received": "", "output": "y"}"#),
    ]);
    let backend = mock.backend();

    assert!(backend.send_command(&request("a")).unwrap().received);
    assert!(!backend.send_command(&request("b")).unwrap().received);
    mock.finish();
}

#[test]
fn server_error_carries_error_field() {
    let mock = MockBackend::start(vec![(500, r#"{"error": "device busy"}"#)]);

    let failure = mock.backend().send_command(&request("ping")).unwrap_err();

    assert_eq!(
        failure,
        RequestFailure::Protocol {
            status: 500,
            message: Some("device busy".to_string()),
        }
    );
    assert_eq!(failure.user_message(), "device busy");
    mock.finish();
}

#[test]
fn server_error_without_json_is_generic() {
    let mock = MockBackend::start(vec![(502, "Bad Gateway")]);

    let failure = mock.backend().send_command(&request("ping")).unwrap_err();

    assert_eq!(failure.user_message(), "Request failed");
    mock.finish();
}

#[test]
fn non_json_success_body_is_malformed() {
    let mock = MockBackend::start(vec![(200, "<html>ok</html>")]);

    let failure = mock.backend().send_command(&request("ping")).unwrap_err();

    assert!(matches!(failure, RequestFailure::Malformed(_)));
    assert_eq!(dispatcher::resolve(&Err(failure)).state, BlockState::Error);
    mock.finish();
}

#[test]
fn connection_refused_is_a_transport_failure() {
    // Bind then drop to get a port with nothing listening.
    let port = {
        let server = Server::http("127.0.0.1:0").unwrap();
        server.server_addr().to_ip().unwrap().port()
    };
    let backend = HttpBackend::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(1));

    let failure = backend.send_command(&request("ping")).unwrap_err();

    assert!(matches!(failure, RequestFailure::Transport(_)));
    assert!(backend.list_ports().is_err());
}

// ---------------------------------------------------------------------------
// GET /api/ports
// ---------------------------------------------------------------------------

#[test]
fn lists_ports_in_backend_order() {
    let mock = MockBackend::start(vec![(
        200,
        r#"{"ports": ["/dev/ttyUSB0", "/dev/ttyACM0"]}"#,
    )]);

    let ports = mock.backend().list_ports().unwrap();

    assert_eq!(ports, ["/dev/ttyUSB0", "/dev/ttyACM0"]);
    let seen = mock.next_request();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.path, "/api/ports");
    mock.finish();
}

#[test]
fn failed_port_listing_yields_no_ports() {
    let mock = MockBackend::start(vec![(500, r#"{"error": "serial subsystem down"}"#)]);
    let storage = MemoryStorage::new();
    let session = Session::new(&storage, mock.backend());

    assert!(session.fetch_ports().is_empty());
    mock.finish();
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn session_over_http_records_history() {
    let mock = MockBackend::start(vec![(
        200,
        r#"{"received": true, "output": "pong", "duration": 0.5}"#,
    )]);
    let storage = MemoryStorage::new();
    let mut session = Session::new(&storage, mock.backend());

    session.submit("ping");

    let block = &session.state().transcript[0];
    assert_eq!(block.state(), BlockState::Ok);
    assert_eq!(block.response_text, "pong");
    assert_eq!(block.meta_text, "Done in 0.5s");

    let entries = HistoryStore::new(&storage).load();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].output, "pong");
    mock.finish();
}
