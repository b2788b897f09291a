//! meshconsole: a command console for a mesh-radio control backend.
//!
//! Local commands (`help`, `status`, `clear`, `config`) are answered in
//! process; everything else is sent once to the backend's `/api/command`
//! endpoint and rendered as a transcript block. Session configuration and
//! the last twenty submissions persist between runs.

pub mod cli;
pub mod console;
pub mod dispatcher;
pub mod interpreter;
pub mod logging;
pub mod ports;
pub mod session;
pub mod settings;
pub mod storage;
