//! Session console: the append-only transcript, status line and raw panel,
//! plus the interactive terminal loop that drives them.

pub mod render;
pub mod repl;
pub mod state;

pub use state::{
    BlockState, ConsoleState, Effect, Event, RawPanel, StatusLine, StatusVariant,
    TranscriptBlock, View, update,
};
