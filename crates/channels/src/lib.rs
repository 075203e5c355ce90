//! Chat channel implementations for pharmabot.
//!
//! Each channel delivers customer messages to the assistant and relays
//! replies back. Channels are trait-based and platform-agnostic.
//!
//! Available channels:
//! - **CLI** — Interactive terminal chat (stdin/stdout)

pub mod cli;

pub use cli::{CliChannel, is_exit_command};
