//! # Pharmabot Core
//!
//! Domain types, traits, and error definitions for the pharmacy assistant.
//! This crate has **no transport dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! Every external collaborator (chat model, inventory endpoint, input
//! channel) is a trait here; implementations live in their own crates.

pub mod channel;
pub mod error;
pub mod inventory;
pub mod language;
pub mod message;
pub mod product;
pub mod provider;
pub mod stream;

// Re-export key types at crate root for ergonomics
pub use channel::{Channel, ChannelId, ChannelMessage};
pub use error::{ChannelError, InventoryError, ProviderError};
pub use inventory::InventorySource;
pub use language::Language;
pub use message::{Role, SessionId, Transcript, Turn};
pub use product::ProductRecord;
pub use provider::{HistoryEntry, Provider, ProviderRequest, ProviderResponse, RoleLabels, StreamChunk};
pub use stream::ReplyStream;
