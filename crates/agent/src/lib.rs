//! The pharmacy assistant turn, the heart of pharmabot.
//!
//! Each user message goes through the same steps:
//!
//! 1. **Record** the message in the session transcript
//! 2. **Load** the product list (TTL-cached, empty on outage)
//! 3. **Rank** products against the message
//! 4. **Build context** (system instruction + prior turns + product block)
//! 5. **Send to the model** and stream the reply
//! 6. **Record** the reply with the ranked products attached
//!
//! A model failure never ends the conversation: the turn completes with a
//! fallback reply and the error is reported alongside it.

pub mod assistant;
pub mod chat;
pub mod context;
pub mod ranker;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assistant::{PharmacyAssistant, TurnOutcome};
pub use chat::{ChatOptions, ChatSession};
pub use context::ContextBuilder;
pub use ranker::{Ranker, ScoredMatch};
pub use session::Session;
