//! Per-user conversation state.

use chrono::{DateTime, Utc};
use pharmabot_core::language::Language;
use pharmabot_core::message::{SessionId, Transcript, Turn};

/// One user's conversation. Created on first interaction, dropped when the
/// conversation ends; nothing is persisted.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub language: Language,
    pub created_at: DateTime<Utc>,
    transcript: Transcript,
}

impl Session {
    pub fn new(language: Language) -> Self {
        Self {
            id: SessionId::new(),
            language,
            created_at: Utc::now(),
            transcript: Transcript::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn turns(&self) -> &[Turn] {
        self.transcript.turns()
    }

    /// Append a turn. Earlier turns are never touched.
    pub fn push(&mut self, turn: Turn) {
        self.transcript.push(turn);
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Start over with an empty transcript under a fresh id.
    pub fn reset(&mut self) {
        self.id = SessionId::new();
        self.transcript = Transcript::new();
        self.created_at = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Language::default())
    }
}
