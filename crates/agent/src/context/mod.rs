//! Context assembly for one model call.
//!
//! Produces the four pieces a provider request is built from:
//!
//! | Piece | Source |
//! |-------|--------|
//! | System instruction | Persona, store name, response language, safety rule |
//! | History | Prior transcript turns, relabeled for the backend |
//! | Product context | Ranked products (name and price) |
//! | User prompt | The new message with the product context appended |
//!
//! Assembly is deterministic: identical inputs always produce identical text.

use crate::ranker::mentions_keyword;
use pharmabot_config::AssistantConfig;
use pharmabot_core::language::Language;
use pharmabot_core::message::Turn;
use pharmabot_core::product::ProductRecord;
use pharmabot_core::provider::{HistoryEntry, RoleLabels};

/// Sentence used when the ranker found nothing.
pub const NO_PRODUCTS: &str = "No matching products were found in the current inventory.";

/// Builds prompt text from assistant settings.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: AssistantConfig,
}

impl ContextBuilder {
    pub fn new(config: AssistantConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Compact product block: one line per product, with price when known.
    pub fn product_context(&self, products: &[ProductRecord]) -> String {
        if products.is_empty() {
            return NO_PRODUCTS.to_string();
        }

        let mut out = String::from("Available Products:");
        for product in products {
            let name = product.name();
            let name = if name.is_empty() { "(unnamed product)" } else { name.as_str() };
            match product.price() {
                Some(price) => out.push_str(&format!("\n- {name} (price: {price})")),
                None => out.push_str(&format!("\n- {name}")),
            }
        }
        out
    }

    /// One entry per turn, same order, roles renamed to the backend's labels.
    pub fn translate_history(&self, turns: &[Turn], labels: RoleLabels) -> Vec<HistoryEntry> {
        turns
            .iter()
            .map(|turn| HistoryEntry {
                role: labels.label(turn.role).to_string(),
                text: turn.content.clone(),
            })
            .collect()
    }

    /// Persona, store, response language, and the ask-for-age rule when the
    /// query mentions a safety keyword.
    pub fn system_instruction(&self, language: Language, query: &str) -> String {
        let mut instruction = format!(
            "{} You work for {}. Respond in {}.",
            self.config.persona.trim(),
            self.config.store_name,
            language.as_str()
        );

        if self.mentions_safety_keyword(query) {
            instruction.push_str(
                " The patient describes symptoms: before recommending any medicine, \
                 ask for the patient's age, and advise seeing a doctor if symptoms are \
                 severe or persistent.",
            );
        }

        instruction
    }

    /// The user's message with the product context appended.
    pub fn user_prompt(&self, message: &str, context: &str) -> String {
        format!("User asked: {message}\n\nContext: {context}")
    }

    fn mentions_safety_keyword(&self, query: &str) -> bool {
        self.config
            .safety_keywords
            .iter()
            .any(|k| mentions_keyword(query, k))
    }
}
