//! Turn orchestration: rank, assemble, ask the model, record.

use crate::chat::{ChatOptions, ChatSession};
use crate::context::ContextBuilder;
use crate::ranker::Ranker;
use crate::session::Session;
use pharmabot_config::AppConfig;
use pharmabot_core::error::ProviderError;
use pharmabot_core::message::Turn;
use pharmabot_core::product::ProductRecord;
use pharmabot_core::provider::Provider;
use pharmabot_inventory::InventoryCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What one turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Streamed reply, or the fallback text when the model call failed.
    pub reply: String,
    /// Ranked products attached to the assistant turn.
    pub products: Vec<ProductRecord>,
    /// The model failure, if any. The turn still completed.
    pub error: Option<ProviderError>,
}

impl TurnOutcome {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Answers chat messages with inventory-grounded replies.
pub struct PharmacyAssistant {
    provider: Arc<dyn Provider>,
    inventory: Arc<InventoryCache>,
    ranker: Ranker,
    context: ContextBuilder,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    reply_timeout: Option<Duration>,
}

impl PharmacyAssistant {
    /// Create an assistant with default ranking and persona settings.
    pub fn new(
        provider: Arc<dyn Provider>,
        inventory: Arc<InventoryCache>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            inventory,
            ranker: Ranker::default(),
            context: ContextBuilder::default(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            reply_timeout: None,
        }
    }

    /// Create an assistant with every setting taken from config.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        inventory: Arc<InventoryCache>,
    ) -> Self {
        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());

        let mut assistant = Self::new(provider, inventory, model)
            .with_ranker(Ranker::new(config.ranking.clone()))
            .with_context(ContextBuilder::new(config.assistant.clone()))
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens);
        if let Some(secs) = config.assistant.reply_timeout_secs {
            assistant = assistant.with_reply_timeout(Duration::from_secs(secs));
        }
        assistant
    }

    pub fn with_ranker(mut self, ranker: Ranker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Bound how long a streamed reply may take.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn ranker(&self) -> &Ranker {
        &self.ranker
    }

    pub fn inventory(&self) -> &Arc<InventoryCache> {
        &self.inventory
    }

    /// Run one turn. Fragments are handed to `on_fragment` as they arrive.
    ///
    /// Never fails: a model error yields the fallback reply with
    /// [`TurnOutcome::error`] set, and the session remains usable.
    pub async fn respond<F>(&self, session: &mut Session, message: &str, on_fragment: F) -> TurnOutcome
    where
        F: FnMut(&str),
    {
        let prior_turns = session.turns().len();
        session.push(Turn::user(message));

        let inventory = self.inventory.get().await;
        let products = self.ranker.rank(message, &inventory);
        debug!(
            session = %session.id,
            inventory = inventory.len(),
            matches = products.len(),
            "Ranked inventory"
        );

        let product_context = self.context.product_context(&products);
        let mut options = ChatOptions::new(&self.model)
            .with_system_instruction(self.context.system_instruction(session.language, message))
            .with_temperature(self.temperature);
        if let Some(max) = self.max_tokens {
            options = options.with_max_tokens(max);
        }

        let chat = ChatSession::start(
            Arc::clone(&self.provider),
            &session.turns()[..prior_turns],
            options,
        );
        let prompt = self.context.user_prompt(message, &product_context);

        let (reply, error) = match self.ask(&chat, &prompt, on_fragment).await {
            Ok(text) => {
                info!(session = %session.id, chars = text.len(), "Reply complete");
                (text, None)
            }
            Err(e) => {
                warn!(session = %session.id, error = %e, "Model call failed, using fallback reply");
                (self.context.config().fallback_reply.clone(), Some(e))
            }
        };

        session.push(Turn::assistant(reply.clone()).with_products(products.clone()));

        TurnOutcome {
            reply,
            products,
            error,
        }
    }

    async fn ask<F>(&self, chat: &ChatSession, prompt: &str, on_fragment: F) -> Result<String, ProviderError>
    where
        F: FnMut(&str),
    {
        let mut stream = chat.send(prompt).await?;
        stream.for_each_fragment(self.reply_timeout, on_fragment).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use async_trait::async_trait;
    use pharmabot_core::error::InventoryError;
    use pharmabot_core::inventory::InventorySource;
    use pharmabot_core::language::Language;
    use pharmabot_core::message::Role;

    struct StaticInventory(Vec<ProductRecord>);

    #[async_trait]
    impl InventorySource for StaticInventory {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self) -> Result<Vec<ProductRecord>, InventoryError> {
            Ok(self.0.clone())
        }
    }

    struct DownInventory;

    #[async_trait]
    impl InventorySource for DownInventory {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch(&self) -> Result<Vec<ProductRecord>, InventoryError> {
            Err(InventoryError::Network("unreachable".into()))
        }
    }

    fn cache(source: impl InventorySource + 'static) -> Arc<InventoryCache> {
        Arc::new(InventoryCache::new(Arc::new(source), Duration::from_secs(600)))
    }

    fn store() -> Arc<InventoryCache> {
        let products = ["Panadol Advance", "Toothbrush", "Strepsils"]
            .iter()
            .map(|name| ProductRecord::from_value(serde_json::json!({ "item_name": name })).unwrap())
            .collect();
        cache(StaticInventory(products))
    }

    #[tokio::test]
    async fn successful_turn_streams_and_records() {
        let provider = Arc::new(ScriptedProvider::replying(["Try ", "Panadol."]));
        let assistant = PharmacyAssistant::new(provider.clone(), store(), "test-model");
        let mut session = Session::new(Language::English);

        let mut fragments = Vec::new();
        let outcome = assistant
            .respond(&mut session, "fever", |f| fragments.push(f.to_string()))
            .await;

        assert_eq!(fragments, vec!["Try ", "Panadol."]);
        assert_eq!(outcome.reply, "Try Panadol.");
        assert!(outcome.error.is_none());
        assert_eq!(outcome.products.len(), 1);
        assert_eq!(outcome.products[0].name(), "Panadol Advance");

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].products.len(), 1);

        let request = provider.last_request().unwrap();
        assert!(request.history.is_empty());
        assert!(request.message.contains("Panadol Advance"));
        assert!(request.system_instruction.unwrap().contains("patient's age"));
    }

    #[tokio::test]
    async fn history_excludes_the_new_message() {
        let provider = Arc::new(ScriptedProvider::replying(["ok"]));
        let assistant = PharmacyAssistant::new(provider.clone(), store(), "m");
        let mut session = Session::default();

        assistant.respond(&mut session, "hello", |_| {}).await;
        assistant.respond(&mut session, "strepsils?", |_| {}).await;

        let request = provider.last_request().unwrap();
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[0].text, "hello");
        assert_eq!(request.history[1].role, "assistant");
        assert_eq!(session.turns().len(), 4);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn send_failure_uses_fallback_and_keeps_session() {
        let failing = Arc::new(ScriptedProvider::failing());
        let assistant = PharmacyAssistant::new(failing, store(), "m");
        let mut session = Session::default();
        session.push(Turn::user("earlier"));
        session.push(Turn::assistant("earlier reply"));

        let outcome = assistant.respond(&mut session, "fever", |_| {}).await;
        assert!(outcome.is_fallback());
        assert_eq!(outcome.reply, ContextBuilder::default().config().fallback_reply);
        assert_eq!(session.turns()[1].content, "earlier reply");
        assert_eq!(session.turns().len(), 4);

        let working = Arc::new(ScriptedProvider::replying(["back"]));
        let assistant = PharmacyAssistant::new(working, store(), "m");
        let outcome = assistant.respond(&mut session, "again", |_| {}).await;
        assert_eq!(outcome.reply, "back");
        assert_eq!(session.turns().len(), 6);
    }

    #[tokio::test]
    async fn mid_stream_failure_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::failing_mid_stream("Part"));
        let assistant = PharmacyAssistant::new(provider, store(), "m");
        let mut session = Session::default();

        let outcome = assistant.respond(&mut session, "cough", |_| {}).await;
        assert!(matches!(outcome.error, Some(ProviderError::StreamInterrupted(_))));
        assert_eq!(session.turns()[1].content, outcome.reply);
    }

    #[tokio::test]
    async fn rejected_stream_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::rejecting("SAFETY"));
        let assistant = PharmacyAssistant::new(provider, store(), "m");
        let mut session = Session::default();

        let mut streamed = String::new();
        let outcome = assistant
            .respond(&mut session, "fever", |f| streamed.push_str(f))
            .await;
        assert!(outcome.is_fallback());
        assert!(streamed.is_empty());
        assert_eq!(outcome.reply, ContextBuilder::default().config().fallback_reply);
        assert_eq!(session.turns()[1].content, outcome.reply);
    }

    #[tokio::test]
    async fn inventory_outage_still_answers() {
        let provider = Arc::new(ScriptedProvider::replying(["Sorry, nothing listed."]));
        let assistant = PharmacyAssistant::new(provider.clone(), cache(DownInventory), "m");
        let mut session = Session::default();

        let outcome = assistant.respond(&mut session, "fever", |_| {}).await;
        assert!(outcome.error.is_none());
        assert!(outcome.products.is_empty());
        let request = provider.last_request().unwrap();
        assert!(request.message.contains(crate::context::NO_PRODUCTS));
    }

    #[tokio::test]
    async fn arabic_session_requests_arabic() {
        let provider = Arc::new(ScriptedProvider::replying(["مرحبا"]));
        let assistant = PharmacyAssistant::new(provider.clone(), store(), "m");
        let mut session = Session::new(Language::Arabic);

        assistant.respond(&mut session, "toothbrush", |_| {}).await;
        let instruction = provider.last_request().unwrap().system_instruction.unwrap();
        assert!(instruction.contains("Respond in Arabic."));
    }

    #[test]
    fn from_config_prefers_provider_model() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "gemini".into(),
            pharmabot_config::ProviderConfig {
                api_key: None,
                api_url: None,
                default_model: Some("gemini-2.0-flash".into()),
            },
        );
        let provider = Arc::new(ScriptedProvider::replying(["x"]));
        let assistant = PharmacyAssistant::from_config(&config, provider, store());
        assert_eq!(assistant.model(), "gemini-2.0-flash");
        assert_eq!(assistant.ranker().config().max_results, 6);
    }
}
