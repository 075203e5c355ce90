//! Configuration loading, validation, and management for the pharmacy assistant.
//!
//! Loads configuration from `~/.pharmabot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use pharmabot_core::Language;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Providers that talk to a local model and need no credential.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm", "llamacpp"];

/// Providers with a built-in endpoint. Any other name needs an `api_url`.
pub const BUILTIN_PROVIDERS: &[&str] = &[
    "gemini",
    "openai",
    "openrouter",
    "groq",
    "ollama",
    "vllm",
    "llamacpp",
];

/// Upper bound for a single ranking weight.
pub const MAX_RANKING_WEIGHT: u32 = 1_000;

/// The root configuration structure.
///
/// Maps directly to `~/.pharmabot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default chat provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per reply
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Language replies are written in unless the session picks another
    #[serde(default)]
    pub language: Language,

    /// Inventory source and cache settings
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Product ranking weights and symptom expansions
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Persona, safety and fallback settings
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("language", &self.language)
            .field("inventory", &self.inventory)
            .field("ranking", &self.ranking)
            .field("assistant", &self.assistant)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Where the product list comes from and how long it stays fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Endpoint returning `{"data": [...]}`
    #[serde(default = "default_inventory_url")]
    pub url: String,

    /// Read products from a local JSON file instead of the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Seconds before a fetched list is considered stale
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// HTTP timeout for the fetch
    #[serde(default = "default_inventory_timeout")]
    pub timeout_secs: u64,
}

fn default_inventory_url() -> String {
    "https://robustremedy.com/superadmin/api/api/preetchatbotapi.php".into()
}
fn default_cache_ttl() -> u64 {
    600
}
fn default_inventory_timeout() -> u64 {
    10
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            url: default_inventory_url(),
            file: None,
            cache_ttl_secs: default_cache_ttl(),
            timeout_secs: default_inventory_timeout(),
        }
    }
}

/// Two-tier keyword scoring plus symptom → product term expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Points for a term found in the product name
    #[serde(default = "default_name_weight")]
    pub name_weight: u32,

    /// Points for a term found anywhere else in the record
    #[serde(default = "default_body_weight")]
    pub body_weight: u32,

    /// Maximum products returned per query
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Symptom keyword → extra search terms
    #[serde(default = "default_symptom_expansions")]
    pub symptom_expansions: BTreeMap<String, Vec<String>>,
}

fn default_name_weight() -> u32 {
    15
}
fn default_body_weight() -> u32 {
    2
}
fn default_max_results() -> usize {
    6
}

fn default_symptom_expansions() -> BTreeMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        ("fever", &["panadol", "paracetamol", "adol", "fevadol", "ibuprofen", "brufen"]),
        ("headache", &["panadol", "paracetamol", "adol", "ibuprofen", "aspirin"]),
        ("pain", &["panadol", "ibuprofen", "brufen", "voltaren", "diclofenac"]),
        ("cough", &["cough", "syrup", "strepsils", "lozenge", "benylin", "prospan"]),
        ("cold", &["cold", "flu", "decongestant", "otrivin", "vicks"]),
        ("allergy", &["loratadine", "claritine", "cetirizine", "zyrtec", "antihistamine"]),
        ("dental", &["toothpaste", "toothbrush", "mouthwash", "sensodyne", "colgate", "oral-b"]),
        ("skin", &["cream", "lotion", "moisturizer", "cetaphil", "eucerin"]),
    ];

    table
        .iter()
        .map(|(symptom, terms)| {
            (
                symptom.to_string(),
                terms.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            name_weight: default_name_weight(),
            body_weight: default_body_weight(),
            max_results: default_max_results(),
            symptom_expansions: default_symptom_expansions(),
        }
    }
}

/// Persona and safety settings used when instructing the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Pharmacy name used in the persona directive
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Persona directive
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Query keywords that trigger the ask-for-age directive
    #[serde(default = "default_safety_keywords")]
    pub safety_keywords: Vec<String>,

    /// Reply shown when the model call fails
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// Upper bound on a streamed reply, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_timeout_secs: Option<u64>,
}

fn default_store_name() -> String {
    "Family Pharmacy".into()
}
fn default_persona() -> String {
    "You are a helpful, friendly pharmacy assistant. Recommend products from the \
     available inventory when relevant and keep answers short and practical."
        .into()
}
fn default_safety_keywords() -> Vec<String> {
    [
        "fever", "cough", "pain", "headache", "cold", "flu", "vomit", "diarrhea", "rash",
        "allergy",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_fallback_reply() -> String {
    "Sorry, I couldn't reach the assistant right now. Please try again in a moment \
     or contact a pharmacist directly."
        .into()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            store_name: default_store_name(),
            persona: default_persona(),
            safety_keywords: default_safety_keywords(),
            fallback_reply: default_fallback_reply(),
            reply_timeout_secs: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.pharmabot/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `PHARMABOT_API_KEY` (highest priority)
    /// - `GEMINI_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("PHARMABOT_API_KEY")
                .or_else(|| lookup("GEMINI_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"))
                .filter(|k| !k.trim().is_empty());
        }

        if let Some(provider) = lookup("PHARMABOT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("PHARMABOT_MODEL") {
            self.default_model = model;
        }

        if let Some(url) = lookup("PHARMABOT_INVENTORY_URL") {
            self.inventory.url = url;
        }

        if let Some(language) = lookup("PHARMABOT_LANGUAGE") {
            self.language = language.parse().map_err(ConfigError::ValidationError)?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".pharmabot")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.ranking.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "ranking.max_results must be > 0".into(),
            ));
        }

        if self.ranking.body_weight == 0 || self.ranking.name_weight < self.ranking.body_weight {
            return Err(ConfigError::ValidationError(
                "ranking weights must satisfy name_weight >= body_weight > 0".into(),
            ));
        }

        if self.ranking.name_weight > MAX_RANKING_WEIGHT {
            return Err(ConfigError::ValidationError(format!(
                "ranking.name_weight must be <= {MAX_RANKING_WEIGHT}"
            )));
        }

        let names = std::iter::once(&self.default_provider).chain(self.providers.keys());
        for name in names {
            if !self.provider_has_endpoint(name) {
                return Err(ConfigError::ValidationError(format!(
                    "unknown provider '{name}': set providers.{name}.api_url"
                )));
            }
        }

        if self.inventory.cache_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "inventory.cache_ttl_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Whether `name` is built in or has an explicit `api_url`.
    pub fn provider_has_endpoint(&self, name: &str) -> bool {
        BUILTIN_PROVIDERS.contains(&name)
            || self
                .providers
                .get(name)
                .is_some_and(|p| p.api_url.is_some())
    }

    /// Whether the default provider runs without a credential.
    pub fn provider_is_keyless(&self) -> bool {
        KEYLESS_PROVIDERS.contains(&self.default_provider.as_str())
    }

    /// The credential for the default provider, from its own section or the top level.
    pub fn resolved_api_key(&self) -> Option<&str> {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.api_key.as_deref())
            .or(self.api_key.as_deref())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.resolved_api_key().is_some()
    }

    /// Fail when the default provider needs a key and none is configured.
    pub fn require_api_key(&self) -> Result<(), ConfigError> {
        if self.provider_is_keyless() || self.has_api_key() {
            Ok(())
        } else {
            Err(ConfigError::MissingApiKey {
                provider: self.default_provider.clone(),
            })
        }
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            language: Language::default(),
            inventory: InventoryConfig::default(),
            ranking: RankingConfig::default(),
            assistant: AssistantConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No API key configured for provider '{provider}'")]
    MissingApiKey { provider: String },
}
