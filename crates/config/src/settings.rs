//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use concierge_core::{GenerationParams, SearchMode};

use crate::constants::{conversation, delimiter, endpoints, generation, queue, retrieval, timeouts};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging and metrics
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Model invocation endpoint
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Knowledge-base retrieval endpoint
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Turn handling
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Verification queue
    #[serde(default)]
    pub queue: QueueConfig,

    /// Instruction tag randomization
    #[serde(default)]
    pub delimiter: DelimiterConfig,

    /// Registered models, selectable by name
    #[serde(default = "default_models")]
    pub models: Vec<ModelDescriptor>,

    /// Registered knowledge bases, selectable by name
    #[serde(default = "default_knowledge_bases")]
    pub knowledge_bases: Vec<KnowledgeBaseDescriptor>,

    /// Known brands and their document path prefixes
    #[serde(default = "default_brands")]
    pub brands: Vec<BrandEntry>,

    /// Alternate names for models and knowledge bases
    #[serde(default)]
    pub aliases: AliasConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            inference: InferenceConfig::default(),
            retrieval: RetrievalConfig::default(),
            conversation: ConversationConfig::default(),
            queue: QueueConfig::default(),
            delimiter: DelimiterConfig::default(),
            models: default_models(),
            knowledge_bases: default_knowledge_bases(),
            brands: default_brands(),
            aliases: AliasConfig::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a model by name or alias, ignoring case
    pub fn find_model(&self, name: &str) -> Option<&ModelDescriptor> {
        let name = AliasEntry::resolve(&self.aliases.models, name);
        self.models.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Find a knowledge base by name or alias, ignoring case
    pub fn find_knowledge_base(&self, name: &str) -> Option<&KnowledgeBaseDescriptor> {
        let name = AliasEntry::resolve(&self.aliases.knowledge_bases, name);
        self.knowledge_bases
            .iter()
            .find(|kb| kb.name.eq_ignore_ascii_case(name))
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_conversation()?;
        self.validate_registry()?;
        self.validate_queue()?;
        self.validate_delimiter()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.request_timeout_secs".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }

    fn validate_conversation(&self) -> Result<(), ConfigError> {
        if self.conversation.max_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "conversation.max_turns".to_string(),
                message: "History must keep at least 1 turn".to_string(),
            });
        }

        if self.retrieval.query_max_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.query_max_chars".to_string(),
                message: "Query window must be at least 1 character".to_string(),
            });
        }

        let model_refs = [
            ("conversation.default_model", Some(&self.conversation.default_model)),
            ("conversation.evaluation_model", self.conversation.evaluation_model.as_ref()),
            ("conversation.detection_model", self.conversation.detection_model.as_ref()),
            ("queue.verification_model", self.queue.verification_model.as_ref()),
        ];
        for (field, name) in model_refs {
            if let Some(name) = name {
                if self.find_model(name).is_none() {
                    return Err(ConfigError::InvalidValue {
                        field: field.to_string(),
                        message: format!("Unknown model '{}'", name),
                    });
                }
            }
        }

        if self
            .find_knowledge_base(&self.conversation.default_knowledge_base)
            .is_none()
        {
            return Err(ConfigError::InvalidValue {
                field: "conversation.default_knowledge_base".to_string(),
                message: format!(
                    "Unknown knowledge base '{}'",
                    self.conversation.default_knowledge_base
                ),
            });
        }

        Ok(())
    }

    fn validate_registry(&self) -> Result<(), ConfigError> {
        for model in &self.models {
            if model.model_id.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("models.{}.model_id", model.name),
                    message: "Model id cannot be empty".to_string(),
                });
            }
        }

        for kb in &self.knowledge_bases {
            if !(0.0..=1.0).contains(&kb.score_threshold) {
                return Err(ConfigError::InvalidValue {
                    field: format!("knowledge_bases.{}.score_threshold", kb.name),
                    message: format!("Must be between 0.0 and 1.0, got {}", kb.score_threshold),
                });
            }
            if kb.max_results == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("knowledge_bases.{}.max_results", kb.name),
                    message: "Must request at least 1 result".to_string(),
                });
            }
        }

        for alias in &self.aliases.models {
            if !self
                .models
                .iter()
                .any(|m| m.name.eq_ignore_ascii_case(&alias.target))
            {
                return Err(ConfigError::InvalidValue {
                    field: format!("aliases.models.{}", alias.name),
                    message: format!("Unknown model '{}'", alias.target),
                });
            }
        }

        for alias in &self.aliases.knowledge_bases {
            if !self
                .knowledge_bases
                .iter()
                .any(|kb| kb.name.eq_ignore_ascii_case(&alias.target))
            {
                return Err(ConfigError::InvalidValue {
                    field: format!("aliases.knowledge_bases.{}", alias.name),
                    message: format!("Unknown knowledge base '{}'", alias.target),
                });
            }
        }

        Ok(())
    }

    fn validate_queue(&self) -> Result<(), ConfigError> {
        if self.queue.kind == QueueKind::Http
            && self.queue.url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(ConfigError::MissingField("queue.url".to_string()));
        }

        if self.queue.capacity == 0 || self.queue.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queue".to_string(),
                message: "Capacity and concurrency must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    fn validate_delimiter(&self) -> Result<(), ConfigError> {
        if self.delimiter.min > self.delimiter.max {
            return Err(ConfigError::InvalidValue {
                field: "delimiter.min".to_string(),
                message: format!(
                    "Must not exceed delimiter.max ({} > {})",
                    self.delimiter.min, self.delimiter.max
                ),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Inbound request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    timeouts::REQUEST_SECS
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
            // Empty by default, configure explicitly per deployment
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Install the Prometheus recorder and serve `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Model invocation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_inference_endpoint")]
    pub endpoint: String,

    /// Sent as a bearer token when set
    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default = "default_inference_timeout")]
    pub timeout_ms: u64,
}

fn default_inference_endpoint() -> String {
    endpoints::INFERENCE_DEFAULT.to_string()
}
fn default_inference_timeout() -> u64 {
    timeouts::INFERENCE_MS
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_inference_endpoint(),
            bearer_token: None,
            timeout_ms: default_inference_timeout(),
        }
    }
}

/// Knowledge-base retrieval endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_retrieval_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default = "default_retrieval_timeout")]
    pub timeout_ms: u64,

    /// Trailing transcript characters used as the query
    #[serde(default = "default_query_max_chars")]
    pub query_max_chars: usize,
}

fn default_retrieval_endpoint() -> String {
    endpoints::RETRIEVAL_DEFAULT.to_string()
}
fn default_retrieval_timeout() -> u64 {
    timeouts::RETRIEVAL_MS
}
fn default_query_max_chars() -> usize {
    conversation::QUERY_MAX_CHARS
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            endpoint: default_retrieval_endpoint(),
            bearer_token: None,
            timeout_ms: default_retrieval_timeout(),
            query_max_chars: default_query_max_chars(),
        }
    }
}

/// Text substitution applied to spoken responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechConversion {
    pub from: String,
    pub to: String,
}

/// Turn handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Turns kept in session history
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Model used when the session has no selection
    #[serde(default = "default_alias")]
    pub default_model: String,

    /// Knowledge base used when the session has no selection
    #[serde(default = "default_alias")]
    pub default_knowledge_base: String,

    /// Model for labeled-answer evaluation when the session names none
    #[serde(default)]
    pub evaluation_model: Option<String>,

    /// Model for hallucination detection when the session names none
    #[serde(default)]
    pub detection_model: Option<String>,

    /// Applied in order before wrapping spoken responses in SSML
    #[serde(default = "default_speech_conversions")]
    pub speech_conversions: Vec<SpeechConversion>,
}

fn default_max_turns() -> usize {
    conversation::MAX_TURNS
}
fn default_alias() -> String {
    conversation::DEFAULT_ALIAS.to_string()
}
fn default_speech_conversions() -> Vec<SpeechConversion> {
    [("EV", "E V"), ("2024", "twenty twenty four")]
        .into_iter()
        .map(|(from, to)| SpeechConversion {
            from: from.to_string(),
            to: to.to_string(),
        })
        .collect()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            default_model: default_alias(),
            default_knowledge_base: default_alias(),
            evaluation_model: None,
            detection_model: None,
            speech_conversions: default_speech_conversions(),
        }
    }
}

/// Where answered turns are sent for verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    /// Nothing is enqueued
    Disabled,
    /// In-process channel drained by a background worker
    #[default]
    Local,
    /// JSON POST to an external queue endpoint
    Http,
}

/// Verification queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub kind: QueueKind,

    /// Required for the `http` kind
    #[serde(default)]
    pub url: Option<String>,

    /// Local channel capacity
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,

    /// Model used for hallucination detection; defaults to the default model
    #[serde(default)]
    pub verification_model: Option<String>,

    /// Jobs verified concurrently within a batch
    #[serde(default = "default_queue_concurrency")]
    pub concurrency: usize,
}

fn default_queue_capacity() -> usize {
    queue::CAPACITY
}
fn default_queue_concurrency() -> usize {
    queue::CONCURRENCY
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            kind: QueueKind::default(),
            url: None,
            capacity: default_queue_capacity(),
            verification_model: None,
            concurrency: default_queue_concurrency(),
        }
    }
}

/// Instruction tag strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterKind {
    None,
    #[default]
    RandomNumeric,
    Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelimiterConfig {
    #[serde(default)]
    pub strategy: DelimiterKind,

    #[serde(default = "default_delimiter_prefix")]
    pub prefix: String,

    #[serde(default = "default_delimiter_min")]
    pub min: u32,

    #[serde(default = "default_delimiter_max")]
    pub max: u32,
}

fn default_delimiter_prefix() -> String {
    delimiter::PREFIX.to_string()
}
fn default_delimiter_min() -> u32 {
    delimiter::MIN
}
fn default_delimiter_max() -> u32 {
    delimiter::MAX
}

impl Default for DelimiterConfig {
    fn default() -> Self {
        Self {
            strategy: DelimiterKind::default(),
            prefix: default_delimiter_prefix(),
            min: default_delimiter_min(),
            max: default_delimiter_max(),
        }
    }
}

/// Request/response format family of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Anthropic messages API
    Anthropic,
    /// Anthropic legacy text completion
    AnthropicCompletion,
    AmazonTitan,
    Ai21Jurassic,
    Ai21Jamba,
    /// Cohere Command / Command Light
    CohereCommand,
    /// Cohere Command R / R+
    CohereCommandR,
    MetaLlama,
    Mistral,
}

/// Prompt template set used by a model's agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSet {
    /// Instruction-tagged templates
    #[default]
    Standard,
    /// `System:`/`Human:`/`Assistant:` tagged templates
    RoleTagged,
    /// Single-block templates for Titan models
    Titan,
}

/// Registered model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Display name, also the session selection value
    pub name: String,
    pub provider: ProviderKind,
    pub model_id: String,
    #[serde(default)]
    pub template_set: TemplateSet,
    /// Generation defaults for this model
    #[serde(default)]
    pub params: GenerationParams,
}

impl ModelDescriptor {
    pub fn new(
        name: impl Into<String>,
        provider: ProviderKind,
        model_id: impl Into<String>,
        template_set: TemplateSet,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            model_id: model_id.into(),
            template_set,
            params: GenerationParams::default()
                .with_temperature(generation::TEMPERATURE)
                .with_max_tokens(generation::MAX_TOKENS),
        }
    }
}

/// Registered knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseDescriptor {
    pub name: String,
    pub knowledge_base_id: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    #[serde(default)]
    pub search_mode: SearchMode,
    /// Bucket the documents were ingested from; enables brand filtering
    #[serde(default)]
    pub source_bucket: Option<String>,
}

fn default_max_results() -> usize {
    retrieval::MAX_RESULTS
}
fn default_score_threshold() -> f32 {
    retrieval::SCORE_THRESHOLD
}

/// Brand and the path prefix its documents live under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandEntry {
    pub name: String,
    pub prefix: String,
}

/// Alternate name for a registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub name: String,
    pub target: String,
}

impl AliasEntry {
    /// Target of a matching alias, or `name` unchanged
    pub fn resolve<'a>(aliases: &'a [AliasEntry], name: &'a str) -> &'a str {
        aliases
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.target.as_str())
            .unwrap_or(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasConfig {
    #[serde(default = "default_model_aliases")]
    pub models: Vec<AliasEntry>,
    #[serde(default = "default_knowledge_base_aliases")]
    pub knowledge_bases: Vec<AliasEntry>,
}

fn default_model_aliases() -> Vec<AliasEntry> {
    vec![AliasEntry {
        name: conversation::DEFAULT_ALIAS.to_string(),
        target: generation::DEFAULT_MODEL.to_string(),
    }]
}
fn default_knowledge_base_aliases() -> Vec<AliasEntry> {
    vec![AliasEntry {
        name: conversation::DEFAULT_ALIAS.to_string(),
        target: retrieval::DEFAULT_KNOWLEDGE_BASE.to_string(),
    }]
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            models: default_model_aliases(),
            knowledge_bases: default_knowledge_base_aliases(),
        }
    }
}

fn default_models() -> Vec<ModelDescriptor> {
    use ProviderKind::*;
    use TemplateSet::*;

    [
        ("Jurassic 2 Mid", Ai21Jurassic, "ai21.j2-mid-v1", Standard),
        ("Jurassic 2 Ultra", Ai21Jurassic, "ai21.j2-ultra-v1", Standard),
        ("Jamba Instruct", Ai21Jamba, "ai21.jamba-instruct-v1:0", Standard),
        ("Titan Text G1 Lite", AmazonTitan, "amazon.titan-text-lite-v1", Titan),
        ("Titan Text G1 Express", AmazonTitan, "amazon.titan-text-express-v1", Titan),
        ("Titan Text G1 Premier", AmazonTitan, "amazon.titan-text-premier-v1:0", Titan),
        ("Claude V1 Instant", AnthropicCompletion, "anthropic.claude-instant-v1", RoleTagged),
        ("Claude V2", AnthropicCompletion, "anthropic.claude-v2", RoleTagged),
        ("Claude V2.1", AnthropicCompletion, "anthropic.claude-v2:1", RoleTagged),
        ("Claude V3 Haiku", Anthropic, "anthropic.claude-3-haiku-20240307-v1:0", RoleTagged),
        ("Claude V3 Sonnet", Anthropic, "anthropic.claude-3-sonnet-20240229-v1:0", RoleTagged),
        ("Claude V3.5 Sonnet", Anthropic, "anthropic.claude-3-5-sonnet-20240620-v1:0", RoleTagged),
        ("Claude V3 Opus", Anthropic, "anthropic.claude-3-opus-20240229-v1:0", RoleTagged),
        ("Cohere Command", CohereCommand, "cohere.command-text-v14", Standard),
        ("Cohere Command Light", CohereCommand, "cohere.command-light-text-v14", Standard),
        ("Cohere Command R", CohereCommandR, "cohere.command-r-v1:0", Standard),
        ("Cohere Command R Plus", CohereCommandR, "cohere.command-r-plus-v1:0", Standard),
        ("Llama 3 8B Instruct", MetaLlama, "meta.llama3-8b-instruct-v1:0", Standard),
        ("Llama 3 70B Instruct", MetaLlama, "meta.llama3-70b-instruct-v1:0", Standard),
        ("Mistral 7B", Mistral, "mistral.mistral-7b-instruct-v0:2", Standard),
        ("Mixtral 8x7B", Mistral, "mistral.mixtral-8x7b-instruct-v0:1", Standard),
        ("Mistral Small", Mistral, "mistral.mistral-small-2402-v1:0", Standard),
        ("Mistral Large", Mistral, "mistral.mistral-large-2402-v1:0", Standard),
    ]
    .into_iter()
    .map(|(name, provider, id, templates)| ModelDescriptor::new(name, provider, id, templates))
    .collect()
}

fn default_knowledge_bases() -> Vec<KnowledgeBaseDescriptor> {
    vec![KnowledgeBaseDescriptor {
        name: retrieval::DEFAULT_KNOWLEDGE_BASE.to_string(),
        knowledge_base_id: "ALFA".to_string(),
        max_results: retrieval::MAX_RESULTS,
        score_threshold: retrieval::SCORE_THRESHOLD,
        search_mode: SearchMode::Hybrid,
        source_bucket: None,
    }]
}

fn default_brands() -> Vec<BrandEntry> {
    [
        ("Example Corp Seaside Resorts", "/seaside-resorts"),
        ("Example Corp Luxury Suites", "/luxury-suites"),
        ("Example corp Waypoint Inns", "/waypoint-inns"),
        ("Example Corp Family Getaways", "/family-getaways"),
        ("Example Corp Party Times", "/party-times"),
    ]
    .into_iter()
    .map(|(name, prefix)| BrandEntry {
        name: name.to_string(),
        prefix: prefix.to_string(),
    })
    .collect()
}

/// Load settings from `config/` and the environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (`CONCIERGE__` prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings with config files read from `dir`
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::from(dir.join("default")).required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("CONCIERGE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        models = settings.models.len(),
        knowledge_bases = settings.knowledge_bases.len(),
        brands = settings.brands.len(),
        "Settings loaded"
    );

    Ok(settings)
}
