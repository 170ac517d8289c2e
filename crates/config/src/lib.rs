//! Configuration management for the concierge
//!
//! Supports loading configuration from:
//! - YAML/TOML/JSON files (`config/default.*`, `config/{env}.*`)
//! - Environment variables (`CONCIERGE` prefix, `__` separator)
//!
//! The model, knowledge base and brand registries are part of the settings
//! so deployments can add entries without code changes.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, AliasConfig, AliasEntry, BrandEntry, ConversationConfig,
    DelimiterConfig, DelimiterKind, InferenceConfig, KnowledgeBaseDescriptor, ModelDescriptor,
    ObservabilityConfig, ProviderKind, QueueConfig, QueueKind, RetrievalConfig,
    RuntimeEnvironment, ServerConfig, Settings, SpeechConversion, TemplateSet,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for concierge_core::Error {
    fn from(err: ConfigError) -> Self {
        concierge_core::Error::Config(err.to_string())
    }
}
