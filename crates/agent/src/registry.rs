//! Agent and knowledge-base registry
//!
//! Built once at startup and shared behind an `Arc`. Lookups ignore case
//! and resolve aliases such as `Default`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use concierge_config::{AliasEntry, BrandEntry, KnowledgeBaseDescriptor, Settings, TemplateSet};
use concierge_core::{KnowledgeRetriever, RetrieveRequest, SourceFilter};
use concierge_llm::{InvokeClient, InvokeClientConfig, LlmFactory};
use concierge_rag::{ManagedRetriever, ManagedRetrieverConfig};

use crate::agent::ConversationalAgent;
use crate::brand::BrandDirectory;
use crate::prompt::{delimiter_from_config, PromptBuilder};
use crate::templates::TemplateTable;
use crate::AgentError;

/// A knowledge base and the retriever that serves it
pub struct KnowledgeBase {
    pub descriptor: KnowledgeBaseDescriptor,
    pub retriever: Arc<dyn KnowledgeRetriever>,
}

impl KnowledgeBase {
    pub fn new(descriptor: KnowledgeBaseDescriptor, retriever: Arc<dyn KnowledgeRetriever>) -> Self {
        Self {
            descriptor,
            retriever,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Bucket documents were ingested from, when brand filtering applies
    pub fn source_bucket(&self) -> Option<&str> {
        self.descriptor
            .source_bucket
            .as_deref()
            .filter(|b| !b.is_empty())
    }

    /// Request carrying this knowledge base's defaults
    pub fn request(&self, query: impl Into<String>, filter: Option<SourceFilter>) -> RetrieveRequest {
        let request = RetrieveRequest::new(query)
            .with_max_results(self.descriptor.max_results)
            .with_min_score(self.descriptor.score_threshold)
            .with_search_mode(self.descriptor.search_mode);
        match filter {
            Some(filter) => request.with_filter(filter),
            None => request,
        }
    }
}

/// Immutable lookup of agents, knowledge bases and brands
pub struct Registry {
    agents: HashMap<String, Arc<ConversationalAgent>>,
    knowledge_bases: HashMap<String, Arc<KnowledgeBase>>,
    model_aliases: Vec<AliasEntry>,
    knowledge_base_aliases: Vec<AliasEntry>,
    default_model: String,
    default_knowledge_base: String,
    brands: BrandDirectory,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build every configured model and knowledge base
    pub fn from_settings(settings: &Settings) -> Result<Self, AgentError> {
        let client_config = InvokeClientConfig::new(settings.inference.endpoint.clone())
            .with_bearer_token(settings.inference.bearer_token.clone())
            .with_timeout(Duration::from_millis(settings.inference.timeout_ms));
        let client = Arc::new(InvokeClient::new(client_config)?);

        let prompt_builder = PromptBuilder::new(delimiter_from_config(&settings.delimiter));
        let tables: HashMap<TemplateSet, Arc<TemplateTable>> =
            [TemplateSet::Standard, TemplateSet::RoleTagged, TemplateSet::Titan]
                .into_iter()
                .map(|set| (set, Arc::new(TemplateTable::for_set(set))))
                .collect();

        let mut builder = Registry::builder()
            .default_model(&settings.conversation.default_model)
            .default_knowledge_base(&settings.conversation.default_knowledge_base)
            .brands(settings.brands.clone())
            .model_aliases(settings.aliases.models.clone())
            .knowledge_base_aliases(settings.aliases.knowledge_bases.clone());

        for descriptor in &settings.models {
            let invoker = LlmFactory::create(descriptor, client.clone())?;
            let table = tables
                .get(&descriptor.template_set)
                .cloned()
                .unwrap_or_else(|| Arc::new(TemplateTable::for_set(descriptor.template_set)));
            let agent = ConversationalAgent::new(invoker, table).with_builder(prompt_builder.clone());
            builder = builder.agent(&descriptor.name, Arc::new(agent));
        }

        for descriptor in &settings.knowledge_bases {
            let config = ManagedRetrieverConfig::from_descriptor(descriptor, &settings.retrieval);
            let retriever = ManagedRetriever::new(config)?;
            builder = builder.knowledge_base(descriptor.clone(), Arc::new(retriever));
        }

        let registry = builder.build()?;
        tracing::info!(
            models = registry.agents.len(),
            knowledge_bases = registry.knowledge_bases.len(),
            brands = registry.brands.entries().len(),
            "Registry built"
        );
        Ok(registry)
    }

    /// Agent by model name or alias; empty names select the default
    pub fn agent(&self, name: &str) -> Option<Arc<ConversationalAgent>> {
        let name = if name.trim().is_empty() {
            self.default_model.as_str()
        } else {
            name
        };
        let name = AliasEntry::resolve(&self.model_aliases, name);
        self.agents.get(&name.to_lowercase()).cloned()
    }

    /// Knowledge base by name or alias; empty names select the default
    pub fn knowledge_base(&self, name: &str) -> Option<Arc<KnowledgeBase>> {
        let name = if name.trim().is_empty() {
            self.default_knowledge_base.as_str()
        } else {
            name
        };
        let name = AliasEntry::resolve(&self.knowledge_base_aliases, name);
        self.knowledge_bases.get(&name.to_lowercase()).cloned()
    }

    pub fn default_agent(&self) -> Option<Arc<ConversationalAgent>> {
        self.agent(&self.default_model)
    }

    pub fn default_knowledge_base(&self) -> Option<Arc<KnowledgeBase>> {
        self.knowledge_base(&self.default_knowledge_base)
    }

    pub fn has_model(&self, name: &str) -> bool {
        !name.trim().is_empty() && self.agent(name).is_some()
    }

    pub fn has_knowledge_base(&self, name: &str) -> bool {
        !name.trim().is_empty() && self.knowledge_base(name).is_some()
    }

    pub fn brands(&self) -> &BrandDirectory {
        &self.brands
    }
}

/// Incremental registry construction
#[derive(Default)]
pub struct RegistryBuilder {
    agents: HashMap<String, Arc<ConversationalAgent>>,
    knowledge_bases: HashMap<String, Arc<KnowledgeBase>>,
    model_aliases: Vec<AliasEntry>,
    knowledge_base_aliases: Vec<AliasEntry>,
    default_model: Option<String>,
    default_knowledge_base: Option<String>,
    brands: Vec<BrandEntry>,
}

impl RegistryBuilder {
    pub fn agent(mut self, name: &str, agent: Arc<ConversationalAgent>) -> Self {
        self.agents.insert(name.to_lowercase(), agent);
        self
    }

    pub fn knowledge_base(
        mut self,
        descriptor: KnowledgeBaseDescriptor,
        retriever: Arc<dyn KnowledgeRetriever>,
    ) -> Self {
        let key = descriptor.name.to_lowercase();
        self.knowledge_bases
            .insert(key, Arc::new(KnowledgeBase::new(descriptor, retriever)));
        self
    }

    pub fn model_aliases(mut self, aliases: Vec<AliasEntry>) -> Self {
        self.model_aliases = aliases;
        self
    }

    pub fn knowledge_base_aliases(mut self, aliases: Vec<AliasEntry>) -> Self {
        self.knowledge_base_aliases = aliases;
        self
    }

    pub fn default_model(mut self, name: &str) -> Self {
        self.default_model = Some(name.to_string());
        self
    }

    pub fn default_knowledge_base(mut self, name: &str) -> Self {
        self.default_knowledge_base = Some(name.to_string());
        self
    }

    pub fn brands(mut self, brands: Vec<BrandEntry>) -> Self {
        self.brands = brands;
        self
    }

    /// Finish, checking that both defaults resolve
    pub fn build(self) -> Result<Registry, AgentError> {
        let default_model = self
            .default_model
            .ok_or_else(|| AgentError::Configuration("no default model".to_string()))?;
        let default_knowledge_base = self
            .default_knowledge_base
            .ok_or_else(|| AgentError::Configuration("no default knowledge base".to_string()))?;

        let registry = Registry {
            agents: self.agents,
            knowledge_bases: self.knowledge_bases,
            model_aliases: self.model_aliases,
            knowledge_base_aliases: self.knowledge_base_aliases,
            default_model,
            default_knowledge_base,
            brands: BrandDirectory::new(self.brands),
        };

        if registry.default_agent().is_none() {
            return Err(AgentError::Configuration(format!(
                "default model '{}' is not registered",
                registry.default_model
            )));
        }
        if registry.default_knowledge_base().is_none() {
            return Err(AgentError::Configuration(format!(
                "default knowledge base '{}' is not registered",
                registry.default_knowledge_base
            )));
        }
        Ok(registry)
    }
}
