//! The sales agent: retrieval, prompt composition and completion per request.

use crate::request::TaskRequest;
use crate::response::AgentResponse;
use crate::state::{RequestState, RequestTracker};
use chrono::Utc;
use sales_core::config::{CompletionSettings, RetrievalSettings};
use sales_core::{AppConfig, AppError, AppResult};
use sales_knowledge::{
    create_index, entity_id, ContextRetriever, EmbeddingClient, EntityType, RetrievalResult,
    RetrievalScope, SearchFilter,
};
use sales_llm::{create_client, LlmClient, LlmRequest};
use sales_prompt::{ContextEntry, PromptComposer, TemplateSet};
use std::sync::Arc;
use std::time::Duration;

/// Request-level knobs of the agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Results for typed retrieval
    pub top_k: usize,
    /// Per-type limits for retrieval across every type
    pub scope: RetrievalScope,
    /// Answer with empty context when the index is down
    pub degrade_on_index_unavailable: bool,
    /// Deadline for the whole pipeline
    pub request_timeout: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::new(&CompletionSettings::default(), &RetrievalSettings::default(), 60)
    }
}

impl AgentSettings {
    pub fn new(
        completion: &CompletionSettings,
        retrieval: &RetrievalSettings,
        request_timeout_secs: u64,
    ) -> Self {
        Self {
            model: completion.model.clone(),
            temperature: completion.temperature,
            max_tokens: completion.max_tokens,
            top_k: retrieval.top_k,
            scope: RetrievalScope::from_settings(retrieval),
            degrade_on_index_unavailable: retrieval.degrade_on_index_unavailable,
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.completion,
            &config.retrieval,
            config.request_timeout_secs,
        )
    }
}

/// Answers sales questions grounded in the indexed profiles.
///
/// Stateless across requests and read-only with respect to the index.
#[derive(Clone)]
pub struct SalesAgent {
    retriever: ContextRetriever,
    composer: Arc<PromptComposer>,
    llm: Arc<dyn LlmClient>,
    settings: AgentSettings,
}

impl SalesAgent {
    pub fn new(
        retriever: ContextRetriever,
        composer: PromptComposer,
        llm: Arc<dyn LlmClient>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            retriever,
            composer: Arc::new(composer),
            llm,
            settings,
        }
    }

    /// Wire every collaborator from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let embeddings = EmbeddingClient::from_settings(
            &config.embedding,
            config.resolve_embedding_key().as_deref(),
        )?;
        let index = create_index(
            &config.vector_store,
            config.resolve_vector_store_key().as_deref(),
        )?;
        let retriever =
            ContextRetriever::new(embeddings, index).with_min_score(config.retrieval.min_score);

        let templates = TemplateSet::load(&config.prompts_dir())?;
        let composer = PromptComposer::with_templates(
            templates,
            config.prompt.max_context_chars,
            config.retrieval.confidence_threshold,
        )?;

        let llm = create_client(&config.completion, config.resolve_api_key().as_deref())?;

        tracing::debug!(
            "Sales agent ready (completion: {}, embeddings: {}/{})",
            llm.provider_name(),
            config.embedding.provider,
            config.embedding.model
        );

        Ok(Self::new(
            retriever,
            composer,
            llm,
            AgentSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn retriever(&self) -> &ContextRetriever {
        &self.retriever
    }

    /// Free-form question, optionally restricted to one territory.
    pub async fn general_query(
        &self,
        query: &str,
        scope: Option<RetrievalScope>,
        territory: Option<&str>,
    ) -> AppResult<AgentResponse> {
        self.handle(TaskRequest::GeneralQuery {
            query: query.to_string(),
            scope,
            territory: territory.map(str::to_string),
        })
        .await
    }

    /// Analysis of one customer. Fails with a validation error when no
    /// indexed customer matches the name.
    pub async fn customer_analysis(&self, customer: &str) -> AppResult<AgentResponse> {
        self.handle(TaskRequest::CustomerAnalysis {
            customer: customer.to_string(),
        })
        .await
    }

    pub async fn product_recommendation(&self, criteria: &str) -> AppResult<AgentResponse> {
        self.handle(TaskRequest::ProductRecommendation {
            criteria: criteria.to_string(),
        })
        .await
    }

    pub async fn territory_analysis(&self, territory: &str) -> AppResult<AgentResponse> {
        self.handle(TaskRequest::TerritoryAnalysis {
            territory: territory.to_string(),
        })
        .await
    }

    pub async fn pitch_generation(
        &self,
        customer: &str,
        product_focus: Option<&str>,
    ) -> AppResult<AgentResponse> {
        self.handle(TaskRequest::PitchGeneration {
            customer: customer.to_string(),
            product_focus: product_focus.map(str::to_string),
        })
        .await
    }

    /// Run one request through the pipeline under the request deadline.
    pub async fn handle(&self, request: TaskRequest) -> AppResult<AgentResponse> {
        let task = request.task();
        let mut tracker = RequestTracker::new(task);

        let request = match request.normalized() {
            Ok(request) => request,
            Err(e) => {
                tracker.fail(&e);
                return Err(e);
            }
        };

        let deadline = self.settings.request_timeout;
        let outcome = tokio::time::timeout(deadline, self.run(&request, &mut tracker)).await;
        let result = outcome.unwrap_or_else(|_| {
            Err(AppError::Timeout(format!(
                "{} did not finish within {:.1}s",
                task,
                deadline.as_secs_f64()
            )))
        });

        match result {
            Ok(response) => {
                tracker.finish();
                Ok(response)
            }
            Err(e) => {
                tracker.fail(&e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &TaskRequest,
        tracker: &mut RequestTracker,
    ) -> AppResult<AgentResponse> {
        let task = request.task();
        let query = request.query();

        tracker.advance(RequestState::Retrieving);
        let retrieval = match self.retrieve(request, &query).await {
            Ok(result) => result,
            Err(AppError::IndexUnavailable(msg)) if self.settings.degrade_on_index_unavailable => {
                tracing::warn!(
                    "Vector index unavailable, answering without context: {}",
                    msg
                );
                RetrievalResult::empty()
            }
            Err(e) => return Err(e),
        };

        tracker.advance(RequestState::Composing);
        let context = context_entries(&retrieval);
        let prompt = self.composer.compose(task, &query, &context)?;

        tracing::info!(
            "Composed {} prompt: {} context entries ({} dropped), max score {:.3}, low confidence: {}",
            task,
            prompt.included_ids.len(),
            prompt.dropped_ids.len(),
            retrieval.top_score().unwrap_or(0.0),
            prompt.low_confidence
        );

        tracker.advance(RequestState::Completing);
        let llm_request = LlmRequest::new(prompt.user.clone(), &self.settings.model)
            .with_system(prompt.system.clone())
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let completion = self.llm.complete(&llm_request).await?;

        let answer = completion.content.trim();
        if answer.is_empty() {
            return Err(AppError::completion(format!(
                "{} returned an empty answer",
                self.llm.provider_name()
            )));
        }
        if completion.truncated {
            tracing::warn!("Answer was cut at the {} token limit", self.settings.max_tokens);
        }

        Ok(AgentResponse {
            request_id: tracker.id().to_string(),
            task,
            query,
            context_ids: prompt.included_ids,
            answer: answer.to_string(),
            low_confidence: prompt.low_confidence,
            truncated: completion.truncated,
            top_score: retrieval.top_score(),
            model: completion.model,
            timestamp: Utc::now(),
        })
    }

    /// Indexed customers whose name contains `customer`, and indexed customers overall.
    async fn customer_matches(&self, customer: &str) -> AppResult<(usize, usize)> {
        let prefix = entity_id(EntityType::Customer, "");
        let needle = customer.to_lowercase();
        let entries = self.retriever.index().list_entries().await?;

        let keys: Vec<&str> = entries
            .iter()
            .filter_map(|e| e.id.strip_prefix(prefix.as_str()))
            .collect();
        let matching = keys
            .iter()
            .filter(|key| key.to_lowercase().contains(&needle))
            .count();
        Ok((matching, keys.len()))
    }

    async fn retrieve(&self, request: &TaskRequest, query: &str) -> AppResult<RetrievalResult> {
        let top_k = self.settings.top_k;
        match request {
            TaskRequest::GeneralQuery {
                scope, territory, ..
            } => {
                let scope = scope.unwrap_or(self.settings.scope);
                let filter = territory
                    .as_ref()
                    .map(|t| SearchFilter::new().with_field("territory", t.as_str()));
                self.retriever
                    .retrieve_scoped(query, &scope, filter.as_ref())
                    .await
            }
            TaskRequest::CustomerAnalysis { customer } => {
                let (matching, indexed) = self.customer_matches(customer).await?;
                if matching == 0 {
                    return Err(AppError::Validation(format!(
                        "Customer not found: {}",
                        customer
                    )));
                }

                // Rank over every indexed customer so a match is never cut by top_k
                let mut result = self
                    .retriever
                    .retrieve(query, Some(EntityType::Customer), indexed.max(top_k))
                    .await?;
                result.retain_key_containing(customer);
                result.entries.truncate(top_k);
                Ok(result)
            }
            TaskRequest::ProductRecommendation { .. } => {
                self.retriever
                    .retrieve(query, Some(EntityType::Product), top_k)
                    .await
            }
            TaskRequest::TerritoryAnalysis { territory } => {
                let mut result = self
                    .retriever
                    .retrieve(query, Some(EntityType::Territory), top_k)
                    .await?;
                result.retain_key_containing(territory);
                Ok(result)
            }
            TaskRequest::PitchGeneration { .. } => {
                self.retriever
                    .retrieve_scoped(query, &self.settings.scope, None)
                    .await
            }
        }
    }
}

/// Ranked retrieval hits as prompt context, best first.
pub fn context_entries(result: &RetrievalResult) -> Vec<ContextEntry> {
    result
        .iter()
        .map(|hit| ContextEntry {
            id: hit.profile.id.clone(),
            kind: hit.profile.entity_type.as_str().to_string(),
            key: hit.profile.key.clone(),
            score: hit.score,
            text: hit.profile.text.clone(),
            metadata: hit.profile.metadata.clone(),
        })
        .collect()
}
