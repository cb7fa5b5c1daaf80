//! Configuration management for the Smart Sales Agent.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.sales/config.yaml` in the workspace)
//! - Environment variables
//! - Command-line flags (applied by the caller via [`AppConfig::with_overrides`])
//!
//! The resulting [`AppConfig`] is passed explicitly to every constructor;
//! nothing in the library reads global settings on its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::retry::RetryPolicy;

/// Name of the per-workspace state directory.
pub const SALES_DIR: &str = ".sales";

pub const COMPLETION_PROVIDERS: [&str; 3] = ["groq", "openai", "ollama"];
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["ollama", "openai", "mock"];
pub const VECTOR_BACKENDS: [&str; 2] = ["qdrant", "memory"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Path to the workspace root (contains .sales/)
    pub workspace: PathBuf,

    /// Optional explicit config file path
    pub config_file: Option<PathBuf>,

    /// Completion service settings
    pub completion: CompletionSettings,

    /// Embedding service settings
    pub embedding: EmbeddingSettings,

    /// Vector store settings
    pub vector_store: VectorStoreSettings,

    /// Retrieval tuning
    pub retrieval: RetrievalSettings,

    /// Prompt composition settings
    pub prompt: PromptSettings,

    /// Logging settings
    pub logging: LoggingSettings,

    /// Sales dataset (CSV) used by ingest and catalog commands
    pub data_path: Option<PathBuf>,

    /// Deadline for a whole agent request
    pub request_timeout_secs: u64,

    /// Explicit API key for the completion provider (never written to disk)
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Completion (LLM) provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletionSettings {
    /// groq, openai or ollama
    pub provider: String,
    pub model: String,
    /// Base URL; provider default when unset
    pub endpoint: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-call HTTP timeout
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "llama3-8b-8192".to_string(),
            endpoint: None,
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// ollama, openai or mock
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
    /// Vector length every provider must return
    pub dimension: usize,
    /// Texts per request
    pub batch_size: usize,
    /// Character budget per request
    pub max_batch_chars: usize,
    /// Batches in flight at once
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            endpoint: None,
            api_key_env: None,
            dimension: 384,
            batch_size: 32,
            max_batch_chars: 16_000,
            concurrency: 2,
            timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VectorStoreSettings {
    /// qdrant or memory
    pub backend: String,
    pub url: String,
    pub collection: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Upserts in flight at once while indexing
    pub upsert_concurrency: usize,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            backend: "qdrant".to_string(),
            url: "http://localhost:6333".to_string(),
            collection: "sales_data".to_string(),
            api_key_env: "QDRANT_API_KEY".to_string(),
            timeout_secs: 10,
            upsert_concurrency: 8,
        }
    }
}

/// Retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Results for typed retrieval
    pub top_k: usize,
    pub customer_limit: usize,
    pub product_limit: usize,
    pub territory_limit: usize,
    /// Answers whose best match scores below this are flagged low confidence
    pub confidence_threshold: f32,
    /// Hits scoring below this are discarded
    pub min_score: Option<f32>,
    /// Answer with empty context instead of failing when the index is down
    pub degrade_on_index_unavailable: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            customer_limit: 3,
            product_limit: 3,
            territory_limit: 2,
            confidence_threshold: 0.30,
            min_score: None,
            degrade_on_index_unavailable: false,
        }
    }
}

/// Prompt composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromptSettings {
    /// Upper bound for the rendered context section
    pub max_context_chars: usize,
    /// Directory with per-task template overrides; `.sales/prompts` when unset
    pub templates_dir: Option<PathBuf>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            max_context_chars: 6_000,
            templates_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

/// On-disk layout of `.sales/config.yaml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConfigFile {
    completion: Option<CompletionSettings>,
    embedding: Option<EmbeddingSettings>,
    vector_store: Option<VectorStoreSettings>,
    retrieval: Option<RetrievalSettings>,
    prompt: Option<PromptSettings>,
    logging: Option<LoggingSettings>,
    data_path: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            completion: CompletionSettings::default(),
            embedding: EmbeddingSettings::default(),
            vector_store: VectorStoreSettings::default(),
            retrieval: RetrievalSettings::default(),
            prompt: PromptSettings::default(),
            logging: LoggingSettings::default(),
            data_path: None,
            request_timeout_secs: 60,
            api_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the workspace config file and the
    /// process environment.
    ///
    /// Environment variables:
    /// - `SALES_WORKSPACE`, `SALES_CONFIG`: workspace root and config file
    /// - `SALES_LLM_PROVIDER`, `SALES_LLM_MODEL`, `SALES_API_KEY`
    /// - `SALES_EMBEDDING_PROVIDER`, `SALES_EMBEDDING_MODEL`
    /// - `SALES_VECTOR_BACKEND`, `SALES_COLLECTION`, `QDRANT_URL`
    /// - `OLLAMA_URL`: endpoint for any provider set to `ollama`
    /// - `SALES_DATA_PATH`, `SALES_REQUEST_TIMEOUT_SECS`
    /// - `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use sales_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Collection: {}", config.vector_store.collection);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None, |key| std::env::var(key).ok())
    }

    /// Load with an explicit workspace/config file and environment lookup.
    pub fn load_with<F>(
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        env: F,
    ) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ws) = workspace.or_else(|| env("SALES_WORKSPACE").map(PathBuf::from)) {
            config.workspace = ws;
        }
        config.config_file = config_file.or_else(|| env("SALES_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.sales_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env(env)?;
        Ok(config)
    }

    /// Merge a YAML config file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(completion) = file.completion {
            self.completion = completion;
        }
        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(vector_store) = file.vector_store {
            self.vector_store = vector_store;
        }
        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }
        if let Some(prompt) = file.prompt {
            self.prompt = prompt;
        }
        if let Some(logging) = file.logging {
            self.logging = logging;
        }
        if let Some(data_path) = file.data_path {
            self.data_path = Some(data_path);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout_secs = secs;
        }

        Ok(())
    }

    fn apply_env<F>(&mut self, env: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = env("SALES_LLM_PROVIDER") {
            self.completion.provider = provider;
        }
        if let Some(model) = env("SALES_LLM_MODEL") {
            self.completion.model = model;
        }
        if let Some(provider) = env("SALES_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = env("SALES_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(backend) = env("SALES_VECTOR_BACKEND") {
            self.vector_store.backend = backend;
        }
        if let Some(collection) = env("SALES_COLLECTION") {
            self.vector_store.collection = collection;
        }
        if let Some(url) = env("QDRANT_URL") {
            self.vector_store.url = url;
        }
        if let Some(url) = env("OLLAMA_URL") {
            if self.completion.provider == "ollama" {
                self.completion.endpoint = Some(url.clone());
            }
            if self.embedding.provider == "ollama" {
                self.embedding.endpoint = Some(url);
            }
        }
        if let Some(path) = env("SALES_DATA_PATH") {
            self.data_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = env("SALES_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs.parse().map_err(|_| {
                AppError::Config(format!("Invalid SALES_REQUEST_TIMEOUT_SECS: {}", secs))
            })?;
        }
        if let Some(key) = env("SALES_API_KEY") {
            self.api_key = Some(key);
        }
        if env("NO_COLOR").is_some() {
            self.logging.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over both the config file and environment.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.completion.provider = provider;
        }

        if let Some(model) = model {
            self.completion.model = model;
        }

        if let Some(log_level) = log_level {
            self.logging.level = Some(log_level);
        }

        if verbose {
            self.logging.verbose = true;
            if self.logging.level.is_none() {
                self.logging.level = Some("debug".to_string());
            }
        }

        if no_color {
            self.logging.no_color = true;
        }

        self
    }

    /// Get the path to the .sales directory.
    pub fn sales_dir(&self) -> PathBuf {
        self.workspace.join(SALES_DIR)
    }

    /// Directory holding prompt template overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        match self.prompt.templates_dir {
            Some(ref dir) if dir.is_absolute() => dir.clone(),
            Some(ref dir) => self.workspace.join(dir),
            None => self.sales_dir().join("prompts"),
        }
    }

    /// Ensure the .sales directory exists.
    pub fn ensure_sales_dir(&self) -> AppResult<()> {
        let dir = self.sales_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .sales directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve the dataset path against the workspace.
    pub fn resolved_data_path(&self) -> Option<PathBuf> {
        self.data_path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                self.workspace.join(p)
            }
        })
    }

    /// Resolve the completion API key (explicit key first, then the env var).
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }
        std::env::var(&self.completion.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }

    pub fn resolve_embedding_key(&self) -> Option<String> {
        self.embedding
            .api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.is_empty())
    }

    pub fn resolve_vector_store_key(&self) -> Option<String> {
        std::env::var(&self.vector_store.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }

    /// Validate provider names, numeric settings and required keys.
    pub fn validate(&self) -> AppResult<()> {
        check_known("completion provider", &self.completion.provider, &COMPLETION_PROVIDERS)?;
        check_known("embedding provider", &self.embedding.provider, &EMBEDDING_PROVIDERS)?;
        check_known("vector store backend", &self.vector_store.backend, &VECTOR_BACKENDS)?;

        if self.completion.provider != "ollama" && self.resolve_api_key().is_none() {
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.completion.api_key_env
            )));
        }

        if self.embedding.provider == "openai" && self.resolve_embedding_key().is_none() {
            return Err(AppError::Config(
                "The openai embedding provider requires embedding.apiKeyEnv to name a set variable"
                    .to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(AppError::Config(
                "embedding.dimension must be greater than zero".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 || self.embedding.max_batch_chars == 0 {
            return Err(AppError::Config(
                "embedding.batchSize and embedding.maxBatchChars must be greater than zero"
                    .to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.retrieval.confidence_threshold) {
            return Err(AppError::Config(format!(
                "retrieval.confidenceThreshold must be within [0, 1], got {}",
                self.retrieval.confidence_threshold
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be greater than zero".to_string(),
            ));
        }

        if self.prompt.max_context_chars == 0 {
            return Err(AppError::Config(
                "prompt.maxContextChars must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "requestTimeoutSecs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_known(what: &str, value: &str, known: &[&str]) -> AppResult<()> {
    if known.contains(&value) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {}: {}. Supported: {}",
            what,
            value,
            known.join(", ")
        )))
    }
}
