//! End-to-end tests of the agent pipeline over a small sales dataset.
//!
//! Retrieval runs for real (mock embeddings, in-memory index); only the
//! completion service is replaced by a recording client.

use sales_agent::{AgentSettings, SalesAgent, TaskRequest};
use sales_core::config::EmbeddingSettings;
use sales_core::{AppError, AppResult};
use sales_knowledge::{
    parse_csv, ContextRetriever, EmbeddingClient, EntityProfile, EntityType, Indexer, MemoryIndex,
    QdrantIndex, SalesProfiles, VectorIndex,
};
use sales_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use sales_prompt::builder::LOW_CONFIDENCE_CAUTION;
use sales_prompt::{PromptComposer, TaskKind};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SALES_CSV: &str = "\
ORDERNUMBER,QUANTITYORDERED,PRICEEACH,SALES,ORDERDATE,STATUS,PRODUCTLINE,PRODUCTCODE,CUSTOMERNAME,CITY,COUNTRY,TERRITORY,DEALSIZE
10100,30,95.7,2871,1/6/2003 0:00,Shipped,Classic Cars,S10_1949,Acme,Paris,France,EMEA,Medium
10101,50,100,5000,2/6/2003 0:00,Shipped,Classic Cars,S10_1949,Acme,Paris,France,EMEA,Medium
10102,20,80,1600,3/6/2003 0:00,Shipped,Motorcycles,S10_1678,Bolt Inc,NYC,USA,NA,Small
10103,25,60,1500,4/6/2003 0:00,Shipped,Ships,S24_2011,Cinco SA,Tokyo,Japan,APAC,Small
";

/// Completion client that records every request and answers with a fixed text.
struct RecordingLlm {
    requests: Mutex<Vec<LlmRequest>>,
    answer: String,
    truncated: bool,
    delay: Duration,
}

impl RecordingLlm {
    fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            answer: answer.to_string(),
            truncated: false,
            delay: Duration::ZERO,
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last(&self) -> LlmRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(LlmResponse {
            content: self.answer.clone(),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
            truncated: self.truncated,
        })
    }
}

fn embeddings() -> EmbeddingClient {
    let settings = EmbeddingSettings {
        provider: "mock".to_string(),
        dimension: 256,
        ..EmbeddingSettings::default()
    };
    EmbeddingClient::from_settings(&settings, None).unwrap()
}

async fn indexed() -> (Arc<MemoryIndex>, Indexer) {
    let dataset = parse_csv(SALES_CSV).unwrap();
    let profiles = SalesProfiles::build(&dataset.records).entity_profiles();

    let index = Arc::new(MemoryIndex::new());
    let indexer = Indexer::new(embeddings(), index.clone(), 4);
    indexer.index_profiles(&profiles).await.unwrap();
    (index, indexer)
}

fn agent_over(index: Arc<dyn VectorIndex>, llm: Arc<RecordingLlm>, settings: AgentSettings) -> SalesAgent {
    let retriever = ContextRetriever::new(embeddings(), index);
    let composer = PromptComposer::new(20_000, 0.30).unwrap();
    SalesAgent::new(retriever, composer, llm, settings)
}

async fn agent(llm: Arc<RecordingLlm>) -> SalesAgent {
    let (index, _) = indexed().await;
    agent_over(index, llm, AgentSettings::default())
}

#[tokio::test]
async fn test_territory_filter_grounds_answer_in_that_territory() {
    let llm = RecordingLlm::answering("Acme is the top customer in EMEA.");
    let agent = agent(llm.clone()).await;

    let response = agent
        .general_query("top customer in EMEA", None, Some("EMEA"))
        .await
        .unwrap();

    assert_eq!(response.task, TaskKind::GeneralQuery);
    assert_eq!(response.context_ids_of("customer"), vec!["customer:Acme"]);
    assert!(response
        .context_ids
        .iter()
        .all(|id| !id.contains("Bolt") && !id.contains("Cinco")));

    let prompt = llm.last().prompt;
    assert!(prompt.contains("Acme"));
    assert!(!prompt.contains("Bolt Inc"));
    assert!(!prompt.contains("Cinco SA"));
    assert_eq!(response.answer, "Acme is the top customer in EMEA.");
}

#[tokio::test]
async fn test_absent_customer_fails_before_completion() {
    let llm = RecordingLlm::answering("unused");
    let agent = agent(llm.clone()).await;

    let err = agent.customer_analysis("Zeta Corp").await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.status_code(), 400);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_customer_analysis_keeps_matching_customer_only() {
    let llm = RecordingLlm::answering("Acme buys classic cars.");
    let agent = agent(llm.clone()).await;

    let response = agent.customer_analysis("acme").await.unwrap();

    assert_eq!(response.context_ids, vec!["customer:Acme"]);
    assert_eq!(response.query, "Complete analysis of customer acme");
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_customer_analysis_finds_customer_ranked_below_top_k() {
    let mut profiles = vec![EntityProfile::new(
        EntityType::Customer,
        "Zed Ltd",
        "Customer Zed Ltd buys ships in Oslo.",
        BTreeMap::new(),
    )];
    for n in 0..8 {
        let name = format!("Decoy {}", n);
        let text = format!("{}: complete analysis customer complete analysis customer", name);
        profiles.push(EntityProfile::new(EntityType::Customer, &name, &text, BTreeMap::new()));
    }

    let index = Arc::new(MemoryIndex::new());
    Indexer::new(embeddings(), index.clone(), 4)
        .index_profiles(&profiles)
        .await
        .unwrap();
    assert_eq!(index.stats().await.unwrap().customers, 9);

    let llm = RecordingLlm::answering("Zed Ltd buys ships.");
    let agent = agent_over(index, llm.clone(), AgentSettings::default());
    assert!(agent.settings().top_k < 9);

    let response = agent.customer_analysis("Zed Ltd").await.unwrap();

    assert_eq!(response.context_ids, vec!["customer:Zed Ltd"]);
    assert!(llm.last().prompt.contains("Zed Ltd buys ships in Oslo."));
}

#[tokio::test]
async fn test_empty_index_answers_with_low_confidence() {
    let llm = RecordingLlm::answering("I have no data on that.");
    let agent = agent_over(Arc::new(MemoryIndex::new()), llm.clone(), AgentSettings::default());

    let response = agent.product_recommendation("small deals").await.unwrap();

    assert!(response.low_confidence);
    assert!(response.context_ids.is_empty());
    assert_eq!(response.top_score, None);
    let system = llm.last().system.unwrap();
    assert!(system.contains(LOW_CONFIDENCE_CAUTION));
}

#[tokio::test]
async fn test_unknown_territory_is_low_confidence_not_error() {
    let llm = RecordingLlm::answering("No LATAM data available.");
    let agent = agent(llm.clone()).await;

    let response = agent.territory_analysis("LATAM").await.unwrap();

    assert!(response.low_confidence);
    assert!(response.context_ids.is_empty());
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_pitch_uses_every_entity_type() {
    let llm = RecordingLlm::answering("Dear Acme...");
    let agent = agent(llm.clone()).await;

    let response = agent
        .pitch_generation("Acme", Some("Classic Cars"))
        .await
        .unwrap();

    assert_eq!(response.task, TaskKind::PitchGeneration);
    assert!(!response.context_ids_of("customer").is_empty());
    assert!(!response.context_ids_of("product").is_empty());
    assert!(!response.context_ids_of("territory").is_empty());
}

#[tokio::test]
async fn test_repeated_requests_are_deterministic() {
    let llm = RecordingLlm::answering("Same answer.");
    let agent = agent(llm.clone()).await;

    let first = agent.general_query("classic cars sales", None, None).await.unwrap();
    let first_prompt = llm.last();
    let second = agent.general_query("classic cars sales", None, None).await.unwrap();
    let second_prompt = llm.last();

    assert_eq!(first.context_ids, second.context_ids);
    assert_eq!(first_prompt.prompt, second_prompt.prompt);
    assert_eq!(first_prompt.system, second_prompt.system);
    assert_ne!(first.request_id, second.request_id);
}

#[tokio::test]
async fn test_deleted_entity_never_appears_in_context() {
    let llm = RecordingLlm::answering("ok");
    let (index, indexer) = indexed().await;
    indexer.remove("customer:Acme").await.unwrap();
    let agent = agent_over(index, llm, AgentSettings::default());

    let response = agent.general_query("Acme classic cars", None, None).await.unwrap();

    assert!(!response.context_ids.contains(&"customer:Acme".to_string()));
}

#[tokio::test]
async fn test_unreachable_index_is_surfaced_by_default() {
    let llm = RecordingLlm::answering("unused");
    let index = Arc::new(QdrantIndex::new("http://127.0.0.1:9", "sales_data", None));
    let agent = agent_over(index, llm.clone(), AgentSettings::default());

    let err = agent.general_query("best customers", None, None).await.unwrap_err();

    assert!(matches!(err, AppError::IndexUnavailable(_)));
    assert_eq!(err.status_code(), 503);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_unreachable_index_degrades_when_enabled() {
    let llm = RecordingLlm::answering("Answering without data.");
    let index = Arc::new(QdrantIndex::new("http://127.0.0.1:9", "sales_data", None));
    let settings = AgentSettings {
        degrade_on_index_unavailable: true,
        ..AgentSettings::default()
    };
    let agent = agent_over(index, llm.clone(), settings);

    let response = agent.general_query("best customers", None, None).await.unwrap();

    assert!(response.low_confidence);
    assert!(response.context_ids.is_empty());
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_blank_model_answer_is_completion_error() {
    let llm = RecordingLlm::answering("   \n");
    let agent = agent(llm).await;

    let err = agent.product_recommendation("classic cars").await.unwrap_err();

    assert!(matches!(err, AppError::CompletionService { .. }));
}

#[tokio::test]
async fn test_answer_is_trimmed_and_truncation_reported() {
    let llm = Arc::new(RecordingLlm {
        requests: Mutex::new(Vec::new()),
        answer: "  Partial answer  ".to_string(),
        truncated: true,
        delay: Duration::ZERO,
    });
    let agent = agent(llm).await;

    let response = agent.product_recommendation("classic cars").await.unwrap();

    assert_eq!(response.answer, "Partial answer");
    assert!(response.truncated);
}

#[tokio::test]
async fn test_slow_completion_times_out() {
    let llm = Arc::new(RecordingLlm {
        requests: Mutex::new(Vec::new()),
        answer: "too late".to_string(),
        truncated: false,
        delay: Duration::from_secs(5),
    });
    let (index, _) = indexed().await;
    let settings = AgentSettings {
        request_timeout: Duration::from_millis(50),
        ..AgentSettings::default()
    };
    let agent = agent_over(index, llm, settings);

    let err = agent.general_query("best customers", None, None).await.unwrap_err();

    assert!(matches!(err, AppError::Timeout(_)));
    assert_eq!(err.status_code(), 504);
}

#[tokio::test]
async fn test_blank_query_is_rejected_without_calls() {
    let llm = RecordingLlm::answering("unused");
    let agent = agent(llm.clone()).await;

    let err = agent.handle(TaskRequest::general("   ")).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(llm.calls(), 0);
}
