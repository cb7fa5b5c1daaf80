//! Qdrant vector index over the REST API.
//!
//! Point ids are UUIDv5 of the entity id, so re-upserting an entity replaces
//! its point. The payload is the serialized [`EntityProfile`] plus the
//! upsert time, which breaks score ties in favour of recent upserts.

use crate::rag::search::SearchFilter;
use crate::types::{
    EntityProfile, EntityType, IndexEntry, IndexHealth, IndexStats, RetrievalResult,
    RetrievedEntity,
};
use crate::vector_index::VectorIndex;
use reqwest::{Method, StatusCode};
use sales_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

const SCROLL_PAGE: usize = 256;

/// Stored payload.
#[derive(Debug, Deserialize)]
struct PointPayload {
    #[serde(flatten)]
    profile: EntityProfile,
    #[serde(default)]
    indexed_at: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    payload: Option<PointPayload>,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
    next_page_offset: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ScrollPoint {
    payload: Option<ScrollPayload>,
}

#[derive(Debug, Deserialize)]
struct ScrollPayload {
    id: String,
    #[serde(default)]
    content_hash: String,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: usize,
}

/// Qdrant point id for an entity id.
pub fn point_id(entity_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, entity_id.as_bytes())
}

/// Qdrant-backed index over one collection.
pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
}

impl QdrantIndex {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>, api_key: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            api_key: api_key.map(str::to_string),
        }
    }

    /// Bound every HTTP call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, path)
    }

    /// Send a request; `Ok(None)` when the collection does not exist.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> AppResult<Option<T>> {
        let url = self.url(path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!("Qdrant {} {}", method, url);
        let response = request.send().await.map_err(|e| {
            AppError::IndexUnavailable(format!("Failed to reach Qdrant at {}: {}", self.base_url, e))
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("Qdrant API error ({}): {}", status, error_text);
            return Err(if status.is_server_error() {
                AppError::IndexUnavailable(message)
            } else {
                AppError::Other(message)
            });
        }

        let body: ApiResponse<T> = response.json().await.map_err(|e| {
            AppError::Serialization(format!("Failed to parse Qdrant response: {}", e))
        })?;
        Ok(Some(body.result))
    }

    async fn count(&self, filter: Option<Value>) -> AppResult<usize> {
        let mut body = json!({ "exact": true });
        if let Some(filter) = filter {
            body["filter"] = filter;
        }
        let result: Option<CountResult> = self.call(Method::POST, "/points/count", Some(body)).await?;
        Ok(result.map_or(0, |r| r.count))
    }

    fn missing_collection(&self) -> AppError {
        AppError::IndexUnavailable(format!(
            "Qdrant collection '{}' does not exist",
            self.collection
        ))
    }
}

#[async_trait::async_trait]
impl VectorIndex for QdrantIndex {
    fn backend(&self) -> &str {
        "qdrant"
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn ensure_collection(&self, dimension: usize) -> AppResult<()> {
        let existing: Option<Value> = self.call(Method::GET, "", None).await?;
        if existing.is_some() {
            return Ok(());
        }

        tracing::info!(
            "Creating Qdrant collection '{}' ({} dimensions, cosine)",
            self.collection,
            dimension
        );
        let body = json!({ "vectors": { "size": dimension, "distance": "Cosine" } });
        let created: Option<Value> = self.call(Method::PUT, "", Some(body)).await?;
        created.map(|_| ()).ok_or_else(|| self.missing_collection())
    }

    async fn upsert(&self, profile: &EntityProfile, vector: &[f32]) -> AppResult<()> {
        let mut payload = serde_json::to_value(profile)?;
        payload["indexed_at"] = json!(chrono::Utc::now().timestamp_millis());

        let body = json!({
            "points": [{
                "id": point_id(&profile.id).to_string(),
                "vector": vector,
                "payload": payload,
            }]
        });

        let result: Option<Value> = self
            .call(Method::PUT, "/points?wait=true", Some(body))
            .await?;
        result.map(|_| ()).ok_or_else(|| self.missing_collection())
    }

    #[instrument(skip(self, vector, filter), fields(collection = %self.collection))]
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> AppResult<RetrievalResult> {
        if top_k == 0 {
            return Ok(RetrievalResult::empty());
        }

        let mut body = json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });
        if let Some(clause) = filter.and_then(SearchFilter::to_qdrant) {
            body["filter"] = clause;
        }
        if let Some(min) = filter.and_then(|f| f.min_score) {
            body["score_threshold"] = json!(min);
        }

        let points: Vec<ScoredPoint> = self
            .call(Method::POST, "/points/search", Some(body))
            .await?
            .unwrap_or_default();

        let mut hits: Vec<(f32, i64, EntityProfile)> = points
            .into_iter()
            .filter_map(|p| p.payload.map(|pl| (p.score, pl.indexed_at, pl.profile)))
            .collect();
        hits.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));

        Ok(RetrievalResult::new(
            hits.into_iter()
                .map(|(score, _, profile)| RetrievedEntity { profile, score })
                .collect(),
        ))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let body = json!({ "points": [point_id(id).to_string()] });
        let _: Option<Value> = self
            .call(Method::POST, "/points/delete?wait=true", Some(body))
            .await?;
        Ok(())
    }

    async fn list_entries(&self) -> AppResult<Vec<IndexEntry>> {
        let mut entries = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": SCROLL_PAGE,
                "with_payload": ["id", "content_hash"],
                "with_vector": false,
            });
            if let Some(offset) = offset.take() {
                body["offset"] = offset;
            }

            let Some(page) = self
                .call::<ScrollResult>(Method::POST, "/points/scroll", Some(body))
                .await?
            else {
                break;
            };

            entries.extend(page.points.into_iter().filter_map(|p| {
                p.payload.map(|pl| IndexEntry {
                    id: pl.id,
                    content_hash: pl.content_hash,
                })
            }));

            match page.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    async fn stats(&self) -> AppResult<IndexStats> {
        let mut stats = IndexStats::default();
        for entity_type in EntityType::ALL {
            let filter = SearchFilter::of_type(entity_type).to_qdrant();
            let n = self.count(filter).await?;
            stats.add(entity_type, n);
        }
        Ok(stats)
    }

    async fn reset(&self) -> AppResult<()> {
        tracing::info!("Deleting Qdrant collection '{}'", self.collection);
        let _: Option<Value> = self.call(Method::DELETE, "", None).await?;
        Ok(())
    }

    async fn health(&self) -> IndexHealth {
        let probe: AppResult<Option<Value>> = self.call(Method::GET, "", None).await;
        let (reachable, collection_exists) = match probe {
            Ok(found) => (true, found.is_some()),
            Err(AppError::IndexUnavailable(e)) => {
                tracing::warn!("Qdrant health check failed: {}", e);
                (false, false)
            }
            Err(e) => {
                tracing::warn!("Qdrant health check failed: {}", e);
                (true, false)
            }
        };

        IndexHealth {
            backend: "qdrant".to_string(),
            reachable,
            collection_exists,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::collections::BTreeMap;

    fn profile(key: &str) -> EntityProfile {
        let mut metadata = BTreeMap::new();
        metadata.insert("territory".to_string(), json!("EMEA"));
        EntityProfile::new(EntityType::Customer, key, format!("Customer: {}", key), metadata)
    }

    fn scored(key: &str, score: f32, indexed_at: i64) -> Value {
        let mut payload = serde_json::to_value(profile(key)).unwrap();
        payload["indexed_at"] = json!(indexed_at);
        json!({"id": point_id(&format!("customer:{}", key)).to_string(), "version": 1, "score": score, "payload": payload})
    }

    #[test]
    fn test_point_id_is_stable() {
        assert_eq!(point_id("customer:Acme"), point_id("customer:Acme"));
        assert_ne!(point_id("customer:Acme"), point_id("customer:Bolt Inc"));
    }

    #[tokio::test]
    async fn test_upsert_sends_uuid_and_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/collections/sales_data/points?wait=true")
            .match_header("api-key", "secret")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(point_id("customer:Acme").to_string()),
                Matcher::Regex(r#""type":"customer""#.to_string()),
                Matcher::Regex(r#""indexed_at":\d+"#.to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"result":{"operation_id":1,"status":"completed"},"status":"ok","time":0.001}"#)
            .create_async()
            .await;

        let index = QdrantIndex::new(server.url(), "sales_data", Some("secret"));
        index.upsert(&profile("Acme"), &[1.0, 0.0]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_parses_payload_and_breaks_ties() {
        let mut server = Server::new_async().await;
        let body = json!({
            "result": [scored("Acme", 0.9, 100), scored("Bolt Inc", 0.9, 200), scored("Cinco SA", 0.4, 300)],
            "status": "ok",
            "time": 0.002
        });
        let _mock = server
            .mock("POST", "/collections/sales_data/points/search")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""limit":3"#.to_string()),
                Matcher::Regex(r#""key":"type","match":\{"value":"customer"\}"#.to_string()),
            ]))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let index = QdrantIndex::new(server.url(), "sales_data", None);
        let filter = SearchFilter::of_type(EntityType::Customer);
        let result = index.search(&[1.0, 0.0], 3, Some(&filter)).await.unwrap();

        assert_eq!(
            result.ids(),
            vec!["customer:Bolt Inc", "customer:Acme", "customer:Cinco SA"]
        );
        assert_eq!(result.entries[0].profile.meta_str("territory"), Some("EMEA"));
    }

    #[tokio::test]
    async fn test_search_missing_collection_is_empty() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/collections/sales_data/points/search")
            .with_status(404)
            .with_body(r#"{"status":{"error":"Not found: Collection `sales_data` doesn't exist!"}}"#)
            .create_async()
            .await;

        let index = QdrantIndex::new(server.url(), "sales_data", None);
        assert!(index.search(&[1.0], 5, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_index_unavailable() {
        let index = QdrantIndex::new("http://127.0.0.1:1", "sales_data", None)
            .with_timeout(Duration::from_secs(2))
            .unwrap();

        let err = index.search(&[1.0], 5, None).await.unwrap_err();
        assert!(matches!(err, AppError::IndexUnavailable(_)));
        assert_eq!(err.status_code(), 503);

        let health = index.health().await;
        assert!(!health.reachable);
    }

    #[tokio::test]
    async fn test_server_error_is_index_unavailable() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/collections/sales_data/points/search")
            .with_status(503)
            .with_body("overloaded")
            .expect(1)
            .create_async()
            .await;

        let index = QdrantIndex::new(server.url(), "sales_data", None);
        let err = index.search(&[1.0], 5, None).await.unwrap_err();
        assert!(matches!(err, AppError::IndexUnavailable(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ensure_collection_creates_when_missing() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/collections/sales_data")
            .with_status(404)
            .with_body(r#"{"status":{"error":"Not found"}}"#)
            .create_async()
            .await;
        let create = server
            .mock("PUT", "/collections/sales_data")
            .match_body(Matcher::Json(
                json!({"vectors": {"size": 384, "distance": "Cosine"}}),
            ))
            .with_status(200)
            .with_body(r#"{"result":true,"status":"ok","time":0.1}"#)
            .create_async()
            .await;

        let index = QdrantIndex::new(server.url(), "sales_data", None);
        index.ensure_collection(384).await.unwrap();
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_entries_reads_ids_and_hashes() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/collections/sales_data/points/scroll")
            .match_body(Matcher::Regex(r#""with_vector":false"#.to_string()))
            .with_status(200)
            .with_body(
                json!({"result": {
                    "points": [
                        {"id": "a", "payload": {"id": "territory:NA", "content_hash": "h2"}},
                        {"id": "b", "payload": {"id": "customer:Acme", "content_hash": "h1"}}
                    ],
                    "next_page_offset": null
                }})
                .to_string(),
            )
            .create_async()
            .await;

        let index = QdrantIndex::new(server.url(), "sales_data", None);
        let entries = index.list_entries().await.unwrap();
        assert_eq!(
            entries,
            vec![
                IndexEntry { id: "customer:Acme".to_string(), content_hash: "h1".to_string() },
                IndexEntry { id: "territory:NA".to_string(), content_hash: "h2".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_stats_counts_per_type() {
        let mut server = Server::new_async().await;
        for (t, n) in [("customer", 3), ("product", 5), ("territory", 2)] {
            server
                .mock("POST", "/collections/sales_data/points/count")
                .match_body(Matcher::Regex(format!(r#""value":"{}""#, t)))
                .with_status(200)
                .with_body(json!({"result": {"count": n}, "status": "ok"}).to_string())
                .create_async()
                .await;
        }

        let index = QdrantIndex::new(server.url(), "sales_data", None);
        let stats = index.stats().await.unwrap();
        assert_eq!(stats.total, 10);
        assert_eq!(stats.products, 5);
    }
}
