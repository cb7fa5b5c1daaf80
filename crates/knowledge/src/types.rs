//! Sales knowledge type definitions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of aggregated entity that gets embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Customer,
    Product,
    Territory,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [
        EntityType::Customer,
        EntityType::Product,
        EntityType::Territory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Customer => "customer",
            EntityType::Product => "product",
            EntityType::Territory => "territory",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "customer" | "customers" => Some(EntityType::Customer),
            "product" | "products" => Some(EntityType::Product),
            "territory" | "territories" => Some(EntityType::Territory),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated summary of a customer, product or territory.
///
/// This is the unit that gets embedded and indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProfile {
    /// Stable identifier: `"<type>:<key>"`
    pub id: String,

    #[serde(rename = "type")]
    pub entity_type: EntityType,

    /// Customer name, `<line>_<code>` or territory name
    pub key: String,

    /// Human-readable description used for embedding
    pub text: String,

    /// Flat facts used for filtering and context formatting
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// SHA-256 of text and metadata; unchanged profiles are not re-embedded
    pub content_hash: String,
}

impl EntityProfile {
    pub fn new(
        entity_type: EntityType,
        key: impl Into<String>,
        text: impl Into<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        let key = key.into();
        let text = text.into();
        let content_hash = content_hash(&text, &metadata);
        Self {
            id: entity_id(entity_type, &key),
            entity_type,
            key,
            text,
            metadata,
            content_hash,
        }
    }

    /// String metadata field.
    pub fn meta_str(&self, field: &str) -> Option<&str> {
        self.metadata.get(field).and_then(|v| v.as_str())
    }

    /// Numeric metadata field, zero when absent.
    pub fn meta_f64(&self, field: &str) -> f64 {
        self.metadata
            .get(field)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }
}

/// Identifier for an entity of `entity_type` with `key`.
pub fn entity_id(entity_type: EntityType, key: &str) -> String {
    format!("{}:{}", entity_type.as_str(), key)
}

fn content_hash(text: &str, metadata: &BTreeMap<String, serde_json::Value>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([0u8]);
    // BTreeMap serializes in key order, so equal maps hash equally
    hasher.update(serde_json::to_string(metadata).unwrap_or_default().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedEntity {
    pub profile: EntityProfile,

    /// Cosine similarity to the query
    pub score: f32,
}

/// Ranked search hits, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub entries: Vec<RetrievedEntity>,
}

impl RetrievalResult {
    pub fn new(entries: Vec<RetrievedEntity>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Entity ids in rank order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.profile.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<f32> {
        self.entries.first().map(|e| e.score)
    }

    /// Keep only hits whose key contains `needle`, case-insensitively.
    pub fn retain_key_containing(&mut self, needle: &str) {
        let needle = needle.trim().to_lowercase();
        self.entries
            .retain(|e| e.profile.key.to_lowercase().contains(&needle));
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetrievedEntity> {
        self.entries.iter()
    }
}

/// Id and content hash of an indexed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub content_hash: String,
}

/// Point counts in the vector store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total: usize,
    pub customers: usize,
    pub products: usize,
    pub territories: usize,
}

impl IndexStats {
    pub fn count_for(&self, entity_type: EntityType) -> usize {
        match entity_type {
            EntityType::Customer => self.customers,
            EntityType::Product => self.products,
            EntityType::Territory => self.territories,
        }
    }

    pub fn add(&mut self, entity_type: EntityType, n: usize) {
        match entity_type {
            EntityType::Customer => self.customers += n,
            EntityType::Product => self.products += n,
            EntityType::Territory => self.territories += n,
        }
        self.total += n;
    }
}

/// Vector store reachability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHealth {
    pub backend: String,
    pub reachable: bool,
    pub collection_exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(pairs: &[(&str, serde_json::Value)]) -> BTreeMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_entity_id_format() {
        let profile = EntityProfile::new(EntityType::Customer, "Acme", "Acme text", BTreeMap::new());
        assert_eq!(profile.id, "customer:Acme");
        assert_eq!(entity_id(EntityType::Product, "Motorcycles_S10_1678"), "product:Motorcycles_S10_1678");
    }

    #[test]
    fn test_content_hash_tracks_text_and_metadata() {
        let a = EntityProfile::new(EntityType::Customer, "Acme", "t", meta(&[("total_sales", json!(1.0))]));
        let b = EntityProfile::new(EntityType::Customer, "Acme", "t", meta(&[("total_sales", json!(1.0))]));
        let c = EntityProfile::new(EntityType::Customer, "Acme", "t", meta(&[("total_sales", json!(2.0))]));
        let d = EntityProfile::new(EntityType::Customer, "Acme", "t2", meta(&[("total_sales", json!(1.0))]));

        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.content_hash, c.content_hash);
        assert_ne!(a.content_hash, d.content_hash);
        assert_eq!(a.content_hash.len(), 64);
    }

    #[test]
    fn test_entity_type_parse() {
        assert_eq!(EntityType::parse("Customers"), Some(EntityType::Customer));
        assert_eq!(EntityType::parse("territory"), Some(EntityType::Territory));
        assert_eq!(EntityType::parse("all"), None);
    }

    #[test]
    fn test_retain_key_containing_is_case_insensitive() {
        let hit = |key: &str, score| RetrievedEntity {
            profile: EntityProfile::new(EntityType::Customer, key, key, BTreeMap::new()),
            score,
        };
        let mut result = RetrievalResult::new(vec![
            hit("Acme Corp", 0.9),
            hit("Bolt Inc", 0.8),
            hit("ACME Europe", 0.7),
        ]);

        result.retain_key_containing("acme");
        assert_eq!(result.ids(), vec!["customer:Acme Corp", "customer:ACME Europe"]);
        assert_eq!(result.top_score(), Some(0.9));
    }

    #[test]
    fn test_profile_serializes_type_tag() {
        let profile = EntityProfile::new(EntityType::Territory, "EMEA", "EMEA", BTreeMap::new());
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["type"], "territory");
    }
}
