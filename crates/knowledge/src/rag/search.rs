//! Metadata filters for vector search.

use crate::types::{EntityProfile, EntityType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Restricts a search to matching profiles.
///
/// All set conditions must hold. Field conditions compare a profile's
/// metadata value exactly; numeric metadata is compared by its text form
/// here and as a number in the Qdrant clause.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Only profiles of this type
    pub entity_type: Option<EntityType>,

    /// Metadata field equals value (e.g. `territory = EMEA`)
    pub fields: BTreeMap<String, String>,

    /// Minimum similarity score
    pub min_score: Option<f32>,
}

impl SearchFilter {
    /// Create a new empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter to one entity type
    pub fn of_type(entity_type: EntityType) -> Self {
        Self::new().with_type(entity_type)
    }

    pub fn with_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    /// Require `metadata[field] == value`
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Set minimum relevance score
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Check if any filters are set
    pub fn has_filters(&self) -> bool {
        self.entity_type.is_some() || !self.fields.is_empty() || self.min_score.is_some()
    }

    /// Whether `profile` passes the type and field conditions.
    pub fn matches(&self, profile: &EntityProfile) -> bool {
        if let Some(t) = self.entity_type {
            if profile.entity_type != t {
                return false;
            }
        }

        self.fields.iter().all(|(field, expected)| {
            match profile.metadata.get(field) {
                Some(Value::String(s)) => s == expected,
                Some(Value::Number(n)) => n.to_string() == *expected,
                Some(Value::Bool(b)) => b.to_string() == *expected,
                _ => false,
            }
        })
    }

    /// Whether `score` passes the minimum score.
    pub fn accepts_score(&self, score: f32) -> bool {
        self.min_score.map_or(true, |min| score >= min)
    }

    /// Qdrant filter clause over the stored profile payload, `None` when
    /// there are no type or field conditions.
    pub fn to_qdrant(&self) -> Option<Value> {
        let mut must: Vec<Value> = Vec::new();
        if let Some(t) = self.entity_type {
            must.push(json!({"key": "type", "match": {"value": t.as_str()}}));
        }
        for (field, value) in &self.fields {
            must.push(field_condition(field, value));
        }

        if must.is_empty() {
            None
        } else {
            Some(json!({ "must": must }))
        }
    }
}

/// Qdrant condition on `metadata.<field>`. Integers and floats are sent as
/// numbers so numeric metadata matches as it does in the memory index;
/// Qdrant only matches floats through a range.
fn field_condition(field: &str, value: &str) -> Value {
    let key = format!("metadata.{}", field);
    if let Ok(n) = value.parse::<i64>() {
        return json!({"key": key, "match": {"value": n}});
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() => json!({"key": key, "range": {"gte": f, "lte": f}}),
        _ => json!({"key": key, "match": {"value": value}}),
    }
}
