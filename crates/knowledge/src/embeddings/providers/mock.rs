//! Deterministic offline embeddings from hashed words and character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use sales_core::AppResult;
use std::collections::BTreeMap;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "who", "what", "our",
];

/// Provider for tests and offline runs.
///
/// Vectors are content-dependent and unit length, so texts sharing words
/// score higher than unrelated ones. Empty or all-stopword text maps to
/// the zero vector.
#[derive(Debug)]
pub struct MockProvider {
    dimension: usize,
}

impl MockProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str, seed: u64) -> usize {
        let hash = token
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(seed).wrapping_add(b as u64));
        (hash % self.dimension as u64) as usize
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();

        let mut freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *freq.entry(word).or_default() += 1;
        }

        for (word, n) in freq {
            let weight = n as f32;
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(&trigram, 37)] += weight.sqrt();
            }
            vector[self.bucket(word, 31)] += weight;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_vectors_are_unit_length() {
        let provider = MockProvider::new(384);
        let vectors = provider
            .embed_batch(&["Acme in EMEA".to_string(), "Classic Cars".to_string()])
            .await
            .unwrap();

        for v in &vectors {
            assert_eq!(v.len(), 384);
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-3);
        }
    }

    #[tokio::test]
    async fn test_deterministic_and_content_dependent() {
        let provider = MockProvider::new(64);
        let texts = vec![
            "Territory: EMEA".to_string(),
            "Territory: EMEA".to_string(),
            "Product: Motorcycles".to_string(),
        ];
        let v = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(v[0], v[1]);
        assert_ne!(v[0], v[2]);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let provider = MockProvider::new(384);
        let v = provider
            .embed_batch(&[
                "top customer in EMEA".to_string(),
                "Customer: Acme\nTerritory: EMEA".to_string(),
                "Product: Vintage Cars - S18_3232".to_string(),
            ])
            .await
            .unwrap();
        assert!(cosine(&v[0], &v[1]) > cosine(&v[0], &v[2]));
    }

    #[tokio::test]
    async fn test_stopwords_only_gives_zero_vector() {
        let provider = MockProvider::new(16);
        let v = provider.embed_batch(&["the and of".to_string()]).await.unwrap();
        assert!(v[0].iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_non_ascii_text() {
        let provider = MockProvider::new(32);
        let v = provider
            .embed_batch(&["Société Générale à Montréal".to_string()])
            .await
            .unwrap();
        assert_eq!(v[0].len(), 32);
    }
}
