//! Mock embedding provider for testing

use crate::provider::{EmbeddingProvider, EmbeddingTask};
use async_trait::async_trait;
use codebench_core::error::Result;

/// Mock embedding provider producing deterministic content-derived vectors
///
/// Embeddings are normalized byte histograms, so identical texts embed to
/// identical vectors and overlapping texts score higher under cosine
/// similarity than unrelated ones. This makes ranking tests discriminative
/// without a model service.
pub struct MockEmbeddingProvider {
    embedding_dim: usize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with specified embedding dimension
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.embedding_dim];
        for (pos, byte) in text.bytes().enumerate() {
            // Mix byte value with position so anagrams do not collide
            let bucket = (byte as usize * 31 + pos % 7) % self.embedding_dim;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_for_task(
        &self,
        texts: Vec<String>,
        _task: EmbeddingTask,
    ) -> Result<Vec<Option<Vec<f32>>>> {
        // No instruction prefix: queries and passages with the same text must
        // embed identically for ranking tests
        Ok(texts
            .iter()
            .map(|text| Some(self.embed_one(text)))
            .collect())
    }

    fn embedding_dimension(&self) -> usize {
        self.embedding_dim
    }

    fn max_sequence_length(&self) -> usize {
        32768
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_deterministic_embeddings() {
        let provider = MockEmbeddingProvider::new(64);
        let first = provider
            .embed(vec!["fn parse(input: &str)".to_string()])
            .await
            .expect("embed");
        let second = provider
            .embed(vec!["fn parse(input: &str)".to_string()])
            .await
            .expect("embed");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_similar_texts_score_higher() {
        let provider = MockEmbeddingProvider::new(64);
        let embeddings = provider
            .embed(vec![
                "def parse_config(path): return toml.load(path)".to_string(),
                "def parse_config(path): return toml.load(path)  # cached".to_string(),
                "SELECT count(*) FROM users WHERE active".to_string(),
            ])
            .await
            .expect("embed");

        let base = embeddings[0].as_ref().expect("vector");
        let near = embeddings[1].as_ref().expect("vector");
        let far = embeddings[2].as_ref().expect("vector");

        assert!(cosine(base, near) > cosine(base, far));
    }

    #[tokio::test]
    async fn test_vectors_are_normalized() {
        let provider = MockEmbeddingProvider::new(32);
        let embeddings = provider
            .embed(vec!["some text".to_string()])
            .await
            .expect("embed");
        let vector = embeddings[0].as_ref().expect("vector");
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
