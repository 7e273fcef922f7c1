//! Reranker providers for cross-encoder reranking
//!
//! This crate provides reranking capabilities using cross-encoder models
//! to rescore candidate documents against a query.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use async_trait::async_trait;
use codebench_core::config::RerankingConfig;
use codebench_core::error::{Error, Result};
use std::sync::Arc;
use tracing::info;

pub mod error;
mod vllm;

pub use error::RerankingError;
pub use vllm::VllmRerankerProvider;

/// Sort scored documents by relevance score descending, with NaN values sorted to the end.
pub fn sort_scores_descending(scored_docs: &mut [(String, f32)]) {
    scored_docs.sort_by(|a, b| {
        let a_is_nan = a.1.is_nan();
        let b_is_nan = b.1.is_nan();
        match (a_is_nan, b_is_nan) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater, // NaN sorts to end
            (false, true) => std::cmp::Ordering::Less,    // NaN sorts to end
            (false, false) => b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal),
        }
    });
}

/// Trait for reranker providers
///
/// This trait defines the interface for reranking providers that use cross-encoder
/// models to rescore candidate documents against a query.
#[async_trait]
pub trait RerankerProvider: Send + Sync {
    /// Rerank documents by relevance to the query
    ///
    /// Scores all provided documents and returns them sorted by relevance.
    /// The caller is responsible for truncating to desired number of results.
    ///
    /// # Arguments
    /// * `query` - The search query text
    /// * `documents` - List of (document_id, document_content) tuples to rerank
    ///
    /// # Returns
    /// A vector of (document_id, relevance_score) tuples for all documents, sorted by descending relevance
    async fn rerank(&self, query: &str, documents: &[(String, &str)])
        -> Result<Vec<(String, f32)>>;
}

/// Create a new reranker provider based on configuration
///
/// # Arguments
/// * `config` - Reranking configuration including provider type
pub async fn create_reranker_provider(
    config: &RerankingConfig,
) -> Result<Arc<dyn RerankerProvider>> {
    match config.provider.as_str() {
        "vllm" => {
            let api_base_url = config
                .api_base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:8001/v1".to_string());

            info!("Creating vLLM reranker provider");
            let provider = vllm::VllmRerankerProvider::new(
                config.model.clone(),
                api_base_url,
                config.timeout_secs,
                config.max_concurrent_requests,
            )?;

            // Perform health check (non-blocking)
            provider.check_health().await;

            Ok(Arc::new(provider))
        }
        other => Err(Error::config(format!(
            "Unknown reranking provider: '{other}'. Valid providers: vllm"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sort_scores_descending() {
        let mut docs = vec![
            ("a".to_string(), 0.2),
            ("b".to_string(), 0.9),
            ("c".to_string(), 0.5),
        ];
        sort_scores_descending(&mut docs);
        let ids: Vec<&str> = docs.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sort_scores_nan_last() {
        let mut docs = vec![
            ("a".to_string(), f32::NAN),
            ("b".to_string(), 0.1),
            ("c".to_string(), f32::NAN),
            ("d".to_string(), 0.7),
        ];
        sort_scores_descending(&mut docs);
        assert_eq!(docs[0].0, "d");
        assert_eq!(docs[1].0, "b");
        assert!(docs[2].1.is_nan());
        assert!(docs[3].1.is_nan());
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let config = RerankingConfig {
            provider: "cohere".to_string(),
            ..RerankingConfig::default()
        };
        assert!(create_reranker_provider(&config).await.is_err());
    }
}
