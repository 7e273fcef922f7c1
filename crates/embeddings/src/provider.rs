//! Trait definition for embedding providers

use async_trait::async_trait;
use codebench_core::error::Result;

/// Role of a text in a retrieval task
///
/// Instructed embedding models (BGE family) expect queries to carry an
/// instruction prefix while passages are embedded verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    /// Natural-language search query
    Query,
    /// Candidate document (code snippet, file, or function)
    Passage,
}

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a list of texts
    ///
    /// Returns one entry per input text. Entries are `None` for texts that
    /// exceed the model's context window and were skipped.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Option<Vec<f32>>>> {
        self.embed_for_task(texts, EmbeddingTask::Passage).await
    }

    /// Generate embeddings for texts playing a specific retrieval role
    async fn embed_for_task(
        &self,
        texts: Vec<String>,
        task: EmbeddingTask,
    ) -> Result<Vec<Option<Vec<f32>>>>;

    /// Get the embedding dimension
    fn embedding_dimension(&self) -> usize;

    /// Get the maximum text length (in characters) accepted per input
    fn max_sequence_length(&self) -> usize;
}
