//! Evaluation runner
//!
//! Embeds the corpus and queries, ranks candidates by cosine similarity,
//! optionally reranks the head of each ranking with a cross-encoder, and
//! aggregates retrieval metrics into a report.

use crate::metrics::{QueryRanking, RetrievalEvaluator, RetrievalMetrics};
use crate::report::{EvalReport, QueryReport};
use crate::similarity::rank_candidates;
use codebench_core::benchmark::BenchmarkDataset;
use codebench_core::config::Config;
use codebench_core::error::Result;
use codebench_embeddings::{
    create_embedding_manager_from_app_config, EmbeddingManager, EmbeddingTask,
};
use codebench_reranking::{create_reranker_provider, RerankerProvider};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs retrieval evaluation over BEIR-style datasets
pub struct EvalRunner {
    embeddings: Arc<EmbeddingManager>,
    reranker: Option<Arc<dyn RerankerProvider>>,
    reranker_model: Option<String>,
    evaluator: RetrievalEvaluator,
    ranking_depth: usize,
    rerank_candidates: usize,
}

impl EvalRunner {
    /// Create a runner with an explicit embedding manager
    pub fn new(
        embeddings: Arc<EmbeddingManager>,
        k_values: Vec<usize>,
        ranking_depth: usize,
    ) -> Self {
        Self {
            embeddings,
            reranker: None,
            reranker_model: None,
            evaluator: RetrievalEvaluator::with_k_values(k_values),
            ranking_depth,
            rerank_candidates: 100,
        }
    }

    /// Attach a cross-encoder reranker applied to the head of each ranking
    pub fn with_reranker(
        mut self,
        reranker: Arc<dyn RerankerProvider>,
        model: impl Into<String>,
        candidates: usize,
    ) -> Self {
        self.reranker = Some(reranker);
        self.reranker_model = Some(model.into());
        self.rerank_candidates = candidates;
        self
    }

    /// Build a runner from application configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embeddings = create_embedding_manager_from_app_config(&config.embeddings).await?;
        let mut runner = Self::new(
            embeddings,
            config.eval.k_values.clone(),
            config.eval.ranking_depth,
        );

        if config.reranking.enabled {
            let reranker = create_reranker_provider(&config.reranking).await?;
            runner = runner.with_reranker(
                reranker,
                config.reranking.model.clone(),
                config.reranking.candidates,
            );
        }

        Ok(runner)
    }

    /// Evaluate a dataset loaded from a directory
    pub async fn evaluate_path(&self, dir: &Path) -> Result<EvalReport> {
        let dataset = BenchmarkDataset::load(dir)?;
        self.evaluate_dataset(&dataset).await
    }

    /// Evaluate an in-memory dataset
    pub async fn evaluate_dataset(&self, dataset: &BenchmarkDataset) -> Result<EvalReport> {
        info!(
            "Evaluating dataset '{}': {} queries, {} docs",
            dataset.name,
            dataset.queries.len(),
            dataset.corpus.len()
        );

        if dataset.queries.is_empty() || dataset.corpus.is_empty() {
            warn!("Dataset '{}' is empty, reporting zeroed metrics", dataset.name);
            return Ok(EvalReport {
                dataset: dataset.name.clone(),
                model: self.embeddings.model_version().to_string(),
                reranker: self.reranker_model.clone(),
                num_queries: dataset.queries.len(),
                num_docs: dataset.corpus.len(),
                metrics: RetrievalMetrics::default(),
                per_query: Vec::new(),
            });
        }

        // Embed the corpus as passages
        let doc_texts: Vec<String> = dataset.corpus.iter().map(|d| d.text.clone()).collect();
        let doc_embeddings = self
            .embeddings
            .embed_for_task(doc_texts, EmbeddingTask::Passage)
            .await?;
        let documents: Vec<(String, Option<Vec<f32>>)> = dataset
            .corpus
            .iter()
            .zip(doc_embeddings)
            .map(|(doc, embedding)| (doc.id.clone(), embedding))
            .collect();

        // Embed the queries with the instruction prefix
        let query_texts: Vec<String> = dataset.queries.iter().map(|q| q.text.clone()).collect();
        let query_embeddings = self
            .embeddings
            .embed_for_task(query_texts, EmbeddingTask::Query)
            .await?;

        let doc_content: HashMap<&str, &str> = dataset
            .corpus
            .iter()
            .map(|d| (d.id.as_str(), d.text.as_str()))
            .collect();
        let relevance = dataset.relevance_map();

        let mut rankings = Vec::with_capacity(dataset.queries.len());
        let mut per_query = Vec::with_capacity(dataset.queries.len());

        for (query, embedding) in dataset.queries.iter().zip(query_embeddings) {
            let ranked = match embedding {
                Some(embedding) => {
                    let ranked = rank_candidates(&embedding, &documents, self.ranking_depth);
                    match self.reranker {
                        Some(ref reranker) => {
                            self.rerank_head(reranker.as_ref(), &query.text, ranked, &doc_content)
                                .await?
                        }
                        None => ranked,
                    }
                }
                None => {
                    warn!("Query '{}' exceeded context budget, left unranked", query.id);
                    Vec::new()
                }
            };

            let relevant: Vec<String> = relevance
                .get(query.id.as_str())
                .map(|ids| ids.iter().map(|id| id.to_string()).collect())
                .unwrap_or_default();

            let ranking = QueryRanking::new(
                query.id.clone(),
                ranked.iter().map(|(id, _)| id.clone()).collect(),
                relevant,
            );

            per_query.push(QueryReport {
                query_id: query.id.clone(),
                first_relevant_rank: ranking.first_relevant_rank(),
                top_score: ranked.first().map(|(_, score)| *score),
                hit: ranking.has_hit(),
            });
            rankings.push(ranking);
        }

        let metrics = self.evaluator.evaluate(&rankings);
        debug!("Metrics for '{}': {metrics}", dataset.name);

        Ok(EvalReport {
            dataset: dataset.name.clone(),
            model: self.embeddings.model_version().to_string(),
            reranker: self.reranker_model.clone(),
            num_queries: dataset.queries.len(),
            num_docs: dataset.corpus.len(),
            metrics,
            per_query,
        })
    }

    /// Rescore the top candidates with the cross-encoder and reorder the head
    /// of the ranking; the tail keeps its bi-encoder order.
    async fn rerank_head(
        &self,
        reranker: &dyn RerankerProvider,
        query_text: &str,
        ranked: Vec<(String, f32)>,
        doc_content: &HashMap<&str, &str>,
    ) -> Result<Vec<(String, f32)>> {
        let head_len = self.rerank_candidates.min(ranked.len());
        if head_len == 0 {
            return Ok(ranked);
        }

        let head: Vec<(String, &str)> = ranked[..head_len]
            .iter()
            .filter_map(|(id, _)| {
                doc_content
                    .get(id.as_str())
                    .map(|content| (id.clone(), *content))
            })
            .collect();

        let reranked = reranker.rerank(query_text, &head).await?;
        debug!("Reranked {} of {} candidates", reranked.len(), ranked.len());

        let mut result = reranked;
        result.extend_from_slice(&ranked[head_len..]);
        Ok(result)
    }
}
