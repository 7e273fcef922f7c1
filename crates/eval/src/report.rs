//! Evaluation reports
//!
//! JSON-serializable results of an evaluation run, plus a human-readable
//! summary printer and the localization aggregation used for per-instance
//! SWE-Bench datasets.

use crate::metrics::RetrievalMetrics;
use codebench_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-query outcome in an evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReport {
    pub query_id: String,
    /// Rank of the first relevant document (1-based), if retrieved
    pub first_relevant_rank: Option<usize>,
    /// Score of the top-ranked document, if any document was ranked
    pub top_score: Option<f32>,
    /// Whether any relevant document appeared in the ranking
    pub hit: bool,
}

/// Full result of evaluating one dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    /// Dataset name (directory basename)
    pub dataset: String,
    /// Embedding model evaluated
    pub model: String,
    /// Reranker model, when reranking was enabled
    pub reranker: Option<String>,
    pub num_queries: usize,
    pub num_docs: usize,
    pub metrics: RetrievalMetrics,
    pub per_query: Vec<QueryReport>,
}

impl EvalReport {
    /// Write the report as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::dataset(format!("Failed to serialize report: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a previously saved report
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::parse(path.display().to_string(), e.to_string()))
    }

    /// Print a human-readable summary to stdout
    pub fn print_summary(&self) {
        println!("Dataset: {}", self.dataset);
        println!("Model: {}", self.model);
        if let Some(ref reranker) = self.reranker {
            println!("Reranker: {reranker}");
        }
        println!("Corpus size: {}", self.num_docs);
        println!("{}", self.metrics);
    }
}

/// Localization accuracy aggregated over per-instance SWE-Bench datasets
///
/// Each instance dataset has a single query; accuracy@k is the fraction of
/// instances whose first relevant document ranked within the top k.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationSummary {
    pub level: String,
    pub num_instances: usize,
    /// (k, fraction of instances localized within top k)
    pub accuracy: Vec<(usize, f64)>,
    /// Mean reciprocal rank over instances
    pub mrr: f64,
}

impl LocalizationSummary {
    /// Aggregate per-instance reports into localization accuracy
    pub fn from_reports(level: impl Into<String>, reports: &[EvalReport], k_values: &[usize]) -> Self {
        let ranks: Vec<Option<usize>> = reports
            .iter()
            .flat_map(|r| r.per_query.iter().map(|q| q.first_relevant_rank))
            .collect();

        let n = ranks.len();
        let accuracy = k_values
            .iter()
            .map(|&k| {
                let hits = ranks
                    .iter()
                    .filter(|rank| rank.map(|r| r <= k).unwrap_or(false))
                    .count();
                let frac = if n == 0 { 0.0 } else { hits as f64 / n as f64 };
                (k, frac)
            })
            .collect();

        let mrr = if n == 0 {
            0.0
        } else {
            ranks
                .iter()
                .map(|rank| rank.map(|r| 1.0 / r as f64).unwrap_or(0.0))
                .sum::<f64>()
                / n as f64
        };

        Self {
            level: level.into(),
            num_instances: n,
            accuracy,
            mrr,
        }
    }

    /// Print a human-readable summary to stdout
    pub fn print_summary(&self) {
        println!(
            "Localization ({} level, {} instances):",
            self.level, self.num_instances
        );
        println!("  MRR: {:.4}", self.mrr);
        for (k, acc) in &self.accuracy {
            println!("  Acc@{}: {:.4}", k, acc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report_with_rank(rank: Option<usize>) -> EvalReport {
        EvalReport {
            dataset: "swe-bench-lite_demo-1".to_string(),
            model: "test-model".to_string(),
            reranker: None,
            num_queries: 1,
            num_docs: 10,
            metrics: RetrievalMetrics::default(),
            per_query: vec![QueryReport {
                query_id: "demo-1".to_string(),
                first_relevant_rank: rank,
                top_score: Some(0.9),
                hit: rank.is_some(),
            }],
        }
    }

    #[test]
    fn test_localization_accuracy() {
        let reports = vec![
            report_with_rank(Some(1)),
            report_with_rank(Some(4)),
            report_with_rank(None),
        ];
        let summary = LocalizationSummary::from_reports("file", &reports, &[1, 5]);

        assert_eq!(summary.num_instances, 3);
        assert!((summary.accuracy[0].1 - 1.0 / 3.0).abs() < 1e-9);
        assert!((summary.accuracy[1].1 - 2.0 / 3.0).abs() < 1e-9);
        assert!((summary.mrr - (1.0 + 0.25) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_localization_empty() {
        let summary = LocalizationSummary::from_reports("function", &[], &[1, 5]);
        assert_eq!(summary.num_instances, 0);
        assert_eq!(summary.accuracy, vec![(1, 0.0), (5, 0.0)]);
    }

    #[test]
    fn test_report_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");

        let report = report_with_rank(Some(2));
        report.save(&path).expect("save");

        let loaded = EvalReport::load(&path).expect("load");
        assert_eq!(loaded.dataset, report.dataset);
        assert_eq!(loaded.per_query.len(), 1);
        assert_eq!(loaded.per_query[0].first_relevant_rank, Some(2));
    }
}
