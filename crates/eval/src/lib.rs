//! Retrieval evaluation for benchmark datasets
//!
//! Ranks benchmark corpora against queries with a bi-encoder (and optional
//! cross-encoder reranker), computes standard IR metrics, and produces
//! JSON/stdout reports.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod metrics;
pub mod report;
pub mod runner;
pub mod similarity;

pub use metrics::{QueryRanking, RetrievalEvaluator, RetrievalMetrics, SingleQueryMetrics};
pub use report::{EvalReport, LocalizationSummary, QueryReport};
pub use runner::EvalRunner;
pub use similarity::{cosine_similarity, rank_candidates};
