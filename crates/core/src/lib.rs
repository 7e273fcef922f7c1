//! Core types for the codebench retrieval benchmark toolkit
//!
//! This crate provides the foundational abstractions used throughout the
//! codebench system, including:
//!
//! - **Benchmark datasets**: queries, corpus documents, and relevance judgments
//!   in the BEIR-style on-disk layout
//! - **Configuration**: layered configuration management
//! - **Error handling**: unified error types
//!

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod benchmark;
pub mod config;
pub mod error;

// Re-export main types for convenience
pub use benchmark::{BenchmarkDataset, CorpusDoc, QrelEntry, Query};
pub use config::{Config, DatasetsConfig, EmbeddingsConfig, EvalConfig, RerankingConfig};
pub use error::{Error, Result, ResultExt};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::benchmark::{BenchmarkDataset, CorpusDoc, QrelEntry, Query};
    pub use crate::config::Config;
    pub use crate::error::{Result, ResultExt};
}
