//! Configuration module for the codebench toolkit
//!
//! This module provides configuration structures and loading mechanisms for
//! benchmark construction and evaluation. Configuration can be loaded from
//! TOML files and/or environment variables.

mod defaults;
mod loading;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use defaults::*;

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.codebench/config.toml` and contains
/// user preferences that apply across all benchmark runs.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".codebench").join("config.toml"))
}

/// Main configuration structure for the codebench toolkit
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Embeddings configuration
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Reranking configuration
    #[serde(default)]
    pub reranking: RerankingConfig,

    /// Dataset construction configuration
    #[serde(default)]
    pub datasets: DatasetsConfig,

    /// Evaluation configuration
    #[serde(default)]
    pub eval: EvalConfig,
}

/// Configuration for embeddings generation
///
/// # Providers
/// - `localapi` (default): vLLM or any OpenAI-compatible embedding API
/// - `mock`: deterministic provider for testing
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Provider type: "localapi" (default), "mock"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Number of texts sent in a single embedding API request
    #[serde(default = "default_texts_per_api_request")]
    pub texts_per_api_request: usize,

    /// API base URL for the localapi provider
    #[serde(default = "default_api_base_url")]
    pub api_base_url: Option<String>,

    /// API key for authentication (or use EMBEDDING_API_KEY env var)
    pub api_key: Option<String>,

    /// Embedding dimension size
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Maximum concurrent embedding API requests
    #[serde(default = "default_max_concurrent_api_requests")]
    pub max_concurrent_api_requests: usize,

    /// Instruction prepended to query texts (BGE-style instructed models)
    #[serde(default = "default_query_instruction")]
    pub query_instruction: String,

    /// Number of retry attempts for failed embedding requests
    #[serde(default = "default_embedding_retry_attempts")]
    pub retry_attempts: usize,
}

impl std::fmt::Debug for EmbeddingsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingsConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("texts_per_api_request", &self.texts_per_api_request)
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***REDACTED***"))
            .field("embedding_dimension", &self.embedding_dimension)
            .field(
                "max_concurrent_api_requests",
                &self.max_concurrent_api_requests,
            )
            .field("query_instruction", &self.query_instruction)
            .field("retry_attempts", &self.retry_attempts)
            .finish()
    }
}

/// Configuration for reranking with cross-encoder models
#[derive(Clone, Serialize, Deserialize)]
pub struct RerankingConfig {
    /// Whether reranking is enabled (default: false)
    #[serde(default = "default_enable_reranking")]
    pub enabled: bool,

    /// Reranker provider type: "vllm"
    #[serde(default = "default_reranking_provider")]
    pub provider: String,

    /// Reranker model name
    #[serde(default = "default_reranking_model")]
    pub model: String,

    /// Number of candidates from the bi-encoder ranking to rerank
    #[serde(default = "default_reranking_candidates")]
    pub candidates: usize,

    /// API base URL for the reranker service
    pub api_base_url: Option<String>,

    /// API key for the reranker service
    pub api_key: Option<String>,

    /// Request timeout in seconds for reranking API calls (default: 15)
    #[serde(default = "default_reranking_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent reranking API requests (default: 16)
    #[serde(default = "default_reranking_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl std::fmt::Debug for RerankingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankingConfig")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("candidates", &self.candidates)
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***REDACTED***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .finish()
    }
}

/// Configuration for benchmark dataset construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetsConfig {
    /// Root directory where built datasets are written
    #[serde(default = "default_dataset_dir")]
    pub dataset_dir: String,

    /// Scratch directory for repository checkouts
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
}

/// Configuration for retrieval evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Cutoff ranks at which metrics are computed
    #[serde(default = "default_k_values")]
    pub k_values: Vec<usize>,

    /// Number of ranked candidates kept per query
    #[serde(default = "default_ranking_depth")]
    pub ranking_depth: usize,
}

// Default implementations

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            texts_per_api_request: default_texts_per_api_request(),
            api_base_url: default_api_base_url(),
            api_key: None,
            embedding_dimension: default_embedding_dimension(),
            max_concurrent_api_requests: default_max_concurrent_api_requests(),
            query_instruction: default_query_instruction(),
            retry_attempts: default_embedding_retry_attempts(),
        }
    }
}

impl Default for RerankingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enable_reranking(),
            provider: default_reranking_provider(),
            model: default_reranking_model(),
            candidates: default_reranking_candidates(),
            api_base_url: None,
            api_key: None,
            timeout_secs: default_reranking_timeout_secs(),
            max_concurrent_requests: default_reranking_max_concurrent_requests(),
        }
    }
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            dataset_dir: default_dataset_dir(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            k_values: default_k_values(),
            ranking_depth: default_ranking_depth(),
        }
    }
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate provider
        let valid_providers = ["localapi", "api", "mock"];
        if !valid_providers.contains(&self.embeddings.provider.as_str()) {
            return Err(Error::config(format!(
                "Invalid provider '{}'. Must be one of: {:?}",
                self.embeddings.provider, valid_providers
            )));
        }

        // Validate embedding_dimension
        if self.embeddings.embedding_dimension == 0 {
            return Err(Error::config(
                "embedding_dimension must be greater than 0".to_string(),
            ));
        }

        // Validate max_concurrent_api_requests
        if self.embeddings.max_concurrent_api_requests == 0 {
            return Err(Error::config(
                "embeddings.max_concurrent_api_requests must be greater than 0".to_string(),
            ));
        }
        if self.embeddings.max_concurrent_api_requests > 256 {
            return Err(Error::config(format!(
                "embeddings.max_concurrent_api_requests too large (max 256, got {})",
                self.embeddings.max_concurrent_api_requests
            )));
        }

        if self.embeddings.texts_per_api_request == 0 {
            return Err(Error::config(
                "embeddings.texts_per_api_request must be greater than 0".to_string(),
            ));
        }
        if self.embeddings.texts_per_api_request > 1000 {
            return Err(Error::config(format!(
                "embeddings.texts_per_api_request too large (max 1000, got {})",
                self.embeddings.texts_per_api_request
            )));
        }

        // Validate reranking configuration
        let valid_reranking_providers = ["vllm"];
        if !valid_reranking_providers.contains(&self.reranking.provider.as_str()) {
            return Err(Error::config(format!(
                "Invalid reranking provider '{}'. Must be one of: {:?}",
                self.reranking.provider, valid_reranking_providers
            )));
        }

        if self.reranking.enabled {
            if self.reranking.candidates == 0 {
                return Err(Error::config(
                    "reranking.candidates must be greater than 0".to_string(),
                ));
            }
            if self.reranking.candidates > 1000 {
                return Err(Error::config(format!(
                    "reranking.candidates too large (max 1000, got {})",
                    self.reranking.candidates
                )));
            }
        }

        // Validate eval configuration
        if self.eval.k_values.is_empty() {
            return Err(Error::config(
                "eval.k_values must not be empty".to_string(),
            ));
        }
        if self.eval.k_values.iter().any(|&k| k == 0) {
            return Err(Error::config(
                "eval.k_values entries must be greater than 0".to_string(),
            ));
        }
        if self.eval.ranking_depth == 0 {
            return Err(Error::config(
                "eval.ranking_depth must be greater than 0".to_string(),
            ));
        }
        if let Some(&max_k) = self.eval.k_values.iter().max() {
            if max_k > self.eval.ranking_depth {
                return Err(Error::config(format!(
                    "eval.ranking_depth ({}) must cover the largest k value ({})",
                    self.eval.ranking_depth, max_k
                )));
            }
        }

        if self.datasets.dataset_dir.is_empty() {
            return Err(Error::config(
                "datasets.dataset_dir must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Saves the configuration to a TOML file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, toml_string)
            .map_err(|e| Error::config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }
}
