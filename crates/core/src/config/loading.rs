//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;

use super::defaults::*;
use super::{global_config_path, Config};

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `CODEBENCH_` and use double underscores
    /// for nested values. For example:
    /// - `CODEBENCH_EMBEDDINGS__MODEL=BAAI/bge-code-v1`
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        // Set section defaults explicitly (the config crate does not apply
        // serde defaults for missing sections)
        let builder = set_config_default(builder, "embeddings.provider", default_provider())?;
        let builder = set_config_default(builder, "embeddings.model", default_model())?;
        let builder = set_config_default(
            builder,
            "embeddings.texts_per_api_request",
            default_texts_per_api_request() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "embeddings.embedding_dimension",
            default_embedding_dimension() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "embeddings.max_concurrent_api_requests",
            default_max_concurrent_api_requests() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "embeddings.query_instruction",
            default_query_instruction(),
        )?;
        let builder = set_config_default(
            builder,
            "embeddings.retry_attempts",
            default_embedding_retry_attempts() as i64,
        )?;

        let builder = set_config_default(builder, "reranking.enabled", default_enable_reranking())?;
        let builder =
            set_config_default(builder, "reranking.provider", default_reranking_provider())?;
        let builder = set_config_default(builder, "reranking.model", default_reranking_model())?;
        let builder = set_config_default(
            builder,
            "reranking.candidates",
            default_reranking_candidates() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "reranking.timeout_secs",
            default_reranking_timeout_secs() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "reranking.max_concurrent_requests",
            default_reranking_max_concurrent_requests() as i64,
        )?;

        let builder = set_config_default(builder, "datasets.dataset_dir", default_dataset_dir())?;
        let builder = set_config_default(builder, "datasets.scratch_dir", default_scratch_dir())?;

        let builder = set_config_default(
            builder,
            "eval.k_values",
            default_k_values()
                .into_iter()
                .map(|k| k as i64)
                .collect::<Vec<_>>(),
        )?;
        let mut builder = set_config_default(
            builder,
            "eval.ranking_depth",
            default_ranking_depth() as i64,
        )?;

        // Add the config file if it exists
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        // Add environment variables with CODEBENCH_ prefix
        builder = builder.add_source(
            Environment::with_prefix("CODEBENCH")
                .separator("__")
                .try_parsing(true),
        );

        // Support the plain EMBEDDING_API_KEY variable used by the inference services
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            builder = builder
                .set_override("embeddings.api_key", key)
                .map_err(|e| Error::config(format!("Failed to set EMBEDDING_API_KEY: {e}")))?;
        }

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from a single file
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.codebench/config.toml or custom --config path)
    /// 3. Environment variables (CODEBENCH_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        Self::from_file(&path)
    }
}
