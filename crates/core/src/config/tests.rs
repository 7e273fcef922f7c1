//! Tests for configuration module

use super::*;
use crate::error::{Error, Result};
use std::io::Write;
use tempfile::NamedTempFile;

fn create_temp_config_file(content: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .map_err(|e| Error::config(format!("Failed to create temp file: {e}")))?;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::config(format!("Failed to write temp file: {e}")))?;
    file.flush()
        .map_err(|e| Error::config(format!("Failed to flush temp file: {e}")))?;
    Ok(file)
}

#[test]
fn test_from_toml_str_valid() {
    let toml = r#"
        [embeddings]
        provider = "localapi"
        model = "nomic-embed-text-v1.5"
        embedding_dimension = 768

        [reranking]
        enabled = true
        candidates = 50
    "#;

    let config = Config::from_toml_str(toml).expect("Failed to parse valid TOML");
    assert_eq!(config.embeddings.provider, "localapi");
    assert_eq!(config.embeddings.embedding_dimension, 768);
    assert!(config.reranking.enabled);
    assert_eq!(config.reranking.candidates, 50);
}

#[test]
fn test_from_toml_str_minimal() {
    let config = Config::from_toml_str("").expect("Failed to parse minimal TOML");
    // Check defaults are applied
    assert_eq!(config.embeddings.provider, "localapi");
    assert_eq!(config.reranking.provider, "vllm");
    assert_eq!(config.datasets.dataset_dir, "datasets");
    assert_eq!(config.eval.k_values, vec![1, 5, 10, 20, 100]);
}

#[test]
fn test_from_toml_str_invalid_syntax() {
    let toml = r#"
        [embeddings
        provider = "localapi"
    "#;

    let result = Config::from_toml_str(toml);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Failed to parse TOML"));
}

#[test]
fn test_validate_valid_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_invalid_provider() {
    let toml = r#"
        [embeddings]
        provider = "invalid_provider"
    "#;

    let config = Config::from_toml_str(toml).expect("Failed to parse TOML");
    let result = config.validate();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Invalid provider"));
}

#[test]
fn test_validate_zero_dimension() {
    let toml = r#"
        [embeddings]
        embedding_dimension = 0
    "#;

    let config = Config::from_toml_str(toml).expect("Failed to parse TOML");
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_ranking_depth_covers_k() {
    let toml = r#"
        [eval]
        k_values = [1, 5, 200]
        ranking_depth = 100
    "#;

    let config = Config::from_toml_str(toml).expect("Failed to parse TOML");
    let result = config.validate();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("ranking_depth"));
}

#[test]
fn test_from_file_applies_defaults_for_missing_sections() {
    let file = create_temp_config_file(
        r#"
        [embeddings]
        model = "custom-model"
    "#,
    )
    .expect("temp config");

    let config = Config::from_file(file.path()).expect("Failed to load config file");
    assert_eq!(config.embeddings.model, "custom-model");
    // Untouched sections fall back to defaults
    assert_eq!(config.reranking.provider, "vllm");
    assert_eq!(config.eval.ranking_depth, 100);
}

#[test]
fn test_from_file_missing_file_uses_defaults() {
    let config = Config::from_file(std::path::Path::new("/nonexistent/codebench.toml"))
        .expect("Missing file should fall back to defaults");
    assert_eq!(config.embeddings.provider, "localapi");
}

#[test]
fn test_save_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");

    let config = Config::default();
    config.save(&path).expect("Failed to save config");

    let reloaded = Config::from_file(&path).expect("Failed to reload config");
    assert_eq!(reloaded.embeddings.model, config.embeddings.model);
    assert_eq!(reloaded.eval.k_values, config.eval.k_values);
}
