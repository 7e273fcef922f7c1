//! Default values and functions for configuration

// Default constants
pub(crate) const DEFAULT_PROVIDER: &str = "localapi";
pub(crate) const DEFAULT_MODEL: &str = "BAAI/bge-code-v1";
pub(crate) const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/v1";
pub(crate) const DEFAULT_QUERY_INSTRUCTION: &str =
    "Given a natural language description, retrieve the code snippet that implements it";

pub(crate) fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

pub(crate) fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

pub(crate) fn default_api_base_url() -> Option<String> {
    Some(DEFAULT_API_BASE_URL.to_string())
}

pub(crate) fn default_texts_per_api_request() -> usize {
    64
}

pub(crate) fn default_embedding_dimension() -> usize {
    1024
}

pub(crate) fn default_max_concurrent_api_requests() -> usize {
    4 // Conservative to avoid vLLM OOM on large corpora
}

pub(crate) fn default_query_instruction() -> String {
    DEFAULT_QUERY_INSTRUCTION.to_string()
}

pub(crate) fn default_embedding_retry_attempts() -> usize {
    5
}

pub(crate) fn default_enable_reranking() -> bool {
    false
}

pub(crate) fn default_reranking_provider() -> String {
    "vllm".to_string()
}

pub(crate) fn default_reranking_model() -> String {
    "BAAI/bge-reranker-v2-m3".to_string()
}

pub(crate) fn default_reranking_candidates() -> usize {
    100
}

pub(crate) fn default_reranking_timeout_secs() -> u64 {
    15
}

pub(crate) fn default_reranking_max_concurrent_requests() -> usize {
    16
}

pub(crate) fn default_dataset_dir() -> String {
    "datasets".to_string()
}

pub(crate) fn default_scratch_dir() -> String {
    "scratch".to_string()
}

pub(crate) fn default_k_values() -> Vec<usize> {
    vec![1, 5, 10, 20, 100]
}

pub(crate) fn default_ranking_depth() -> usize {
    100
}
