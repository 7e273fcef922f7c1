//! Dataset construction commands

use anyhow::{Context, Result};
use codebench_core::config::Config;
use codebench_datasets::{load_instances, CsnBuilder, SweBenchBuilder, SweBenchLevel};
use std::path::{Path, PathBuf};
use tracing::info;

/// Build per-language CSN datasets
pub fn run_csn(
    config: &Config,
    data_dir: &Path,
    languages: Vec<String>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let output_dir =
        output_dir.unwrap_or_else(|| PathBuf::from(&config.datasets.dataset_dir));

    let builder = CsnBuilder::new(data_dir, &output_dir, languages);
    let summary = builder.build().context("CSN dataset build failed")?;

    if summary.is_empty() {
        anyhow::bail!("No datasets were built; check --data-dir and --languages");
    }
    for (language, queries) in &summary {
        info!("csn_{language}: {queries} queries");
    }
    Ok(())
}

/// Build per-instance SWE-Bench datasets
#[allow(clippy::too_many_arguments)]
pub fn run_swebench(
    config: &Config,
    instances_path: &Path,
    level: SweBenchLevel,
    split: String,
    num_examples: Option<usize>,
    reuse_cached: bool,
    output_dir: Option<PathBuf>,
    scratch_dir: Option<PathBuf>,
) -> Result<()> {
    let output_dir =
        output_dir.unwrap_or_else(|| PathBuf::from(&config.datasets.dataset_dir));
    let scratch_dir =
        scratch_dir.unwrap_or_else(|| PathBuf::from(&config.datasets.scratch_dir));

    let instances = load_instances(instances_path)
        .with_context(|| format!("Failed to load instances from {}", instances_path.display()))?;
    if instances.is_empty() {
        anyhow::bail!("No instances found in {}", instances_path.display());
    }

    let builder = SweBenchBuilder::new(output_dir, scratch_dir, level)
        .split(split)
        .num_examples(num_examples)
        .reuse_cached(reuse_cached);

    let summary = builder
        .build(instances)
        .context("SWE-Bench dataset build failed")?;

    if summary.built == 0 && summary.skipped == 0 {
        anyhow::bail!("All {} instances failed to build", summary.failed);
    }
    Ok(())
}
