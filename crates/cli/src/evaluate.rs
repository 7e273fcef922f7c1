//! Evaluation commands

use anyhow::{Context, Result};
use codebench_core::benchmark::BenchmarkDataset;
use codebench_core::config::Config;
use codebench_datasets::{dataset_name, SweBenchLevel};
use codebench_eval::{EvalReport, EvalRunner, LocalizationSummary};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Evaluate the configured model on one or more dataset directories
pub async fn run_eval(
    config: &Config,
    datasets: &[PathBuf],
    limit: Option<usize>,
    rerank: bool,
    report_path: Option<&Path>,
) -> Result<()> {
    let mut config = config.clone();
    if rerank {
        config.reranking.enabled = true;
    }

    let runner = EvalRunner::from_config(&config)
        .await
        .context("Failed to initialize evaluation runner")?;

    let mut reports = Vec::with_capacity(datasets.len());
    for dataset_dir in datasets {
        let mut dataset = BenchmarkDataset::load(dataset_dir)
            .with_context(|| format!("Failed to load dataset {}", dataset_dir.display()))?;
        if let Some(limit) = limit {
            dataset.queries.truncate(limit);
        }
        let report = runner
            .evaluate_dataset(&dataset)
            .await
            .with_context(|| format!("Evaluation failed for {}", dataset_dir.display()))?;
        report.print_summary();
        reports.push(report);
    }

    if let Some(path) = report_path {
        save_reports(&reports, path)?;
        info!("Wrote evaluation report to {}", path.display());
    }
    Ok(())
}

/// Aggregate localization accuracy over per-instance SWE-Bench datasets
pub async fn run_localization(
    config: &Config,
    dataset_root: &Path,
    level: SweBenchLevel,
    split: &str,
    report_path: Option<&Path>,
) -> Result<()> {
    let prefix = format!("{}_", dataset_name(split, level));
    let dirs = find_instance_dirs(dataset_root, &prefix)?;
    if dirs.is_empty() {
        anyhow::bail!(
            "No instance datasets matching '{}*' found under {}",
            prefix,
            dataset_root.display()
        );
    }
    info!("Evaluating {} instance datasets", dirs.len());

    let runner = EvalRunner::from_config(config)
        .await
        .context("Failed to initialize evaluation runner")?;

    let mut reports = Vec::with_capacity(dirs.len());
    for dir in &dirs {
        match runner.evaluate_path(dir).await {
            Ok(report) => reports.push(report),
            Err(e) => warn!("Skipping {}: {e}", dir.display()),
        }
    }

    let summary =
        LocalizationSummary::from_reports(level.as_str(), &reports, &config.eval.k_values);
    summary.print_summary();

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&summary)
            .context("Failed to serialize localization summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote localization summary to {}", path.display());
    }
    Ok(())
}

/// Instance dataset directories matching a dataset-name prefix, sorted by
/// name. The prefix ends in `_`, so `swe-bench-lite_` does not pick up
/// `swe-bench-lite-dev_*` or `swe-bench-lite-function_*` directories.
fn find_instance_dirs(dataset_root: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let entries = std::fs::read_dir(dataset_root)
        .with_context(|| format!("Failed to read {}", dataset_root.display()))?;

    for entry in entries {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(prefix) {
            dirs.push(entry.path());
        }
    }

    dirs.sort();
    Ok(dirs)
}

fn save_reports(reports: &[EvalReport], path: &Path) -> Result<()> {
    let json = match reports {
        [only] => serde_json::to_string_pretty(only),
        many => serde_json::to_string_pretty(many),
    }
    .context("Failed to serialize evaluation reports")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_instance_dirs_by_prefix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        for name in [
            "swe-bench-lite_django__django-1",
            "swe-bench-lite_django__django-2",
            "swe-bench-lite-dev_django__django-3",
            "swe-bench-lite-function_django__django-1",
            "csn_python",
        ] {
            std::fs::create_dir(root.join(name)).expect("mkdir");
        }

        let file_prefix = format!("{}_", dataset_name("test", SweBenchLevel::File));
        let file_dirs = find_instance_dirs(root, &file_prefix).expect("scan");
        // The dev split and the function level must not be swept in
        assert_eq!(file_dirs.len(), 2);

        let func_prefix = format!("{}_", dataset_name("test", SweBenchLevel::Function));
        let func_dirs = find_instance_dirs(root, &func_prefix).expect("scan");
        assert_eq!(func_dirs.len(), 1);

        let dev_prefix = format!("{}_", dataset_name("dev", SweBenchLevel::File));
        let dev_dirs = find_instance_dirs(root, &dev_prefix).expect("scan");
        assert_eq!(dev_dirs.len(), 1);
        assert!(dev_dirs[0]
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("swe-bench-lite-dev_"))
            .unwrap_or(false));
    }
}
