//! codebench CLI - code-retrieval benchmark construction and evaluation
//!
//! This binary builds benchmark datasets (CodeSearchNet, SWE-Bench-Lite) in
//! the BEIR-style layout and evaluates embedding/reranking models on them.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod create;
mod evaluate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codebench_core::config::Config;
use codebench_datasets::SweBenchLevel;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codebench")]
#[command(about = "Code-retrieval benchmark construction and evaluation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build benchmark datasets
    #[command(subcommand)]
    Create(CreateCommands),
    /// Evaluate models on benchmark datasets
    #[command(subcommand)]
    Eval(EvalCommands),
}

#[derive(Subcommand)]
enum CreateCommands {
    /// Build per-language CodeSearchNet datasets from raw JSONL dumps
    Csn {
        /// Directory holding raw per-language CSN data
        #[arg(long, value_name = "DIR")]
        data_dir: PathBuf,

        /// Languages to build (default: python)
        #[arg(long, value_delimiter = ',', default_value = "python")]
        languages: Vec<String>,

        /// Output directory (default: datasets.dataset_dir from config)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Build per-instance SWE-Bench-Lite localization datasets
    Swebench {
        /// JSONL export of SWE-Bench instances
        #[arg(long, value_name = "FILE")]
        instances: PathBuf,

        /// Candidate pool granularity
        #[arg(long, value_enum, default_value_t = Level::Function)]
        level: Level,

        /// Dataset split label (affects directory naming)
        #[arg(long, default_value = "test")]
        split: String,

        /// Build only a random sample of this many instances
        #[arg(long)]
        num_examples: Option<usize>,

        /// Remove cached instance directories and rebuild from scratch
        #[arg(long)]
        rebuild: bool,

        /// Output directory (default: datasets.dataset_dir from config)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Scratch directory for repository checkouts
        #[arg(long, value_name = "DIR")]
        scratch_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum EvalCommands {
    /// Evaluate a model on one or more BEIR-style dataset directories
    Run {
        /// Dataset directories to evaluate
        #[arg(long, value_name = "DIR", required = true, num_args = 1..)]
        dataset: Vec<PathBuf>,

        /// Evaluate only the first N queries of each dataset
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Enable cross-encoder reranking regardless of config
        #[arg(long)]
        rerank: bool,

        /// Write the evaluation reports to this JSON file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
    /// Aggregate localization accuracy over per-instance SWE-Bench datasets
    Localization {
        /// Root directory containing the per-instance dataset directories
        #[arg(long, value_name = "DIR")]
        dataset_root: PathBuf,

        /// Candidate pool granularity the datasets were built at
        #[arg(long, value_enum, default_value_t = Level::Function)]
        level: Level,

        /// Dataset split the directories were built from
        #[arg(long, default_value = "test")]
        split: String,

        /// Write the localization summary to this JSON file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
}

/// Candidate pool granularity for SWE-Bench datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Level {
    File,
    Function,
}

impl From<Level> for SweBenchLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::File => SweBenchLevel::File,
            Level::Function => SweBenchLevel::Function,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Create(CreateCommands::Csn {
            data_dir,
            languages,
            output_dir,
        }) => create::run_csn(&config, &data_dir, languages, output_dir),
        Commands::Create(CreateCommands::Swebench {
            instances,
            level,
            split,
            num_examples,
            rebuild,
            output_dir,
            scratch_dir,
        }) => create::run_swebench(
            &config,
            &instances,
            level.into(),
            split,
            num_examples,
            !rebuild,
            output_dir,
            scratch_dir,
        ),
        Commands::Eval(EvalCommands::Run {
            dataset,
            limit,
            rerank,
            report,
        }) => evaluate::run_eval(&config, &dataset, limit, rerank, report.as_deref()).await,
        Commands::Eval(EvalCommands::Localization {
            dataset_root,
            level,
            split,
            report,
        }) => {
            evaluate::run_localization(
                &config,
                &dataset_root,
                level.into(),
                &split,
                report.as_deref(),
            )
            .await
        }
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!("codebench={level},codebench_core={level},codebench_datasets={level},codebench_embeddings={level},codebench_reranking={level},codebench_eval={level}"))
        .init();

    Ok(())
}
