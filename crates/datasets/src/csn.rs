//! CodeSearchNet dataset builder
//!
//! Converts raw per-language CodeSearchNet JSONL records into BEIR-style
//! dataset directories. The docstring becomes the query, the function code
//! becomes the corpus document, and each query has exactly one relevant doc.

use codebench_core::benchmark::{BenchmarkDataset, CorpusDoc, QrelEntry, Query};
use codebench_core::error::{Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One raw CodeSearchNet record.
///
/// The function source appears under different keys across dump vintages
/// (`code`, `function`, `original_string`), and some records carry several of
/// them at once, so each is parsed separately.
#[derive(Debug, Clone, Deserialize)]
pub struct CsnRecord {
    /// Natural-language docstring used as the query text
    pub docstring: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    function: Option<String>,
    #[serde(default)]
    original_string: Option<String>,
    /// Qualified function name
    #[serde(default)]
    pub func_name: Option<String>,
    /// Path of the source file inside its repository
    #[serde(default)]
    pub path: Option<String>,
    /// Source repository
    #[serde(default)]
    pub repo: Option<String>,
}

impl CsnRecord {
    /// Function source used as the corpus document text
    pub fn code(&self) -> &str {
        self.code
            .as_deref()
            .or(self.function.as_deref())
            .or(self.original_string.as_deref())
            .unwrap_or("")
    }
}

/// Builder for per-language CSN datasets
pub struct CsnBuilder {
    data_dir: PathBuf,
    output_dir: PathBuf,
    languages: Vec<String>,
}

impl CsnBuilder {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        languages: Vec<String>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
            languages,
        }
    }

    /// Build one dataset directory per language.
    ///
    /// Returns (language, query count) pairs for the datasets written.
    pub fn build(&self) -> Result<Vec<(String, usize)>> {
        let mut summary = Vec::new();

        for language in &self.languages {
            let records = self.read_language_records(language)?;
            if records.is_empty() {
                warn!("No usable records found for language '{language}', skipping");
                continue;
            }

            let dataset = build_language_dataset(language, &records);
            let out_dir = self.output_dir.join(format!("csn_{language}"));
            dataset.save(&out_dir)?;

            info!(
                "Wrote {} queries / {} docs to {}",
                dataset.queries.len(),
                dataset.corpus.len(),
                out_dir.display()
            );
            summary.push((language.clone(), dataset.queries.len()));
        }

        Ok(summary)
    }

    fn read_language_records(&self, language: &str) -> Result<Vec<CsnRecord>> {
        let mut files: Vec<PathBuf> = Vec::new();

        let single = self.data_dir.join(format!("{language}.jsonl"));
        if single.is_file() {
            files.push(single);
        }

        let pattern = self.data_dir.join(language).join("**").join("*.jsonl");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| Error::dataset("Non-UTF8 data directory path".to_string()))?
            .to_string();
        for entry in glob::glob(&pattern)
            .map_err(|e| Error::dataset(format!("Invalid glob pattern: {e}")))?
        {
            match entry {
                Ok(path) => files.push(path),
                Err(e) => warn!("Skipping unreadable path: {e}"),
            }
        }

        files.sort();

        let mut records = Vec::new();
        for file in &files {
            read_records_lenient(file, &mut records)?;
        }
        Ok(records)
    }
}

/// Read CSN records from a JSONL file, skipping malformed lines with a warning.
///
/// Raw CodeSearchNet dumps occasionally contain truncated lines; one bad
/// record should not abort a multi-million-line build.
fn read_records_lenient(path: &Path, out: &mut Vec<CsnRecord>) -> Result<()> {
    let file = File::open(path)
        .map_err(|e| Error::dataset(format!("Failed to open {}: {e}", path.display())))?;
    let reader = BufReader::new(file);

    let mut skipped = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CsnRecord>(&line) {
            Ok(record) => {
                if record.docstring.trim().is_empty() || record.code().trim().is_empty() {
                    skipped += 1;
                } else {
                    out.push(record);
                }
            }
            Err(e) => {
                skipped += 1;
                warn!("{}:{}: skipping malformed record: {e}", path.display(), line_no + 1);
            }
        }
    }

    if skipped > 0 {
        warn!(
            "Skipped {skipped} empty or malformed records in {}",
            path.display()
        );
    }
    Ok(())
}

fn build_language_dataset(language: &str, records: &[CsnRecord]) -> BenchmarkDataset {
    let mut queries = Vec::with_capacity(records.len());
    let mut corpus = Vec::with_capacity(records.len());
    let mut qrels = Vec::with_capacity(records.len());

    for (idx, record) in records.iter().enumerate() {
        let query_id = format!("{language}_q{idx}");
        let doc_id = format!("{language}_d{idx}");

        let title = record
            .func_name
            .clone()
            .or_else(|| record.path.clone())
            .unwrap_or_default();

        queries.push(Query {
            id: query_id.clone(),
            text: record.docstring.clone(),
            metadata: serde_json::json!({}),
        });
        corpus.push(CorpusDoc {
            id: doc_id.clone(),
            title,
            text: record.code().to_string(),
            metadata: serde_json::json!({}),
        });
        qrels.push(QrelEntry {
            query_id,
            corpus_id: doc_id,
            score: 1,
        });
    }

    BenchmarkDataset {
        name: format!("csn_{language}"),
        queries,
        corpus,
        qrels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_raw_file(dir: &Path, language: &str, lines: &[&str]) {
        let lang_dir = dir.join(language);
        std::fs::create_dir_all(&lang_dir).expect("mkdir");
        let mut file = File::create(lang_dir.join("train.jsonl")).expect("create");
        for line in lines {
            writeln!(file, "{line}").expect("write");
        }
    }

    #[test]
    fn test_build_single_language() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_raw_file(
            dir.path(),
            "python",
            &[
                r#"{"docstring": "Add two numbers", "code": "def add(a, b):\n    return a + b", "func_name": "add"}"#,
                r#"{"docstring": "Negate", "function": "def neg(a):\n    return -a", "func_name": "neg"}"#,
            ],
        );

        let out = dir.path().join("datasets");
        let builder = CsnBuilder::new(dir.path(), &out, vec!["python".to_string()]);
        let summary = builder.build().expect("build");
        assert_eq!(summary, vec![("python".to_string(), 2)]);

        let dataset = BenchmarkDataset::load(&out.join("csn_python")).expect("load");
        assert_eq!(dataset.queries.len(), 2);
        assert_eq!(dataset.corpus.len(), 2);
        assert_eq!(dataset.qrels.len(), 2);
        assert_eq!(dataset.qrels[0].query_id, "python_q0");
        assert_eq!(dataset.qrels[0].corpus_id, "python_d0");
    }

    #[test]
    fn test_malformed_and_empty_records_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_raw_file(
            dir.path(),
            "go",
            &[
                r#"{"docstring": "Ok", "code": "func ok() {}"}"#,
                r#"{"docstring": "", "code": "func empty() {}"}"#,
                "{not json",
            ],
        );

        let out = dir.path().join("datasets");
        let builder = CsnBuilder::new(dir.path(), &out, vec!["go".to_string()]);
        let summary = builder.build().expect("build");
        assert_eq!(summary, vec![("go".to_string(), 1)]);
    }

    #[test]
    fn test_record_with_multiple_code_keys() {
        let record: CsnRecord = serde_json::from_str(
            r##"{"docstring": "Add", "code": "def add(): pass", "original_string": "# comment\ndef add(): pass"}"##,
        )
        .expect("parse");
        assert_eq!(record.code(), "def add(): pass");
    }

    #[test]
    fn test_missing_language_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("datasets");
        let builder = CsnBuilder::new(dir.path(), &out, vec!["ruby".to_string()]);
        let summary = builder.build().expect("build");
        assert!(summary.is_empty());
        assert!(!out.join("csn_ruby").exists());
    }
}
