//! Benchmark dataset model and on-disk layout
//!
//! Datasets use the BEIR-style directory layout shared by COIR tasks and the
//! builders in this workspace:
//!
//! ```text
//! <dataset>/
//!   queries.jsonl        one JSON query per line
//!   corpus.jsonl         one JSON candidate document per line
//!   qrels/test.tsv       relevance judgments (query-id, corpus-id, score)
//! ```

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// A natural-language query with ground-truth relevance in the qrels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    /// Unique query identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Query text
    pub text: String,
    /// Free-form metadata carried through from the source benchmark
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A candidate code artifact to rank (function, file, or patch context)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusDoc {
    /// Unique document identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Display title (file path or qualified name; may be empty)
    #[serde(default)]
    pub title: String,
    /// Document content
    pub text: String,
    /// Free-form metadata carried through from the source benchmark
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A single relevance judgment row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QrelEntry {
    /// Query identifier
    #[serde(rename = "query-id")]
    pub query_id: String,
    /// Relevant corpus document identifier
    #[serde(rename = "corpus-id")]
    pub corpus_id: String,
    /// Relevance grade (1 for all benchmarks handled here)
    pub score: u32,
}

/// An in-memory benchmark dataset
#[derive(Debug, Clone)]
pub struct BenchmarkDataset {
    /// Dataset name (directory basename)
    pub name: String,
    pub queries: Vec<Query>,
    pub corpus: Vec<CorpusDoc>,
    pub qrels: Vec<QrelEntry>,
}

impl BenchmarkDataset {
    /// Load a dataset from a directory in the standard layout.
    ///
    /// Qrels rows referencing unknown query or corpus ids are dropped with a
    /// warning rather than failing the load; COIR task exports occasionally
    /// carry judgments for filtered-out documents.
    pub fn load(dir: &Path) -> Result<Self> {
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dataset")
            .to_string();

        let queries: Vec<Query> = read_jsonl(&dir.join("queries.jsonl"))?;
        let corpus: Vec<CorpusDoc> = read_jsonl(&dir.join("corpus.jsonl"))?;
        let qrels = read_qrels(&dir.join("qrels").join("test.tsv"))?;

        let query_ids: HashSet<&str> = queries.iter().map(|q| q.id.as_str()).collect();
        let corpus_ids: HashSet<&str> = corpus.iter().map(|d| d.id.as_str()).collect();

        let mut valid = Vec::with_capacity(qrels.len());
        let mut dropped = 0usize;
        for entry in qrels {
            if query_ids.contains(entry.query_id.as_str())
                && corpus_ids.contains(entry.corpus_id.as_str())
            {
                valid.push(entry);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(
                "Dropped {dropped} qrels rows referencing unknown ids in dataset '{name}'"
            );
        }

        Ok(Self {
            name,
            queries,
            corpus,
            qrels: valid,
        })
    }

    /// Save the dataset to a directory in the standard layout
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir.join("qrels"))?;

        write_jsonl(&dir.join("queries.jsonl"), &self.queries)?;
        write_jsonl(&dir.join("corpus.jsonl"), &self.corpus)?;
        write_qrels(&dir.join("qrels").join("test.tsv"), &self.qrels)?;

        Ok(())
    }

    /// Relevant corpus ids for a query, per the qrels
    pub fn relevant_for(&self, query_id: &str) -> HashSet<&str> {
        self.qrels
            .iter()
            .filter(|e| e.query_id == query_id && e.score > 0)
            .map(|e| e.corpus_id.as_str())
            .collect()
    }

    /// Map from query id to relevant corpus ids
    pub fn relevance_map(&self) -> HashMap<&str, HashSet<&str>> {
        let mut map: HashMap<&str, HashSet<&str>> = HashMap::new();
        for entry in &self.qrels {
            if entry.score > 0 {
                map.entry(entry.query_id.as_str())
                    .or_default()
                    .insert(entry.corpus_id.as_str());
            }
        }
        map
    }
}

/// Read a JSONL file, one value per non-empty line
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)
        .map_err(|e| Error::dataset(format!("Failed to open {}: {e}", path.display())))?;
    let reader = BufReader::new(file);

    let mut items = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|e| {
            Error::parse(
                path.display().to_string(),
                format!("line {}: {e}", line_no + 1),
            )
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Write values to a JSONL file, one per line
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::dataset(format!("Failed to create {}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    for item in items {
        let line = serde_json::to_string(item)
            .map_err(|e| Error::dataset(format!("Failed to serialize record: {e}")))?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a qrels TSV file with a `query-id\tcorpus-id\tscore` header
pub fn read_qrels(path: &Path) -> Result<Vec<QrelEntry>> {
    let file = File::open(path)
        .map_err(|e| Error::dataset(format!("Failed to open {}: {e}", path.display())))?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Skip the header row
        if line_no == 0 && line.starts_with("query-id") {
            continue;
        }
        let mut fields = line.split('\t');
        let (query_id, corpus_id, score) = match (fields.next(), fields.next(), fields.next()) {
            (Some(q), Some(c), Some(s)) => (q, c, s),
            _ => {
                return Err(Error::parse(
                    path.display().to_string(),
                    format!("line {}: expected 3 tab-separated fields", line_no + 1),
                ))
            }
        };
        let score: u32 = score.trim().parse().map_err(|e| {
            Error::parse(
                path.display().to_string(),
                format!("line {}: invalid score: {e}", line_no + 1),
            )
        })?;
        entries.push(QrelEntry {
            query_id: query_id.to_string(),
            corpus_id: corpus_id.to_string(),
            score,
        });
    }
    Ok(entries)
}

/// Write qrels to a TSV file with header
pub fn write_qrels(path: &Path, entries: &[QrelEntry]) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::dataset(format!("Failed to create {}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "query-id\tcorpus-id\tscore")?;
    for entry in entries {
        writeln!(
            writer,
            "{}\t{}\t{}",
            entry.query_id, entry.corpus_id, entry.score
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_dataset() -> BenchmarkDataset {
        BenchmarkDataset {
            name: "sample".to_string(),
            queries: vec![
                Query {
                    id: "q1".to_string(),
                    text: "parse a config file".to_string(),
                    metadata: serde_json::json!({}),
                },
                Query {
                    id: "q2".to_string(),
                    text: "sort scores descending".to_string(),
                    metadata: serde_json::json!({}),
                },
            ],
            corpus: vec![
                CorpusDoc {
                    id: "d1".to_string(),
                    title: "config.py".to_string(),
                    text: "def parse_config(path): ...".to_string(),
                    metadata: serde_json::json!({}),
                },
                CorpusDoc {
                    id: "d2".to_string(),
                    title: "sort.py".to_string(),
                    text: "def sort_desc(xs): ...".to_string(),
                    metadata: serde_json::json!({}),
                },
            ],
            qrels: vec![
                QrelEntry {
                    query_id: "q1".to_string(),
                    corpus_id: "d1".to_string(),
                    score: 1,
                },
                QrelEntry {
                    query_id: "q2".to_string(),
                    corpus_id: "d2".to_string(),
                    score: 1,
                },
            ],
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sample");
        std::fs::create_dir_all(&path).expect("mkdir");

        let dataset = sample_dataset();
        dataset.save(&path).expect("save");

        let loaded = BenchmarkDataset::load(&path).expect("load");
        assert_eq!(loaded.name, "sample");
        assert_eq!(loaded.queries, dataset.queries);
        assert_eq!(loaded.corpus, dataset.corpus);
        assert_eq!(loaded.qrels, dataset.qrels);
    }

    #[test]
    fn test_load_drops_dangling_qrels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sample");
        std::fs::create_dir_all(&path).expect("mkdir");

        let mut dataset = sample_dataset();
        dataset.qrels.push(QrelEntry {
            query_id: "q1".to_string(),
            corpus_id: "missing-doc".to_string(),
            score: 1,
        });
        dataset.save(&path).expect("save");

        let loaded = BenchmarkDataset::load(&path).expect("load");
        assert_eq!(loaded.qrels.len(), 2);
    }

    #[test]
    fn test_relevant_for() {
        let dataset = sample_dataset();
        let relevant = dataset.relevant_for("q1");
        assert!(relevant.contains("d1"));
        assert!(!relevant.contains("d2"));
        assert!(dataset.relevant_for("unknown").is_empty());
    }

    #[test]
    fn test_query_jsonl_field_names() {
        let query = Query {
            id: "q1".to_string(),
            text: "find things".to_string(),
            metadata: serde_json::json!({}),
        };
        let json = serde_json::to_string(&query).expect("serialize");
        assert!(json.contains("\"_id\":\"q1\""));
    }

    #[test]
    fn test_qrels_header_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("test.tsv");
        std::fs::write(&path, "query-id\tcorpus-id\tscore\nq1\td1\t1\n").expect("write");

        let entries = read_qrels(&path).expect("read");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query_id, "q1");
        assert_eq!(entries[0].score, 1);
    }

    #[test]
    fn test_qrels_malformed_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("test.tsv");
        std::fs::write(&path, "query-id\tcorpus-id\tscore\nq1-only\n").expect("write");

        assert!(read_qrels(&path).is_err());
    }
}
