//! SWE-Bench-Lite dataset builder
//!
//! Turns SWE-Bench instances (issue text + gold patch + base commit) into
//! per-instance BEIR-style localization datasets. The issue problem statement
//! is the query; the candidate pool is the repository's non-test Python files
//! (file level) or their extracted functions (function level); ground truth is
//! derived from the gold patch.

use crate::patch::PatchInfo;
use crate::python_structure::{changed_function_ids, extract_functions};
use codebench_core::benchmark::{read_jsonl, BenchmarkDataset, CorpusDoc, QrelEntry, Query};
use codebench_core::error::{Error, Result};
use git2::build::CheckoutBuilder;
use git2::{Oid, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Placeholder content for files that are not valid UTF-8
pub const BINARY_PLACEHOLDER: &str = "[BINARY DATA FILE]";

/// One SWE-Bench instance record
#[derive(Debug, Clone, Deserialize)]
pub struct SweBenchInstance {
    pub instance_id: String,
    /// `owner/name` of the upstream repository
    pub repo: String,
    /// Commit the issue was reported against
    pub base_commit: String,
    /// Gold patch that resolved the issue
    pub patch: String,
    /// Issue text used as the query
    pub problem_statement: String,
}

/// Load SWE-Bench instances from a JSONL export
pub fn load_instances(path: &Path) -> Result<Vec<SweBenchInstance>> {
    read_jsonl(path)
}

/// Granularity of the candidate pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweBenchLevel {
    /// Whole Python files
    File,
    /// Extracted functions and methods
    Function,
}

impl SweBenchLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Function => "function",
        }
    }
}

/// Outcome counters for a build run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub built: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Builder for per-instance SWE-Bench datasets
pub struct SweBenchBuilder {
    dataset_dir: PathBuf,
    scratch_dir: PathBuf,
    level: SweBenchLevel,
    split: String,
    num_examples: Option<usize>,
    reuse_cached: bool,
}

impl SweBenchBuilder {
    pub fn new(
        dataset_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
        level: SweBenchLevel,
    ) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            scratch_dir: scratch_dir.into(),
            level,
            split: "test".to_string(),
            num_examples: None,
            reuse_cached: true,
        }
    }

    /// Set the dataset split label (affects dataset directory naming)
    pub fn split(mut self, split: impl Into<String>) -> Self {
        self.split = split.into();
        self
    }

    /// Build only a random sample of this many instances
    pub fn num_examples(mut self, count: Option<usize>) -> Self {
        self.num_examples = count;
        self
    }

    /// Keep previously built instance directories instead of rebuilding
    pub fn reuse_cached(mut self, reuse: bool) -> Self {
        self.reuse_cached = reuse;
        self
    }

    /// Base name shared by all instance directories of this configuration
    pub fn dataset_name(&self) -> String {
        dataset_name(&self.split, self.level)
    }

    /// Build one dataset directory per instance
    pub fn build(&self, mut instances: Vec<SweBenchInstance>) -> Result<BuildSummary> {
        let name = self.dataset_name();
        fs::create_dir_all(&self.dataset_dir)?;

        if !self.reuse_cached {
            self.remove_stale_datasets(&name)?;
        }

        if let Some(count) = self.num_examples {
            use rand::seq::SliceRandom;
            let mut rng = rand::thread_rng();
            instances.shuffle(&mut rng);
            instances.truncate(count);
        }

        info!(
            "Building {} SWE-Bench instances at {} level",
            instances.len(),
            self.level.as_str()
        );

        let progress = ProgressBar::new(instances.len() as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
        {
            progress.set_style(style);
        }

        let mut summary = BuildSummary::default();
        for instance in &instances {
            progress.set_message(instance.instance_id.clone());

            let out_dir = self
                .dataset_dir
                .join(format!("{name}_{}", instance.instance_id));
            if self.reuse_cached && out_dir.exists() {
                debug!("Reusing cached dataset for {}", instance.instance_id);
                summary.skipped += 1;
                progress.inc(1);
                continue;
            }

            match self.build_instance(instance, &out_dir) {
                Ok(true) => summary.built += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    warn!("Failed on instance {}: {e}", instance.instance_id);
                    summary.failed += 1;
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            "SWE-Bench build complete: {} built, {} skipped, {} failed",
            summary.built, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    fn remove_stale_datasets(&self, name: &str) -> Result<()> {
        let prefix = format!("{name}_");
        for entry in fs::read_dir(&self.dataset_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            if let Some(dir_name) = file_name.to_str() {
                if dir_name.starts_with(&prefix) && entry.path().is_dir() {
                    debug!("Removing stale dataset dir {dir_name}");
                    fs::remove_dir_all(entry.path())?;
                }
            }
        }
        Ok(())
    }

    fn build_instance(&self, instance: &SweBenchInstance, out_dir: &Path) -> Result<bool> {
        let repo_root = ensure_checkout(&self.scratch_dir, &instance.repo, &instance.base_commit)?;
        let candidates = collect_candidate_files(&repo_root)?;
        let patch_info = PatchInfo::parse(&instance.patch)?;

        debug!(
            "Instance {}: {} oracle files, {} candidate files",
            instance.instance_id,
            patch_info.oracle_files.len(),
            candidates.len()
        );

        let dataset = match self.level {
            SweBenchLevel::File => build_file_dataset(instance, &candidates, &patch_info),
            SweBenchLevel::Function => build_function_dataset(instance, &candidates, &patch_info),
        };

        match dataset {
            Some(mut dataset) => {
                dataset.name = out_dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(&instance.instance_id)
                    .to_string();
                dataset.save(out_dir)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Directory-name base for datasets built with the given split and level.
///
/// Instance directories are `{base}_{instance_id}`, e.g.
/// `swe-bench-lite-function_django__django-11099`.
pub fn dataset_name(split: &str, level: SweBenchLevel) -> String {
    let mut name = "swe-bench-lite".to_string();
    if split != "test" {
        name.push_str(&format!("-{split}"));
    }
    if level != SweBenchLevel::File {
        name.push_str(&format!("-{}", level.as_str()));
    }
    name
}

/// Clone the swe-bench mirror if needed and check out the base commit.
///
/// Mirrors live at `github.com/swe-bench/{owner}__{repo}`; a GITHUB_TOKEN
/// environment variable is used when present.
pub fn ensure_checkout(scratch_dir: &Path, repo: &str, base_commit: &str) -> Result<PathBuf> {
    let mirror_name = repo.replace('/', "__");
    let repo_dir = scratch_dir.join(&mirror_name);

    if !repo_dir.exists() {
        fs::create_dir_all(scratch_dir)?;
        let token = std::env::var("GITHUB_TOKEN").unwrap_or_else(|_| "git".to_string());
        let url = format!("https://{token}@github.com/swe-bench/{mirror_name}.git");
        info!("Cloning {repo} into {}", repo_dir.display());
        Repository::clone(&url, &repo_dir)
            .map_err(|e| Error::git(format!("Failed to clone {repo}: {e}")))?;
    }

    checkout_commit(&repo_dir, base_commit)?;
    Ok(repo_dir)
}

/// Force-checkout a commit, leaving the repository in detached HEAD state
pub fn checkout_commit(repo_dir: &Path, commit_sha: &str) -> Result<()> {
    let repo = Repository::open(repo_dir)
        .map_err(|e| Error::git(format!("Failed to open {}: {e}", repo_dir.display())))?;

    let oid = Oid::from_str(commit_sha)
        .map_err(|e| Error::git(format!("Invalid commit id '{commit_sha}': {e}")))?;
    repo.find_commit(oid)
        .map_err(|e| Error::git(format!("Commit {commit_sha} not found: {e}")))?;

    repo.set_head_detached(oid)
        .map_err(|e| Error::git(format!("Failed to detach HEAD at {commit_sha}: {e}")))?;

    let mut checkout = CheckoutBuilder::new();
    checkout.force().remove_untracked(true);
    repo.checkout_head(Some(&mut checkout))
        .map_err(|e| Error::git(format!("Checkout of {commit_sha} failed: {e}")))?;

    Ok(())
}

/// Whether a path looks like test code.
///
/// Matches the word-split heuristic used by SWE-Bench tooling: any path
/// component or word equal to `test`, `tests`, or `testing`.
pub fn is_test_path(path: &str) -> bool {
    path.to_lowercase()
        .split([' ', '_', '/', '.'])
        .any(|word| matches!(word, "test" | "tests" | "testing"))
}

/// Collect the candidate pool: all non-test `.py` files under the repo root.
///
/// Non-UTF8 files are kept with a placeholder body so ids remain stable.
pub fn collect_candidate_files(repo_root: &Path) -> Result<Vec<(String, String)>> {
    let pattern = repo_root.join("**").join("*.py");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| Error::dataset("Non-UTF8 repository path".to_string()))?
        .to_string();

    let mut files = Vec::new();
    for entry in
        glob::glob(&pattern).map_err(|e| Error::dataset(format!("Invalid glob pattern: {e}")))?
    {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable path: {e}");
                continue;
            }
        };
        let rel = match path.strip_prefix(repo_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let Some(rel_str) = rel.to_str() else {
            continue;
        };
        if is_test_path(rel_str) {
            continue;
        }

        let content = match fs::read(&path) {
            Ok(bytes) => {
                String::from_utf8(bytes).unwrap_or_else(|_| BINARY_PLACEHOLDER.to_string())
            }
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                continue;
            }
        };
        files.push((rel_str.to_string(), content));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Assemble a file-level dataset. Returns None when any oracle file is
/// missing from the candidate pool (patch touched test or non-Python files).
pub fn build_file_dataset(
    instance: &SweBenchInstance,
    candidates: &[(String, String)],
    patch_info: &PatchInfo,
) -> Option<BenchmarkDataset> {
    let pool: HashSet<&str> = candidates.iter().map(|(path, _)| path.as_str()).collect();
    for oracle in &patch_info.oracle_files {
        if !pool.contains(oracle.as_str()) {
            warn!(
                "Instance {}: oracle file '{}' not in candidate pool, skipping",
                instance.instance_id, oracle
            );
            return None;
        }
    }

    let queries = vec![Query {
        id: instance.instance_id.clone(),
        text: instance.problem_statement.clone(),
        metadata: serde_json::json!({}),
    }];

    let corpus = candidates
        .iter()
        .map(|(path, content)| CorpusDoc {
            id: format!("{}_{}", instance.instance_id, path),
            title: path.clone(),
            text: content.clone(),
            metadata: serde_json::json!({}),
        })
        .collect();

    let qrels = patch_info
        .oracle_files
        .iter()
        .map(|path| QrelEntry {
            query_id: instance.instance_id.clone(),
            corpus_id: format!("{}_{}", instance.instance_id, path),
            score: 1,
        })
        .collect();

    Some(BenchmarkDataset {
        name: instance.instance_id.clone(),
        queries,
        corpus,
        qrels,
    })
}

/// Assemble a function-level dataset. Returns None when the patch changed no
/// pre-existing function, or when a changed function is missing from the pool.
pub fn build_function_dataset(
    instance: &SweBenchInstance,
    candidates: &[(String, String)],
    patch_info: &PatchInfo,
) -> Option<BenchmarkDataset> {
    // Extract functions from every candidate file to form the corpus
    let mut functions_by_file = HashMap::new();
    for (path, content) in candidates {
        if content == BINARY_PLACEHOLDER {
            continue;
        }
        match extract_functions(path, content) {
            Ok(functions) => {
                functions_by_file.insert(path.as_str(), functions);
            }
            Err(e) => {
                debug!(
                    "Instance {}: failed to parse {path}: {e}",
                    instance.instance_id
                );
            }
        }
    }

    // Map patch hunks onto enclosing functions in the base-commit sources
    let mut changed: HashSet<String> = HashSet::new();
    for oracle in &patch_info.oracle_files {
        let Some(functions) = functions_by_file.get(oracle.as_str()) else {
            warn!(
                "Instance {}: oracle file '{}' not parseable or not in pool, skipping",
                instance.instance_id, oracle
            );
            return None;
        };
        let regions: Vec<(u32, u32)> = patch_info
            .regions_for(oracle)
            .iter()
            .map(|r| (r.old_start, r.old_lines))
            .collect();
        changed.extend(changed_function_ids(functions, &regions));
    }

    if changed.is_empty() {
        debug!(
            "Instance {}: patch changed no pre-existing function, skipping",
            instance.instance_id
        );
        return None;
    }

    // Iterate candidates rather than the map so corpus order is stable
    let corpus: Vec<CorpusDoc> = candidates
        .iter()
        .filter_map(|(path, _)| functions_by_file.get(path.as_str()))
        .flatten()
        .map(|func| CorpusDoc {
            id: func.qualified_id.clone(),
            title: String::new(),
            text: func.text.clone(),
            metadata: serde_json::json!({}),
        })
        .collect();

    let pool: HashSet<&str> = corpus.iter().map(|doc| doc.id.as_str()).collect();
    for func_id in &changed {
        if !pool.contains(func_id.as_str()) {
            warn!(
                "Instance {}: changed function '{}' missing from pool, skipping",
                instance.instance_id, func_id
            );
            return None;
        }
    }

    let queries = vec![Query {
        id: instance.instance_id.clone(),
        text: instance.problem_statement.clone(),
        metadata: serde_json::json!({}),
    }];

    let mut changed: Vec<String> = changed.into_iter().collect();
    changed.sort();
    let qrels = changed
        .into_iter()
        .map(|func_id| QrelEntry {
            query_id: instance.instance_id.clone(),
            corpus_id: func_id,
            score: 1,
        })
        .collect();

    Some(BenchmarkDataset {
        name: instance.instance_id.clone(),
        queries,
        corpus,
        qrels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const APP_SOURCE: &str = "\
def handler():
    line_one = 1
    line_two = 2
    return line_one + line_two

def untouched():
    return 0
";

    const APP_PATCH: &str = "\
diff --git a/src/app.py b/src/app.py
index 1111111..2222222 100644
--- a/src/app.py
+++ b/src/app.py
@@ -2,3 +2,3 @@ def handler():
     line_one = 1
-    line_two = 2
+    line_two = 3
     return line_one + line_two
";

    fn sample_instance() -> SweBenchInstance {
        SweBenchInstance {
            instance_id: "demo__pkg-42".to_string(),
            repo: "demo/pkg".to_string(),
            base_commit: "deadbeef".to_string(),
            patch: APP_PATCH.to_string(),
            problem_statement: "handler returns the wrong sum".to_string(),
        }
    }

    fn sample_candidates() -> Vec<(String, String)> {
        vec![
            ("src/app.py".to_string(), APP_SOURCE.to_string()),
            ("src/other.py".to_string(), "def noop():\n    pass\n".to_string()),
        ]
    }

    #[test]
    fn test_is_test_path() {
        assert!(is_test_path("tests/unit/test_app.py"));
        assert!(is_test_path("pkg/testing_helpers.py"));
        assert!(is_test_path("app_test.py"));
        assert!(!is_test_path("src/contest.py"));
        assert!(!is_test_path("src/app.py"));
    }

    #[test]
    fn test_dataset_name_variants() {
        let base = SweBenchBuilder::new("d", "s", SweBenchLevel::File);
        assert_eq!(base.dataset_name(), "swe-bench-lite");

        let func = SweBenchBuilder::new("d", "s", SweBenchLevel::Function);
        assert_eq!(func.dataset_name(), "swe-bench-lite-function");

        let dev = SweBenchBuilder::new("d", "s", SweBenchLevel::Function).split("dev");
        assert_eq!(dev.dataset_name(), "swe-bench-lite-dev-function");
    }

    #[test]
    fn test_build_file_dataset() {
        let instance = sample_instance();
        let patch_info = PatchInfo::parse(&instance.patch).expect("parse");
        let dataset =
            build_file_dataset(&instance, &sample_candidates(), &patch_info).expect("dataset");

        assert_eq!(dataset.queries.len(), 1);
        assert_eq!(dataset.queries[0].id, "demo__pkg-42");
        assert_eq!(dataset.corpus.len(), 2);
        assert_eq!(dataset.qrels.len(), 1);
        assert_eq!(dataset.qrels[0].corpus_id, "demo__pkg-42_src/app.py");
    }

    #[test]
    fn test_build_file_dataset_oracle_missing() {
        let instance = sample_instance();
        let patch_info = PatchInfo::parse(&instance.patch).expect("parse");
        let candidates = vec![("src/other.py".to_string(), "pass\n".to_string())];
        assert!(build_file_dataset(&instance, &candidates, &patch_info).is_none());
    }

    #[test]
    fn test_build_function_dataset() {
        let instance = sample_instance();
        let patch_info = PatchInfo::parse(&instance.patch).expect("parse");
        let dataset =
            build_function_dataset(&instance, &sample_candidates(), &patch_info).expect("dataset");

        assert_eq!(dataset.qrels.len(), 1);
        assert_eq!(dataset.qrels[0].corpus_id, "src/app.py/handler");
        // Pool carries every function, not just changed ones
        let ids: HashSet<&str> = dataset.corpus.iter().map(|d| d.id.as_str()).collect();
        assert!(ids.contains("src/app.py/untouched"));
        assert!(ids.contains("src/other.py/noop"));
    }

    #[test]
    fn test_function_dataset_skips_context_only_neighbors() {
        let mut instance = sample_instance();
        // beta appears only as hunk context; the patch modifies alpha alone
        instance.patch = concat!(
            "diff --git a/src/mod.py b/src/mod.py\n",
            "index 1111111..2222222 100644\n",
            "--- a/src/mod.py\n",
            "+++ b/src/mod.py\n",
            "@@ -1,6 +1,6 @@\n",
            " def alpha():\n",
            "-    a = 1\n",
            "+    a = 2\n",
            "     return a\n",
            " \n",
            " def beta():\n",
            "     return 2\n",
        )
        .to_string();
        let candidates = vec![(
            "src/mod.py".to_string(),
            "def alpha():\n    a = 1\n    return a\n\ndef beta():\n    return 2\n".to_string(),
        )];
        let patch_info = PatchInfo::parse(&instance.patch).expect("parse");
        let dataset =
            build_function_dataset(&instance, &candidates, &patch_info).expect("dataset");

        assert_eq!(dataset.qrels.len(), 1);
        assert_eq!(dataset.qrels[0].corpus_id, "src/mod.py/alpha");
    }

    #[test]
    fn test_build_function_dataset_no_changed_functions() {
        let mut instance = sample_instance();
        // Patch touches module-level code outside any function
        instance.patch = "\
diff --git a/src/config.py b/src/config.py
index 1111111..2222222 100644
--- a/src/config.py
+++ b/src/config.py
@@ -1,2 +1,2 @@
-VALUE = 1
+VALUE = 2
 OTHER = 3
"
        .to_string();
        let candidates = vec![(
            "src/config.py".to_string(),
            "VALUE = 1\nOTHER = 3\n".to_string(),
        )];
        let patch_info = PatchInfo::parse(&instance.patch).expect("parse");
        assert!(build_function_dataset(&instance, &candidates, &patch_info).is_none());
    }

    #[test]
    fn test_collect_candidate_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).expect("mkdir");
        std::fs::create_dir_all(root.join("tests")).expect("mkdir");
        std::fs::write(root.join("src/app.py"), "x = 1\n").expect("write");
        std::fs::write(root.join("tests/test_app.py"), "assert True\n").expect("write");
        std::fs::write(root.join("README.md"), "docs\n").expect("write");
        std::fs::write(root.join("src/blob.py"), [0xff, 0xfe, 0x00]).expect("write");

        let files = collect_candidate_files(root).expect("collect");
        let names: Vec<&str> = files.iter().map(|(path, _)| path.as_str()).collect();
        assert_eq!(names, vec!["src/app.py", "src/blob.py"]);

        let blob = &files.iter().find(|(p, _)| p == "src/blob.py").expect("blob").1;
        assert_eq!(blob, BINARY_PLACEHOLDER);
    }

    #[test]
    fn test_checkout_commit_restores_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo_dir = dir.path().join("repo");
        let repo = Repository::init(&repo_dir).expect("init");

        let file_path = repo_dir.join("lib.py");
        std::fs::write(&file_path, "def v1():\n    pass\n").expect("write");

        let first = commit_all(&repo, "first");
        std::fs::write(&file_path, "def v2():\n    pass\n").expect("write");
        commit_all(&repo, "second");

        checkout_commit(&repo_dir, &first.to_string()).expect("checkout");
        let content = std::fs::read_to_string(&file_path).expect("read");
        assert!(content.contains("v1"));
    }

    fn commit_all(repo: &Repository, message: &str) -> Oid {
        let mut index = repo.index().expect("index");
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .expect("add");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("tree");
        let tree = repo.find_tree(tree_id).expect("find tree");
        let sig = git2::Signature::now("tester", "tester@example.com").expect("sig");
        let parent = repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .and_then(|oid| repo.find_commit(oid).ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("commit")
    }
}
