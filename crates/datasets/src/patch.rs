//! Gold patch parsing
//!
//! Derives ground truth from a SWE-Bench gold patch: the set of modified
//! source files and the exact old-file lines each change touches. Hunk
//! context lines are not part of the change and are never recorded.

use codebench_core::error::{Error, Result};
use git2::{Delta, Diff};
use std::cell::RefCell;

/// A changed old-file line, or the insertion point of a pure addition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedRegion {
    /// File path relative to the repository root
    pub file: String,
    /// Old-file line number (1-based); for an insertion, the line it follows
    pub old_start: u32,
    /// 1 for a deleted or modified line, 0 for an insertion point
    pub old_lines: u32,
}

/// Parsed view of a gold patch
#[derive(Debug, Clone, Default)]
pub struct PatchInfo {
    /// Files modified by the patch (pre-existing files only)
    pub oracle_files: Vec<String>,
    /// Old-file lines deleted or modified, plus insertion points
    pub regions: Vec<ChangedRegion>,
}

/// Walk state while consuming a hunk's lines: the hunk identity and the last
/// old-file line consumed, which anchors any following insertion.
type HunkCursor = Option<(String, u32, u32, u32)>;

impl PatchInfo {
    /// Parse a unified diff into oracle files and changed regions.
    ///
    /// Files added by the patch have no pre-patch version and are excluded;
    /// they cannot be localized in the base commit.
    pub fn parse(patch: &str) -> Result<Self> {
        let diff = Diff::from_buffer(patch.as_bytes())
            .map_err(|e| Error::parse("patch".to_string(), format!("Invalid diff: {e}")))?;

        let oracle_files = RefCell::new(Vec::new());
        let regions: RefCell<Vec<ChangedRegion>> = RefCell::new(Vec::new());
        let cursor: RefCell<HunkCursor> = RefCell::new(None);

        diff.foreach(
            &mut |delta, _progress| {
                if delta.status() == Delta::Added {
                    return true;
                }
                if let Some(path) = delta.old_file().path().and_then(|p| p.to_str()) {
                    oracle_files.borrow_mut().push(path.to_string());
                }
                true
            },
            None,
            None,
            Some(&mut |delta, hunk, line| {
                if delta.status() == Delta::Added {
                    return true;
                }
                let path = delta.old_file().path().and_then(|p| p.to_str());
                let (Some(path), Some(hunk)) = (path, hunk) else {
                    return true;
                };

                let mut cursor = cursor.borrow_mut();
                let same_hunk = matches!(
                    &*cursor,
                    Some((f, os, ns, _))
                        if f == path && *os == hunk.old_start() && *ns == hunk.new_start()
                );
                if !same_hunk {
                    // Position before the first unconsumed old line of the hunk
                    let anchor = if hunk.old_lines() == 0 {
                        hunk.old_start()
                    } else {
                        hunk.old_start().saturating_sub(1)
                    };
                    *cursor = Some((
                        path.to_string(),
                        hunk.old_start(),
                        hunk.new_start(),
                        anchor,
                    ));
                }
                let Some((_, _, _, last_old)) = cursor.as_mut() else {
                    return true;
                };

                match line.origin() {
                    '-' => {
                        if let Some(old) = line.old_lineno() {
                            regions.borrow_mut().push(ChangedRegion {
                                file: path.to_string(),
                                old_start: old,
                                old_lines: 1,
                            });
                            *last_old = old;
                        }
                    }
                    '+' => {
                        let anchor = *last_old;
                        let mut regions = regions.borrow_mut();
                        let covered = regions
                            .last()
                            .map(|r| r.file == path && r.old_start == anchor)
                            .unwrap_or(false);
                        if !covered {
                            regions.push(ChangedRegion {
                                file: path.to_string(),
                                old_start: anchor,
                                old_lines: 0,
                            });
                        }
                    }
                    _ => {
                        // Context line; advances the old-file position only
                        if let Some(old) = line.old_lineno() {
                            *last_old = old;
                        }
                    }
                }
                true
            }),
        )
        .map_err(|e| Error::parse("patch".to_string(), format!("Diff walk failed: {e}")))?;

        Ok(Self {
            oracle_files: oracle_files.into_inner(),
            regions: regions.into_inner(),
        })
    }

    /// Changed regions for one file
    pub fn regions_for(&self, file: &str) -> Vec<&ChangedRegion> {
        self.regions.iter().filter(|r| r.file == file).collect()
    }
}
