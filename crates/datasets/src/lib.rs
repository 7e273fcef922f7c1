//! Benchmark dataset builders
//!
//! Turns raw benchmark sources (CodeSearchNet dumps, SWE-Bench instance
//! exports) into BEIR-style dataset directories that the evaluation harness
//! consumes.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod csn;
pub mod patch;
pub mod python_structure;
pub mod swebench;

pub use csn::{CsnBuilder, CsnRecord};
pub use patch::{ChangedRegion, PatchInfo};
pub use python_structure::{extract_functions, PyFunction};
pub use swebench::{
    dataset_name, load_instances, BuildSummary, SweBenchBuilder, SweBenchInstance, SweBenchLevel,
};
