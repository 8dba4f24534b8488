use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Identity of a single syntactic change, produced by an external
/// mutation generator. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    /// Stable hash uniquely identifying this mutation.
    pub hash: String,
    /// File the mutation originates from.
    pub original_path: PathBuf,
    /// 1-based line of the mutated location.
    pub line: usize,
}

/// A materialized unit of work: one mutation, the file containing it,
/// and the tests known to cover its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutant {
    #[serde(flatten)]
    pub mutation: Mutation,
    /// Path to the mutated copy of the source file.
    pub mutated_path: PathBuf,
    /// Test identifiers covering the mutated line. May be empty.
    #[serde(default)]
    pub covering_tests: Vec<String>,
}

impl Mutant {
    pub fn hash(&self) -> &str {
        &self.mutation.hash
    }
}

/// Final judgement for one mutant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The covering tests failed: the mutant was detected.
    Killed,
    /// The covering tests passed: the mutant went undetected.
    Escaped,
    /// The test process was force-terminated (error storm or wall clock).
    Timeout,
    /// Config synthesis, spawning, or the framework itself broke.
    Error { message: String },
    /// No test covers the mutated line; no process was spawned.
    NotCovered,
}

impl MutationOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        MutationOutcome::Error {
            message: message.into(),
        }
    }

    /// Whether a test process actually judged this mutant (or failed
    /// trying), as opposed to being skipped for lack of coverage.
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, MutationOutcome::NotCovered)
    }
}

/// Coverage data as produced by the external collector:
/// file path -> line (as decimal string) -> covering test identifiers.
pub type CoverageMap = HashMap<String, HashMap<String, Vec<String>>>;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load the mutant manifest emitted by the mutation generator: a JSON
/// array of mutant descriptors.
pub fn load_manifest(path: &Path) -> Result<Vec<Mutant>, ManifestError> {
    let data = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a coverage map (file -> line -> tests).
pub fn load_coverage(path: &Path) -> Result<CoverageMap, ManifestError> {
    let data = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Fill in covering tests for mutants whose manifest entry left them
/// empty. Entries that already carry tests are kept as-is.
pub fn apply_coverage(mutants: &mut [Mutant], coverage: &CoverageMap) {
    for mutant in mutants.iter_mut() {
        if !mutant.covering_tests.is_empty() {
            continue;
        }
        let file = mutant.mutation.original_path.to_string_lossy();
        if let Some(lines) = coverage.get(file.as_ref()) {
            if let Some(tests) = lines.get(&mutant.mutation.line.to_string()) {
                mutant.covering_tests = tests.clone();
            }
        }
    }
}
