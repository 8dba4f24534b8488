use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::mutants::Mutant;

#[derive(Debug, Error)]
#[error("failed to write mutation config {path}: {source}")]
pub struct ConfigError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Produces the configuration reference a test process needs to
/// exercise exactly one mutant. Which variant applies is decided once
/// per test-framework adapter at setup time, not per call.
pub trait ConfigStrategy: Send + Sync {
    fn build(&self, mutant: &Mutant) -> Result<PathBuf, ConfigError>;
}

/// For frameworks that can be pointed at a single mutated file purely
/// via invocation arguments: the project config is used unchanged.
#[derive(Debug, Clone)]
pub struct PassthroughConfig {
    original_config_path: PathBuf,
}

impl PassthroughConfig {
    pub fn new(original_config_path: impl Into<PathBuf>) -> Self {
        PassthroughConfig {
            original_config_path: original_config_path.into(),
        }
    }
}

impl ConfigStrategy for PassthroughConfig {
    fn build(&self, _mutant: &Mutant) -> Result<PathBuf, ConfigError> {
        Ok(self.original_config_path.clone())
    }
}

#[derive(Serialize)]
struct SynthesizedArtifact<'a> {
    original_config: &'a Path,
    project_dir: &'a Path,
    original_path: &'a Path,
    mutated_path: &'a Path,
    covering_tests: &'a [String],
}

/// For frameworks that need a dedicated config per mutant: writes an
/// artifact into the scratch directory with the mutated file substituted
/// for the original and test selection scoped to covering tests.
#[derive(Debug, Clone)]
pub struct SynthesizingConfig {
    scratch_dir: PathBuf,
    project_dir: PathBuf,
    original_config_path: PathBuf,
}

impl SynthesizingConfig {
    pub fn new(
        scratch_dir: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
        original_config_path: impl Into<PathBuf>,
    ) -> Self {
        SynthesizingConfig {
            scratch_dir: scratch_dir.into(),
            project_dir: project_dir.into(),
            original_config_path: original_config_path.into(),
        }
    }

    /// Artifact path for a mutation hash. Deterministic so concurrent
    /// mutants never collide and debugging artifacts stay traceable.
    pub fn artifact_path(&self, hash: &str) -> PathBuf {
        self.scratch_dir.join(format!("mutation.{hash}.json"))
    }
}

impl ConfigStrategy for SynthesizingConfig {
    fn build(&self, mutant: &Mutant) -> Result<PathBuf, ConfigError> {
        let path = self.artifact_path(mutant.hash());
        let artifact = SynthesizedArtifact {
            original_config: &self.original_config_path,
            project_dir: &self.project_dir,
            original_path: &mutant.mutation.original_path,
            mutated_path: &mutant.mutated_path,
            covering_tests: &mutant.covering_tests,
        };
        let body = serde_json::to_string_pretty(&artifact).map_err(|e| ConfigError {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;
        // Overwrite, not collide: rebuilding for the same hash is a
        // retry and must succeed with the identical reference.
        std::fs::write(&path, body).map_err(|source| ConfigError {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
