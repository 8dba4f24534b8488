use mutiny::config_builder::{ConfigStrategy, PassthroughConfig, SynthesizingConfig};
use mutiny::mutants::{Mutant, Mutation};

use std::path::{Path, PathBuf};

fn make_mutant(hash: &str) -> Mutant {
    Mutant {
        mutation: Mutation {
            hash: hash.to_string(),
            original_path: "/original/file/path".into(),
            line: 12,
        },
        mutated_path: "/mutated/file/path".into(),
        covering_tests: vec!["test_one".to_string(), "test_two".to_string()],
    }
}

// --- PassthroughConfig ---

#[test]
fn passthrough_returns_original_config_verbatim() {
    let builder = PassthroughConfig::new("original/config/path");
    let mutant = make_mutant("a1b2c3");

    let config = builder.build(&mutant).unwrap();
    assert_eq!(config, PathBuf::from("original/config/path"));
}

#[test]
fn passthrough_is_pure_across_mutants() {
    let builder = PassthroughConfig::new("original/config/path");
    let a = builder.build(&make_mutant("aaa")).unwrap();
    let b = builder.build(&make_mutant("bbb")).unwrap();
    assert_eq!(a, b);
}

// --- SynthesizingConfig ---

#[test]
fn synthesizing_writes_artifact_named_by_hash() {
    let dir = tempfile::TempDir::new().unwrap();
    let builder = SynthesizingConfig::new(dir.path(), "project/dir", "original/config/path");
    let mutant = make_mutant("a1b2c3");

    let config = builder.build(&mutant).unwrap();

    assert_eq!(config, dir.path().join("mutation.a1b2c3.json"));
    assert!(config.exists());
}

#[test]
fn synthesizing_substitutes_mutated_path_and_scopes_tests() {
    let dir = tempfile::TempDir::new().unwrap();
    let builder = SynthesizingConfig::new(dir.path(), "project/dir", "original/config/path");
    let mutant = make_mutant("a1b2c3");

    let config = builder.build(&mutant).unwrap();
    let body = std::fs::read_to_string(&config).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();

    assert_eq!(parsed["mutated_path"], "/mutated/file/path");
    assert_eq!(parsed["original_path"], "/original/file/path");
    assert_eq!(parsed["original_config"], "original/config/path");
    assert_eq!(parsed["covering_tests"][0], "test_one");
    assert_eq!(parsed["covering_tests"][1], "test_two");
}

#[test]
fn synthesizing_is_idempotent_for_same_hash() {
    let dir = tempfile::TempDir::new().unwrap();
    let builder = SynthesizingConfig::new(dir.path(), "project/dir", "original/config/path");
    let mutant = make_mutant("a1b2c3");

    let first = builder.build(&mutant).unwrap();
    // Second build is a retry: same reference, overwrite, no error.
    let second = builder.build(&mutant).unwrap();

    assert_eq!(first, second);
}

#[test]
fn synthesizing_distinct_hashes_never_collide() {
    let dir = tempfile::TempDir::new().unwrap();
    let builder = SynthesizingConfig::new(dir.path(), "project/dir", "original/config/path");

    let a = builder.build(&make_mutant("aaa111")).unwrap();
    let b = builder.build(&make_mutant("bbb222")).unwrap();

    assert_ne!(a, b);
    assert!(a.exists());
    assert!(b.exists());
}

#[test]
fn synthesizing_disk_failure_is_a_config_error() {
    let dir = tempfile::TempDir::new().unwrap();
    // Scratch "directory" is actually a file; writing under it fails.
    let bogus = dir.path().join("not-a-dir");
    std::fs::write(&bogus, "file").unwrap();

    let builder = SynthesizingConfig::new(&bogus, "project/dir", "original/config/path");
    let err = builder.build(&make_mutant("a1b2c3")).unwrap_err();

    assert!(err.path.starts_with(&bogus));
}

#[test]
fn artifact_path_is_deterministic() {
    let builder = SynthesizingConfig::new("/scratch", "project/dir", "original/config/path");
    assert_eq!(
        builder.artifact_path("a1b2c3"),
        Path::new("/scratch/mutation.a1b2c3.json")
    );
}
