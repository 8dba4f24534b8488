use std::path::{Path, PathBuf};

use crate::report::RunSummary;

fn state_path() -> PathBuf {
    let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    dir.join(".mutiny-state.json")
}

pub fn save_last_run(summary: &RunSummary) {
    if let Ok(json) = serde_json::to_string(summary) {
        let _ = std::fs::write(state_path(), json);
    }
}

pub fn load_last_run() -> Option<RunSummary> {
    load_from_path(&state_path())
}

pub fn save_to_path(summary: &RunSummary, path: &Path) {
    if let Ok(json) = serde_json::to_string(summary) {
        let _ = std::fs::write(path, json);
    }
}

pub fn load_from_path(path: &Path) -> Option<RunSummary> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}
