use std::time::Duration;

use thiserror::Error;

use crate::events::EventBus;
use crate::process::{ProcessSpec, WatchdogOptions, run_watched};

/// Result of the single unmutated full-suite run. Its duration seeds
/// the per-mutant timeout formula.
#[derive(Debug, Clone)]
pub struct BaselineRun {
    pub duration: Duration,
    pub passed: bool,
    pub force_killed: bool,
}

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("failed to run baseline test suite: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("baseline test suite failed (exit code {exit_code:?})")]
    Failed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("baseline test suite was force-terminated: its error stream never settled")]
    ErrorStorm { stderr: String },
}

/// Run the baseline suite, blocking until it exits or the watchdog
/// terminates it. Any failure here is fatal to the whole run: a
/// mutation score is meaningless without a trustworthy baseline, so the
/// mutant phase never starts.
///
/// The watchdog's wall cap is ignored for the baseline; only the
/// error-stream grace window applies.
pub fn run_baseline(
    spec: &ProcessSpec,
    opts: &WatchdogOptions,
    events: &EventBus,
) -> Result<BaselineRun, BaselineError> {
    let opts = WatchdogOptions {
        wall_timeout: None,
        ..*opts
    };

    let result = run_watched(spec, &opts, events, |_, _| {})?;

    if result.force_killed {
        return Err(BaselineError::ErrorStorm {
            stderr: result.stderr,
        });
    }
    if result.exit_code != Some(0) {
        return Err(BaselineError::Failed {
            exit_code: result.exit_code,
            stdout: result.stdout,
            stderr: result.stderr,
        });
    }

    Ok(BaselineRun {
        duration: result.duration,
        passed: true,
        force_killed: false,
    })
}
