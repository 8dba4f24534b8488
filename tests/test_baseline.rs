use mutiny::baseline::{BaselineError, run_baseline};
use mutiny::events::{EngineEvent, EventBus, EventListener, RunScope};
use mutiny::process::{ProcessSpec, WatchdogOptions};

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Recorder(Arc<Mutex<Vec<EngineEvent>>>);

impl EventListener for Recorder {
    fn on_event(&self, event: &EngineEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

fn recording_bus() -> (EventBus, Arc<Mutex<Vec<EngineEvent>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let bus = EventBus::new(vec![Box::new(Recorder(log.clone()))]);
    (bus, log)
}

fn shell_spec(dir: &Path, script: &str) -> ProcessSpec {
    ProcessSpec {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        working_dir: dir.to_path_buf(),
        scope: RunScope::Baseline,
    }
}

fn fast_opts() -> WatchdogOptions {
    WatchdogOptions {
        error_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(10),
        wall_timeout: None,
    }
}

#[test]
fn passing_suite_yields_baseline_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let (bus, _) = recording_bus();
    let spec = shell_spec(dir.path(), "exit 0");

    let run = run_baseline(&spec, &fast_opts(), &bus).unwrap();

    assert!(run.passed);
    assert!(!run.force_killed);
    assert!(run.duration < Duration::from_secs(10));
}

#[test]
fn failing_suite_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let (bus, _) = recording_bus();
    let spec = shell_spec(dir.path(), "echo broken; exit 1");

    let err = run_baseline(&spec, &fast_opts(), &bus).unwrap_err();

    match err {
        BaselineError::Failed {
            exit_code, stdout, ..
        } => {
            assert_eq!(exit_code, Some(1));
            assert!(stdout.contains("broken"));
        }
        other => panic!("Expected Failed, got {other:?}"),
    }
}

#[test]
fn missing_command_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let (bus, _) = recording_bus();
    let spec = ProcessSpec {
        program: "nonexistent_command_xyz".to_string(),
        args: vec![],
        working_dir: dir.path().to_path_buf(),
        scope: RunScope::Baseline,
    };

    let err = run_baseline(&spec, &fast_opts(), &bus).unwrap_err();
    assert!(matches!(err, BaselineError::Spawn(_)));
}

#[test]
fn error_storm_is_fatal_not_hanging() {
    let dir = tempfile::TempDir::new().unwrap();
    let (bus, _) = recording_bus();
    let spec = shell_spec(dir.path(), "while true; do echo storm >&2; sleep 0.02; done");

    let start = std::time::Instant::now();
    let err = run_baseline(&spec, &fast_opts(), &bus).unwrap_err();

    assert!(matches!(err, BaselineError::ErrorStorm { .. }));
    assert!(
        start.elapsed() < Duration::from_secs(3),
        "Baseline must not hang on a flooding suite"
    );
}

#[test]
fn baseline_lifecycle_events_fire_in_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let (bus, log) = recording_bus();
    let spec = shell_spec(dir.path(), "echo one test passed");

    run_baseline(&spec, &fast_opts(), &bus).unwrap();

    let events = log.lock().unwrap();
    assert!(matches!(
        events.first(),
        Some(EngineEvent::SuiteRunStarted {
            scope: RunScope::Baseline
        })
    ));
    assert!(matches!(
        events.last(),
        Some(EngineEvent::SuiteRunFinished {
            scope: RunScope::Baseline,
            force_killed: false
        })
    ));
}
