use std::sync::Arc;

use crate::mutants::MutationOutcome;
use crate::report::RunSummary;

/// Which process a lifecycle event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScope {
    Baseline,
    /// Mutant run, tagged by mutation hash.
    Mutant(String),
}

/// Lifecycle signals emitted by the engine, consumed by reporters/UI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A test-suite process is about to be spawned.
    SuiteRunStarted { scope: RunScope },
    /// An output chunk arrived. Approximate progress, not a precise
    /// per-test-case count.
    TestCaseCompleted { scope: RunScope },
    /// The process exited or was force-terminated. Fires exactly once
    /// per run, always after the last `TestCaseCompleted` for it.
    SuiteRunFinished { scope: RunScope, force_killed: bool },
    /// One mutant has been classified.
    MutantEvaluated {
        hash: String,
        outcome: MutationOutcome,
        duration_ms: u64,
    },
    /// All mutants are classified and the report is final.
    MutationTestingFinished { summary: RunSummary },
}

/// Observer of engine lifecycle events. Listeners are shared across
/// worker threads and must not block.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

/// Fan-out to a fixed listener list. Cheap to clone; the list is fixed
/// at construction so workers never race on it.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Vec<Box<dyn EventListener>>>,
}

impl EventBus {
    pub fn new(listeners: Vec<Box<dyn EventListener>>) -> Self {
        EventBus {
            listeners: Arc::new(listeners),
        }
    }

    pub fn emit(&self, event: EngineEvent) {
        for listener in self.listeners.iter() {
            listener.on_event(&event);
        }
    }
}
