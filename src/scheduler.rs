use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use crate::baseline::BaselineRun;
use crate::config_builder::ConfigStrategy;
use crate::events::{EngineEvent, EventBus};
use crate::mutants::{Mutant, MutationOutcome};
use crate::process::{ProcessResult, TestCommand, WatchdogOptions, run_watched};

/// Per-mutant wall-clock cap, derived from the baseline duration. A
/// mutated program can loop forever without ever touching stderr, so
/// this cap exists independently of the watchdog's error grace window.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    pub factor: f64,
    pub floor: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy {
            factor: 3.0,
            floor: Duration::from_secs(2),
        }
    }
}

impl TimeoutPolicy {
    pub fn wall_timeout(&self, baseline: &BaselineRun) -> Duration {
        baseline.duration.mul_f64(self.factor) + self.floor
    }
}

/// Bounded worker pool: N workers pull mutants from a shared queue, run
/// one isolated test process each, and classify the outcome.
pub struct Scheduler {
    pub command: TestCommand,
    pub strategy: Arc<dyn ConfigStrategy>,
    pub workers: usize,
    pub timeouts: TimeoutPolicy,
    pub watchdog: WatchdogOptions,
    /// Stderr substrings that mark a run as a framework/runtime crash
    /// rather than a normal test failure.
    pub crash_markers: Vec<String>,
    pub events: EventBus,
}

impl Scheduler {
    /// Execute every mutant and return one outcome per mutant. A fault
    /// while evaluating one mutant (including a panic) becomes that
    /// mutant's `Error` outcome and never disturbs sibling workers.
    /// Completion order is unspecified.
    pub fn run(
        &self,
        mutants: Vec<Mutant>,
        baseline: &BaselineRun,
    ) -> Vec<(Mutant, MutationOutcome)> {
        let wall = self.timeouts.wall_timeout(baseline);
        let queue = Mutex::new(VecDeque::from(mutants));
        let (tx, rx) = mpsc::channel();

        std::thread::scope(|s| {
            for _ in 0..self.workers.max(1) {
                let tx = tx.clone();
                let queue = &queue;
                s.spawn(move || {
                    loop {
                        let next = match queue.lock() {
                            Ok(mut q) => q.pop_front(),
                            Err(poisoned) => poisoned.into_inner().pop_front(),
                        };
                        let Some(mutant) = next else { break };

                        let start = Instant::now();
                        let outcome =
                            catch_unwind(AssertUnwindSafe(|| self.evaluate(&mutant, wall)))
                                .unwrap_or_else(|_| {
                                    MutationOutcome::error("worker panicked evaluating mutant")
                                });

                        self.events.emit(EngineEvent::MutantEvaluated {
                            hash: mutant.hash().to_string(),
                            outcome: outcome.clone(),
                            duration_ms: start.elapsed().as_millis() as u64,
                        });
                        if tx.send((mutant, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);
            // Workers drop their senders as they finish, ending the
            // stream after exactly one outcome per mutant.
            rx.iter().collect()
        })
    }

    fn evaluate(&self, mutant: &Mutant, wall: Duration) -> MutationOutcome {
        if mutant.covering_tests.is_empty() {
            return MutationOutcome::NotCovered;
        }

        let config = match self.strategy.build(mutant) {
            Ok(path) => path,
            Err(e) => return MutationOutcome::error(e.to_string()),
        };

        let spec = self.command.for_mutant(&config, mutant);
        let opts = self.watchdog.with_wall_timeout(wall);
        match run_watched(&spec, &opts, &self.events, |_, _| {}) {
            Ok(result) => self.classify(&result),
            Err(e) => MutationOutcome::error(format!("failed to spawn test process: {e}")),
        }
    }

    fn classify(&self, result: &ProcessResult) -> MutationOutcome {
        if result.force_killed {
            return MutationOutcome::Timeout;
        }
        if let Some(marker) = self
            .crash_markers
            .iter()
            .find(|m| result.stderr.contains(m.as_str()))
        {
            return MutationOutcome::error(format!("test framework crashed ({marker})"));
        }
        match result.exit_code {
            Some(0) => MutationOutcome::Escaped,
            Some(_) => MutationOutcome::Killed,
            None => MutationOutcome::error("test process terminated by signal"),
        }
    }
}
