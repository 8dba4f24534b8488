use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::{EngineEvent, EventBus};
use crate::mutants::{Mutant, MutationOutcome};

/// Whether `NotCovered` mutants count toward the score denominator.
/// Excluded by default: an uncovered mutant says nothing about the
/// tests that do exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePolicy {
    pub count_not_covered: bool,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        ScorePolicy {
            count_not_covered: false,
        }
    }
}

/// An escaped mutant, listed in the summary so it can be inspected
/// after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscapedMutant {
    pub hash: String,
    pub file: String,
    pub line: usize,
    pub covering_tests: usize,
}

/// Finalized, serializable result of a whole run. `score` is `None`
/// when no mutant was conclusively evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub score: Option<f64>,
    pub total: usize,
    pub killed: usize,
    pub escaped: usize,
    pub timeout: usize,
    pub error: usize,
    pub not_covered: usize,
    pub duration_ms: u64,
    pub escaped_mutants: Vec<EscapedMutant>,
}

/// Append-only outcome collection. Owned by the aggregator alone;
/// finalized exactly once (finalization consumes it).
pub struct Report {
    policy: ScorePolicy,
    outcomes: Vec<(Mutant, MutationOutcome)>,
}

impl Report {
    pub fn new(policy: ScorePolicy) -> Self {
        Report {
            policy,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, mutant: Mutant, outcome: MutationOutcome) {
        self.outcomes.push((mutant, outcome));
    }

    pub fn record_all<I>(&mut self, outcomes: I)
    where
        I: IntoIterator<Item = (Mutant, MutationOutcome)>,
    {
        self.outcomes.extend(outcomes);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn count(&self, want: fn(&MutationOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| want(o)).count()
    }

    /// Mutation score under the configured policy. `None` when the
    /// denominator is empty (zero mutants, or none covered).
    pub fn score(&self) -> Option<f64> {
        let killed = self.count(|o| matches!(o, MutationOutcome::Killed));
        let mut denominator = self.count(|o| o.is_conclusive());
        if self.policy.count_not_covered {
            denominator += self.count(|o| matches!(o, MutationOutcome::NotCovered));
        }
        if denominator == 0 {
            return None;
        }
        Some(killed as f64 / denominator as f64)
    }

    /// Consume the report into its final summary, emitting the
    /// testing-finished signal exactly once. Outcomes are sorted by
    /// (file, line, hash) so reporting is deterministic regardless of
    /// worker completion order.
    pub fn finalize(mut self, duration: Duration, events: &EventBus) -> RunSummary {
        self.outcomes.sort_by(|(a, _), (b, _)| {
            (&a.mutation.original_path, a.mutation.line, a.hash()).cmp(&(
                &b.mutation.original_path,
                b.mutation.line,
                b.hash(),
            ))
        });

        let escaped_mutants: Vec<EscapedMutant> = self
            .outcomes
            .iter()
            .filter(|(_, o)| matches!(o, MutationOutcome::Escaped))
            .map(|(m, _)| EscapedMutant {
                hash: m.hash().to_string(),
                file: m.mutation.original_path.display().to_string(),
                line: m.mutation.line,
                covering_tests: m.covering_tests.len(),
            })
            .collect();

        let summary = RunSummary {
            score: self.score(),
            total: self.outcomes.len(),
            killed: self.count(|o| matches!(o, MutationOutcome::Killed)),
            escaped: self.count(|o| matches!(o, MutationOutcome::Escaped)),
            timeout: self.count(|o| matches!(o, MutationOutcome::Timeout)),
            error: self.count(|o| matches!(o, MutationOutcome::Error { .. })),
            not_covered: self.count(|o| matches!(o, MutationOutcome::NotCovered)),
            duration_ms: duration.as_millis() as u64,
            escaped_mutants,
        };

        events.emit(EngineEvent::MutationTestingFinished {
            summary: summary.clone(),
        });

        summary
    }
}
