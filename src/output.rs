use std::io::Write;

use console::Style;

use crate::events::{EngineEvent, EventListener, RunScope};
use crate::mutants::MutationOutcome;
use crate::report::{EscapedMutant, RunSummary};

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_success(msg: &str) {
    let style = Style::new().green().bold();
    println!("{} {}", style.apply_to("✓"), msg);
}

/// Renders engine progress to the terminal: a line for the baseline,
/// one glyph per evaluated mutant.
pub struct ConsoleListener;

impl EventListener for ConsoleListener {
    fn on_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::SuiteRunStarted {
                scope: RunScope::Baseline,
            } => {
                println!("Running baseline test suite...");
            }
            EngineEvent::SuiteRunFinished {
                scope: RunScope::Baseline,
                force_killed,
            } => {
                if *force_killed {
                    print_error("Baseline run was force-terminated.");
                }
            }
            EngineEvent::MutantEvaluated { outcome, .. } => {
                let glyph = match outcome {
                    MutationOutcome::Killed => Style::new().green().apply_to(".").to_string(),
                    MutationOutcome::Escaped => Style::new().yellow().bold().apply_to("M").to_string(),
                    MutationOutcome::Timeout => Style::new().cyan().apply_to("T").to_string(),
                    MutationOutcome::Error { .. } => Style::new().red().apply_to("E").to_string(),
                    MutationOutcome::NotCovered => Style::new().dim().apply_to("S").to_string(),
                };
                print!("{glyph}");
                let _ = std::io::stdout().flush();
            }
            EngineEvent::MutationTestingFinished { .. } => {
                println!();
            }
            _ => {}
        }
    }
}

pub fn print_summary(summary: &RunSummary) {
    let score_pct = summary.score.map(|s| s * 100.0);
    let seconds = summary.duration_ms as f64 / 1000.0;

    match score_pct {
        None => {
            let dim = Style::new().dim();
            println!(
                "{} No mutants were conclusively evaluated ({} total).",
                dim.apply_to("·"),
                summary.total,
            );
        }
        Some(pct) if summary.escaped == 0 => {
            let style = Style::new().green().bold();
            println!(
                "{} {} mutants, none escaped ({:.1}% score) in {:.1}s",
                style.apply_to("✓"),
                summary.total,
                pct,
                seconds,
            );
        }
        Some(pct) => {
            let style = Style::new().yellow().bold();
            println!(
                "{} {} escaped / {} mutants ({:.1}% score) in {:.1}s",
                style.apply_to("!"),
                summary.escaped,
                summary.total,
                pct,
                seconds,
            );
        }
    }

    let dim = Style::new().dim();
    if summary.timeout > 0 {
        println!("  {} {} mutants timed out", dim.apply_to("·"), summary.timeout);
    }
    if summary.error > 0 {
        println!("  {} {} mutants errored", dim.apply_to("·"), summary.error);
    }
    if summary.not_covered > 0 {
        println!(
            "  {} {} mutants not covered by any test",
            dim.apply_to("·"),
            summary.not_covered,
        );
    }

    if !summary.escaped_mutants.is_empty() {
        println!();
        for m in &summary.escaped_mutants {
            let ref_style = Style::new().cyan().bold();
            println!(
                "  {} {}:{} ({} covering tests)",
                ref_style.apply_to(format!("@{}", m.hash)),
                m.file,
                m.line,
                m.covering_tests,
            );
        }
        println!();
        println!("Use `mutiny show @<hash>` for details on a specific mutant.");
    }
}

pub fn print_status(summary: &RunSummary) {
    match summary.score {
        Some(score) => println!(
            "Last run: {} mutants, {} killed, {} escaped ({:.1}% score)",
            summary.total,
            summary.killed,
            summary.escaped,
            score * 100.0,
        ),
        None => println!(
            "Last run: {} mutants, none conclusively evaluated",
            summary.total,
        ),
    }

    if !summary.escaped_mutants.is_empty() {
        println!();
        for m in &summary.escaped_mutants {
            let ref_style = Style::new().cyan().bold();
            println!(
                "  {} {}:{}",
                ref_style.apply_to(format!("@{}", m.hash)),
                m.file,
                m.line,
            );
        }
    }
}

pub fn print_escaped_detail(m: &EscapedMutant) {
    let ref_style = Style::new().cyan().bold();
    println!(
        "{} {}:{}",
        ref_style.apply_to(format!("@{}", m.hash)),
        m.file,
        m.line,
    );
    let dim = Style::new().dim();
    println!(
        "  {} escaped despite {} covering tests",
        dim.apply_to("·"),
        m.covering_tests,
    );
}
