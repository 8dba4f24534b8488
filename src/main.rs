use mutiny::baseline;
use mutiny::config_builder::{ConfigStrategy, PassthroughConfig, SynthesizingConfig};
use mutiny::events::EventBus;
use mutiny::mutants;
use mutiny::output;
use mutiny::process::{TestCommand, WatchdogOptions};
use mutiny::report::{Report, ScorePolicy};
use mutiny::scheduler::{Scheduler, TimeoutPolicy};
use mutiny::state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mutiny", version, about = "Mutation test execution engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a manifest of mutants against the test suite
    Run(RunArgs),
    /// Show details for an escaped mutant by hash
    Show {
        /// Mutant ref (e.g. @a1b2c3 or a1b2c3)
        #[arg(name = "ref")]
        mutant_ref: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Summary of the last run
    Status {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Mutant manifest (JSON array) from the mutation generator
    manifest: PathBuf,
    /// Test command to invoke (e.g. "pytest")
    #[arg(long, default_value = "pytest")]
    test_cmd: String,
    /// Original test-framework config path
    #[arg(short, long)]
    config: PathBuf,
    /// Project root the test processes run from (default: cwd)
    #[arg(long)]
    project_dir: Option<PathBuf>,
    /// Coverage map (JSON, file -> line -> tests) used to fill in
    /// covering tests the manifest left empty
    #[arg(long)]
    coverage: Option<PathBuf>,
    /// Synthesize a per-mutant config artifact instead of passing the
    /// original config through
    #[arg(long)]
    synthesize: bool,
    /// Scratch directory for synthesized configs (default: temp dir)
    #[arg(long)]
    scratch: Option<PathBuf>,
    /// Concurrent test processes
    #[arg(short, long, default_value = "4")]
    workers: usize,
    /// Timeout multiplier over the baseline duration
    #[arg(long, default_value = "3")]
    timeout_mult: f64,
    /// Fixed floor added to the per-mutant timeout, in milliseconds
    #[arg(long, default_value = "2000")]
    timeout_floor_ms: u64,
    /// Grace window after the first error-stream chunk, in seconds
    #[arg(long, default_value = "10")]
    error_timeout: u64,
    /// Watchdog poll interval, in milliseconds
    #[arg(long, default_value = "10")]
    poll_interval_ms: u64,
    /// Count uncovered mutants toward the score denominator
    #[arg(long)]
    include_not_covered: bool,
    /// Stderr substring treated as a framework crash (repeatable)
    #[arg(long = "crash-marker")]
    crash_markers: Vec<String>,
    /// Extra argument for the baseline invocation only (repeatable)
    #[arg(long = "baseline-arg")]
    baseline_args: Vec<String>,
    /// Output JSON instead of human-readable text
    #[arg(long)]
    json: bool,
    /// Exit code only, no output
    #[arg(short, long)]
    quiet: bool,
    /// Session ID for scratch isolation (default: auto-generated)
    #[arg(long)]
    session: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::Show { mutant_ref, json } => cmd_show(mutant_ref, json),
        Commands::Status { json } => cmd_status(json),
    };

    std::process::exit(exit_code);
}

fn generate_session_id() -> String {
    format!("{:08x}", fastrand::u32(..))
}

fn cmd_run(args: RunArgs) -> i32 {
    let project_dir = args
        .project_dir
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut mutant_set = match mutants::load_manifest(&args.manifest) {
        Ok(m) => m,
        Err(e) => {
            output::print_error(&e.to_string());
            return 2;
        }
    };

    if let Some(coverage_path) = &args.coverage {
        match mutants::load_coverage(coverage_path) {
            Ok(map) => mutants::apply_coverage(&mut mutant_set, &map),
            Err(e) => {
                output::print_error(&e.to_string());
                return 2;
            }
        }
    }

    let events = if args.quiet || args.json {
        EventBus::default()
    } else {
        EventBus::new(vec![Box::new(output::ConsoleListener)])
    };

    let watchdog = WatchdogOptions {
        error_timeout: Duration::from_secs(args.error_timeout),
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        wall_timeout: None,
    };

    let command = TestCommand::parse(&args.test_cmd, &project_dir);
    let baseline_spec = command.for_baseline(&args.config, &args.baseline_args);
    let baseline_run = match baseline::run_baseline(&baseline_spec, &watchdog, &events) {
        Ok(run) => run,
        Err(baseline::BaselineError::Failed { stdout, stderr, .. }) => {
            output::print_error(&format!(
                "Tests fail before mutation. Fix failing tests first.\n{stdout}\n{stderr}"
            ));
            return 3;
        }
        Err(e) => {
            output::print_error(&e.to_string());
            return 3;
        }
    };

    let session_id = args.session.unwrap_or_else(generate_session_id);
    let mut _scratch_guard = None;
    let strategy: Arc<dyn ConfigStrategy> = if args.synthesize {
        let scratch_dir = match args.scratch {
            Some(dir) => {
                if let Err(e) = std::fs::create_dir_all(&dir) {
                    output::print_error(&format!(
                        "Failed to create scratch directory {}: {e}",
                        dir.display()
                    ));
                    return 3;
                }
                dir
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix(&format!("mutiny-{session_id}-"))
                    .tempdir();
                match temp {
                    Ok(t) => {
                        let path = t.path().to_path_buf();
                        _scratch_guard = Some(t);
                        path
                    }
                    Err(e) => {
                        output::print_error(&format!("Failed to create scratch directory: {e}"));
                        return 3;
                    }
                }
            }
        };
        Arc::new(SynthesizingConfig::new(
            scratch_dir,
            project_dir.clone(),
            args.config.clone(),
        ))
    } else {
        Arc::new(PassthroughConfig::new(args.config.clone()))
    };

    let scheduler = Scheduler {
        command,
        strategy,
        workers: args.workers,
        timeouts: TimeoutPolicy {
            factor: args.timeout_mult,
            floor: Duration::from_millis(args.timeout_floor_ms),
        },
        watchdog,
        crash_markers: args.crash_markers,
        events: events.clone(),
    };

    let start = Instant::now();
    let outcomes = scheduler.run(mutant_set, &baseline_run);

    let mut report = Report::new(ScorePolicy {
        count_not_covered: args.include_not_covered,
    });
    report.record_all(outcomes);
    let summary = report.finalize(start.elapsed(), &events);

    state::save_last_run(&summary);

    if args.quiet {
        return if summary.escaped > 0 { 1 } else { 0 };
    }

    if args.json {
        match serde_json::to_string(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                output::print_error(&format!("Failed to serialize summary: {e}"));
                return 3;
            }
        }
    } else {
        output::print_summary(&summary);
    }

    if summary.escaped > 0 { 1 } else { 0 }
}

fn cmd_show(mutant_ref: String, json_mode: bool) -> i32 {
    let hash = mutant_ref.trim_start_matches('@');

    let last_run = match state::load_last_run() {
        Some(r) => r,
        None => {
            output::print_error("No previous run found. Run `mutiny run` first.");
            return 2;
        }
    };

    let mutant = last_run.escaped_mutants.iter().find(|m| m.hash == hash);
    match mutant {
        Some(m) => {
            if json_mode {
                match serde_json::to_string(m) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        output::print_error(&format!("Failed to serialize mutant: {e}"));
                        return 3;
                    }
                }
            } else {
                output::print_escaped_detail(m);
            }
            0
        }
        None => {
            let valid: Vec<_> = last_run
                .escaped_mutants
                .iter()
                .map(|m| format!("@{}", m.hash))
                .collect();
            output::print_error(&format!(
                "Mutant @{hash} not found. Valid refs: {}",
                valid.join(", ")
            ));
            2
        }
    }
}

fn cmd_status(json_mode: bool) -> i32 {
    match state::load_last_run() {
        Some(summary) => {
            if json_mode {
                match serde_json::to_string(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        output::print_error(&format!("Failed to serialize summary: {e}"));
                        return 3;
                    }
                }
            } else {
                output::print_status(&summary);
            }
            0
        }
        None => {
            output::print_error("No previous run found. Run `mutiny run` first.");
            2
        }
    }
}
