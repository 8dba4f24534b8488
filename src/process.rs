use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::events::{EngineEvent, EventBus, RunScope};
use crate::mutants::Mutant;

/// Output channel of a spawned process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Out,
    Err,
}

/// A parsed test command template, shared by the baseline run and every
/// mutant run. Invocation-specific arguments are appended per run.
#[derive(Debug, Clone)]
pub struct TestCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl TestCommand {
    /// Split a command string into program + leading args, resolving a
    /// relative program path (e.g. `.venv/bin/pytest`) against the
    /// current directory so it keeps working from any working dir.
    pub fn parse(cmd: &str, working_dir: &Path) -> TestCommand {
        let mut parts = cmd.split_whitespace();
        let program = parts.next().unwrap_or(cmd).to_string();
        let args: Vec<String> = parts.map(|s| s.to_string()).collect();

        let program = if program.contains('/') && !Path::new(&program).is_absolute() {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let resolved = cwd.join(&program);
            if resolved.exists() {
                resolved.to_string_lossy().to_string()
            } else {
                program
            }
        } else {
            program
        };

        TestCommand {
            program,
            args,
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Invocation for the one-time baseline run: original config plus
    /// the caller's extra options, full suite.
    pub fn for_baseline(&self, config: &Path, extra_args: &[String]) -> ProcessSpec {
        let mut args = self.args.clone();
        args.push("--config".to_string());
        args.push(config.to_string_lossy().to_string());
        args.extend(extra_args.iter().cloned());
        ProcessSpec {
            program: self.program.clone(),
            args,
            working_dir: self.working_dir.clone(),
            scope: RunScope::Baseline,
        }
    }

    /// Invocation for one mutant: the config produced for it plus its
    /// covering test identifiers, so only relevant tests run where the
    /// framework supports selection.
    pub fn for_mutant(&self, config: &Path, mutant: &Mutant) -> ProcessSpec {
        let mut args = self.args.clone();
        args.push("--config".to_string());
        args.push(config.to_string_lossy().to_string());
        args.extend(mutant.covering_tests.iter().cloned());
        ProcessSpec {
            program: self.program.clone(),
            args,
            working_dir: self.working_dir.clone(),
            scope: RunScope::Mutant(mutant.hash().to_string()),
        }
    }
}

/// One concrete process invocation.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub scope: RunScope,
}

/// Tuning for the watchdog loop. The error timeout is the grace window
/// granted after the first error-channel chunk; the wall timeout is a
/// hard cap on total runtime (unset for the baseline run).
#[derive(Debug, Clone, Copy)]
pub struct WatchdogOptions {
    pub error_timeout: Duration,
    pub poll_interval: Duration,
    pub wall_timeout: Option<Duration>,
}

impl Default for WatchdogOptions {
    fn default() -> Self {
        WatchdogOptions {
            error_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(10),
            wall_timeout: None,
        }
    }
}

impl WatchdogOptions {
    pub fn with_wall_timeout(mut self, cap: Duration) -> Self {
        self.wall_timeout = Some(cap);
        self
    }
}

/// What one process invocation produced. Classification is the
/// caller's job; baseline and mutant runs judge this differently.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub force_killed: bool,
}

fn spawn_reader<R: Read + Send + 'static>(
    channel: Channel,
    mut source: R,
    tx: mpsc::Sender<(Channel, String)>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match source.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    if tx.send((channel, chunk)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Run one process to completion or forced termination, streaming output
/// chunks to `on_chunk` as they arrive.
///
/// The first error-channel chunk arms a single-shot deadline at
/// `now + error_timeout`; later error chunks never re-arm it. Without
/// that, a process that floods stderr continuously would push the
/// deadline forever and the run would never end. Once armed, the poll
/// loop keeps waiting for a natural exit until the deadline passes, then
/// kills the process. An optional wall timeout caps total runtime the
/// same way.
///
/// `SuiteRunStarted` fires before the spawn, `TestCaseCompleted` per
/// chunk, and `SuiteRunFinished` exactly once after exit or kill.
pub fn run_watched(
    spec: &ProcessSpec,
    opts: &WatchdogOptions,
    events: &EventBus,
    mut on_chunk: impl FnMut(Channel, &str),
) -> std::io::Result<ProcessResult> {
    events.emit(EngineEvent::SuiteRunStarted {
        scope: spec.scope.clone(),
    });

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let start = Instant::now();
    let (tx, rx) = mpsc::channel::<(Channel, String)>();
    let mut readers = Vec::new();
    if let Some(out) = child.stdout.take() {
        readers.push(spawn_reader(Channel::Out, out, tx.clone()));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(spawn_reader(Channel::Err, err, tx.clone()));
    }
    drop(tx);

    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut armed_deadline: Option<Instant> = None;
    let mut force_killed = false;

    let exit_code = loop {
        while let Ok((channel, chunk)) = rx.try_recv() {
            match channel {
                Channel::Out => stdout.push_str(&chunk),
                Channel::Err => {
                    stderr.push_str(&chunk);
                    // Single-shot: only the first error chunk arms.
                    if armed_deadline.is_none() {
                        armed_deadline = Some(Instant::now() + opts.error_timeout);
                    }
                }
            }
            events.emit(EngineEvent::TestCaseCompleted {
                scope: spec.scope.clone(),
            });
            on_chunk(channel, &chunk);
        }

        if let Some(status) = child.try_wait()? {
            break status.code();
        }

        let deadline_passed = armed_deadline.is_some_and(|d| Instant::now() >= d);
        let wall_exceeded = opts.wall_timeout.is_some_and(|cap| start.elapsed() >= cap);
        if deadline_passed || wall_exceeded {
            let _ = child.kill();
            let status = child.wait()?;
            force_killed = true;
            break status.code();
        }

        std::thread::sleep(opts.poll_interval);
    };

    for handle in readers {
        let _ = handle.join();
    }
    // Chunks buffered while the process was exiting are still delivered
    // before the finished signal.
    while let Ok((channel, chunk)) = rx.try_recv() {
        match channel {
            Channel::Out => stdout.push_str(&chunk),
            Channel::Err => stderr.push_str(&chunk),
        }
        events.emit(EngineEvent::TestCaseCompleted {
            scope: spec.scope.clone(),
        });
        on_chunk(channel, &chunk);
    }

    events.emit(EngineEvent::SuiteRunFinished {
        scope: spec.scope.clone(),
        force_killed,
    });

    Ok(ProcessResult {
        exit_code,
        stdout,
        stderr,
        duration: start.elapsed(),
        force_killed,
    })
}
