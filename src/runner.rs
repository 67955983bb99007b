use std::{
    io::{self, Read},
    os::unix::process::{CommandExt, ExitStatusExt},
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use thiserror::Error;
use wait_timeout::ChildExt;

use crate::{
    logger::Logger,
    runner_file_utils::{base_name, list_files},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Finished { seconds: f64 },
    TimedOut,
    Incomplete { reason: String },
}

/// Outcome of executing one compiled submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub name: String,
    #[serde(flatten)]
    pub status: RunStatus,
    pub correct: bool,
    pub output: String,
}

impl ScoreEntry {
    pub fn seconds(&self) -> Option<f64> {
        match self.status {
            RunStatus::Finished { seconds } => Some(seconds),
            _ => None,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum TimingError {
    #[error("no timing line on stderr")]
    MissingLine,
    #[error("timing line {line:?} has no token {index}")]
    MissingToken { line: String, index: usize },
    #[error("timing token {0:?} is not a number")]
    NotANumber(String),
}

/// Pulls the elapsed seconds out of the timer's report: the last non-empty
/// line of `stderr`, split on whitespace, token `index`.
pub fn parse_elapsed(stderr: &str, index: usize) -> Result<f64, TimingError> {
    let line = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or(TimingError::MissingLine)?;
    let token = line
        .split_whitespace()
        .nth(index)
        .ok_or_else(|| TimingError::MissingToken {
            line: line.to_string(),
            index,
        })?;
    token
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .ok_or_else(|| TimingError::NotANumber(token.to_string()))
}

#[derive(Debug, Clone)]
pub struct RunnerConfig<'a> {
    pub timer: &'a [String],
    pub time_token: usize,
    pub timeout: Option<Duration>,
    pub expected: &'a str,
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut reader) = reader {
            if let Err(e) = reader.read_to_end(&mut buffer) {
                log::warn!("Failed to read child output: {e}");
            }
        }
        buffer
    })
}

fn kill_group(child: &mut Child) -> io::Result<()> {
    // The child leads its own process group, so this reaches the timer's
    // children too.
    let pgid = child.id() as libc::pid_t;
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        child.kill()?;
    }
    Ok(())
}

/// `None` when the limit elapsed and the process group was killed.
fn wait_for(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(limit) = timeout else {
        return child.wait().map(Some);
    };
    match child.wait_timeout(limit)? {
        Some(status) => Ok(Some(status)),
        None => {
            kill_group(child)?;
            child.wait()?;
            Ok(None)
        }
    }
}

fn describe_exit(status: ExitStatus) -> String {
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exit code {code}"),
        (None, Some(libc::SIGSEGV)) => "segmentation fault".into(),
        (None, Some(libc::SIGABRT)) => "aborted".into(),
        (None, Some(libc::SIGFPE)) => "floating point exception".into(),
        (None, Some(sig)) => format!("signal {sig}"),
        (None, None) => "unknown termination".into(),
    }
}

/// Runs one artifact to completion (or timeout) and scores it.
pub fn run_one(artifact: &Path, name: &str, config: &RunnerConfig) -> Result<ScoreEntry> {
    let mut cmd = match config.timer.split_first() {
        Some((timer, timer_args)) => {
            let mut cmd = Command::new(timer);
            cmd.args(timer_args).arg(artifact);
            cmd
        }
        None => Command::new(artifact),
    };
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);
    log::debug!("spawning {:?}", cmd);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn {}", artifact.display()))?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let waited = wait_for(&mut child, config.timeout);
    if waited.is_err() {
        // Never leave the group running or the readers detached.
        let _ = kill_group(&mut child);
        let _ = child.wait();
    }

    let stdout = stdout
        .join()
        .map_err(|_| anyhow!("stdout reader for {name} panicked"))?;
    let stderr = stderr
        .join()
        .map_err(|_| anyhow!("stderr reader for {name} panicked"))?;
    let exit = waited.with_context(|| format!("Failed to wait for {name}"))?;
    let output = String::from_utf8_lossy(&stdout).into_owned();
    let diagnostics = String::from_utf8_lossy(&stderr);

    let status = match exit {
        None => RunStatus::TimedOut,
        Some(exit) => match parse_elapsed(&diagnostics, config.time_token) {
            Ok(seconds) => RunStatus::Finished { seconds },
            Err(e) => RunStatus::Incomplete {
                reason: format!("{} ({e})", describe_exit(exit)),
            },
        },
    };
    let correct = matches!(status, RunStatus::Finished { .. }) && output == config.expected;

    Ok(ScoreEntry {
        name: name.to_string(),
        status,
        correct,
        output,
    })
}

/// Executes every artifact in `dir` strictly one after another.
///
/// The next process is spawned only once the previous one has been reaped,
/// so timings never overlap. Entries come back in execution order.
pub fn run_all(dir: &Path, config: &RunnerConfig, logger: &Logger) -> Vec<ScoreEntry> {
    let artifacts = match list_files(dir) {
        Ok(files) => files,
        Err(e) => {
            logger.error(format!("{e:#}"));
            Vec::new()
        }
    };
    logger.info(format!("Running {} files...", artifacts.len()));

    let mut scores = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let Some(name) = base_name(&artifact) else {
            continue;
        };
        logger.info(format!("Running {name}..."));

        let entry = match run_one(&artifact, &name, config) {
            Ok(entry) => entry,
            Err(e) => ScoreEntry {
                name: name.clone(),
                status: RunStatus::Incomplete {
                    reason: format!("{e:#}"),
                },
                correct: false,
                output: String::new(),
            },
        };

        match &entry.status {
            RunStatus::Finished { .. } if entry.correct => {
                logger.success(format!("{name} is correct"))
            }
            RunStatus::Finished { .. } => logger.failure(format!("{name} is incorrect")),
            RunStatus::TimedOut => logger.failure(format!("{name} timed out")),
            RunStatus::Incomplete { reason } => {
                logger.failure(format!("{name} did not complete: {reason}"))
            }
        }
        scores.push(entry);
    }

    logger.info("All compiled submissions finished running");
    logger.gap();

    scores
}
