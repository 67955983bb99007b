use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding one source file per submission
    #[arg(short = 's', long, default_value = "submissions")]
    pub submissions: PathBuf,

    /// Directory compiled submissions are written to (emptied on every run)
    #[arg(short = 'o', long, default_value = "compiled")]
    pub compiled: PathBuf,

    /// JSON file holding the expected answer under "correct"
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Compiler invoked as `<compiler> <source> -o <output>`
    #[arg(long, default_value = "gcc")]
    pub compiler: String,

    /// Add comma-separated args for compiler
    #[arg(short = 'a', long)]
    pub args: Option<String>,

    /// Number of compilers to run in parallel
    #[arg(short = 'j', long, value_parser = clap::value_parser!(u32))]
    pub parallel: Option<u32>,

    /// Comma-separated timing wrapper, e.g. `/usr/bin/time,-f,%U %S %e` (empty runs directly)
    #[arg(long)]
    pub timer: Option<String>,

    /// Index of the elapsed-seconds token in the timer's last stderr line
    #[arg(long)]
    pub time_token: Option<usize>,

    /// Execution time limit in seconds (0 disables)
    #[arg(long, value_parser = clap::value_parser!(u32), default_value = "10")]
    pub limit_run: u32,

    /// Where the plain-text score table is saved
    #[arg(long, default_value = "table.txt")]
    pub table: PathBuf,

    /// Terminal coloring
    #[arg(short = 'c', long, value_parser = ["on", "off"])]
    pub color: Option<String>,

    /// Print score entries as JSON after the table
    #[arg(long)]
    pub json: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config has no \"correct\" answer")]
    MissingAnswer,
    #[error("\"correct\" must be a string, number or boolean, got {0}")]
    UnsupportedAnswer(serde_json::Value),
}

#[derive(Deserialize)]
struct AnswerFile {
    correct: Option<serde_json::Value>,
}

/// Reads the expected answer, converting numbers and booleans to their
/// plain string form.
pub fn load_answer(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let file: AnswerFile = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;

    use serde_json::Value;
    let answer = match file.correct.ok_or(ConfigError::MissingAnswer)? {
        Value::String(s) => s,
        v @ (Value::Number(_) | Value::Bool(_)) => v.to_string(),
        other => return Err(ConfigError::UnsupportedAnswer(other).into()),
    };

    Ok(answer)
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        // BSD time prints "<real> real <user> user <sys> sys"
        const DEFAULT_TIMER: &[&str] = &["/usr/bin/time"];
        const DEFAULT_TIME_TOKEN: usize = 0;
    } else {
        const DEFAULT_TIMER: &[&str] = &["/usr/bin/time", "-f", "%U %S %e"];
        const DEFAULT_TIME_TOKEN: usize = 2;
    }
}

/// Everything the pipeline needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub submissions_dir: PathBuf,
    pub compiled_dir: PathBuf,
    pub compiler: String,
    pub compiler_args: Vec<String>,
    pub jobs: Option<usize>,
    pub timer: Vec<String>,
    pub time_token: usize,
    pub run_timeout: Option<Duration>,
    pub table_path: PathBuf,
    pub expected: String,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let expected = load_answer(&cli.config)?;

        let timer = match &cli.timer {
            Some(t) => split_list(t),
            None => DEFAULT_TIMER.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            submissions_dir: cli.submissions.clone(),
            compiled_dir: cli.compiled.clone(),
            compiler: cli.compiler.clone(),
            compiler_args: cli.args.as_deref().map(split_list).unwrap_or_default(),
            jobs: cli.parallel.map(|j| j.max(1) as usize),
            timer,
            time_token: cli.time_token.unwrap_or(DEFAULT_TIME_TOKEN),
            run_timeout: match cli.limit_run {
                0 => None,
                secs => Some(Duration::from_secs(secs as u64)),
            },
            table_path: cli.table.clone(),
            expected,
        })
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}
