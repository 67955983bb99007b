use std::{
    collections::HashSet,
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::{
    logger::Logger,
    runner_file_utils::{base_name, list_files},
};

/// Classification of one compile. Only a single transition out of
/// `Pending` is ever taken; later signals are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileState {
    Pending,
    Succeeded,
    Failed,
}

impl CompileState {
    /// Returns `true` when this call decided the outcome.
    pub fn settle(&mut self, outcome: CompileState) -> bool {
        if *self != CompileState::Pending || outcome == CompileState::Pending {
            return false;
        }
        *self = outcome;
        true
    }
}

#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub name: String,
    pub source: PathBuf,
    pub state: CompileState,
    pub diagnostics: String,
}

#[derive(Debug, Clone)]
pub struct CompilerConfig<'a> {
    pub compiler: &'a str,
    pub args: &'a [String],
    pub output_dir: &'a Path,
    pub jobs: Option<usize>,
}

#[derive(Debug, Default)]
pub struct CompileReport {
    pub outcomes: Vec<CompileOutcome>,
}

impl CompileReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == CompileState::Succeeded)
            .count()
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }
}

fn compile_file(
    source: &Path,
    name: &str,
    config: &CompilerConfig,
    logger: &Logger,
) -> CompileOutcome {
    let output = config.output_dir.join(name);
    let mut state = CompileState::Pending;
    let mut diagnostics = String::new();

    let mut cmd = Command::new(config.compiler);
    cmd.arg(source)
        .arg("-o")
        .arg(&output)
        .args(config.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    log::debug!("spawning {:?}", cmd);

    match cmd.spawn() {
        Ok(mut child) => {
            if let Some(mut stderr) = child.stderr.take() {
                // The first byte on stderr decides, without waiting for exit.
                let mut first = [0u8; 1];
                loop {
                    match stderr.read(&mut first) {
                        Ok(0) => break,
                        Ok(_) => {
                            if state.settle(CompileState::Failed) {
                                logger.failure(format!("Not compiled {name}"));
                            }
                            break;
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            log::warn!("Failed to read compiler stderr for {name}: {e}");
                            break;
                        }
                    }
                }

                let mut rest = Vec::new();
                if state == CompileState::Failed {
                    rest.push(first[0]);
                }
                if let Err(e) = stderr.read_to_end(&mut rest) {
                    log::warn!("Failed to drain compiler stderr for {name}: {e}");
                }
                diagnostics = String::from_utf8_lossy(&rest).into_owned();
            }

            if let Err(e) = child.wait() {
                log::warn!("Failed to wait for compiler on {name}: {e}");
            }
        }
        Err(e) => {
            diagnostics = format!("Failed to spawn '{}': {e}", config.compiler);
            if state.settle(CompileState::Failed) {
                logger.failure(format!("Not compiled {name}"));
            }
        }
    }

    if state.settle(CompileState::Succeeded) {
        logger.success(format!("Compiled {name}"));
    } else if output.exists() {
        // A failed compile must leave nothing behind for the runner.
        if let Err(e) = fs::remove_file(&output) {
            log::warn!("Failed to remove {}: {e}", output.display());
        }
    }
    if !diagnostics.is_empty() {
        log::debug!("{name}:\n{diagnostics}");
    }

    CompileOutcome {
        name: name.to_string(),
        source: source.to_path_buf(),
        state,
        diagnostics,
    }
}

/// Compiles every submission in `dir`, at most `config.jobs` at a time.
///
/// Returns once every file has been classified. A directory that cannot be
/// listed is logged and treated as empty.
pub fn compile_all(dir: &Path, config: &CompilerConfig, logger: &Logger) -> Result<CompileReport> {
    let files = match list_files(dir) {
        Ok(files) => files,
        Err(e) => {
            logger.error(format!("{e:#}"));
            Vec::new()
        }
    };
    logger.info(format!("Compiling {} files...", files.len()));

    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    let mut outcomes = Vec::new();
    for source in files {
        let Some(name) = base_name(&source) else {
            logger.debug(format!("Skipping {}: no base name", source.display()));
            continue;
        };
        if !seen.insert(name.clone()) {
            logger.failure(format!(
                "Not compiled {name} ({} shares its name)",
                source.display()
            ));
            outcomes.push(CompileOutcome {
                name,
                source,
                state: CompileState::Failed,
                diagnostics: "duplicate base name".into(),
            });
            continue;
        }
        jobs.push((source, name));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = config.jobs {
        builder = builder.num_threads(n);
    }
    let pool = builder
        .build()
        .context("Failed to build compiler thread pool")?;

    let compiled: Vec<_> = pool.install(|| {
        jobs.par_iter()
            .map(|(source, name)| compile_file(source, name, config, logger))
            .collect()
    });
    outcomes.extend(compiled);

    let report = CompileReport { outcomes };
    logger.info(format!(
        "{} of {} files compiled successfully",
        report.succeeded(),
        report.attempted()
    ));
    logger.gap();

    Ok(report)
}
