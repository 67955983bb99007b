use anyhow::Result;

use crate::{
    cleaner::{self, CleanReport},
    compiler::{self, CompileReport, CompilerConfig},
    config::Settings,
    logger::Logger,
    reporter::{self, ResultsTable},
    runner::{self, RunnerConfig, ScoreEntry},
};

/// What a full clean → compile → run → report pass produced.
#[derive(Debug)]
pub struct Summary {
    pub clean: CleanReport,
    pub compile: CompileReport,
    pub scores: Vec<ScoreEntry>,
    pub table: ResultsTable,
}

impl Summary {
    /// Every submission compiled and every run matched the answer.
    pub fn all_passed(&self) -> bool {
        self.compile.succeeded() == self.compile.attempted()
            && self.scores.len() == self.compile.succeeded()
            && self.scores.iter().all(|s| s.correct)
    }
}

/// Runs the four phases in order. Each phase only starts once the previous
/// one has fully returned.
pub fn execute(settings: &Settings, logger: &Logger) -> Result<Summary> {
    let clean = cleaner::clean(&settings.compiled_dir, logger);

    let compile = compiler::compile_all(
        &settings.submissions_dir,
        &CompilerConfig {
            compiler: &settings.compiler,
            args: &settings.compiler_args,
            output_dir: &settings.compiled_dir,
            jobs: settings.jobs,
        },
        logger,
    )?;

    let scores = runner::run_all(
        &settings.compiled_dir,
        &RunnerConfig {
            timer: &settings.timer,
            time_token: settings.time_token,
            timeout: settings.run_timeout,
            expected: &settings.expected,
        },
        logger,
    );

    let table = reporter::report(&scores, &settings.table_path, logger);

    Ok(Summary {
        clean,
        compile,
        scores,
        table,
    })
}
