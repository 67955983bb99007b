use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rayon::prelude::*;

use crate::{logger::Logger, runner_file_utils::list_entries};

#[derive(Debug, Default)]
pub struct CleanReport {
    pub deleted: usize,
    pub failed: Vec<(PathBuf, io::Error)>,
}

fn remove(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Makes sure `dir` exists and holds nothing from a previous run.
///
/// Deletions run in parallel. One failing entry never stops the others; the
/// failures are logged and handed back in the report.
pub fn clean(dir: &Path, logger: &Logger) -> CleanReport {
    if let Err(e) = fs::create_dir_all(dir) {
        logger.error(format!("Could not create '{}': {e}", dir.display()));
        return CleanReport::default();
    }
    logger.info(format!("Created '{}'", dir.display()));

    let entries = match list_entries(dir) {
        Ok(entries) => entries,
        Err(e) => {
            logger.error(format!("{e:#}"));
            return CleanReport::default();
        }
    };

    let results: Vec<_> = entries
        .into_par_iter()
        .map(|path| {
            let res = remove(&path);
            (path, res)
        })
        .collect();

    let mut report = CleanReport::default();
    for (path, res) in results {
        match res {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                log::warn!("Failed to delete {}: {}", path.display(), e);
                report.failed.push((path, e));
            }
        }
    }

    let total = report.deleted + report.failed.len();
    if report.failed.is_empty() {
        logger.info(format!(
            "Deleted all {total} files from '{}'",
            dir.display()
        ));
    } else {
        logger.error(format!(
            "Deleted {} of {total} files from '{}'",
            report.deleted,
            dir.display()
        ));
    }
    logger.gap();

    report
}
