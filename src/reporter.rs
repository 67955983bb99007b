use std::{fs, path::Path};

use colored::Colorize;

use crate::{
    logger::Logger,
    runner::{RunStatus, ScoreEntry},
};

const MAX_OUTPUT_CHARS: usize = 20;
const HEADER: [&str; 3] = ["File Name", "Time (sec)", "Output"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Winner,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub time: String,
    pub output: String,
    pub mark: Mark,
}

/// Score rows in the order the submissions finished running.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsTable {
    pub rows: Vec<Row>,
}

/// Drops line breaks and shortens long output to 20 chars plus "...".
pub fn display_output(output: &str) -> String {
    let flat: String = output.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
    if flat.chars().count() > MAX_OUTPUT_CHARS {
        let mut short: String = flat.chars().take(MAX_OUTPUT_CHARS).collect();
        short.push_str("...");
        short
    } else {
        flat
    }
}

fn time_cell(status: &RunStatus) -> String {
    match status {
        RunStatus::Finished { seconds } => seconds.to_string(),
        RunStatus::TimedOut => "timeout".into(),
        RunStatus::Incomplete { .. } => "-".into(),
    }
}

impl ResultsTable {
    pub fn build(scores: &[ScoreEntry]) -> Self {
        let lowest = scores
            .iter()
            .filter(|s| s.correct)
            .filter_map(ScoreEntry::seconds)
            .reduce(f64::min);

        let rows = scores
            .iter()
            .map(|s| {
                let mark = match (s.correct, s.seconds()) {
                    (false, _) => Mark::Incorrect,
                    (true, Some(t)) if Some(t) == lowest => Mark::Winner,
                    (true, _) => Mark::Correct,
                };
                Row {
                    name: s.name.clone(),
                    time: time_cell(&s.status),
                    output: display_output(&s.output),
                    mark,
                }
            })
            .collect();

        Self { rows }
    }

    pub fn winners(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| r.mark == Mark::Winner)
    }

    /// Grid without any escape codes, as saved to disk.
    pub fn render_plain(&self) -> String {
        let mut grid = vec![HEADER.map(|h| Cell::plain(h.to_string()))];
        for row in &self.rows {
            grid.push([
                Cell::plain(row.name.clone()),
                Cell::plain(row.time.clone()),
                Cell::plain(row.output.clone()),
            ]);
        }
        render_grid(&grid)
    }

    /// Grid for the terminal: bold header, identifier colored by mark.
    pub fn render_colored(&self) -> String {
        let mut grid = vec![HEADER.map(|h| Cell::styled(h.to_string(), h.bold().to_string()))];
        for row in &self.rows {
            let name = match row.mark {
                Mark::Incorrect => Cell::styled(row.name.clone(), row.name.red().to_string()),
                Mark::Winner => Cell::styled(
                    format!("★ {}", row.name),
                    format!("{}{}", "★ ".yellow().bold(), row.name.green().bold()),
                ),
                Mark::Correct => Cell::styled(row.name.clone(), row.name.yellow().to_string()),
            };
            grid.push([
                name,
                Cell::plain(row.time.clone()),
                Cell::plain(row.output.clone()),
            ]);
        }
        render_grid(&grid)
    }
}

struct Cell {
    text: String,
    styled: String,
}

impl Cell {
    fn plain(text: String) -> Self {
        Self {
            styled: text.clone(),
            text,
        }
    }

    fn styled(text: String, styled: String) -> Self {
        Self { text, styled }
    }

    fn width(&self) -> usize {
        self.text.chars().count()
    }
}

fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}\n", inner.join(&mid.to_string()))
}

// Box-drawing grid with a rule between every row.
fn render_grid(grid: &[[Cell; 3]]) -> String {
    let mut widths = [0usize; 3];
    for row in grid {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }

    let mut out = border(&widths, '┌', '┬', '┐');
    for (i, row) in grid.iter().enumerate() {
        if i > 0 {
            out.push_str(&border(&widths, '├', '┼', '┤'));
        }
        out.push('│');
        for (cell, w) in row.iter().zip(widths) {
            let pad = " ".repeat(w - cell.width());
            out.push_str(&format!(" {}{pad} │", cell.styled));
        }
        out.push('\n');
    }
    out.push_str(&border(&widths, '└', '┴', '┘'));
    out
}

/// Writes the plain table to `path` and prints the colored one.
///
/// A failed write is logged; the terminal table is printed regardless.
pub fn report(scores: &[ScoreEntry], path: &Path, logger: &Logger) -> ResultsTable {
    let table = ResultsTable::build(scores);

    match fs::write(path, table.render_plain()) {
        Ok(()) => logger.info(format!("Score table saved as '{}'", path.display())),
        Err(e) => logger.error(format!(
            "Could not save score table to '{}': {e}",
            path.display()
        )),
    }
    println!("{}", table.render_colored());

    table
}
