use logger::Logger;
use pipeline::Summary;

pub mod cleaner;
pub mod compiler;
pub mod config;
pub mod logger;
pub mod pipeline;
pub mod reporter;
pub mod runner;
pub mod runner_file_utils;

pub fn run(cli: config::Cli) -> anyhow::Result<Summary> {
    if let Some(color) = cli.color.as_deref() {
        colored::control::set_override(color == "on");
    }

    let settings = config::Settings::from_cli(&cli)?;
    let logger = Logger::new("autocompiler");
    let summary = pipeline::execute(&settings, &logger)?;

    if cli.json {
        println!("{}", serde_json::to_string(&summary.scores)?);
    }

    Ok(summary)
}
