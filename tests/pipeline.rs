use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::Duration,
};

use autocompiler::{
    compiler::CompileState,
    config::{Cli, Settings},
    logger::Logger,
    pipeline,
    reporter::Mark,
    runner::RunStatus,
};
use clap::Parser;
use tempdir::TempDir;

// Stands in for gcc: "compiles" a shell script by copying it. A WARN
// source gets a warning on stderr but is still copied and exits 0.
const FAKE_CC: &str = "#!/bin/sh\n\
    if grep -q WARN \"$1\"; then\n\
      echo \"$1: warning: unused variable\" >&2\n\
      cp \"$1\" \"$3\"\n\
      chmod +x \"$3\"\n\
      exit 0\n\
    fi\n\
    if grep -q BROKEN \"$1\"; then\n\
      echo \"$1: error: expected ';'\" >&2\n\
      exit 1\n\
    fi\n\
    cp \"$1\" \"$3\"\n\
    chmod +x \"$3\"\n";

struct Workspace {
    _tmp: TempDir,
    root: PathBuf,
    cc: PathBuf,
}

impl Workspace {
    fn new(submissions: &[(&str, &str)]) -> Self {
        let tmp = TempDir::new("autocompiler_e2e").unwrap();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("submissions")).unwrap();
        for (name, body) in submissions {
            fs::write(root.join("submissions").join(name), body).unwrap();
        }

        let cc = root.join("fakecc");
        fs::write(&cc, FAKE_CC).unwrap();
        fs::set_permissions(&cc, fs::Permissions::from_mode(0o755)).unwrap();

        Self {
            _tmp: tmp,
            root,
            cc,
        }
    }

    fn path(&self, p: &str) -> PathBuf {
        self.root.join(p)
    }

    fn settings(&self, expected: &str) -> Settings {
        Settings {
            submissions_dir: self.path("submissions"),
            compiled_dir: self.path("compiled"),
            compiler: self.cc.to_str().unwrap().to_string(),
            compiler_args: Vec::new(),
            jobs: Some(4),
            timer: Vec::new(),
            time_token: 2,
            run_timeout: Some(Duration::from_secs(5)),
            table_path: self.path("table.txt"),
            expected: expected.to_string(),
        }
    }
}

fn submission(output: &str, seconds: &str) -> String {
    format!("#!/bin/sh\nprintf '{output}'\necho '0.00 0.00 {seconds}' >&2\n")
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn two_compile_one_fails() {
    let fast = submission("42", "0.05");
    let wrong = submission("41", "0.01");
    let ws = Workspace::new(&[
        ("broken.c", "int main( { BROKEN"),
        ("fast.c", &fast),
        ("wrong.c", &wrong),
    ]);

    let summary = pipeline::execute(&ws.settings("42"), &Logger::new("test")).unwrap();

    assert_eq!(summary.compile.attempted(), 3);
    assert_eq!(summary.compile.succeeded(), 2);
    assert_eq!(file_names(&ws.path("compiled")), vec!["fast", "wrong"]);

    assert_eq!(summary.scores.len(), 2);
    let rows: Vec<_> = summary
        .table
        .rows
        .iter()
        .map(|r| (r.name.as_str(), r.mark))
        .collect();
    assert_eq!(rows, vec![("fast", Mark::Winner), ("wrong", Mark::Incorrect)]);
    assert_eq!(
        summary.scores[0].status,
        RunStatus::Finished { seconds: 0.05 }
    );

    let saved = fs::read_to_string(ws.path("table.txt")).unwrap();
    assert_eq!(saved, summary.table.render_plain());
    assert!(saved.contains("fast"));
    assert!(saved.contains("wrong"));
    assert!(!saved.contains("broken"));

    assert!(!summary.all_passed());
}

#[test]
fn warned_compile_is_excluded_from_the_table() {
    // The warned submission is the fastest correct one if it were ever run.
    let warned = format!("{}# WARN\n", submission("42", "0.01"));
    let clean = submission("42", "0.20");
    let ws = Workspace::new(&[("clean.c", &clean), ("warned.c", &warned)]);

    let summary = pipeline::execute(&ws.settings("42"), &Logger::new("test")).unwrap();

    let warned_state = summary
        .compile
        .outcomes
        .iter()
        .find(|o| o.name == "warned")
        .map(|o| o.state);
    assert_eq!(warned_state, Some(CompileState::Failed));
    assert_eq!(file_names(&ws.path("compiled")), vec!["clean"]);

    let rows: Vec<_> = summary
        .table
        .rows
        .iter()
        .map(|r| (r.name.as_str(), r.mark))
        .collect();
    assert_eq!(rows, vec![("clean", Mark::Winner)]);
    assert_eq!(summary.scores.len(), summary.compile.succeeded());
    assert!(!summary.all_passed());
}

#[test]
fn stale_artifacts_are_cleared() {
    let ok = submission("42", "0.02");
    let ws = Workspace::new(&[("ok.c", &ok)]);
    fs::create_dir_all(ws.path("compiled")).unwrap();
    fs::write(ws.path("compiled").join("leftover"), "#!/bin/sh\nprintf 42\n").unwrap();

    let summary = pipeline::execute(&ws.settings("42"), &Logger::new("test")).unwrap();

    assert_eq!(summary.clean.deleted, 1);
    assert_eq!(summary.scores.len(), 1);
    assert_eq!(summary.scores[0].name, "ok");
    assert!(summary.all_passed());
}

#[test]
fn failed_compile_output_is_never_run() {
    let ws = Workspace::new(&[("only.c", "BROKEN")]);

    let summary = pipeline::execute(&ws.settings("42"), &Logger::new("test")).unwrap();

    assert_eq!(summary.compile.outcomes.len(), 1);
    assert_eq!(summary.compile.outcomes[0].state, CompileState::Failed);
    assert!(summary.scores.is_empty());
    assert!(summary.table.rows.is_empty());
    assert!(!summary.all_passed());
}

#[test]
fn run_from_cli_flags() {
    let ok = submission("hello", "0.03");
    let ws = Workspace::new(&[("greeter.c", &ok)]);
    let config = ws.path("config.json");
    fs::write(&config, r#"{ "correct": "hello" }"#).unwrap();

    let args: Vec<String> = [
        "autocompiler",
        "--submissions",
        ws.path("submissions").to_str().unwrap(),
        "--compiled",
        ws.path("compiled").to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--compiler",
        ws.cc.to_str().unwrap(),
        "--timer",
        "",
        "--table",
        ws.path("table.txt").to_str().unwrap(),
        "--color",
        "off",
        "-j",
        "2",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let summary = autocompiler::run(Cli::parse_from(args)).unwrap();

    assert!(summary.all_passed());
    assert_eq!(summary.table.winners().count(), 1);
    assert!(ws.path("table.txt").is_file());
}

#[test]
fn missing_config_is_fatal() {
    let ws = Workspace::new(&[]);
    let cli = Cli::parse_from([
        "autocompiler",
        "--config",
        ws.path("nope.json").to_str().unwrap(),
    ]);

    assert!(Settings::from_cli(&cli).is_err());
}
