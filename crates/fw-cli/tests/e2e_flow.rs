//! End-to-end tests for the `fw` binary.
//!
//! Each test gets its own temp HOME and database so runs never touch the
//! user's real data.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

struct Env {
    temp: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    fn db_path(&self) -> PathBuf {
        self.temp.path().join("data").join("fw.db")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_fw"));
        cmd.env("HOME", self.temp.path())
            .env("XDG_CONFIG_HOME", self.temp.path().join(".config"))
            .env("FW_DATABASE_PATH", self.db_path())
            .env_remove("FW_STREAM")
            .env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        let output = self.command().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "fw {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }

    fn run_with_stdin(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        let output = child.wait_with_output().unwrap();
        assert!(
            output.status.success(),
            "fw {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.run(args);
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn ingest_app(env: &Env, app: &str, title: Option<&str>, at: &str) {
    let mut args = vec!["ingest", "app", "--app", app, "--at", at];
    if let Some(title) = title {
        args.extend(["--title", title]);
    }
    env.run(&args);
}

fn exists(path: &Path) -> bool {
    path.try_exists().unwrap()
}

#[test]
fn test_ingest_builds_sessions() {
    let env = Env::new();

    ingest_app(&env, "Code", Some("main.rs"), "2025-01-01T09:00:00Z");
    ingest_app(&env, "Code", Some("lib.rs"), "2025-01-01T09:05:00Z");
    ingest_app(&env, "Firefox", Some("Rust docs"), "2025-01-01T09:20:00Z");
    ingest_app(&env, "Code", None, "2025-01-01T09:30:00Z");

    assert!(exists(&env.db_path()));

    let value = env.json(&["sessions", "--json"]);
    let sessions = value["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 3);
    assert_eq!(sessions[0]["app_name"], "Code");
    assert_eq!(sessions[0]["end_time"], "2025-01-01T09:20:00Z");
    assert!(sessions[2]["end_time"].is_null());

    assert_eq!(value["by_app"][0]["app"], "Code");
    assert_eq!(value["by_app"][0]["total_secs"], 1_200);
    assert_eq!(value["by_app"][1]["app"], "Firefox");
    assert_eq!(value["by_app"][1]["total_secs"], 600);
}

#[test]
fn test_out_of_order_observation_fails() {
    let env = Env::new();
    ingest_app(&env, "Code", None, "2025-01-01T09:00:00Z");

    let output = env
        .command()
        .args(["ingest", "app", "--app", "Slack", "--at", "2025-01-01T08:00:00Z"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let value = env.json(&["sessions", "--json"]);
    assert_eq!(value["sessions"].as_array().unwrap().len(), 1);
    assert!(value["sessions"][0]["end_time"].is_null());
}

#[test]
fn test_focus_pings_become_intervals() {
    let env = Env::new();

    env.run(&["ingest", "focus", "--state", "focused", "--at", "2025-01-01T09:00:00Z"]);
    env.run(&["ingest", "focus", "--state", "unfocused", "--at", "2025-01-01T09:25:00Z"]);
    env.run(&[
        "ingest",
        "focus",
        "--state",
        "focused",
        "--at",
        "2025-01-01T09:26:00Z",
        "--duration",
        "600",
    ]);

    let value = env.json(&["focus", "--json"]);
    let durations: Vec<i64> = value["intervals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["duration_secs"].as_i64().unwrap())
        .collect();
    assert_eq!(durations, vec![1_500, 60, 600]);
    assert_eq!(value["summary"]["focused_secs"], 2_100);
    assert_eq!(value["streaks"]["longest_focused"]["duration_secs"], 1_500);
}

#[test]
fn test_import_reports_rejected_lines() {
    let env = Env::new();
    let input = r#"{"type":"app","app":"Code","title":"main.rs","at":"2025-01-01T09:00:00Z"}
{"type":"focus","timestamp":"2025-01-01T09:00:00Z","state":"focused"}
garbage
{"type":"app","app":"Slack","at":"2025-01-01T09:10:00Z"}
{"type":"focus","timestamp":"2025-01-01T09:10:00Z","state":"unfocused","duration":30}
"#;

    let output = env.run_with_stdin(&["import"], input);
    let text = stdout(&output);
    assert!(text.contains("Imported 2 app observation(s) and 2 focus ping(s)."));
    assert!(text.contains("Rejected line 3"));

    // Same batch again adds nothing.
    let output = env.run_with_stdin(&["import"], input);
    assert!(stdout(&output).contains("and 0 focus ping(s)."));

    let value = env.json(&["focus", "--json"]);
    assert_eq!(value["intervals"].as_array().unwrap().len(), 2);
    assert_eq!(value["summary"]["focused_secs"], 600);
    assert_eq!(value["summary"]["unfocused_secs"], 30);
}

#[test]
fn test_recompute_is_repeatable() {
    let env = Env::new();
    env.run(&["ingest", "focus", "--state", "focused", "--at", "2025-01-01T09:00:00Z"]);
    env.run(&["ingest", "focus", "--state", "unfocused", "--at", "2025-01-01T09:01:00Z"]);

    let first = stdout(&env.run(&["recompute"]));
    let second = stdout(&env.run(&["recompute"]));
    assert_eq!(first, "Recomputed 2 focus interval(s).\n");
    assert_eq!(first, second);
}

#[test]
fn test_report_json_on_empty_database() {
    let env = Env::new();

    let value = env.json(&["report", "--json"]);
    assert_eq!(value["session_count"], 0);
    assert_eq!(value["metrics"]["total_duration_secs"], 0);
    assert!(value["metrics"]["top_app"].is_null());
    assert!(value["period"]["start"].is_string());
}

#[test]
fn test_status_shows_open_session() {
    let env = Env::new();
    ingest_app(&env, "Code", Some("main.rs"), "2025-01-01T09:00:00Z");

    let text = stdout(&env.run(&["status"]));
    assert!(text.contains("Open session: Code (main.rs) since 2025-01-01T09:00:00.000Z"));
    assert!(text.contains("- app: 2025-01-01T09:00:00.000Z"));
}

#[test]
fn test_no_command_prints_help() {
    let env = Env::new();
    let text = stdout(&env.run(&[]));
    assert!(text.contains("Usage: fw"));
}
