//! CLI integration tests for the cellar binary.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::fs;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir_str(&self) -> String {
        self.temp_dir.path().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cellar").expect("failed to find binary");
        cmd.env("NO_COLOR", "1")
            .args(["--data-dir", &self.data_dir_str()]);
        cmd
    }

    /// Runs a command with --json and parses stdout.
    fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .output()
            .expect("failed to run command");
        assert!(
            output.status.success(),
            "command {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("failed to parse JSON")
    }
}

#[test]
fn test_init_reports_fresh_then_current() {
    let ctx = TestContext::new();

    ctx.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("empty, created"));

    assert!(ctx.temp_dir.path().join("cellar.db").exists());

    let info = ctx.json(&["init"]);
    assert_eq!(info["previous_layout"], "current");
}

#[test]
fn test_table_lifecycle() {
    let ctx = TestContext::new();

    let table = ctx.json(&["table", "create", "Tasks"]);
    let id = table["id"].as_i64().unwrap().to_string();
    assert_eq!(table["name"], "Tasks");

    ctx.cmd()
        .args(["table", "create", "Tasks"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    ctx.cmd()
        .args(["table", "rename", &id, "Todo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Todo\""));

    ctx.cmd()
        .args(["table", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Todo"));

    ctx.cmd().args(["table", "delete", &id]).assert().success();

    let tables = ctx.json(&["table", "list"]);
    assert_eq!(tables.as_array().unwrap().len(), 0);
}

#[test]
fn test_rows_and_history() {
    let ctx = TestContext::new();

    let table = ctx.json(&["table", "create", "Tasks"]);
    let table_id = table["id"].as_i64().unwrap().to_string();
    ctx.json(&["column", "create", &table_id, "Title", "--unique"]);
    ctx.json(&[
        "column", "create", &table_id, "Status", "--type", "select", "--choice", "todo",
        "--choice", "done",
    ]);

    let row = ctx.json(&[
        "row", "create", &table_id, "--set", "Title=Buy milk", "--set", "Status=todo",
    ]);
    let row_id = row["row_id"].as_str().unwrap().to_string();

    ctx.cmd()
        .args(["row", "create", &table_id, "--set", "Title=Buy milk"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists in unique column"));

    ctx.cmd()
        .args(["row", "create", &table_id, "--set", "Status=later"])
        .assert()
        .failure();

    ctx.json(&["row", "update", &table_id, &row_id, "--set", "Title=Buy eggs"]);

    let rows = ctx.json(&["row", "list", &table_id]);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    let titles: Vec<_> = rows[0]["cells"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["column"] == "Title")
        .map(|c| c["value"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Buy eggs"]);

    ctx.cmd()
        .args(["row", "history", &table_id, &row_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Row created"))
        .stdout(predicate::str::contains("Title → \"Buy milk\""))
        .stdout(predicate::str::contains("Title → \"Buy eggs\""));

    ctx.cmd()
        .args(["row", "delete", &table_id, &row_id])
        .assert()
        .success();
    let rows = ctx.json(&["row", "list", &table_id]);
    assert!(rows.as_array().unwrap().is_empty());
}

#[test]
fn test_foreign_keys_block_row_delete() {
    let ctx = TestContext::new();

    let projects = ctx.json(&["table", "create", "Projects"])["id"]
        .as_i64()
        .unwrap()
        .to_string();
    let tasks = ctx.json(&["table", "create", "Tasks"])["id"]
        .as_i64()
        .unwrap()
        .to_string();
    ctx.json(&["column", "create", &projects, "Name"]);
    let column = ctx.json(&["column", "create", &tasks, "Project"])["id"]
        .as_i64()
        .unwrap()
        .to_string();

    ctx.cmd()
        .args(["fk", "create", &column, &tasks])
        .assert()
        .failure()
        .stderr(predicate::str::contains("own table"));
    ctx.json(&["fk", "create", &column, &projects]);

    let home = ctx.json(&["row", "create", &projects, "--set", "Name=Home"]);
    let home_id = home["row_id"].as_str().unwrap().to_string();
    ctx.json(&["row", "create", &tasks, "--set", &format!("Project={home_id}")]);

    let options = ctx.json(&["fk", "options", &column]);
    assert_eq!(options[0]["row_id"], home_id.as_str());
    assert_eq!(options[0]["label"], "Home");

    ctx.cmd()
        .args(["row", "delete", &projects, &home_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Tasks"));

    ctx.cmd()
        .args(["table", "delete", &projects])
        .assert()
        .failure()
        .stderr(predicate::str::contains("live row"));
}

#[test]
fn test_config_file_sets_database_name() {
    let ctx = TestContext::new();
    let config_path = ctx.temp_dir.path().join("cellar.toml");
    fs::write(&config_path, "db_file = \"sheets.db\"\n").unwrap();

    ctx.cmd()
        .args(["--config", &config_path.to_string_lossy(), "init"])
        .assert()
        .success();

    assert!(ctx.temp_dir.path().join("sheets.db").exists());
    assert!(!ctx.temp_dir.path().join("cellar.db").exists());
}

#[test]
fn test_bad_arguments() {
    let ctx = TestContext::new();
    let table = ctx.json(&["table", "create", "Tasks"]);
    let table_id = table["id"].as_i64().unwrap().to_string();

    ctx.cmd()
        .args(["row", "create", &table_id, "--set", "Title"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=VALUE"));

    ctx.cmd()
        .args(["column", "create", &table_id, "Score", "--type", "blob"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown column type"));

    ctx.cmd()
        .args(["table", "delete", "999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
