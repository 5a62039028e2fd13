//! The `deduct` binary end to end.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use deduct_core::ProofDocument;
use tempfile::TempDir;

use crate::common::SAMPLE_PROOF;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(config: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), config).unwrap();
        fs::write(dir.path().join("proof.json"), SAMPLE_PROOF).unwrap();
        Self { dir }
    }

    fn proof(&self) -> PathBuf {
        self.dir.path().join("proof.json")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_deduct"))
            .arg("--config")
            .arg(self.dir.path().join("config.toml"))
            .args(args)
            .env("RUST_LOG", "warn")
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn path(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn verify_prints_every_row() {
    let workspace = Workspace::new("");
    let output = workspace.run(&["verify", path(&workspace.proof())]);
    assert!(output.status.success(), "{output:?}");

    let text = stdout(&output);
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows[2], "3  ✓  Q  [Modus Ponens: 1, 2]");
    assert_eq!(rows[4], "5  ✓  │ Q  [Reiteration: 3]");
    assert!(rows.iter().any(|row| row.starts_with("G1 ✓")), "{text}");
    assert_eq!(rows.last(), Some(&"Proof complete."));
}

#[test]
fn verify_single_line_and_goal() {
    let workspace = Workspace::new("");
    let line = workspace.run(&["verify", path(&workspace.proof()), "--line", "6"]);
    assert!(line.status.success());
    assert_eq!(stdout(&line).trim(), "6  ✓  R -> Q  [Conditional Proof: 4]");

    let goal = workspace.run(&["verify", path(&workspace.proof()), "--goal", "1"]);
    assert!(goal.status.success());

    let missing = workspace.run(&["verify", path(&workspace.proof()), "--line", "99"]);
    assert_eq!(missing.status.code(), Some(2));
}

#[test]
fn failing_lines_set_the_exit_code() {
    let workspace = Workspace::new("");
    let broken = SAMPLE_PROOF.replace(
        r#"{"text": "Q", "premises": [0, 1]"#,
        r#"{"text": "R", "premises": [0, 1]"#,
    );
    fs::write(workspace.proof(), broken).unwrap();

    let output = workspace.run(&["verify", path(&workspace.proof())]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("3  ✗  R"), "{text}");
    assert!(text.contains("does not follow by Modus Ponens"), "{text}");
}

#[test]
fn configured_restriction_applies_to_unrestricted_files() {
    let workspace = Workspace::new("[rules]\nrestricted = [\"modus_ponens\"]\n");
    let output = workspace.run(&["verify", path(&workspace.proof())]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("has been restricted for this proof"));
}

#[test]
fn autofill_writes_the_conclusion_back() {
    let workspace = Workspace::new("");
    let output = workspace.run(&["autofill", path(&workspace.proof()), "--line", "8", "--write"]);
    assert!(output.status.success(), "{output:?}");

    let saved = ProofDocument::from_json(&fs::read_to_string(workspace.proof()).unwrap()).unwrap();
    assert_eq!(saved.lines[7].text, "Q");

    let again = workspace.run(&["autofill", path(&workspace.proof()), "--line", "8"]);
    assert_eq!(again.status.code(), Some(1));
}

#[test]
fn external_checker_can_be_this_binary() {
    let config = format!(
        "[checker]\ncommand = \"{}\"\nargs = [\"check-server\"]\ntimeout_ms = 20000\n",
        env!("CARGO_BIN_EXE_deduct").replace('\\', "\\\\")
    );
    let workspace = Workspace::new(&config);
    let output = workspace.run(&["verify", path(&workspace.proof())]);
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).contains("Proof complete."));
}

#[test]
fn rules_lists_the_catalog() {
    let output = Command::new(env!("CARGO_BIN_EXE_deduct"))
        .arg("rules")
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 19);
    assert!(text.lines().any(|row| row.starts_with("conditional_proof")));
}
