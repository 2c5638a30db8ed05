use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_scenario_argument() {
    Command::cargo_bin("leit")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SCENARIO"))
        .stdout(predicate::str::contains("--music-dir"));
}

#[test]
fn missing_scenario_file_fails() {
    Command::cargo_bin("leit")
        .unwrap()
        .arg("/nonexistent/scenario.json")
        .assert()
        .failure();
}

#[test]
fn bounded_run_with_an_empty_scenario_exits_cleanly() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{}").unwrap();

    Command::cargo_bin("leit")
        .unwrap()
        .arg(file.path())
        .args(["--ticks", "3", "--tick-ms", "1"])
        .write_stdin("")
        .assert()
        .success();
}
