//! CLI integration tests for the `dbsafe` binary.
//!
//! These exercise the argument surface and the failure paths that do not
//! need a live MySQL server.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn dbsafe() -> Command {
    Command::cargo_bin("dbsafe").unwrap()
}

#[test]
fn help_describes_the_tool() {
    dbsafe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MySQL DDL/DML safety analyzer"))
        .stdout(predicate::str::contains("--chunk-size"))
        .stdout(predicate::str::contains("--tls"));
}

#[test]
fn version_flag_works() {
    dbsafe().arg("--version").assert().success();
}

#[test]
fn missing_sql_is_an_error() {
    dbsafe()
        .assert()
        .failure()
        .stderr(predicate::str::contains("no SQL to analyze"));
}

#[test]
fn empty_sql_is_an_error() {
    dbsafe()
        .args(["--sql", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse"));
}

#[test]
fn unsupported_statement_fails_before_connecting() {
    dbsafe()
        .args(["--sql", "GRANT SELECT ON app.* TO 'reader'@'%'"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported statement kind"));
}

#[test]
fn unreadable_sql_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.sql");
    dbsafe()
        .arg(missing.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read SQL file"));
}

#[test]
fn bad_format_is_rejected() {
    dbsafe()
        .args(["--sql", "SELECT 1", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown --format value"));
}

#[test]
fn custom_tls_without_ca_is_rejected() {
    dbsafe()
        .args([
            "--sql",
            "ALTER TABLE app.t ADD COLUMN x INT",
            "--tls",
            "custom",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tls=custom requires --tls-ca"));
}

#[test]
fn unqualified_table_without_database_is_an_error() {
    // Fails during resolution, before any connection attempt.
    dbsafe()
        .args(["--sql", "ALTER TABLE users ADD COLUMN x INT"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unqualified"));
}

#[test]
fn json_errors_are_json() {
    dbsafe()
        .args(["--sql", "GRANT SELECT ON x.* TO 'a'@'%'", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("{\"error\""));
}

#[test]
fn connection_refused_surfaces_as_an_error() {
    // Port 1 is essentially never listening; the refusal is immediate.
    dbsafe()
        .args([
            "--sql",
            "ALTER TABLE app.users ADD COLUMN x INT",
            "--host",
            "127.0.0.1",
            "--port",
            "1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to connect"));
}
