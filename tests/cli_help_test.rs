// CLI front end: help output and a full manager/operator round trip.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn work_orders(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("work-orders").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("WORK_ORDERS_USER")
        .env_remove("WORK_ORDERS_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_no_arguments_shows_getting_started() {
    let dir = tempfile::tempdir().unwrap();
    work_orders(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("work-orders init"))
        .stdout(predicate::str::contains("--as"));
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    work_orders(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("cancel"))
        .stdout(predicate::str::contains("peek"));
}

#[test]
fn test_init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();
    work_orders(&dir).arg("init").assert().success();
    assert!(dir.path().join("work-orders.toml").exists());
    work_orders(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_manager_and_operator_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    for (handle, role) in [("pm", "production-manager"), ("op1", "operator"), ("op2", "operator")] {
        work_orders(&dir)
            .args(["register", "--handle", handle, "--name", handle, "--role", role])
            .args(["--new-password", "password123"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Registered"));
    }

    work_orders(&dir)
        .args(["--as", "pm", "--password", "password123", "create"])
        .args(["--product", "Flange", "--quantity", "20", "--deadline", "2030-01-15", "--operator", "op1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-001"));

    let list = work_orders(&dir)
        .args(["--as", "op1", "--password", "password123", "list", "--json"])
        .output()
        .unwrap();
    assert!(list.status.success());
    let page: serde_json::Value = serde_json::from_slice(&list.stdout).unwrap();
    assert_eq!(page["total"], 1);
    let number = page["items"][0]["number"].as_str().unwrap().to_string();

    work_orders(&dir)
        .args(["--as", "op2", "--password", "password123", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 0"));

    work_orders(&dir)
        .args(["--as", "op2", "--password", "password123", "status", &number])
        .args(["--to", "In Progress", "--quantity", "5"])
        .assert()
        .failure();

    work_orders(&dir)
        .args(["--as", "op1", "--password", "password123", "status", &number])
        .args(["--to", "In Progress", "--quantity", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("In Progress"));

    work_orders(&dir)
        .args(["--as", "pm", "--password", "password123", "show", &number])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending -> In Progress"));

    work_orders(&dir)
        .args(["--as", "pm", "--password", "wrong-password", "show", &number])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid credentials"));
}
