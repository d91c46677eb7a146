//! CLI integration tests for an-bench
//!
//! Tests the binary as a user would interact with it.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn an_bench() -> Command {
    Command::cargo_bin("an-bench").unwrap()
}

fn write_config(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("an-bench-{}-{}.toml", name, std::process::id()));
    std::fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Basic Commands
// ============================================================================

#[test]
fn test_help() {
    an_bench()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Benchmark AN codes"));
}

#[test]
fn test_version() {
    an_bench()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("an-bench"));
}

#[test]
fn test_info() {
    an_bench()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Platform:"))
        .stdout(predicate::str::contains("Selected backend:"))
        .stdout(predicate::str::contains("v512"))
        .stdout(predicate::str::contains("popcount:"));
}

// ============================================================================
// Inverse
// ============================================================================

#[test]
fn test_inverse() {
    an_bench()
        .args(["inverse", "63877", "--bits", "32"])
        .assert()
        .success()
        .stdout("3510769485\n");
}

#[test]
fn test_inverse_hex_constant() {
    an_bench()
        .args(["inverse", "0x3", "-k", "8"])
        .assert()
        .success()
        .stdout("171\n");
}

#[test]
fn test_inverse_of_even_constant_fails() {
    an_bench()
        .args(["inverse", "10"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no inverse of 10 modulo 2^64"));
}

#[test]
fn test_inverse_rejects_garbage() {
    an_bench()
        .args(["inverse", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid constant"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_toml() {
    let path = write_config("print", "[constants]\na16 = 65521\n");
    an_bench()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("a16 = 65521"))
        .stdout(predicate::str::contains("a64 = \"18446744073709551557\""))
        .stdout(predicate::str::contains("[matrix]"));
    let _ = std::fs::remove_file(path);
}

#[test]
fn test_config_json() {
    an_bench()
        .args(["config", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"settings\""))
        .stdout(predicate::str::contains("\"backends\""));
}

#[test]
fn test_missing_config_file() {
    an_bench()
        .args(["config", "--config", "/nonexistent/an-bench.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot load config"));
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn test_run_small_matrix_table() {
    an_bench()
        .args([
            "run", "-n", "100", "-i", "1", "-w", "16", "-b", "scalar", "-b", "v256", "-u", "2",
            "--quiet",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ns/elem"))
        .stdout(predicate::str::contains("isa"))
        .stdout(predicate::str::contains("reencode_checked"))
        .stdout(predicate::str::contains("hamming_check"))
        .stdout(predicate::str::contains("FAILED").not());
}

#[test]
fn test_run_json_from_config_file() {
    let path = write_config(
        "run",
        r#"
[settings]
elements = 37
iterations = 1
hamming = false
checksums = false

[matrix]
widths = [8]
layouts = ["divmod"]
backends = ["v128"]
unroll = [1]
"#,
    );
    an_bench()
        .args(["run", "--json", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"test\": \"encode\""))
        .stdout(predicate::str::contains("\"width\": 8"))
        .stdout(predicate::str::contains("\"layout\": \"divmod\""))
        .stdout(predicate::str::contains("\"width\": 16").not())
        .stdout(predicate::str::contains("\"status\": \"failed\"").not());
    let _ = std::fs::remove_file(path);
}

#[test]
fn test_run_rejects_zero_elements() {
    an_bench()
        .args(["run", "-n", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("elements must be positive"));
}

#[test]
fn test_run_rejects_unknown_backend() {
    an_bench()
        .args(["run", "--backend", "avx9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend"));
}

#[test]
fn test_run_rejects_unsupported_width() {
    an_bench()
        .args(["run", "-n", "16", "-w", "12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported width 12"));
}
