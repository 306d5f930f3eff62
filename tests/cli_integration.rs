//! CLI integration tests for microros-build.
//!
//! These cover the commands that work without network access or a colcon
//! install: catalog listing, cleaning, the cached-build fast path, and
//! configuration errors.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the microros-build binary command.
fn microros_build() -> Command {
    Command::cargo_bin("microros-build").unwrap()
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

// ============================================================================
// microros-build sources
// ============================================================================

#[test]
fn test_sources_lists_catalog() {
    microros_build()
        .args(["sources", "humble"])
        .assert()
        .success()
        .stdout(predicate::str::contains("micro-CDR"))
        .stdout(predicate::str::contains("rcl"))
        .stdout(predicate::str::contains("ignored by default:"));
}

#[test]
fn test_sources_stage_filter() {
    microros_build()
        .args(["sources", "jazzy", "--stage", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ament_cmake"))
        .stdout(predicate::str::contains("jazzy dev sources:"))
        .stdout(predicate::str::contains("mcu sources:").not());
}

#[test]
fn test_sources_rejects_unknown_distro() {
    microros_build()
        .args(["sources", "lunar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown distro `lunar`"));
}

#[test]
fn test_sources_rejects_unknown_stage() {
    microros_build()
        .args(["sources", "humble", "--stage", "host"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown stage `host`"));
}

// ============================================================================
// microros-build build
// ============================================================================

#[test]
fn test_build_requires_a_distro() {
    let tmp = temp_dir();

    microros_build()
        .args(["build", "--project-dir"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no distro configured"));
}

#[test]
fn test_build_rejects_unknown_distro_from_config() {
    let tmp = temp_dir();
    fs::write(
        tmp.path().join("microros.toml"),
        "[project]\ndistro = \"lunar\"\n",
    )
    .unwrap();

    microros_build()
        .args(["build", "--project-dir"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown distro `lunar`"));
}

#[test]
fn test_build_is_a_cache_hit_when_library_exists() {
    let tmp = temp_dir();
    let library_dir = tmp.path().join("libmicroros");
    fs::create_dir_all(&library_dir).unwrap();
    fs::write(library_dir.join("libmicroros.a"), "built").unwrap();

    // No network, no colcon, no toolchain config: the artifact check
    // returns before anything external runs.
    microros_build()
        .args(["build", "--distro", "humble", "--project-dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("already built"));

    assert_eq!(
        fs::read_to_string(library_dir.join("libmicroros.a")).unwrap(),
        "built"
    );
}

// ============================================================================
// microros-build clean
// ============================================================================

#[test]
fn test_clean_removes_build_tree() {
    let tmp = temp_dir();
    fs::create_dir_all(tmp.path().join("build/mcu")).unwrap();
    fs::create_dir_all(tmp.path().join("libmicroros")).unwrap();

    microros_build()
        .args(["clean", "--project-dir"])
        .arg(tmp.path())
        .assert()
        .success();

    assert!(!tmp.path().join("build").exists());
    assert!(tmp.path().join("libmicroros").exists());
}

#[test]
fn test_clean_all_removes_artifact_too() {
    let tmp = temp_dir();
    fs::create_dir_all(tmp.path().join("build")).unwrap();
    fs::create_dir_all(tmp.path().join("libmicroros")).unwrap();

    microros_build()
        .args(["clean", "--all", "--project-dir"])
        .arg(tmp.path())
        .assert()
        .success();

    assert!(!tmp.path().join("build").exists());
    assert!(!tmp.path().join("libmicroros").exists());
}
