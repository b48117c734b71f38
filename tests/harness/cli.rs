// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::process::Command;

use anyhow::Result;
use assert_fs::prelude::*;
use predicates::prelude::*;

use acm_dfu_test::error::exit_code;

fn harness() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_acm-dfu-test"));
    cmd.env_remove("ACM_DFU_TEST_LOG")
        .env_remove("ACM_DFU_TEST_CONFIG");
    cmd
}

#[test]
fn test_version_flag() -> Result<()> {
    let output = harness().arg("--version").output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(predicate::str::starts_with("acm-dfu-test ").eval(&stdout));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_unknown_cable_type_exit_status() -> Result<()> {
    let tmp = assert_fs::TempDir::new()?;

    let status = harness()
        .current_dir(tmp.path())
        .args(["run", "--cable-type", "upp", "--dfu-directory"])
        .arg(tmp.path())
        .status()?;

    // the OS truncates the status to its low byte
    assert_eq!(status.code(), Some(exit_code::BAD_CABLE_TYPE & 0xff));
    tmp.child("acm_dfu_test.log").assert(predicate::path::missing());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_missing_dfu_directory_exit_status() -> Result<()> {
    let tmp = assert_fs::TempDir::new()?;

    let status = harness()
        .current_dir(tmp.path())
        .args(["run", "--cable-type", "ure", "--dfu-directory"])
        .arg(tmp.path().join("absent"))
        .status()?;

    assert_eq!(status.code(), Some(exit_code::MISSING_DIRECTORY & 0xff));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_invalid_settings_file_exit_status() -> Result<()> {
    let tmp = assert_fs::TempDir::new()?;
    let config = tmp.child("bench.toml");
    config.write_str("trials = \"many\"\n")?;

    let status = harness()
        .current_dir(tmp.path())
        .args(["run", "--cable-type", "ure", "--config"])
        .arg(config.path())
        .arg("--dfu-directory")
        .arg(tmp.path())
        .status()?;

    assert_eq!(status.code(), Some(exit_code::CONFIGURATION & 0xff));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_cable_type_is_checked_before_settings_file() -> Result<()> {
    let tmp = assert_fs::TempDir::new()?;
    let config = tmp.child("bench.toml");
    config.write_str("trials = \"many\"\n")?;

    let status = harness()
        .current_dir(tmp.path())
        .args(["run", "--cable-type", "upp", "--config"])
        .arg(config.path())
        .arg("--dfu-directory")
        .arg(tmp.path())
        .status()?;

    assert_eq!(status.code(), Some(exit_code::BAD_CABLE_TYPE & 0xff));
    Ok(())
}

#[test]
fn test_unknown_log_level_is_rejected() -> Result<()> {
    let tmp = assert_fs::TempDir::new()?;

    let output = harness()
        .current_dir(tmp.path())
        .args(["--log-level", "loud", "run", "--cable-type", "ure", "--dfu-directory"])
        .arg(tmp.path())
        .output()?;

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(predicate::str::contains("invalid value 'loud'").eval(&stderr));
    tmp.child("acm_dfu_test.log").assert(predicate::path::missing());
    Ok(())
}
