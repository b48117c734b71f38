// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use anyhow::{anyhow, Result};
use assert_fs::prelude::*;
use predicates::prelude::*;

use acm_dfu_test::error::{exit_code, ConfigurationError, HarnessError};
use acm_dfu_test::output::TrialPhase;
use acm_dfu_test::tool::ProcessExecutionError;

use super::fixture::*;

#[tokio::test]
async fn test_all_trials_pass_and_clean_up() -> Result<()> {
    let dfu = image_tree()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new();

    let outcome = execute_run(&stub, "ure", dfu.path(), bench_settings(work.path(), 3)).await?;
    let summary = outcome.summary?;

    assert!(summary.all_passed());
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.passed, 3);
    assert_eq!(summary.exit_code(), exit_code::SUCCESS);

    assert!(packages_in(work.path())?.is_empty());
    work.child("serial_number.cfg")
        .assert(predicate::str::contains("[images]"));

    assert_eq!(stub.calls_to("perl"), 3);
    assert_eq!(stub.calls_to("dfu-util"), 3);
    assert_eq!(stub.calls_to("lsusb"), 3);
    Ok(())
}

#[tokio::test]
async fn test_serial_mismatch_halts_and_keeps_artifact() -> Result<()> {
    let dfu = image_tree()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new().reporting_serial("abc124");

    let outcome = execute_run(&stub, "ure", dfu.path(), bench_settings(work.path(), 100)).await?;
    let summary = outcome.summary?;

    assert!(!summary.all_passed());
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.passed, 0);
    assert_eq!(summary.exit_code(), exit_code::VERIFICATION_FAILURE);

    let failure = summary.failure.ok_or(anyhow!("expected a failure"))?;
    assert_eq!(failure.phase, TrialPhase::Verify);
    assert!(matches!(failure.error, HarnessError::Verification(_)));
    assert!(failure.diagnostics.contains("abc124"));

    let left = packages_in(work.path())?;
    assert_eq!(left.len(), 1);
    assert!(left[0].starts_with("sn_ure_"));

    // no further trials after the failure
    assert_eq!(stub.calls_to("perl"), 1);
    Ok(())
}

#[tokio::test]
async fn test_flasher_exit_code_is_propagated() -> Result<()> {
    let dfu = image_tree()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new().failing_flasher(74);

    let outcome = execute_run(&stub, "utt", dfu.path(), bench_settings(work.path(), 5)).await?;
    let summary = outcome.summary?;

    assert_eq!(summary.exit_code(), 74);
    assert_eq!(summary.attempted, 1);

    let failure = summary.failure.ok_or(anyhow!("expected a failure"))?;
    assert_eq!(failure.phase, TrialPhase::BuildAndFlash);
    assert!(failure.diagnostics.contains("No DFU capable USB device"));
    assert_eq!(stub.calls_to("lsusb"), 0);
    Ok(())
}

#[tokio::test]
async fn test_builder_without_artifact_is_a_tool_failure() -> Result<()> {
    let dfu = image_tree()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new().without_artifact();

    let outcome = execute_run(&stub, "upp12", dfu.path(), bench_settings(work.path(), 5)).await?;
    let summary = outcome.summary?;

    assert_eq!(summary.exit_code(), exit_code::TOOL_FAILURE);
    let failure = summary.failure.ok_or(anyhow!("expected a failure"))?;
    assert!(matches!(
        failure.error,
        HarnessError::Process(ProcessExecutionError::MissingOutput { .. })
    ));
    assert_eq!(stub.calls_to("dfu-util"), 0);
    Ok(())
}

#[tokio::test]
async fn test_directory_in_place_of_package_is_a_tool_failure() -> Result<()> {
    let dfu = image_tree()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new().with_directory_artifact();

    let outcome = execute_run(&stub, "ure", dfu.path(), bench_settings(work.path(), 5)).await?;
    let summary = outcome.summary?;

    assert_eq!(summary.exit_code(), exit_code::TOOL_FAILURE);
    let failure = summary.failure.ok_or(anyhow!("expected a failure"))?;
    assert_eq!(failure.phase, TrialPhase::BuildAndFlash);
    assert!(matches!(
        failure.error,
        HarnessError::Process(ProcessExecutionError::MissingOutput { .. })
    ));
    assert_eq!(stub.calls_to("dfu-util"), 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_component_directory_counts_no_trial() -> Result<()> {
    let dfu = assert_fs::TempDir::new()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new();

    let outcome = execute_run(&stub, "ure", dfu.path(), bench_settings(work.path(), 5)).await?;
    let summary = outcome.summary?;

    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.exit_code(), exit_code::MISSING_DIRECTORY);
    let failure = summary.failure.ok_or(anyhow!("expected a failure"))?;
    assert!(matches!(
        failure.error,
        HarnessError::Configuration(ConfigurationError::MissingComponentDirectory { .. })
    ));
    assert_eq!(stub.calls_to("perl"), 0);
    Ok(())
}

#[tokio::test]
async fn test_zero_trials_is_a_trivial_pass() -> Result<()> {
    let dfu = image_tree()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new();

    let outcome = execute_run(&stub, "ure", dfu.path(), bench_settings(work.path(), 0)).await?;
    let summary = outcome.summary?;

    assert!(summary.all_passed());
    assert_eq!(summary.attempted, 0);
    assert_eq!(stub.calls_to("perl"), 0);
    Ok(())
}
