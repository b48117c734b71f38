// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use anyhow::{anyhow, Result};
use assert_json_diff::{assert_json_eq, assert_json_include};
use serde_json::json;

use acm_dfu_test::output::SPEC_VERSION;

use super::fixture::*;

#[tokio::test]
async fn test_passing_trial_record_sequence() -> Result<()> {
    let dfu = image_tree()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new();

    let outcome = execute_run(&stub, "ure", dfu.path(), bench_settings(work.path(), 1)).await?;
    outcome.summary?;

    let kinds: Vec<String> = outcome.records.iter().map(record_kind).collect();
    assert_eq!(
        kinds,
        [
            "schemaVersion",
            "run.runStart",
            "trial.trialStart",
            "trial.file",
            "trial.file",
            "trial.log",
            "trial.log",
            "trial.log",
            "trial.diagnosis",
            "trial.diagnosis",
            "trial.diagnosis",
            "trial.trialEnd",
            "run.log",
            "run.runEnd",
        ]
    );

    for (seqno, record) in outcome.records.iter().enumerate() {
        assert_eq!(record["sequenceNumber"], json!(seqno));
        assert_eq!(record["timestamp"], json!(DATETIME_FORMATTED));
    }

    assert_json_eq!(
        outcome.records[0],
        json!({
            "schemaVersion": {
                "major": SPEC_VERSION.0,
                "minor": SPEC_VERSION.1
            },
            "sequenceNumber": 0,
            "timestamp": DATETIME_FORMATTED
        })
    );
    assert_json_include!(
        actual: outcome.records[1].clone(),
        expected: json!({
            "runArtifact": {
                "runStart": {
                    "name": "acm-dfu-test",
                    "parameters": {
                        "cableType": "ure",
                        "trials": 1,
                        "enumerationDelaySecs": 0
                    },
                    "deviceInfo": {
                        "cableType": "ure",
                        "vendorId": "0x1901",
                        "productId": "0x0020",
                        "manufacturer": "GE Healthcare",
                        "product": "URE"
                    }
                }
            }
        })
    );
    assert_json_include!(
        actual: outcome.records[3].clone(),
        expected: json!({
            "trialArtifact": {
                "trialId": "trial0",
                "file": {
                    "name": "serial_number.cfg",
                    "isSnapshot": true,
                    "contentType": "text/plain"
                }
            }
        })
    );
    assert_json_include!(
        actual: outcome.records[8].clone(),
        expected: json!({
            "trialArtifact": {
                "trialId": "trial0",
                "diagnosis": { "verdict": "iManufacture", "type": "PASS" }
            }
        })
    );
    assert_json_eq!(
        outcome.records[11],
        json!({
            "trialArtifact": {
                "trialId": "trial0",
                "trialEnd": { "result": "PASS" }
            },
            "sequenceNumber": 11,
            "timestamp": DATETIME_FORMATTED
        })
    );
    assert_json_eq!(
        outcome.records[13],
        json!({
            "runArtifact": {
                "runEnd": {
                    "status": "COMPLETE",
                    "result": "PASS",
                    "trialsAttempted": 1,
                    "trialsPassed": 1
                }
            },
            "sequenceNumber": 13,
            "timestamp": DATETIME_FORMATTED
        })
    );

    Ok(())
}

#[tokio::test]
async fn test_trial_start_carries_flashed_serial() -> Result<()> {
    let dfu = image_tree()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new();

    let outcome = execute_run(&stub, "utt", dfu.path(), bench_settings(work.path(), 2)).await?;
    outcome.summary?;

    let starts: Vec<_> = outcome
        .records
        .iter()
        .filter(|r| record_kind(r) == "trial.trialStart")
        .collect();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[0]["trialArtifact"]["trialId"], json!("trial0"));
    assert_eq!(starts[1]["trialArtifact"]["trialId"], json!("trial1"));

    let serial = starts[1]["trialArtifact"]["trialStart"]["serialNumber"]
        .as_str()
        .ok_or(anyhow!("no serial number"))?;
    let file = outcome
        .records
        .iter()
        .filter(|r| record_kind(r) == "trial.file")
        .filter_map(|r| r["trialArtifact"]["file"]["name"].as_str())
        .find(|name| name.starts_with("sn_utt_") && name.contains(serial));
    assert_eq!(file, Some(format!("sn_utt_{serial}.dfu").as_str()));
    Ok(())
}

#[tokio::test]
async fn test_mismatch_is_recorded() -> Result<()> {
    let dfu = image_tree()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new().reporting_serial("abc124");

    let outcome = execute_run(&stub, "ure", dfu.path(), bench_settings(work.path(), 10)).await?;
    outcome.summary?;

    let diagnoses: Vec<_> = outcome
        .records
        .iter()
        .filter(|r| record_kind(r) == "trial.diagnosis")
        .map(|r| r["trialArtifact"]["diagnosis"].clone())
        .collect();
    assert_eq!(diagnoses.len(), 3);
    assert_json_include!(
        actual: diagnoses[1].clone(),
        expected: json!({ "verdict": "iProduct", "type": "PASS" })
    );
    assert_json_include!(
        actual: diagnoses[2].clone(),
        expected: json!({ "verdict": "iSerial", "type": "FAIL" })
    );

    let trial_error = outcome
        .records
        .iter()
        .find(|r| record_kind(r) == "trial.error")
        .ok_or(anyhow!("no trial error"))?;
    assert_eq!(
        trial_error["trialArtifact"]["error"]["symptom"],
        json!("verification-error")
    );

    let kinds: Vec<String> = outcome.records.iter().map(record_kind).collect();
    assert_eq!(
        &kinds[kinds.len() - 3..],
        ["trial.trialEnd", "run.error", "run.runEnd"]
    );

    let last = outcome.records.len() - 1;
    assert_json_include!(
        actual: outcome.records[last - 2].clone(),
        expected: json!({
            "trialArtifact": {
                "trialEnd": { "result": "FAIL", "failedPhase": "VERIFY" }
            }
        })
    );
    assert_json_include!(
        actual: outcome.records[last].clone(),
        expected: json!({
            "runArtifact": {
                "runEnd": {
                    "status": "COMPLETE",
                    "result": "FAIL",
                    "trialsAttempted": 1,
                    "trialsPassed": 0
                }
            }
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_configuration_failure_is_not_applicable() -> Result<()> {
    let dfu = assert_fs::TempDir::new()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new();

    let outcome = execute_run(&stub, "ure", dfu.path(), bench_settings(work.path(), 3)).await?;
    outcome.summary?;

    let last = outcome
        .records
        .last()
        .ok_or(anyhow!("no records"))?
        .clone();
    assert_json_include!(
        actual: last,
        expected: json!({
            "runArtifact": {
                "runEnd": {
                    "status": "ERROR",
                    "result": "NOT_APPLICABLE",
                    "trialsAttempted": 0,
                    "trialsPassed": 0
                }
            }
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_configuration_failure_writes_no_trial_records() -> Result<()> {
    let dfu = assert_fs::TempDir::new()?;
    let work = assert_fs::TempDir::new()?;
    let stub = StubInvoker::new();

    let outcome = execute_run(&stub, "ure", dfu.path(), bench_settings(work.path(), 5)).await?;
    let summary = outcome.summary?;
    assert_eq!(summary.attempted, 0);

    let kinds: Vec<String> = outcome.records.iter().map(record_kind).collect();
    assert_eq!(
        kinds,
        ["schemaVersion", "run.runStart", "run.error", "run.runEnd"]
    );

    let error = outcome
        .records
        .get(2)
        .ok_or(anyhow!("no error record"))?
        .clone();
    assert_json_include!(
        actual: error,
        expected: json!({
            "runArtifact": {
                "error": { "symptom": "configuration-error" }
            }
        })
    );
    Ok(())
}
