// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Run log record models
//!
//! Every line of the run log is one [`Root`] object serialized as JSON. The
//! layout follows the OCP test and validation output format: a schema version
//! record, run level artifacts and trial level artifacts, each stamped with a
//! timestamp and a monotonically increasing sequence number.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::Serialize;

use crate::output as tv;

pub const SPEC_VERSION: (i8, i8) = (1, 0);

mod rfc3339_format {
    use chrono::DateTime;
    use chrono::SecondsFormat;

    pub fn serialize<S>(date: &DateTime<chrono_tz::Tz>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = date.to_rfc3339_opts(SecondsFormat::Millis, true);
        serializer.serialize_str(&s)
    }
}

/// Outcome of a single descriptor check.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub enum DiagnosisType {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

/// Represents the final execution status of a run.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[non_exhaustive]
pub enum TestStatus {
    #[serde(rename = "COMPLETE")]
    Complete,
    #[serde(rename = "ERROR")]
    Error,
}

/// Represents the final result of a run or a trial.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[non_exhaustive]
pub enum TestResult {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "NOT_APPLICABLE")]
    NotApplicable,
}

/// The phases a trial walks through, in order.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    #[serde(rename = "GENERATE_SERIAL")]
    GenerateSerial,
    #[serde(rename = "BUILD_AND_FLASH")]
    BuildAndFlash,
    #[serde(rename = "AWAIT_ENUMERATION")]
    AwaitEnumeration,
    #[serde(rename = "VERIFY")]
    Verify,
    #[serde(rename = "CLEANUP")]
    Cleanup,
}

/// Known log severity variants.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[non_exhaustive]
pub enum LogSeverity {
    #[serde(rename = "DEBUG")]
    Debug,
    #[serde(rename = "INFO")]
    Info,
}

#[derive(Debug, Serialize, Clone)]
pub struct Root {
    #[serde(flatten)]
    pub artifact: RootImpl,

    #[serde(rename = "timestamp")]
    #[serde(with = "rfc3339_format")]
    pub timestamp: DateTime<chrono_tz::Tz>,

    #[serde(rename = "sequenceNumber")]
    pub seqno: u64,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub enum RootImpl {
    #[serde(rename = "schemaVersion")]
    SchemaVersion(SchemaVersion),

    #[serde(rename = "runArtifact")]
    RunArtifact(RunArtifact),

    #[serde(rename = "trialArtifact")]
    TrialArtifact(TrialArtifact),
}

/// Low-level model for the `schemaVersion` object.
/// Specifies the version that should be used to interpret following json outputs.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename = "schemaVersion")]
pub struct SchemaVersion {
    #[serde(rename = "major")]
    pub major: i8,

    #[serde(rename = "minor")]
    pub minor: i8,
}

impl Default for SchemaVersion {
    fn default() -> Self {
        SchemaVersion {
            major: SPEC_VERSION.0,
            minor: SPEC_VERSION.1,
        }
    }
}

/// Low-level model for the `runArtifact` object.
/// Container for the run level artifacts.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct RunArtifact {
    #[serde(flatten)]
    pub artifact: RunArtifactImpl,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub enum RunArtifactImpl {
    #[serde(rename = "runStart")]
    RunStart(RunStart),

    #[serde(rename = "runEnd")]
    RunEnd(RunEnd),

    #[serde(rename = "log")]
    Log(Log),

    #[serde(rename = "error")]
    Error(Error),
}

/// Low-level model for the `runStart` object.
/// Start marker for the beginning of a run against one cable.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename = "runStart")]
pub struct RunStart {
    #[serde(rename = "name")]
    pub name: String,

    #[serde(rename = "version")]
    pub version: String,

    #[serde(rename = "commandLine")]
    pub command_line: String,

    #[serde(rename = "parameters")]
    pub parameters: BTreeMap<String, tv::Value>,

    #[serde(rename = "deviceInfo")]
    pub device_info: DeviceInfo,
}

/// Low-level model for the `deviceInfo` object.
/// Identifies the cable under test and what it is expected to report.
#[derive(Debug, Serialize, Default, Clone, PartialEq)]
#[serde(rename = "deviceInfo")]
pub struct DeviceInfo {
    #[serde(rename = "cableType")]
    pub cable_type: String,

    #[serde(rename = "vendorId")]
    pub vendor_id: String,

    #[serde(rename = "productId")]
    pub product_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "manufacturer")]
    pub manufacturer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "product")]
    pub product: Option<String>,
}

/// Low-level model for the `runEnd` object.
/// End marker signaling the finality of a run.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename = "runEnd")]
pub struct RunEnd {
    #[serde(rename = "status")]
    pub status: TestStatus,

    #[serde(rename = "result")]
    pub result: TestResult,

    #[serde(rename = "trialsAttempted")]
    pub trials_attempted: u32,

    #[serde(rename = "trialsPassed")]
    pub trials_passed: u32,
}

/// Low-level model for the `error` object.
/// Represents an error encountered by the harness or reported by a tool.
#[derive(Debug, Serialize, Default, Clone, PartialEq)]
#[serde(rename = "error")]
pub struct Error {
    #[serde(rename = "symptom")]
    pub symptom: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "message")]
    pub message: Option<String>,
}

/// Low-level model for `log` object.
/// Is currently relevant for run and trial artifact types.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename = "log")]
pub struct Log {
    #[serde(rename = "severity")]
    pub severity: LogSeverity,

    #[serde(rename = "message")]
    pub message: String,
}

/// Low-level model for the `trialArtifact` object.
/// Container for the trial level artifacts.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct TrialArtifact {
    #[serde(rename = "trialId")]
    pub id: String,

    #[serde(flatten)]
    pub artifact: TrialArtifactImpl,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub enum TrialArtifactImpl {
    #[serde(rename = "trialStart")]
    TrialStart(TrialStart),

    #[serde(rename = "trialEnd")]
    TrialEnd(TrialEnd),

    #[serde(rename = "diagnosis")]
    Diagnosis(Diagnosis),

    #[serde(rename = "log")]
    Log(Log),

    #[serde(rename = "error")]
    Error(Error),

    #[serde(rename = "file")]
    File(File),
}

/// Low-level model for a `trialStart` object.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename = "trialStart")]
pub struct TrialStart {
    #[serde(rename = "serialNumber")]
    pub serial_number: String,
}

/// Low-level model for a `trialEnd` object.
/// `failedPhase` is only present on failed trials.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename = "trialEnd")]
pub struct TrialEnd {
    #[serde(rename = "result")]
    pub result: TestResult,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "failedPhase")]
    pub failed_phase: Option<TrialPhase>,
}

/// Low-level model for the `diagnosis` object.
/// Contains the verdict given by the harness regarding one descriptor check.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename = "diagnosis")]
pub struct Diagnosis {
    #[serde(rename = "verdict")]
    pub verdict: String,

    #[serde(rename = "type")]
    pub diagnosis_type: DiagnosisType,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "message")]
    pub message: Option<String>,
}

/// Low-level model for the `file` object.
/// Represents a file produced by a trial: the rendered package
/// configuration or the firmware package itself.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename = "file")]
pub struct File {
    #[serde(rename = "name")]
    pub name: String,

    #[serde(rename = "uri")]
    pub uri: String,

    #[serde(rename = "isSnapshot")]
    pub is_snapshot: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "description")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}
