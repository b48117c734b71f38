// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Trial sequencing
//!
//! A trial walks `GenerateSerial → BuildAndFlash → AwaitEnumeration → Verify
//! → Cleanup → Done`. Any failure jumps straight to `Done` and stops the run;
//! the firmware package of a failed trial is left on disk for post-mortem.

use std::path::Path;

use tokio::fs;
use tracing::{debug, error, info};

use crate::cable::CableType;
use crate::error::{exit_code, HarnessError};
use crate::flash::{FlashArtifact, FlashOrchestrator};
use crate::output::{self as tv, OutputError, StartedTestRun, StartedTestTrial, TestTrial};
use crate::package::UpdatePackageConfig;
use crate::serial::SerialNumber;
use crate::settings::Settings;
use crate::spec::{DiagnosisType, LogSeverity, TestResult, TrialPhase};
use crate::tool::{ToolInvoker, ToolOutput};
use crate::verify::{DescriptorField, EnumerationVerifier, VerificationError};

/// Why a trial ended in `Done(Fail)`.
#[derive(Debug)]
pub struct TrialFailure {
    pub phase: TrialPhase,
    pub error: HarnessError,
    /// Raw text from the failing phase: tool output, or the descriptor report.
    pub diagnostics: String,
}

#[derive(Debug)]
pub struct TrialResult {
    pub serial: SerialNumber,
    pub failure: Option<TrialFailure>,
}

impl TrialResult {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failed_phase(&self) -> Option<TrialPhase> {
        self.failure.as_ref().map(|f| f.phase)
    }
}

/// Counters for a whole run, plus the failure that halted it, if any.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub requested: u32,
    pub attempted: u32,
    pub passed: u32,
    pub failure: Option<TrialFailure>,
}

impl RunSummary {
    /// True only when every requested trial ran and passed.
    pub fn all_passed(&self) -> bool {
        self.failure.is_none() && self.passed == self.requested
    }

    pub fn exit_code(&self) -> i32 {
        self.failure
            .as_ref()
            .map_or(exit_code::SUCCESS, |f| f.error.exit_code())
    }
}

enum TrialState {
    BuildAndFlash {
        serial: SerialNumber,
        package_config: UpdatePackageConfig,
    },
    AwaitEnumeration {
        serial: SerialNumber,
        artifact: FlashArtifact,
    },
    Verify {
        serial: SerialNumber,
        artifact: FlashArtifact,
    },
    Cleanup {
        serial: SerialNumber,
        artifact: FlashArtifact,
    },
    Done(TrialResult),
}

/// Drives trials against one cable, one at a time.
pub struct TrialController<'a, I> {
    invoker: &'a I,
    settings: &'a Settings,
    cable: CableType,
    dfu_directory: &'a Path,
}

impl<'a, I: ToolInvoker> TrialController<'a, I> {
    pub fn new(
        invoker: &'a I,
        settings: &'a Settings,
        cable: CableType,
        dfu_directory: &'a Path,
    ) -> Self {
        TrialController {
            invoker,
            settings,
            cable,
            dfu_directory,
        }
    }

    /// Runs up to `trials` trials, halting on the first failure.
    ///
    /// Errors are only returned when the run log can't be written; trial
    /// failures are reported through [`RunSummary::failure`].
    pub async fn run(&self, run: &StartedTestRun, trials: u32) -> Result<RunSummary, OutputError> {
        let mut summary = RunSummary {
            requested: trials,
            ..Default::default()
        };

        while summary.attempted < trials {
            let result = self.run_trial(run.add_trial()).await?;

            match result.failure {
                None => {
                    summary.attempted += 1;
                    summary.passed += 1;
                    info!(
                        serial = %result.serial,
                        passed = summary.passed,
                        of = trials,
                        "trial passed"
                    );
                    run.add_log(
                        LogSeverity::Info,
                        &format!("{} of {} trials passed", summary.passed, trials),
                    )
                    .await?;
                }
                Some(failure) => {
                    // a configuration problem says nothing about the cable
                    if !matches!(failure.error, HarnessError::Configuration(_)) {
                        summary.attempted += 1;
                    }
                    error!(
                        serial = %result.serial,
                        phase = ?failure.phase,
                        "trial failed, halting run"
                    );
                    summary.failure = Some(failure);
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// Runs one trial to `Done`, recording every phase under `record`.
    ///
    /// The package is resolved before `trialStart` is written, so a trial
    /// that fails on configuration leaves no trial records behind.
    pub async fn run_trial(&self, record: TestTrial) -> Result<TrialResult, OutputError> {
        let serial = SerialNumber::generate();
        debug!(phase = ?TrialPhase::GenerateSerial, %serial, "serial number generated");

        let orchestrator = FlashOrchestrator::new(self.invoker, self.settings);
        let package_config = match orchestrator
            .package_config(self.cable, self.dfu_directory)
            .await
        {
            Ok(package_config) => package_config,
            Err(e) => {
                let error = HarnessError::from(e);
                error!(%serial, %error, "no package for trial");
                return Ok(TrialResult {
                    serial,
                    failure: Some(TrialFailure {
                        phase: TrialPhase::BuildAndFlash,
                        diagnostics: error.to_string(),
                        error,
                    }),
                });
            }
        };

        let trial = record.start(serial.as_str()).await?;
        let mut state = TrialState::BuildAndFlash {
            serial,
            package_config,
        };

        let result = loop {
            state = match state {
                TrialState::BuildAndFlash {
                    serial,
                    package_config,
                } => {
                    self.build_and_flash(&trial, &orchestrator, serial, package_config)
                        .await?
                }
                TrialState::AwaitEnumeration { serial, artifact } => {
                    let delay = self.settings.enumeration_delay();
                    debug!(phase = ?TrialPhase::AwaitEnumeration, ?delay, "waiting for re-enumeration");
                    tokio::time::sleep(delay).await;
                    TrialState::Verify { serial, artifact }
                }
                TrialState::Verify { serial, artifact } => {
                    self.verify(&trial, serial, artifact).await?
                }
                TrialState::Cleanup { serial, artifact } => {
                    self.cleanup(&trial, serial, artifact).await?
                }
                TrialState::Done(result) => break result,
            };
        };

        match result.failed_phase() {
            None => trial.end(TestResult::Pass, None).await?,
            Some(phase) => trial.end(TestResult::Fail, Some(phase)).await?,
        }

        Ok(result)
    }

    async fn build_and_flash(
        &self,
        trial: &StartedTestTrial,
        orchestrator: &FlashOrchestrator<'_, I>,
        serial: SerialNumber,
        package_config: UpdatePackageConfig,
    ) -> Result<TrialState, OutputError> {
        let artifact = match orchestrator
            .flash(&serial, self.cable, package_config)
            .await
        {
            Ok(artifact) => artifact,
            Err(e) => {
                let diagnostics = match &e {
                    HarnessError::Process(pe) => pe.captured_output().unwrap_or_default().to_owned(),
                    other => other.to_string(),
                };
                return fail(trial, serial, TrialPhase::BuildAndFlash, e, diagnostics).await;
            }
        };

        record_file(
            trial,
            &artifact.package_config_path,
            "package configuration",
            mime::TEXT_PLAIN,
            true,
        )
        .await?;
        record_file(
            trial,
            &artifact.path,
            "firmware package",
            mime::APPLICATION_OCTET_STREAM,
            false,
        )
        .await?;
        record_tool_output(trial, "image builder", &artifact.builder_output).await?;
        record_tool_output(trial, "flasher", &artifact.flasher_output).await?;

        Ok(TrialState::AwaitEnumeration { serial, artifact })
    }

    async fn verify(
        &self,
        trial: &StartedTestTrial,
        serial: SerialNumber,
        artifact: FlashArtifact,
    ) -> Result<TrialState, OutputError> {
        let verifier = EnumerationVerifier::new(
            self.invoker,
            &self.settings.tools.enumerator,
            &self.settings.identity,
        );

        let expected = match verifier.expected(self.cable, &serial) {
            Ok(expected) => expected,
            Err(e) => {
                let diagnostics = e.to_string();
                return fail(trial, serial, TrialPhase::Verify, e.into(), diagnostics).await;
            }
        };

        let report = match verifier.query(self.cable).await {
            Ok(report) => report,
            Err(e) => {
                let diagnostics = e.captured_output().unwrap_or_default().to_owned();
                return fail(trial, serial, TrialPhase::Verify, e.into(), diagnostics).await;
            }
        };
        trial.add_log(LogSeverity::Debug, &report).await?;

        match verifier.check(&report, &expected) {
            Ok(()) => {
                for field in DescriptorField::ALL {
                    trial.add_diagnosis(field.prefix(), DiagnosisType::Pass).await?;
                }
                info!(%serial, "descriptors verified");
                Ok(TrialState::Cleanup { serial, artifact })
            }
            Err(e) => {
                record_diagnoses(trial, &e).await?;
                fail(trial, serial, TrialPhase::Verify, e.into(), report).await
            }
        }
    }

    async fn cleanup(
        &self,
        trial: &StartedTestTrial,
        serial: SerialNumber,
        artifact: FlashArtifact,
    ) -> Result<TrialState, OutputError> {
        if let Err(e) = fs::remove_file(&artifact.path).await {
            let error = HarnessError::io("failed to remove firmware package", &artifact.path, e);
            let diagnostics = error.to_string();
            return fail(trial, serial, TrialPhase::Cleanup, error, diagnostics).await;
        }
        debug!(path = %artifact.path.display(), "firmware package removed");

        Ok(TrialState::Done(TrialResult {
            serial,
            failure: None,
        }))
    }
}

async fn fail(
    trial: &StartedTestTrial,
    serial: SerialNumber,
    phase: TrialPhase,
    error: HarnessError,
    diagnostics: String,
) -> Result<TrialState, OutputError> {
    error!(%serial, ?phase, %error, "trial failed");

    let message = if diagnostics.is_empty() {
        error.to_string()
    } else {
        format!("{error}\n{diagnostics}")
    };
    trial.add_error_with_msg(error.symptom(), &message).await?;

    Ok(TrialState::Done(TrialResult {
        serial,
        failure: Some(TrialFailure {
            phase,
            error,
            diagnostics,
        }),
    }))
}

/// One diagnosis per checked descriptor: the fields before the mismatch
/// passed, the mismatching one failed, later ones were never checked.
async fn record_diagnoses(
    trial: &StartedTestTrial,
    error: &VerificationError,
) -> Result<(), OutputError> {
    let VerificationError::DescriptorMismatch {
        field,
        expected,
        actual,
    } = error
    else {
        return Ok(());
    };

    for checked in DescriptorField::ALL {
        if checked == *field {
            let diagnosis = tv::Diagnosis::builder(checked.prefix(), DiagnosisType::Fail)
                .message(&format!("expected '{expected}', found '{}'", actual.join(" ")))
                .build();
            trial.add_diagnosis_with_details(&diagnosis).await?;
            break;
        }
        trial.add_diagnosis(checked.prefix(), DiagnosisType::Pass).await?;
    }

    Ok(())
}

async fn record_file(
    trial: &StartedTestTrial,
    path: &Path,
    description: &str,
    content_type: mime::Mime,
    is_snapshot: bool,
) -> Result<(), OutputError> {
    match tv::File::builder_from_path(path) {
        Some(builder) => {
            let file = builder
                .description(description)
                .content_type(content_type)
                .is_snapshot(is_snapshot)
                .build();
            trial.add_file_with_details(&file).await
        }
        None => {
            debug!(path = %path.display(), "not a file uri, skipping file record");
            Ok(())
        }
    }
}

async fn record_tool_output(
    trial: &StartedTestTrial,
    tool: &str,
    output: &ToolOutput,
) -> Result<(), OutputError> {
    let combined = output.combined();
    if combined.is_empty() {
        return Ok(());
    }
    trial
        .add_log(LogSeverity::Debug, &format!("{tool} output:\n{combined}"))
        .await
}
