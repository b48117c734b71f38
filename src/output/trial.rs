// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::sync::Arc;

use crate::spec;
use crate::output::{diagnosis, error, file, log, JsonEmitter, OutputError};

/// Record scope of a single trial, created by
/// [`StartedTestRun::add_trial`](crate::output::StartedTestRun::add_trial).
pub struct TestTrial {
    emitter: Arc<TrialEmitter>,
}

impl TestTrial {
    pub(crate) fn new(id: &str, run_emitter: Arc<JsonEmitter>) -> Self {
        TestTrial {
            emitter: Arc::new(TrialEmitter {
                trial_id: id.to_owned(),
                run_emitter,
            }),
        }
    }

    /// Emits `trialStart` carrying the serial number under test.
    pub async fn start(self, serial_number: &str) -> Result<StartedTestTrial, OutputError> {
        self.emitter
            .emit(&spec::TrialArtifactImpl::TrialStart(spec::TrialStart {
                serial_number: serial_number.to_owned(),
            }))
            .await?;

        Ok(StartedTestTrial { trial: self })
    }
}

pub struct StartedTestTrial {
    trial: TestTrial,
}

impl StartedTestTrial {
    /// Ends the trial. `failed_phase` should only be given for failures.
    pub async fn end(
        self,
        result: spec::TestResult,
        failed_phase: Option<spec::TrialPhase>,
    ) -> Result<(), OutputError> {
        self.trial
            .emitter
            .emit(&spec::TrialArtifactImpl::TrialEnd(spec::TrialEnd {
                result,
                failed_phase,
            }))
            .await
    }

    pub async fn add_log(&self, severity: spec::LogSeverity, msg: &str) -> Result<(), OutputError> {
        let log = log::Log::builder(msg).severity(severity).build();
        self.add_log_with_details(&log).await
    }

    pub async fn add_log_with_details(&self, log: &log::Log) -> Result<(), OutputError> {
        self.trial
            .emitter
            .emit(&spec::TrialArtifactImpl::Log(log.to_artifact()))
            .await
    }

    pub async fn add_error_with_msg(&self, symptom: &str, msg: &str) -> Result<(), OutputError> {
        let error = error::Error::builder(symptom).message(msg).build();
        self.add_error_with_details(&error).await
    }

    pub async fn add_error_with_details(&self, error: &error::Error) -> Result<(), OutputError> {
        self.trial
            .emitter
            .emit(&spec::TrialArtifactImpl::Error(error.to_artifact()))
            .await
    }

    pub async fn add_diagnosis(
        &self,
        verdict: &str,
        diagnosis_type: spec::DiagnosisType,
    ) -> Result<(), OutputError> {
        let diagnosis = diagnosis::Diagnosis::new(verdict, diagnosis_type);
        self.add_diagnosis_with_details(&diagnosis).await
    }

    pub async fn add_diagnosis_with_details(
        &self,
        diagnosis: &diagnosis::Diagnosis,
    ) -> Result<(), OutputError> {
        self.trial
            .emitter
            .emit(&spec::TrialArtifactImpl::Diagnosis(diagnosis.to_artifact()))
            .await
    }

    pub async fn add_file_with_details(&self, file: &file::File) -> Result<(), OutputError> {
        self.trial
            .emitter
            .emit(&spec::TrialArtifactImpl::File(file.to_artifact()))
            .await
    }
}

struct TrialEmitter {
    trial_id: String,
    run_emitter: Arc<JsonEmitter>,
}

impl TrialEmitter {
    async fn emit(&self, object: &spec::TrialArtifactImpl) -> Result<(), OutputError> {
        let root = spec::RootImpl::TrialArtifact(spec::TrialArtifact {
            id: self.trial_id.clone(),
            artifact: object.clone(),
        });
        self.run_emitter.emit(&root).await?;

        Ok(())
    }
}
