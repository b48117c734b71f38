// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::BTreeMap;
use std::env;
use std::sync::atomic::{self, Ordering};
use std::sync::Arc;

use crate::output as tv;
use crate::spec;
use tv::trial::TestTrial;
use tv::{config, device, emitter, error, log, OutputError};

/// The record scope of one harness run against one cable.
///
/// Nothing is written until [`TestRun::start`] is called; starting emits the
/// `schemaVersion` record followed by `runStart`.
pub struct TestRun {
    name: String,
    version: String,
    parameters: BTreeMap<String, tv::Value>,
    device: device::DeviceInfo,
    command_line: String,

    emitter: Arc<emitter::JsonEmitter>,
}

impl TestRun {
    /// Creates a new [`TestRunBuilder`] object.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use acm_dfu_test::cable::CableType;
    /// # use acm_dfu_test::output::*;
    ///
    /// let device = DeviceInfo::new(CableType::Ure);
    /// let builder = TestRun::builder("acm-dfu-test", &device, "1.0");
    /// ```
    pub fn builder(name: &str, device: &device::DeviceInfo, version: &str) -> TestRunBuilder {
        TestRunBuilder::new(name, device, version)
    }

    /// Starts the run.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # tokio_test::block_on(async {
    /// # use acm_dfu_test::cable::CableType;
    /// # use acm_dfu_test::output::*;
    ///
    /// let device = DeviceInfo::new(CableType::Utt);
    /// let run = TestRun::builder("acm-dfu-test", &device, "1.0").build();
    /// let run = run.start().await?;
    /// run.end(TestStatus::Complete, TestResult::Pass, 0, 0).await?;
    ///
    /// # Ok::<(), OutputError>(())
    /// # });
    /// ```
    pub async fn start(self) -> Result<StartedTestRun, OutputError> {
        self.emitter
            .emit(&spec::RootImpl::SchemaVersion(
                spec::SchemaVersion::default(),
            ))
            .await?;

        let start = spec::RootImpl::RunArtifact(spec::RunArtifact {
            artifact: spec::RunArtifactImpl::RunStart(spec::RunStart {
                name: self.name.clone(),
                version: self.version.clone(),
                command_line: self.command_line.clone(),
                parameters: self.parameters.clone(),
                device_info: self.device.to_spec(),
            }),
        });
        self.emitter.emit(&start).await?;

        Ok(StartedTestRun {
            run: self,
            trial_seqno: Arc::new(atomic::AtomicU64::new(0)),
        })
    }
}

/// Builder for the [`TestRun`] object.
pub struct TestRunBuilder {
    name: String,
    device: device::DeviceInfo,
    version: String,
    parameters: BTreeMap<String, tv::Value>,
    command_line: String,
    config: Option<config::Config>,
}

impl TestRunBuilder {
    fn new(name: &str, device: &device::DeviceInfo, version: &str) -> Self {
        Self {
            name: name.to_string(),
            device: device.clone(),
            version: version.to_string(),
            parameters: BTreeMap::new(),
            // the arguments the harness binary was invoked with
            command_line: env::args().skip(1).collect::<Vec<_>>().join(" "),
            config: None,
        }
    }

    /// Records a run parameter, such as the trial count or the DFU directory.
    pub fn add_parameter(mut self, key: &str, value: tv::Value) -> TestRunBuilder {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn config(mut self, value: config::Config) -> TestRunBuilder {
        self.config = Some(value);
        self
    }

    pub fn build(self) -> TestRun {
        let config = self.config.unwrap_or(config::Config::builder().build());
        let emitter = emitter::JsonEmitter::new(config.timestamp_provider, config.writer);

        TestRun {
            name: self.name,
            device: self.device,
            version: self.version,
            parameters: self.parameters,
            command_line: self.command_line,
            emitter: Arc::new(emitter),
        }
    }
}

/// A run whose `runStart` has been written. Ends with `runEnd`.
pub struct StartedTestRun {
    run: TestRun,

    trial_seqno: Arc<atomic::AtomicU64>,
}

impl StartedTestRun {
    fn incr_trial_seqno(&self) -> u64 {
        self.trial_seqno.fetch_add(1, Ordering::AcqRel)
    }

    async fn emit(&self, artifact: spec::RunArtifactImpl) -> Result<(), OutputError> {
        self.run
            .emitter
            .emit(&spec::RootImpl::RunArtifact(spec::RunArtifact { artifact }))
            .await
    }

    /// Ends the run, reporting how many trials were attempted and passed.
    pub async fn end(
        self,
        status: spec::TestStatus,
        result: spec::TestResult,
        trials_attempted: u32,
        trials_passed: u32,
    ) -> Result<(), OutputError> {
        self.emit(spec::RunArtifactImpl::RunEnd(spec::RunEnd {
            status,
            result,
            trials_attempted,
            trials_passed,
        }))
        .await
    }

    pub async fn add_log(&self, severity: spec::LogSeverity, msg: &str) -> Result<(), OutputError> {
        let log = log::Log::builder(msg).severity(severity).build();
        self.add_log_with_details(&log).await
    }

    pub async fn add_log_with_details(&self, log: &log::Log) -> Result<(), OutputError> {
        self.emit(spec::RunArtifactImpl::Log(log.to_artifact()))
            .await
    }

    pub async fn add_error_with_msg(&self, symptom: &str, msg: &str) -> Result<(), OutputError> {
        let error = error::Error::builder(symptom).message(msg).build();
        self.add_error_with_details(&error).await
    }

    pub async fn add_error_with_details(&self, error: &error::Error) -> Result<(), OutputError> {
        self.emit(spec::RunArtifactImpl::Error(error.to_artifact()))
            .await
    }

    /// Creates the record scope for the next trial. Trial ids are assigned in
    /// creation order: `trial0`, `trial1`, ...
    pub fn add_trial(&self) -> TestTrial {
        let trial_id = format!("trial{}", self.incr_trial_seqno());
        TestTrial::new(&trial_id, self.run.emitter.clone())
    }
}
