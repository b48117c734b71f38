// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Run preparation and execution
//!
//! [`PreparedRun::new`] performs every check that can be done without
//! touching the cable. Only a prepared run can be executed, so bad settings
//! or a missing DFU directory never cost a trial. The cable type is parsed
//! by the caller, ahead of loading any settings.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cable::CableType;
use crate::error::{ConfigurationError, HarnessError};
use crate::output::{self as tv, DeviceInfo, TestResult, TestRun, TestStatus};
use crate::settings::Settings;
use crate::tool::ToolInvoker;
use crate::trial::{RunSummary, TrialController};

pub const HARNESS_NAME: &str = "acm-dfu-test";
pub const HARNESS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A validated run, ready to start trials.
#[derive(Debug)]
pub struct PreparedRun {
    cable: CableType,
    dfu_directory: PathBuf,
    settings: Settings,
}

impl PreparedRun {
    pub fn new(
        cable: CableType,
        dfu_directory: &Path,
        settings: Settings,
    ) -> Result<Self, ConfigurationError> {
        settings.validate()?;

        if !dfu_directory.is_dir() {
            return Err(ConfigurationError::MissingDfuDirectory(
                dfu_directory.to_owned(),
            ));
        }

        Ok(PreparedRun {
            cable,
            dfu_directory: dfu_directory.to_owned(),
            settings,
        })
    }

    pub fn cable(&self) -> CableType {
        self.cable
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn device_info(&self) -> Result<DeviceInfo, ConfigurationError> {
        Ok(DeviceInfo::builder(self.cable)
            .manufacturer(&self.settings.identity.manufacturer)
            .product(self.settings.identity.product(self.cable)?)
            .build())
    }

    /// Runs the configured number of trials, writing the run log through
    /// `output`. Trial failures are part of the returned summary; an `Err`
    /// means the run couldn't be carried out or recorded at all.
    pub async fn execute<I: ToolInvoker>(
        &self,
        invoker: &I,
        output: tv::Config,
    ) -> Result<RunSummary, HarnessError> {
        let trials = self.settings.trials;

        let run = TestRun::builder(HARNESS_NAME, &self.device_info()?, HARNESS_VERSION)
            .add_parameter("cableType", self.cable.tag().into())
            .add_parameter("dfuDirectory", self.dfu_directory.display().to_string().into())
            .add_parameter("trials", trials.into())
            .add_parameter(
                "enumerationDelaySecs",
                self.settings.enumeration_delay_secs.into(),
            )
            .config(output)
            .build()
            .start()
            .await?;

        info!(cable = %self.cable, trials, "starting run");
        let controller =
            TrialController::new(invoker, &self.settings, self.cable, &self.dfu_directory);
        let summary = controller.run(&run, trials).await?;

        let (status, result) = match &summary.failure {
            None => (TestStatus::Complete, TestResult::Pass),
            Some(failure) => {
                run.add_error_with_msg(failure.error.symptom(), &failure.error.to_string())
                    .await?;
                outcome_of(&failure.error)
            }
        };
        run.end(status, result, summary.attempted, summary.passed)
            .await?;

        if summary.all_passed() {
            info!(passed = summary.passed, "all trials passed");
        } else {
            warn!(
                passed = summary.passed,
                attempted = summary.attempted,
                requested = summary.requested,
                "run halted"
            );
        }

        Ok(summary)
    }
}

fn outcome_of(error: &HarnessError) -> (TestStatus, TestResult) {
    match error {
        HarnessError::Configuration(_) => (TestStatus::Error, TestResult::NotApplicable),
        HarnessError::Process(_) | HarnessError::Verification(_) => {
            (TestStatus::Complete, TestResult::Fail)
        }
        HarnessError::Output(_) | HarnessError::Io { .. } => (TestStatus::Error, TestResult::Fail),
    }
}
