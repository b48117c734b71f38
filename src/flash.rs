// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::fs;
use tracing::{debug, info};

use crate::cable::CableType;
use crate::error::{ConfigurationError, HarnessError};
use crate::package::{UpdatePackageConfig, UpdatePackageConfigBuilder};
use crate::serial::SerialNumber;
use crate::settings::Settings;
use crate::tool::{ProcessExecutionError, ToolCommand, ToolInvoker, ToolOutput};

/// What a successful build-and-flash leaves behind.
#[derive(Debug, Clone)]
pub struct FlashArtifact {
    /// The firmware package consumed by the flasher. Owned by the trial.
    pub path: PathBuf,
    /// Where the rendered package configuration was written.
    pub package_config_path: PathBuf,
    pub package_config: UpdatePackageConfig,
    pub builder_output: ToolOutput,
    pub flasher_output: ToolOutput,
}

/// Builds a serialized firmware package and programs it into the cable.
pub struct FlashOrchestrator<'a, I> {
    invoker: &'a I,
    settings: &'a Settings,
}

impl<'a, I: ToolInvoker> FlashOrchestrator<'a, I> {
    pub fn new(invoker: &'a I, settings: &'a Settings) -> Self {
        FlashOrchestrator { invoker, settings }
    }

    /// `sn_<cable>_<serial>.<ext>`
    pub fn artifact_file_name(&self, cable: CableType, serial: &SerialNumber) -> String {
        format!(
            "sn_{}_{}.{}",
            cable.tag(),
            serial,
            self.settings.artifact_extension
        )
    }

    pub fn artifact_path(&self, cable: CableType, serial: &SerialNumber) -> PathBuf {
        self.settings
            .work_directory
            .join(self.artifact_file_name(cable, serial))
    }

    /// The builder runs in the work directory, so the output is named
    /// relative to it.
    pub fn builder_command(&self, cable: CableType, serial: &SerialNumber) -> ToolCommand {
        ToolCommand::from_spec(&self.settings.tools.builder)
            .args(["-s", serial.as_str()])
            .args(["-a", cable.tag()])
            .arg("-o")
            .arg(self.artifact_file_name(cable, serial))
            .arg("-v")
            .current_dir(&self.settings.work_directory)
    }

    pub fn flasher_command(&self, cable: CableType, artifact: &Path) -> ToolCommand {
        let device = cable.device();
        ToolCommand::from_spec(&self.settings.tools.flasher)
            .arg("-v")
            .arg("-d")
            .arg(format!("{device},{device}"))
            .arg("-D")
            .arg(artifact.to_string_lossy())
    }

    /// Picks a random set of images from `dfu_directory` for the next
    /// package. Fails before anything touches the cable.
    pub async fn package_config(
        &self,
        cable: CableType,
        dfu_directory: &Path,
    ) -> Result<UpdatePackageConfig, ConfigurationError> {
        let mut rng = StdRng::from_entropy();
        UpdatePackageConfigBuilder::new(dfu_directory, self.settings.package_version)
            .build(cable, &mut rng)
            .await
    }

    /// Writes `package_config`, runs the image builder and then the flasher.
    /// Any failure is final; nothing is retried.
    pub async fn flash(
        &self,
        serial: &SerialNumber,
        cable: CableType,
        package_config: UpdatePackageConfig,
    ) -> Result<FlashArtifact, HarnessError> {
        let package_config_path = self.settings.package_config_path();
        fs::write(&package_config_path, package_config.render())
            .await
            .map_err(|e| {
                HarnessError::io("failed to write package configuration", &package_config_path, e)
            })?;
        debug!(
            path = %package_config_path.display(),
            images = package_config.images().len(),
            "package configuration written"
        );

        let build = self.builder_command(cable, serial);
        info!(command = %build, "building firmware package");
        let builder_output = self.invoker.invoke(&build).await?;
        debug!(output = %builder_output.combined(), "image builder finished");

        let path = self.artifact_path(cable, serial);
        if !fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return Err(ProcessExecutionError::MissingOutput {
                command: build.to_string(),
                path,
            }
            .into());
        }

        let program = self.flasher_command(cable, &path);
        info!(command = %program, "programming cable");
        let flasher_output = self.invoker.invoke(&program).await?;
        debug!(output = %flasher_output.combined(), "flasher finished");

        Ok(FlashArtifact {
            path,
            package_config_path,
            package_config,
            builder_output,
            flasher_output,
        })
    }
}
