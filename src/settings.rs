// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Harness settings
//!
//! Everything that depends on the bench environment (tool locations, the
//! identity strings the cable reports, timing) lives here and is passed
//! explicitly to the components that need it. All fields have defaults, so a
//! settings file only needs to name what differs from the reference bench.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::fs;

use crate::cable::CableType;
use crate::error::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Number of trials in a full run.
    pub trials: u32,
    /// Flat wait between flashing and querying the descriptors.
    pub enumeration_delay_secs: u64,
    /// Written to the root block of every package configuration.
    pub package_version: u32,
    /// Where package configurations and artifacts are written.
    pub work_directory: PathBuf,
    pub package_config_file: String,
    pub artifact_extension: String,
    pub identity: IdentitySettings,
    pub tools: ToolSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            trials: 100,
            enumeration_delay_secs: 5,
            package_version: 1,
            work_directory: PathBuf::from("."),
            package_config_file: "serial_number.cfg".to_owned(),
            artifact_extension: "dfu".to_owned(),
            identity: IdentitySettings::default(),
            tools: ToolSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file.
    pub async fn load_from(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).await.map_err(|source| {
            ConfigurationError::UnreadableSettings {
                path: path.to_owned(),
                source,
            }
        })?;

        toml::from_str(&content).map_err(|source| ConfigurationError::InvalidSettings {
            path: path.to_owned(),
            source,
        })
    }

    pub fn enumeration_delay(&self) -> Duration {
        Duration::from_secs(self.enumeration_delay_secs)
    }

    pub fn package_config_path(&self) -> PathBuf {
        self.work_directory.join(&self.package_config_file)
    }

    /// Every cable type must have an expected product string.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for cable in CableType::ALL {
            self.identity.product(cable)?;
        }
        Ok(())
    }
}

/// Strings the cable is expected to report in its descriptors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentitySettings {
    pub manufacturer: String,
    pub products: BTreeMap<CableType, String>,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        IdentitySettings {
            manufacturer: "GE Healthcare".to_owned(),
            products: CableType::ALL
                .into_iter()
                .map(|cable| (cable, cable.tag().to_uppercase()))
                .collect(),
        }
    }
}

impl IdentitySettings {
    pub fn product(&self, cable: CableType) -> Result<&str, ConfigurationError> {
        self.products
            .get(&cable)
            .map(String::as_str)
            .ok_or(ConfigurationError::MissingProductString(cable))
    }
}

/// An external program and the arguments placed before the ones the
/// harness adds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolSpec {
    fn new(program: &str, args: &[&str]) -> Self {
        ToolSpec {
            program: program.to_owned(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    pub builder: ToolSpec,
    pub flasher: ToolSpec,
    pub enumerator: ToolSpec,
}

impl Default for ToolSettings {
    fn default() -> Self {
        ToolSettings {
            builder: ToolSpec::new("perl", &["dfu_util.pl"]),
            flasher: ToolSpec::new("dfu-util", &[]),
            enumerator: ToolSpec::new("lsusb", &[]),
        }
    }
}
