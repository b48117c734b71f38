// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::io;
use std::path::PathBuf;

use crate::cable::CableType;
use crate::output::OutputError;
use crate::package::FirmwareComponent;
use crate::tool::ProcessExecutionError;
use crate::verify::VerificationError;

/// Process exit codes used when no external tool exit code is available.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const SPAWN_FAILURE: i32 = -1;
    pub const TOOL_FAILURE: i32 = -2;
    pub const BAD_CABLE_TYPE: i32 = -3;
    pub const MISSING_DIRECTORY: i32 = -4;
    pub const VERIFICATION_FAILURE: i32 = -5;
    pub const CONFIGURATION: i32 = -6;
    pub const IO_FAILURE: i32 = -7;
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("bad cable type given: '{0}' should be one of [ure, utt, upp12]")]
    UnknownCableType(String),

    #[error("DFU directory '{}' does not exist or is not a directory", .0.display())]
    MissingDfuDirectory(PathBuf),

    #[error("image directory '{}' for component {component} does not exist", .path.display())]
    MissingComponentDirectory {
        component: FirmwareComponent,
        path: PathBuf,
    },

    #[error("no image files for component {component} in '{}'", .path.display())]
    NoComponentImages {
        component: FirmwareComponent,
        path: PathBuf,
    },

    #[error("no expected product string configured for cable type {0}")]
    MissingProductString(CableType),

    #[error("failed to read settings file '{}'", .path.display())]
    UnreadableSettings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings file '{}'", .path.display())]
    InvalidSettings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigurationError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigurationError::UnknownCableType(_) => exit_code::BAD_CABLE_TYPE,
            ConfigurationError::MissingDfuDirectory(_)
            | ConfigurationError::MissingComponentDirectory { .. }
            | ConfigurationError::NoComponentImages { .. } => exit_code::MISSING_DIRECTORY,
            ConfigurationError::MissingProductString(_)
            | ConfigurationError::UnreadableSettings { .. }
            | ConfigurationError::InvalidSettings { .. } => exit_code::CONFIGURATION,
        }
    }
}

/// Every way a run can stop early. None of them is retried.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Process(#[from] ProcessExecutionError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("{context} '{}'", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HarnessError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        HarnessError::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// The exit status the process terminates with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessError::Configuration(e) => e.exit_code(),
            HarnessError::Process(e) => e.exit_code(),
            HarnessError::Verification(_) => exit_code::VERIFICATION_FAILURE,
            HarnessError::Output(_) | HarnessError::Io { .. } => exit_code::IO_FAILURE,
        }
    }

    /// Short machine friendly name, used as the error symptom in the run log.
    pub fn symptom(&self) -> &'static str {
        match self {
            HarnessError::Configuration(_) => "configuration-error",
            HarnessError::Process(_) => "process-execution-error",
            HarnessError::Verification(_) => "verification-error",
            HarnessError::Output(_) | HarnessError::Io { .. } => "io-error",
        }
    }
}
