// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! JSON lines run log
//!
//! A [`TestRun`] owns the emitter; trials opened from it share the same
//! sequence numbering and sink.

mod config;
mod device;
mod diagnosis;
mod emitter;
mod error;
mod file;
mod log;
mod run;
mod trial;
mod writer;

pub use config::{Config, ConfigBuilder, TimestampProvider};
pub use device::{DeviceInfo, DeviceInfoBuilder};
pub use diagnosis::{Diagnosis, DiagnosisBuilder};
pub use emitter::{JsonEmitter, OutputError};
pub use error::{Error, ErrorBuilder};
pub use file::{File, FileBuilder};
pub use log::{Log, LogBuilder};
pub use run::{StartedTestRun, TestRun, TestRunBuilder};
pub use trial::{StartedTestTrial, TestTrial};
pub use writer::{BufferWriter, FileWriter, StdoutWriter, Writer, WriterType};

pub use crate::spec::{
    DiagnosisType, LogSeverity, TestResult, TestStatus, TrialPhase, SPEC_VERSION,
};

pub use serde_json::Value;
pub use url::Url as Uri;
