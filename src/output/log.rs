// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::spec;

/// A free-form message attached to the run or to a trial.
pub struct Log {
    severity: spec::LogSeverity,
    message: String,
}

impl Log {
    pub fn builder(message: &str) -> LogBuilder {
        LogBuilder::new(message)
    }

    pub fn to_artifact(&self) -> spec::Log {
        spec::Log {
            severity: self.severity.clone(),
            message: self.message.clone(),
        }
    }
}

#[derive(Debug)]
pub struct LogBuilder {
    severity: spec::LogSeverity,
    message: String,
}

impl LogBuilder {
    fn new(message: &str) -> Self {
        LogBuilder {
            severity: spec::LogSeverity::Info,
            message: message.to_string(),
        }
    }

    pub fn severity(mut self, value: spec::LogSeverity) -> LogBuilder {
        self.severity = value;
        self
    }

    pub fn build(self) -> Log {
        Log {
            severity: self.severity,
            message: self.message,
        }
    }
}
