// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::spec;

/// An error record. `symptom` is a short machine friendly category such as
/// `verification-error`; `message` carries the human readable detail.
#[derive(Clone)]
pub struct Error {
    symptom: String,
    message: Option<String>,
}

impl Error {
    pub fn builder(symptom: &str) -> ErrorBuilder {
        ErrorBuilder::new(symptom)
    }

    pub fn to_artifact(&self) -> spec::Error {
        spec::Error {
            symptom: self.symptom.clone(),
            message: self.message.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ErrorBuilder {
    symptom: String,
    message: Option<String>,
}

impl ErrorBuilder {
    fn new(symptom: &str) -> Self {
        ErrorBuilder {
            symptom: symptom.to_string(),
            ..Default::default()
        }
    }

    pub fn message(mut self, value: &str) -> Self {
        self.message = Some(value.to_string());
        self
    }

    pub fn build(self) -> Error {
        Error {
            symptom: self.symptom,
            message: self.message,
        }
    }
}
