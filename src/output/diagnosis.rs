// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::spec;

/// The harness's verdict on one descriptor check.
///
/// # Examples
///
/// ```
/// # use acm_dfu_test::output::*;
/// let diagnosis = Diagnosis::builder("iSerial", DiagnosisType::Fail)
///     .message("expected '3 abc123', got '3 abc124'")
///     .build();
/// ```
pub struct Diagnosis {
    verdict: String,
    diagnosis_type: spec::DiagnosisType,
    message: Option<String>,
}

impl Diagnosis {
    pub fn new(verdict: &str, diagnosis_type: spec::DiagnosisType) -> Self {
        Diagnosis {
            verdict: verdict.to_string(),
            diagnosis_type,
            message: None,
        }
    }

    pub fn builder(verdict: &str, diagnosis_type: spec::DiagnosisType) -> DiagnosisBuilder {
        DiagnosisBuilder::new(verdict, diagnosis_type)
    }

    pub fn to_artifact(&self) -> spec::Diagnosis {
        spec::Diagnosis {
            verdict: self.verdict.clone(),
            diagnosis_type: self.diagnosis_type.clone(),
            message: self.message.clone(),
        }
    }
}

pub struct DiagnosisBuilder {
    verdict: String,
    diagnosis_type: spec::DiagnosisType,
    message: Option<String>,
}

impl DiagnosisBuilder {
    fn new(verdict: &str, diagnosis_type: spec::DiagnosisType) -> Self {
        DiagnosisBuilder {
            verdict: verdict.to_string(),
            diagnosis_type,
            message: None,
        }
    }

    pub fn message(mut self, message: &str) -> DiagnosisBuilder {
        self.message = Some(message.to_string());
        self
    }

    pub fn build(self) -> Diagnosis {
        Diagnosis {
            verdict: self.verdict,
            diagnosis_type: self.diagnosis_type,
            message: self.message,
        }
    }
}
