// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Descriptor verification
//!
//! After a flash the cable must come back with the manufacturer, product and
//! serial strings it was programmed with. The enumerator's report is matched
//! line by line against fixed field prefixes; the matching is positional and
//! deliberately tied to `lsusb -v` output.

use std::fmt;

use tracing::debug;

use crate::cable::CableType;
use crate::error::{ConfigurationError, HarnessError};
use crate::serial::SerialNumber;
use crate::settings::{IdentitySettings, ToolSpec};
use crate::tool::{ProcessExecutionError, ToolCommand, ToolInvoker};

/// The three string descriptors checked after every flash, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorField {
    Manufacturer,
    Product,
    Serial,
}

impl DescriptorField {
    pub const ALL: [DescriptorField; 3] = [
        DescriptorField::Manufacturer,
        DescriptorField::Product,
        DescriptorField::Serial,
    ];

    /// Line prefix in the enumerator report. Matched as a plain prefix so
    /// both `iManufacture` and `iManufacturer` spellings are accepted.
    pub fn prefix(&self) -> &'static str {
        match self {
            DescriptorField::Manufacturer => "iManufacture",
            DescriptorField::Product => "iProduct",
            DescriptorField::Serial => "iSerial",
        }
    }

    /// String descriptor index the device must report for this field.
    pub fn index(&self) -> &'static str {
        match self {
            DescriptorField::Manufacturer => "1",
            DescriptorField::Product => "2",
            DescriptorField::Serial => "3",
        }
    }
}

impl fmt::Display for DescriptorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorField::Manufacturer => f.write_str("manufacturer"),
            DescriptorField::Product => f.write_str("product"),
            DescriptorField::Serial => f.write_str("serial"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("expected 3 string descriptor lines, found {}: {found:?}", .found.len())]
    UnexpectedDescriptorCount { found: Vec<String> },

    #[error("{field} descriptor mismatch: expected {expected:?}, found {actual:?}")]
    DescriptorMismatch {
        field: DescriptorField,
        expected: String,
        actual: Vec<String>,
    },
}

/// Values a freshly flashed cable has to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDescriptors {
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
}

impl ExpectedDescriptors {
    pub fn new(manufacturer: &str, product: &str, serial: &SerialNumber) -> Self {
        ExpectedDescriptors {
            manufacturer: manufacturer.to_owned(),
            product: product.to_owned(),
            serial: serial.as_str().to_owned(),
        }
    }
}

/// The three descriptor lines found in a report, whitespace tokenized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorReport {
    pub manufacturer: Vec<String>,
    pub product: Vec<String>,
    pub serial: Vec<String>,
}

impl DescriptorReport {
    /// Selects the descriptor lines from a raw report.
    ///
    /// Exactly three lines must start with one of the field prefixes, and
    /// they must appear as manufacturer, product, serial.
    pub fn parse(raw: &str) -> Result<Self, VerificationError> {
        let found: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| {
                DescriptorField::ALL
                    .iter()
                    .any(|field| line.starts_with(field.prefix()))
            })
            .map(str::to_owned)
            .collect();

        if found.len() != DescriptorField::ALL.len() {
            return Err(VerificationError::UnexpectedDescriptorCount { found });
        }

        let mut tokenized = Vec::with_capacity(found.len());
        for (field, line) in DescriptorField::ALL.iter().zip(&found) {
            let tokens: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
            if !line.starts_with(field.prefix()) {
                return Err(VerificationError::DescriptorMismatch {
                    field: *field,
                    expected: field.prefix().to_owned(),
                    actual: tokens,
                });
            }
            tokenized.push(tokens);
        }

        let [manufacturer, product, serial]: [Vec<String>; 3] = tokenized
            .try_into()
            .map_err(|_| VerificationError::UnexpectedDescriptorCount {
                found: found.clone(),
            })?;

        Ok(DescriptorReport {
            manufacturer,
            product,
            serial,
        })
    }

    /// Positional check of every field against the expected values.
    pub fn check(&self, expected: &ExpectedDescriptors) -> Result<(), VerificationError> {
        let manufacturer: Vec<&str> = expected.manufacturer.split_whitespace().collect();
        check_line(
            DescriptorField::Manufacturer,
            &self.manufacturer,
            &expected.manufacturer,
            |values| values == manufacturer.as_slice(),
        )?;
        check_line(
            DescriptorField::Product,
            &self.product,
            &expected.product,
            |values| values.first() == Some(&expected.product.as_str()),
        )?;
        check_line(
            DescriptorField::Serial,
            &self.serial,
            &expected.serial,
            |values| values.first() == Some(&expected.serial.as_str()),
        )?;

        Ok(())
    }
}

/// `tokens[1]` must be the field's index, `tokens[2..]` must satisfy `matches`.
fn check_line<F>(
    field: DescriptorField,
    tokens: &[String],
    expected: &str,
    matches: F,
) -> Result<(), VerificationError>
where
    F: Fn(&[&str]) -> bool,
{
    let tokens_str: Vec<&str> = tokens.iter().map(String::as_str).collect();
    let index_ok = tokens_str.get(1) == Some(&field.index());
    let values = tokens_str.get(2..).unwrap_or_default();

    if index_ok && matches(values) {
        return Ok(());
    }

    Err(VerificationError::DescriptorMismatch {
        field,
        expected: format!("{} {expected}", field.index()),
        actual: tokens.to_vec(),
    })
}

/// Interprets an enumerator report.
///
/// Kept separate from the invocation so the matching rules can be replaced
/// or exercised without a device.
pub trait DescriptorOracle {
    fn check(&self, raw_report: &str, expected: &ExpectedDescriptors)
        -> Result<(), VerificationError>;
}

/// Prefix based matching of `lsusb -v` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LsusbOracle;

impl DescriptorOracle for LsusbOracle {
    fn check(
        &self,
        raw_report: &str,
        expected: &ExpectedDescriptors,
    ) -> Result<(), VerificationError> {
        DescriptorReport::parse(raw_report)?.check(expected)
    }
}

/// Queries the cable's string descriptors and checks them.
pub struct EnumerationVerifier<'a, I, O = LsusbOracle> {
    invoker: &'a I,
    enumerator: &'a ToolSpec,
    identity: &'a IdentitySettings,
    oracle: O,
}

impl<'a, I: ToolInvoker> EnumerationVerifier<'a, I> {
    pub fn new(invoker: &'a I, enumerator: &'a ToolSpec, identity: &'a IdentitySettings) -> Self {
        EnumerationVerifier {
            invoker,
            enumerator,
            identity,
            oracle: LsusbOracle,
        }
    }
}

impl<'a, I: ToolInvoker, O: DescriptorOracle> EnumerationVerifier<'a, I, O> {
    pub fn with_oracle<P: DescriptorOracle>(self, oracle: P) -> EnumerationVerifier<'a, I, P> {
        EnumerationVerifier {
            invoker: self.invoker,
            enumerator: self.enumerator,
            identity: self.identity,
            oracle,
        }
    }

    pub fn command(&self, cable: CableType) -> ToolCommand {
        ToolCommand::from_spec(self.enumerator)
            .arg("-v")
            .args(["-d".to_owned(), cable.device().to_string()])
    }

    /// Runs the enumerator against the cable and returns its report.
    pub async fn query(&self, cable: CableType) -> Result<String, ProcessExecutionError> {
        let output = self.invoker.invoke(&self.command(cable)).await?;
        debug!(report = %output.stdout, "descriptor report");

        Ok(output.stdout)
    }

    pub fn expected(
        &self,
        cable: CableType,
        serial: &SerialNumber,
    ) -> Result<ExpectedDescriptors, ConfigurationError> {
        Ok(ExpectedDescriptors::new(
            &self.identity.manufacturer,
            self.identity.product(cable)?,
            serial,
        ))
    }

    pub fn check(
        &self,
        raw_report: &str,
        expected: &ExpectedDescriptors,
    ) -> Result<(), VerificationError> {
        self.oracle.check(raw_report, expected)
    }

    /// Queries the cable and checks all three descriptors.
    pub async fn verify(
        &self,
        cable: CableType,
        expected_serial: &SerialNumber,
    ) -> Result<(), HarnessError> {
        let expected = self.expected(cable, expected_serial)?;
        let report = self.query(cable).await?;
        self.check(&report, &expected)?;

        Ok(())
    }
}
