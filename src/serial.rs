// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::fmt;

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Largest serial number the cable accepts.
pub const MAX_SERIAL_NUMBER_LEN: usize = 100;

/// A device serial number: 1 to 100 ASCII alphanumeric characters.
///
/// Generated fresh for every trial. There is no uniqueness guarantee, two
/// trials of the same run may draw the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialNumber(String);

impl SerialNumber {
    /// Draws a serial number from the thread local random source.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use acm_dfu_test::serial::SerialNumber;
    ///
    /// let serial = SerialNumber::generate();
    /// assert!(!serial.as_str().is_empty());
    /// ```
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Length is uniform in [1, 100], each character uniform over the 62
    /// alphanumeric symbols.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let len = rng.gen_range(1..=MAX_SERIAL_NUMBER_LEN);
        let value = (0..len)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect();

        SerialNumber(value)
    }

    /// Wraps an existing value, rejecting anything the cable would not accept.
    pub fn parse(value: &str) -> Option<Self> {
        let valid = (1..=MAX_SERIAL_NUMBER_LEN).contains(&value.len())
            && value.chars().all(|c| c.is_ascii_alphanumeric());

        valid.then(|| SerialNumber(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
