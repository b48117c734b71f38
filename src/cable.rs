// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// USB vendor id assigned to the cable manufacturer.
pub const VENDOR_ID: u16 = 0x1901;

/// The active cable variants that can be put through the update path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CableType {
    Ure,
    Utt,
    Upp12,
}

impl CableType {
    pub const ALL: [CableType; 3] = [CableType::Ure, CableType::Utt, CableType::Upp12];

    /// The tag used on the command line, in artifact names and by the image builder.
    pub fn tag(&self) -> &'static str {
        match self {
            CableType::Ure => "ure",
            CableType::Utt => "utt",
            CableType::Upp12 => "upp12",
        }
    }

    pub fn product_id(&self) -> u16 {
        match self {
            CableType::Ure => 0x0020,
            CableType::Utt => 0x002f,
            CableType::Upp12 => 0x0029,
        }
    }

    pub fn device(&self) -> DeviceAddress {
        DeviceAddress {
            vendor_id: VENDOR_ID,
            product_id: self.product_id(),
        }
    }
}

impl fmt::Display for CableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for CableType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CableType::ALL
            .into_iter()
            .find(|cable| cable.tag() == s)
            .ok_or_else(|| ConfigurationError::UnknownCableType(s.to_owned()))
    }
}

/// Vendor and product id pair used to address a device on the bus.
///
/// Renders as `vvvv:pppp`, the form accepted by `lsusb -d` and `dfu-util -d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAddress {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}
