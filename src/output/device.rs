// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::cable::{CableType, VENDOR_ID};
use crate::spec;

/// The cable under test, as described in the `runStart` record.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    cable: CableType,
    manufacturer: Option<String>,
    product: Option<String>,
}

impl DeviceInfo {
    pub fn builder(cable: CableType) -> DeviceInfoBuilder {
        DeviceInfoBuilder::new(cable)
    }

    pub fn new(cable: CableType) -> DeviceInfo {
        DeviceInfoBuilder::new(cable).build()
    }

    pub fn cable(&self) -> CableType {
        self.cable
    }

    pub(crate) fn to_spec(&self) -> spec::DeviceInfo {
        spec::DeviceInfo {
            cable_type: self.cable.tag().to_owned(),
            vendor_id: format!("0x{:04x}", VENDOR_ID),
            product_id: format!("0x{:04x}", self.cable.product_id()),
            manufacturer: self.manufacturer.clone(),
            product: self.product.clone(),
        }
    }
}

pub struct DeviceInfoBuilder {
    cable: CableType,
    manufacturer: Option<String>,
    product: Option<String>,
}

impl DeviceInfoBuilder {
    fn new(cable: CableType) -> Self {
        DeviceInfoBuilder {
            cable,
            manufacturer: None,
            product: None,
        }
    }

    /// Expected iManufacture string.
    pub fn manufacturer(mut self, value: &str) -> Self {
        self.manufacturer = Some(value.to_owned());
        self
    }

    /// Expected iProduct string.
    pub fn product(mut self, value: &str) -> Self {
        self.product = Some(value.to_owned());
        self
    }

    pub fn build(self) -> DeviceInfo {
        DeviceInfo {
            cable: self.cable,
            manufacturer: self.manufacturer,
            product: self.product,
        }
    }
}
