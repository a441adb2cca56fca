//! Device information structures

use std::fmt;

/// Device identification, as reported by the identification headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Bus address the device answered on
    pub address: u8,

    /// Manufacturer ID (header 246)
    pub manufacturer_id: String,

    /// Equipment category, e.g. "Bill Validator" (header 245)
    pub equipment_category: String,

    /// Product code (header 244)
    pub product_code: String,

    /// Build code (header 192)
    pub build_code: String,
}

impl DeviceInfo {
    pub fn new(
        address: u8,
        manufacturer_id: String,
        equipment_category: String,
        product_code: String,
        build_code: String,
    ) -> Self {
        Self {
            address,
            manufacturer_id,
            equipment_category,
            product_code,
            build_code,
        }
    }

    /// Check if the device reports itself as a bill validator
    pub fn is_bill_validator(&self) -> bool {
        self.equipment_category
            .eq_ignore_ascii_case("Bill Validator")
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[addr: {}, {} {} ({}), build: {}]",
            self.address,
            self.manufacturer_id,
            self.product_code,
            self.equipment_category,
            self.build_code
        )
    }
}
