//! Chip identification and electrical ratings.
//!
//! Source: YuToneWorld SYN6288 datasheet.

/// Chip name.
pub const CHIP_NAME: &str = "YuToneWorld SYN6288";

/// Manufacturer name.
pub const MANUFACTURER_NAME: &str = "YuToneWorld";

/// Host interface.
pub const INTERFACE: &str = "UART";

/// Minimum supply voltage (V).
pub const SUPPLY_VOLTAGE_MIN_V: f32 = 2.4;

/// Maximum supply voltage (V).
pub const SUPPLY_VOLTAGE_MAX_V: f32 = 5.1;

/// Maximum supply current (mA).
pub const MAX_CURRENT_MA: f32 = 280.0;

/// Minimum operating temperature (°C).
pub const TEMPERATURE_MIN_C: f32 = -35.0;

/// Maximum operating temperature (°C).
pub const TEMPERATURE_MAX_C: f32 = 85.0;

/// Driver version, `major * 1000 + minor * 100`.
pub const DRIVER_VERSION: u32 = 2000;

/// Static chip and driver information.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChipInfo {
    /// Chip name
    pub chip_name: &'static str,
    /// Manufacturer name
    pub manufacturer_name: &'static str,
    /// Host interface
    pub interface: &'static str,
    /// Minimum supply voltage (V)
    pub supply_voltage_min_v: f32,
    /// Maximum supply voltage (V)
    pub supply_voltage_max_v: f32,
    /// Maximum supply current (mA)
    pub max_current_ma: f32,
    /// Minimum operating temperature (°C)
    pub temperature_min_c: f32,
    /// Maximum operating temperature (°C)
    pub temperature_max_c: f32,
    /// Driver version, `major * 1000 + minor * 100`
    pub driver_version: u32,
}

impl ChipInfo {
    /// The SYN6288.
    pub const SYN6288: Self = Self {
        chip_name: CHIP_NAME,
        manufacturer_name: MANUFACTURER_NAME,
        interface: INTERFACE,
        supply_voltage_min_v: SUPPLY_VOLTAGE_MIN_V,
        supply_voltage_max_v: SUPPLY_VOLTAGE_MAX_V,
        max_current_ma: MAX_CURRENT_MA,
        temperature_min_c: TEMPERATURE_MIN_C,
        temperature_max_c: TEMPERATURE_MAX_C,
        driver_version: DRIVER_VERSION,
    };

    /// `(major, minor)` driver version.
    #[must_use]
    pub const fn driver_version_parts(&self) -> (u32, u32) {
        (self.driver_version / 1000, (self.driver_version % 1000) / 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_splits() {
        assert_eq!(ChipInfo::SYN6288.driver_version_parts(), (2, 0));
    }

    #[test]
    fn ratings_are_ordered() {
        let info = ChipInfo::SYN6288;
        assert!(info.supply_voltage_min_v < info.supply_voltage_max_v);
        assert!(info.temperature_min_c < info.temperature_max_c);
        assert_eq!(info.interface, "UART");
    }
}
