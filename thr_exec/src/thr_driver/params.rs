//! # Thruster driver parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Internal
use super::{
    BranchCoeffs, CalibrationTable, ChannelConfig, ConfigError, OperatingVoltage,
    DEFAULT_DEVICE_ADDRESS, DEFAULT_NUM_CHANNELS,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the thruster driver.
///
/// Every per-channel array must have `num_channels` elements and is indexed
/// by the ESC channel (physical wiring order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- BUS ----

    /// Number of the I2C bus, i.e. `/dev/i2c-{i2c_bus}`.
    pub i2c_bus: u8,

    /// I2C address of the ESC microcontroller.
    pub device_address: u8,

    /// Maximum time a bus write may block.
    ///
    /// Units: milliseconds
    pub bus_timeout_ms: Option<u32>,

    // ---- CALIBRATION ----

    /// Supply voltage of the vehicle, selects the calibration to use.
    ///
    /// Units: volts
    pub operating_voltage_v: f64,

    /// Calibration coefficients keyed by voltage (`"10"`, `"12"`, ...). Each
    /// entry has a `LEFT` (negative force) and `RIGHT` (positive force) set.
    pub coeffs: BTreeMap<String, BranchCoeffs>,

    // ---- CHANNELS ----

    /// Number of ESC channels.
    pub num_channels: usize,

    /// Index of the force demand sent to each ESC channel.
    pub mapping: Vec<usize>,

    /// Mounting direction of each thruster, `1` or `-1`.
    pub direction: Vec<i8>,

    /// Offset added to each channel's signal.
    ///
    /// Units: microseconds
    pub pwm_offset: Vec<i16>,

    /// Lowest signal of each channel.
    ///
    /// Units: microseconds
    pub pwm_min: Vec<i16>,

    /// Highest signal of each channel.
    ///
    /// Units: microseconds
    pub pwm_max: Vec<i16>,
}

/// Parameters which have been checked and converted into the driver's
/// configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidParams {
    pub channels: ChannelConfig,
    pub voltage: OperatingVoltage,
    pub coeffs: BranchCoeffs,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        let n = DEFAULT_NUM_CHANNELS;

        Self {
            i2c_bus: 1,
            device_address: DEFAULT_DEVICE_ADDRESS,
            bus_timeout_ms: None,
            operating_voltage_v: 16.0,
            coeffs: BTreeMap::new(),
            num_channels: n,
            mapping: (0..n).rev().collect(),
            direction: vec![1; n],
            pwm_offset: vec![0; n],
            pwm_min: vec![1100; n],
            pwm_max: vec![1900; n],
        }
    }
}

impl Params {

    /// Determines if the parameters are valid.
    pub fn are_valid(&self) -> Result<(), ConfigError> {
        self.validate().map(|_| ())
    }

    /// Check the parameters and build the driver configuration from them.
    ///
    /// Only the calibration for the selected operating voltage has to be
    /// complete, other voltages may be partially filled in.
    pub fn validate(&self) -> Result<ValidParams, ConfigError> {
        let channels = ChannelConfig::new(
            self.num_channels,
            &self.mapping,
            &self.direction,
            &self.pwm_offset,
            &self.pwm_min,
            &self.pwm_max,
        )?;

        let voltage = OperatingVoltage::from_voltage(self.operating_voltage_v)?;

        let coeffs = CalibrationTable::from_params(&self.coeffs)?
            .coeffs_for(voltage)?
            .clone();

        Ok(ValidParams {
            channels,
            voltage,
            coeffs,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::thr_driver::Branch;

    const PARAMS_TOML: &str = r#"
        i2c_bus = 1
        device_address = 0x21
        bus_timeout_ms = 20
        operating_voltage_v = 16.4
        num_channels = 4
        mapping = [3, 2, 1, 0]
        direction = [1, -1, 1, -1]
        pwm_offset = [0, 10, 0, -10]
        pwm_min = [1100, 1100, 1100, 1100]
        pwm_max = [1900, 1900, 1900, 1900]

        [coeffs.16]
        LEFT = [-1.5, -13.0, -111.0, 1460.0]
        RIGHT = [2.2, -14.0, 95.0, 1540.0]

        [coeffs.20]
        LEFT = [-1.2, -11.0, -95.0, 1464.0]
    "#;

    #[test]
    fn test_load_and_validate() {
        let params: Params = util::params::from_str(PARAMS_TOML).unwrap();
        assert_eq!(params.device_address, 0x21);
        assert_eq!(params.bus_timeout_ms, Some(20));

        let valid = params.validate().unwrap();
        assert_eq!(valid.voltage, OperatingVoltage::V16);
        assert_eq!(valid.channels.len(), 4);
        assert_eq!(valid.coeffs.positive, vec![2.2, -14.0, 95.0, 1540.0]);
    }

    #[test]
    fn test_incomplete_active_calibration() {
        let mut params: Params = util::params::from_str(PARAMS_TOML).unwrap();

        // The 20 V calibration has no RIGHT coefficients
        params.operating_voltage_v = 20.5;
        assert_eq!(
            params.are_valid(),
            Err(ConfigError::MissingCoefficients {
                voltage: OperatingVoltage::V20,
                branch: Branch::Positive
            })
        );

        // No calibration at all for 12 V
        params.operating_voltage_v = 12.0;
        assert!(params.are_valid().is_err());
    }

    #[test]
    fn test_defaults() {
        let params = Params::default();
        assert_eq!(params.mapping, vec![7, 6, 5, 4, 3, 2, 1, 0]);

        // Defaults have no calibration so can't be used as is
        assert!(matches!(
            params.are_valid(),
            Err(ConfigError::MissingCoefficients { voltage: OperatingVoltage::V16, .. })
        ));
    }
}
