//! # Thruster calibration
//!
//! The thruster datasheet gives force against PWM signal at a number of
//! supply voltages. Each voltage is fitted with two polynomials mapping force
//! (in kilogram-force) to signal, one for reverse thrust and one for forward
//! thrust.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Internal
use util::maths::{is_non_decreasing, poly_val};
use super::{ConfigError, NEUTRAL_SIGNAL, STANDARD_GRAVITY};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Polynomial coefficients for both thrust directions at one voltage.
///
/// The order of these coefficients is highest power first, i.e if there
/// are 3 coefficients it's a 2nd order polynomial with
/// `c[0]*x^2 + c[1]*x + c[2]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchCoeffs {
    /// Coefficients used for negative forces.
    #[serde(rename = "LEFT", default)]
    pub negative: Vec<f64>,

    /// Coefficients used for positive forces.
    #[serde(rename = "RIGHT", default)]
    pub positive: Vec<f64>,
}

/// Calibration coefficients for every operating voltage the vehicle may run at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    buckets: BTreeMap<OperatingVoltage, BranchCoeffs>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The supply voltages the thrusters are calibrated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OperatingVoltage {
    V10,
    V12,
    V14,
    V16,
    V18,
    V20,
}

/// Which polynomial of a [`BranchCoeffs`] applies to a force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Negative,
    Positive,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OperatingVoltage {
    /// Every calibrated voltage, lowest first.
    pub const ALL: [OperatingVoltage; 6] = [
        OperatingVoltage::V10,
        OperatingVoltage::V12,
        OperatingVoltage::V14,
        OperatingVoltage::V16,
        OperatingVoltage::V18,
        OperatingVoltage::V20,
    ];

    /// Select the calibration for a measured supply voltage.
    ///
    /// The voltage is rounded down to the nearest calibrated step. Anything
    /// below the lowest step uses the lowest calibration, anything at or
    /// above the highest step uses the highest one.
    pub fn from_voltage(voltage_v: f64) -> Result<Self, ConfigError> {
        if voltage_v.is_nan() {
            return Err(ConfigError::UnsupportedVoltage(voltage_v));
        }

        Ok(Self::ALL
            .iter()
            .rev()
            .find(|v| voltage_v >= f64::from(v.volts()))
            .copied()
            .unwrap_or(OperatingVoltage::V10))
    }

    /// Get the calibration for exactly `volts`, or `None` if there isn't one.
    pub fn from_volts(volts: u32) -> Option<Self> {
        Self::ALL.iter().find(|v| v.volts() == volts).copied()
    }

    /// The voltage of this calibration step.
    ///
    /// Units: volts
    pub fn volts(self) -> u32 {
        match self {
            OperatingVoltage::V10 => 10,
            OperatingVoltage::V12 => 12,
            OperatingVoltage::V14 => 14,
            OperatingVoltage::V16 => 16,
            OperatingVoltage::V18 => 18,
            OperatingVoltage::V20 => 20,
        }
    }
}

impl fmt::Display for OperatingVoltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} V", self.volts())
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Negative => write!(f, "negative (LEFT)"),
            Branch::Positive => write!(f, "positive (RIGHT)"),
        }
    }
}

impl BranchCoeffs {
    /// Get the coefficients of one branch.
    pub fn branch(&self, branch: Branch) -> &[f64] {
        match branch {
            Branch::Negative => &self.negative,
            Branch::Positive => &self.positive,
        }
    }

    /// Check the positive branch never decreases between zero and
    /// `max_force_kgf`, sampled at `num_samples` evenly spaced points.
    pub fn positive_is_monotonic(&self, max_force_kgf: f64, num_samples: usize) -> bool {
        let samples: Vec<f64> = (1..=num_samples)
            .map(|i| max_force_kgf * i as f64 / num_samples as f64)
            .map(|f| poly_val(f, &self.positive))
            .collect();

        is_non_decreasing(&samples)
    }
}

impl CalibrationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from the parameter file's representation, which is
    /// keyed by the voltage as a string (e.g. `"16"`).
    pub fn from_params(coeffs: &BTreeMap<String, BranchCoeffs>) -> Result<Self, ConfigError> {
        let mut table = Self::new();

        for (key, branches) in coeffs {
            let voltage = key
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(OperatingVoltage::from_volts)
                .ok_or_else(|| ConfigError::InvalidBucketKey(key.clone()))?;

            table.insert(voltage, branches.clone());
        }

        Ok(table)
    }

    /// Set the coefficients for a voltage, replacing any already present.
    pub fn insert(&mut self, voltage: OperatingVoltage, coeffs: BranchCoeffs) {
        self.buckets.insert(voltage, coeffs);
    }

    /// Get the coefficients for a voltage.
    ///
    /// Both branches must be present and finite, a calibration missing either
    /// one cannot command the full range of the thrusters.
    pub fn coeffs_for(&self, voltage: OperatingVoltage) -> Result<&BranchCoeffs, ConfigError> {
        let coeffs = self.buckets.get(&voltage).ok_or(ConfigError::MissingCoefficients {
            voltage,
            branch: Branch::Negative,
        })?;

        for &branch in &[Branch::Negative, Branch::Positive] {
            let c = coeffs.branch(branch);

            if c.is_empty() {
                return Err(ConfigError::MissingCoefficients { voltage, branch });
            }
            if !c.iter().all(|x| x.is_finite()) {
                return Err(ConfigError::InvalidCoefficients { voltage, branch });
            }
        }

        Ok(coeffs)
    }

    /// The voltages which have coefficients in this table.
    pub fn voltages(&self) -> impl Iterator<Item = OperatingVoltage> + '_ {
        self.buckets.keys().copied()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a force into a raw PWM signal for a channel.
///
/// The force (newtons) is converted into kilogram-force and the matching
/// branch polynomial evaluated. The result is truncated towards zero,
/// saturating at the limits of `i32`.
///
/// An exactly zero force always gives [`NEUTRAL_SIGNAL`] minus the channel's
/// `offset`, so once the offset is added back the thruster receives exactly
/// the neutral signal.
pub fn force_to_signal(force_n: f64, offset: i16, coeffs: &BranchCoeffs) -> i32 {
    let force_kgf = force_n / STANDARD_GRAVITY;

    let signal = if force_kgf < 0.0 {
        poly_val(force_kgf, &coeffs.negative)
    }
    else if force_kgf > 0.0 {
        poly_val(force_kgf, &coeffs.positive)
    }
    else {
        return i32::from(NEUTRAL_SIGNAL) - i32::from(offset);
    };

    signal.trunc() as i32
}
