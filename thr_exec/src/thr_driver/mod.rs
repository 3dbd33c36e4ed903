//! # Thruster driver module
//!
//! This module converts per-thruster force demands into PWM signals and sends
//! them over I2C to the microcontroller driving the ESCs. Each cycle:
//!
//! 1. Forces are reordered and sign flipped so they match the physical wiring
//!    of the ESC channels.
//! 2. Each force is converted into a raw PWM signal using the thruster
//!    calibration polynomials for the vehicle's operating voltage.
//! 3. The channel's PWM offset is applied and the signal is limited to the
//!    channel's bounds.
//! 4. The signals are framed and written to the bus in one transaction.
//!
//! All configuration is validated once when the [`ThrusterDriver`] is
//! created, after which it cannot change.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod bus;
mod calib;
mod channel;
mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use bus::*;
pub use calib::*;
pub use channel::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Standard gravity, converts newtons into the kilogram-force units of the
/// thruster datasheet.
///
/// Units: meters/second^2
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// The PWM signal which stops a thruster.
///
/// Units: microseconds
pub const NEUTRAL_SIGNAL: i16 = 1500;

/// Command byte telling the microcontroller to set all channel signals.
pub const SET_SIGNALS_CMD: u8 = 0x00;

/// Default I2C address of the ESC microcontroller.
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0x21;

/// Number of thrusters on the vehicle.
pub const DEFAULT_NUM_CHANNELS: usize = 8;

/// A PWM signal per channel.
pub type SignalVector = Vec<i16>;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in the driver configuration.
///
/// These are detected when the driver is created and prevent it from being
/// used at all.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one thruster channel must be configured")]
    NoChannels,

    #[error("Expected {expected} values for `{field}`, found {found}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize
    },

    #[error("The thruster mapping {0:?} is not a permutation of the channel indices")]
    MappingNotBijective(Vec<usize>),

    #[error("Channel {channel} has direction {value}, must be -1 or 1")]
    InvalidDirection {
        channel: usize,
        value: i8
    },

    #[error("Channel {channel} has a minimum signal ({min}) above its maximum ({max})")]
    MinAboveMax {
        channel: usize,
        min: i16,
        max: i16
    },

    #[error("Operating voltage {0} V cannot be mapped to a calibration")]
    UnsupportedVoltage(f64),

    #[error("Calibration key {0:?} is not a supported operating voltage")]
    InvalidBucketKey(String),

    #[error("No {branch} coefficients for the {voltage} calibration")]
    MissingCoefficients {
        voltage: OperatingVoltage,
        branch: Branch
    },

    #[error("The {branch} coefficients for the {voltage} calibration are not finite")]
    InvalidCoefficients {
        voltage: OperatingVoltage,
        branch: Branch
    },
}
