//! # Thruster driver state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use embedded_hal::blocking::i2c;
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// Internal
use super::{
    force_to_signal, BranchCoeffs, BusHandle, BusTransport, ChannelConfig, ConfigError,
    OperatingVoltage, Params, SignalVector, TransportError,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest force the positive calibration branch is checked up to.
///
/// Units: kilogram-force
const CALIB_CHECK_MAX_FORCE_KGF: f64 = 5.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drives the thrusters from per-thruster force demands.
///
/// The driver owns the bus. It is not internally synchronised: calls to
/// [`ThrusterDriver::drive`] from several threads must be serialised by the
/// caller, for example by keeping the driver behind a `Mutex`.
pub struct ThrusterDriver<I2C> {
    channels: ChannelConfig,
    voltage: OperatingVoltage,
    coeffs: BranchCoeffs,
    transport: BusTransport<I2C>,
    report: StatusReport,
}

/// Status report for the last drive cycle.
#[derive(Clone, Default, Serialize, Debug, PartialEq)]
pub struct StatusReport {
    /// True for each channel whose signal was limited to its bounds.
    pub signal_limited: Vec<bool>,

    /// The frame was written to the bus.
    pub frame_sent: bool,

    /// The failure which ended the cycle, if any.
    pub failure: Option<CycleFailure>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur during a drive cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriveError {
    #[error("Expected {expected} force demands, found {found}")]
    InvalidInput {
        expected: usize,
        found: usize
    },

    #[error("Force demand {index} is not finite ({value})")]
    NonFiniteForce {
        index: usize,
        value: f64
    },

    /// The signals were computed but could not be sent.
    #[error("Signals {signals:?} not sent: {source}")]
    Transport {
        signals: SignalVector,
        source: TransportError
    },
}

/// Short form of a cycle failure for the status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleFailure {
    InvalidInput,
    BusUnavailable,
    WriteFailed,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<I2C> ThrusterDriver<I2C> {
    /// Create a new driver.
    ///
    /// All parameters are checked here, an invalid configuration can't be
    /// used to build a driver. An unavailable bus is accepted, the driver
    /// then computes signals each cycle but reports
    /// [`TransportError::BusUnavailable`] instead of sending them.
    pub fn new(params: &Params, bus: BusHandle<I2C>) -> Result<Self, ConfigError> {
        let valid = params.validate()?;

        info!(
            "Thruster driver: {} channels at {} (supply {} V), ESC board at 0x{:02x}",
            valid.channels.len(),
            valid.voltage,
            params.operating_voltage_v,
            params.device_address
        );
        debug!("Channel configuration: {:#?}", valid.channels);

        if !valid.coeffs.positive_is_monotonic(CALIB_CHECK_MAX_FORCE_KGF, 100) {
            warn!(
                "The {} calibration is not monotonic up to {} kgf, larger forces \
                may give smaller signals",
                valid.voltage,
                CALIB_CHECK_MAX_FORCE_KGF
            );
        }

        if !bus.is_connected() {
            error!("Thruster bus unavailable, signals will be computed but not sent");
        }

        Ok(Self {
            channels: valid.channels,
            voltage: valid.voltage,
            coeffs: valid.coeffs,
            transport: BusTransport::new(bus, params.device_address),
            report: StatusReport::default(),
        })
    }

    /// Number of thruster channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// The calibration voltage in use.
    pub fn voltage(&self) -> OperatingVoltage {
        self.voltage
    }

    /// The channel configuration.
    pub fn channels(&self) -> &ChannelConfig {
        &self.channels
    }

    /// True if frames are being sent to the thrusters.
    pub fn bus_available(&self) -> bool {
        self.transport.is_available()
    }

    /// Number of frames written to the bus since the driver was created.
    pub fn frames_sent(&self) -> u64 {
        self.transport.frames_sent()
    }

    /// Status of the last call to [`ThrusterDriver::drive`].
    pub fn last_report(&self) -> &StatusReport {
        &self.report
    }

    /// Access the bus, if connected.
    pub fn bus(&self) -> Option<&I2C> {
        self.transport.bus()
    }

    /// Compute the signal of every channel for the given forces.
    ///
    /// Forces are in newtons, one per thruster in demand order. Nothing is
    /// sent.
    pub fn compute_signals(&self, forces: &[f64]) -> Result<(SignalVector, Vec<bool>), DriveError> {
        if forces.len() != self.channels.len() {
            return Err(DriveError::InvalidInput {
                expected: self.channels.len(),
                found: forces.len(),
            });
        }

        if let Some((index, &value)) = forces.iter().enumerate().find(|(_, f)| !f.is_finite()) {
            return Err(DriveError::NonFiniteForce { index, value });
        }

        let reordered = self.channels.reorder(forces);

        Ok(self
            .channels
            .channels()
            .iter()
            .zip(reordered)
            .map(|(ch, force)| ch.limit(force_to_signal(force, ch.offset, &self.coeffs)))
            .unzip())
    }
}

impl<I2C, E> ThrusterDriver<I2C>
where
    I2C: i2c::Write<Error = E>,
    E: fmt::Debug,
{
    /// Drive the thrusters with the given forces.
    ///
    /// Forces are in newtons, one per thruster in demand order. On success
    /// the signals that were sent are returned. A transport failure still
    /// gives the computed signals, inside [`DriveError::Transport`].
    ///
    /// Invalid input is rejected before anything is written, leaving the
    /// thrusters at the last commanded signals.
    pub fn drive(&mut self, forces: &[f64]) -> Result<SignalVector, DriveError> {
        self.report = StatusReport::default();

        let (signals, limited) = match self.compute_signals(forces) {
            Ok(s) => s,
            Err(e) => {
                warn!("Rejected force demands: {}", e);
                self.report.failure = Some(CycleFailure::InvalidInput);
                return Err(e);
            }
        };

        if limited.iter().any(|&l| l) {
            debug!("Signals limited on channels {:?}", limited);
        }
        trace!("forces in: {:?}\n    signals out: {:?}", forces, signals);

        self.report.signal_limited = limited;

        match self.transport.send(&signals) {
            Ok(()) => {
                self.report.frame_sent = true;
                Ok(signals)
            },
            Err(source) => {
                self.report.failure = Some(match source {
                    TransportError::BusUnavailable => CycleFailure::BusUnavailable,
                    TransportError::Write { .. } => CycleFailure::WriteFailed,
                });
                Err(DriveError::Transport { signals, source })
            }
        }
    }

    /// Command zero force on every thruster.
    pub fn stop(&mut self) -> Result<SignalVector, DriveError> {
        let zeros = vec![0.0; self.num_channels()];
        self.drive(&zeros)
    }
}

impl DriveError {
    /// The signals computed in the failed cycle, if it got that far.
    pub fn signals(&self) -> Option<&SignalVector> {
        match self {
            DriveError::Transport { signals, .. } => Some(signals),
            _ => None,
        }
    }

    /// True if the error is because the bus isn't available.
    pub fn is_bus_unavailable(&self) -> bool {
        matches!(
            self,
            DriveError::Transport { source: TransportError::BusUnavailable, .. }
        )
    }
}
