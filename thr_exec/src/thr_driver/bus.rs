//! # Thruster bus transport
//!
//! Signals are sent to the ESC microcontroller as a single I2C write:
//!
//! ```text
//! byte 0:        SET_SIGNALS_CMD (0x00)
//! bytes 1..=2N:  signal of each channel in physical order, big endian
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use byteorder::{BigEndian, ByteOrder};
use embedded_hal::blocking::i2c;
use log::{error, info, warn};
use std::fmt;

// Internal
use super::SET_SIGNALS_CMD;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Owns the bus and writes signal frames to the ESC microcontroller.
///
/// The transport does no locking of its own, it must have exclusive use of
/// the bus.
pub struct BusTransport<I2C> {
    bus: BusHandle<I2C>,
    address: u8,
    frames_sent: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The I2C bus used by the transport, which may not have been opened.
///
/// When the bus can't be opened the driver keeps running, computing signals
/// without sending them, which is what's wanted when bench testing without
/// the thrusters attached.
pub enum BusHandle<I2C> {
    Connected(I2C),
    Unavailable,
}

/// Errors which can occur sending a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("The thruster bus is unavailable, thrusters are offline")]
    BusUnavailable,

    #[error("Could not write to the ESC board at 0x{address:02x}: {reason}")]
    Write {
        address: u8,
        reason: String
    },
}

/// Stands in for the I2C bus on hosts without one. Can never be constructed
/// so the bus is always [`BusHandle::Unavailable`].
#[derive(Debug)]
pub enum NoBus {}

/// The I2C bus type of this platform.
#[cfg(target_os = "linux")]
pub type SystemBus = rppal::i2c::I2c;

/// The I2C bus type of this platform.
#[cfg(not(target_os = "linux"))]
pub type SystemBus = NoBus;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<I2C> BusHandle<I2C> {
    /// True if a bus is connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, BusHandle::Connected(_))
    }
}

impl<I2C> fmt::Debug for BusHandle<I2C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusHandle::Connected(_) => write!(f, "Connected"),
            BusHandle::Unavailable => write!(f, "Unavailable"),
        }
    }
}

impl<I2C> BusTransport<I2C> {
    /// Create a new transport writing to the device at `address`.
    pub fn new(bus: BusHandle<I2C>, address: u8) -> Self {
        Self {
            bus,
            address,
            frames_sent: 0,
        }
    }

    /// True if frames can be written.
    pub fn is_available(&self) -> bool {
        self.bus.is_connected()
    }

    /// The I2C address frames are written to.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Number of frames successfully written.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Access the underlying bus, if there is one.
    pub fn bus(&self) -> Option<&I2C> {
        match &self.bus {
            BusHandle::Connected(b) => Some(b),
            BusHandle::Unavailable => None,
        }
    }
}

impl<I2C, E> BusTransport<I2C>
where
    I2C: i2c::Write<Error = E>,
    E: fmt::Debug,
{
    /// Frame the signals and write them to the device.
    ///
    /// The frame is sent in a single write, it is not retried on failure.
    pub fn send(&mut self, signals: &[i16]) -> Result<(), TransportError> {
        let bus = match &mut self.bus {
            BusHandle::Connected(b) => b,
            BusHandle::Unavailable => return Err(TransportError::BusUnavailable),
        };

        let address = self.address;
        let frame = encode_frame(signals);

        bus.write(address, &frame)
            .map_err(|e| TransportError::Write {
                address,
                reason: format!("{:?}", e),
            })?;

        self.frames_sent += 1;

        Ok(())
    }
}

impl i2c::Write for NoBus {
    type Error = TransportError;

    fn write(&mut self, _address: u8, _bytes: &[u8]) -> Result<(), Self::Error> {
        match *self {}
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the frame which sets every channel's signal.
pub fn encode_frame(signals: &[i16]) -> Vec<u8> {
    let mut frame = vec![0u8; 1 + 2 * signals.len()];
    frame[0] = SET_SIGNALS_CMD;

    for (bytes, &signal) in frame[1..].chunks_exact_mut(2).zip(signals) {
        BigEndian::write_i16(bytes, signal);
    }

    frame
}

/// Open the I2C bus `/dev/i2c-{bus_id}`.
///
/// Failing to open the bus is logged and gives [`BusHandle::Unavailable`]
/// rather than an error, so the driver can still run without thrusters.
/// `timeout_ms` limits how long a write may block waiting for the device.
#[cfg(target_os = "linux")]
pub fn open_i2c_bus(bus_id: u8, timeout_ms: Option<u32>) -> BusHandle<SystemBus> {
    let i2c = match rppal::i2c::I2c::with_bus(bus_id) {
        Ok(i) => i,
        Err(e) => {
            error!("Failed to open I2C bus {}: {}", bus_id, e);
            return BusHandle::Unavailable;
        }
    };

    if let Some(t) = timeout_ms {
        if let Err(e) = i2c.set_timeout(t) {
            warn!("Could not set a {} ms timeout on I2C bus {}: {}", t, bus_id, e);
        }
    }

    info!("Opened I2C bus {}", bus_id);

    BusHandle::Connected(i2c)
}

/// Open the I2C bus `/dev/i2c-{bus_id}`.
///
/// There is no I2C support on this platform so the bus is always unavailable.
#[cfg(not(target_os = "linux"))]
pub fn open_i2c_bus(bus_id: u8, _timeout_ms: Option<u32>) -> BusHandle<SystemBus> {
    error!("I2C bus {} cannot be opened, I2C is only supported on Linux", bus_id);
    warn!("Thrusters will be offline for this session");
    info!("Signals will still be computed and archived");

    BusHandle::Unavailable
}
