//! # Thruster channel configuration

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;
use std::convert::TryFrom;

// Internal
use util::maths::clamp;
use super::ConfigError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Static configuration of one ESC channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Channel {
    /// Index of the force demand this channel executes.
    pub source: usize,

    /// Direction the thruster is mounted in.
    pub direction: Direction,

    /// Offset added to the raw signal.
    ///
    /// Units: microseconds
    pub offset: i16,

    /// Lowest signal that may be sent to this channel.
    ///
    /// Units: microseconds
    pub signal_min: i16,

    /// Highest signal that may be sent to this channel.
    ///
    /// Units: microseconds
    pub signal_max: i16,
}

/// Configuration of every ESC channel, in physical wiring order.
///
/// Once built the configuration is known to be valid: the mapping is a
/// permutation of the channel indices and every channel's bounds are ordered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelConfig {
    channels: Vec<Channel>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Mounting direction of a thruster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Normal,
    Reversed,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Direction {
    /// Multiplier applied to forces for this direction.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Normal => 1.0,
            Direction::Reversed => -1.0,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = i8;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Normal),
            -1 => Ok(Direction::Reversed),
            v => Err(v),
        }
    }
}

impl Channel {
    /// Apply this channel's offset and bounds to a raw signal.
    pub fn limit(&self, raw_signal: i32) -> (i16, bool) {
        clamp_signal(raw_signal, self.offset, self.signal_min, self.signal_max)
    }
}

impl ChannelConfig {
    /// Build the configuration from per-channel arrays.
    ///
    /// Every array must have `num_channels` elements. `mapping[i]` is the
    /// index of the force demand sent to physical channel `i`.
    pub fn new(
        num_channels: usize,
        mapping: &[usize],
        direction: &[i8],
        offset: &[i16],
        signal_min: &[i16],
        signal_max: &[i16],
    ) -> Result<Self, ConfigError> {
        if num_channels == 0 {
            return Err(ConfigError::NoChannels);
        }

        check_len("mapping", num_channels, mapping.len())?;
        check_len("direction", num_channels, direction.len())?;
        check_len("pwm_offset", num_channels, offset.len())?;
        check_len("pwm_min", num_channels, signal_min.len())?;
        check_len("pwm_max", num_channels, signal_max.len())?;

        // Each demand index must be used exactly once
        let mut used = vec![false; num_channels];
        for &m in mapping {
            match used.get_mut(m) {
                Some(u) if !*u => *u = true,
                _ => return Err(ConfigError::MappingNotBijective(mapping.to_vec())),
            }
        }

        let mut channels = Vec::with_capacity(num_channels);

        for i in 0..num_channels {
            let direction = Direction::try_from(direction[i])
                .map_err(|value| ConfigError::InvalidDirection { channel: i, value })?;

            if signal_min[i] > signal_max[i] {
                return Err(ConfigError::MinAboveMax {
                    channel: i,
                    min: signal_min[i],
                    max: signal_max[i],
                });
            }

            channels.push(Channel {
                source: mapping[i],
                direction,
                offset: offset[i],
                signal_min: signal_min[i],
                signal_max: signal_max[i],
            });
        }

        Ok(Self { channels })
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Always false, a valid configuration has at least one channel.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The channels in physical order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Reorder and sign flip force demands into physical channel order.
    ///
    /// `forces` must have one element per channel.
    pub fn reorder(&self, forces: &[f64]) -> Vec<f64> {
        self.channels
            .iter()
            .map(|c| forces[c.source] * c.direction.sign())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Add `offset` to a raw signal and limit it to `[min, max]`.
///
/// Returns the limited signal and whether limiting changed it. Out of range
/// demands are expected during aggressive manouvres, so this never fails.
pub fn clamp_signal(raw_signal: i32, offset: i16, min: i16, max: i16) -> (i16, bool) {
    let signal = raw_signal.saturating_add(i32::from(offset));
    let limited = clamp(signal, i32::from(min), i32::from(max));

    // Within [min, max] so always fits
    (limited as i16, limited != signal)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_len(field: &'static str, expected: usize, found: usize) -> Result<(), ConfigError> {
    if expected == found {
        Ok(())
    }
    else {
        Err(ConfigError::LengthMismatch { field, expected, found })
    }
}
