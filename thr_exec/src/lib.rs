//! # Thruster interface library.
//!
//! This library allows other crates in the workspace (and the integration
//! tests) to access items defined inside the thruster interface crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Thruster driver - converts force demands into PWM signals and sends them to the ESC board
pub mod thr_driver;

/// Acoustics data recording - appends acoustics telemetry rows to a CSV file
pub mod acoustics_log;

/// Cycle archive - records the forces and signals commanded on each cycle
pub mod cycle_archive;
