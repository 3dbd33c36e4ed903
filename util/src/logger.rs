//! Generic logger utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use fern::{Dispatch, FormatCallback};
use log::{self, info, Record};
use std::fmt::Arguments;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a file log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// Every record at `file_level` or above goes to the session's log file,
/// stdout only gets records at `stdout_level` or above so per-cycle traces
/// don't flood the terminal. Each record is prefixed with the number of
/// seconds since the session started.
///
/// # Notes
///
/// - `file_level` must be `INFO` or more verbose, warnings about the bus
///   going offline are not enough to reconstruct a run from the log.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    file_level: LevelFilter,
    stdout_level: LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if file_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(file_level))
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let stdout = Dispatch::new()
        .format(|out, message, record| format_record(out, message, record, true))
        .level(stdout_level)
        .chain(std::io::stdout());

    let file = Dispatch::new()
        .format(|out, message, record| format_record(out, message, record, false))
        .chain(log_file);

    Dispatch::new()
        .level(std::cmp::max(file_level, stdout_level))
        .level_for("rppal", LevelFilter::Info)
        .chain(stdout)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log levels: file {:?}, stdout {:?}", file_level, stdout_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Format one record, only debug and trace records carry their target.
fn format_record(out: FormatCallback, message: &Arguments, record: &Record, colour: bool) {
    let tag = level_tag(record.level());
    let tag: ColoredString = if colour {
        colour_tag(record.level(), tag)
    }
    else {
        tag.clear()
    };

    if record.level() > log::Level::Info {
        out.finish(format_args!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            tag,
            record.target(),
            message
        ))
    }
    else {
        out.finish(format_args!(
            "[{:10.6} {}] {}",
            session::get_elapsed_seconds(),
            tag,
            message
        ))
    }
}

/// Get the short tag for a log level
fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Trace => "TRC",
        log::Level::Debug => "DBG",
        log::Level::Info  => "INF",
        log::Level::Warn  => "WRN",
        log::Level::Error => "ERR"
    }
}

/// Colour a level tag for the terminal
fn colour_tag(level: log::Level, tag: &str) -> ColoredString {
    match level {
        log::Level::Trace => tag.dimmed().italic(),
        log::Level::Debug => tag.dimmed(),
        log::Level::Info  => tag.normal(),
        log::Level::Warn  => tag.yellow(),
        log::Level::Error => tag.red().bold()
    }
}
