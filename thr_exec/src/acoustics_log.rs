//! # Acoustics data recording
//!
//! Appends one row of acoustics telemetry per cycle to a CSV file. The
//! values are opaque to this module, they are written as they are received.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{Local, NaiveTime};
use log::info;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use util::archive::{ArchiveError, Archiver};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of hydrophones in the array.
pub const NUM_HYDROPHONES: usize = 5;

/// Header row of the acoustics data file.
pub const HEADER: [&str; 11] = [
    "Time",
    "Hydrophone1",
    "Hydrophone2",
    "Hydrophone3",
    "Hydrophone4",
    "Hydrophone5",
    "FilterResponse",
    "FFT",
    "Peaks",
    "TDOA",
    "Position",
];

/// Format of the timestamp in the file name.
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Format of the time column.
const ROW_TIME_FORMAT: &str = "%H:%M:%S%.3f";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One cycle of acoustics telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct AcousticsRecord {
    /// Samples from each hydrophone.
    pub hydrophones: [Vec<i64>; NUM_HYDROPHONES],

    /// Output of the bandpass filter.
    pub filter_response: Vec<i64>,

    /// Spectrum of the filtered signal.
    pub fft: Vec<i64>,

    /// Detected peaks.
    pub peaks: Vec<i64>,

    /// Time differences of arrival between hydrophones.
    pub tdoa: Vec<f64>,

    /// Estimated position of the acoustic source.
    pub position: Vec<f64>,
}

/// CSV file of acoustics records.
pub struct AcousticsLog {
    arch: Archiver,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AcousticsLogError {
    #[error("Could not create the acoustics data directory {0:?}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Could not write acoustics data: {0}")]
    Archive(#[from] ArchiveError),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which accepts acoustics records.
///
/// Implementations must not block for long, they are called from the
/// control loop.
pub trait TelemetrySink {
    type Error;

    /// Record one cycle of telemetry.
    fn log(&mut self, record: &AcousticsRecord) -> Result<(), Self::Error>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for AcousticsRecord {
    fn default() -> Self {
        Self {
            hydrophones: [vec![0], vec![0], vec![0], vec![0], vec![0]],
            filter_response: vec![0],
            fft: vec![0],
            peaks: vec![0],
            tdoa: vec![0.0],
            position: vec![0.0],
        }
    }
}

impl AcousticsRecord {
    /// Format the record as a CSV row with the given time.
    pub fn to_row(&self, time: NaiveTime) -> Vec<String> {
        let mut row = Vec::with_capacity(HEADER.len());

        row.push(time.format(ROW_TIME_FORMAT).to_string());
        row.extend(self.hydrophones.iter().map(|h| list(h)));
        row.push(list(&self.filter_response));
        row.push(list(&self.fft));
        row.push(list(&self.peaks));
        row.push(list(&self.tdoa));
        row.push(list(&self.position));

        row
    }
}

impl AcousticsLog {
    /// Create a new acoustics data file in `dir`.
    ///
    /// The file is named `acoustics_data_<timestamp>.csv` and starts with the
    /// header row.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, AcousticsLogError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| AcousticsLogError::CreateDir(dir.to_path_buf(), e))?;

        let file_name = format!(
            "acoustics_data_{}.csv",
            Local::now().format(FILE_TIMESTAMP_FORMAT)
        );

        let arch = Archiver::create(dir.join(file_name), &HEADER)?;

        info!("Logging acoustics data to {:?}", arch.path());

        Ok(Self { arch })
    }

    /// Path of the data file.
    pub fn path(&self) -> &Path {
        self.arch.path()
    }

    /// Append a record with an explicit time.
    pub fn log_at(&mut self, time: NaiveTime, record: &AcousticsRecord) -> Result<(), AcousticsLogError> {
        self.arch.write_row(record.to_row(time))?;
        Ok(())
    }
}

impl TelemetrySink for AcousticsLog {
    type Error = AcousticsLogError;

    /// Append a record stamped with the current local time.
    fn log(&mut self, record: &AcousticsRecord) -> Result<(), Self::Error> {
        self.log_at(Local::now().time(), record)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Format a list as `[a, b, c]`.
fn list<T: Debug>(values: &[T]) -> String {
    format!("{:?}", values)
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("thr_acoustics_log_test").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_to_row() {
        let record = AcousticsRecord {
            peaks: vec![3, 40, 500],
            tdoa: vec![0.25, -1.0],
            ..Default::default()
        };

        let row = record.to_row(NaiveTime::from_hms_milli(13, 5, 9, 42));

        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[0], "13:05:09.042");
        assert_eq!(row[1], "[0]");
        assert_eq!(row[8], "[3, 40, 500]");
        assert_eq!(row[9], "[0.25, -1.0]");
        assert_eq!(row[10], "[0.0]");
    }

    #[test]
    fn test_new_log_has_only_header() {
        let dir = test_dir("header_only");
        let log = AcousticsLog::new(&dir).unwrap();

        // No rows until a record is logged
        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents, format!("{}\n", HEADER.join(",")));
    }

    #[test]
    fn test_append_rows() {
        let dir = test_dir("append");
        let mut log = AcousticsLog::new(&dir).unwrap();

        let name = log.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("acoustics_data_"));
        assert!(name.ends_with(".csv"));

        let time = NaiveTime::from_hms_milli(1, 2, 3, 4);
        log.log_at(time, &AcousticsRecord::default()).unwrap();
        log.log_at(time, &AcousticsRecord { peaks: vec![1, 2], ..Default::default() }).unwrap();
        log.log(&AcousticsRecord::default()).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], HEADER.join(","));
        assert_eq!(
            lines[1],
            "01:02:03.004,[0],[0],[0],[0],[0],[0],[0],[0],[0.0],[0.0]"
        );
        assert_eq!(
            lines[2],
            "01:02:03.004,[0],[0],[0],[0],[0],[0],[0],\"[1, 2]\",[0.0],[0.0]"
        );
    }
}
