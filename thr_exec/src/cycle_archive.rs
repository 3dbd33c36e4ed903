//! # Cycle archive
//!
//! Records the force demands, signals and status of every drive cycle to a
//! CSV file in the session's archive directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::path::Path;

// Internal
use crate::thr_driver::{StatusReport, ThrusterDriver, DriveError, SignalVector};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Archive of drive cycles.
///
/// Columns are `time_s`, then `force_i`, `signal_i` and `limited_i` for each
/// channel, then `frame_sent` and `failure`. Signals are left empty on cycles
/// which rejected their input, `failure` is empty on successful cycles.
pub struct CycleArchive {
    arch: Archiver,
    num_channels: usize,
    cycle: Option<CycleRecord>,
}

/// One drive cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    pub time_s: f64,
    pub forces: Vec<f64>,
    pub signals: Option<SignalVector>,
    pub report: StatusReport,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CycleRecord {
    /// Build the record of a cycle from the result of
    /// [`ThrusterDriver::drive`].
    pub fn from_drive<I2C>(
        time_s: f64,
        forces: &[f64],
        result: &Result<SignalVector, DriveError>,
        driver: &ThrusterDriver<I2C>,
    ) -> Self {
        let signals = match result {
            Ok(s) => Some(s.clone()),
            Err(e) => e.signals().cloned(),
        };

        Self {
            time_s,
            forces: forces.to_vec(),
            signals,
            report: driver.last_report().clone(),
        }
    }

    /// Format the record as a CSV row for `num_channels` channels.
    fn to_row(&self, num_channels: usize) -> Vec<String> {
        let mut row = Vec::with_capacity(3 + 3 * num_channels);

        row.push(format!("{}", self.time_s));

        for i in 0..num_channels {
            row.push(self.forces.get(i).map(|f| format!("{}", f)).unwrap_or_default());
        }

        for i in 0..num_channels {
            row.push(
                self.signals
                    .as_ref()
                    .and_then(|s| s.get(i))
                    .map(|s| format!("{}", s))
                    .unwrap_or_default()
            );
        }

        for i in 0..num_channels {
            row.push(
                self.report
                    .signal_limited
                    .get(i)
                    .map(|l| format!("{}", l))
                    .unwrap_or_default()
            );
        }

        row.push(format!("{}", self.report.frame_sent));
        row.push(
            self.report
                .failure
                .map(|f| format!("{:?}", f))
                .unwrap_or_default()
        );

        row
    }
}

impl CycleArchive {
    /// Create a new cycle archive at `path` relative to the session's archive
    /// root.
    pub fn new<P: AsRef<Path>>(
        session: &Session,
        path: P,
        num_channels: usize
    ) -> Result<Self, ArchiveError> {
        Self::with_archiver(num_channels, |header| Archiver::from_path(session, path, header))
    }

    /// Create a new cycle archive at an absolute path.
    pub fn create<P: AsRef<Path>>(path: P, num_channels: usize) -> Result<Self, ArchiveError> {
        Self::with_archiver(num_channels, |header| Archiver::create(path, header))
    }

    fn with_archiver<F>(num_channels: usize, open: F) -> Result<Self, ArchiveError>
    where
        F: FnOnce(&[&str]) -> Result<Archiver, ArchiveError>
    {
        let header = header(num_channels);
        let header_refs: Vec<&str> = header.iter().map(|h| h.as_str()).collect();

        Ok(Self {
            arch: open(&header_refs)?,
            num_channels,
            cycle: None,
        })
    }

    /// Path of the archive file.
    pub fn path(&self) -> &Path {
        self.arch.path()
    }

    /// Archive one cycle.
    pub fn record(&mut self, cycle: CycleRecord) -> Result<(), ArchiveError> {
        self.cycle = Some(cycle);
        self.write()
    }
}

impl Archived for CycleArchive {
    fn write(&mut self) -> Result<(), ArchiveError> {
        match self.cycle.take() {
            Some(c) => self.arch.write_row(c.to_row(self.num_channels)),
            None => Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn header(num_channels: usize) -> Vec<String> {
    let mut header = vec![String::from("time_s")];

    for prefix in ["force", "signal", "limited"].iter() {
        header.extend((0..num_channels).map(|i| format!("{}_{}", prefix, i)));
    }

    header.push(String::from("frame_sent"));
    header.push(String::from("failure"));

    header
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::thr_driver::CycleFailure;

    #[test]
    fn test_header() {
        assert_eq!(
            header(2),
            vec![
                "time_s", "force_0", "force_1", "signal_0", "signal_1",
                "limited_0", "limited_1", "frame_sent", "failure"
            ]
        );
    }

    #[test]
    fn test_record() {
        let path = std::env::temp_dir()
            .join("thr_cycle_archive_test")
            .join("cycles.csv");

        let mut arch = CycleArchive::create(&path, 2).unwrap();

        // Nothing pending, nothing written
        arch.write().unwrap();

        arch.record(CycleRecord {
            time_s: 0.5,
            forces: vec![2.0, -2.0],
            signals: Some(vec![1520, 1479]),
            report: StatusReport {
                signal_limited: vec![false, true],
                frame_sent: true,
                failure: None
            }
        }).unwrap();

        // A rejected cycle has no signals
        arch.record(CycleRecord {
            time_s: 0.55,
            forces: vec![1.0],
            signals: None,
            report: StatusReport {
                failure: Some(CycleFailure::InvalidInput),
                ..Default::default()
            }
        }).unwrap();

        // Computed but not sent
        arch.record(CycleRecord {
            time_s: 0.6,
            forces: vec![0.0, 0.0],
            signals: Some(vec![1500, 1500]),
            report: StatusReport {
                signal_limited: vec![false, false],
                frame_sent: false,
                failure: Some(CycleFailure::BusUnavailable)
            }
        }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "time_s,force_0,force_1,signal_0,signal_1,limited_0,limited_1,frame_sent,failure\n\
             0.5,2,-2,1520,1479,false,true,true,\n\
             0.55,1,,,,,,false,InvalidInput\n\
             0.6,0,0,1500,1500,false,false,false,BusUnavailable\n"
        );
    }
}
