//! # Force script interpreter module
//!
//! This module provides an interpreter for force scripts, allowing thruster
//! force demands to be replayed at fixed times without an upstream motion
//! controller. Each line of a script has the form
//!
//! ```text
//! <time_s>: [f0, f1, ..., fN-1];
//! ```
//!
//! where the payload is a JSON array of per-channel forces in newtons.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A force demand which is scripted to occur at a specific time.
#[derive(Debug, Clone, PartialEq)]
struct Demand {
    /// The time the demand is supposed to be applied at
    exec_time_s: f64,

    /// Per-channel forces
    forces: Vec<f64>
}

/// A force script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending` to acquire the demand that needs applying.
pub struct ForceScript {
    script_path: PathBuf,
    demands: VecDeque<Demand>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("Could not build the script pattern: {0}")]
    Pattern(regex::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains invalid forces at {0} s: {1}")]
    InvalidForces(f64, serde_json::Error),

    #[error("Demand at {time_s} s has {found} forces, expected {expected}")]
    InconsistentLength {
        time_s: f64,
        expected: usize,
        found: usize
    },

    #[error("Demand at {0} s is earlier than the demand before it")]
    OutOfOrder(f64)
}

/// Result of polling the script for demands.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingForces {
    /// No new demand is due
    None,

    /// The most recent demand that has become due
    Some(Vec<f64>),

    /// Every demand in the script has been issued
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ForceScript {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut interp = Self::parse(&script)?;
        interp.script_path = path;
        Ok(interp)
    }

    /// Create a new interpreter from the text of a script.
    pub fn parse(script: &str) -> Result<Self, ScriptError> {
        // Matches `<time>: <payload>;` at the start of a line
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::Pattern)?;

        let mut demands: VecDeque<Demand> = VecDeque::new();

        for cap in re.captures_iter(script) {
            let exec_time_s: f64 = cap[1]
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            let forces: Vec<f64> = serde_json::from_str(&cap[3])
                .map_err(|e| ScriptError::InvalidForces(exec_time_s, e))?;

            if let Some(prev) = demands.back() {
                if prev.forces.len() != forces.len() {
                    return Err(ScriptError::InconsistentLength {
                        time_s: exec_time_s,
                        expected: prev.forces.len(),
                        found: forces.len()
                    });
                }
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(exec_time_s));
                }
            }

            demands.push_back(Demand { exec_time_s, forces });
        }

        if demands.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ForceScript {
            script_path: PathBuf::new(),
            demands
        })
    }

    /// Return the latest demand that has become due at `elapsed_s`.
    ///
    /// If several demands became due since the last poll only the most recent
    /// one is returned, older ones are superseded.
    pub fn get_pending(&mut self, elapsed_s: f64) -> PendingForces {
        let mut latest = None;

        while self
            .demands
            .front()
            .map_or(false, |d| d.exec_time_s <= elapsed_s)
        {
            latest = self.demands.pop_front().map(|d| d.forces);
        }

        match latest {
            Some(f) => PendingForces::Some(f),
            None if self.demands.is_empty() => PendingForces::EndOfScript,
            None => PendingForces::None
        }
    }

    /// Get the path the script was loaded from (empty if loaded from a string)
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Get the number of demands remaining in the script
    pub fn num_demands(&self) -> usize {
        self.demands.len()
    }

    /// Get the number of channels each demand commands
    pub fn num_channels(&self) -> usize {
        self.demands.front().map_or(0, |d| d.forces.len())
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        self.demands.back().map_or(0.0, |d| d.exec_time_s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = "
        0.0: [0.0, 0.0];
        0.5: [10.0, -10.0];
        // Comment lines are ignored
        1.0: [2.5, 2.5];
        2.0: [0.0, 0.0];
    ";

    #[test]
    fn test_parse() {
        let script = ForceScript::parse(SCRIPT).unwrap();
        assert_eq!(script.num_demands(), 4);
        assert_eq!(script.num_channels(), 2);
        assert_eq!(script.get_duration(), 2.0);
    }

    #[test]
    fn test_pending() {
        let mut script = ForceScript::parse(SCRIPT).unwrap();

        assert_eq!(script.get_pending(0.1), PendingForces::Some(vec![0.0, 0.0]));
        assert_eq!(script.get_pending(0.2), PendingForces::None);

        // Two demands became due, only the latest is returned
        assert_eq!(script.get_pending(1.2), PendingForces::Some(vec![2.5, 2.5]));

        assert_eq!(script.get_pending(5.0), PendingForces::Some(vec![0.0, 0.0]));
        assert_eq!(script.get_pending(5.1), PendingForces::EndOfScript);
    }

    #[test]
    fn test_script_path() {
        assert_eq!(ForceScript::parse(SCRIPT).unwrap().script_path(), Path::new(""));

        let path = std::env::temp_dir().join("thr_force_script_test.txt");
        std::fs::write(&path, SCRIPT).unwrap();

        let script = ForceScript::new(&path).unwrap();
        assert_eq!(script.script_path(), path.as_path());
        assert_eq!(script.num_demands(), 4);
    }

    #[test]
    fn test_errors() {
        match ForceScript::parse("nothing here") {
            Err(ScriptError::ScriptEmpty) => (),
            r => panic!("Expected ScriptEmpty, got {:?}", r.map(|_| ()))
        }

        match ForceScript::parse("0.0: [1.0, oops];") {
            Err(ScriptError::InvalidForces(t, _)) => assert_eq!(t, 0.0),
            r => panic!("Expected InvalidForces, got {:?}", r.map(|_| ()))
        }

        match ForceScript::parse("0.0: [1.0, 2.0];\n1.0: [1.0];") {
            Err(ScriptError::InconsistentLength { expected: 2, found: 1, .. }) => (),
            r => panic!("Expected InconsistentLength, got {:?}", r.map(|_| ()))
        }

        match ForceScript::parse("1.0: [1.0];\n0.5: [1.0];") {
            Err(ScriptError::OutOfOrder(t)) => assert_eq!(t, 0.5),
            r => panic!("Expected OutOfOrder, got {:?}", r.map(|_| ()))
        }

        match ForceScript::new("/no/such/force_script.txt") {
            Err(ScriptError::ScriptNotFound(_)) => (),
            r => panic!("Expected ScriptNotFound, got {:?}", r.map(|_| ()))
        }
    }
}
