//! CSV archiving functionality
//!
//! To add archiving functionality to a struct give it an `Archiver` and
//! implement the `Archived` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::{Path, PathBuf};
use std::fs::{File, OpenOptions};
pub use csv::Writer;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
///
/// Archives are append only, every record is flushed as soon as it's written
/// so a crash never loses a completed row.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>,
    path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file {0:?}: {1}")]
    CreateError(PathBuf, std::io::Error),

    #[error("Cannot write to the archive: {0}")]
    WriteError(#[from] csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(#[from] std::io::Error),

    #[error("The archiver has not been initialised")]
    NotInitialised,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a csv.
///
/// To implement this trait, the struct shall have an `Archiver` member set up
/// in the struct's `new` function. `write` archives whatever the struct has
/// recorded since the last call.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root, starting the file with the `header` row.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session,
        path: P,
        header: &[&str]
    ) -> Result<Self, ArchiveError> {
        Self::create(session.arch_root.join(path), header)
    }

    /// Create a new archiver at an absolute path, creating any missing parent
    /// directories. An existing file at this path is truncated.
    pub fn create<P: AsRef<Path>>(
        path: P,
        header: &[&str]
    ) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ArchiveError::CreateError(path.clone(), e))?;
        }

        // Create the file, then reopen it in append mode
        File::create(&path)
            .map_err(|e| ArchiveError::CreateError(path.clone(), e))?;
        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| ArchiveError::CreateError(path.clone(), e))?;

        let mut w = Writer::from_writer(file);
        w.write_record(header)?;
        w.flush()?;

        Ok(Self {
            writer: Some(w),
            path
        })
    }

    /// Get the path of the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a row of pre-formatted fields into the archive.
    pub fn write_row<I, T>(&mut self, row: I) -> Result<(), ArchiveError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>
    {
        let w = self.writer.as_mut().ok_or(ArchiveError::NotInitialised)?;
        w.write_record(row)?;
        w.flush()?;

        Ok(())
    }
}
