//! CSV archiving functionality
//!
//! Archives are flat CSV files in the session's `arch` directory. Each row
//! starts with the control time of the cycle it was written in, followed by
//! the values of one record. Vector-valued quantities are spread over one
//! column per element, named `{name}[{index}]`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::{Writer, WriterBuilder};
use std::fs::{self, File};
use std::path::Path;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    writer: Writer<File>,
    num_columns: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not create the archive file: {0}")]
    CreateError(std::io::Error),

    #[error("Could not write to the archive: {0}")]
    WriteError(csv::Error),

    #[error("Could not flush the archive: {0}")]
    FlushError(std::io::Error),

    #[error("Expected {expected} values in the archive record, found {found}")]
    ColumnMismatch { expected: usize, found: usize },
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a timestamped csv row.
pub trait Archived {
    /// Names of the columns produced by `values`, not including the time
    /// column.
    fn columns(&self) -> Vec<String>;

    /// Values of the record, one per column.
    fn values(&self) -> Vec<f64>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root, writing the header row immediately.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session,
        path: P,
        columns: &[String],
    ) -> Result<Self, ArchiveError> {
        let full_path = session.arch_root.join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(ArchiveError::CreateError)?;
        }

        let file = File::create(full_path).map_err(ArchiveError::CreateError)?;

        Self::from_writer(file, columns)
    }

    fn from_writer(file: File, columns: &[String]) -> Result<Self, ArchiveError> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        let mut header = Vec::with_capacity(columns.len() + 1);
        header.push("time_s");
        header.extend(columns.iter().map(String::as_str));
        writer
            .write_record(&header)
            .map_err(ArchiveError::WriteError)?;

        Ok(Self {
            writer,
            num_columns: columns.len(),
        })
    }

    /// Write a record into the archive.
    pub fn write<A: Archived>(&mut self, time_s: f64, record: &A) -> Result<(), ArchiveError> {
        let values = record.values();

        if values.len() != self.num_columns {
            return Err(ArchiveError::ColumnMismatch {
                expected: self.num_columns,
                found: values.len(),
            });
        }

        let mut row = Vec::with_capacity(values.len() + 1);
        row.push(format!("{:.6}", time_s));
        row.extend(values.iter().map(|v| format!("{:.10}", v)));

        self.writer
            .write_record(&row)
            .map_err(ArchiveError::WriteError)?;
        self.writer.flush().map_err(ArchiveError::FlushError)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the column names for a vector quantity, `name[0]`, `name[1]`, ...
pub fn vector_columns(name: &str, len: usize) -> Vec<String> {
    (0..len).map(|i| format!("{}[{}]", name, i)).collect()
}
