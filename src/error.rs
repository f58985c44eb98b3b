//! Failures that can occur while loading and filtering tables

use std::{io, path::PathBuf};
use thiserror::Error;

/// Failure to load a table from a data file
#[derive(Debug, Error)]
pub enum LoadError {
    /// The data file could not be opened
    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Records could not be read from the data file
    #[error("failed to read records from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv_async::Error,
    },

    /// A record did not have the expected format
    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// An exported popularity table had an unexpected layout
    #[error("unexpected table layout in {}", path.display())]
    Shape {
        path: PathBuf,
        #[source]
        source: ShapeError,
    },
}

/// A table is neither a tags table nor a movies table
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("pass either a tags table or a movies table (got {columns} data columns)")]
pub struct ShapeError {
    /// Number of data columns that was observed
    pub columns: usize,
}
