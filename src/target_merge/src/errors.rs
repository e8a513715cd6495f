//! Error types surfaced by the merge pipeline.
//!
//! Every variant except [`Error::Persist`] is scoped to a single input file:
//! the batch driver logs it, counts the file as skipped and moves on.
//! [`Error::Persist`] means the batch's work could not be written and must be
//! escalated to the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Required canonical fields were not resolved after standardization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "missing required field(s) [{}]; resolved columns were [{}]",
    .missing_fields.join(", "),
    .resolved_columns.join(", ")
)]
pub struct SchemaValidationError {
    /// Required fields absent after header resolution, in schema order.
    pub missing_fields: Vec<String>,
    /// Every column name the input resolved to, in input order.
    pub resolved_columns: Vec<String>,
}

/// The unified error type for the `target_merge` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The file extension is not one of the supported tabular formats.
    #[error("unsupported file format '{extension}' for {}", .path.display())]
    UnsupportedFormat {
        /// Offending file.
        path: PathBuf,
        /// Lowercased extension, empty when the file has none.
        extension: String,
    },

    /// The reader could not parse the file.
    #[error("failed to read {}: {cause}", .path.display())]
    Read {
        /// File being read.
        path: PathBuf,
        /// Parser-level description of the failure.
        cause: String,
    },

    /// Required fields were not resolved.
    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),

    /// A table handed to the merger is malformed (e.g. ragged rows).
    #[error("malformed table: {0}")]
    Table(String),

    /// The canonical schema or override set is invalid.
    #[error("invalid schema: {0}")]
    Schema(String),

    /// Writing the master table failed.
    #[error("failed to persist master table to {}", .path.display())]
    Persist {
        /// Destination of the master table.
        path: PathBuf,
        /// Underlying writer error.
        #[source]
        source: csv::Error,
    },
}

impl Error {
    /// True when the error invalidates the whole batch rather than one file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Persist { .. })
    }

    pub(crate) fn read(path: impl Into<PathBuf>, cause: impl ToString) -> Self {
        Error::Read {
            path: path.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
