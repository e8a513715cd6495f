//! File readers: turn a supported file into a [`RawTable`].
//!
//! Dispatch is on the lowercased file extension:
//!
//! | extension       | format                                   |
//! |-----------------|------------------------------------------|
//! | `.csv`          | comma-separated, header row              |
//! | `.txt`, `.dat`  | whitespace-delimited, `#` comment lines  |
//! | `.fits`, `.fit` | first binary table HDU (`fits` feature)  |
//!
//! Readers only parse. Header interpretation belongs to the merger.

mod delimited;
#[cfg(feature = "fits")]
mod fits;

use std::path::Path;

use tracing::debug;

use crate::errors::{Error, Result};
use crate::table::RawTable;

pub use delimited::{parse_whitespace, read_csv, read_whitespace};

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// Columns separated by runs of whitespace, first line is the header.
    Whitespace,
    /// FITS binary table.
    Fits,
}

impl FileFormat {
    /// Detect the format from the extension of `path`.
    ///
    /// FITS is only reported when the crate is built with the `fits` feature.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "txt" | "dat" => Ok(FileFormat::Whitespace),
            "fits" | "fit" if cfg!(feature = "fits") => Ok(FileFormat::Fits),
            _ => Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    /// True if `path` has an extension this build can read.
    pub fn is_supported(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }
}

/// Read any supported file into a [`RawTable`].
pub fn read_table(path: &Path) -> Result<RawTable> {
    let format = FileFormat::from_path(path)?;
    let table = match format {
        FileFormat::Csv => read_csv(path)?,
        FileFormat::Whitespace => read_whitespace(path)?,
        FileFormat::Fits => read_fits(path)?,
    };
    debug!(path = %path.display(), ?format, rows = table.len(), "read table");
    Ok(table)
}

#[cfg(feature = "fits")]
fn read_fits(path: &Path) -> Result<RawTable> {
    fits::read_fits(path)
}

#[cfg(not(feature = "fits"))]
fn read_fits(path: &Path) -> Result<RawTable> {
    Err(Error::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: "fits".into(),
    })
}
