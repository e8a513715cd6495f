use std::{fs, path::Path};

use crate::errors::{Error, Result};
use crate::table::{RawTable, cell};

/// Read a comma-separated file with a header row.
pub fn read_csv(path: &Path) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::read(path, e))?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| Error::read(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = RawTable::new(headers);
    for row in rdr.records() {
        let row = row.map_err(|e| Error::read(path, e))?;
        table
            .push_row(row.iter().map(cell).collect())
            .map_err(|e| Error::read(path, e))?;
    }
    Ok(table)
}

/// Read a whitespace-delimited file; see [`parse_whitespace`].
pub fn read_whitespace(path: &Path) -> Result<RawTable> {
    let text = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    parse_whitespace(&text).map_err(|e| Error::read(path, e))
}

/// Parse whitespace-delimited text.
///
/// Blank lines and lines starting with `#` are skipped. The first remaining
/// line is the header. Every data line must have as many fields as the header.
pub fn parse_whitespace(text: &str) -> Result<RawTable> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    let Some(header) = lines.next() else {
        return Ok(RawTable::default());
    };
    let mut table = RawTable::new(header.split_whitespace().map(str::to_string).collect());
    for line in lines {
        table.push_row(line.split_whitespace().map(cell).collect())?;
    }
    Ok(table)
}
