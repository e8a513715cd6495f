//! Generic tabular structure produced by the readers.
//!
//! A [`RawTable`] is a header row plus rows of optional text cells. `None` is
//! the missing-value marker; readers map empty cells to it. The table is
//! rectangular: every row has exactly one cell per header.

use crate::errors::{Error, Result};

/// One cell; `None` marks a missing value.
pub type Cell = Option<String>;

/// Header labels plus rectangular rows of cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// An empty table with the given headers.
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table and check every row against the header width.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Assemble a table whose rows are already known to match `headers`.
    pub(crate) fn from_parts(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == headers.len()));
        Self { headers, rows }
    }

    /// Append a row. Fails if the row width differs from the header width.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(Error::Table(format!(
                "row {} has {} cells, expected {}",
                self.rows.len() + 1,
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Header labels, unmodified.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no data rows (headers may still be present).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Turn a raw cell into a [`Cell`]: trimmed, with empty text as missing.
pub fn cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_rows() {
        let err = RawTable::from_rows(
            vec!["name".into(), "ra".into()],
            vec![vec![cell("T1"), cell("1.0")], vec![cell("T2")]],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "malformed table: row 2 has 1 cells, expected 2");
    }

    #[test]
    fn blank_cells_are_missing() {
        assert_eq!(cell("  "), None);
        assert_eq!(cell(" 12.5 "), Some("12.5".to_string()));
    }

    #[test]
    fn header_only_table_is_empty() {
        let t = RawTable::new(vec!["name".into()]);
        assert!(t.is_empty());
        assert_eq!(t.headers(), ["name"]);
    }
}
