//! Canonical rows and the accumulating master table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};

use crate::schema::{CanonicalSchema, NAME, PROVENANCE_FIELDS, SOURCE_FILE};
use crate::table::Cell;

/// One target row keyed by canonical column name.
///
/// Data columns are the schema fields plus any pass-through columns the
/// source carried. Provenance is kept apart so it can never be supplied by an
/// input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: IndexMap<String, Cell>,
    /// Label of the file this row was merged from.
    pub source_file: Option<String>,
    /// Timestamp of the merge call that added this row.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record {
    pub(crate) fn new(values: IndexMap<String, Cell>) -> Self {
        Self {
            values,
            source_file: None,
            updated_at: None,
        }
    }

    /// Target identity; `None` when the `name` cell was empty.
    pub fn name(&self) -> Option<&str> {
        self.get(NAME)
    }

    /// Text value of `column`, including `source_file`.
    ///
    /// Returns `None` both for missing cells and unknown columns. `updated_at`
    /// is only available typed, through the field.
    pub fn get(&self, column: &str) -> Option<&str> {
        match column {
            SOURCE_FILE => self.source_file.as_deref(),
            _ => self.values.get(column).and_then(|c| c.as_deref()),
        }
    }

    /// Data columns in the order the row was built with.
    pub fn values(&self) -> &IndexMap<String, Cell> {
        &self.values
    }

    pub(crate) fn stamp(&mut self, source: &str, at: DateTime<Utc>) {
        self.source_file = Some(source.to_string());
        self.updated_at = Some(at);
    }
}

/// The cumulative set of target rows plus its column layout.
///
/// Column order is the schema's declaration order followed by pass-through
/// columns in first-seen order; provenance columns always come last when the
/// table is written. Duplicate names are tolerated until
/// [`MasterTable::deduplicate`] runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterTable {
    columns: IndexSet<String>,
    records: Vec<Record>,
}

impl MasterTable {
    /// Empty table laid out for `schema`.
    pub fn new(schema: &CanonicalSchema) -> Self {
        Self {
            columns: schema.field_names().map(str::to_string).collect(),
            records: Vec::new(),
        }
    }

    /// Data columns (without provenance).
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Full persisted header: data columns then provenance columns.
    pub fn header(&self) -> Vec<&str> {
        self.columns().chain(PROVENANCE_FIELDS.iter().copied()).collect()
    }

    /// Rows in merge order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register `columns` (keeping existing order) and append `records`.
    pub(crate) fn append<'a>(
        &mut self,
        columns: impl IntoIterator<Item = &'a str>,
        records: impl IntoIterator<Item = Record>,
    ) {
        for c in columns {
            if !self.columns.contains(c) {
                self.columns.insert(c.to_string());
            }
        }
        self.records.extend(records);
    }

    /// Keep only the first row seen for each distinct `name`.
    ///
    /// Stable: surviving rows keep their relative order. Rows with an empty
    /// name are treated as one identity. Returns the number of rows removed.
    pub fn deduplicate(&mut self) -> usize {
        let before = self.records.len();
        let mut seen: HashSet<Option<String>> = HashSet::with_capacity(before);
        self.records
            .retain(|r| seen.insert(r.name().map(str::to_string)));
        before - self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: Option<&str>, ra: &str) -> Record {
        let mut values = IndexMap::new();
        values.insert("name".to_string(), name.map(str::to_string));
        values.insert("ra".to_string(), Some(ra.to_string()));
        values.insert("dec".to_string(), Some("0".to_string()));
        Record::new(values)
    }

    #[test]
    fn deduplicate_keeps_first_seen_in_order() {
        let mut t = MasterTable::new(&CanonicalSchema::default());
        t.append(
            ["name", "ra", "dec"],
            vec![
                rec(Some("T2"), "1"),
                rec(Some("T1"), "2"),
                rec(Some("T2"), "3"),
                rec(None, "4"),
                rec(Some("T1"), "5"),
                rec(None, "6"),
            ],
        );

        assert_eq!(t.deduplicate(), 3);
        let ras: Vec<_> = t.records().iter().map(|r| r.get("ra").unwrap()).collect();
        assert_eq!(ras, ["1", "2", "4"]);
        assert_eq!(t.deduplicate(), 0);
    }

    #[test]
    fn pass_through_columns_follow_schema_columns() {
        let mut t = MasterTable::new(&CanonicalSchema::default());
        t.append(["epoch", "name", "ra", "dec", "notes"], Vec::new());
        assert_eq!(
            t.header(),
            [
                "name", "ra", "dec", "magnitude", "v_mag", "b_mag", "r_mag", "g_mag", "i_mag",
                "epoch", "notes", "source_file", "updated_at"
            ]
        );
    }

    #[test]
    fn provenance_is_readable_through_get() {
        let mut r = rec(Some("T1"), "1");
        assert_eq!(r.get("source_file"), None);
        r.stamp("a.csv", Utc::now());
        assert_eq!(r.get("source_file"), Some("a.csv"));
        assert!(r.updated_at.is_some());
    }
}
