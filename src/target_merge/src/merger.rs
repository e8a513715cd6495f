//! The target merger: standardize incoming tables and accumulate them into the
//! master table.
//!
//! ## Lifecycle
//! [`TargetMerger::new`] starts in [`MergerState::Empty`];
//! [`TargetMerger::open`] loads a persisted table and starts in
//! [`MergerState::Loaded`]. Every successful non-empty merge moves to
//! [`MergerState::Merging`] (repeatable), and
//! [`TargetMerger::deduplicate_and_save`] moves to [`MergerState::Saved`].
//! Saving does not close the merger: further merges are accepted and the next
//! save deduplicates the then-current table again.
//!
//! ## Atomicity
//! A merge either appends every row of the input or nothing. Standardization
//! runs to completion on a detached batch before the master table is touched.
//!
//! ## Deduplication
//! Rows are keyed by `name`, first-seen wins. Duplicates are tolerated in
//! memory and only collapsed when saving.

use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::errors::{Result, SchemaValidationError};
use crate::lookup::HeaderLookup;
use crate::record::{MasterTable, Record};
use crate::schema::{CanonicalSchema, MAGNITUDE, PROVENANCE_FIELDS, REQUIRED_FIELDS};
use crate::store;
use crate::table::RawTable;

/// Where a [`TargetMerger`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergerState {
    /// Created without loading persisted state.
    Empty,
    /// Persisted state loaded (possibly empty because no file existed).
    Loaded,
    /// At least one merge added rows since the last load or save.
    Merging,
    /// The table was deduplicated and written.
    Saved,
}

/// Result of [`TargetMerger::deduplicate_and_save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The master table had no rows; nothing was written.
    NothingToSave,
    /// The table was deduplicated and written.
    Saved {
        /// Rows written.
        rows: usize,
        /// Rows dropped because an earlier row had the same `name`.
        duplicates_removed: usize,
    },
}

/// Rows of one input table after header standardization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardizedBatch {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl StandardizedBatch {
    /// Resolved column names in input order (synthesized `magnitude` last).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Standardized rows, without provenance.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The batch as a raw table with canonical headers.
    pub fn to_raw_table(&self) -> RawTable {
        let rows = self
            .records
            .iter()
            .map(|r| {
                self.columns
                    .iter()
                    .map(|c| r.values().get(c).cloned().flatten())
                    .collect()
            })
            .collect();
        RawTable::from_parts(self.columns.clone(), rows)
    }
}

/// Holds the master table and the header lookup used to standardize inputs.
#[derive(Debug)]
pub struct TargetMerger {
    schema: CanonicalSchema,
    lookup: HeaderLookup,
    master: MasterTable,
    state: MergerState,
}

impl TargetMerger {
    /// A merger over an empty master table.
    pub fn new(schema: CanonicalSchema, lookup: HeaderLookup) -> Self {
        let master = MasterTable::new(&schema);
        Self {
            schema,
            lookup,
            master,
            state: MergerState::Empty,
        }
    }

    /// A merger over the master table persisted at `path`.
    ///
    /// A missing file is not an error: the merger starts with an empty table.
    pub fn open(path: &Path, schema: CanonicalSchema, lookup: HeaderLookup) -> Result<Self> {
        let master = Self::load(path, &schema)?;
        Ok(Self {
            schema,
            lookup,
            master,
            state: MergerState::Loaded,
        })
    }

    /// Read the persisted master table, or an empty one if `path` does not exist.
    pub fn load(path: &Path, schema: &CanonicalSchema) -> Result<MasterTable> {
        store::load_master(path, schema)
    }

    /// Current master table.
    pub fn master(&self) -> &MasterTable {
        &self.master
    }

    /// Header lookup in use.
    pub fn lookup(&self) -> &HeaderLookup {
        &self.lookup
    }

    /// Canonical schema in use.
    pub fn schema(&self) -> &CanonicalSchema {
        &self.schema
    }

    /// Lifecycle state.
    pub fn state(&self) -> MergerState {
        self.state
    }

    /// Rename every column of `raw` to its canonical name and validate it.
    ///
    /// - Unknown labels pass through as their normalized form.
    /// - When several columns resolve to the same name, the leftmost wins.
    /// - Columns resolving to a provenance name or to an empty label are dropped.
    /// - `magnitude` is added as missing if the input has no such column.
    ///
    /// Fails with [`SchemaValidationError`] if `name`, `ra` or `dec` is unresolved.
    pub fn standardize(&self, raw: &RawTable) -> Result<StandardizedBatch, SchemaValidationError> {
        let mut columns: Vec<String> = Vec::with_capacity(raw.headers().len() + 1);
        let mut picks: Vec<usize> = Vec::with_capacity(raw.headers().len());

        for (idx, header) in raw.headers().iter().enumerate() {
            let canonical = self.lookup.resolve(header);
            if canonical.is_empty() {
                warn!(column = idx + 1, "dropping column with blank header");
                continue;
            }
            if PROVENANCE_FIELDS.contains(&canonical.as_str()) {
                warn!(header = %header, "dropping input column that shadows a provenance field");
                continue;
            }
            if columns.contains(&canonical) {
                warn!(
                    header = %header,
                    canonical = %canonical,
                    "column resolves to an already mapped field; keeping the first one"
                );
                continue;
            }
            columns.push(canonical);
            picks.push(idx);
        }

        let missing_fields: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|f| !columns.iter().any(|c| c == *f))
            .map(|f| f.to_string())
            .collect();
        if !missing_fields.is_empty() {
            return Err(SchemaValidationError {
                missing_fields,
                resolved_columns: columns,
            });
        }

        let synthesize_magnitude = !columns.iter().any(|c| c == MAGNITUDE);
        if synthesize_magnitude {
            columns.push(MAGNITUDE.to_string());
        }

        let records = raw
            .rows()
            .iter()
            .map(|row| {
                let mut values: IndexMap<String, _> = columns
                    .iter()
                    .zip(&picks)
                    .map(|(c, &idx)| (c.clone(), row[idx].clone()))
                    .collect();
                if synthesize_magnitude {
                    values.insert(MAGNITUDE.to_string(), None);
                }
                Record::new(values)
            })
            .collect();

        Ok(StandardizedBatch { columns, records })
    }

    /// Standardize `raw` and append it, stamped with `source` and the current time.
    ///
    /// Returns the number of rows added. See [`TargetMerger::merge_at`].
    pub fn merge(&mut self, raw: &RawTable, source: &str) -> Result<usize> {
        self.merge_at(raw, source, Utc::now())
    }

    /// Standardize `raw` and append it with an explicit merge timestamp.
    ///
    /// - An input with no rows returns `Ok(0)` and leaves the merger untouched.
    /// - On error nothing is appended.
    /// - Every row of one call shares the same `updated_at`.
    #[tracing::instrument(level = "debug", skip(self, raw), fields(rows = raw.len()))]
    pub fn merge_at(&mut self, raw: &RawTable, source: &str, at: DateTime<Utc>) -> Result<usize> {
        if raw.is_empty() {
            debug!(source, "input has no rows; nothing merged");
            return Ok(0);
        }

        let StandardizedBatch {
            columns,
            mut records,
        } = self.standardize(raw)?;

        for record in &mut records {
            record.stamp(source, at);
        }
        let added = records.len();
        self.master
            .append(columns.iter().map(String::as_str), records);
        self.state = MergerState::Merging;

        info!(source, added, total = self.master.len(), "merged");
        Ok(added)
    }

    /// Collapse duplicate names (first-seen wins) and write the table to `path`.
    ///
    /// An empty master table is not written and yields
    /// [`SaveOutcome::NothingToSave`]. Write failures are returned as
    /// [`crate::Error::Persist`].
    pub fn deduplicate_and_save(&mut self, path: &Path) -> Result<SaveOutcome> {
        if self.master.is_empty() {
            info!(path = %path.display(), "master table is empty; nothing to save");
            return Ok(SaveOutcome::NothingToSave);
        }

        let duplicates_removed = self.master.deduplicate();
        store::write_master(path, &self.master)?;
        self.state = MergerState::Saved;

        let rows = self.master.len();
        info!(path = %path.display(), rows, duplicates_removed, "saved master table");
        Ok(SaveOutcome::Saved {
            rows,
            duplicates_removed,
        })
    }
}
