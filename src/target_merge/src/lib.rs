//! Merge heterogeneous astronomical target tables into one canonical master table.
//!
//! The pipeline is: [`schema`] declares canonical fields and their synonyms,
//! [`lookup`] turns that declaration into an immutable header lookup,
//! [`merger`] standardizes incoming [`table::RawTable`]s and accumulates them,
//! and [`store`] persists the deduplicated result. [`readers`] and [`ingest`]
//! are the file-level collaborators used by the `target-merge` binary.

#![deny(missing_docs)]

pub mod config;
pub mod errors;
pub mod ingest;
pub mod lookup;
pub mod merger;
pub mod readers;
pub mod record;
pub mod schema;
pub mod store;
pub mod table;

pub use errors::{Error, Result, SchemaValidationError};
pub use lookup::{HeaderLookup, build_lookup};
pub use merger::{MergerState, SaveOutcome, TargetMerger};
pub use schema::CanonicalSchema;
pub use table::RawTable;
