//! CSV persistence for the master table.
//!
//! Layout: one header row (data columns, then `source_file`, `updated_at`),
//! one row per target, missing values as empty cells, `updated_at` as RFC 3339
//! UTC with a `Z` suffix.
//!
//! Writes go to a hidden sibling temp file which is renamed over the target,
//! so a failed save never leaves a truncated master table behind.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::errors::{Error, Result, SchemaValidationError};
use crate::lookup::normalize_label;
use crate::record::{MasterTable, Record};
use crate::schema::{CanonicalSchema, REQUIRED_FIELDS, SOURCE_FILE, UPDATED_AT};
use crate::table::cell;

/// Read the master table at `path`, or an empty one if the file does not exist.
///
/// Errors:
/// - unreadable or malformed CSV
/// - a header without `name`, `ra` or `dec`
/// - an `updated_at` cell that is not RFC 3339
pub fn load_master(path: &Path, schema: &CanonicalSchema) -> Result<MasterTable> {
    let mut table = MasterTable::new(schema);
    if !path.exists() {
        info!(path = %path.display(), "no existing master table; starting empty");
        return Ok(table);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::read(path, e))?;

    let header: Vec<String> = rdr
        .headers()
        .map_err(|e| Error::read(path, e))?
        .iter()
        .map(normalize_label)
        .collect();

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|f| !header.iter().any(|h| h == *f))
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaValidationError {
            missing_fields: missing,
            resolved_columns: header,
        }
        .into());
    }

    let mut records = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        let row = row.map_err(|e| Error::read(path, e))?;
        let mut values = IndexMap::with_capacity(header.len());
        let mut source_file = None;
        let mut updated_at = None;

        for (col, raw) in header.iter().zip(row.iter()) {
            match col.as_str() {
                SOURCE_FILE => source_file = cell(raw),
                UPDATED_AT => {
                    updated_at = cell(raw)
                        .map(|v| parse_timestamp(&v))
                        .transpose()
                        .map_err(|e| {
                            Error::read(path, format!("row {}: invalid updated_at: {e}", idx + 1))
                        })?;
                }
                _ => {
                    values.insert(col.clone(), cell(raw));
                }
            }
        }

        let mut record = Record::new(values);
        record.source_file = source_file;
        record.updated_at = updated_at;
        records.push(record);
    }

    let data_columns: Vec<&str> = header
        .iter()
        .map(String::as_str)
        .filter(|c| *c != SOURCE_FILE && *c != UPDATED_AT)
        .collect();
    table.append(data_columns, records);

    info!(path = %path.display(), rows = table.len(), "loaded master table");
    Ok(table)
}

/// Write `table` to `path`, replacing any previous content atomically.
pub fn write_master(path: &Path, table: &MasterTable) -> Result<()> {
    let persist = |source: csv::Error| Error::Persist {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| persist(e.into()))?;
    }

    let tmp_path = temp_sibling(path);
    let written = write_rows(&tmp_path, table)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(csv::Error::from));
    if let Err(source) = written {
        if let Err(e) = fs::remove_file(&tmp_path) {
            debug!(path = %tmp_path.display(), error = %e, "temp file not removed");
        }
        return Err(persist(source));
    }

    debug!(path = %path.display(), rows = table.len(), "master table written");
    Ok(())
}

fn write_rows(tmp_path: &Path, table: &MasterTable) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_path(tmp_path)?;
    wtr.write_record(table.header())?;

    let columns: Vec<&str> = table.columns().collect();
    for record in table.records() {
        let mut row: Vec<String> = columns
            .iter()
            .map(|c| record.get(c).unwrap_or_default().to_string())
            .collect();
        row.push(record.source_file.clone().unwrap_or_default());
        row.push(record.updated_at.map(format_timestamp).unwrap_or_default());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// RFC 3339, second precision, `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "master.csv".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let t = load_master(&dir.path().join("nope.csv"), &CanonicalSchema::default()).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn write_then_load_preserves_rows_and_provenance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("master.csv");
        let schema = CanonicalSchema::default();

        let mut values = IndexMap::new();
        values.insert("name".to_string(), Some("M31".to_string()));
        values.insert("ra".to_string(), Some("10.68".to_string()));
        values.insert("dec".to_string(), Some("41.27".to_string()));
        values.insert("magnitude".to_string(), None);
        values.insert("notes".to_string(), Some("spiral, bright".to_string()));
        let mut r = Record::new(values);
        r.stamp("andromeda.csv", Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

        let mut t = MasterTable::new(&schema);
        t.append(["name", "ra", "dec", "magnitude", "notes"], vec![r]);
        write_master(&path, &t).unwrap();
        assert!(!temp_sibling(&path).exists());

        let loaded = load_master(&path, &schema).unwrap();
        assert_eq!(loaded.header(), t.header());
        let row = &loaded.records()[0];
        assert_eq!(row.name(), Some("M31"));
        assert_eq!(row.get("notes"), Some("spiral, bright"));
        assert_eq!(row.get("v_mag"), None);
        assert_eq!(row.get("source_file"), Some("andromeda.csv"));
        assert_eq!(
            row.updated_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("master.csv");
        fs::create_dir(&path).unwrap();

        let schema = CanonicalSchema::default();
        let mut values = IndexMap::new();
        values.insert("name".to_string(), Some("T1".to_string()));
        let mut t = MasterTable::new(&schema);
        t.append(["name"], vec![Record::new(values)]);

        let err = write_master(&path, &t).unwrap_err();
        assert!(matches!(err, Error::Persist { .. }));
        assert!(!temp_sibling(&path).exists());
        assert!(path.is_dir());
    }

    #[test]
    fn master_without_required_columns_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("master.csv");
        fs::write(&path, "name,ra\nT1,1.0\n").unwrap();
        let err = load_master(&path, &CanonicalSchema::default()).unwrap_err();
        match err {
            Error::SchemaValidation(e) => assert_eq!(e.missing_fields, ["dec"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_timestamp_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("master.csv");
        fs::write(&path, "name,ra,dec,updated_at\nT1,1,2,yesterday\n").unwrap();
        let err = load_master(&path, &CanonicalSchema::default()).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(err.to_string().contains("row 1: invalid updated_at"));
    }
}
