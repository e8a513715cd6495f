#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use target_merge::{CanonicalSchema, RawTable, TargetMerger, build_lookup, table::cell};

pub struct Workspace {
    _dir: TempDir, // keep alive for the life of the test
    pub root: PathBuf,
    pub inbox: PathBuf,
    pub processed: PathBuf,
    pub master: PathBuf,
}

pub fn setup_workspace() -> Workspace {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().to_path_buf();
    let inbox = root.join("inbox");
    fs::create_dir_all(&inbox).expect("inbox");
    Workspace {
        processed: root.join("processed"),
        master: root.join("merged_table.csv"),
        inbox,
        root,
        _dir: dir,
    }
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write input");
    path
}

pub fn default_merger() -> TargetMerger {
    let schema = CanonicalSchema::default();
    let lookup = build_lookup(&schema, None).expect("lookup");
    TargetMerger::new(schema, lookup)
}

pub fn open_merger(master: &Path) -> TargetMerger {
    let schema = CanonicalSchema::default();
    let lookup = build_lookup(&schema, None).expect("lookup");
    TargetMerger::open(master, schema, lookup).expect("open master")
}

pub fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
    RawTable::from_rows(
        headers.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| cell(c)).collect())
            .collect(),
    )
    .expect("rectangular table")
}

/// Midnight UTC on the given day of January 2024.
pub fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
}
