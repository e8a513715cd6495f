//! Batch ingestion: read files, merge them one by one, save, relocate.
//!
//! ## Order of operations
//! 1. Every input file is read and merged in order. A failure (unsupported
//!    extension, unreadable file, unresolved required fields) is recorded in
//!    the [`BatchReport`] and the batch continues with the next file.
//! 2. If a save path is configured, the master table is deduplicated and
//!    written. A failure here is fatal and returned as `Err`.
//! 3. Only after a successful save are merged files moved to the processed
//!    directory, each renamed with the merge outcome.
//!
//! A file in `processed/` always has its rows in the saved master table.
//!
//! Files are processed strictly sequentially; [`BatchOptions::max_files`]
//! lets a caller stop between files, never in the middle of one.

use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::errors::{Error, Result};
use crate::merger::{SaveOutcome, TargetMerger};
use crate::readers::read_table;

/// What to do around the per-file merges.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Deduplicate and write the master table here once all files are merged.
    pub save_to: Option<PathBuf>,
    /// Move merged files here after a successful save. Ignored without `save_to`.
    pub processed_dir: Option<PathBuf>,
    /// Stop after this many files; the rest are left untouched.
    pub max_files: Option<usize>,
}

/// A file that contributed no rows because it failed.
#[derive(Debug)]
pub struct FileFailure {
    /// The input file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub error: Error,
}

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Files merged successfully with the number of rows each added.
    pub merged: Vec<(PathBuf, usize)>,
    /// Files skipped because reading or standardizing failed.
    pub skipped: Vec<FileFailure>,
    /// Merged files moved to the processed directory: (from, to).
    pub relocated: Vec<(PathBuf, PathBuf)>,
    /// Merged files that could not be moved, with the reason.
    pub relocation_failures: Vec<(PathBuf, String)>,
    /// Files not looked at because `max_files` was reached.
    pub not_processed: Vec<PathBuf>,
    /// Save result, when a save path was configured.
    pub save: Option<SaveOutcome>,
}

impl BatchReport {
    /// Total rows added across merged files.
    pub fn rows_added(&self) -> usize {
        self.merged.iter().map(|(_, n)| n).sum()
    }

    /// True if no file was skipped and every merged file was relocated as requested.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.relocation_failures.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} file(s) merged ({} rows), {} skipped",
            self.merged.len(),
            self.rows_added(),
            self.skipped.len()
        )?;
        for (path, rows) in &self.merged {
            writeln!(f, "+ {}  {rows} row(s)", path.display())?;
        }
        for fail in &self.skipped {
            writeln!(f, "! {}  {}", fail.path.display(), fail.error)?;
        }
        for (from, to) in &self.relocated {
            writeln!(f, "> {} -> {}", from.display(), to.display())?;
        }
        for (path, why) in &self.relocation_failures {
            writeln!(f, "? {}  not moved: {why}", path.display())?;
        }
        if !self.not_processed.is_empty() {
            writeln!(f, "{} file(s) left for a later run", self.not_processed.len())?;
        }
        match self.save {
            Some(SaveOutcome::Saved {
                rows,
                duplicates_removed,
            }) => writeln!(
                f,
                "saved {rows} target(s), {duplicates_removed} duplicate(s) removed"
            ),
            Some(SaveOutcome::NothingToSave) => writeln!(f, "no data, nothing to save"),
            None => Ok(()),
        }
    }
}

/// Source label recorded in `source_file` for `path`: its file name.
pub fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read `path` and merge it. Returns rows added.
pub fn ingest_file(merger: &mut TargetMerger, path: &Path) -> Result<usize> {
    let table = read_table(path)?;
    info!(path = %path.display(), rows = table.len(), "read input");
    merger.merge(&table, &source_label(path))
}

/// List candidate input files in `dir`, sorted by name.
///
/// Hidden files, sub-directories and anything in `exclude` are left out.
/// Unsupported extensions are kept so they show up as skipped in the report.
pub fn scan_dir(dir: &Path, exclude: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::read(dir, e))?;
    let excluded: Vec<PathBuf> = exclude
        .iter()
        .filter_map(|p| fs::canonicalize(p).ok())
        .collect();

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::read(dir, e))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_file() {
            continue;
        }
        if fs::canonicalize(&path).is_ok_and(|c| excluded.contains(&c)) {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Scan `dir` and run [`run_batch`] over its files.
pub fn ingest_dir(
    merger: &mut TargetMerger,
    dir: &Path,
    exclude: &[PathBuf],
    opts: &BatchOptions,
) -> Result<BatchReport> {
    let files = scan_dir(dir, exclude)?;
    info!(dir = %dir.display(), files = files.len(), "scanned input directory");
    run_batch(merger, &files, opts)
}

/// Merge `files` in order, then save and relocate according to `opts`.
///
/// Only a persist failure is returned as `Err`; everything else is recorded
/// in the report.
pub fn run_batch(
    merger: &mut TargetMerger,
    files: &[PathBuf],
    opts: &BatchOptions,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();

    for (idx, path) in files.iter().enumerate() {
        if opts.max_files.is_some_and(|max| idx >= max) {
            report.not_processed = files[idx..].to_vec();
            info!(remaining = report.not_processed.len(), "file limit reached; stopping");
            break;
        }
        match ingest_file(merger, path) {
            Ok(rows) => report.merged.push((path.clone(), rows)),
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping file");
                report.skipped.push(FileFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }

    if let Some(master_path) = &opts.save_to {
        let outcome = merger.deduplicate_and_save(master_path).inspect_err(|e| {
            error!(path = %master_path.display(), error = %e, "saving master table failed")
        })?;
        report.save = Some(outcome);
    }

    if opts.processed_dir.is_some() && report.save.is_none() {
        warn!("no save path configured; merged files are left in place");
    } else if let Some(processed_dir) = &opts.processed_dir {
        let at = Utc::now();
        for (path, rows) in &report.merged {
            let target = processed_dir.join(processed_name(path, *rows, at));
            match move_file(path, &target) {
                Ok(()) => report.relocated.push((path.clone(), target)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not move merged file");
                    report.relocation_failures.push((path.clone(), e.to_string()));
                }
            }
        }
    }

    info!(
        merged = report.merged.len(),
        skipped = report.skipped.len(),
        rows = report.rows_added(),
        "batch finished"
    );
    Ok(report)
}

/// File name for a merged input: `<stem>.merged-<rows>.<YYYYmmddTHHMMSSZ>[.<ext>]`.
pub fn processed_name(path: &Path, rows: usize, at: DateTime<Utc>) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let stamp = at.format("%Y%m%dT%H%M%SZ");
    match path.extension() {
        Some(ext) => format!("{stem}.merged-{rows}.{stamp}.{}", ext.to_string_lossy()),
        None => format!("{stem}.merged-{rows}.{stamp}"),
    }
}

fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    if to.exists() {
        return Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}
