// src/manifest.rs

//! Manifest file handling
//!
//! The manifest is a plain text file with one package record per line in
//! canonical form (`name[extras]specifier`). It is always rewritten as a full
//! snapshot; a missing file reads as an empty manifest.

use crate::error::Result;
use crate::package::PackageRecord;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default manifest file name
pub const REQUIREMENTS: &str = "requirements.txt";

/// The set of records in a manifest
///
/// Ordered so that saved files are stable between runs.
pub type ManifestSet = BTreeSet<PackageRecord>;

/// How `save` treats an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Truncate and write the full snapshot
    Overwrite,
    /// Append records after the existing content
    Append,
}

/// Load a manifest
///
/// A missing file yields an empty set. Any line that is not a valid package
/// token aborts the load.
pub fn load(path: &Path) -> Result<ManifestSet> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Manifest {} not found, starting empty", path.display());
            return Ok(ManifestSet::new());
        }
        Err(e) => return Err(e.into()),
    };

    let records = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::parse::<PackageRecord>)
        .collect::<Result<ManifestSet>>()?;

    debug!("Loaded {} record(s) from {}", records.len(), path.display());
    Ok(records)
}

/// Write records to the manifest, one per line
pub fn save<'a, I>(records: I, path: &Path, mode: SaveMode) -> Result<()>
where
    I: IntoIterator<Item = &'a PackageRecord>,
{
    let file = match mode {
        SaveMode::Overwrite => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?,
        SaveMode::Append => OpenOptions::new().append(true).create(true).open(path)?,
    };

    let mut writer = BufWriter::new(file);
    let mut count = 0;
    for record in records {
        writeln!(writer, "{}", record)?;
        count += 1;
    }
    writer.flush()?;

    debug!("Wrote {} record(s) to {}", count, path.display());
    Ok(())
}

/// Locate the manifest for a project
///
/// Walks from `start` towards the filesystem root and returns the first
/// `requirements.txt` found. Falls back to `start/requirements.txt`.
pub fn find_manifest(start: &Path) -> PathBuf {
    start
        .ancestors()
        .map(|dir| dir.join(REQUIREMENTS))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| start.join(REQUIREMENTS))
}
