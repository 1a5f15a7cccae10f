// src/search.rs

//! Local package-name database and fuzzy search
//!
//! `init_database` downloads the index's simple listing and stores one
//! project name per line. `fuzzy_search` scores every stored name against a
//! query with the indel similarity ratio and keeps the best matches.

use crate::error::{Error, Result};
use crate::index::IndexClient;
use chrono::{Duration, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Listing older than this many days is reported as out of date
pub const FRESHNESS_DAYS: i64 = 3;

/// Maximum number of search results
pub const MAX_RESULTS: usize = 7;

/// Minimum similarity for a name to be reported
pub const SIMILARITY_CUTOFF: f64 = 0.6;

static ANCHOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<a\b[^>]*>(?P<text>[^<]*)</a>").expect("anchor pattern is valid")
});

/// What `init_database` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Database written with this many names
    Created(usize),
    /// Database exists and no update was requested
    AlreadyInitialized,
    /// Update requested but the listing has not changed
    UpToDate,
}

/// Project names from a simple index HTML page
pub fn extract_names(html: &str) -> Vec<String> {
    ANCHOR_PATTERN
        .captures_iter(html)
        .map(|caps| caps["text"].trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Whether the index listing changed within the freshness window
pub fn listing_outdated<C: IndexClient + ?Sized>(client: &C) -> Result<bool> {
    let since = Utc::now() - Duration::days(FRESHNESS_DAYS);
    client.simple_index_modified_since(since)
}

/// Create or refresh the name database at `path`
pub fn init_database<C: IndexClient + ?Sized>(client: &C, path: &Path, update: bool) -> Result<InitOutcome> {
    debug!("Database location: {}", path.display());

    if !update && path.exists() {
        return Ok(InitOutcome::AlreadyInitialized);
    }

    if update && path.exists() && !listing_outdated(client)? {
        return Ok(InitOutcome::UpToDate);
    }

    let html = client.simple_index()?;
    let names = extract_names(&html);

    let mut writer = BufWriter::new(fs::File::create(path)?);
    for name in &names {
        writeln!(writer, "{}", name)?;
    }
    writer.flush()?;

    info!("Stored {} package names in {}", names.len(), path.display());
    Ok(InitOutcome::Created(names.len()))
}

/// Read the stored names
pub fn read_database(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::DatabaseNotFound(path.display().to_string()),
        _ => Error::Io(e),
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Indel similarity `2 * LCS / (len(a) + len(b))`, in `[0, 1]`
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // Single-row LCS table
    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut diagonal = 0;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }

    (2 * row[b.len()]) as f64 / total as f64
}

/// Best matches for `query` among `names`, most similar first
///
/// Matching is case-insensitive; results keep the stored casing.
pub fn fuzzy_search(query: &str, names: &[String]) -> Result<Vec<String>> {
    if names.is_empty() {
        return Err(Error::EmptyDatabase);
    }

    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let indexed: HashMap<String, &String> = names.iter().map(|name| (name.to_lowercase(), name)).collect();
    let query_len = query.chars().count();

    let mut scored: Vec<(f64, &String)> = indexed
        .iter()
        .filter(|(lower, _)| {
            // Upper bound on the ratio from lengths alone
            let len = lower.chars().count();
            (2 * len.min(query_len)) as f64 / (len + query_len) as f64 >= SIMILARITY_CUTOFF
        })
        .map(|(lower, name)| (similarity(&query, lower), *name))
        .filter(|(score, _)| *score >= SIMILARITY_CUTOFF)
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.truncate(MAX_RESULTS);

    Ok(scored.into_iter().map(|(_, name)| name.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct ListingIndex {
        html: String,
        modified: bool,
        downloads: AtomicUsize,
    }

    impl ListingIndex {
        fn new(html: &str, modified: bool) -> Self {
            Self {
                html: html.to_string(),
                modified,
                downloads: AtomicUsize::new(0),
            }
        }

        fn downloads(&self) -> usize {
            self.downloads.load(Ordering::SeqCst)
        }
    }

    impl IndexClient for ListingIndex {
        fn project(&self, name: &str) -> Result<crate::index::ProjectInfo> {
            Err(Error::PackageNotFound(name.to_string()))
        }

        fn simple_index(&self) -> Result<String> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(self.html.clone())
        }

        fn simple_index_modified_since(&self, _since: DateTime<Utc>) -> Result<bool> {
            Ok(self.modified)
        }
    }

    const LISTING: &str = r#"<!DOCTYPE html>
<html><body>
    <a href="/simple/package1/">Package1</a>
    <a href="/simple/package2/">Package2</a>
    <a href="/simple/package3/">
        Package3
    </a>
    <a href="/simple/empty/"></a>
</body></html>"#;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_names() {
        assert_eq!(extract_names(LISTING), names(&["Package1", "Package2", "Package3"]));
        assert!(extract_names("<html></html>").is_empty());
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("", "abc"), 0.0);
        assert!((similarity("package1", "package") - 14.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_fuzzy_search() {
        let db = names(&["Package1", "Package2", "Package3"]);

        let output = fuzzy_search("Package1", &db).unwrap();
        assert_eq!(output[0], "Package1");
        assert_eq!(output.len(), 3);

        assert!(fuzzy_search("", &db).unwrap().is_empty());
        assert!(fuzzy_search("ASdwe", &db).unwrap().is_empty());
    }

    #[test]
    fn test_fuzzy_search_limits_results() {
        let db: Vec<String> = (0..20).map(|i| format!("requests{}", i % 10)).collect();
        let output = fuzzy_search("requests", &db).unwrap();
        assert_eq!(output.len(), MAX_RESULTS);
    }

    #[test]
    fn test_fuzzy_search_empty_database() {
        let result = fuzzy_search("ASdwe", &[]);
        assert!(matches!(result, Err(Error::EmptyDatabase)));
    }

    #[test]
    fn test_init_database_lifecycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkg_db.txt");
        let index = ListingIndex::new(LISTING, false);

        assert_eq!(init_database(&index, &path, false).unwrap(), InitOutcome::Created(3));
        assert_eq!(read_database(&path).unwrap(), names(&["Package1", "Package2", "Package3"]));

        assert_eq!(
            init_database(&index, &path, false).unwrap(),
            InitOutcome::AlreadyInitialized
        );
        assert_eq!(init_database(&index, &path, true).unwrap(), InitOutcome::UpToDate);
        assert_eq!(index.downloads(), 1);

        let changed = ListingIndex::new(LISTING, true);
        assert_eq!(init_database(&changed, &path, true).unwrap(), InitOutcome::Created(3));
    }

    #[test]
    fn test_read_missing_database() {
        let dir = TempDir::new().unwrap();
        let result = read_database(&dir.path().join("missing.txt"));
        assert!(matches!(result, Err(Error::DatabaseNotFound(_))));
    }

    #[test]
    fn test_similarity_is_symmetric() {
        for (a, b) in [("numpy", "nunpy"), ("django", "djangorestframework")] {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }
}
