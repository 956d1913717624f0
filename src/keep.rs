//! The set of generated files that must survive the site's clean step.
//!
//! [`KeptFiles`] is an append-only, ordered, duplicate-free list of paths
//! relative to the destination. One instance is threaded through a pass; it is
//! never reset mid-pass. After a build it is saved next to the outputs so that
//! a later `clean` can tell generated files from stale ones.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Manifest filename, written at the destination root.
pub const KEEP_MANIFEST: &str = ".pandoc-press-keep.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeptFiles {
    paths: Vec<String>,
    index: HashSet<String>,
}

impl From<Vec<String>> for KeptFiles {
    fn from(paths: Vec<String>) -> Self {
        let mut kept = KeptFiles::new();
        for path in paths {
            kept.insert(&path);
        }
        kept
    }
}

impl From<KeptFiles> for Vec<String> {
    fn from(kept: KeptFiles) -> Self {
        kept.paths
    }
}

impl KeptFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path`. Returns `false` if it was already kept.
    pub fn insert(&mut self, path: &str) -> bool {
        if self.index.contains(path) {
            return false;
        }
        self.index.insert(path.to_string());
        self.paths.push(path.to_string());
        true
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains(path)
    }

    /// Paths in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Write the manifest into `destination`.
    pub fn save(&self, destination: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(destination)?;
        let path = destination.join(KEEP_MANIFEST);
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Read the manifest from `destination`. A missing manifest is an empty set.
    pub fn load(destination: &Path) -> std::io::Result<Self> {
        let path = destination.join(KEEP_MANIFEST);
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }
}

/// Files under `destination` that are not kept, as sorted relative paths.
///
/// The manifest itself is never stale.
pub fn stale_files(destination: &Path, kept: &KeptFiles) -> std::io::Result<Vec<String>> {
    let mut stale = Vec::new();
    if !destination.is_dir() {
        return Ok(stale);
    }
    for entry in WalkDir::new(destination).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = crate::tools::params::relative_to(destination, entry.path()) else {
            continue;
        };
        if relative != KEEP_MANIFEST && !kept.contains(&relative) {
            stale.push(relative);
        }
    }
    Ok(stale)
}

/// Delete every stale file under `destination`. Returns what was removed.
pub fn clean(destination: &Path, kept: &KeptFiles) -> std::io::Result<Vec<String>> {
    let stale = stale_files(destination, kept)?;
    for relative in &stale {
        debug!(path = relative, "removing stale file");
        fs::remove_file(destination.join(relative))?;
    }
    Ok(stale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn insert_keeps_order_and_rejects_duplicates() {
        let mut kept = KeptFiles::new();
        assert!(kept.insert("pdf/b.pdf"));
        assert!(kept.insert("pdf/a.pdf"));
        assert!(!kept.insert("pdf/b.pdf"));
        assert_eq!(kept.iter().collect::<Vec<_>>(), vec!["pdf/b.pdf", "pdf/a.pdf"]);
        assert_eq!(kept.len(), 2);
        assert!(kept.contains("pdf/a.pdf"));
        assert!(!kept.contains("pdf/c.pdf"));
    }

    #[test]
    fn manifest_is_a_json_array() {
        let tmp = TempDir::new().unwrap();
        let mut kept = KeptFiles::new();
        kept.insert("pdf/tips.pdf");
        kept.insert("pdf/tips-imposed.pdf");
        let path = kept.save(tmp.path()).unwrap();

        let raw: Vec<String> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(raw, vec!["pdf/tips.pdf", "pdf/tips-imposed.pdf"]);
        assert_eq!(KeptFiles::load(tmp.path()).unwrap(), kept);
    }

    #[test]
    fn load_without_manifest_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(KeptFiles::load(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn load_dedups_hand_edited_manifest() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(KEEP_MANIFEST), r#"["a.pdf", "a.pdf"]"#).unwrap();
        assert_eq!(KeptFiles::load(tmp.path()).unwrap().len(), 1);
    }

    #[test]
    fn clean_removes_only_stale_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("pdf")).unwrap();
        fs::write(tmp.path().join("pdf/keep.pdf"), "k").unwrap();
        fs::write(tmp.path().join("pdf/old.pdf"), "o").unwrap();
        let mut kept = KeptFiles::new();
        kept.insert("pdf/keep.pdf");
        kept.save(tmp.path()).unwrap();

        assert_eq!(stale_files(tmp.path(), &kept).unwrap(), vec!["pdf/old.pdf"]);
        assert_eq!(clean(tmp.path(), &kept).unwrap(), vec!["pdf/old.pdf"]);
        assert!(tmp.path().join("pdf/keep.pdf").exists());
        assert!(tmp.path().join(KEEP_MANIFEST).exists());
        assert!(!tmp.path().join("pdf/old.pdf").exists());
    }

    #[test]
    fn stale_files_of_missing_destination_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(stale_files(&tmp.path().join("nope"), &KeptFiles::new()).unwrap().is_empty());
    }
}
