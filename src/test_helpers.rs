//! Shared test utilities for the pandoc-press test suite.
//!
//! Two kinds of fixtures: on-disk sites written into a temp directory (for
//! scanning and full passes), and in-memory documents (for the index and the
//! planner, which never touch the filesystem).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = site_with(&[
//!     ("_posts/2015-01-01-a.md", "---\ncategories: [tips]\n---\nA"),
//! ]);
//! let site = scan(tmp.path(), &PressConfig::default()).unwrap();
//! assert_eq!(titles(site.posts()), vec!["a"]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::PressConfig;
use crate::corpus::{CategorySource, Collection, Document, Site, natural_order};
use crate::frontmatter::Fields;
use chrono::NaiveDate;

// =========================================================================
// On-disk sites
// =========================================================================

/// Write `files` (path relative to the root, content) into a fresh temp dir.
pub fn site_with(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (path, content) in files {
        let full = tmp.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    tmp
}

/// `path` spelled relative to the current directory (`../../tmp/...`).
pub fn relative_from_cwd(path: &Path) -> PathBuf {
    let cwd = std::env::current_dir().unwrap().canonicalize().unwrap();
    let target = path.canonicalize().unwrap();
    let mut relative = PathBuf::new();
    for _ in cwd.components().skip(1) {
        relative.push("..");
    }
    relative.push(target.strip_prefix("/").unwrap());
    relative
}

/// Stock config plus extra collections.
pub fn config_with_collections(names: &[&str]) -> PressConfig {
    let mut config = PressConfig::default();
    config.site.collections = names.iter().map(|n| n.to_string()).collect();
    config
}

// =========================================================================
// In-memory documents
// =========================================================================

/// A document with just the fields the index and planner read.
///
/// `date` is `YYYY-MM-DD`. The title is the slug.
pub fn document(
    collection: &str,
    slug: &str,
    date: Option<&str>,
    categories: &[&str],
    order: Option<i64>,
) -> Document {
    Document {
        path: PathBuf::from(format!("_{collection}/{slug}.md")),
        collection: collection.to_string(),
        slug: slug.to_string(),
        title: slug.to_string(),
        date: date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        order,
        fields: Fields::new(),
        body: format!("{slug} body\n"),
    }
}

/// Site rooted at `/site` with the default ordering.
pub fn site_of(collections: Vec<Collection>, source: CategorySource) -> Site {
    Site::new(
        Path::new("/site"),
        collections,
        natural_order,
        source,
    )
}

// =========================================================================
// Extractors
// =========================================================================

pub fn titles(documents: &[Document]) -> Vec<&str> {
    documents.iter().map(|d| d.title.as_str()).collect()
}

pub fn slugs<'a>(documents: &[&'a Document]) -> Vec<&'a str> {
    documents.iter().map(|d| d.slug.as_str()).collect()
}
