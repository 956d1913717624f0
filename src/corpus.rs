//! The host corpus: collections of front-matter documents under a site root.
//!
//! ## Layout
//!
//! ```text
//! site/
//! ├── config.toml
//! ├── _posts/                 # primary collection
//! │   └── 2015-01-01-hello.md
//! └── _notes/                 # declared in site.collections
//!     └── tips.md
//! ```
//!
//! Every `.md`/`.markdown` file below a collection directory is a document;
//! hidden files and directories are skipped. A collection directory that does
//! not exist is simply empty.
//!
//! ## Ordering
//!
//! Documents within a collection are sorted by the site's
//! [`DocumentOrdering`], an injected comparator. The default,
//! [`natural_order`], puts undated documents first and then sorts by date and
//! source path.

use crate::config::PressConfig;
use crate::frontmatter::{self, Fields};
use crate::naming::parse_post_name;
use chrono::NaiveDate;
use serde_json::Value;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Name of the primary collection, read from `_posts/`.
pub const PRIMARY_COLLECTION: &str = "posts";

/// `order` assumed for documents without one; sorts after any explicit value.
pub const ORDER_SENTINEL: i64 = 10000;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot open site root {}: {source}", .path.display())]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid front matter in {}: {source}", .path.display())]
    FrontMatter {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// One authored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Source path relative to the site root. Stable identity.
    pub path: PathBuf,
    pub collection: String,
    pub slug: String,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub categories: Vec<String>,
    pub order: Option<i64>,
    /// Raw front matter, for the per-document PDF settings.
    pub fields: Fields,
    pub body: String,
}

impl Document {
    /// `/`-separated source path, used in diagnostics and as identity.
    pub fn identity(&self) -> String {
        self.path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Explicit `order`, or [`ORDER_SENTINEL`].
    pub fn order_key(&self) -> i64 {
        self.order.unwrap_or(ORDER_SENTINEL)
    }

    /// `pandoc: false` in front matter opts the document out.
    pub fn is_excluded(&self) -> bool {
        self.fields.get("pandoc") == Some(&Value::Bool(false))
    }

    pub fn field(&self, key: &str) -> Option<String> {
        frontmatter::string_field(&self.fields, key)
    }
}

/// A named, ordered group of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub name: String,
    pub documents: Vec<Document>,
}

impl Collection {
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_COLLECTION
    }
}

/// Comparator defining the corpus's natural document ordering.
pub type DocumentOrdering = fn(&Document, &Document) -> Ordering;

/// Date ascending (undated first), then source path.
pub fn natural_order(a: &Document, b: &Document) -> Ordering {
    a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path))
}

/// Which documents the category index reads, resolved once per site.
///
/// Corpora older than 3.0 only ever categorised posts; `PostsOnly` keeps that
/// behaviour for them as a compatibility shim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource {
    Collections,
    PostsOnly,
}

impl CategorySource {
    /// `PostsOnly` for versions below 3.0.0. Unparseable versions are current.
    pub fn for_version(version: &str) -> Self {
        let major = version
            .trim()
            .trim_start_matches('v')
            .split('.')
            .next()
            .and_then(|m| m.parse::<u64>().ok());
        match major {
            Some(major) if major < 3 => CategorySource::PostsOnly,
            _ => CategorySource::Collections,
        }
    }
}

/// A scanned site.
#[derive(Debug, Clone)]
pub struct Site {
    root: PathBuf,
    collections: Vec<Collection>,
    ordering: DocumentOrdering,
    category_source: CategorySource,
}

impl Site {
    /// Build a site from already-loaded collections.
    ///
    /// A primary collection is added when missing, kept first, and every
    /// collection is sorted with `ordering`.
    pub fn new(
        root: &Path,
        mut collections: Vec<Collection>,
        ordering: DocumentOrdering,
        category_source: CategorySource,
    ) -> Self {
        if !collections.iter().any(Collection::is_primary) {
            collections.insert(
                0,
                Collection {
                    name: PRIMARY_COLLECTION.to_string(),
                    documents: Vec::new(),
                },
            );
        }
        collections.sort_by_key(|c| !c.is_primary());
        for collection in &mut collections {
            collection.documents.sort_by(ordering);
        }
        Self {
            root: root.to_path_buf(),
            collections,
            ordering,
            category_source,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The primary collection's documents.
    pub fn posts(&self) -> &[Document] {
        &self.collections[0].documents
    }

    /// Every collection, primary first, then in declaration order.
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn ordering(&self) -> DocumentOrdering {
        self.ordering
    }

    pub fn category_source(&self) -> CategorySource {
        self.category_source
    }

    pub fn document_count(&self) -> usize {
        self.collections.iter().map(|c| c.documents.len()).sum()
    }
}

/// Scan `root` with the default [`natural_order`].
pub fn scan(root: &Path, config: &PressConfig) -> Result<Site, ScanError> {
    scan_with(root, config, natural_order)
}

/// Scan `root`, sorting collections with `ordering`.
///
/// The root is canonicalized first: every output path is derived from it and
/// external tools run with their own working directory.
pub fn scan_with(
    root: &Path,
    config: &PressConfig,
    ordering: DocumentOrdering,
) -> Result<Site, ScanError> {
    let root = root.canonicalize().map_err(|source| ScanError::Root {
        path: root.to_path_buf(),
        source,
    })?;
    let root = root.as_path();
    let mut names = vec![PRIMARY_COLLECTION.to_string()];
    for name in &config.site.collections {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }

    let mut collections = Vec::with_capacity(names.len());
    for name in names {
        collections.push(scan_collection(root, &name)?);
    }

    let source = CategorySource::for_version(&config.site.corpus_version);
    debug!(root = %root.display(), ?source, "scanned site");
    Ok(Site::new(root, collections, ordering, source))
}

fn scan_collection(root: &Path, name: &str) -> Result<Collection, ScanError> {
    let dir = root.join(format!("_{name}"));
    let mut documents = Vec::new();
    if dir.is_dir() {
        let walker = WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && is_markdown(entry.path()) {
                documents.push(read_document(root, entry.path(), name)?);
            }
        }
    }
    debug!(collection = name, documents = documents.len(), "scanned collection");
    Ok(Collection {
        name: name.to_string(),
        documents,
    })
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            let ext = e.to_string_lossy().to_lowercase();
            ext == "md" || ext == "markdown"
        })
        .unwrap_or(false)
}

/// Read one document. `path` is absolute (or relative to the cwd) and under `root`.
pub fn read_document(root: &Path, path: &Path, collection: &str) -> Result<Document, ScanError> {
    let text = fs::read_to_string(path)?;
    let (fields, body) = frontmatter::split(&text).map_err(|source| ScanError::FrontMatter {
        path: path.to_path_buf(),
        source,
    })?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parsed = if collection == PRIMARY_COLLECTION {
        parse_post_name(&stem)
    } else {
        crate::naming::ParsedName {
            date: None,
            display_title: stem.replace('-', " "),
            slug: stem,
        }
    };

    let date = frontmatter::string_field(&fields, "date")
        .and_then(|d| parse_date(&d))
        .or(parsed.date);
    let title = frontmatter::string_field(&fields, "title").unwrap_or(parsed.display_title);
    let order = fields.get("order").and_then(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    Ok(Document {
        path: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
        collection: collection.to_string(),
        slug: parsed.slug,
        title,
        date,
        categories: frontmatter::categories(&fields),
        order,
        body: body.to_string(),
        fields,
    })
}

/// Leading `YYYY-MM-DD` of a front matter date (times and zones ignored).
fn parse_date(value: &str) -> Option<NaiveDate> {
    let day = value.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn scan_reads_posts_and_declared_collections() {
        let tmp = site_with(&[
            ("_posts/2015-01-02-b.md", "---\ntitle: B\n---\nbody b"),
            ("_posts/2015-01-01-a.md", "---\ntitle: A\n---\nbody a"),
            ("_notes/tips.md", "---\ncategories: [tips]\n---\nnote"),
            ("_drafts/ignored.md", "not declared"),
        ]);
        let site = scan(tmp.path(), &config_with_collections(&["notes"])).unwrap();

        assert_eq!(titles(site.posts()), vec!["A", "B"]);
        let names: Vec<&str> = site.collections().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["posts", "notes"]);
        assert_eq!(site.document_count(), 3);
    }

    #[test]
    fn post_filename_supplies_date_and_slug() {
        let tmp = site_with(&[("_posts/2015-03-04-hello-world.md", "Hi")]);
        let site = scan(tmp.path(), &PressConfig::default()).unwrap();
        let doc = &site.posts()[0];
        assert_eq!(doc.slug, "hello-world");
        assert_eq!(doc.title, "hello world");
        assert_eq!(doc.date, NaiveDate::from_ymd_opt(2015, 3, 4));
        assert_eq!(doc.identity(), "_posts/2015-03-04-hello-world.md");
        assert_eq!(doc.body, "Hi");
    }

    #[test]
    fn front_matter_date_overrides_filename() {
        let tmp = site_with(&[(
            "_posts/2015-03-04-a.md",
            "---\ndate: 2016-01-01 10:00:00 +0000\n---\n",
        )]);
        let site = scan(tmp.path(), &PressConfig::default()).unwrap();
        assert_eq!(site.posts()[0].date, NaiveDate::from_ymd_opt(2016, 1, 1));
    }

    #[test]
    fn order_and_opt_out_are_read() {
        let tmp = site_with(&[
            ("_posts/2015-01-01-a.md", "---\norder: 2\npandoc: false\n---\n"),
            ("_posts/2015-01-02-b.md", "---\norder: \"1\"\n---\n"),
            ("_posts/2015-01-03-c.md", "plain"),
        ]);
        let site = scan(tmp.path(), &PressConfig::default()).unwrap();
        let posts = site.posts();
        assert_eq!(posts[0].order, Some(2));
        assert!(posts[0].is_excluded());
        assert_eq!(posts[1].order_key(), 1);
        assert_eq!(posts[2].order_key(), ORDER_SENTINEL);
        assert!(!posts[2].is_excluded());
    }

    #[test]
    fn hidden_and_non_markdown_files_skipped() {
        let tmp = site_with(&[
            ("_posts/.2015-01-01-hidden.md", "x"),
            ("_posts/.drafts/2015-01-01-d.md", "x"),
            ("_posts/2015-01-01-a.txt", "x"),
            ("_posts/sub/2015-01-01-nested.markdown", "x"),
        ]);
        let site = scan(tmp.path(), &PressConfig::default()).unwrap();
        assert_eq!(titles(site.posts()), vec!["nested"]);
    }

    #[test]
    fn relative_root_is_made_absolute() {
        let tmp = site_with(&[("_posts/2015-01-01-a.md", "A")]);
        let relative = relative_from_cwd(tmp.path());
        assert!(relative.is_relative());

        let site = scan(&relative, &PressConfig::default()).unwrap();

        assert!(site.root().is_absolute());
        assert_eq!(site.root(), tmp.path().canonicalize().unwrap());
        assert_eq!(site.posts()[0].path, PathBuf::from("_posts/2015-01-01-a.md"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = site_with(&[]);
        let err = scan(&tmp.path().join("nope"), &PressConfig::default()).unwrap_err();
        assert!(matches!(err, ScanError::Root { .. }));
    }

    #[test]
    fn missing_collection_directory_is_empty() {
        let tmp = site_with(&[]);
        let site = scan(tmp.path(), &config_with_collections(&["notes"])).unwrap();
        assert!(site.posts().is_empty());
        assert!(site.collections()[1].documents.is_empty());
    }

    #[test]
    fn malformed_front_matter_names_the_file() {
        let tmp = site_with(&[("_posts/2015-01-01-bad.md", "---\ntitle: [x\n---\n")]);
        let err = scan(tmp.path(), &PressConfig::default()).unwrap_err();
        assert!(matches!(err, ScanError::FrontMatter { .. }));
        assert!(err.to_string().contains("2015-01-01-bad.md"));
    }

    #[test]
    fn undated_documents_sort_first() {
        let tmp = site_with(&[
            ("_notes/b.md", "---\ndate: 2015-01-01\n---\n"),
            ("_notes/a.md", "---\ndate: 2016-01-01\n---\n"),
            ("_notes/z.md", "undated"),
        ]);
        let site = scan(tmp.path(), &config_with_collections(&["notes"])).unwrap();
        assert_eq!(titles(&site.collections()[1].documents), vec!["z", "b", "a"]);
    }

    #[test]
    fn injected_ordering_is_used() {
        fn by_title_desc(a: &Document, b: &Document) -> Ordering {
            b.title.cmp(&a.title)
        }
        let tmp = site_with(&[
            ("_posts/2015-01-01-a.md", "x"),
            ("_posts/2015-01-02-b.md", "x"),
        ]);
        let site = scan_with(tmp.path(), &PressConfig::default(), by_title_desc).unwrap();
        assert_eq!(titles(site.posts()), vec!["b", "a"]);
    }

    #[test]
    fn category_source_from_version() {
        assert_eq!(CategorySource::for_version("3.0.0"), CategorySource::Collections);
        assert_eq!(CategorySource::for_version("4.2"), CategorySource::Collections);
        assert_eq!(CategorySource::for_version("2.5.3"), CategorySource::PostsOnly);
        assert_eq!(CategorySource::for_version("v1"), CategorySource::PostsOnly);
        assert_eq!(CategorySource::for_version("dev"), CategorySource::Collections);
    }

    #[test]
    fn site_new_puts_primary_first() {
        let site = Site::new(
            Path::new("/s"),
            vec![Collection {
                name: "notes".into(),
                documents: vec![],
            }],
            natural_order,
            CategorySource::Collections,
        );
        assert!(site.collections()[0].is_primary());
        assert_eq!(site.collections()[1].name, "notes");
    }
}
