//! Generation targets and the per-format plan.
//!
//! A [`GenerationTarget`] is either a single document or a category bundle.
//! For each output format, [`plan`] lists targets in a fixed three-phase order:
//!
//! ```text
//! 1. every post, in corpus order
//! 2. every document of every other collection, collection by collection
//! 3. every category bundle, label by label
//! ```
//!
//! Standalone documents always come before bundles, so when a bundle's path
//! collides with a document's, the document wins and the bundle is the one
//! reported. Bundle members are stable-sorted by `order` (missing `order`
//! sorts last, keeping the newest-first order from the index).
//!
//! ## Output paths
//!
//! Paths come from permalink templates. Placeholders:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `:output` | format id, e.g. `pdf` |
//! | `:ext` | file extension for the format |
//! | `:collection` | collection name (empty for bundles) |
//! | `:slug` | document slug, or the slugified label |
//! | `:year` `:month` `:day` | document date (empty when undated) |
//!
//! Empty segments collapse, so `:output/:collection/:slug.:ext` for a bundle
//! is `pdf/tips.pdf`, never `pdf//tips.pdf`.

use crate::categories::CategoryIndex;
use crate::config::{OutputFormat, PressConfig};
use crate::corpus::{Document, Site};
use crate::naming::slugify;
use crate::tools::layout::PaperSize;
use crate::tools::params::PdfLayout;
use chrono::{Datelike, NaiveDate};
use std::path::PathBuf;
use tracing::warn;

/// One unit of generation.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationTarget<'a> {
    Document(&'a Document),
    Category {
        label: String,
        documents: Vec<&'a Document>,
    },
}

impl<'a> GenerationTarget<'a> {
    /// Display title; a bundle's title is its label.
    pub fn title(&self) -> &str {
        match self {
            GenerationTarget::Document(doc) => &doc.title,
            GenerationTarget::Category { label, .. } => label,
        }
    }

    pub fn slug(&self) -> String {
        match self {
            GenerationTarget::Document(doc) => doc.slug.clone(),
            GenerationTarget::Category { label, .. } => slugify(label),
        }
    }

    /// Source documents in generation order.
    pub fn documents(&self) -> &[&'a Document] {
        match self {
            GenerationTarget::Document(doc) => std::slice::from_ref(doc),
            GenerationTarget::Category { documents, .. } => documents,
        }
    }

    /// Stable identity for diagnostics: source path or `category:<label>`.
    pub fn identity(&self) -> String {
        match self {
            GenerationTarget::Document(doc) => doc.identity(),
            GenerationTarget::Category { label, .. } => format!("category:{label}"),
        }
    }

    pub fn is_category(&self) -> bool {
        matches!(self, GenerationTarget::Category { .. })
    }

    /// Documents can opt out with `pandoc: false`; bundles never are excluded.
    pub fn is_excluded(&self) -> bool {
        match self {
            GenerationTarget::Document(doc) => doc.is_excluded(),
            GenerationTarget::Category { .. } => false,
        }
    }

    /// Page geometry: document front matter over the configured defaults.
    pub fn pdf_layout(&self, config: &PressConfig) -> PdfLayout {
        let defaults = default_layout(config);
        let GenerationTarget::Document(doc) = self else {
            return defaults;
        };
        let paper = |key: &str, fallback: PaperSize| match doc.field(key) {
            Some(value) => PaperSize::parse(&value).unwrap_or_else(|| {
                warn!(
                    document = %doc.identity(),
                    key,
                    value = %value,
                    "ignoring unknown paper size"
                );
                fallback
            }),
            None => fallback,
        };
        let signature = match doc.field("signature") {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(sig) if sig % 4 == 0 => sig,
                _ => {
                    warn!(
                        document = %doc.identity(),
                        value = %value,
                        "ignoring invalid signature"
                    );
                    defaults.signature
                }
            },
            None => defaults.signature,
        };
        PdfLayout {
            papersize: paper("papersize", defaults.papersize),
            sheetsize: paper("sheetsize", defaults.sheetsize),
            signature,
        }
    }

    /// Cover image, if any.
    ///
    /// Documents name theirs with the `cover` key (relative to the site root).
    /// A bundle uses `<covers_dir>/<slug>.png` when that file exists.
    pub fn cover(&self, site: &Site, config: &PressConfig) -> Option<PathBuf> {
        match self {
            GenerationTarget::Document(doc) => doc
                .field("cover")
                .filter(|c| !c.trim().is_empty())
                .map(|c| site.root().join(c.trim().trim_start_matches('/'))),
            GenerationTarget::Category { .. } => {
                let path = site
                    .root()
                    .join(&config.pandoc.covers_dir)
                    .join(format!("{}.png", self.slug()));
                path.is_file().then_some(path)
            }
        }
    }

    /// Output path relative to the destination, `/`-separated.
    pub fn output_path(&self, format: &OutputFormat, config: &PressConfig) -> String {
        match self {
            GenerationTarget::Document(doc) => render_permalink(
                &config.pandoc.permalink,
                &PermalinkVars {
                    output: &format.format,
                    ext: format.extension(),
                    collection: &doc.collection,
                    slug: &doc.slug,
                    date: doc.date,
                },
            ),
            GenerationTarget::Category { .. } => render_permalink(
                &config.pandoc.bundle_permalink,
                &PermalinkVars {
                    output: &format.format,
                    ext: format.extension(),
                    collection: "",
                    slug: &self.slug(),
                    date: None,
                },
            ),
        }
    }
}

/// Configured page geometry, falling back to A5 on A4.
pub fn default_layout(config: &PressConfig) -> PdfLayout {
    PdfLayout {
        papersize: PaperSize::parse(&config.pandoc.papersize).unwrap_or(PaperSize::A5),
        sheetsize: PaperSize::parse(&config.pandoc.sheetsize).unwrap_or(PaperSize::A4),
        signature: config.pandoc.signature,
    }
}

/// Values substituted into a permalink template.
#[derive(Debug, Clone)]
pub struct PermalinkVars<'a> {
    pub output: &'a str,
    pub ext: &'a str,
    pub collection: &'a str,
    pub slug: &'a str,
    pub date: Option<NaiveDate>,
}

/// Expand `template` and normalize the result.
///
/// Unknown placeholders are left as written.
pub fn render_permalink(template: &str, vars: &PermalinkVars) -> String {
    let mut out = String::with_capacity(template.len() + vars.slug.len());
    let mut rest = template;
    while let Some(pos) = rest.find(':') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let name_len = after
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after.len());
        let name = &after[..name_len];
        match placeholder(name, vars) {
            Some(value) => out.push_str(&value),
            None => {
                out.push(':');
                out.push_str(name);
            }
        }
        rest = &after[name_len..];
    }
    out.push_str(rest);

    out.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn placeholder(name: &str, vars: &PermalinkVars) -> Option<String> {
    let value = match name {
        "output" => vars.output.to_string(),
        "ext" => vars.ext.to_string(),
        "collection" => vars.collection.to_string(),
        "slug" => vars.slug.to_string(),
        "year" => vars.date.map(|d| format!("{:04}", d.year())).unwrap_or_default(),
        "month" => vars.date.map(|d| format!("{:02}", d.month())).unwrap_or_default(),
        "day" => vars.date.map(|d| format!("{:02}", d.day())).unwrap_or_default(),
        _ => return None,
    };
    Some(value)
}

/// A target with its resolved output path.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTarget<'a> {
    pub target: GenerationTarget<'a>,
    /// Relative to the destination.
    pub relative_path: String,
}

/// All targets for `format`, in the three-phase order.
pub fn plan<'a>(
    format: &OutputFormat,
    site: &'a Site,
    index: &CategoryIndex<'a>,
    config: &PressConfig,
) -> Vec<PlannedTarget<'a>> {
    let posts = site.posts().iter();
    let others = site
        .collections()
        .iter()
        .filter(|c| !c.is_primary())
        .flat_map(|c| c.documents.iter());
    let bundles = index.iter().map(|(label, bucket)| {
        let mut documents = bucket.clone();
        documents.sort_by_key(|d| d.order_key());
        GenerationTarget::Category {
            label: label.clone(),
            documents,
        }
    });

    posts
        .chain(others)
        .map(GenerationTarget::Document)
        .chain(bundles)
        .map(|target| PlannedTarget {
            relative_path: target.output_path(format, config),
            target,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories;
    use crate::corpus::{CategorySource, Collection};
    use crate::test_helpers::*;

    fn vars<'a>(slug: &'a str, date: Option<NaiveDate>) -> PermalinkVars<'a> {
        PermalinkVars {
            output: "pdf",
            ext: "pdf",
            collection: "posts",
            slug,
            date,
        }
    }

    #[test]
    fn permalink_placeholders() {
        let date = NaiveDate::from_ymd_opt(2015, 3, 4);
        assert_eq!(
            render_permalink(":output/:collection/:slug.:ext", &vars("a", date)),
            "pdf/posts/a.pdf"
        );
        assert_eq!(
            render_permalink("/:output/:year/:month/:day/:slug.:ext", &vars("a", date)),
            "pdf/2015/03/04/a.pdf"
        );
    }

    #[test]
    fn permalink_collapses_empty_segments() {
        assert_eq!(
            render_permalink(":output/:year//:slug.:ext", &vars("a", None)),
            "pdf/a.pdf"
        );
    }

    #[test]
    fn unknown_placeholder_kept() {
        assert_eq!(
            render_permalink(":output/:title/:slug", &vars("a", None)),
            "pdf/:title/a"
        );
    }

    #[test]
    fn targets_follow_three_phases() {
        let site = site_of(
            vec![
                Collection {
                    name: "notes".into(),
                    documents: vec![document("notes", "n", None, &["tips"], None)],
                },
                Collection {
                    name: "posts".into(),
                    documents: vec![
                        document("posts", "a", Some("2015-01-01"), &["tips"], None),
                        document("posts", "b", Some("2015-01-02"), &[], None),
                    ],
                },
            ],
            CategorySource::Collections,
        );
        let index = categories::index(&site);
        let config = PressConfig::default();
        let planned = plan(&OutputFormat::new("pdf", ""), &site, &index, &config);

        let ids: Vec<String> = planned.iter().map(|p| p.target.identity()).collect();
        assert_eq!(
            ids,
            vec!["_posts/a.md", "_posts/b.md", "_notes/n.md", "category:tips"]
        );
        let paths: Vec<&str> = planned.iter().map(|p| p.relative_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["pdf/posts/a.pdf", "pdf/posts/b.pdf", "pdf/notes/n.pdf", "pdf/tips.pdf"]
        );
    }

    #[test]
    fn bundle_members_sorted_by_order_then_recency() {
        let site = site_of(
            vec![Collection {
                name: "posts".into(),
                documents: vec![
                    document("posts", "old", Some("2015-01-01"), &["tips"], None),
                    document("posts", "a", Some("2015-01-02"), &["tips"], Some(2)),
                    document("posts", "b", Some("2015-01-03"), &["tips"], Some(1)),
                    document("posts", "new", Some("2015-01-04"), &["tips"], None),
                ],
            }],
            CategorySource::Collections,
        );
        let index = categories::index(&site);
        let planned = plan(
            &OutputFormat::new("epub", ""),
            &site,
            &index,
            &PressConfig::default(),
        );
        let bundle = &planned.last().unwrap().target;
        assert!(bundle.is_category());
        assert_eq!(slugs(bundle.documents()), vec!["b", "a", "new", "old"]);
        assert_eq!(planned.last().unwrap().relative_path, "epub/tips.epub");
    }

    #[test]
    fn bundle_slug_and_title() {
        let target = GenerationTarget::Category {
            label: "Tips & Tricks".into(),
            documents: vec![],
        };
        assert_eq!(target.title(), "Tips & Tricks");
        assert_eq!(target.slug(), "tips-tricks");
        assert!(!target.is_excluded());
    }

    #[test]
    fn document_layout_overrides_defaults() {
        let mut doc = document("posts", "a", None, &[], None);
        doc.fields.insert("papersize".into(), "a6paper".into());
        doc.fields.insert("signature".into(), 8.into());
        let layout = GenerationTarget::Document(&doc).pdf_layout(&PressConfig::default());
        assert_eq!(layout.papersize, PaperSize::parse("a6").unwrap());
        assert_eq!(layout.sheetsize, PaperSize::A4);
        assert_eq!(layout.signature, 8);
    }

    #[test]
    fn invalid_document_layout_falls_back() {
        let mut doc = document("posts", "a", None, &[], None);
        doc.fields.insert("papersize".into(), "letter".into());
        doc.fields.insert("signature".into(), 6.into());
        let layout = GenerationTarget::Document(&doc).pdf_layout(&PressConfig::default());
        assert_eq!(layout, default_layout(&PressConfig::default()));
    }

    #[test]
    fn bundle_cover_only_when_file_exists() {
        let tmp = site_with(&[("covers/tips.png", "png")]);
        let site = crate::corpus::scan(tmp.path(), &PressConfig::default()).unwrap();
        let config = PressConfig::default();
        let tips = GenerationTarget::Category {
            label: "Tips".into(),
            documents: vec![],
        };
        let news = GenerationTarget::Category {
            label: "news".into(),
            documents: vec![],
        };
        assert_eq!(
            tips.cover(&site, &config),
            Some(tmp.path().join("covers/tips.png"))
        );
        assert_eq!(news.cover(&site, &config), None);
    }

    #[test]
    fn document_cover_from_front_matter() {
        let mut doc = document("posts", "a", None, &[], None);
        doc.fields.insert("cover".into(), "/img/a.png".into());
        let site = site_of(vec![], CategorySource::Collections);
        let cover = GenerationTarget::Document(&doc).cover(&site, &PressConfig::default());
        assert_eq!(cover, Some(PathBuf::from("/site/img/a.png")));
    }
}
