//! Filename and label conventions.
//!
//! Posts follow the `YYYY-MM-DD-slug` convention: the date prefix gives the
//! default publish date and the remainder is the slug used in output paths.
//! Every other document uses its file stem as the slug.
//!
//! ## Display Titles
//!
//! When a document has no `title` in its front matter, dashes in the slug are
//! converted to spaces:
//! - `2015-01-01-hello-world.md` → "hello world"
//! - `tips-and-tricks.md` → "tips and tricks"

use chrono::NaiveDate;

/// Result of parsing a document file stem.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Date prefix if present and valid (e.g. 2015-01-01 from `2015-01-01-hello`)
    pub date: Option<NaiveDate>,
    /// Name part after the date, dashes preserved. The full stem when undated.
    pub slug: String,
    /// Display title: slug with dashes converted to spaces.
    pub display_title: String,
}

/// Parse a file stem following the `YYYY-MM-DD-slug` convention.
///
/// - `"2015-01-01-hello"` → date=2015-01-01, slug="hello"
/// - `"2015-02-30-nope"` → date=None, slug="2015-02-30-nope" (invalid date)
/// - `"2015-01-01"` → date=2015-01-01, slug="2015-01-01" (nothing after the date)
/// - `"tips"` → date=None, slug="tips"
pub fn parse_post_name(stem: &str) -> ParsedName {
    if let Some(prefix) = stem.get(..10)
        && let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
    {
        let rest = stem[10..].strip_prefix('-').unwrap_or("");
        let slug = if rest.is_empty() { stem } else { rest };
        return ParsedName {
            date: Some(date),
            slug: slug.to_string(),
            display_title: slug.replace('-', " "),
        };
    }
    ParsedName {
        date: None,
        slug: stem.to_string(),
        display_title: stem.replace('-', " "),
    }
}

/// Turn a category label into a path-safe slug.
///
/// Lowercases, keeps alphanumerics (including non-ASCII letters), and collapses
/// every other run of characters into a single dash.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_dash = false;
    for c in label.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
