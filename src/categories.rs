//! Category index: label → documents carrying that label.
//!
//! Built fresh for every pass and never persisted. Each bucket is sorted by
//! the site's natural ordering and then reversed, so the newest document comes
//! first regardless of which collection it came from. The per-bucket `order`
//! sort happens later, at planning time.

use crate::corpus::{CategorySource, Document, DocumentOrdering, Site};
use std::collections::BTreeMap;

/// Buckets keyed by label, labels in lexical order.
pub type CategoryIndex<'a> = BTreeMap<String, Vec<&'a Document>>;

/// Build the index for `site`, honouring its [`CategorySource`].
pub fn index(site: &Site) -> CategoryIndex<'_> {
    match site.category_source() {
        CategorySource::Collections => index_documents(
            site.collections().iter().flat_map(|c| c.documents.iter()),
            site.ordering(),
        ),
        CategorySource::PostsOnly => legacy_post_categories(site),
    }
}

/// Compatibility path for pre-3.0 corpora, where only posts had categories.
fn legacy_post_categories(site: &Site) -> CategoryIndex<'_> {
    index_documents(site.posts().iter(), site.ordering())
}

/// Group `documents` by label; each bucket sorted by `ordering`, then reversed.
pub fn index_documents<'a>(
    documents: impl Iterator<Item = &'a Document>,
    ordering: DocumentOrdering,
) -> CategoryIndex<'a> {
    let mut index = CategoryIndex::new();
    for document in documents {
        for label in &document.categories {
            index.entry(label.clone()).or_default().push(document);
        }
    }
    for bucket in index.values_mut() {
        bucket.sort_by(|a, b| ordering(a, b));
        bucket.reverse();
    }
    index
}
