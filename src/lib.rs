//! # Pandoc Press
//!
//! Renders a site's markdown documents through pandoc into any number of
//! output formats, plus one bundle per category holding all of that
//! category's documents. PDF outputs get print-ready derivatives: a 2-up
//! imposed copy, a ring-binder copy, and a cover page merged in place.
//!
//! # Architecture: One Pass, Four Steps
//!
//! ```text
//! 1. Scan        site/            →  Site            (collections, front matter)
//! 2. Index       Site             →  CategoryIndex   (category → documents)
//! 3. Plan        Site + index     →  targets         (per format, three phases)
//! 4. Generate    targets          →  destination/    (pandoc, then PDF post-processing)
//! ```
//!
//! Every file the pass produces is registered in a [`keep::KeptFiles`] set.
//! Registration doubles as collision detection: a target whose output path is
//! already kept is skipped with a diagnostic, never overwritten.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`corpus`] | Walks the collection directories into a [`corpus::Site`] |
//! | [`frontmatter`] | YAML front matter splitting and typed field access |
//! | [`naming`] | `YYYY-MM-DD-slug` filename parsing and slugification |
//! | [`categories`] | Category index, newest documents first |
//! | [`plan`] | Generation targets and permalink rendering |
//! | [`generate`] | The pass: claims, parallel conversion, registration |
//! | [`postprocess`] | Imposition, binder and cover derivatives of PDF artifacts |
//! | [`keep`] | The kept-files set, its manifest, and stale-file cleanup |
//! | [`tools`] | External tools: pandoc and pdflatex behind traits, layout math |
//! | [`config`] | `config.toml` loading, stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## External Tools Behind Traits
//!
//! Conversion goes through [`tools::Converter`] and post-processing through
//! [`tools::PdfTools`]. The real implementations shell out to `pandoc` and
//! `pdflatex`; tests use recording mocks, so the whole pass runs without
//! either binary installed.
//!
//! ## Plan Order Decides Collisions
//!
//! Targets are planned in a fixed order: primary-collection documents, then
//! other collections, then category bundles. Within a format, the first target
//! to claim a path converts; if it fails, the next one in plan order gets the
//! path. Conversions fan out over rayon in rounds, and registration follows
//! plan order, so the result stays deterministic.

pub mod categories;
pub mod config;
pub mod corpus;
pub mod frontmatter;
pub mod generate;
pub mod keep;
pub mod naming;
pub mod output;
pub mod plan;
pub mod postprocess;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_helpers;
