//! Job descriptions for the external tools.
//!
//! These structs describe *what* to produce, not *how*. They are the interface
//! between the pass (which decides what files to create and where) and the
//! backends (which run pandoc and pdflatex). Swapping backends for a mock in
//! tests changes nothing on the orchestration side.
//!
//! Every PDF job declares its output path up front so the caller can compute
//! the path to register before the tool runs.

use super::layout::PaperSize;
use crate::config::OutputFormat;
use std::path::{Path, PathBuf};

/// Metadata block prepended to the pandoc input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: String,
    /// Set for category bundles: the site title.
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub lang: Option<String>,
}

/// One pandoc run: one markdown document in, one file out.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    pub format: OutputFormat,
    /// Extra flags in application order.
    pub flags: Vec<String>,
    pub metadata: Metadata,
    /// Markdown body (without the metadata block).
    pub content: String,
    pub output: PathBuf,
    /// Logical page size, PDF only.
    pub papersize: Option<PaperSize>,
}

/// Page and sheet geometry of a PDF artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfLayout {
    pub papersize: PaperSize,
    pub sheetsize: PaperSize,
    /// Pages per signature, 0 for the whole document.
    pub signature: u32,
}

/// Re-arrange a PDF into saddle-stitch signatures.
#[derive(Debug, Clone, PartialEq)]
pub struct ImposeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub layout: PdfLayout,
}

impl ImposeJob {
    pub fn new(input: &Path, layout: PdfLayout) -> Self {
        Self {
            input: input.to_path_buf(),
            output: derived_path(input, "imposed"),
            layout,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn relative_path(&self, destination: &Path) -> Option<String> {
        relative_to(destination, &self.output)
    }
}

/// Repeat every page across its sheet side for a binding copy.
#[derive(Debug, Clone, PartialEq)]
pub struct BindJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub papersize: PaperSize,
    pub sheetsize: PaperSize,
}

impl BindJob {
    pub fn new(input: &Path, layout: PdfLayout) -> Self {
        Self {
            input: input.to_path_buf(),
            output: derived_path(input, "binder"),
            papersize: layout.papersize,
            sheetsize: layout.sheetsize,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn relative_path(&self, destination: &Path) -> Option<String> {
        relative_to(destination, &self.output)
    }
}

/// Render a cover image as a single full-bleed PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverJob {
    pub image: PathBuf,
    pub output: PathBuf,
    pub papersize: PaperSize,
}

/// Concatenate PDFs, in order, into one file.
#[derive(Debug, Clone, PartialEq)]
pub struct UniteJob {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

impl UniteJob {
    /// Cover first, then the body, merged into `output`.
    pub fn cover_and_body(cover: &Path, body: &Path, output: &Path) -> Self {
        Self {
            inputs: vec![cover.to_path_buf(), body.to_path_buf()],
            output: output.to_path_buf(),
        }
    }
}

/// `dir/book.pdf` + `imposed` → `dir/book-imposed.pdf`.
pub fn derived_path(primary: &Path, suffix: &str) -> PathBuf {
    let stem = primary
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match primary.extension() {
        Some(ext) => format!("{stem}-{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{suffix}"),
    };
    primary.with_file_name(name)
}

/// Path of `path` under `root`, `/`-separated. `None` if it is not under `root`.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a5_on_a4() -> PdfLayout {
        PdfLayout {
            papersize: PaperSize::A5,
            sheetsize: PaperSize::A4,
            signature: 0,
        }
    }

    #[test]
    fn derived_path_inserts_suffix_before_extension() {
        assert_eq!(
            derived_path(Path::new("/site/pdf/tips.pdf"), "imposed"),
            PathBuf::from("/site/pdf/tips-imposed.pdf")
        );
        assert_eq!(
            derived_path(Path::new("/site/book"), "cover"),
            PathBuf::from("/site/book-cover")
        );
    }

    #[test]
    fn derived_path_only_touches_final_extension() {
        assert_eq!(
            derived_path(Path::new("/site/v1.2/notes.pdf"), "binder"),
            PathBuf::from("/site/v1.2/notes-binder.pdf")
        );
    }

    #[test]
    fn impose_job_relative_path() {
        let job = ImposeJob::new(Path::new("/dest/pdf/tips.pdf"), a5_on_a4());
        assert_eq!(
            job.relative_path(Path::new("/dest")).as_deref(),
            Some("pdf/tips-imposed.pdf")
        );
    }

    #[test]
    fn bind_job_relative_path() {
        let job = BindJob::new(Path::new("/dest/pdf/tips.pdf"), a5_on_a4());
        assert_eq!(
            job.relative_path(Path::new("/dest")).as_deref(),
            Some("pdf/tips-binder.pdf")
        );
    }

    #[test]
    fn unite_puts_cover_first() {
        let job = UniteJob::cover_and_body(
            Path::new("/tmp/cover.pdf"),
            Path::new("/d/a.pdf"),
            Path::new("/d/.a-cover.x.pdf"),
        );
        assert_eq!(
            job.inputs,
            vec![PathBuf::from("/tmp/cover.pdf"), PathBuf::from("/d/a.pdf")]
        );
        assert_eq!(job.output, PathBuf::from("/d/.a-cover.x.pdf"));
    }

    #[test]
    fn relative_to_outside_root_is_none() {
        assert_eq!(relative_to(Path::new("/dest"), Path::new("/other/a.pdf")), None);
    }
}
