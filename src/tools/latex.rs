//! PDF tools built on pdflatex and the `pdfpages` package.
//!
//! Every transform writes a small LaTeX document into a scratch directory,
//! copies its input files next to it under fixed names (so no site path ever
//! needs TeX escaping), compiles, and copies the result to the job's output.
//! Page counts come from lopdf; the page orderings come from
//! [`layout`](super::layout).

use super::backend::{PdfTools, ToolError, run_tool};
use super::layout::{self, PaperSize};
use super::params::{BindJob, CoverJob, ImposeJob, UniteJob};
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Runs the LaTeX engine (`pdflatex` by default).
#[derive(Debug, Clone)]
pub struct LatexTools {
    program: String,
}

impl LatexTools {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    /// Compile `tex` with `attachments` copied in as `(name, source)` pairs.
    fn compile(
        &self,
        tex: &str,
        attachments: &[(String, &Path)],
        output: &Path,
    ) -> Result<(), ToolError> {
        let scratch = tempfile::TempDir::new()?;
        for (name, source) in attachments {
            fs::copy(source, scratch.path().join(name))?;
        }
        fs::write(scratch.path().join("job.tex"), tex)?;

        let mut command = Command::new(&self.program);
        command
            .args(["-interaction=nonstopmode", "-halt-on-error", "job.tex"])
            .current_dir(scratch.path());
        run_tool(&self.program, &mut command)?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(scratch.path().join("job.pdf"), output)?;
        debug!(output = %output.display(), "compiled PDF");
        Ok(())
    }
}

/// Number of pages in the PDF at `path`.
pub fn page_count(path: &Path) -> Result<usize, ToolError> {
    let document = lopdf::Document::load(path).map_err(|e| ToolError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(document.get_pages().len())
}

fn per_side(papersize: PaperSize, sheetsize: PaperSize) -> Result<u32, ToolError> {
    layout::pages_per_side(papersize, sheetsize).ok_or_else(|| {
        ToolError::Layout(format!(
            "{} pages do not fit on {} sheets",
            papersize.short_name(),
            sheetsize.short_name()
        ))
    })
}

/// A pdfpages document placing `slots` of `input0.pdf` on `sheetsize` sheets.
pub fn nup_document(slots: &[Option<usize>], per_side: u32, sheetsize: PaperSize) -> String {
    let (columns, rows, landscape) = layout::nup_grid(per_side);
    let orientation = if landscape { ",landscape" } else { "" };
    format!(
        "\\documentclass[{paper}{orientation}]{{article}}\n\
         \\usepackage{{pdfpages}}\n\
         \\begin{{document}}\n\
         \\includepdf[pages={{{pages}}},nup={columns}x{rows}{orientation}]{{input0.pdf}}\n\
         \\end{{document}}\n",
        paper = sheetsize.latex_name(),
        pages = layout::pdfpages_list(slots),
    )
}

/// A one-page document showing `cover.<ext>` scaled to `papersize`.
pub fn cover_document(image_name: &str, papersize: PaperSize) -> String {
    format!(
        "\\documentclass[{paper}]{{article}}\n\
         \\usepackage{{pdfpages}}\n\
         \\begin{{document}}\n\
         \\includepdf[fitpaper=false]{{{image_name}}}\n\
         \\end{{document}}\n",
        paper = papersize.latex_name(),
    )
}

/// Concatenates `count` attached PDFs, keeping each page's own size.
pub fn unite_document(count: usize) -> String {
    let mut tex =
        String::from("\\documentclass{article}\n\\usepackage{pdfpages}\n\\begin{document}\n");
    for i in 0..count {
        tex.push_str(&format!("\\includepdf[pages=-,fitpaper]{{input{i}.pdf}}\n"));
    }
    tex.push_str("\\end{document}\n");
    tex
}

impl PdfTools for LatexTools {
    fn impose(&self, job: &ImposeJob) -> Result<(), ToolError> {
        let per_side = per_side(job.layout.papersize, job.layout.sheetsize)?;
        if per_side != 2 {
            return Err(ToolError::Layout(format!(
                "imposition needs 2 pages per side, {} on {} gives {per_side}",
                job.layout.papersize.short_name(),
                job.layout.sheetsize.short_name()
            )));
        }
        let total = page_count(&job.input)?;
        let signature = layout::effective_signature(total, job.layout.signature);
        let slots = layout::imposition_order(&layout::impose(total, signature));
        let tex = nup_document(&slots, per_side, job.layout.sheetsize);
        self.compile(&tex, &[("input0.pdf".to_string(), &job.input)], &job.output)
    }

    fn bind(&self, job: &BindJob) -> Result<(), ToolError> {
        let per_side = per_side(job.papersize, job.sheetsize)?;
        let total = page_count(&job.input)?;
        let slots = layout::binder_order(total, per_side);
        let tex = nup_document(&slots, per_side, job.sheetsize);
        self.compile(&tex, &[("input0.pdf".to_string(), &job.input)], &job.output)
    }

    fn render_cover(&self, job: &CoverJob) -> Result<(), ToolError> {
        let name = match job.image.extension() {
            Some(ext) => format!("cover.{}", ext.to_string_lossy().to_ascii_lowercase()),
            None => "cover.png".to_string(),
        };
        let tex = cover_document(&name, job.papersize);
        self.compile(&tex, &[(name, &job.image)], &job.output)
    }

    fn unite(&self, job: &UniteJob) -> Result<(), ToolError> {
        let attachments: Vec<(String, &Path)> = job
            .inputs
            .iter()
            .enumerate()
            .map(|(i, p)| (format!("input{i}.pdf"), p.as_path()))
            .collect();
        let tex = unite_document(job.inputs.len());
        self.compile(&tex, &attachments, &job.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::params::PdfLayout;
    use std::path::PathBuf;

    #[test]
    fn imposition_document_is_two_up_landscape() {
        let tex = nup_document(&[Some(3), Some(0), Some(1), Some(2)], 2, PaperSize::A4);
        assert!(tex.starts_with("\\documentclass[a4paper,landscape]{article}"));
        assert!(tex.contains("pages={4,1,2,3},nup=2x1,landscape"));
        assert!(tex.contains("{input0.pdf}"));
    }

    #[test]
    fn four_up_is_portrait() {
        let tex = nup_document(&[Some(0); 4], 4, PaperSize::A4);
        assert!(tex.starts_with("\\documentclass[a4paper]{article}"));
        assert!(tex.contains("nup=2x2]"));
    }

    #[test]
    fn cover_document_uses_page_size() {
        let tex = cover_document("cover.png", PaperSize::A5);
        assert!(tex.contains("[a5paper]"));
        assert!(tex.contains("{cover.png}"));
    }

    #[test]
    fn unite_document_keeps_order() {
        let tex = unite_document(2);
        let first = tex.find("input0.pdf").unwrap();
        let second = tex.find("input1.pdf").unwrap();
        assert!(first < second);
    }

    #[test]
    fn page_count_of_garbage_is_pdf_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bad.pdf");
        fs::write(&path, "not a pdf").unwrap();
        assert!(matches!(page_count(&path), Err(ToolError::Pdf { .. })));
    }

    #[test]
    fn impose_rejects_non_two_up_layouts() {
        let tmp = tempfile::TempDir::new().unwrap();
        let input = tmp.path().join("a.pdf");
        fs::write(&input, "x").unwrap();
        let job = ImposeJob::new(
            &input,
            PdfLayout {
                papersize: PaperSize::A4,
                sheetsize: PaperSize::A4,
                signature: 0,
            },
        );
        let err = LatexTools::new("pdflatex").impose(&job).unwrap_err();
        assert!(matches!(err, ToolError::Layout(_)));
        assert!(!job.output.exists());
    }

    #[test]
    fn page_larger_than_sheet_is_layout_error() {
        let job = BindJob {
            input: PathBuf::from("a.pdf"),
            output: PathBuf::from("a-binder.pdf"),
            papersize: PaperSize::A4,
            sheetsize: PaperSize::A5,
        };
        let err = LatexTools::new("pdflatex").bind(&job).unwrap_err();
        assert!(matches!(err, ToolError::Layout(_)));
    }
}
