//! Pure layout calculations for print-ready PDFs.
//!
//! All functions here are pure and testable without any PDF or LaTeX.
//!
//! ## Paper sizes
//!
//! Only ISO A-series sizes are supported. Halving an A-series sheet gives the
//! next size down, so the number of logical pages that fit on one side of a
//! sheet is always a power of two: an A5 page on an A4 sheet is 2-up, A6 on A4
//! is 4-up, and so on.
//!
//! ## Saddle-stitch imposition
//!
//! A **signature** is a group of nested sheets folded together. Each sheet
//! carries four logical pages (two per side), so a signature of N pages (N
//! divisible by 4) is printed on N/4 sheets. For a 16-page signature:
//!
//! ```text
//! Sheet 1 front: 16, 1     Sheet 1 back: 2, 15
//! Sheet 2 front: 14, 3     Sheet 2 back: 4, 13
//! Sheet 3 front: 12, 5     Sheet 3 back: 6, 11
//! Sheet 4 front: 10, 7     Sheet 4 back: 8, 9
//! ```
//!
//! Slots past the end of the document stay blank.

/// An ISO A-series size, `A0` (largest) to `A10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PaperSize(u8);

impl PaperSize {
    pub const A4: PaperSize = PaperSize(4);
    pub const A5: PaperSize = PaperSize(5);

    /// Parse `a5`, `A5` or `a5paper`.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let stem = lower.strip_suffix("paper").unwrap_or(&lower);
        let digits = stem.strip_prefix('a')?;
        let index: u8 = digits.parse().ok()?;
        (index <= 10 && !digits.starts_with('+')).then_some(Self(index))
    }

    /// The LaTeX class option, e.g. `a5paper`.
    pub fn latex_name(self) -> String {
        format!("a{}paper", self.0)
    }

    /// The bare name pandoc's `papersize` variable expects, e.g. `a5`.
    pub fn short_name(self) -> String {
        format!("a{}", self.0)
    }
}

/// How many pages of `paper` fit on one side of a `sheet`.
///
/// Returns `None` when the page is larger than the sheet.
pub fn pages_per_side(paper: PaperSize, sheet: PaperSize) -> Option<u32> {
    let steps = paper.0.checked_sub(sheet.0)?;
    1u32.checked_shl(steps as u32)
}

/// The pdfpages `nup` grid (columns, rows) and orientation for `pages` per side.
///
/// Odd powers of two lay out in landscape, even powers in portrait.
pub fn nup_grid(pages: u32) -> (u32, u32, bool) {
    let power = pages.max(1).trailing_zeros();
    let rows = 1 << (power / 2);
    let columns = 1 << (power - power / 2);
    (columns, rows, power % 2 == 1)
}

/// One side of a printed sheet: left and right page slots (0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetSide {
    pub left: Option<usize>,
    pub right: Option<usize>,
}

/// A printed sheet, both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintSheet {
    pub front: SheetSide,
    pub back: SheetSide,
}

/// Sheets for a single signature of `signature_size` pages, 0-indexed.
///
/// `signature_size` must be a positive multiple of 4.
pub fn signature_sheets(signature_size: usize) -> Vec<PrintSheet> {
    debug_assert!(signature_size > 0 && signature_size % 4 == 0);
    let n = signature_size;
    (0..n / 4)
        .map(|s| PrintSheet {
            front: SheetSide {
                left: Some(n - 2 * s - 1),
                right: Some(2 * s),
            },
            back: SheetSide {
                left: Some(2 * s + 1),
                right: Some(n - 2 * s - 2),
            },
        })
        .collect()
}

/// Resolve the signature size for a document of `total_pages`.
///
/// `0` means the whole document is one signature, rounded up to a multiple of 4.
pub fn effective_signature(total_pages: usize, requested: u32) -> usize {
    if requested == 0 {
        total_pages.div_ceil(4).max(1) * 4
    } else {
        requested as usize
    }
}

/// Full imposition of `total_pages` into signatures, padded with blanks.
pub fn impose(total_pages: usize, signature_size: usize) -> Vec<PrintSheet> {
    let signatures = total_pages.div_ceil(signature_size);
    let remap = |start: usize, slot: Option<usize>| {
        slot.map(|idx| start + idx).filter(|&page| page < total_pages)
    };

    let mut sheets = Vec::with_capacity(signatures * signature_size / 4);
    for sig in 0..signatures {
        let start = sig * signature_size;
        for sheet in signature_sheets(signature_size) {
            sheets.push(PrintSheet {
                front: SheetSide {
                    left: remap(start, sheet.front.left),
                    right: remap(start, sheet.front.right),
                },
                back: SheetSide {
                    left: remap(start, sheet.back.left),
                    right: remap(start, sheet.back.right),
                },
            });
        }
    }
    sheets
}

/// Page slots in print order: front left, front right, back left, back right.
pub fn imposition_order(sheets: &[PrintSheet]) -> Vec<Option<usize>> {
    sheets
        .iter()
        .flat_map(|s| [s.front.left, s.front.right, s.back.left, s.back.right])
        .collect()
}

/// Binder order: every page repeated once per slot on its sheet side.
pub fn binder_order(total_pages: usize, per_side: u32) -> Vec<Option<usize>> {
    (0..total_pages)
        .flat_map(|page| std::iter::repeat_n(Some(page), per_side as usize))
        .collect()
}

/// Render slots as a pdfpages `pages=` list: 1-based, `{}` for blanks.
pub fn pdfpages_list(slots: &[Option<usize>]) -> String {
    slots
        .iter()
        .map(|slot| match slot {
            Some(page) => (page + 1).to_string(),
            None => "{}".to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}
