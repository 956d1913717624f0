//! External document tools: pandoc for conversion, pdflatex for PDF transforms.
//!
//! | Operation | Tool |
//! |---|---|
//! | **Convert** | `pandoc --to <writer>` (LaTeX writer for PDF) |
//! | **Impose** | `pdflatex` + `pdfpages`, saddle-stitch order |
//! | **Binder** | `pdflatex` + `pdfpages`, each page repeated n-up |
//! | **Cover** | `pdflatex` + `pdfpages`, image scaled to the page |
//! | **Unite** | `pdflatex` + `pdfpages`, inputs concatenated |
//! | **Page count** | `lopdf` |
//!
//! The module is split into:
//! - **Layout**: pure page-ordering math (unit testable)
//! - **Parameters**: job structs describing each operation
//! - **Backend**: [`Converter`] and [`PdfTools`] traits
//! - **Pandoc** / **Latex**: the production implementations

pub mod backend;
pub mod latex;
pub mod layout;
pub mod pandoc;
pub mod params;

pub use backend::{Converter, PdfTools, ToolError};
pub use latex::LatexTools;
pub use layout::PaperSize;
pub use pandoc::PandocBackend;
pub use params::{BindJob, ConversionJob, CoverJob, ImposeJob, Metadata, PdfLayout, UniteJob};
