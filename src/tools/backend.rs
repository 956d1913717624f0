//! Tool backend traits and shared error type.
//!
//! [`Converter`] turns markdown into one rendered file; [`PdfTools`] covers the
//! four PDF transforms the post-processor chains together. The production
//! implementations shell out: [`PandocBackend`](super::pandoc::PandocBackend)
//! and [`LatexTools`](super::latex::LatexTools). Every call blocks until the
//! tool exits and either produces a complete file or fails as a whole.

use super::params::{BindJob, ConversionJob, CoverJob, ImposeJob, UniteJob};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("Unreadable PDF {}: {message}", .path.display())]
    Pdf { path: PathBuf, message: String },
    #[error("Layout error: {0}")]
    Layout(String),
}

/// Runs the document conversion for one target.
///
/// `Sync` so conversions can fan out across the rayon pool.
pub trait Converter: Sync {
    fn convert(&self, job: &ConversionJob) -> Result<(), ToolError>;
}

/// The PDF transforms used by post-processing.
pub trait PdfTools {
    /// Write the imposed copy of `job.input` to `job.output`.
    fn impose(&self, job: &ImposeJob) -> Result<(), ToolError>;

    /// Write the binder copy of `job.input` to `job.output`.
    fn bind(&self, job: &BindJob) -> Result<(), ToolError>;

    /// Render a cover image into a one-page PDF.
    fn render_cover(&self, job: &CoverJob) -> Result<(), ToolError>;

    /// Concatenate `job.inputs` into `job.output`.
    fn unite(&self, job: &UniteJob) -> Result<(), ToolError>;
}

/// Run `command` to completion, mapping launch errors and non-zero exits.
///
/// stdout is discarded; stderr is captured for the error message.
pub(crate) fn run_tool(tool: &str, command: &mut Command) -> Result<(), ToolError> {
    debug!(tool, command = ?command, "running external tool");
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ToolError::Launch {
            program: command.get_program().to_string_lossy().into_owned(),
            source,
        })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
