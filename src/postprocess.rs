//! PDF post-processing: imposition, binder and cover merge.
//!
//! Runs once per PDF artifact, in artifact order:
//!
//! ```text
//! primary.pdf ──(imposition on)──▶ primary-imposed.pdf   registered
//!      │
//!      ├──────(binder on)────────▶ primary-binder.pdf    registered
//!      │
//!      └──(has cover)──▶ render cover (temp dir)
//!                        └─▶ unite(cover, primary) ─▶ .primary-cover.XXXX.pdf
//!                            └─▶ persist onto primary.pdf
//! ```
//!
//! Imposition and binder both read the untouched primary and never depend on
//! each other or on the cover. Each step fails on its own: a failed step only
//! means its output is missing. A derived path some other target already
//! registered is never written; the step fails instead. The merged file
//! replaces the primary with a single rename, and only after the merge wrote
//! successfully, so the primary path always holds a complete PDF.

use crate::config::PressConfig;
use crate::generate::{Artifact, Derivative, Failure, PassEvent, Step, emit};
use crate::keep::KeptFiles;
use crate::tools::params::{BindJob, CoverJob, ImposeJob, UniteJob};
use crate::tools::{PaperSize, PdfTools, ToolError};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

/// The kinds of file derived from a primary PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeKind {
    Imposed,
    Binder,
}

impl DerivativeKind {
    pub fn label(self) -> &'static str {
        match self {
            DerivativeKind::Imposed => "imposed",
            DerivativeKind::Binder => "binder",
        }
    }
}

#[derive(Error, Debug)]
pub enum StepError {
    #[error("{0} is already generated by another target")]
    Occupied(String),
    #[error("{} is outside the destination", .0.display())]
    OutsideDestination(PathBuf),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Derivatives written, primaries covered and steps failed during
/// post-processing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostprocessOutcome {
    pub derivatives: Vec<Derivative>,
    /// Relative paths of primaries that now start with their cover page.
    pub covered: Vec<String>,
    pub failures: Vec<Failure>,
}

/// Post-process every PDF in `artifacts`. Other formats are ignored.
pub fn run(
    artifacts: &[Artifact],
    tools: &impl PdfTools,
    config: &PressConfig,
    destination: &Path,
    kept: &mut KeptFiles,
    events: &Option<Sender<PassEvent>>,
) -> PostprocessOutcome {
    let mut outcome = PostprocessOutcome::default();
    let pdfs: Vec<&Artifact> = artifacts.iter().filter(|a| a.pdf.is_some()).collect();
    if pdfs.is_empty() {
        return outcome;
    }
    emit(
        events,
        PassEvent::PostprocessStarted {
            artifacts: pdfs.len(),
        },
    );
    for artifact in pdfs {
        let mut recorder = Recorder {
            artifact,
            destination,
            events,
            kept: &mut *kept,
            outcome: &mut outcome,
        };
        postprocess_artifact(&mut recorder, tools, config);
    }
    outcome
}

/// Registration and reporting for the steps of one artifact.
struct Recorder<'r> {
    artifact: &'r Artifact,
    destination: &'r Path,
    events: &'r Option<Sender<PassEvent>>,
    kept: &'r mut KeptFiles,
    outcome: &'r mut PostprocessOutcome,
}

impl Recorder<'_> {
    /// The relative path a step may write to: under the destination and not
    /// registered by anyone yet.
    fn claim(&self, relative: Option<String>, output: &Path) -> Result<String, StepError> {
        let relative = relative.ok_or_else(|| StepError::OutsideDestination(output.to_path_buf()))?;
        if self.kept.contains(&relative) {
            return Err(StepError::Occupied(relative));
        }
        Ok(relative)
    }

    fn derived(&mut self, kind: DerivativeKind, step: Step, result: Result<String, StepError>) {
        match result {
            Ok(relative_path) => {
                self.kept.insert(&relative_path);
                let derivative = Derivative {
                    kind,
                    source: self.artifact.relative_path.clone(),
                    relative_path,
                };
                debug!(
                    kind = kind.label(),
                    path = %derivative.relative_path,
                    "derivative written"
                );
                emit(self.events, PassEvent::Derived(derivative.clone()));
                self.outcome.derivatives.push(derivative);
            }
            Err(e) => self.failed(step, e),
        }
    }

    fn covered(&mut self, result: Result<(), StepError>) {
        match result {
            Ok(()) => {
                let relative_path = self.artifact.relative_path.clone();
                debug!(path = %relative_path, "cover merged");
                emit(
                    self.events,
                    PassEvent::Covered {
                        relative_path: relative_path.clone(),
                    },
                );
                self.outcome.covered.push(relative_path);
            }
            Err(e) => self.failed(Step::Cover, e),
        }
    }

    fn failed(&mut self, step: Step, error: StepError) {
        warn!(
            ?step,
            artifact = %self.artifact.relative_path,
            %error,
            "post-processing step failed"
        );
        let failure = Failure {
            step,
            subject: self.artifact.relative_path.clone(),
            error: error.to_string(),
        };
        emit(self.events, PassEvent::Failed(failure.clone()));
        self.outcome.failures.push(failure);
    }
}

fn postprocess_artifact(recorder: &mut Recorder, tools: &impl PdfTools, config: &PressConfig) {
    let artifact = recorder.artifact;
    let destination = recorder.destination;
    let Some(pdf) = &artifact.pdf else {
        return;
    };

    if config.pandoc.imposition {
        let job = ImposeJob::new(&artifact.absolute_path, pdf.layout);
        let result = recorder
            .claim(job.relative_path(destination), job.output_path())
            .and_then(|relative| tools.impose(&job).map(|()| relative).map_err(StepError::from));
        recorder.derived(DerivativeKind::Imposed, Step::Impose, result);
    }

    if config.pandoc.binder {
        let job = BindJob::new(&artifact.absolute_path, pdf.layout);
        let result = recorder
            .claim(job.relative_path(destination), job.output_path())
            .and_then(|relative| tools.bind(&job).map(|()| relative).map_err(StepError::from));
        recorder.derived(DerivativeKind::Binder, Step::Binder, result);
    }

    if let Some(image) = &pdf.cover {
        let result = merge_cover(artifact, image, pdf.layout.papersize, tools);
        recorder.covered(result.map_err(StepError::from));
    }
}

/// Render the cover, unite it in front of the primary, persist onto the primary.
///
/// The merge is written to a fresh `<stem>-cover.*.pdf` temp file beside the
/// primary, so it can never land on another target's output. The temp file
/// is removed on any failure, leaving the primary as it was.
fn merge_cover(
    artifact: &Artifact,
    image: &Path,
    papersize: PaperSize,
    tools: &impl PdfTools,
) -> Result<(), ToolError> {
    let scratch = tempfile::TempDir::new()?;
    let cover = CoverJob {
        image: image.to_path_buf(),
        output: scratch.path().join("cover.pdf"),
        papersize,
    };
    tools.render_cover(&cover)?;

    let primary = &artifact.absolute_path;
    let parent = primary.parent().unwrap_or(Path::new("."));
    let stem = primary
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let merged = tempfile::Builder::new()
        .prefix(&format!(".{stem}-cover."))
        .suffix(".pdf")
        .tempfile_in(parent)?;

    tools.unite(&UniteJob::cover_and_body(&cover.output, primary, merged.path()))?;
    merged.persist(primary).map_err(|e| ToolError::Io(e.error))?;
    Ok(())
}
