//! The generation pass: every output format × every target, then PDF
//! post-processing.
//!
//! ## Pass structure
//!
//! ```text
//! index categories (once)
//! for each output format:
//!     plan targets          (plan.rs, three phases)
//!     resolve claims        (collisions and opt-outs, plan order)
//!     convert               (rayon pool, parallel rounds)
//!     register              (KeptFiles + artifact list, plan order)
//! post-process PDFs         (postprocess.rs, artifact order)
//! ```
//!
//! Claims are resolved before any conversion runs: a target's path is claimed
//! if it is not already kept and no earlier target of the same format claimed
//! it. Claimed targets convert in parallel. When a claimant fails, nothing is
//! registered for its path, so the next target in plan order that wanted the
//! same path takes over and converts in a follow-up round. The outcome is the
//! one a strictly sequential pass would reach: a target is a collision only
//! when an earlier target actually registered its path.
//!
//! Nothing that happens to a single target aborts the pass. Conversion
//! failures, opt-outs and collisions are recorded in the [`PassReport`] and
//! streamed as [`PassEvent`]s; only a configuration problem is a
//! [`PassError`].

use crate::categories;
use crate::config::{self, ConfigError, OutputFormat, PressConfig};
use crate::corpus::Site;
use crate::keep::KeptFiles;
use crate::plan::{GenerationTarget, PlannedTarget, plan};
use crate::postprocess::{self, DerivativeKind};
use crate::tools::params::{ConversionJob, Metadata, PdfLayout};
use crate::tools::{Converter, PdfTools};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PassError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// PDF-only attributes of an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfArtifact {
    pub layout: PdfLayout,
    /// Cover image to merge in front of the body.
    pub cover: Option<PathBuf>,
}

/// One generated file.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub format: String,
    /// Identity of the target it was generated from.
    pub source: String,
    pub title: String,
    /// Relative to the destination, `/`-separated.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub pdf: Option<PdfArtifact>,
}

/// A target skipped because its output path was already taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub format: String,
    /// Identity of the skipped target.
    pub source: String,
    pub is_category: bool,
    pub relative_path: String,
    /// Identity of the target that holds the path, when it is known.
    pub owner: Option<String>,
}

/// Which step of the pass failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Convert,
    Impose,
    Binder,
    Cover,
}

/// A failed step. The pass continues; only this output is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub step: Step,
    /// Target identity for conversions, primary relative path otherwise.
    pub subject: String,
    pub error: String,
}

/// A registered PDF derivative.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivative {
    pub kind: DerivativeKind,
    /// Relative path of the primary artifact.
    pub source: String,
    pub relative_path: String,
}

/// Progress events, streamed while the pass runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PassEvent {
    FormatStarted {
        format: String,
        targets: usize,
    },
    Generated {
        /// 1-based position among the format's generated artifacts.
        index: usize,
        title: String,
        relative_path: String,
    },
    Excluded {
        source: String,
    },
    Collision(Collision),
    Failed(Failure),
    PostprocessStarted {
        artifacts: usize,
    },
    Derived(Derivative),
    /// A cover page was merged into this primary, in place.
    Covered {
        relative_path: String,
    },
}

/// Everything a pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// `pandoc.skip` was set; nothing ran.
    pub skipped: bool,
    /// Generated artifacts, in generation order.
    pub artifacts: Vec<Artifact>,
    pub derivatives: Vec<Derivative>,
    /// Primaries that had their cover merged in. Not new files.
    pub covered: Vec<String>,
    pub collisions: Vec<Collision>,
    pub failures: Vec<Failure>,
    /// Identities of opted-out targets, one entry per format.
    pub excluded: Vec<String>,
}

/// What a planned target will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Path is free: convert and register.
    Generate,
    /// Path already taken; skip with a diagnostic.
    Collision,
    /// Opted out; skip silently.
    Excluded,
}

/// A planned target with its claim.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget<'a> {
    pub planned: PlannedTarget<'a>,
    pub claim: Claim,
    /// For collisions: who holds the path.
    pub owner: Option<String>,
}

/// The resolved plan of one format.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatPlan<'a> {
    pub format: OutputFormat,
    pub targets: Vec<ResolvedTarget<'a>>,
}

/// Paths registered in this pass, with the identity that produced them.
pub type Owners = HashMap<String, String>;

/// Resolve claims for one format's targets, in plan order.
///
/// `owners` names who holds paths registered earlier in the pass; a kept path
/// missing from it was registered by someone else.
pub fn resolve_claims<'a>(
    planned: Vec<PlannedTarget<'a>>,
    kept: &KeptFiles,
    owners: &Owners,
) -> Vec<ResolvedTarget<'a>> {
    let mut claimed: HashMap<String, String> = HashMap::new();
    planned
        .into_iter()
        .map(|planned| {
            let path = &planned.relative_path;
            let (claim, owner) = if let Some(owner) = claimed.get(path) {
                (Claim::Collision, Some(owner.clone()))
            } else if kept.contains(path) {
                (Claim::Collision, owners.get(path).cloned())
            } else if planned.target.is_excluded() {
                (Claim::Excluded, None)
            } else {
                claimed.insert(path.clone(), planned.target.identity());
                (Claim::Generate, None)
            };
            ResolvedTarget {
                planned,
                claim,
                owner,
            }
        })
        .collect()
}

/// Plan and resolve every format without running any tool.
///
/// Each format's claims are treated as registered before the next format is
/// resolved, exactly as a successful build would.
pub fn resolve_pass<'a>(site: &'a Site, config: &PressConfig) -> Vec<FormatPlan<'a>> {
    let index = categories::index(site);
    let mut kept = KeptFiles::new();
    let mut owners = Owners::new();
    let mut plans = Vec::new();
    for format in &config.pandoc.outputs {
        let targets = resolve_claims(plan(format, site, &index, config), &kept, &owners);
        for resolved in targets.iter().filter(|t| t.claim == Claim::Generate) {
            kept.insert(&resolved.planned.relative_path);
            owners.insert(
                resolved.planned.relative_path.clone(),
                resolved.planned.target.identity(),
            );
        }
        plans.push(FormatPlan {
            format: format.clone(),
            targets,
        });
    }
    plans
}

/// The destination directory: `site.destination`, relative to the site root.
pub fn destination(site: &Site, config: &PressConfig) -> PathBuf {
    site.root().join(&config.site.destination)
}

/// Build the pandoc job for one target.
pub fn conversion_job(
    target: &GenerationTarget,
    format: &OutputFormat,
    config: &PressConfig,
    output: PathBuf,
) -> ConversionJob {
    let mut flags = config::split_flags(&config.pandoc.flags);
    flags.extend(config::split_flags(&config.pandoc.site_flags));
    if target.is_category() {
        flags.extend(config::split_flags(&config.pandoc.full_flags));
    }
    flags.extend(config::split_flags(&format.flags));

    let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());
    let metadata = match target {
        GenerationTarget::Document(doc) => Metadata {
            title: doc.title.clone(),
            subtitle: None,
            author: doc.field("author").or_else(|| non_empty(&config.site.author)),
            date: doc.date.map(|d| d.format("%Y-%m-%d").to_string()),
            lang: doc.field("lang").or_else(|| non_empty(&config.site.lang)),
        },
        GenerationTarget::Category { label, .. } => Metadata {
            title: label.clone(),
            subtitle: non_empty(&config.site.title),
            author: non_empty(&config.site.author),
            date: None,
            lang: non_empty(&config.site.lang),
        },
    };

    let content = match target {
        GenerationTarget::Document(doc) => doc.body.clone(),
        GenerationTarget::Category { documents, .. } => documents
            .iter()
            .map(|doc| format!("# {}\n\n{}\n", doc.title, doc.body.trim_end()))
            .collect::<Vec<_>>()
            .join("\n"),
    };

    ConversionJob {
        format: format.clone(),
        flags,
        metadata,
        content,
        output,
        papersize: format
            .is_pdf()
            .then(|| target.pdf_layout(config).papersize),
    }
}

fn not_converted() -> Result<(), String> {
    Err("conversion did not run".to_string())
}

/// Convert every claimed target, one parallel round at a time.
///
/// A failed claimant registers nothing, so its path is still free: the next
/// target in plan order that lost the path to it takes the claim over and is
/// converted in the following round. Results are indexed like `targets`.
fn convert_claims(
    targets: &mut [ResolvedTarget],
    format: &OutputFormat,
    config: &PressConfig,
    destination: &Path,
    converter: &impl Converter,
) -> Vec<Option<Result<(), String>>> {
    let mut results: Vec<Option<Result<(), String>>> = vec![None; targets.len()];
    let mut round: Vec<usize> = (0..targets.len())
        .filter(|&i| targets[i].claim == Claim::Generate)
        .collect();

    while !round.is_empty() {
        let view: &[ResolvedTarget] = targets;
        let outcomes: Vec<(usize, Result<(), String>)> = round
            .par_iter()
            .map(|&i| {
                let planned = &view[i].planned;
                let job = conversion_job(
                    &planned.target,
                    format,
                    config,
                    destination.join(&planned.relative_path),
                );
                (i, converter.convert(&job).map_err(|e| e.to_string()))
            })
            .collect();

        let mut next = Vec::new();
        for (i, outcome) in outcomes {
            let failed = outcome.is_err();
            results[i] = Some(outcome);
            if failed && let Some(successor) = promote_successor(targets, i) {
                debug!(
                    path = %targets[successor].planned.relative_path,
                    source = %targets[successor].planned.target.identity(),
                    "claimant failed, path passes to the next target"
                );
                next.push(successor);
            }
        }
        round = next;
    }
    results
}

/// Hand the path of the failed claimant at `failed` to the first later target
/// that collided with it. Opted-out targets on the way become exclusions;
/// targets after the successor now name it as owner.
fn promote_successor(targets: &mut [ResolvedTarget], failed: usize) -> Option<usize> {
    let path = targets[failed].planned.relative_path.clone();
    let mut successor: Option<(usize, String)> = None;
    for (j, target) in targets.iter_mut().enumerate().skip(failed + 1) {
        if target.claim != Claim::Collision || target.planned.relative_path != path {
            continue;
        }
        match &successor {
            Some((_, holder)) => target.owner = Some(holder.clone()),
            None if target.planned.target.is_excluded() => {
                target.claim = Claim::Excluded;
                target.owner = None;
            }
            None => {
                target.claim = Claim::Generate;
                target.owner = None;
                successor = Some((j, target.planned.target.identity()));
            }
        }
    }
    successor.map(|(j, _)| j)
}

pub(crate) fn emit(events: &Option<Sender<PassEvent>>, event: PassEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

/// Run one full generation pass.
///
/// `kept` is the pass's accumulator; every registered output and derivative
/// is appended to it. Conversions fan out over the global rayon pool.
pub fn run_pass(
    site: &Site,
    config: &PressConfig,
    converter: &impl Converter,
    tools: &impl PdfTools,
    kept: &mut KeptFiles,
    events: Option<Sender<PassEvent>>,
) -> Result<PassReport, PassError> {
    let mut report = PassReport::default();
    if config.pandoc.skip {
        info!("pandoc.skip is set, skipping generation");
        report.skipped = true;
        return Ok(report);
    }
    config.validate()?;

    let destination = destination(site, config);
    fs::create_dir_all(&destination)?;
    let index = categories::index(site);
    let mut owners = Owners::new();

    for format in &config.pandoc.outputs {
        let planned = plan(format, site, &index, config);
        emit(
            &events,
            PassEvent::FormatStarted {
                format: format.format.clone(),
                targets: planned.len(),
            },
        );
        let mut resolved = resolve_claims(planned, kept, &owners);
        let results = convert_claims(&mut resolved, format, config, &destination, converter);

        let mut generated = 0;
        for (resolved, result) in resolved.into_iter().zip(results) {
            let ResolvedTarget {
                planned,
                claim,
                owner,
            } = resolved;
            let source = planned.target.identity();
            match (claim, result) {
                (Claim::Collision, _) => {
                    let collision = Collision {
                        format: format.format.clone(),
                        source,
                        is_category: planned.target.is_category(),
                        relative_path: planned.relative_path,
                        owner,
                    };
                    let remedy = if collision.is_category {
                        "rename the category"
                    } else {
                        "rename the document"
                    };
                    warn!(
                        format = %collision.format,
                        path = %collision.relative_path,
                        source = %collision.source,
                        remedy,
                        "output path already generated, skipping"
                    );
                    emit(&events, PassEvent::Collision(collision.clone()));
                    report.collisions.push(collision);
                }
                (Claim::Excluded, _) => {
                    debug!(source = %source, "excluded from generation");
                    emit(&events, PassEvent::Excluded { source: source.clone() });
                    report.excluded.push(source);
                }
                (Claim::Generate, result) => match result.unwrap_or_else(not_converted) {
                    Ok(()) => {
                        kept.insert(&planned.relative_path);
                        owners.insert(planned.relative_path.clone(), source.clone());
                        generated += 1;
                        emit(
                            &events,
                            PassEvent::Generated {
                                index: generated,
                                title: planned.target.title().to_string(),
                                relative_path: planned.relative_path.clone(),
                            },
                        );
                        let pdf = format.is_pdf().then(|| PdfArtifact {
                            layout: planned.target.pdf_layout(config),
                            cover: planned.target.cover(site, config),
                        });
                        report.artifacts.push(Artifact {
                            format: format.format.clone(),
                            source,
                            title: planned.target.title().to_string(),
                            absolute_path: destination.join(&planned.relative_path),
                            relative_path: planned.relative_path,
                            pdf,
                        });
                    }
                    Err(error) => {
                        warn!(
                            format = %format.format,
                            source = %source,
                            %error,
                            "conversion failed"
                        );
                        let failure = Failure {
                            step: Step::Convert,
                            subject: source,
                            error,
                        };
                        emit(&events, PassEvent::Failed(failure.clone()));
                        report.failures.push(failure);
                    }
                },
            }
        }
    }

    let outcome = postprocess::run(
        &report.artifacts,
        tools,
        config,
        &destination,
        kept,
        &events,
    );
    report.derivatives = outcome.derivatives;
    report.covered = outcome.covered;
    report.failures.extend(outcome.failures);
    Ok(report)
}
