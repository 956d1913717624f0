//! CLI output formatting for the build, check and clean commands.
//!
//! # Information-First Display
//!
//! Every generated file leads with its position and title, followed by `→`
//! and the output path. Problems are shown inline where they happen, with the
//! source identity so they can be traced back to a file.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! pdf (3 targets)
//!     001 Hello → pdf/posts/hello.pdf
//!     skipped _posts/2015-01-02-draft.md (pandoc: false)
//!     collision category:hello → pdf/hello.pdf, already generated for _posts/2015-01-01-hello.md; rename the category
//! Post-processing 1 PDF
//!     imposed → pdf/posts/hello-imposed.pdf
//!
//! Generated 1 file, 1 derivative (1 collision)
//! ```
//!
//! ## Check
//!
//! ```text
//! pdf
//!     001 Hello → pdf/posts/hello.pdf
//!         Source: _posts/2015-01-01-hello.md
//!     002 tips (2 documents) → pdf/tips.pdf
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::generate::{
    Claim, Collision, Failure, FormatPlan, PassEvent, PassReport, Step,
};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based position as a zero-padded 3-digit string.
fn format_index(pos: usize) -> String {
    format!("{:03}", pos)
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

fn step_label(step: Step) -> &'static str {
    match step {
        Step::Convert => "conversion",
        Step::Impose => "imposition",
        Step::Binder => "binder",
        Step::Cover => "cover",
    }
}

/// One-line collision diagnostic with the suggested fix.
pub fn format_collision(collision: &Collision) -> String {
    let holder = match &collision.owner {
        Some(owner) => format!("already generated for {owner}"),
        None => "already generated".to_string(),
    };
    let remedy = if collision.is_category {
        "rename the category"
    } else {
        "rename the document"
    };
    format!(
        "collision {} \u{2192} {}, {holder}; {remedy}",
        collision.source, collision.relative_path
    )
}

fn format_failure(failure: &Failure) -> String {
    format!(
        "failed {} of {}: {}",
        step_label(failure.step),
        failure.subject,
        failure.error
    )
}

// ============================================================================
// Build
// ============================================================================

/// Format a single pass progress event as display lines.
pub fn format_pass_event(event: &PassEvent) -> Vec<String> {
    match event {
        PassEvent::FormatStarted { format, targets } => {
            vec![format!("{format} ({})", plural(*targets, "target"))]
        }
        PassEvent::Generated {
            index,
            title,
            relative_path,
        } => vec![format!(
            "    {} {} \u{2192} {}",
            format_index(*index),
            title,
            relative_path
        )],
        PassEvent::Excluded { source } => vec![format!("    skipped {source} (pandoc: false)")],
        PassEvent::Collision(collision) => vec![format!("    {}", format_collision(collision))],
        PassEvent::Failed(failure) => vec![format!("    {}", format_failure(failure))],
        PassEvent::PostprocessStarted { artifacts } => {
            vec![format!("Post-processing {}", plural(*artifacts, "PDF"))]
        }
        PassEvent::Derived(derivative) => vec![format!(
            "    {} \u{2192} {}",
            derivative.kind.label(),
            derivative.relative_path
        )],
        PassEvent::Covered { relative_path } => {
            vec![format!("    cover \u{2192} {relative_path}")]
        }
    }
}

/// Closing summary of a build.
pub fn format_pass_summary(report: &PassReport) -> Vec<String> {
    if report.skipped {
        return vec!["Generation skipped (pandoc.skip = true)".to_string()];
    }
    let mut problems = Vec::new();
    if !report.collisions.is_empty() {
        problems.push(plural(report.collisions.len(), "collision"));
    }
    if !report.failures.is_empty() {
        problems.push(plural(report.failures.len(), "failure"));
    }
    let mut summary = format!(
        "Generated {}, {}",
        plural(report.artifacts.len(), "file"),
        plural(report.derivatives.len(), "derivative")
    );
    if !report.covered.is_empty() {
        summary.push_str(&format!(", {}", plural(report.covered.len(), "cover")));
    }
    if !problems.is_empty() {
        summary.push_str(&format!(" ({})", problems.join(", ")));
    }
    vec![String::new(), summary]
}

pub fn print_pass_event(event: &PassEvent) {
    for line in format_pass_event(event) {
        println!("{}", line);
    }
}

pub fn print_pass_summary(report: &PassReport) {
    for line in format_pass_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Planned outputs per format, with collisions and opt-outs marked.
pub fn format_check_output(plans: &[FormatPlan]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut collisions = 0;
    for plan in plans {
        lines.push(plan.format.format.clone());
        let mut position = 0;
        for resolved in &plan.targets {
            let target = &resolved.planned.target;
            let path = &resolved.planned.relative_path;
            match resolved.claim {
                Claim::Generate => {
                    position += 1;
                    let title = if target.is_category() {
                        format!(
                            "{} ({})",
                            target.title(),
                            plural(target.documents().len(), "document")
                        )
                    } else {
                        target.title().to_string()
                    };
                    lines.push(format!(
                        "    {} {} \u{2192} {}",
                        format_index(position),
                        title,
                        path
                    ));
                    if !target.is_category() {
                        lines.push(format!("        Source: {}", target.identity()));
                    }
                }
                Claim::Excluded => {
                    lines.push(format!("    skipped {} (pandoc: false)", target.identity()));
                }
                Claim::Collision => {
                    collisions += 1;
                    let collision = Collision {
                        format: plan.format.format.clone(),
                        source: target.identity(),
                        is_category: target.is_category(),
                        relative_path: path.clone(),
                        owner: resolved.owner.clone(),
                    };
                    lines.push(format!("    {}", format_collision(&collision)));
                }
            }
        }
    }
    if collisions > 0 {
        lines.push(String::new());
        lines.push(format!("Found {}", plural(collisions, "collision")));
    }
    lines
}

pub fn print_check_output(plans: &[FormatPlan]) {
    for line in format_check_output(plans) {
        println!("{}", line);
    }
}

// ============================================================================
// Clean
// ============================================================================

pub fn format_clean_output(removed: &[String]) -> Vec<String> {
    let mut lines: Vec<String> = removed.iter().map(|path| format!("removed {path}")).collect();
    lines.push(format!("Removed {}", plural(removed.len(), "stale file")));
    lines
}

pub fn print_clean_output(removed: &[String]) {
    for line in format_clean_output(removed) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
