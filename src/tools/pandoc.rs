//! Pandoc conversion backend.
//!
//! Each job is written to a scratch markdown file (metadata block + body) and
//! handed to `pandoc` with the site root as working directory, so relative
//! image paths in documents resolve the same way they do for the site itself.
//! PDF output goes through the LaTeX writer with the page size passed as the
//! `papersize` variable.

use super::backend::{Converter, ToolError, run_tool};
use super::params::{ConversionJob, Metadata};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs the `pandoc` executable.
#[derive(Debug, Clone)]
pub struct PandocBackend {
    program: String,
    workdir: PathBuf,
}

impl PandocBackend {
    pub fn new(program: &str, workdir: &Path) -> Self {
        Self {
            program: program.to_string(),
            workdir: workdir.to_path_buf(),
        }
    }
}

impl Converter for PandocBackend {
    fn convert(&self, job: &ConversionJob) -> Result<(), ToolError> {
        if let Some(parent) = job.output.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut input = tempfile::Builder::new()
            .prefix("pandoc-press-")
            .suffix(".md")
            .tempfile()?;
        input.write_all(render_input(job).as_bytes())?;
        input.flush()?;

        let mut command = Command::new(&self.program);
        command
            .args(pandoc_args(job, input.path()))
            .current_dir(&self.workdir);
        run_tool("pandoc", &mut command)
    }
}

/// Command-line arguments for one conversion, input file last.
pub fn pandoc_args(job: &ConversionJob, input: &Path) -> Vec<String> {
    let mut args = vec![
        "--standalone".to_string(),
        "--from".to_string(),
        "markdown".to_string(),
        "--to".to_string(),
        job.format.writer().to_string(),
        "--output".to_string(),
        job.output.to_string_lossy().into_owned(),
    ];
    if let Some(papersize) = job.papersize {
        args.push("--variable".to_string());
        args.push(format!("papersize={}", papersize.short_name()));
    }
    args.extend(job.flags.iter().cloned());
    args.push(input.to_string_lossy().into_owned());
    args
}

/// YAML metadata block followed by the markdown body.
pub fn render_input(job: &ConversionJob) -> String {
    format!("{}\n{}", metadata_block(&job.metadata), job.content)
}

fn metadata_block(metadata: &Metadata) -> String {
    let mut fields = BTreeMap::new();
    fields.insert("title", metadata.title.as_str());
    if let Some(subtitle) = metadata.subtitle.as_deref() {
        fields.insert("subtitle", subtitle);
    }
    if let Some(author) = metadata.author.as_deref() {
        fields.insert("author", author);
    }
    if let Some(date) = metadata.date.as_deref() {
        fields.insert("date", date);
    }
    if let Some(lang) = metadata.lang.as_deref() {
        fields.insert("lang", lang);
    }
    // A map of strings always serializes.
    let yaml = serde_yaml::to_string(&fields).unwrap_or_default();
    format!("---\n{yaml}---\n")
}
