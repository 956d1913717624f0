//! Site and pandoc configuration.
//!
//! Handles loading, validating, and merging the site's `config.toml`. Stock
//! defaults are serialized to a TOML table, the user's file is merged on top
//! key-by-key, and the result is deserialized and validated. A site with no
//! `config.toml` at all builds with the stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = ""
//! author = ""
//! lang = "en"
//! collections = []            # extra collections, read from _<name>/
//! corpus_version = "3.0.0"    # older corpora index categories from posts only
//! destination = "_site"
//!
//! [pandoc]
//! skip = false                # turn the whole pass off
//! flags = ""                  # every conversion
//! site_flags = ""             # every conversion, after `flags`
//! full_flags = ""             # category bundles only
//! imposition = true
//! binder = true
//! papersize = "a5paper"
//! sheetsize = "a4paper"
//! signature = 0               # 0 = one signature for the whole document
//! covers_dir = "covers"
//! permalink = ":output/:collection/:slug.:ext"
//! bundle_permalink = ":output/:slug.:ext"
//!
//! [[pandoc.outputs]]
//! format = "pdf"
//! flags = ""
//!
//! [tools]
//! pandoc = "pandoc"
//! latex = "pdflatex"
//!
//! [processing]
//! max_processes = 4           # omit for auto = CPU cores
//! ```
//!
//! Unknown keys are rejected to catch typos early. Arrays are replaced, not
//! merged: a user `[[pandoc.outputs]]` list replaces the stock one entirely.

use crate::tools::layout::PaperSize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the configuration file at the site root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PressConfig {
    /// Corpus-level settings: metadata, collections, destination.
    pub site: SiteSection,
    /// Conversion pass settings.
    pub pandoc: PandocConfig,
    /// External program names.
    pub tools: ToolsConfig,
    /// Parallel conversion settings.
    pub processing: ProcessingConfig,
}

impl PressConfig {
    /// Reject values the pass cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pandoc.outputs.is_empty() {
            return Err(ConfigError::Validation(
                "pandoc.outputs must not be empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        for output in &self.pandoc.outputs {
            if output.format.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "pandoc.outputs entries need a format".into(),
                ));
            }
            if !seen.insert(output.format.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "pandoc.outputs lists '{}' twice",
                    output.format
                )));
            }
        }
        for (key, value) in [
            ("papersize", &self.pandoc.papersize),
            ("sheetsize", &self.pandoc.sheetsize),
        ] {
            if PaperSize::parse(value).is_none() {
                return Err(ConfigError::Validation(format!(
                    "pandoc.{key} '{value}' is not an A-series size (a0..a10)"
                )));
            }
        }
        if self.pandoc.signature % 4 != 0 {
            return Err(ConfigError::Validation(
                "pandoc.signature must be a multiple of 4".into(),
            ));
        }
        for (key, value) in [
            ("permalink", &self.pandoc.permalink),
            ("bundle_permalink", &self.pandoc.bundle_permalink),
        ] {
            if !value.contains(":slug") {
                return Err(ConfigError::Validation(format!(
                    "pandoc.{key} must contain :slug"
                )));
            }
        }
        Ok(())
    }
}

/// Corpus-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Site title, used as metadata for category bundles.
    pub title: String,
    /// Default author for every conversion.
    pub author: String,
    /// Default document language.
    pub lang: String,
    /// Collections besides posts, each read from `_<name>/`.
    pub collections: Vec<String>,
    /// Version of the corpus layout. Anything below 3.0.0 uses the legacy
    /// posts-only category index.
    pub corpus_version: String,
    /// Output directory, relative to the site root unless absolute.
    pub destination: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            lang: "en".to_string(),
            collections: Vec::new(),
            corpus_version: "3.0.0".to_string(),
            destination: "_site".to_string(),
        }
    }
}

/// Conversion pass settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PandocConfig {
    /// When true the whole pass is a no-op.
    pub skip: bool,
    /// Flags passed to every conversion.
    pub flags: String,
    /// Flags passed to every conversion, after `flags`.
    pub site_flags: String,
    /// Flags passed to category bundles only.
    pub full_flags: String,
    /// Produce an imposed (print signature) copy of every PDF.
    pub imposition: bool,
    /// Produce a binder copy of every PDF.
    pub binder: bool,
    /// Default logical page size of PDF targets.
    pub papersize: String,
    /// Default physical sheet size for imposition and binder.
    pub sheetsize: String,
    /// Pages per signature. 0 makes the whole document one signature.
    pub signature: u32,
    /// Directory (relative to the site root) holding category covers.
    pub covers_dir: String,
    /// Output path template for standalone documents.
    pub permalink: String,
    /// Output path template for category bundles.
    pub bundle_permalink: String,
    /// Output formats, processed in this order.
    pub outputs: Vec<OutputFormat>,
}

impl Default for PandocConfig {
    fn default() -> Self {
        Self {
            skip: false,
            flags: String::new(),
            site_flags: String::new(),
            full_flags: String::new(),
            imposition: true,
            binder: true,
            papersize: "a5paper".to_string(),
            sheetsize: "a4paper".to_string(),
            signature: 0,
            covers_dir: "covers".to_string(),
            permalink: ":output/:collection/:slug.:ext".to_string(),
            bundle_permalink: ":output/:slug.:ext".to_string(),
            outputs: vec![OutputFormat::new("pdf", ""), OutputFormat::new("epub", "")],
        }
    }
}

/// One configured output format and its extra flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputFormat {
    /// Pandoc output format identifier (`pdf`, `epub`, `html5`, ...).
    pub format: String,
    /// Extra flags for this format only.
    #[serde(default)]
    pub flags: String,
}

impl OutputFormat {
    pub fn new(format: &str, flags: &str) -> Self {
        Self {
            format: format.to_string(),
            flags: flags.to_string(),
        }
    }

    /// File extension of the rendered artifact.
    pub fn extension(&self) -> &str {
        match self.format.as_str() {
            "epub" | "epub2" | "epub3" => "epub",
            "latex" => "tex",
            "html" | "html4" | "html5" => "html",
            "markdown" | "gfm" | "commonmark" => "md",
            other => other,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.format == "pdf"
    }

    /// The `--to` writer handed to pandoc. PDF goes through the LaTeX writer.
    pub fn writer(&self) -> &str {
        if self.is_pdf() { "latex" } else { &self.format }
    }
}

/// External program names, looked up on `PATH` unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub pandoc: String,
    pub latex: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pandoc: "pandoc".to_string(),
            latex: "pdflatex".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel conversions.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Worker threads for conversions: all cores unless `max_processes` asks
/// for fewer. Never below 1.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Split a flag string into arguments on whitespace.
pub fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(str::to_string).collect()
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock defaults as a TOML table, the base every `config.toml` overlays.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PressConfig::default())?)
}

/// Deep-merge `overlay` onto `base`.
///
/// Nested tables merge per key; any other overlay value wins outright, so a
/// user's `[[pandoc.outputs]]` list replaces the stock list rather than
/// extending it.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from the site root as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Apply the user's table over the defaults and produce a validated config.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PressConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PressConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` at the site root.
pub fn load_config(root: &Path) -> Result<PressConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(root)?)
}

/// Returns a fully-commented stock `config.toml`. Used by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# pandoc-press configuration
# ==========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
# Metadata handed to pandoc. Document front matter wins over these.
title = ""
author = ""
lang = "en"

# Collections besides posts. Each one is read from _<name>/.
collections = []

# Layout version of the corpus. Below 3.0.0, category bundles are built from
# posts only.
corpus_version = "3.0.0"

# Where rendered files go, relative to the site root.
destination = "_site"

# ---------------------------------------------------------------------------
# Conversion
# ---------------------------------------------------------------------------
[pandoc]
# Set to true to disable every conversion.
skip = false

# Extra pandoc flags: for every conversion, then site-wide, then bundles only.
flags = ""
site_flags = ""
full_flags = ""

# Print-ready copies of every PDF.
imposition = true
binder = true

# Page and sheet sizes (ISO A-series). Front matter can override per document.
papersize = "a5paper"
sheetsize = "a4paper"

# Pages per printed signature, multiple of 4. 0 = whole document.
signature = 0

# Category covers live at <covers_dir>/<category-slug>.png
covers_dir = "covers"

# Output paths. Placeholders: :output :ext :collection :slug :year :month :day
permalink = ":output/:collection/:slug.:ext"
bundle_permalink = ":output/:slug.:ext"

[[pandoc.outputs]]
format = "pdf"
flags = ""

[[pandoc.outputs]]
format = "epub"
flags = ""

# ---------------------------------------------------------------------------
# External programs
# ---------------------------------------------------------------------------
[tools]
pandoc = "pandoc"
latex = "pdflatex"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel conversions.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
