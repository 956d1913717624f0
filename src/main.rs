use clap::{Parser, Subcommand};
use pandoc_press::keep::{self, KeptFiles};
use pandoc_press::tools::{LatexTools, PandocBackend};
use pandoc_press::{config, corpus, generate, output};
use std::path::{Path, PathBuf};
use tracing::Level;

fn version_string() -> &'static str {
    if env!("ON_RELEASE_TAG") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match env!("GIT_HASH") {
        "" => "dev@unknown",
        hash => Box::leak(format!("dev@{hash}").into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "pandoc-press")]
#[command(about = "Render site documents and category bundles through pandoc")]
#[command(long_about = "\
Render site documents and category bundles through pandoc

Every document in the configured collections is converted once per output
format. Every category additionally gets a bundle: one file holding all of its
documents, ordered by their `order` front matter key.

Site structure:

  site/
  ├── config.toml                  # Optional, overrides stock defaults
  ├── _posts/
  │   └── 2015-01-01-hello.md      # Date and slug come from the filename
  ├── _recipes/                    # Extra collection (site.collections)
  │   └── soup.md
  └── covers/
      └── tips.png                 # Cover for the `tips` bundle

Front matter keys read per document:
  title, date, categories, category, order, author, lang, cover,
  papersize, sheetsize, signature, pandoc (false opts out)

PDF outputs are post-processed with pdflatex: a 2-up `-imposed` copy, a
`-binder` copy with blank pages for ring binding, and a cover page merged in
place when a cover is found.

Run 'pandoc-press gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site root directory
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Destination directory (overrides site.destination)
    #[arg(long, global = true)]
    destination: Option<PathBuf>,

    /// Log every registered file and tool invocation
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate every format, bundle and PDF derivative
    Build,
    /// Show planned outputs and collisions without running any tool
    Check,
    /// Remove files in the destination the last build did not produce
    Clean,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build => {
            let config = load(&cli)?;
            let site = corpus::scan(&cli.source, &config)?;
            println!(
                "==> Scanned {} documents in {}",
                site.document_count(),
                cli.source.display()
            );

            init_thread_pool(&config.processing);
            let converter = PandocBackend::new(&config.tools.pandoc, site.root());
            let tools = LatexTools::new(&config.tools.latex);
            let mut kept = KeptFiles::new();

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_pass_event(&event);
                }
            });
            let result = generate::run_pass(&site, &config, &converter, &tools, &mut kept, Some(tx));
            printer.join().ok();
            let report = result?;
            output::print_pass_summary(&report);

            if !report.skipped {
                let destination = generate::destination(&site, &config);
                let manifest = kept.save(&destination)?;
                println!("==> Build complete: {}", manifest.display());
            }
        }
        Command::Check => {
            let config = load(&cli)?;
            let site = corpus::scan(&cli.source, &config)?;
            println!("==> Checking {}", cli.source.display());
            let plans = generate::resolve_pass(&site, &config);
            output::print_check_output(&plans);
        }
        Command::Clean => {
            let config = load(&cli)?;
            let destination = cli.source.join(&config.site.destination);
            let kept = KeptFiles::load(&destination)?;
            let removed = keep::clean(&destination, &kept)?;
            output::print_clean_output(&removed);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the site config and apply the CLI overrides.
fn load(cli: &Cli) -> Result<config::PressConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.source)?;
    if let Some(destination) = &cli.destination {
        config.site.destination = destination_string(destination);
    }
    Ok(config)
}

fn destination_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Diagnostics go to stderr so they never interleave with the event stream.
fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
