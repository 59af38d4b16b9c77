//! Flowlens CLI - function inventory for TypeScript and JavaScript

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use flowlens_core::config::{self, ResolvedConfig};
use flowlens_core::report::count_functions;
use flowlens_core::{analyze_batch_with, load_path, render_json, render_text};
use flowlens_core::{BatchOptions, FileFunctions, Language, SourceUnit};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Files that mark a directory as a project root for config discovery
const ROOT_MARKERS: &[&str] = &[
    ".flowlensrc.json",
    "flowlens.config.json",
    "package.json",
    ".git",
];

#[derive(Parser)]
#[command(name = "flowlens")]
#[command(about = "Function inventory for TypeScript and JavaScript source")]
#[command(version = env!("FLOWLENS_VERSION"))]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the functions of a file or directory
    Analyze {
        /// Path to source file or directory
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Keep only calls to functions defined in the analyzed files
        #[arg(long)]
        resolve: bool,

        /// Language for files without a recognized extension (overrides config file)
        #[arg(long)]
        language: Option<LanguageArg>,

        /// Worker threads (overrides config file)
        #[arg(long)]
        jobs: Option<usize>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running analysis
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LanguageArg {
    Ts,
    Tsx,
    Js,
    Jsx,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::Ts => Language::TypeScript,
            LanguageArg::Tsx => Language::TypeScriptReact,
            LanguageArg::Js => Language::JavaScript,
            LanguageArg::Jsx => Language::JavaScriptReact,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            path,
            format,
            resolve,
            language,
            jobs,
            config: config_path,
        } => {
            // Normalize path to absolute
            let normalized_path = if path.is_relative() {
                std::env::current_dir()?.join(&path)
            } else {
                path
            };

            if !normalized_path.exists() {
                anyhow::bail!("Path does not exist: {}", normalized_path.display());
            }

            // Load configuration
            let project_root = find_project_root(&normalized_path);
            let mut resolved_config =
                config::load_and_resolve(&project_root, config_path.as_deref())
                    .context("failed to load configuration")?;

            if let Some(config_path) = &resolved_config.config_path {
                info!("Using config: {}", config_path.display());
            }

            // CLI flags override config file values
            if resolve {
                resolved_config.resolve_calls = true;
            }
            if let Some(language) = language {
                resolved_config.default_language = language.into();
            }
            if let Some(jobs) = jobs {
                if jobs == 0 {
                    anyhow::bail!("--jobs must be at least 1");
                }
                resolved_config.jobs = Some(jobs);
            }

            let files = run_analysis(&normalized_path, &resolved_config)?;

            match format {
                OutputFormat::Text => {
                    print!("{}", render_text(&files));
                    println!(
                        "\n{} function(s) in {} file(s)",
                        count_functions(&files),
                        files.len()
                    );
                }
                OutputFormat::Json => {
                    println!("{}", render_json(&files));
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

/// Install the stderr log subscriber
///
/// `RUST_LOG` wins when set; otherwise warnings only, or debug with `--verbose`.
fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("flowlens=debug,flowlens_core=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Logging initialized (verbose={})", verbose);
}

/// Load and analyze every file at `path`, on a dedicated pool when `jobs` is set
fn run_analysis(path: &Path, config: &ResolvedConfig) -> anyhow::Result<Vec<FileFunctions>> {
    let units = load_path(path, config)?;
    let options = BatchOptions {
        default_language: config.default_language,
        resolve_calls: config.resolve_calls,
    };

    let progress = progress_bar(units.len());
    let analyze = |units: &[SourceUnit]| {
        analyze_batch_with(units, &options, |file| {
            progress.set_message(file.path.clone());
            progress.inc(1);
        })
    };

    let files = match config.jobs {
        Some(jobs) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .context("failed to build worker thread pool")?;
            pool.install(|| analyze(units.as_slice()))
        }
        None => analyze(units.as_slice()),
    };

    progress.finish_and_clear();
    Ok(files)
}

/// Progress bar on stderr, hidden when stderr is not a terminal
fn progress_bar(len: usize) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {wide_msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Analysis:");
    println!("  default_language: {}", resolved.default_language);
    println!("  resolve_calls: {}", resolved.resolve_calls);
    println!("  max_file_size: {} bytes", resolved.max_file_size);
    println!(
        "  jobs: {}",
        resolved
            .jobs
            .map(|v| v.to_string())
            .unwrap_or_else(|| "auto".to_string())
    );
    println!();
    println!("Filters:");
    println!(
        "  include: {}",
        if resolved.include.is_some() {
            "custom patterns"
        } else {
            "all files"
        }
    );
    println!(
        "  exclude: active ({} patterns)",
        if resolved.custom_exclude {
            "custom"
        } else {
            "default"
        }
    );
}

/// Nearest directory at or above `start_path` that holds a config file,
/// a package.json or a .git directory; falls back to the start directory
fn find_project_root(start_path: &Path) -> PathBuf {
    let start = if start_path.is_file() {
        start_path.parent().unwrap_or(start_path)
    } else {
        start_path
    };

    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .unwrap_or(start)
        .to_path_buf()
}
