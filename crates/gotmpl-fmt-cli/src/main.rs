/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Command-line front end for the Go template formatter
 */

use anyhow::{Context, Result};
use clap::Parser;
use gotmpl_fmt::{CONFIG_FILE_NAME, FormatOptions, format, is_supported_path};
use std::fs;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

mod diagnostics;

#[derive(Parser, Debug)]
#[command(name = "gotmpl-fmt")]
#[command(version, about = "Format HTML documents with embedded Go template actions")]
struct Args {
    /// Files or directories to format. Reads stdin when none are given.
    #[arg(value_name = "PATHS")]
    paths: Vec<PathBuf>,

    /// Rewrite files in place
    #[arg(short, long, conflicts_with = "check")]
    write: bool,

    /// Report files that are not formatted and exit with status 1
    #[arg(long)]
    check: bool,

    /// Configuration file (default: nearest .gotmpl-fmt.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print `{{.X}}` instead of `{{ .X }}`
    #[arg(long)]
    no_bracket_spacing: bool,

    #[arg(long, value_name = "N")]
    print_width: Option<usize>,

    #[arg(long, value_name = "N")]
    tab_width: Option<usize>,

    /// Indent with tabs
    #[arg(long)]
    use_tabs: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Verbose output (-v for progress, -vv for formatter debug)"
    )]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Print,
    Write,
    Check,
}

impl Args {
    fn mode(&self) -> Mode {
        if self.write {
            Mode::Write
        } else if self.check {
            Mode::Check
        } else {
            Mode::Print
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Unchanged,
    Changed,
    Failed,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let options = resolve_options(&args)?;
    let succeeded = if args.paths.is_empty() {
        format_stdin(&options)?
    } else {
        format_paths(&args, &options)?
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "gotmpl_fmt=warn",
        1 => "gotmpl_fmt=info",
        _ => "gotmpl_fmt=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Options from `--config` or the nearest configuration file, with
/// command-line flags applied on top.
fn resolve_options(args: &Args) -> Result<FormatOptions> {
    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => find_config(&std::env::current_dir()?),
    };

    let mut options = match config_path {
        Some(path) => FormatOptions::load(&path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => FormatOptions::default(),
    };

    if args.no_bracket_spacing {
        options.bracket_spacing = false;
    }
    if let Some(width) = args.print_width {
        options.print_width = width;
    }
    if let Some(width) = args.tab_width {
        options.tab_width = width;
    }
    if args.use_tabs {
        options.use_tabs = true;
    }
    Ok(options)
}

fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

fn format_stdin(options: &FormatOptions) -> Result<bool> {
    let mut source = String::new();
    std::io::stdin()
        .read_to_string(&mut source)
        .context("Failed to read stdin")?;

    match format(&source, options) {
        Ok(formatted) => {
            print!("{formatted}");
            Ok(true)
        }
        Err(err) => {
            eprint!("{}", render("<stdin>", &source, &err));
            Ok(false)
        }
    }
}

fn format_paths(args: &Args, options: &FormatOptions) -> Result<bool> {
    let files = collect_files(&args.paths);
    tracing::info!("Found {} template files", files.len());

    let mode = args.mode();
    let mut changed_count = 0;
    let mut error_count = 0;

    for path in &files {
        tracing::info!(path = %path.display(), "formatting");
        match process_file(path, options, mode) {
            Ok(Outcome::Unchanged) => {}
            Ok(Outcome::Changed) => changed_count += 1,
            Ok(Outcome::Failed) => error_count += 1,
            Err(err) => {
                eprintln!("Error: {err:#}");
                error_count += 1;
            }
        }
    }

    match mode {
        Mode::Check if changed_count > 0 => {
            eprintln!("{changed_count} file(s) would be reformatted");
        }
        Mode::Write => tracing::info!("Reformatted {changed_count} file(s)"),
        _ => {}
    }

    Ok(error_count == 0 && !(mode == Mode::Check && changed_count > 0))
}

/// Explicit files are kept as given; directories contribute every file with
/// a supported extension, in a stable order.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_supported_path(e.path()))
                .map(|e| e.path().to_path_buf())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn process_file(path: &Path, options: &FormatOptions, mode: Mode) -> Result<Outcome> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let formatted = match format(&source, options) {
        Ok(formatted) => formatted,
        Err(err) => {
            eprint!("{}", render(&path.display().to_string(), &source, &err));
            return Ok(Outcome::Failed);
        }
    };

    let outcome = if formatted == source {
        Outcome::Unchanged
    } else {
        Outcome::Changed
    };

    match mode {
        Mode::Print => print!("{formatted}"),
        Mode::Write if outcome == Outcome::Changed => {
            fs::write(path, &formatted)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
        }
        Mode::Check if outcome == Outcome::Changed => {
            eprintln!("Would reformat {}", path.display());
        }
        _ => {}
    }
    Ok(outcome)
}

fn render(path: &str, source: &str, err: &gotmpl_fmt::FormatError) -> String {
    diagnostics::render_error(path, source, err, std::io::stderr().is_terminal())
}
