//! tallyscan - sort scanned tickets by their printed number and bind them into a PDF.
//!
//! Usage:
//!   tallyscan rename              Rename images to 1.jpg, 2.jpg, … by ticket number
//!   tallyscan rename --dry-run    Show the rename plan without touching files
//!   tallyscan pdf                 Lay out N.jpg two per A4 page into <dir>.pdf

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use tallyscan_core::Settings;
use tallyscan_ocr::system_backend;

mod commands;

use commands::{RenameMode, RenameReport};

#[derive(Parser)]
#[command(name = "tallyscan", version, about = "Sort scanned tickets by number and bind them into a PDF")]
struct Cli {
    /// Directory to work on [default: the directory containing this executable]
    #[arg(long, global = true, env = "TALLYSCAN_DIR")]
    dir: Option<PathBuf>,

    /// Config file [default: tallyscan.toml in the working directory, if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log OCR fragments and layout decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rename images by the ticket number read after "No."
    Rename {
        /// Print the plan instead of applying it
        #[arg(long)]
        dry_run: bool,
        /// With --dry-run, print the plan as JSON
        #[arg(long, requires = "dry_run")]
        json: bool,
    },
    /// Bind the numbered .jpg files into one PDF, two per page
    Pdf {
        /// Output file name inside the directory [default: <dir name>.pdf]
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let dir = resolve_dir(cli.dir)?;
    let settings = Settings::resolve(cli.config.as_deref(), &dir)?;
    tracing::debug!("Working directory: {}", dir.display());

    match cli.command {
        Command::Rename { dry_run, json } => {
            let mode = match (dry_run, json) {
                (false, _) => RenameMode::Apply,
                (true, false) => RenameMode::DryRun,
                (true, true) => RenameMode::DryRunJson,
            };
            let ocr = &settings.ocr;
            let report = commands::rename(&dir, mode, || {
                system_backend(&ocr.language, ocr.tessdata_dir.as_deref())
            })?;
            match report {
                RenameReport::NoImages => println!("No image files found in {}", dir.display()),
                RenameReport::EngineMissing { candidates } => {
                    tracing::warn!(
                        "No OCR engine in this build; rebuild with `--features tesseract` to read ticket numbers"
                    );
                    println!("{} images would be read:", candidates.len());
                    for name in candidates {
                        println!("  {name}");
                    }
                }
                RenameReport::Done(summary) if summary.applied => println!(
                    "Renaming complete: {} numbered, {} without a usable ticket number",
                    summary.ranked, summary.unplaced
                ),
                RenameReport::Done(_) => {}
            }
        }
        Command::Pdf { output } => {
            let output = output.or(settings.pdf.output);
            match commands::assemble(&dir, output.as_deref())? {
                Some(report) => println!(
                    "PDF written: {} ({} pages, {} images)",
                    report.output.display(),
                    report.pages,
                    report.images
                ),
                None => println!("No numbered .jpg files found in {}; no PDF written", dir.display()),
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match dir {
        Some(dir) => dir,
        None => {
            let exe = std::env::current_exe().context("Failed to locate the executable")?;
            exe.parent()
                .map(Path::to_path_buf)
                .context("Executable has no parent directory")?
        }
    };
    dir.canonicalize()
        .with_context(|| format!("Failed to resolve directory: {}", dir.display()))
}
