//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "spinescan")]
#[command(author, version, about = "Bookshelf photo scanner and catalog reconciler")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Segment shelf photos, OCR the spines and match against the catalog
    Scan(ScanArgs),

    /// Delete catalog records that are unambiguously OCR garbage
    Cleanup(CleanupArgs),

    /// Move suspect records into a timestamped audit CSV
    Quarantine(QuarantineArgs),

    /// Print summary statistics for a catalog export
    Stats(StatsArgs),

    /// Show tool and dependency information
    Info,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Directory of shelf photos
    #[arg(default_value = "fotos")]
    pub input: PathBuf,

    /// Output directory for crops and reports
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Catalog snapshot CSV (id,title,author,publisher,isbn,year)
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Run the OCR search (requires tesseract)
    #[arg(long)]
    pub ocr: bool,

    /// Minimum spine segment width in pixels
    #[arg(long)]
    pub min_seg_width: Option<u32>,

    /// Dark pixel threshold (0-255)
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Columns ignored at each photo edge
    #[arg(long)]
    pub margin: Option<u32>,

    /// Coarse baseline match threshold
    #[arg(long)]
    pub match_threshold: Option<f64>,

    /// Worker threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List the photos that would be processed, then exit
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct CleanupArgs {
    /// Per-copy catalog export CSV
    pub export: PathBuf,

    /// Apply the deletions (default is preview only)
    #[arg(long)]
    pub apply: bool,
}

#[derive(Args)]
pub struct QuarantineArgs {
    /// Per-copy catalog export CSV
    pub export: PathBuf,

    /// Directory receiving the audit CSV and archived images
    #[arg(short, long, default_value = "quarantine")]
    pub output: PathBuf,

    /// Directory holding spine images referenced by the export
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Quarantine every record with a "Foto erfasst" copy
    #[arg(long)]
    pub include_foto_erfasst: bool,

    /// Flag on a single gibberish title or author
    #[arg(long)]
    pub aggressive_titles: bool,

    /// Let --aggressive-titles fire even when the record carries an ISBN
    #[arg(long)]
    pub ignore_isbn_safety: bool,

    /// Apply the removals (default is audit only)
    #[arg(long)]
    pub apply: bool,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Per-copy catalog export CSV
    pub export: PathBuf,
}
