//! spinescan - bookshelf photo scanner and catalog reconciler
//!
//! CLI entry point

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

use spinescan::{
    catalog::{load_catalog_csv, CatalogIndex},
    cleanup::{
        self, load_export_csv, plan_deletions, plan_quarantine, preview_lines, write_audit_csv,
        CatalogStore, CsvCatalogStore, QuarantineOptions,
    },
    cli::{Cli, CleanupArgs, Commands, QuarantineArgs, ScanArgs, StatsArgs},
    exit_codes,
    gibberish::looks_gibberish,
    pipeline::{self, PipelineOptions},
    report, CliOverrides, Config, TesseractExtractor, TextExtractor,
};

use chrono::Datelike;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Scan(args) => run_scan(&args, cli.quiet),
        Commands::Cleanup(args) => run_cleanup(&args),
        Commands::Quarantine(args) => run_quarantine(&args),
        Commands::Stats(args) => run_stats(&args),
        Commands::Info => run_info(),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::GENERAL_ERROR
        }
    });
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("spinescan={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ============ Scan Command ============

fn run_scan(args: &ScanArgs, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    if !args.input.exists() {
        eprintln!("Error: Input path does not exist: {}", args.input.display());
        std::process::exit(exit_codes::INPUT_NOT_FOUND);
    }

    let file_config = match &args.config {
        Some(config_path) => match Config::load_from_path(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Warning: Failed to load config file: {}", e);
                Config::default()
            }
        },
        None => Config::load().unwrap_or_default(),
    };
    let config = file_config.merge_with_cli(&create_cli_overrides(args));

    let catalog = match &args.catalog {
        Some(path) => CatalogIndex::build(load_catalog_csv(path)?),
        None => {
            eprintln!("Warning: No catalog given; every spine will be reported as new");
            CatalogIndex::default()
        }
    };

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let extractor: Option<TesseractExtractor> = if config.ocr.enabled {
        match TesseractExtractor::discover() {
            Ok(extractor) => Some(extractor.with_languages(&config.ocr.languages)),
            Err(e) => {
                eprintln!("Warning: {}; continuing without OCR", e);
                None
            }
        }
    } else {
        None
    };

    let options = PipelineOptions {
        segment: config.segment_options(),
        matching: config.match_options(),
        baseline_threshold: config.matching.baseline_threshold,
    };

    let photos = pipeline::collect_photos(&args.input)?;
    if args.dry_run {
        print_execution_plan(args, &photos, &config, extractor.is_some());
        return Ok(());
    }

    std::fs::create_dir_all(&args.output)?;
    let crops_dir = args.output.join("crops");

    let bar = if quiet {
        None
    } else {
        let bar = ProgressBar::new(photos.len() as u64);
        bar.set_style(ProgressStyle::with_template(
            "{bar:40} {pos}/{len} photos ({eta})",
        )?);
        Some(bar)
    };

    let run = pipeline::run(
        &args.input,
        &crops_dir,
        &catalog,
        extractor.as_ref().map(|e| e as &dyn TextExtractor),
        &options,
        bar.as_ref(),
    )?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    report::write_segment_report(&args.output.join("segments.csv"), &run.segments)?;
    report::write_new_books(&args.output.join("new_books.csv"), &run.new_books)?;
    report::write_manifest(&args.output.join("manifest.csv"), &run.manifest)?;

    if !quiet {
        let existing = run
            .segments
            .iter()
            .filter(|s| s.match_status == "existing")
            .count();
        println!("Photos:     {} ({} skipped)", run.manifest.len(), run.skipped);
        println!("Segments:   {}", run.segments.len());
        println!("  existing: {}", existing);
        println!("  new:      {}", run.segments.len() - existing);
        println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    Ok(())
}

/// Only override config file values when the CLI explicitly sets them.
fn create_cli_overrides(args: &ScanArgs) -> CliOverrides {
    CliOverrides {
        min_seg_width: args.min_seg_width,
        dark_threshold: args.threshold,
        margin: args.margin,
        baseline_threshold: args.match_threshold,
        ocr_enabled: if args.ocr { Some(true) } else { None },
    }
}

fn print_execution_plan(
    args: &ScanArgs,
    photos: &[std::path::PathBuf],
    config: &Config,
    ocr_available: bool,
) {
    println!("=== Dry Run - Execution Plan ===");
    println!();
    println!("Input:  {}", args.input.display());
    println!("Output: {}", args.output.display());
    println!("Photos to process: {}", photos.len());
    println!();
    println!("Pipeline Configuration:");
    println!(
        "  1. Segmentation (min width: {}, dark threshold: {}, margin: {})",
        config.segment.min_seg_width, config.segment.dark_threshold, config.segment.margin
    );
    if config.ocr.enabled && ocr_available {
        println!("  2. OCR search (Tesseract): ENABLED");
    } else {
        println!("  2. OCR search: DISABLED");
    }
    println!("  3. Field guessing");
    println!(
        "  4. Catalog matching (baseline: {}, accept: {}, title-only: {})",
        config.matching.baseline_threshold,
        config.matching.baseline_accept,
        config.matching.title_only_accept
    );
    println!();
    println!("Processing Options:");
    println!("  Threads: {}", args.threads.unwrap_or_else(num_cpus::get));
    println!();
    println!("Photos:");
    for (i, photo) in photos.iter().enumerate() {
        println!("  {}. {}", i + 1, photo.display());
    }
}

// ============ Cleanup Command ============

fn run_cleanup(args: &CleanupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let books = load_export_csv(&args.export)?;
    let config = Config::load().unwrap_or_default();
    let current_year = chrono::Local::now().year();
    let plan = plan_deletions(&books, current_year, &config.cleanup_gibberish_options());

    println!("Scanned:   {} books", plan.scanned);
    println!("Protected: {}", plan.protected);
    println!("Flagged:   {}", plan.flagged_ids.len());
    for line in preview_lines(&books, &plan) {
        println!("{line}");
    }
    if plan.flagged_ids.len() > cleanup::PREVIEW_LIMIT {
        println!("  ... and {} more", plan.flagged_ids.len() - cleanup::PREVIEW_LIMIT);
    }

    if plan.flagged_ids.is_empty() {
        return Ok(());
    }
    if !args.apply {
        println!();
        println!("Preview only. Re-run with --apply to delete.");
        return Ok(());
    }

    let mut store = CsvCatalogStore::open(&args.export)?;
    let removed = store.delete_books(&plan.flagged_ids)?;
    println!("Removed {} records", removed);
    Ok(())
}

// ============ Quarantine Command ============

fn run_quarantine(args: &QuarantineArgs) -> Result<(), Box<dyn std::error::Error>> {
    let books = load_export_csv(&args.export)?;
    let config = Config::load().unwrap_or_default();
    let current_year = chrono::Local::now().year();
    let options = QuarantineOptions {
        include_foto_erfasst_all: args.include_foto_erfasst,
        aggressive_titles: args.aggressive_titles,
        ignore_isbn_safety: args.ignore_isbn_safety,
    };
    let gib = config.quarantine_gibberish_options();
    let candidates = plan_quarantine(&books, current_year, &options, &gib);

    println!("Scanned: {} books", books.len());
    println!("Flagged: {}", candidates.len());
    if candidates.is_empty() {
        return Ok(());
    }

    let image_root = args
        .images
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    // audit file first; removal only happens once it is safely on disk
    let audit = write_audit_csv(&args.output, &image_root, &books, &candidates)?;
    println!("Audit:   {}", audit.display());

    if args.images.is_some() {
        let copied =
            cleanup::quarantine::archive_images(&args.output, &image_root, &books, &candidates);
        println!("Images:  {} archived", copied);
    }

    if !args.apply {
        println!();
        println!("Audit only. Re-run with --apply to remove from the catalog.");
        return Ok(());
    }

    let ids: Vec<String> = candidates.iter().map(|c| c.book_id.clone()).collect();
    let mut store = CsvCatalogStore::open(&args.export)?;
    let removed = store.delete_books(&ids)?;
    println!("Removed {} records", removed);
    Ok(())
}

// ============ Stats Command ============

fn run_stats(args: &StatsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let books = load_export_csv(&args.export)?;
    let options = Config::load().unwrap_or_default().cleanup_gibberish_options();

    let total_copies: usize = books.iter().map(|b| b.copies.len()).sum();
    let with_isbn = books
        .iter()
        .filter(|b| !b.isbn10.is_empty() || !b.isbn13.is_empty())
        .count();
    let with_publisher = books
        .iter()
        .filter(|b| !b.publisher.trim().is_empty())
        .count();
    let with_year = books.iter().filter(|b| b.year.is_some()).count();
    let gibberish_titles = books
        .iter()
        .filter(|b| looks_gibberish(Some(&b.title), &options))
        .count();
    let protected = books.iter().filter(|b| cleanup::has_protected_copy(b)).count();

    println!("Books:            {}", books.len());
    println!("Copies:           {}", total_copies);
    println!("With ISBN:        {}", with_isbn);
    println!("With publisher:   {}", with_publisher);
    println!("With year:        {}", with_year);
    println!("Gibberish titles: {}", gibberish_titles);
    println!("Protected:        {}", protected);
    Ok(())
}

// ============ Info Command ============

fn run_info() -> Result<(), Box<dyn std::error::Error>> {
    println!("spinescan v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  CPUs: {}", num_cpus::get());

    println!();
    println!("OCR Tools:");
    check_tool_with_version("tesseract", "Tesseract", &["--version"]);

    println!();
    println!("Config File Locations:");
    println!("  Local: ./spinescan.toml");
    if let Some(config_dir) = dirs::config_dir() {
        println!("  User:  {}", config_dir.join("spinescan/config.toml").display());
    }

    Ok(())
}

fn check_tool_with_version(cmd: &str, name: &str, version_args: &[&str]) {
    match which::which(cmd) {
        Ok(path) => {
            if let Ok(output) = std::process::Command::new(&path).args(version_args).output() {
                let version_str = String::from_utf8_lossy(&output.stdout);
                let first_line = version_str.lines().next().unwrap_or("");
                if !first_line.is_empty() && first_line.len() < 80 {
                    println!("  {}: {} ({})", name, first_line.trim(), path.display());
                } else {
                    println!("  {}: {} (found)", name, path.display());
                }
            } else {
                println!("  {}: {} (found)", name, path.display());
            }
        }
        Err(_) => println!("  {}: Not found", name),
    }
}
