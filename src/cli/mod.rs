//! # CLI Module
//!
//! Command-line interface for the media vault.
//!
//! ## Usage
//! ```bash
//! # Import a backup export into the library
//! media-vault import ~/Downloads/Takeout/Photos
//!
//! # Register the whole library, then archive or delete its duplicates
//! media-vault scan --dispose
//!
//! # Classify one file
//! media-vault check ~/Pictures/2023/20230114_101500.jpg
//!
//! # JSON output
//! media-vault scan --output json
//! ```

mod prompt;

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_vault::config::AppConfig;
use media_vault::core::engine::{
    CancellationToken, Classification, DisposalReport, Disposed, DuplicateDetector, DuplicateRun,
    ScanReport,
};
use media_vault::core::import::{ImportSummary, MediaImporter};
use media_vault::core::store::{HashStore, SqliteHashStore};
use media_vault::error::{Result, StoreError};
use media_vault::events::{
    DisposeEvent, Event, EventChannel, EventReceiver, EventSender, ImportEvent, ScanEvent,
};
use media_vault::{init_tracing, LogTarget, HISTORY_LOG};
use prompt::Prompter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Media Vault - a date-sorted photo library without duplicates
#[derive(Parser, Debug)]
#[command(name = "media-vault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Properties file (default: $MEDIA_DB/.config/properties.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    /// Log to stderr instead of the library's history.log
    #[arg(long, global = true)]
    log_stderr: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a backup export into the library
    Import {
        /// Directory holding the exported media
        source: PathBuf,
    },

    /// Scan the whole library and register every image
    Scan {
        /// Archive or delete the duplicates found
        #[arg(long)]
        dispose: bool,

        /// Recompute fingerprints even for registered files
        #[arg(long)]
        force: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Classify a single file
    Check {
        file: PathBuf,

        /// Archive or delete the file if it is a duplicate
        #[arg(long)]
        dispose: bool,
    },

    /// Create the hash database
    Init,

    /// Drop records of files that no longer exist
    Prune,
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    scan: &'a ScanReport,
    disposal: Option<&'a DisposalReport>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = AppConfig::load(cli.config.as_deref())?;
    let log_file = config.root().join(HISTORY_LOG);
    init_tracing(if cli.log_stderr {
        LogTarget::Stderr
    } else {
        LogTarget::File(&log_file)
    });
    tracing::info!(config = %config_path.display(), "Loaded configuration");

    let prompter = Prompter::new(cli.yes);
    let term = Term::stderr();

    match cli.command {
        Commands::Import { source } => run_import(&term, &config, &prompter, &source),
        Commands::Scan {
            dispose,
            force,
            output,
        } => run_scan(&term, &config, &prompter, dispose, force, output),
        Commands::Check { file, dispose } => run_check(&term, &config, &prompter, &file, dispose),
        Commands::Init => run_init(&term, &config),
        Commands::Prune => run_prune(&term, &config),
    }
}

fn run_import(term: &Term, config: &AppConfig, prompter: &Prompter, source: &Path) -> Result<()> {
    print_settings(term, config, source);
    prompter.require("Proceed with import?", "import declined")?;

    let store = open_store(config, prompter)?;
    let detector = config.detector(Box::new(store), false)?;

    if config.root().is_dir()
        && prompter.confirm("Run a full rescan of the library before import?")?
    {
        let report = with_progress(true, |events| {
            detector.scan_with_events(config.root(), &CancellationToken::new(), events)
        })?;
        term.write_line(&format!(
            "  Rescan: {} images, {} new, {} already registered, {} duplicates",
            style(report.files_scanned).cyan(),
            style(report.new).cyan(),
            style(report.already_registered).dim(),
            style(report.duplicates).yellow()
        ))
        .ok();
    }

    let importer = MediaImporter::new(&detector, config.import_options());
    let summary = with_progress(true, |events| {
        importer.run_with_events(source, &CancellationToken::new(), events)
    })?;

    print_import_summary(term, &summary);
    Ok(())
}

fn run_scan(
    term: &Term,
    config: &AppConfig,
    prompter: &Prompter,
    dispose: bool,
    force: bool,
    output: OutputFormat,
) -> Result<()> {
    let pretty = matches!(output, OutputFormat::Pretty);
    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Media Vault").bold().cyan(),
            style(config.root().display()).dim()
        ))
        .ok();
    }

    let store = open_store(config, prompter)?;
    let detector = config.detector(Box::new(store), force)?;

    let report = with_progress(pretty, |events| {
        detector.scan_with_events(config.root(), &CancellationToken::new(), events)
    })?;

    let disposal = if dispose && !report.run.is_empty() {
        confirm_disposal(prompter, &detector, &report.run)?;
        Some(with_progress(pretty, |events| {
            detector.dispose_with_events(&report.run, events)
        })?)
    } else {
        None
    };

    match output {
        OutputFormat::Pretty => {
            print_scan_report(term, &report);
            if let Some(disposal) = &disposal {
                print_disposal_report(term, disposal);
            }
        }
        OutputFormat::Json => {
            let json = ScanOutput {
                scan: &report,
                disposal: disposal.as_ref(),
            };
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{text}"),
                Err(e) => tracing::warn!(error = %e, "Cannot serialize report"),
            }
        }
    }

    Ok(())
}

fn run_check(
    term: &Term,
    config: &AppConfig,
    prompter: &Prompter,
    file: &Path,
    dispose: bool,
) -> Result<()> {
    let store = open_store(config, prompter)?;
    let detector = config.detector(Box::new(store), false)?;

    let mut run = DuplicateRun::new();
    let classification = detector.check(file, &mut run)?;

    let verdict = match &classification {
        Classification::New => style("new, registered".to_string()).green(),
        Classification::Duplicate {
            self_match: true, ..
        } => style("already registered".to_string()).dim(),
        Classification::Duplicate { original, .. } => {
            style(format!("duplicate of {}", display_path(original))).yellow()
        }
        Classification::Unclassifiable { reason } => {
            style(format!("unclassifiable: {reason}")).red()
        }
        Classification::Excluded => style("in an excluded directory".to_string()).dim(),
    };
    term.write_line(&format!("{}: {}", display_path(file), verdict))
        .ok();

    if dispose && !run.is_empty() {
        confirm_disposal(prompter, &detector, &run)?;
        let report = detector.dispose(&run)?;
        print_disposal_report(term, &report);
    }

    Ok(())
}

fn run_init(term: &Term, config: &AppConfig) -> Result<()> {
    let store = SqliteHashStore::open(&config.db_path())?;
    term.write_line(&format!(
        "{} Hash database ready at {} ({} records)",
        style("✓").green().bold(),
        store.path().display(),
        store.record_count()?
    ))
    .ok();
    Ok(())
}

fn run_prune(term: &Term, config: &AppConfig) -> Result<()> {
    let store = SqliteHashStore::open_existing(&config.db_path())?;
    let removed = store.prune_orphans()?;
    term.write_line(&format!(
        "{} Removed {} stale records, {} remain",
        style("✓").green().bold(),
        style(removed).cyan(),
        store.record_count()?
    ))
    .ok();
    Ok(())
}

/// Open the hash database, offering to create it when missing
fn open_store(config: &AppConfig, prompter: &Prompter) -> Result<SqliteHashStore> {
    let db_path = config.db_path();
    match SqliteHashStore::open_existing(&db_path) {
        Ok(store) => Ok(store),
        Err(StoreError::Unavailable { .. }) if !db_path.exists() => {
            prompter.require(
                &format!(
                    "No hash database at {}. Create a new database?",
                    db_path.display()
                ),
                "no hash database",
            )?;
            Ok(SqliteHashStore::open(&db_path)?)
        }
        Err(e) => Err(e.into()),
    }
}

fn confirm_disposal(
    prompter: &Prompter,
    detector: &DuplicateDetector,
    run: &DuplicateRun,
) -> Result<()> {
    let action = match detector.archive_directory() {
        Some(directory) => format!("Move {} duplicates to {}?", run.len(), directory.display()),
        None => format!("Permanently delete {} duplicates?", run.len()),
    };
    prompter.require(&action, "disposal declined")
}

/// Run `work` while a thread renders its events
fn with_progress<T>(enabled: bool, work: impl FnOnce(&EventSender) -> T) -> T {
    let (sender, receiver) = EventChannel::new();
    let bar = enabled.then(new_progress_bar);
    let renderer = render_events(receiver, bar);

    let result = work(&sender);

    // Drop sender to signal the render thread to finish
    drop(sender);
    renderer.join().ok();
    result
}

fn new_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb
}

fn render_events(receiver: EventReceiver, bar: Option<ProgressBar>) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in receiver.iter() {
            let Some(pb) = &bar else {
                continue;
            };
            match event {
                Event::Scan(ScanEvent::FilesDiscovered { total }) => {
                    pb.set_length(total as u64);
                    pb.set_message("scanning");
                }
                Event::Scan(ScanEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    pb.set_message(file_name(&p.current_path));
                }
                Event::Import(ImportEvent::Started { total, .. }) => {
                    pb.set_length(total as u64);
                    pb.set_message("importing");
                }
                Event::Import(ImportEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    pb.set_message(file_name(&p.current_path));
                }
                Event::Dispose(DisposeEvent::Started { total, .. }) => {
                    pb.set_length(total as u64);
                    pb.set_position(0);
                    pb.set_message("disposing");
                }
                Event::Dispose(
                    DisposeEvent::Archived { .. }
                    | DisposeEvent::Deleted { .. }
                    | DisposeEvent::Failed { .. },
                ) => pb.inc(1),
                Event::Scan(ScanEvent::Completed { .. } | ScanEvent::Cancelled)
                | Event::Import(ImportEvent::Completed { .. })
                | Event::Dispose(DisposeEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    })
}

fn print_settings(term: &Term, config: &AppConfig, source: &Path) {
    let options = config.import_options();
    let archive = match config.archive().target() {
        Some(directory) => directory.display().to_string(),
        None => "off".to_string(),
    };

    term.write_line(&format!("{}", style("Import settings").bold().underlined()))
        .ok();
    let rows = [
        ("Source", source.display().to_string()),
        ("Library", config.root().display().to_string()),
        ("Hash database", config.db_path().display().to_string()),
        ("Prevent duplicates", options.prevent_duplicates.to_string()),
        ("Archive duplicates", archive),
        ("Delete after copy", options.delete_after_copy.to_string()),
        ("Excluded", config.exclusion_directories().join(", ")),
    ];
    for (label, value) in rows {
        term.write_line(&format!("  {:<20} {}", style(label).dim(), value))
            .ok();
    }
    term.write_line("").ok();
}

fn print_scan_report(term: &Term, report: &ScanReport) {
    term.write_line("").ok();
    let heading = if report.cancelled {
        style("!").yellow().bold()
    } else {
        style("✓").green().bold()
    };
    term.write_line(&format!("{heading} Scan Complete")).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images scanned in {:.1}s",
        style(report.files_scanned).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!("  {} new", style(report.new).cyan()))
        .ok();
    term.write_line(&format!(
        "  {} duplicates",
        style(report.duplicates).yellow()
    ))
    .ok();
    if report.already_registered > 0 {
        term.write_line(&format!(
            "  {} already registered",
            style(report.already_registered).dim()
        ))
        .ok();
    }
    if report.excluded > 0 {
        term.write_line(&format!("  {} excluded", style(report.excluded).dim()))
            .ok();
    }
    if report.cache_hits > 0 {
        term.write_line(&format!("  {} cache hits", style(report.cache_hits).dim()))
            .ok();
    }

    if !report.run.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Duplicates:").bold().underlined()))
            .ok();
        for entry in report.run.entries() {
            term.write_line(&format!(
                "    {} {} {}",
                style("○").dim(),
                display_path(&entry.path),
                style(format!("= {}", display_path(&entry.original))).dim()
            ))
            .ok();
        }
    }

    if !report.unclassifiable.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Could not classify:").bold().underlined()))
            .ok();
        for item in &report.unclassifiable {
            term.write_line(&format!(
                "    {} {} {}",
                style("✗").red(),
                display_path(&item.path),
                style(&item.reason).dim()
            ))
            .ok();
        }
    }

    for error in &report.errors {
        term.write_line(&format!("  {} {}", style("warning:").yellow(), error))
            .ok();
    }
}

fn print_disposal_report(term: &Term, report: &DisposalReport) {
    term.write_line("").ok();
    for disposed in &report.disposed {
        let line = match disposed {
            Disposed::Archived { path, destination } => format!(
                "  {} {} -> {}",
                style("→").cyan(),
                display_path(path),
                display_path(destination)
            ),
            Disposed::Deleted { path } => {
                format!("  {} {}", style("✗").red(), display_path(path))
            }
        };
        term.write_line(&line).ok();
    }
    for failure in &report.failed {
        term.write_line(&format!(
            "  {} {}: {}",
            style("failed").red().bold(),
            display_path(&failure.path),
            failure.reason
        ))
        .ok();
    }
    term.write_line(&format!(
        "{} {} disposed, {} failed",
        style("✓").green().bold(),
        style(report.disposed.len()).cyan(),
        report.failed.len()
    ))
    .ok();
}

fn print_import_summary(term: &Term, summary: &ImportSummary) {
    term.write_line("").ok();
    term.write_line(&format!("{} Import Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  Images: {} found, {} imported, {} failed",
        summary.images_found,
        style(summary.images_imported).cyan(),
        summary.images_failed()
    ))
    .ok();
    term.write_line(&format!(
        "  Videos: {} found, {} imported, {} failed",
        summary.videos_found,
        style(summary.videos_imported).cyan(),
        summary.videos_failed()
    ))
    .ok();
    if summary.unsorted > 0 {
        term.write_line(&format!(
            "  {} without a capture date (unsorted)",
            style(summary.unsorted).yellow()
        ))
        .ok();
    }
    term.write_line(&format!(
        "  Duplicates: {} archived, {} skipped",
        style(summary.duplicates_archived).yellow(),
        style(summary.duplicates_skipped).yellow()
    ))
    .ok();
    term.write_line(&format!(
        "  Elapsed: {:.1}s",
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();

    for kept in &summary.originals_kept {
        term.write_line(&format!(
            "  {} original kept: {}",
            style("!").yellow(),
            kept.display()
        ))
        .ok();
    }

    for failure in &summary.failures {
        term.write_line(&format!(
            "  {} {}: {}",
            style("failed").red().bold(),
            display_path(&failure.path),
            failure.reason
        ))
        .ok();
    }
    if summary.cancelled {
        term.write_line(&format!("{}", style("Import was cancelled.").yellow()))
            .ok();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}
