use anyhow::{Context, Result};
use charon::models::EntityKind;
use charon::pipeline::{self, ImportOptions, RunSummary};
use charon::report;
use charon::stats::ImportStats;
use charon::store::{JsonStore, MemoryStore, Store};
use clap::{Args, Parser, Subcommand};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "charon")]
#[command(about = "Migrate legacy CMS exports into a new content store")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate a MySQL-style dump of INSERT statements
    Sql(MigrateArgs),
    /// Migrate an XML content export
    Xml(MigrateArgs),
}

#[derive(Args)]
struct MigrateArgs {
    /// Path to the export file (.sql, .xml, optionally .bz2)
    #[arg(short, long)]
    input: String,

    /// Path to the JSON store file (created if absent)
    #[arg(short, long)]
    store: Option<String>,

    /// Parse and reconcile in memory without persisting anything
    #[arg(long)]
    dry_run: bool,

    /// Source table prefix
    #[arg(long, default_value = charon::config::DEFAULT_TABLE_PREFIX)]
    table_prefix: String,

    /// Also import draft and private rows
    #[arg(long)]
    include_drafts: bool,

    /// Author assigned to content whose legacy author cannot be resolved
    #[arg(long, default_value = charon::config::DEFAULT_AUTHOR_SLUG)]
    default_author: String,

    /// Write a CSV report of skipped rows to this path
    #[arg(long)]
    report: Option<String>,
}

fn run_migrate(args: MigrateArgs, xml: bool) -> Result<()> {
    let start = Instant::now();
    let text = pipeline::read_input(Path::new(&args.input))?;
    info!(bytes = text.len(), input = %args.input, "Input loaded");

    let opts = ImportOptions {
        table_prefix: args.table_prefix.clone(),
        include_drafts: args.include_drafts,
        default_author: args.default_author.clone(),
        ..ImportOptions::default()
    };

    let summary = match (&args.store, args.dry_run) {
        (Some(path), false) => {
            let mut store = JsonStore::open(Path::new(path))?;
            let summary = execute(&text, &mut store, &opts, xml)?;
            store.save()?;
            info!(entities = store.len(), store = %path, "Store saved");
            summary
        }
        _ => {
            if args.store.is_none() && !args.dry_run {
                info!("No store path given; running in memory only");
            }
            let mut store = MemoryStore::new();
            execute(&text, &mut store, &opts, xml)?
        }
    };

    if let Some(report_path) = &args.report {
        report::write_report(Path::new(report_path), &summary.skips)
            .context("Failed to write skip report")?;
        println!("Skip report written to {}", report_path);
    }

    print_summary(&summary.stats, start.elapsed().as_secs_f64());
    Ok(())
}

fn execute<S: Store>(
    text: &str,
    store: &mut S,
    opts: &ImportOptions,
    xml: bool,
) -> Result<RunSummary> {
    if xml {
        pipeline::run_xml(text, store, opts)
    } else {
        pipeline::run_sql(text, store, opts)
    }
}

fn print_summary(stats: &ImportStats, elapsed_secs: f64) {
    println!();
    println!("=== Summary ===");
    println!("Elapsed:            {:.2}s", elapsed_secs);
    println!();
    println!("                 created  updated   merged  skipped");
    for (kind, counters) in [
        (EntityKind::Author, stats.authors),
        (EntityKind::Category, stats.categories),
        (EntityKind::Post, stats.posts),
        (EntityKind::Page, stats.pages),
    ] {
        println!(
            "{:<12} {:>11} {:>8} {:>8} {:>8}",
            kind.label(),
            counters.created,
            counters.updated,
            counters.merged,
            counters.skipped
        );
    }
    println!();
    println!("Total created:      {}", stats.created());
    println!("Total updated:      {}", stats.updated());
    println!("Total skipped:      {}", stats.skipped());
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Sql(args) => run_migrate(args, false),
        Commands::Xml(args) => run_migrate(args, true),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
