use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use scrapstats::describe::{DescriptionFormatter, MarkupFormatter, Verbatim};
use scrapstats::export;
use scrapstats::loader::RawInputs;
use scrapstats::pipeline::{Archive, IntegrityReport};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "scrapstats")]
#[command(about = "Join scrapbook archive exports and compute collection statistics")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every output document from a directory of exports
    Build(BuildArgs),
    /// Load and join the exports, then report integrity problems
    Validate(ValidateArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Directory containing the database exports
    #[arg(short, long)]
    input: String,

    /// Export date suffix of the input files (e.g. 20170301)
    #[arg(long)]
    date: Option<String>,
}

#[derive(Args)]
struct BuildArgs {
    #[command(flatten)]
    inputs: InputArgs,

    /// Output directory for generated documents
    #[arg(short, long)]
    output: String,

    /// Indent the JSON documents
    #[arg(long)]
    pretty: bool,

    /// Dry run - don't write output files
    #[arg(long)]
    dry_run: bool,

    /// Keep page descriptions as exported instead of rendering markup
    #[arg(long)]
    raw_descriptions: bool,
}

#[derive(Args)]
struct ValidateArgs {
    #[command(flatten)]
    inputs: InputArgs,
}

fn load_inputs(args: &InputArgs) -> Result<RawInputs> {
    RawInputs::load(Path::new(&args.input), args.date.as_deref())
}

fn print_report(report: &IntegrityReport) {
    println!("Duplicate IDs:      {}", report.duplicate_ids());
    for (record_set, ids) in &report.duplicates {
        println!("  {:<18}{}", record_set, ids.join(", "));
    }
    println!("Dangling join rows: {}", report.dangling_rows());
    for (join, outcome) in &report.joins {
        println!(
            "  {:<18}linked {}, dangling {}, blank {}",
            join, outcome.linked, outcome.dangling, outcome.blank
        );
    }
    println!("Orphan pages:       {}", report.orphan_pages.len());
    if report.has_orphans() {
        println!("  {}", report.orphan_pages.join(", "));
    }
}

fn run_build(args: BuildArgs) -> Result<()> {
    let start_loading = Instant::now();
    let inputs = load_inputs(&args.inputs)?;
    let loading_duration = start_loading.elapsed();

    let formatter: &dyn DescriptionFormatter = if args.raw_descriptions {
        &Verbatim
    } else {
        &MarkupFormatter
    };

    let start_building = Instant::now();
    let archive = Archive::build(&inputs, formatter)?;
    let building_duration = start_building.elapsed();
    info!(
        duration_secs = building_duration.as_secs_f64(),
        "Aggregation complete"
    );

    let start_export = Instant::now();
    let documents = if args.dry_run {
        info!("Dry run, skipping export");
        0
    } else {
        export::export_archive(&archive, Path::new(&args.output), args.pretty)?.len()
    };
    let export_duration = start_export.elapsed();

    println!();
    println!("=== Summary ===");
    println!("Loading time:       {:.2}s", loading_duration.as_secs_f64());
    println!("Aggregation time:   {:.2}s", building_duration.as_secs_f64());
    println!("Export time:        {:.2}s", export_duration.as_secs_f64());
    println!();
    println!("Books:              {}", archive.books.len());
    println!("Pages:              {}", archive.pages.len());
    println!("People:             {}", archive.people.len());
    println!("Places:             {}", archive.places.len());
    println!("Sources:            {}", archive.sources.len());
    println!("Keywords:           {}", archive.keywords.len());
    println!("Clippings:          {}", archive.collection.clippings);
    println!("Documents written:  {}", documents);
    print_report(&archive.report);

    Ok(())
}

/// Succeeds only when every page belongs to an existing book.
fn run_validate(args: ValidateArgs) -> Result<bool> {
    let inputs = load_inputs(&args.inputs)?;
    let archive = Archive::assemble(&inputs, &Verbatim)?;

    println!();
    println!("=== Integrity ===");
    print_report(&archive.report);

    Ok(!archive.report.has_orphans())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG, when set, overrides the -v level.
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Build(args) => run_build(args).map(|()| true),
        Commands::Validate(args) => run_validate(args),
    };

    match result {
        Ok(true) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            error!("Integrity check failed: pages reference missing books");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
