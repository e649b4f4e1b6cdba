//! Doulist-Harvester main entry point
//!
//! This is the command-line interface for the Doulist-Harvester list harvester.

use anyhow::{bail, Context};
use clap::Parser;
use doulist_harvester::config::{load_config_unvalidated, validate, Config};
use doulist_harvester::crawler::{
    AbortOnExhaustion, ExhaustionHandler, FetchError, Harvester, RetryDecision,
};
use doulist_harvester::merge::DedupMode;
use doulist_harvester::output::{
    manifest_path, print_summary, progress_target, FILTERED_FILE_NAME, MERGED_FILE_NAME,
};
use doulist_harvester::storage::{open_cache_store, CacheStore};
use doulist_harvester::url::{page_locator, source_id};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Doulist-Harvester: resumable list harvesting into chunked RSS feeds
///
/// Crawls paginated lists one source at a time, checkpoints every page into a
/// per-source cache, then merges all caches into deduplicated (and optionally
/// year-filtered) RSS documents split into bounded chunks.
#[derive(Parser, Debug)]
#[command(name = "doulist-harvester")]
#[command(version = "1.0.0")]
#[command(about = "Resumable list harvester with chunked RSS output", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Add a list locator to harvest (repeatable)
    #[arg(long = "source", value_name = "URL")]
    sources: Vec<String>,

    /// Exclude a list locator from the merged output (repeatable)
    #[arg(long = "exclude", value_name = "URL")]
    excludes: Vec<String>,

    /// 1-based page every source starts from
    #[arg(long, value_name = "N")]
    start_page: Option<u32>,

    /// Dedup mode: title_year, title_link or link
    #[arg(long, value_name = "MODE")]
    dedup: Option<DedupMode>,

    /// Keep only records from this year on in the filtered output
    #[arg(long, value_name = "YEAR")]
    min_year: Option<u32>,

    /// Keep only records up to this year in the filtered output
    #[arg(long, value_name = "YEAR")]
    max_year: Option<u32>,

    /// Ask on stdin whether to keep retrying when a page exhausts its retries
    #[arg(long)]
    interactive: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(config, cli.interactive).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("doulist_harvester=info,warn"),
            1 => EnvFilter::new("doulist_harvester=debug,info"),
            2 => EnvFilter::new("doulist_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any), applies command-line overrides and validates
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_unvalidated(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded (hash: {})", hash);
            config
        }
        None => {
            if cli.sources.is_empty() {
                bail!("no configuration file given; pass at least one --source");
            }
            Config::default()
        }
    };

    config.harvest.sources.extend(cli.sources.iter().cloned());
    config.harvest.exclude.extend(cli.excludes.iter().cloned());
    if let Some(start_page) = cli.start_page {
        config.harvest.start_page = start_page;
    }
    if let Some(mode) = cli.dedup {
        config.harvest.dedup_mode = mode;
    }
    if cli.min_year.is_some() {
        config.harvest.min_year = cli.min_year;
    }
    if cli.max_year.is_some() {
        config.harvest.max_year = cli.max_year;
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the resolved plan
fn handle_dry_run(config: &Config) {
    let store = open_cache_store(&config.output, &config.cache);
    let output = &config.output;

    println!("=== Doulist-Harvester Dry Run ===\n");

    println!("Sources ({}):", config.active_sources().len());
    for source in config.active_sources() {
        let id = source_id(&source);
        println!("  - {} (id {})", source, id);
        match page_locator(&source, config.harvest.start_page) {
            Ok(first) => println!("    first page: {}", first),
            Err(e) => println!("    first page: invalid ({})", e),
        }
        println!("    cache: {}", store.path_for(&id).display());
        println!(
            "    progress: {}",
            progress_target(&output.output_root, &id).display()
        );
    }

    println!("\nExcluded ({}):", config.harvest.exclude.len());
    for locator in &config.harvest.exclude {
        println!("  - {} (id {})", locator, source_id(locator));
    }

    println!("\nMerge:");
    println!("  Dedup mode: {}", config.harvest.dedup_mode);
    println!("  Year filter: {}", config.year_range().describe());

    println!("\nPacing:");
    println!(
        "  Delay between pages: {}-{}s",
        config.delay.min_secs, config.delay.max_secs
    );
    println!(
        "  Retries per round: {} ({}s apart)",
        config.fetch.retries, config.fetch.retry_delay_secs
    );

    let merged = output.output_root.join(MERGED_FILE_NAME);
    println!("\nOutput (chunks of {}):", output.chunk_size);
    println!("  Merged manifest: {}", manifest_path(&merged).display());
    if config.year_range().is_active() {
        let filtered = output.filtered_root.join(FILTERED_FILE_NAME);
        println!("  Filtered manifest: {}", manifest_path(&filtered).display());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, interactive: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} source(s), dedup mode {}",
        config.active_sources().len(),
        config.harvest.dedup_mode
    );

    let handler: Arc<dyn ExhaustionHandler> = if interactive {
        Arc::new(PromptOnExhaustion)
    } else {
        Arc::new(AbortOnExhaustion)
    };

    let harvester = Harvester::from_config(config, handler)?;
    match harvester.run().await {
        Ok(summary) => {
            tracing::info!("Harvest completed successfully");
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

/// Asks the operator on stdin whether to start another retry round
struct PromptOnExhaustion;

impl ExhaustionHandler for PromptOnExhaustion {
    fn on_exhausted(&self, url: &str, attempts: u32, last_error: &FetchError) -> RetryDecision {
        eprintln!("Failed to fetch {} after {} attempts: {}", url, attempts, last_error);
        eprint!("Keep retrying? [Y/n] ");
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => return RetryDecision::Abort,
            Ok(_) => {}
        }

        match answer.trim().to_lowercase().as_str() {
            "" | "y" | "yes" => RetryDecision::Continue,
            _ => RetryDecision::Abort,
        }
    }
}
