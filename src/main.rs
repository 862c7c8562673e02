//! Ripple-Scope main entry point
//!
//! This is the command-line interface for the Ripple-Scope crawler.

use anyhow::{Context, Result};
use clap::Parser;
use ripple_scope::config::{load_config_with_hash, Config};
use ripple_scope::crawler::Crawler;
use ripple_scope::frontier::{load_statistics, print_statistics, FrontierMode};
use ripple_scope::storage::{open_storage, FrontierStore};
use ripple_scope::url::{canonicalize_str, UrlFilter};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Ripple-Scope: a polite, scope-restricted web crawler
///
/// Ripple-Scope crawls a fixed set of root domains from a persistent
/// frontier, spaces requests to every host, skips crawler traps and writes
/// corpus statistics to report files while it runs.
#[derive(Parser, Debug)]
#[command(name = "ripple-scope")]
#[command(version = "1.0.0")]
#[command(about = "A polite, scope-restricted web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume the stored frontier (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Discard the stored frontier and start from the seeds
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show the seeds without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show frontier statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        let mode = if cli.fresh {
            FrontierMode::Fresh
        } else {
            FrontierMode::Resume
        };
        handle_crawl(config, &config_hash, mode).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_scope=info,warn"),
            1 => EnvFilter::new("ripple_scope=debug,info"),
            2 => EnvFilter::new("ripple_scope=trace,debug"),
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

/// Handles the --dry-run mode: shows the configuration and seed eligibility
fn handle_dry_run(config: &Config) {
    println!("=== Ripple-Scope Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Max body size: {} bytes", config.crawler.max_body_bytes);
    println!("  Min page words: {}", config.crawler.min_page_words);
    match &config.crawler.cache_server {
        Some(server) => println!("  Cache server: {}", server),
        None => println!("  Cache server: (none)"),
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Reports: {}", config.output.reports_dir);
    println!("  Flush every: {} pages", config.output.flush_every);

    println!("\nRoot Domains ({}):", config.scope.root_domains.len());
    for domain in &config.scope.root_domains {
        println!("  - {}", domain);
    }
    println!("Institution domain: {}", config.scope.institution_domain);

    let filter = UrlFilter::from_config(config);
    let mut eligible = 0;
    println!("\nSeeds ({}):", config.scope.seeds.len());
    for seed in &config.scope.seeds {
        match canonicalize_str(seed) {
            Ok(canonical) => match filter.rejection_reason(&canonical) {
                None => {
                    eligible += 1;
                    println!("  ✓ {}", canonical);
                }
                Some(reason) => println!("  ✗ {} ({})", canonical, reason),
            },
            Err(e) => println!("  ✗ {} ({})", seed, e),
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} eligible seed URLs", eligible);
}

/// Handles the --stats mode: shows frontier statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    let path = Path::new(&config.output.database_path);
    println!("Database: {}\n", path.display());

    if !path.exists() {
        println!("No frontier database found.");
        return Ok(());
    }

    let storage = open_storage(path)?;
    let stats = load_statistics(&storage)?;
    let latest_run = storage.get_latest_run()?;

    print_statistics(&stats, latest_run.as_ref());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, mode: FrontierMode) -> Result<()> {
    match mode {
        FrontierMode::Fresh => tracing::info!("Starting fresh crawl (discarding stored frontier)"),
        FrontierMode::Resume => tracing::info!("Starting crawl (resuming stored frontier)"),
    }
    tracing::info!(
        "Root domains: {}, seeds: {}, workers: {}",
        config.scope.root_domains.len(),
        config.scope.seeds.len(),
        config.crawler.workers
    );

    let crawler = Crawler::new(config, config_hash, mode)?;
    let run_id = crawler.begin()?;

    tokio::select! {
        result = crawler.run(run_id) => {
            let summary = result?;
            tracing::info!(
                "Crawl completed: {} pages processed, {} links enqueued, {} failed workers",
                summary.pages_processed,
                summary.links_enqueued,
                summary.failed_workers
            );
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            crawler.interrupt(run_id)?;
            tracing::info!("Frontier saved; rerun without --fresh to resume");
        }
    }

    Ok(())
}
