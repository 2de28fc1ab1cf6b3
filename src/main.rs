//! Shelf-Scout main entry point
//!
//! This is the command-line interface for the Shelf-Scout catalogue crawler.

use clap::Parser;
use shelf_scout::config::{load_config_with_hash, Config};
use shelf_scout::crawler::{crawl, RetryPolicy};
use shelf_scout::output::{generate_markdown_summary, print_statistics};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Shelf-Scout: a grocery catalogue crawler
///
/// Shelf-Scout walks a retail site's category navigation, renders every
/// product listing and detail page, and writes one normalized product record
/// per product as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "shelf-scout")]
#[command(version)]
#[command(about = "A grocery catalogue crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Write product records here instead of the configured records path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let records_path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.records_path));

    if cli.dry_run {
        handle_dry_run(&config, &records_path);
        Ok(())
    } else {
        handle_crawl(&config, &config_hash, &records_path).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_scout=info,warn"),
            1 => EnvFilter::new("shelf_scout=debug,info"),
            2 => EnvFilter::new("shelf_scout=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config, records_path: &Path) {
    println!("=== Shelf-Scout Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    println!("  Start stage: {:?}", config.crawler.start_stage);
    println!(
        "  Max concurrent renders: {}",
        config.crawler.max_concurrent_renders
    );
    if config.crawler.allowed_domains.is_empty() {
        println!("  Allowed domains: (any)");
    } else {
        println!(
            "  Allowed domains: {}",
            config.crawler.allowed_domains.join(", ")
        );
    }

    println!("\nCategories ({}):", config.crawler.categories.len());
    for category in &config.crawler.categories {
        println!("  - {}", category);
    }

    println!("\nRendering:");
    println!("  Backend: {:?}", config.render.backend);
    println!(
        "  Selector wait: {}ms (poll every {}ms)",
        config.render.selector_wait_timeout_ms, config.render.selector_poll_interval_ms
    );
    println!(
        "  Scroll convergence: every {}ms, at most {} rounds",
        config.render.scroll_convergence_interval_ms, config.render.scroll_convergence_max_rounds
    );
    println!("  Fetch timeout: {}ms", config.render.fetch_timeout_ms);
    println!("  Home settle delay: {}ms", config.render.home_settle_ms);

    println!("\nRetry:");
    println!("  {}", RetryPolicy::from_config(&config.retry).describe());

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Records: {}", records_path.display());
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    records_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling {} categories from {}",
        config.crawler.categories.len(),
        config.crawler.seed_url
    );

    let mut report = match crawl(config, records_path).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };
    report.config_hash = config_hash.to_string();

    print_statistics(&report);

    let summary_path = Path::new(&config.output.summary_path);
    generate_markdown_summary(&report, summary_path)?;
    tracing::info!("Summary written to {}", summary_path.display());
    tracing::info!("Records written to {}", records_path.display());

    Ok(())
}
