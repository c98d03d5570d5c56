//! Review-Crawler main entry point
//!
//! This is the command-line interface for the review crawler.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use review_crawler::config::validation::validate;
use review_crawler::config::{load_config_with_hash, Config};
use review_crawler::crawler::crawl;
use review_crawler::output::{print_report, CrawlStatus};
use review_crawler::{AppId, CancelFlag, CrawlRequest, DateRange};
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status for a crawl stopped by Ctrl-C
const EXIT_CANCELLED: u8 = 130;

/// Review-Crawler: harvest the public reviews of one application
///
/// Pages through the review feed newest first, keeps the reviews submitted
/// within the requested dates, and writes them as numbered JSON chunk files.
#[derive(Parser, Debug)]
#[command(name = "review-crawler")]
#[command(version)]
#[command(about = "Harvests application reviews into JSON chunk files", long_about = None)]
struct Cli {
    /// Application id whose reviews are crawled
    #[arg(value_name = "APP_ID")]
    app_id: AppId,

    /// First day to include (YYYY-MM-DD, UTC)
    #[arg(long, value_name = "DATE")]
    start_date: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD, UTC)
    #[arg(long, value_name = "DATE")]
    end_date: Option<NaiveDate>,

    /// Stop after this many pages (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Directory the chunk files are written into
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum reviews per chunk file
    #[arg(long, value_name = "N")]
    chunk_size: Option<usize>,

    /// Reviews requested per page (1-100)
    #[arg(long, value_name = "N")]
    page_size: Option<u32>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep paginating after reviews older than the start date appear
    #[arg(long)]
    no_early_stop: bool,

    /// Replace reviewer ids with their SHA-256 digest
    #[arg(long)]
    anonymize: bool,

    /// Skip the store lookup of the app's name and developers
    #[arg(long)]
    no_app_details: bool,

    /// Validate settings and show what would be crawled without crawling
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
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = build_config(&cli)?;
    let range = DateRange::from_dates(cli.start_date, cli.end_date)?;
    let request = CrawlRequest::new(cli.app_id, range)
        .with_max_pages(cli.max_pages.unwrap_or(config.crawl.max_pages));

    if cli.dry_run {
        handle_dry_run(&config, &request);
        return Ok(ExitCode::SUCCESS);
    }

    handle_crawl(config, request, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("review_crawler=info,warn"),
            1 => EnvFilter::new("review_crawler=debug,info"),
            2 => EnvFilter::new("review_crawler=trace,debug"),
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

/// Loads the config file if one was given, then applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(dir) = &cli.output {
        config.output.directory = dir.to_string_lossy().into_owned();
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.output.chunk_size = chunk_size;
    }
    if let Some(page_size) = cli.page_size {
        config.crawl.page_size = page_size;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if cli.no_early_stop {
        config.crawl.early_stop = false;
    }
    if cli.anonymize {
        config.crawl.anonymize_reviewers = true;
    }
    if cli.no_app_details {
        config.api.app_details = false;
    }

    validate(&config).context("invalid settings")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, request: &CrawlRequest) {
    println!("=== Review-Crawler Dry Run ===\n");

    println!("Request:");
    println!("  App ID: {}", request.app_id);
    println!("  Date range: {}", request.date_range);
    match request.max_pages {
        0 => println!("  Max pages: unlimited"),
        n => println!("  Max pages: {}", n),
    }

    println!("\nAPI:");
    println!("  Endpoint: {}", config.api.endpoint);
    println!("  User agent: {}", config.api.user_agent);
    println!(
        "  Filter: {}, language: {}, purchase type: {}",
        config.api.review_filter, config.api.language, config.api.purchase_type
    );
    if let Some(days) = config.api.day_range {
        println!("  Day range: {}", days);
    }
    println!("  App details lookup: {}", config.api.app_details);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.api.timeout_secs, config.api.connect_timeout_secs
    );

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: {}ms doubling up to {}ms",
        config.retry.base_delay_ms, config.retry.max_delay_ms
    );

    println!("\nCrawl:");
    println!("  Page size: {}", config.crawl.page_size);
    println!("  Early stop: {}", config.crawl.early_stop);
    println!("  Anonymize reviewers: {}", config.crawl.anonymize_reviewers);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Chunk size: {}", config.output.chunk_size);

    println!("\n✓ Configuration is valid");
}

/// Waits for interrupts: the first cancels the crawl, the second aborts it
///
/// Returns true once a second interrupt arrives; the caller then exits
/// without waiting for the final flush.
async fn watch_interrupts<F, Fut>(mut interrupt: F, cancel: CancelFlag) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupt().await.is_err() {
        return false;
    }
    tracing::warn!("Interrupt received, finishing the current page (Ctrl-C again to abort)");
    cancel.cancel();

    if interrupt().await.is_err() {
        return false;
    }
    tracing::error!("Second interrupt received, exiting without flushing");
    true
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    request: CrawlRequest,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, on_signal).await {
            std::process::exit(i32::from(EXIT_CANCELLED));
        }
    });

    let report = crawl(config, request, &cancel).await?;
    if !quiet {
        print_report(&report);
    }

    let code = match &report.status {
        CrawlStatus::Done => ExitCode::SUCCESS,
        CrawlStatus::Cancelled => ExitCode::from(EXIT_CANCELLED),
        CrawlStatus::Failed(e) => {
            tracing::error!("Crawl failed ({}): {}", e.kind(), e);
            ExitCode::FAILURE
        }
    };
    Ok(code)
}
