//! ShadowGraph main entry point
//!
//! This is the command-line interface for the ShadowGraph crawl orchestrator.

use anyhow::Context;
use clap::Parser;
use shadowgraph::api::{create_router, AppState};
use shadowgraph::auth::AccountDirectory;
use shadowgraph::config::{load_config_with_hash, Config};
use shadowgraph::crawler::{CrawlExecutor, CrawlRequest, Crawler, SeedPolicy};
use shadowgraph::jobs::JobOrchestrator;
use shadowgraph::schedules::{ScheduleManager, TokioTimer};
use shadowgraph::storage::{open_event_store, EventSink};
use shadowgraph::throttle::{LoginGuard, RateLimiter, RedisCounter, RouteLimits};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// How often idle rate-limit windows are dropped from memory
const PURGE_INTERVAL: Duration = Duration::from_secs(300);

/// ShadowGraph: crawl-and-job orchestration
///
/// ShadowGraph runs bounded breadth-first crawls for provisioned accounts,
/// either inline or as background jobs, repeats them on schedules, and
/// throttles inbound requests and failed logins.
#[derive(Parser, Debug)]
#[command(name = "shadowgraph")]
#[command(version = "0.1.0")]
#[command(about = "Crawl-and-job orchestration service", long_about = None)]
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

    /// Validate config and show what would be served without starting the server
    #[arg(long, conflicts_with = "crawl")]
    dry_run: bool,

    /// Run one crawl from these seed URLs, print the result as JSON and exit
    #[arg(long, value_name = "URL", num_args = 1..)]
    crawl: Vec<String>,

    /// Keyword to count during a --crawl run (repeatable)
    #[arg(long = "keyword", value_name = "KEYWORD", requires = "crawl")]
    keywords: Vec<String>,

    /// Page budget for a --crawl run
    #[arg(long, value_name = "N", requires = "crawl")]
    max_pages: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if !cli.crawl.is_empty() {
        handle_crawl(&config, cli.crawl, cli.keywords, cli.max_pages).await
    } else {
        handle_serve(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shadowgraph=info,tower_http=info,warn"),
            1 => EnvFilter::new("shadowgraph=debug,tower_http=debug,info"),
            2 => EnvFilter::new("shadowgraph=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be served
fn handle_dry_run(config: &Config) {
    println!("=== ShadowGraph Dry Run ===\n");

    println!("Server:");
    println!("  Bind address: {}", config.server.bind_address);

    println!("\nCrawler:");
    println!("  User agent: {}", config.crawler.user_agent());
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );

    println!("\nThrottle:");
    match &config.throttle.redis_url {
        Some(url) => println!(
            "  Shared counters: {} (prefix {})",
            url, config.throttle.redis_prefix
        ),
        None => println!("  Shared counters: none (in-process only)"),
    }
    let limits = RouteLimits::from_config(&config.throttle);
    println!(
        "  Default: {} requests / {}s",
        config.throttle.default.limit, config.throttle.default.window_seconds
    );
    for route in &config.throttle.routes {
        println!(
            "  - {}: {} requests / {}s",
            route.route, route.limit, route.window_seconds
        );
    }
    println!(
        "  Longest window: {}s",
        limits.longest_window().as_secs()
    );

    println!("\nLogin lockout:");
    println!(
        "  {} failures lock for {}s",
        config.login.max_failures, config.login.lock_window_seconds
    );

    println!("\nJobs:");
    println!("  Workers: {}", config.jobs.max_workers);
    println!("  Queue capacity: {}", config.jobs.queue_capacity);
    println!("  Schedule overlap: {:?}", config.schedules.overlap);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nAccounts ({}):", config.accounts.len());
    for account in &config.accounts {
        println!("  - {}", account.email);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --crawl mode: runs one crawl inline and prints the result
async fn handle_crawl(
    config: &Config,
    seeds: Vec<String>,
    keywords: Vec<String>,
    max_pages: Option<u32>,
) -> anyhow::Result<()> {
    let mut request = CrawlRequest::new(seeds).with_keywords(keywords);
    if let Some(max_pages) = max_pages {
        request = request.with_max_pages(max_pages);
    }
    let request = request
        .validate(SeedPolicy::Required)
        .context("invalid crawl request")?;

    let crawler = Crawler::new(&config.crawler).context("failed to build HTTP client")?;
    let result = crawler.execute(&request).await?;

    tracing::info!(
        "Crawl finished: {} page(s), {} unique link(s)",
        result.aggregates.pages_scraped,
        result.aggregates.unique_links
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Handles the default mode: wires the core together and serves the HTTP API
async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let limiter = Arc::new(build_rate_limiter(&config).await);

    let store = open_event_store(Path::new(&config.storage.database_path))
        .with_context(|| format!("failed to open {}", config.storage.database_path))?;
    let events: Arc<dyn EventSink> = Arc::new(store);

    let crawler = Crawler::new(&config.crawler).context("failed to build HTTP client")?;
    let orchestrator =
        JobOrchestrator::start(&config.jobs, Arc::new(crawler), Arc::clone(&events));
    let schedules = ScheduleManager::new(
        orchestrator.clone(),
        Arc::new(TokioTimer::new()),
        Arc::clone(&events),
        config.schedules.overlap,
    );

    let accounts = AccountDirectory::from_config(&config.accounts);
    if accounts.is_empty() {
        tracing::warn!("No accounts configured; every authenticated route will return 401");
    }

    let login_guard = Arc::new(LoginGuard::from_config(&config.login));

    let state = AppState {
        orchestrator,
        schedules,
        limiter: Arc::clone(&limiter),
        login_guard: Arc::clone(&login_guard),
        accounts: Arc::new(accounts),
        events,
    };

    spawn_purge_task(limiter, login_guard);

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_address))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);
    axum::serve(
        listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Builds the request limiter, sharing counters through Redis when configured
///
/// An unreachable Redis at startup is not fatal; the limiter runs in-process.
async fn build_rate_limiter(config: &Config) -> RateLimiter {
    let limiter = RateLimiter::new(RouteLimits::from_config(&config.throttle));

    let Some(redis_url) = &config.throttle.redis_url else {
        tracing::info!("No redis-url configured; rate limits are per process");
        return limiter;
    };

    match RedisCounter::connect(redis_url, &config.throttle.redis_prefix).await {
        Ok(counter) => {
            tracing::info!("Sharing rate-limit counters through Redis");
            limiter.with_backend(Arc::new(counter))
        }
        Err(e) => {
            tracing::warn!("Redis unavailable ({}); rate limits are per process", e);
            limiter
        }
    }
}

fn spawn_purge_task(limiter: Arc<RateLimiter>, login_guard: Arc<LoginGuard>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = limiter.purge_idle();
            if purged > 0 {
                tracing::debug!("Purged {} idle rate-limit window(s)", purged);
            }
            let forgotten = login_guard.purge_idle(Instant::now());
            if forgotten > 0 {
                tracing::debug!("Forgot {} idle login failure record(s)", forgotten);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
