//! hopper command-line entry point

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use hopper::config::{load_config, CrawlConfig};
use hopper::{Crawler, LogObserver};
use tracing_subscriber::EnvFilter;

/// hopper: a polite, concurrent web crawler
#[derive(Parser, Debug)]
#[command(name = "hopper")]
#[command(version)]
#[command(about = "A polite, concurrent web crawler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl starting from the given seed URLs
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Seed URLs to start from
    #[arg(value_name = "SEED", required = true)]
    seeds: Vec<String>,

    /// Optional TOML configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of concurrent workers
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Minimum gap between requests to the same host, in seconds
    #[arg(long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// HTTP User-Agent (also the robots.txt agent key)
    #[arg(long, value_name = "STRING")]
    user_agent: Option<String>,

    /// Only crawl these hosts (comma-separated, wildcards allowed)
    #[arg(long, value_name = "HOST,...", value_delimiter = ',')]
    allow: Vec<String>,

    /// Never crawl these hosts (comma-separated, wildcards allowed)
    #[arg(long, value_name = "HOST,...", value_delimiter = ',')]
    deny: Vec<String>,

    /// Maximum link depth from any seed
    #[arg(long, value_name = "N")]
    depth: Option<usize>,

    /// Per-request fetch timeout, in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<f64>,

    /// Maximum body bytes read per response
    #[arg(long, value_name = "BYTES")]
    max_content_length: Option<u64>,

    /// Additional media type delivered to the response observer
    #[arg(long, value_name = "TYPE")]
    mediatype: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hopper=info,warn"),
            1 => EnvFilter::new("hopper=debug,info"),
            2 => EnvFilter::new("hopper=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Handles the `run` subcommand
async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(args)?;

    let crawler = Crawler::new(config)?.with_observer(Arc::new(LogObserver));

    // First ctrl-c drains gracefully; a second one exits immediately
    let handle = crawler.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, draining in-flight requests");
            handle.shutdown();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let stats = crawler.run().await?;

    println!(
        "Crawled {} page(s) ({} URL(s) admitted, {} error(s)) in {:.1?}",
        stats.fetched, stats.admitted, stats.errors, stats.elapsed
    );

    Ok(())
}

/// Merges the optional config file with command-line overrides
fn build_config(args: RunArgs) -> Result<CrawlConfig, hopper::ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => CrawlConfig::default(),
    };

    config.seeds = args.seeds;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(delay) = args.delay {
        config.delay_ms = (delay * 1000.0) as u64;
    }
    if let Some(user_agent) = args.user_agent {
        config.user_agent = user_agent;
    }
    if !args.allow.is_empty() {
        config.allowed_domains = args.allow;
    }
    if !args.deny.is_empty() {
        config.disallowed_domains = args.deny;
    }
    if let Some(depth) = args.depth {
        config.allowed_depth = Some(depth);
    }
    if let Some(timeout) = args.timeout {
        config.timeout_ms = (timeout * 1000.0) as u64;
    }
    if let Some(max) = args.max_content_length {
        config.max_content_length = max;
    }
    if let Some(mediatype) = args.mediatype {
        config.mediatype = mediatype;
    }

    Ok(config)
}
