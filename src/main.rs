//! Driftnet main entry point
//!
//! This is the command-line interface for the Driftnet fetch/crawl toolkit.

use anyhow::Context;
use clap::{Parser, Subcommand};
use driftnet::config::{load_config, Config};
use driftnet::export::{export_auto, Record};
use driftnet::{CrawlOptions, Crawler, Fetcher};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Driftnet: a polite web fetching and crawling toolkit
///
/// Driftnet fetches pages through an adaptive rate limiter, retry with
/// backoff, and a TTL response cache, and can crawl link graphs
/// breadth-first inside a domain boundary.
#[derive(Parser, Debug)]
#[command(name = "driftnet")]
#[command(version)]
#[command(about = "A polite web fetching and crawling toolkit", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one or more URLs and print (or export) the results
    Fetch {
        /// URLs to fetch
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Export results to this file instead of printing bodies
        /// (.json, .jsonl, .csv, .tsv, .db, .sqlite)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Crawl breadth-first from a start URL
    Crawl {
        /// Start URL
        #[arg(value_name = "URL")]
        url: String,

        /// Stop after this many pages (overrides the config value)
        #[arg(long, value_name = "N")]
        max_pages: Option<usize>,

        /// Follow links off the start URL's domain
        #[arg(long)]
        allow_cross_domain: bool,

        /// Export crawled pages to this file (.json, .jsonl, .csv, .tsv, .db, .sqlite)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => Config::default(),
    };

    match cli.command {
        Command::Fetch { urls, output } => handle_fetch(&config, &urls, output.as_deref()).await,
        Command::Crawl {
            url,
            max_pages,
            allow_cross_domain,
            output,
        } => {
            handle_crawl(
                &config,
                &url,
                max_pages,
                allow_cross_domain,
                output.as_deref(),
            )
            .await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("driftnet=info,warn"),
            1 => EnvFilter::new("driftnet=debug,info"),
            2 => EnvFilter::new("driftnet=trace,debug"),
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

/// Handles the fetch command: single URLs print their body, batches and
/// exports go through the record surface.
async fn handle_fetch(
    config: &Config,
    urls: &[String],
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let fetcher = Fetcher::new(config).context("failed to build fetcher")?;

    if urls.len() == 1 && output.is_none() {
        let result = fetcher.fetch(&urls[0]).await?;
        println!("{}", result.text());
        return Ok(());
    }

    let results = fetcher.fetch_many(urls).await;
    let failed = urls.len() - results.len();

    let records: Vec<Record> = results
        .iter()
        .map(|r| {
            let mut record = Record::new();
            record.insert("url".to_string(), json!(r.url.as_str()));
            record.insert("status".to_string(), json!(r.status));
            record.insert("fetched_at".to_string(), json!(r.fetched_at.to_rfc3339()));
            record.insert("from_cache".to_string(), json!(r.from_cache));
            record.insert("body".to_string(), json!(r.text()));
            record
        })
        .collect();

    if let Some(path) = output {
        let dest = export_auto(&records, path)?;
        println!("Exported {} results to {}", records.len(), dest);
    } else {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
    }

    if failed > 0 {
        tracing::warn!("{} of {} fetches failed", failed, urls.len());
    }
    Ok(())
}

/// Handles the crawl command
async fn handle_crawl(
    config: &Config,
    url: &str,
    max_pages: Option<usize>,
    allow_cross_domain: bool,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let fetcher = Fetcher::new(config).context("failed to build fetcher")?;
    let crawler = Crawler::new(fetcher);

    let options = CrawlOptions {
        max_pages: max_pages.unwrap_or(config.crawl.max_pages),
        same_domain: !allow_cross_domain && config.crawl.same_domain,
        link_filter: None,
    };

    let outcome = crawler.crawl(url, &options).await?;

    println!(
        "Crawled {} pages ({} failures, {:?})",
        outcome.pages.len(),
        outcome.failures.len(),
        outcome.status
    );
    for page in &outcome.pages {
        println!(
            "  {}  {}",
            page.url,
            page.document.title.as_deref().unwrap_or("-")
        );
    }
    for failure in &outcome.failures {
        println!("  FAILED {}  {}", failure.url, failure.error);
    }

    if let Some(path) = output {
        let records: Vec<Record> = outcome
            .pages
            .iter()
            .map(|page| {
                let mut record = Record::new();
                record.insert("url".to_string(), json!(page.url.as_str()));
                record.insert("title".to_string(), json!(page.document.title));
                record.insert(
                    "links".to_string(),
                    json!(page
                        .document
                        .links
                        .iter()
                        .map(|l| l.as_str())
                        .collect::<Vec<_>>()),
                );
                record
            })
            .collect();
        let dest = export_auto(&records, path)?;
        println!("Exported {} pages to {}", records.len(), dest);
    }

    Ok(())
}
