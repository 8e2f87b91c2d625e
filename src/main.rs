//! Sitescope main entry point
//!
//! Command-line interface for the sitescope website comparison indexer.

use anyhow::Context;
use clap::Parser;
use sitescope::config::{load_config_with_hash, Config, EmbeddingProviderKind};
use sitescope::crawler::{CancelToken, HttpFetcher};
use sitescope::index::{Embedder, HashEmbedder, HttpEmbedder, IndexStore};
use sitescope::output::print_summary;
use sitescope::pipeline::{load_run_targets, run_pipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Sitescope: scrape a batch of websites and build a comparison index
///
/// Sitescope crawls each listed site in parallel, cleans and chunks the page
/// text, and rebuilds a per-run vector index that similarity queries run
/// against. Feed it a CSV of company names and homepage URLs, then ask it
/// questions with --query.
#[derive(Parser, Debug)]
#[command(name = "sitescope")]
#[command(version)]
#[command(about = "Website comparison scraper and index builder", long_about = None)]
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

    /// Validate config and targets, show the scrape plan without fetching
    #[arg(long, conflicts_with = "query")]
    dry_run: bool,

    /// Query the existing index instead of scraping
    #[arg(long, value_name = "TEXT")]
    query: Option<String>,

    /// Number of chunks to retrieve per query (per site with --balanced)
    #[arg(long, default_value_t = 10, requires = "query")]
    top_k: usize,

    /// Retrieve top-k chunks from every site instead of globally
    #[arg(long, requires = "query")]
    balanced: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if let Some(question) = &cli.query {
        handle_query(&config, question, cli.top_k, cli.balanced).await?;
    } else {
        handle_run(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitescope=info,warn"),
            1 => EnvFilter::new("sitescope=debug,info"),
            2 => EnvFilter::new("sitescope=trace,debug"),
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

/// Builds the configured embedding provider
fn build_embedder(config: &Config) -> anyhow::Result<Box<dyn Embedder>> {
    match config.embedding.provider {
        EmbeddingProviderKind::Hash => Ok(Box::new(HashEmbedder::new(config.embedding.dims))),
        EmbeddingProviderKind::Http => {
            let endpoint = config
                .embedding
                .endpoint
                .as_deref()
                .context("http embedding provider requires an endpoint")?;
            let api_key = match &config.embedding.api_key_env {
                Some(var) => match std::env::var(var) {
                    Ok(key) => Some(key),
                    Err(_) => {
                        tracing::warn!("API key variable {} is not set", var);
                        None
                    }
                },
                None => None,
            };
            let embedder = HttpEmbedder::new(
                endpoint,
                &config.embedding.model,
                config.embedding.dims,
                api_key,
            )?;
            Ok(Box::new(embedder))
        }
    }
}

/// Handles the --dry-run mode: validates everything, fetches nothing
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Sitescope Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Page budget per site: {}", config.crawler.page_budget);
    println!("  Page concurrency: {}", config.crawler.page_concurrency);
    println!("  Site concurrency: {}", config.crawler.site_concurrency);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
    println!("  Fetch retries: {}", config.crawler.fetch_retries);
    println!("  Discovery depth: {}", config.crawler.discover_depth);

    println!("\nChunking:");
    println!("  Chunk size: {}", config.chunking.chunk_size);
    println!("  Chunk overlap: {}", config.chunking.chunk_overlap);

    println!("\nEmbedding:");
    println!("  Provider: {:?}", config.embedding.provider);
    println!("  Model: {}", config.embedding.model);
    println!("  Dimensions: {}", config.embedding.dims);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let targets = load_run_targets(config)?;
    println!("\nTargets ({}):", targets.len());
    for target in &targets {
        println!("  - {} ({})", target.name, target.seed_url);
    }

    println!("\n✓ Configuration and targets are valid");
    println!(
        "✓ Would scrape up to {} pages across {} sites",
        config.crawler.page_budget * targets.len(),
        targets.len()
    );

    Ok(())
}

/// Handles the default mode: scrape the batch and rebuild the index
async fn handle_run(config: &Config) -> anyhow::Result<()> {
    let targets = load_run_targets(config)?;
    tracing::info!("Loaded {} targets", targets.len());

    let fetcher = Arc::new(HttpFetcher::new(
        &config.user_agent,
        Duration::from_secs(config.crawler.fetch_timeout_secs),
    )?);
    let mut store = IndexStore::open(Path::new(&config.output.database_path))?;
    let embedder = build_embedder(config)?;

    let cancel = CancelToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight fetches");
            signal_cancel.cancel();
        }
    });

    let outcome = run_pipeline(
        config,
        &targets,
        fetcher,
        &mut store,
        embedder.as_ref(),
        &cancel,
    )
    .await?;

    print_summary(&outcome.summary);

    if outcome.summary.all_sites_failed() {
        anyhow::bail!("No site could be scraped; the index was not rebuilt");
    }
    Ok(())
}

/// Handles the --query mode against the previously built index
async fn handle_query(
    config: &Config,
    question: &str,
    top_k: usize,
    balanced: bool,
) -> anyhow::Result<()> {
    let store = IndexStore::open(Path::new(&config.output.database_path))?;
    let embedder = build_embedder(config)?;

    let collection = store
        .current_collection()?
        .context("No index has been built yet; run a scrape first")?;
    tracing::info!(
        "Querying collection {} ({} chunks, model {})",
        collection.id(),
        collection.chunk_count,
        collection.model
    );

    let results = if balanced {
        store
            .balanced_query(&collection, question, top_k, embedder.as_ref())
            .await?
    } else {
        store
            .query(&collection, question, top_k, None, embedder.as_ref())
            .await?
    };

    if results.is_empty() {
        println!("No matching chunks.");
        return Ok(());
    }

    for result in &results {
        println!(
            "--- {} | {} (score {:.3})",
            result.chunk.site_name, result.chunk.source_url, result.score
        );
        println!("{}\n", result.chunk.text);
    }

    Ok(())
}
