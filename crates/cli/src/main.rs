//! Diagnostic command surface over the doclens library crates.
//!
//! Everything here is thin orchestration: chunk previews delegate to
//! `doclens-chunker`, cache inspection delegates to `doclens-cache`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use doclens_cache::{CacheConfig, ProcessingCache};
use doclens_chunker::{CharHeuristicEstimator, Chunker, ChunkingConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "doclens")]
#[command(about = "Inspect documents: chunk previews and processing-cache diagnostics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview how a text file splits into token-budgeted chunks
    Chunk(ChunkArgs),

    /// Inspect or clear a durable processing cache
    Cache(CacheArgs),
}

#[derive(Args)]
struct ChunkArgs {
    /// Extracted text file (with `--- Page N ---` markers)
    file: PathBuf,

    /// Model input budget the chunks must fit
    #[arg(long, default_value_t = 8_192)]
    max_input_tokens: usize,

    /// Print full chunks as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    action: CacheAction,

    /// Durable cache file
    #[arg(long)]
    file: PathBuf,

    /// Processing-strategy namespace
    #[arg(long, default_value = "summary")]
    strategy: String,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show aggregate cache statistics
    Stats,

    /// List cached documents, oldest first
    List,

    /// Remove every entry
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Chunk(args) => run_chunk(&args),
        Commands::Cache(args) => run_cache(args).await,
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run_chunk(args: &ChunkArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Cannot read {}", args.file.display()))?;

    let config = ChunkingConfig::for_model_budget(args.max_input_tokens, &CharHeuristicEstimator);
    let chunker = Chunker::try_new(config)?;
    let chunks = chunker.chunk(&text);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    for chunk in &chunks {
        println!(
            "chunk {:>3}  pages {:>4}-{:<4}  {:>6} tokens",
            chunk.index, chunk.start_page, chunk.end_page, chunk.token_count
        );
    }
    println!("{}", Chunker::get_stats(&chunks));
    let estimate = Chunker::estimate_processing_time(&chunks);
    println!("Estimated processing time: {:.1}s", estimate.as_secs_f64());

    if !chunker.validate_chunks(&chunks) {
        log::warn!("Some chunks exceed the token budget (unsplittable paragraphs)");
    }
    Ok(())
}

async fn run_cache(args: CacheArgs) -> Result<()> {
    let config = CacheConfig::new(args.file, args.strategy);
    let cache: ProcessingCache<serde_json::Value> = ProcessingCache::open(config).await;

    match args.action {
        CacheAction::Stats => {
            println!("{}", cache.stats().await);
        }
        CacheAction::List => {
            let documents = cache.list_all().await;
            if documents.is_empty() {
                println!("Cache is empty");
            }
            for doc in documents {
                println!("{:>15}  {}", doc.created_at_ms, doc.source_locator);
            }
        }
        CacheAction::Clear => {
            cache.clear().await;
            println!("Cache cleared");
        }
    }
    Ok(())
}
