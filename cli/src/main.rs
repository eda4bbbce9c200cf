//! Operator CLI for a shelf vector store.
//!
//! Builds the store from a directory of handbooks and queries it the way the chat service does.
//!
//! # Usage
//!
//! ```bash
//! # Build the store from uploaded PDFs with the offline hash embedder
//! cargo run -p shelf-cli -- ingest ./uploads
//!
//! # Use a local Ollama server instead
//! cargo run -p shelf-cli -- --embedder ollama ingest ./uploads
//!
//! # Query
//! cargo run -p shelf-cli -- search "how do I renew a book?" -k 3
//! cargo run -p shelf-cli -- context "library hours" --max-length 1500
//! cargo run -p shelf-cli -- stats
//! ```

mod embedder;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use shelf_rag::{LibraryRag, RagConfig};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::embedder::{Embedder, EmbedderKind};

#[derive(Parser, Debug)]
#[command(name = "shelf", version, about)]
struct Args {
    /// JSON configuration file; missing keys take their defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Store directory, overriding the configuration and `SHELF_STORE_DIR`.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Embedding backend.
    #[arg(short, long, global = true, default_value_t = EmbedderKind::Hash)]
    embedder: EmbedderKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the store from the PDF, text and markdown files in a directory.
    Ingest {
        /// Directory holding the source documents.
        dir: PathBuf,
    },
    /// Search the store and print the ranked results as JSON.
    Search {
        /// Question to search for.
        query: String,
        /// Number of results.
        #[arg(short)]
        k: Option<usize>,
    },
    /// Print the context block the chat service would hand to generation.
    Context {
        /// Question to build the context for.
        query: String,
        /// Context budget in characters.
        #[arg(long)]
        max_length: Option<usize>,
    },
    /// Print store statistics as JSON.
    Stats,
    /// Remove the persisted store.
    Clear,
}

fn load_config(args: &Args) -> Result<RagConfig> {
    let mut config = match &args.config {
        Some(path) => RagConfig::from_file(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => RagConfig::default(),
    }
    .with_env_overrides();
    if let Some(dir) = &args.store_dir {
        config.store_dir.clone_from(dir);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn open(args: &Args) -> Result<LibraryRag<Embedder>> {
    let config = load_config(args)?;
    let embedder = args.embedder.create(&config)?;
    Ok(LibraryRag::new(embedder, config))
}

fn open_loaded(args: &Args) -> Result<LibraryRag<Embedder>> {
    let rag = open(args)?;
    if !rag.load() {
        warn!(
            store = %rag.config().store_dir.display(),
            "vector store not loaded; run `shelf ingest <dir>` first"
        );
    }
    Ok(rag)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match &args.command {
        Command::Ingest { dir } => {
            if !dir.is_dir() {
                bail!("{} is not a directory", dir.display());
            }
            let rag = open(&args)?;
            let report = rag
                .ingest_directory(dir)
                .await
                .with_context(|| format!("failed to ingest {}", dir.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Search { query, k } => {
            let rag = open_loaded(&args)?;
            let results = rag.search(query, *k).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Context { query, max_length } => {
            let rag = open_loaded(&args)?;
            let results = rag.search(query, None).await?;
            println!("{}", rag.format_context(&results, *max_length));
        }
        Command::Stats => {
            let rag = open_loaded(&args)?;
            println!("{}", serde_json::to_string_pretty(&rag.get_stats())?);
        }
        Command::Clear => {
            let rag = open(&args)?;
            rag.clear().await.context("failed to clear the vector store")?;
            println!("cleared {}", rag.config().store_dir.display());
        }
    }

    Ok(())
}
