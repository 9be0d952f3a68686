//! `clap`-derived command-line surface, built on the library's public API.
//!
//! Only compiled behind the `cli` feature; the core crate has no CLI
//! dependency otherwise.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Configuration;
use crate::embedder::{Embedder, HashEmbedder};
use crate::error::SearchResult;
use crate::two_tier::TwoTierSearcher;
use crate::vector_index::VectorIndex;

/// A small hybrid (lexical + semantic) search engine.
#[derive(Debug, Parser)]
#[command(name = "brr", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a vector index from documents read one-per-line from stdin.
    Index {
        /// Base path to write `<path>.npz` / `<path>.json` to.
        path: PathBuf,
    },
    /// Run a two-tier progressive search against a saved index.
    Search {
        /// Base path of a previously saved index.
        path: PathBuf,
        /// Query text.
        query: String,
        /// Number of results to return.
        #[arg(short, default_value_t = 10)]
        k: usize,
    },
    /// Print summary metadata about a saved index.
    Info {
        /// Base path of a previously saved index.
        path: PathBuf,
    },
}

/// Run the parsed CLI command.
///
/// # Errors
/// Propagates any [`crate::error::SearchError`] raised while building,
/// loading, or searching the index.
pub fn run(cli: Cli) -> SearchResult<()> {
    let config = Configuration::from_env();
    match cli.command {
        Command::Index { path } => run_index(&path),
        Command::Search { path, query, k } => run_search(&path, &query, k, &config),
        Command::Info { path } => run_info(&path),
    }
}

/// Reads documents one per line from stdin; `doc_id` is the 0-based line index.
fn run_index(path: &Path) -> SearchResult<()> {
    let stdin = std::io::stdin();
    let mut doc_ids = Vec::new();
    let mut texts = Vec::new();
    for (line_num, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        doc_ids.push(line_num.to_string());
        texts.push(crate::canonicalize::canonicalize_default(&line));
    }

    let embedder = HashEmbedder::default();
    info!(count = doc_ids.len(), "embedding documents");
    let embeddings = embedder.embed_batch(&texts)?;

    let mut index = VectorIndex::new(embedder.dimension(), embedder.model_id(), true);
    index.add_batch(doc_ids, embeddings)?;
    index.save(path)?;

    info!(path = %path.display(), count = index.count(), "index saved");
    Ok(())
}

fn run_search(path: &Path, query: &str, k: usize, config: &Configuration) -> SearchResult<()> {
    let index = VectorIndex::load(path)?;
    let fast_embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());

    let searcher = TwoTierSearcher::new(&index, fast_embedder, None, None, config.clone());
    if let Some(result) = searcher.search(query, k).last() {
        for hit in &result.hits {
            println!("{:.6}\t{}", hit.rrf_score, hit.doc_id);
        }
    }
    Ok(())
}

fn run_info(path: &Path) -> SearchResult<()> {
    let index = VectorIndex::load(path)?;
    println!("embedder_id: {}", index.embedder_id());
    println!("dimension:   {}", index.dimension());
    println!("documents:   {}", index.count());
    Ok(())
}
