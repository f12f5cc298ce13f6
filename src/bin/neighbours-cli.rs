//! NEIGHBOURS CLI
//!
//! Loads a plain-text embedding file and prints the nearest neighbours of
//! each query word.

use anyhow::Context;
use clap::Parser;
use neighbours::{
    AsyncNeighborService, Measure, NeighborConfig, NeighborService, NeighbourRequest, Neighbours,
    VectorStore,
};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// NEIGHBOURS - nearest words in an embedding space
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Embedding file: one `word v1 v2 ... vD` per line
    #[arg(short, long)]
    vectors: PathBuf,

    /// Distance measure (euclidean or cosine)
    #[arg(short, long, default_value = "cosine")]
    measure: String,

    /// Number of neighbours per query (0 = whole vocabulary)
    #[arg(short = 'k', long, default_value_t = 10)]
    topk: usize,

    /// Only keep neighbours closer than this distance
    #[arg(short, long)]
    dist: Option<f32>,

    /// Precompute neighbours for the whole vocabulary first
    #[arg(long, default_value_t = false)]
    pre_search: bool,

    /// Use the single-threaded precompute instead of the parallel one
    #[arg(long, default_value_t = false)]
    no_accelerator: bool,

    /// Number of precompute workers (0 = auto-detect based on CPU cores)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Print distances and indices instead of words
    #[arg(long, default_value_t = false)]
    scores: bool,

    /// Query words
    #[arg(required = true)]
    words: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("neighbours=info".parse()?))
        .init();

    let args = Args::parse();
    let measure: Measure = args.measure.parse()?;

    let path = args.vectors.clone();
    let store = tokio::task::spawn_blocking(move || load_vectors(&path)).await??;
    info!(
        "Loaded {} vectors of dimension {} from {}",
        store.len(),
        store.dimension(),
        args.vectors.display()
    );

    let config = NeighborConfig::default()
        .with_workers(args.workers)
        .with_accelerate(!args.no_accelerator);
    let service = AsyncNeighborService::new(Arc::new(NeighborService::with_config(
        Arc::new(store),
        config,
    )?));

    let topk = request_topk(args.topk, args.pre_search, service.inner().store().len());
    if args.pre_search {
        if let Some(k) = topk {
            service
                .pre_search(measure, k, !args.no_accelerator)
                .await?;
        }
    }

    for word in &args.words {
        let mut request = NeighbourRequest::new(word.as_str(), measure);
        request.topk = topk;
        request.dist = args.dist;
        request.return_words = !args.scores;

        match service.find_neighbours(request).await {
            Ok(Neighbours::Words(words)) => println!("{}: {}", word, words.join(" ")),
            Ok(Neighbours::Scored(scored)) => {
                let pairs: Vec<String> = scored
                    .indices
                    .iter()
                    .zip(&scored.distances)
                    .map(|(i, d)| format!("{}:{:.4}", i, d))
                    .collect();
                println!("{}: {}", word, pairs.join(" "));
            }
            Err(e) => eprintln!("{}: {}", word, e),
        }
    }

    debug!("{}", service.inner().stats().summary());
    Ok(())
}

/// `topk` sent with each request. With pre-search on, "whole vocabulary"
/// becomes `Some(n)` so lookups match the precomputed `(measure, n)` result.
fn request_topk(topk: usize, pre_search: bool, vocab_size: usize) -> Option<usize> {
    match (topk, pre_search) {
        (0, true) if vocab_size > 0 => Some(vocab_size),
        (0, _) => None,
        (k, _) => Some(k),
    }
}

fn load_vectors(path: &Path) -> anyhow::Result<VectorStore> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_vectors(BufReader::new(file))
}

/// word2vec text header: exactly `<count> <dimension>`, both integers
fn is_word2vec_header(tokens: &[&str]) -> bool {
    tokens.len() == 2 && tokens.iter().all(|t| t.parse::<usize>().is_ok())
}

/// Parse `word v1 ... vD` lines; blank lines and a leading `N D` header are skipped
fn parse_vectors(reader: impl BufRead) -> anyhow::Result<VectorStore> {
    let mut words = Vec::new();
    let mut data = Vec::new();
    let mut dimension = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((word, rest)) = tokens.split_first() else {
            continue;
        };
        if line_no == 0 && is_word2vec_header(&tokens) {
            debug!("Skipping header: {}", line);
            continue;
        }

        let values = rest
            .iter()
            .map(|t| t.parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("line {}: bad number", line_no + 1))?;

        let dim = *dimension.get_or_insert(values.len());
        if values.len() != dim {
            anyhow::bail!(
                "line {}: expected {} values, got {}",
                line_no + 1,
                dim,
                values.len()
            );
        }
        words.push(word.to_string());
        data.extend(values);
    }

    let dimension = dimension.context("embedding file is empty")?;
    Ok(VectorStore::from_flat(words, data, dimension)?)
}
