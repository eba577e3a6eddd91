use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use askdb_core::chunker::ChunkingConfig;
use askdb_core::config::{expand_path, Config};
use askdb_embed::{default_embedder, GenerationProviderConfig, HttpGenerator};
use askdb_retrieval::{
    build_index, ExpansionConfig, QueryExpander, RerankConfig, RetrievalConfig, Retriever,
};
use askdb_text::TantivyChunkIndex;
use askdb_vector::{Snapshot, LEXICAL_DIR};

const USAGE: &str = "Usage: askdb [--config <path>] <command>

Commands:
  ingest                                     build the index from the docs directory
  query <text> [--top-k N] [--min-score X]   search the index

Environment:
  RUST_LOG                  log filter (default: info)
  APP_USE_FAKE_EMBEDDINGS   1 = offline hash embedder, no credentials needed";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut config_path: Option<PathBuf> = None;
    let mut rest: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path");
                    process::exit(2);
                }
            }
            other => rest.push(other.to_string()),
        }
        i += 1;
    }

    let config = Config::load_from(config_path.as_deref())?;
    match rest.first().map(String::as_str) {
        Some("ingest") => ingest(&config).await,
        Some("query") => query(&config, &rest[1..]).await,
        _ => {
            eprintln!("{USAGE}");
            process::exit(2);
        }
    }
}

async fn ingest(config: &Config) -> Result<()> {
    let docs_dir = data_dir(config, "data.docs_dir", "./docs");
    let index_dir = data_dir(config, "data.index_dir", "./index");
    let chunking: ChunkingConfig = config.get_or("chunking");
    let embedder = default_embedder(config)?;

    println!("askdb ingest\n============");
    println!("Docs directory:  {}", docs_dir.display());
    println!("Index directory: {}", index_dir.display());

    let stats = build_index(&docs_dir, &index_dir, chunking, embedder.as_ref()).await?;
    println!(
        "\n✅ Indexed {} documents as {} chunks ({}-dim embeddings)",
        stats.documents, stats.chunks, stats.dim
    );
    println!("💡 To search, use: askdb query '<text>'");
    Ok(())
}

async fn query(config: &Config, args: &[String]) -> Result<()> {
    let query_text = match args.first() {
        Some(text) if !text.starts_with('-') => text.clone(),
        _ => {
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };
    let mut top_k: Option<usize> = None;
    let mut min_score: Option<f32> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--top-k" => {
                if let Some(v) = args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    top_k = Some(v);
                    i += 1;
                } else {
                    eprintln!("Error: --top-k requires a number");
                    process::exit(2);
                }
            }
            "--min-score" => {
                if let Some(v) = args.get(i + 1).and_then(|v| v.parse::<f32>().ok()) {
                    min_score = Some(v);
                    i += 1;
                } else {
                    eprintln!("Error: --min-score requires a number");
                    process::exit(2);
                }
            }
            other => {
                eprintln!("Error: unrecognized argument '{other}'\n\n{USAGE}");
                process::exit(2);
            }
        }
        i += 1;
    }

    let index_dir = data_dir(config, "data.index_dir", "./index");
    let retrieval = retrieval_config(config);

    let snapshot = Snapshot::load(&index_dir)?;
    let lexical = if retrieval.hybrid_enabled {
        match TantivyChunkIndex::open(&index_dir.join(LEXICAL_DIR)) {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!("lexical index unavailable, vector signal only: {e}");
                None
            }
        }
    } else {
        None
    };
    let expander = if retrieval.expansion.enabled {
        let generation: GenerationProviderConfig = config.get("providers.generation")?;
        Some(QueryExpander::new(Arc::new(HttpGenerator::new(&generation)?)))
    } else {
        None
    };
    let embedder = default_embedder(config)?;

    let retriever = Retriever::new(
        snapshot.vectors,
        lexical,
        snapshot.chunks,
        embedder,
        expander,
        retrieval,
    )?;
    let passages = retriever.search(&query_text, top_k, min_score).await?;

    if passages.is_empty() {
        println!("No results for: \"{query_text}\"");
        return Ok(());
    }
    println!("🔍 Found {} passages for: \"{query_text}\"", passages.len());
    for (rank, passage) in passages.iter().enumerate() {
        println!(
            "\n  {}. score={:.4}  path={}",
            rank + 1,
            passage.score,
            passage.source_path
        );
        println!("     {}", passage.text);
    }
    Ok(())
}

/// Runtime retrieval settings: the `retrieval` section plus the
/// top-level `expansion` and `rerank` groups.
fn retrieval_config(config: &Config) -> RetrievalConfig {
    let mut retrieval: RetrievalConfig = config.get_or("retrieval");
    retrieval.expansion = config.get_or::<ExpansionConfig>("expansion");
    retrieval.rerank = config.get_or::<RerankConfig>("rerank");
    retrieval
}

fn data_dir(config: &Config, key: &str, default: &str) -> PathBuf {
    let raw: String = config.get(key).unwrap_or_else(|_| default.to_string());
    expand_path(raw)
}
