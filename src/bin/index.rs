//! One-time index build: load the corpus, build the BM25 index, embed every
//! composed verse body, and persist both indexes plus a build manifest.
//! Runs fully out-of-band; the server swaps the result in via /api/reload.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use verse_search::config::Config;
use verse_search::corpus::VerseStore;
use verse_search::llm::embeddings::HttpEmbedder;
use verse_search::models::IndexManifest;
use verse_search::search::lexical::LexicalIndex;
use verse_search::search::vector::{VectorEntry, VectorIndex};

const EMBED_BATCH: usize = 50;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());

    let store = VerseStore::load(&config.corpus_path(), &config.emotions_path())?;
    anyhow::ensure!(!store.is_empty(), "Corpus is empty, nothing to index");
    tracing::info!("Loaded {} verses", store.len());

    // ── Lexical index ────────────────────────────────────
    let lexical = LexicalIndex::build(
        store
            .docs()
            .iter()
            .map(|d| (d.meta.verse_id.as_str(), d.text.as_str())),
    );
    lexical.save(&config.lexical_index_path())?;
    tracing::info!(
        "Lexical index written to {}",
        config.lexical_index_path().display()
    );

    // ── Vector index ─────────────────────────────────────
    let client = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(std::time::Duration::from_secs(300))
        .build()?;
    let embedder = HttpEmbedder::new(client, config.llm.clone());

    let texts: Vec<String> = store.docs().iter().map(|d| d.text.clone()).collect();
    let total_batches = texts.len().div_ceil(EMBED_BATCH);

    let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    for (i, chunk) in texts.chunks(EMBED_BATCH).enumerate() {
        let batch = embedder
            .embed_batch(chunk)
            .await
            .with_context(|| format!("Embedding batch {}/{total_batches} failed", i + 1))?;
        anyhow::ensure!(
            batch.len() == chunk.len(),
            "Embedding batch {}/{total_batches} returned {} vectors for {} texts",
            i + 1,
            batch.len(),
            chunk.len()
        );
        embeddings.extend(batch);
        tracing::info!("Embedded batch {}/{total_batches}", i + 1);
    }

    if let Some(first) = embeddings.first() {
        if first.len() != config.llm.embedding_dim {
            tracing::warn!(
                "Embedding dimension is {} but config says {}; update LLM_EMBEDDING_DIM",
                first.len(),
                config.llm.embedding_dim
            );
        }
    }

    let entries: Vec<VectorEntry> = store
        .docs()
        .iter()
        .zip(embeddings)
        .map(|(doc, embedding)| VectorEntry {
            verse_id: doc.meta.verse_id.clone(),
            chapter: doc.meta.chapter,
            embedding,
        })
        .collect();

    let dim = entries.first().map(|e| e.embedding.len()).unwrap_or(0);
    let count = entries.len();
    VectorIndex::from_entries(entries).save(&config.vector_index_path())?;
    tracing::info!(
        "Vector index written to {}",
        config.vector_index_path().display()
    );

    // ── Manifest ─────────────────────────────────────────
    let manifest = IndexManifest {
        embedding_model: config.llm.embedding_model.clone(),
        embedding_dim: dim,
        document_count: count,
    };
    manifest.save(&config.manifest_path())?;
    tracing::info!("Indexed {count} verses with {}", config.llm.embedding_model);

    Ok(())
}
