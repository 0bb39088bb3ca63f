use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::corpus::VerseStore;
use crate::llm::advisor::{Advisor, ChatAdvisor};
use crate::llm::embeddings::HttpEmbedder;
use crate::llm::rerank::CrossEncoderClient;
use crate::models::IndexManifest;
use crate::search::engine::SearchEngine;
use crate::search::lexical::LexicalIndex;
use crate::search::vector::VectorIndex;

/// Shared application state. The engine is an immutable snapshot behind a
/// lock: queries clone the `Arc` once and keep it for their whole run, and
/// a reload swaps in a fresh snapshot without them ever observing a mixed
/// state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    engine: Arc<RwLock<Arc<SearchEngine>>>,
    pub http_client: reqwest::Client,
    pub search_semaphore: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;

        let engine = build_engine(&config, &http_client)?;
        let max_searches = config.max_concurrent_searches;

        Ok(Self {
            config,
            engine: Arc::new(RwLock::new(Arc::new(engine))),
            http_client,
            search_semaphore: Arc::new(tokio::sync::Semaphore::new(max_searches)),
        })
    }

    /// Current engine snapshot. Holders keep it valid across a reload.
    pub fn engine(&self) -> Arc<SearchEngine> {
        self.engine.read().clone()
    }

    /// Rebuild the engine from the on-disk indexes and swap it in
    /// atomically. In-flight queries finish on the old snapshot.
    pub fn reload(&self) -> Result<()> {
        let engine = build_engine(&self.config, &self.http_client)?;
        *self.engine.write() = Arc::new(engine);
        Ok(())
    }
}

fn build_engine(config: &Config, http_client: &reqwest::Client) -> Result<SearchEngine> {
    let store = VerseStore::load(&config.corpus_path(), &config.emotions_path())
        .context("Failed to load corpus")?;
    tracing::info!("Loaded {} verses", store.len());

    // A missing lexical index degrades the lexical branch; it never blocks startup.
    let lexical = match LexicalIndex::load(&config.lexical_index_path()) {
        Ok(index) => {
            tracing::info!("Loaded lexical index ({} documents)", index.doc_count());
            Some(Arc::new(index))
        }
        Err(e) => {
            tracing::warn!("Lexical index unavailable, serving semantic-only: {e:#}");
            None
        }
    };

    // The semantic index is the primary signal: without it every query
    // would fail, so refuse to start.
    let vectors = VectorIndex::load(&config.vector_index_path())
        .context("Failed to load vector index (run the index binary first)")?;
    tracing::info!("Loaded {} vectors", vectors.entry_count());

    if let Ok(manifest) = IndexManifest::load(&config.manifest_path()) {
        if manifest.embedding_model != config.llm.embedding_model {
            tracing::warn!(
                "Vector index was built with embedding model '{}' but queries will use '{}'; \
                 similarity ordering is unreliable until the index is rebuilt",
                manifest.embedding_model,
                config.llm.embedding_model
            );
        }
    }

    let advisor: Option<Arc<dyn Advisor>> = if config.advisor.enabled {
        Some(Arc::new(ChatAdvisor::new(
            http_client.clone(),
            config.llm.clone(),
        )))
    } else {
        None
    };

    Ok(SearchEngine {
        store: Arc::new(store),
        lexical,
        vectors: Arc::new(vectors),
        embedder: Arc::new(HttpEmbedder::new(http_client.clone(), config.llm.clone())),
        reranker: Arc::new(CrossEncoderClient::new(
            http_client.clone(),
            config.reranker.clone(),
        )),
        advisor,
        retrieval: config.retrieval.clone(),
        advisor_timeout: Duration::from_secs(config.advisor.timeout_secs),
    })
}
