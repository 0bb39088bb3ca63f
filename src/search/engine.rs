use std::sync::Arc;
use std::time::Duration;

use crate::config::RetrievalConfig;
use crate::corpus::VerseStore;
use crate::llm::advisor::Advisor;
use crate::llm::embeddings::Embedder;
use crate::llm::rerank::Reranker;
use crate::models::{ScoredVerse, CHAPTER_MAX, MAX_LIMIT, MAX_QUERY_CHARS};
use crate::search::hybrid::{rrf_fuse, FusionParams};
use crate::search::lexical::LexicalIndex;
use crate::search::vector::VectorIndex;

/// Failure taxonomy for one query.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Malformed request; rejected before any retrieval work.
    #[error("{0}")]
    InvalidRequest(String),
    /// The semantic branch or the reranker is down. Fatal for the query,
    /// never masked as an empty result.
    #[error("search dependency unavailable")]
    DependencyUnavailable(#[source] anyhow::Error),
    #[error("internal search error")]
    Internal(#[from] anyhow::Error),
}

/// Immutable snapshot of everything one query needs. Built at startup (or
/// on reload) and swapped atomically; never mutated mid-query.
pub struct SearchEngine {
    pub store: Arc<VerseStore>,
    /// Missing index degrades the lexical branch to "no candidates"
    pub lexical: Option<Arc<LexicalIndex>>,
    pub vectors: Arc<VectorIndex>,
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Arc<dyn Reranker>,
    pub advisor: Option<Arc<dyn Advisor>>,
    pub retrieval: RetrievalConfig,
    pub advisor_timeout: Duration,
}

impl SearchEngine {
    /// Run the full pipeline: validate, hybrid search, fuse, fetch texts,
    /// rerank, truncate to `limit`. With `limit == 1` the top result may
    /// additionally carry best-effort advisory text.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        chapter: Option<u32>,
    ) -> Result<Vec<ScoredVerse>, SearchError> {
        let query = query.trim().to_string();
        validate(&query, limit, chapter)?;

        let pool = self.retrieval.candidate_pool;
        let lexical_fetch = pool * self.retrieval.lexical_fetch_multiplier;

        // The two branches have no ordering dependency; run them
        // concurrently, each on the blocking pool so scoring never stalls
        // unrelated queries.
        let lexical_task = {
            let index = self.lexical.clone();
            let q = query.clone();
            tokio::task::spawn_blocking(move || match index {
                Some(index) => index.search(&q, lexical_fetch),
                None => Vec::new(),
            })
        };

        let semantic_task = async {
            let query_embedding = self
                .embedder
                .embed(&query)
                .await
                .map_err(SearchError::DependencyUnavailable)?;
            let vectors = self.vectors.clone();
            tokio::task::spawn_blocking(move || vectors.search(&query_embedding, pool, chapter))
                .await
                .map_err(|e| SearchError::Internal(e.into()))
        };

        let (lexical_hits, vector_hits) = tokio::join!(lexical_task, semantic_task);
        let lexical_hits = lexical_hits.unwrap_or_else(|e| {
            // Degraded input, not fatal: hybrid search is still valid with
            // semantic-only candidates.
            tracing::warn!("Lexical branch failed, continuing semantic-only: {e}");
            Vec::new()
        });
        let vector_hits = vector_hits?;

        let store = self.store.clone();
        let candidates = rrf_fuse(
            &vector_hits,
            &lexical_hits,
            chapter,
            |id| store.get(id).map(|d| d.meta.chapter),
            FusionParams {
                rrf_k: self.retrieval.rrf_k,
                candidate_pool: pool,
            },
        );

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Candidate ids with no stored document are silently dropped.
        let candidate_ids: Vec<String> =
            candidates.into_iter().map(|c| c.verse_id).collect();
        let docs = self.store.get_many(&candidate_ids);
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = docs.iter().map(|d| d.text.clone()).collect();
        let scores = self
            .reranker
            .score(&query, &texts)
            .await
            .map_err(SearchError::DependencyUnavailable)?;

        let mut results: Vec<ScoredVerse> = docs
            .iter()
            .zip(scores)
            .map(|(doc, score)| ScoredVerse {
                text: doc.text.clone(),
                metadata: doc.meta.clone(),
                score,
                advice: None,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.metadata.verse_id.cmp(&b.metadata.verse_id))
        });
        results.truncate(limit);

        if limit == 1 {
            self.maybe_attach_advice(&query, &mut results).await;
        }

        Ok(results)
    }

    /// Best-effort advisory augmentation for single-result queries. Never
    /// blocks beyond its timeout and never fails the query.
    async fn maybe_attach_advice(&self, query: &str, results: &mut [ScoredVerse]) {
        let Some(advisor) = &self.advisor else {
            return;
        };
        let Some(top) = results.first_mut() else {
            return;
        };

        match tokio::time::timeout(self.advisor_timeout, advisor.advise(query, &top.text)).await
        {
            Ok(Ok(advice)) if !advice.is_empty() => top.advice = Some(advice),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("Advisory generation failed: {e}"),
            Err(_) => tracing::warn!(
                "Advisory generation timed out after {:?}",
                self.advisor_timeout
            ),
        }
    }
}

fn validate(query: &str, limit: usize, chapter: Option<u32>) -> Result<(), SearchError> {
    if query.is_empty() {
        return Err(SearchError::InvalidRequest("Query is required".to_string()));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(SearchError::InvalidRequest(format!(
            "Query must be at most {MAX_QUERY_CHARS} characters"
        )));
    }
    if limit == 0 || limit > MAX_LIMIT {
        return Err(SearchError::InvalidRequest(format!(
            "Limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    if let Some(c) = chapter {
        if c == 0 || c > CHAPTER_MAX {
            return Err(SearchError::InvalidRequest(format!(
                "Chapter must be between 1 and {CHAPTER_MAX}"
            )));
        }
    }
    Ok(())
}
