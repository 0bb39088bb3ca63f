//! Cross-encoder reranker via OpenAI-compatible `/v1/rerank` endpoint.
//!
//! Sends a single batch request with all query-document pairs. Scores carry
//! no meaning beyond relative ordering within one query run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RerankerConfig;

/// Pairwise relevance: score every `(query, document)` pair. The returned
/// vector is parallel with `documents`; pairs the model did not score come
/// back as 0.0.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;
}

/// Reranker backed by a cross-encoder sidecar (e.g. llama-server with a
/// MiniLM cross-encoder).
pub struct CrossEncoderClient {
    client: reqwest::Client,
    config: RerankerConfig,
}

impl CrossEncoderClient {
    pub fn new(client: reqwest::Client, config: RerankerConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Reranker for CrossEncoderClient {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.config.model.as_deref().unwrap_or("default");
        let url = format!(
            "{}/v1/rerank",
            self.config.base_url.trim_end_matches('/')
        );

        let req_body = RerankRequest {
            model: model.to_string(),
            query: query.to_string(),
            documents: documents.to_vec(),
            top_n: documents.len(),
        };

        let timeout = std::time::Duration::from_secs(self.config.timeout_secs.min(30));

        let resp = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&req_body)
            .send()
            .await
            .context("Failed to reach reranker endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Reranker returned {status}: {body}");
        }

        let body: RerankResponse = resp
            .json()
            .await
            .context("Failed to parse reranker response")?;

        let mut scores = vec![0.0f32; documents.len()];
        for r in body.results {
            if r.index < scores.len() {
                scores[r.index] = sigmoid(r.relevance_score);
            }
        }

        Ok(scores)
    }
}

/// Sigmoid normalization: maps raw logits to 0-1 range.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// ─── Request/Response types ────────────────────────────

#[derive(Serialize)]
struct RerankRequest {
    model: String,
    query: String,
    documents: Vec<String>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultRaw>,
}

#[derive(Deserialize)]
struct RerankResultRaw {
    index: usize,
    relevance_score: f32,
}
