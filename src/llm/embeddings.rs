use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Maximum characters to send per text to the embedding API.
/// nomic-embed-text has an 8 192-token context; prose tokenises at roughly
/// 1 token per 3-4 chars, but Sanskrit transliteration runs denser.
/// 3 000 chars stays safely under the context either way.
const MAX_EMBED_CHARS: usize = 3_000;

/// Text to fixed-length vector. The same model must have produced every
/// stored document vector; implementations are otherwise opaque.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embedder backed by an Ollama or OpenAI-compatible HTTP API.
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    /// Generate embeddings for a batch of texts (index build path).
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let truncated: Vec<String> = texts
            .iter()
            .map(|t| truncate_for_embedding(t).to_string())
            .collect();

        match self.config.provider.as_str() {
            "ollama" => self.embed_ollama(&truncated).await,
            "openai" => self.embed_openai(&truncated).await,
            other => anyhow::bail!("Unknown LLM provider: {other}"),
        }
    }

    async fn embed_ollama(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.config.base_url);

        // Ollama supports batch embedding with the /api/embed endpoint
        let batch_size = 32;
        let mut all_embeddings = Vec::new();

        for chunk in texts.chunks(batch_size) {
            let req = OllamaEmbedRequest {
                model: self.config.embedding_model.clone(),
                input: chunk.to_vec(),
                truncate: true,
            };

            let resp = self
                .client
                .post(&url)
                .json(&req)
                .send()
                .await
                .context("Failed to call Ollama embed API")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("Ollama embed API returned {status}: {body}");
            }

            let body: OllamaEmbedResponse = resp
                .json()
                .await
                .context("Failed to parse Ollama embed response")?;

            all_embeddings.extend(body.embeddings);
        }

        Ok(all_embeddings)
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.config.base_url);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let batch_size = 64;
        let mut all_embeddings = Vec::new();

        for chunk in texts.chunks(batch_size) {
            let req = OpenAiEmbedRequest {
                model: self.config.embedding_model.clone(),
                input: chunk.to_vec(),
            };

            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .json(&req)
                .send()
                .await
                .context("Failed to call OpenAI embed API")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("OpenAI embed API returned {status}: {body}");
            }

            let body: OpenAiEmbedResponse = resp
                .json()
                .await
                .context("Failed to parse OpenAI embed response")?;

            let mut embeddings: Vec<Vec<f32>> =
                body.data.into_iter().map(|d| d.embedding).collect();
            all_embeddings.append(&mut embeddings);
        }

        Ok(all_embeddings)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results.into_iter().next().context("No embedding returned")
    }
}

/// Truncate `text` to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    // Find the last char boundary at or before the limit
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
    /// Ask Ollama to silently truncate inputs that exceed the model's context
    /// length instead of returning a 400 error.
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_for_embedding("short"), "short");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // Multi-byte chars straddling the cut point must not split
        let text = "ॐ".repeat(MAX_EMBED_CHARS);
        let out = truncate_for_embedding(&text);
        assert!(out.len() <= MAX_EMBED_CHARS);
        assert!(out.chars().all(|c| c == 'ॐ'));
    }
}
