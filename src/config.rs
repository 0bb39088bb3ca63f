use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the corpus and built indexes are stored
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration (embeddings + chat)
    pub llm: LlmConfig,
    /// Cross-encoder reranker configuration
    pub reranker: RerankerConfig,
    /// Advisory-text generation for single-result queries
    pub advisor: AdvisorConfig,
    /// Retrieval pipeline knobs
    pub retrieval: RetrievalConfig,
    /// Maximum concurrent search requests
    pub max_concurrent_searches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for chat (advisory generation, emotion tagging)
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
}

/// Configuration for the cross-encoder reranker sidecar
/// (e.g. llama-server with a MiniLM cross-encoder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Base URL for the reranker API (e.g. "http://127.0.0.1:8082")
    pub base_url: String,
    /// Model name to send in the rerank request
    pub model: Option<String>,
    /// Request timeout in seconds (capped at 30)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Generate advisory text when exactly one result is requested
    pub enabled: bool,
    /// Advisory call timeout in seconds; on expiry the result is returned without advice
    pub timeout_secs: u64,
}

/// Knobs for the hybrid retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// RRF constant
    pub rrf_k: f32,
    /// Size of the fused candidate pool fed to the reranker
    pub candidate_pool: usize,
    /// Lexical over-fetch multiplier: the BM25 branch scores up to
    /// `candidate_pool * lexical_fetch_multiplier` documents before the
    /// chapter filter is applied
    pub lexical_fetch_multiplier: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:8000".to_string(),
            llm: LlmConfig::default(),
            reranker: RerankerConfig::default(),
            advisor: AdvisorConfig::default(),
            retrieval: RetrievalConfig::default(),
            max_concurrent_searches: 8,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            embedding_dim: 768,
        }
    }
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8082".to_string(),
            model: None,
            timeout_secs: 10,
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: 10,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            candidate_pool: 20,
            lexical_fetch_multiplier: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("VERSE_SEARCH_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("VERSE_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("LLM_EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.llm.embedding_dim = d;
            }
        }
        if let Ok(url) = std::env::var("RERANKER_BASE_URL") {
            config.reranker.base_url = url;
        }
        if let Ok(model) = std::env::var("RERANKER_MODEL") {
            config.reranker.model = Some(model);
        }
        if let Ok(val) = std::env::var("RERANKER_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.reranker.timeout_secs = v.min(30); // Cap at 30s
            }
        }
        if let Ok(val) = std::env::var("ADVISOR_ENABLED") {
            config.advisor.enabled = matches!(val.as_str(), "1" | "true" | "yes");
        }
        if let Ok(val) = std::env::var("ADVISOR_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.advisor.timeout_secs = v.min(30);
            }
        }
        if let Ok(val) = std::env::var("VERSE_SEARCH_RRF_K") {
            if let Ok(v) = val.parse() {
                config.retrieval.rrf_k = v;
            }
        }
        if let Ok(val) = std::env::var("VERSE_SEARCH_CANDIDATE_POOL") {
            if let Ok(v) = val.parse() {
                config.retrieval.candidate_pool = v;
            }
        }
        if let Ok(val) = std::env::var("VERSE_SEARCH_LEXICAL_FETCH_MULTIPLIER") {
            if let Ok(v) = val.parse() {
                config.retrieval.lexical_fetch_multiplier = v;
            }
        }
        if let Ok(val) = std::env::var("VERSE_SEARCH_MAX_CONCURRENT_SEARCHES") {
            if let Ok(v) = val.parse() {
                config.max_concurrent_searches = v;
            }
        }

        config
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.data_dir.join("gita_full.json")
    }

    pub fn emotions_path(&self) -> PathBuf {
        self.data_dir.join("emotions.json")
    }

    pub fn lexical_index_path(&self) -> PathBuf {
        self.data_dir.join("lexical.json")
    }

    pub fn vector_index_path(&self) -> PathBuf {
        self.data_dir.join("vectors.json")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir.join("manifest.json")
    }
}
