//! # verse-search
//!
//! A Rust web service answering natural-language questions against the
//! Bhagavad Gita with a hybrid pipeline combining BM25 full-text search,
//! vector semantic search, and cross-encoder re-ranking.
//!
//! ## Architecture
//!
//! The search pipeline is a straight line with one fork:
//!
//! ```text
//!                        ┌──────────────┐
//!                        │  User Query  │
//!                        └──────┬───────┘
//!                               │
//!                  ┌────────────┴────────────┐
//!                  ▼                         ▼
//!         ┌────────────────┐       ┌─────────────────┐
//!         │  BM25 Search   │       │  Vector Search  │
//!         │  (3× over-fetch│       │  (chapter filter│
//!         │   + filter)    │       │  applied native)│
//!         └───────┬────────┘       └────────┬────────┘
//!                 │ ranked list             │ ranked list
//!                 └────────────┬────────────┘
//!                              ▼
//!                 ┌───────────────────────┐
//!                 │  RRF Fusion (k = 60)  │
//!                 │  Keep top 20          │
//!                 └───────────┬───────────┘
//!                             │ candidate ids
//!                             ▼
//!                 ┌───────────────────────┐
//!                 │  Fetch verse texts    │
//!                 └───────────┬───────────┘
//!                             ▼
//!                 ┌───────────────────────┐
//!                 │ Cross-Encoder Rerank  │
//!                 │ (query, text) pairs   │
//!                 └───────────┬───────────┘
//!                             ▼
//!                 ┌───────────────────────┐
//!                 │  Top-N results        │
//!                 │  (+ advice at N = 1)  │
//!                 └───────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, data dir, LLM and retrieval settings
//! - [`models`] - Shared data types: `VerseMeta`, request/response types
//! - [`corpus`] - Verse store: corpus loading and composed text bodies
//! - [`search::lexical`] - Hand-built BM25 inverted index
//! - [`search::vector`] - In-memory vector index with cosine similarity and native chapter filtering
//! - [`search::hybrid`] - Reciprocal Rank Fusion of the two ranked lists
//! - [`search::engine`] - Retrieval orchestrator and error taxonomy
//! - [`llm::embeddings`] - Query/document embedding via Ollama or OpenAI-compatible APIs
//! - [`llm::rerank`] - Cross-encoder re-ranking via `/v1/rerank`
//! - [`llm::advisor`] - Best-effort advisory text for single-result queries
//! - [`api`] - Axum HTTP handlers for search and engine reload
//! - [`state`] - Shared application state holding the swappable engine snapshot

pub mod api;
pub mod config;
pub mod corpus;
pub mod llm;
pub mod models;
pub mod search;
pub mod state;
