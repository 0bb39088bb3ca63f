//! Integration tests for the verse-search pipeline.
//!
//! These tests exercise the full retrieval flow with deterministic stub
//! models, so no LLM or reranker sidecar is required.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use verse_search::config::RetrievalConfig;
use verse_search::corpus::VerseStore;
use verse_search::llm::advisor::Advisor;
use verse_search::llm::embeddings::Embedder;
use verse_search::llm::rerank::{sigmoid, Reranker};
use verse_search::models::VerseMeta;
use verse_search::search::engine::{SearchEngine, SearchError};
use verse_search::search::lexical::{tokenize, LexicalIndex};
use verse_search::search::vector::{VectorEntry, VectorIndex};

const EMBED_DIM: usize = 16;

/// Helper: a small corpus spanning several chapters, with translations
/// echoing the real verses.
fn sample_corpus() -> Vec<VerseMeta> {
    let raw: &[(u32, u32, &str, &str)] = &[
        (2, 31, "Considering your specific duty as a warrior, you should know that there is no better engagement than fighting, and so there is no need for hesitation.", "For a warrior, fighting for a righteous cause is duty itself."),
        (2, 47, "You have a right to perform your prescribed duty, but you are not entitled to the fruits of action.", "Act from duty, without attachment to results."),
        (2, 63, "From anger, complete delusion arises, and from delusion bewilderment of memory.", "Anger clouds judgment and leads one to ruin."),
        (4, 7, "Whenever and wherever there is a decline in religion and a predominant rise of irreligion, at that time I descend Myself.", "The Lord appears age after age to restore religion."),
        (5, 2, "The renunciation of work and work in devotion are both good for liberation, but of the two, work in devotional service is better.", "Acting in devotion surpasses mere renunciation."),
        (5, 29, "A person in full consciousness of Me, knowing Me to be the ultimate beneficiary, attains peace from the pangs of material miseries.", "Peace follows from knowing the true friend of all beings."),
        (6, 12, "One should hold one's body, neck and head erect and practice yoga to purify the heart.", "Steady posture and a fixed mind are the gateway to practice."),
        (18, 66, "Abandon all varieties of religion and just surrender unto Me. I shall deliver you from all sinful reactions.", "The final instruction: surrender, and do not fear."),
    ];
    raw.iter()
        .map(|&(chapter, verse, translation, purport)| VerseMeta {
            verse_id: format!("{chapter}.{verse}"),
            chapter,
            verse,
            sanskrit: String::new(),
            transliteration: String::new(),
            synonyms: String::new(),
            translation: translation.to_string(),
            purport: purport.to_string(),
            emotions: None,
        })
        .collect()
}

/// Deterministic bag-of-words embedder: each token hashes to one of
/// `EMBED_DIM` buckets, so texts sharing vocabulary land near each other.
struct HashEmbedder;

fn token_bucket(token: &str) -> usize {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in token.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x1_0000_01b3);
    }
    (h % EMBED_DIM as u64) as usize
}

fn hash_embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBED_DIM];
    for token in tokenize(text) {
        v[token_bucket(&token)] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embed(text))
    }
}

struct OfflineEmbedder;

#[async_trait]
impl Embedder for OfflineEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(anyhow!("embedding model offline"))
    }
}

/// Reranker scoring by length-weighted token overlap with the query.
struct OverlapReranker;

#[async_trait]
impl Reranker for OverlapReranker {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        let q = tokenize(query);
        Ok(documents
            .iter()
            .map(|d| {
                let lower = d.to_lowercase();
                let overlap: usize = q
                    .iter()
                    .filter(|t| lower.contains(t.as_str()))
                    .map(|t| t.len())
                    .sum();
                sigmoid(overlap as f32 / 4.0 - 1.0)
            })
            .collect())
    }
}

struct StubAdvisor;

#[async_trait]
impl Advisor for StubAdvisor {
    async fn advise(&self, _query: &str, passage: &str) -> Result<String> {
        Ok(format!("Reflect on this: {}", &passage[..passage.len().min(40)]))
    }
}

fn build_engine(advisor: Option<Arc<dyn Advisor>>) -> SearchEngine {
    let store = Arc::new(VerseStore::from_verses(sample_corpus(), &HashMap::new()));

    let lexical = LexicalIndex::build(
        store
            .docs()
            .iter()
            .map(|d| (d.meta.verse_id.as_str(), d.text.as_str())),
    );

    let entries: Vec<VectorEntry> = store
        .docs()
        .iter()
        .map(|d| VectorEntry {
            verse_id: d.meta.verse_id.clone(),
            chapter: d.meta.chapter,
            embedding: hash_embed(&d.text),
        })
        .collect();

    SearchEngine {
        store,
        lexical: Some(Arc::new(lexical)),
        vectors: Arc::new(VectorIndex::from_entries(entries)),
        embedder: Arc::new(HashEmbedder),
        reranker: Arc::new(OverlapReranker),
        advisor,
        retrieval: RetrievalConfig::default(),
        advisor_timeout: Duration::from_secs(1),
    }
}

#[tokio::test]
async fn test_golden_query_finds_warrior_verse() {
    let engine = build_engine(None);
    let results = engine
        .search("What is the duty of a warrior?", 5, None)
        .await
        .unwrap();

    assert!(!results.is_empty());
    let top = &results[0];
    assert_eq!(top.metadata.verse_id, "2.31");
    assert_eq!(top.metadata.chapter, 2);
    assert_eq!(top.metadata.verse, 31);
    assert!(!top.text.is_empty());
}

#[tokio::test]
async fn test_golden_query_finds_religion_decline_verse() {
    let engine = build_engine(None);
    let results = engine
        .search("whenever there is a decline in religion", 5, None)
        .await
        .unwrap();
    assert_eq!(results[0].metadata.verse_id, "4.7");
}

#[tokio::test]
async fn test_results_ordered_by_descending_score() {
    let engine = build_engine(None);
    let results = engine
        .search("peace attained by abandoning desires", 5, None)
        .await
        .unwrap();
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_chapter_filter_excludes_every_other_chapter() {
    let engine = build_engine(None);
    // "religion" would rank 4.7 and 18.66 highly without the filter
    let results = engine.search("religion", 5, Some(5)).await.unwrap();
    assert!(results.iter().all(|r| r.metadata.chapter == 5));
}

#[tokio::test]
async fn test_filtered_chapter_with_no_docs_returns_empty() {
    let engine = build_engine(None);
    let results = engine.search("duty", 5, Some(3)).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_semantic_dependency_down_fails_loudly() {
    let mut engine = build_engine(None);
    engine.embedder = Arc::new(OfflineEmbedder);
    let err = engine.search("duty", 5, None).await.unwrap_err();
    assert!(matches!(err, SearchError::DependencyUnavailable(_)));
}

#[tokio::test]
async fn test_lexical_index_missing_still_serves() {
    let mut engine = build_engine(None);
    engine.lexical = None;
    let results = engine
        .search("What is the duty of a warrior?", 5, None)
        .await
        .unwrap();
    assert!(!results.is_empty());
}

#[tokio::test]
async fn test_limit_bounds_result_count() {
    let engine = build_engine(None);
    let results = engine.search("duty religion peace", 3, None).await.unwrap();
    assert!(results.len() <= 3);
}

#[tokio::test]
async fn test_identical_queries_return_identical_rankings() {
    let engine = build_engine(None);
    let a = engine.search("anger leads to delusion", 5, None).await.unwrap();
    let b = engine.search("anger leads to delusion", 5, None).await.unwrap();
    let ids = |rs: &[verse_search::models::ScoredVerse]| {
        rs.iter()
            .map(|r| r.metadata.verse_id.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&a), ids(&b));
}

#[tokio::test]
async fn test_advice_present_only_for_single_result_requests() {
    let engine = build_engine(Some(Arc::new(StubAdvisor)));

    let one = engine
        .search("I feel lost and confused about my duty", 1, None)
        .await
        .unwrap();
    assert_eq!(one.len(), 1);
    assert!(one[0].advice.is_some());

    let five = engine
        .search("I feel lost and confused about my duty", 5, None)
        .await
        .unwrap();
    assert!(five.len() > 1);
    assert!(five.iter().all(|r| r.advice.is_none()));
}

#[tokio::test]
async fn test_validation_rejected_before_retrieval() {
    // Even with every model offline, validation errors win
    let mut engine = build_engine(None);
    engine.embedder = Arc::new(OfflineEmbedder);

    let err = engine.search("", 5, None).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidRequest(_)));

    let err = engine.search("duty", 25, None).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidRequest(_)));

    let err = engine.search("duty", 5, Some(99)).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidRequest(_)));
}
