use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Chapters in the Gita.
pub const CHAPTER_MAX: u32 = 18;
/// Longest accepted query, in characters.
pub const MAX_QUERY_CHARS: usize = 500;
/// Largest number of results a single request may ask for.
pub const MAX_LIMIT: usize = 20;

/// Metadata stored for every verse, returned verbatim in search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerseMeta {
    /// Unique id in "<chapter>.<verse>" form, e.g. "2.31". Generated from
    /// chapter and verse when the corpus record omits it.
    #[serde(default)]
    pub verse_id: String,
    pub chapter: u32,
    pub verse: u32,
    #[serde(default)]
    pub sanskrit: String,
    #[serde(default)]
    pub transliteration: String,
    #[serde(default)]
    pub synonyms: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub purport: String,
    /// Derived emotion/problem keywords, comma-separated (from the tagger)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotions: Option<String>,
}

/// Search request
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Restrict results to a single chapter
    pub chapter: Option<u32>,
}

fn default_limit() -> usize {
    5
}

/// A verse in the final ranked output.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredVerse {
    /// Composed text body (translation + purport + emotion keywords)
    pub text: String,
    pub metadata: VerseMeta,
    /// Cross-encoder relevance score. Only meaningful relative to other
    /// scores from the same query run.
    pub score: f32,
    /// Advisory text, present only on single-result requests when the
    /// advisor call succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

/// Search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ScoredVerse>,
}

/// Build manifest written next to the persisted indexes. Records which
/// embedding model produced the stored vectors: the same model must be
/// used at query time, and that cannot be detected from the vectors
/// themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub document_count: usize,
}

impl IndexManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&data).context("Failed to parse index manifest")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_limit_defaults_to_five() {
        let req: SearchRequest = serde_json::from_str(r#"{"query": "duty"}"#).unwrap();
        assert_eq!(req.limit, 5);
        assert!(req.chapter.is_none());
    }

    #[test]
    fn test_request_accepts_chapter_filter() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "duty", "limit": 3, "chapter": 2}"#).unwrap();
        assert_eq!(req.limit, 3);
        assert_eq!(req.chapter, Some(2));
    }

    #[test]
    fn test_scored_verse_omits_absent_advice() {
        let verse = ScoredVerse {
            text: "text".to_string(),
            metadata: VerseMeta {
                verse_id: "2.31".to_string(),
                chapter: 2,
                verse: 31,
                sanskrit: String::new(),
                transliteration: String::new(),
                synonyms: String::new(),
                translation: String::new(),
                purport: String::new(),
                emotions: None,
            },
            score: 0.9,
            advice: None,
        };
        let json = serde_json::to_value(&verse).unwrap();
        assert!(json.get("advice").is_none());
    }

    #[test]
    fn test_verse_meta_round_trips() {
        let json = r#"{
            "verse_id": "2.31",
            "chapter": 2,
            "verse": 31,
            "translation": "Considering your specific duty as a ksatriya...",
            "purport": "...",
            "emotions": "duty, hesitation"
        }"#;
        let meta: VerseMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.verse_id, "2.31");
        assert_eq!(meta.chapter, 2);
        assert!(meta.sanskrit.is_empty());
        assert_eq!(meta.emotions.as_deref(), Some("duty, hesitation"));
    }
}
