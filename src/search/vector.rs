use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A stored vector entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub verse_id: String,
    pub chapter: u32,
    pub embedding: Vec<f32>,
}

/// In-memory vector index with cosine similarity search and an exact-match
/// chapter predicate applied natively during the scan.
///
/// Stored embeddings and query embeddings must come from the same model;
/// a mismatch silently corrupts similarity ordering. The build manifest
/// records the model name and dimension so operators can verify.
pub struct VectorIndex {
    entries: Vec<VectorEntry>,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub verse_id: String,
    pub score: f32,
}

impl VectorIndex {
    pub fn from_entries(entries: Vec<VectorEntry>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let entries: Vec<VectorEntry> =
            serde_json::from_str(&data).context("Failed to parse vector index")?;
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string(&self.entries).context("Failed to serialize vectors")?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Search by cosine similarity against a query embedding. When `chapter`
    /// is set, only entries in that chapter are scored, so all `k` returned
    /// hits already satisfy the filter.
    pub fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        chapter: Option<u32>,
    ) -> Vec<VectorHit> {
        let mut scored: Vec<(f32, &VectorEntry)> = self
            .entries
            .iter()
            .filter(|e| chapter.is_none_or(|c| e.chapter == c))
            .map(|e| (cosine_similarity(query_embedding, &e.embedding), e))
            .collect();

        // Sort descending by score
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, e)| VectorHit {
                verse_id: e.verse_id.clone(),
                score,
            })
            .collect()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(verse_id: &str, chapter: u32, embedding: Vec<f32>) -> VectorEntry {
        VectorEntry {
            verse_id: verse_id.to_string(),
            chapter,
            embedding,
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::from_entries(vec![
            entry("2.31", 2, vec![0.9, 0.1, 0.1]),
            entry("2.47", 2, vec![0.7, 0.3, 0.2]),
            entry("4.7", 4, vec![0.1, 0.9, 0.1]),
            entry("5.2", 5, vec![0.1, 0.1, 0.9]),
        ])
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = sample_index();
        let hits = index.search(&[1.0, 0.0, 0.0], 10, None);
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0].verse_id, "2.31");
        assert_eq!(hits[1].verse_id, "2.47");
    }

    #[test]
    fn test_chapter_filter_applied_natively() {
        let index = sample_index();
        // The best match overall is 4.7, but only chapter 2 entries may appear
        let hits = index.search(&[0.1, 0.9, 0.1], 10, Some(2));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.verse_id.starts_with("2.")));
    }

    #[test]
    fn test_filter_with_no_matching_chapter_is_empty() {
        let index = sample_index();
        let hits = index.search(&[1.0, 0.0, 0.0], 10, Some(9));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_k_truncates() {
        let index = sample_index();
        let hits = index.search(&[1.0, 0.0, 0.0], 2, None);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_mismatched_dimensions_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.json");

        let index = sample_index();
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.entry_count(), 4);
        let hits = loaded.search(&[1.0, 0.0, 0.0], 1, None);
        assert_eq!(hits[0].verse_id, "2.31");
    }
}
