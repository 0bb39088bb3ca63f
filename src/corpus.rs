use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::models::VerseMeta;

/// Metadata keeps at most this many characters of purport; the composed
/// text body always carries the full purport.
const MAX_META_PURPORT_CHARS: usize = 2_000;

/// A verse with its composed text body, as indexed and served.
#[derive(Debug, Clone)]
pub struct VerseDoc {
    pub meta: VerseMeta,
    /// Composed body: translation + purport + emotion keywords
    pub text: String,
}

/// Immutable verse store loaded once at startup. Read-only at query time;
/// a rebuild constructs a fresh store and swaps it in atomically.
pub struct VerseStore {
    docs: Vec<VerseDoc>,
    by_id: HashMap<String, usize>,
}

impl VerseStore {
    /// Load the corpus file and (if present) the derived emotion tags.
    pub fn load(corpus_path: &Path, emotions_path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(corpus_path)
            .with_context(|| format!("Failed to read corpus at {}", corpus_path.display()))?;
        let verses: Vec<VerseMeta> =
            serde_json::from_str(&data).context("Failed to parse corpus JSON")?;

        let emotions: HashMap<String, String> = if emotions_path.exists() {
            let data = std::fs::read_to_string(emotions_path)
                .with_context(|| format!("Failed to read {}", emotions_path.display()))?;
            serde_json::from_str(&data).context("Failed to parse emotions JSON")?
        } else {
            HashMap::new()
        };

        Ok(Self::from_verses(verses, &emotions))
    }

    /// Build a store from in-memory records. Corpus order is preserved and
    /// is the order the lexical index assigns document ids in.
    pub fn from_verses(verses: Vec<VerseMeta>, emotions: &HashMap<String, String>) -> Self {
        let mut docs = Vec::with_capacity(verses.len());
        let mut by_id = HashMap::with_capacity(verses.len());

        for mut meta in verses {
            if meta.verse_id.is_empty() {
                meta.verse_id = format!("{}.{}", meta.chapter, meta.verse);
            }
            if let Some(tags) = emotions.get(&meta.verse_id) {
                if !tags.trim().is_empty() {
                    meta.emotions = Some(tags.trim().to_string());
                }
            }

            let text = compose_text(&meta);
            meta.purport = truncate_chars(&meta.purport, MAX_META_PURPORT_CHARS);

            if by_id.contains_key(&meta.verse_id) {
                tracing::warn!("Duplicate verse id {} in corpus, keeping first", meta.verse_id);
                continue;
            }
            by_id.insert(meta.verse_id.clone(), docs.len());
            docs.push(VerseDoc { meta, text });
        }

        Self { docs, by_id }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// All documents in corpus order.
    pub fn docs(&self) -> &[VerseDoc] {
        &self.docs
    }

    pub fn get(&self, verse_id: &str) -> Option<&VerseDoc> {
        self.by_id.get(verse_id).map(|&i| &self.docs[i])
    }

    /// Fetch documents for a list of ids. Ids with no stored document are
    /// skipped; the caller never sees an error for them.
    pub fn get_many<'a>(&'a self, verse_ids: &[String]) -> Vec<&'a VerseDoc> {
        verse_ids
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }
}

/// Composed text body searched against and shown to the reranker:
/// translation, then purport, then the derived emotion keywords.
fn compose_text(meta: &VerseMeta) -> String {
    let mut text = format!("{}\n\n{}", meta.translation, meta.purport)
        .trim()
        .to_string();
    if let Some(emotions) = &meta.emotions {
        text.push_str("\n\nThemes: ");
        text.push_str(emotions);
    }
    text
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse(chapter: u32, verse: u32, translation: &str, purport: &str) -> VerseMeta {
        VerseMeta {
            verse_id: format!("{chapter}.{verse}"),
            chapter,
            verse,
            sanskrit: String::new(),
            transliteration: String::new(),
            synonyms: String::new(),
            translation: translation.to_string(),
            purport: purport.to_string(),
            emotions: None,
        }
    }

    #[test]
    fn test_compose_text_joins_translation_and_purport() {
        let store = VerseStore::from_verses(
            vec![verse(2, 31, "Considering your duty", "A warrior should not hesitate")],
            &HashMap::new(),
        );
        let doc = store.get("2.31").unwrap();
        assert_eq!(doc.text, "Considering your duty\n\nA warrior should not hesitate");
    }

    #[test]
    fn test_emotion_tags_appended_to_body() {
        let mut emotions = HashMap::new();
        emotions.insert("2.31".to_string(), "duty, hesitation".to_string());
        let store = VerseStore::from_verses(
            vec![verse(2, 31, "Considering your duty", "p")],
            &emotions,
        );
        let doc = store.get("2.31").unwrap();
        assert!(doc.text.ends_with("Themes: duty, hesitation"));
        assert_eq!(doc.meta.emotions.as_deref(), Some("duty, hesitation"));
    }

    #[test]
    fn test_missing_id_generated_from_chapter_and_verse() {
        let mut v = verse(4, 7, "t", "p");
        v.verse_id = String::new();
        let store = VerseStore::from_verses(vec![v], &HashMap::new());
        assert!(store.get("4.7").is_some());
    }

    #[test]
    fn test_meta_purport_truncated_but_body_full() {
        let long = "x".repeat(MAX_META_PURPORT_CHARS + 500);
        let store =
            VerseStore::from_verses(vec![verse(1, 1, "t", &long)], &HashMap::new());
        let doc = store.get("1.1").unwrap();
        assert_eq!(doc.meta.purport.chars().count(), MAX_META_PURPORT_CHARS);
        assert!(doc.text.len() > MAX_META_PURPORT_CHARS);
    }

    #[test]
    fn test_get_many_skips_unknown_ids() {
        let store = VerseStore::from_verses(
            vec![verse(1, 1, "a", "p"), verse(1, 2, "b", "p")],
            &HashMap::new(),
        );
        let docs = store.get_many(&[
            "1.2".to_string(),
            "9.99".to_string(),
            "1.1".to_string(),
        ]);
        let ids: Vec<&str> = docs.iter().map(|d| d.meta.verse_id.as_str()).collect();
        assert_eq!(ids, vec!["1.2", "1.1"]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let store = VerseStore::from_verses(
            vec![verse(1, 1, "first", "p"), verse(1, 1, "second", "p")],
            &HashMap::new(),
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("1.1").unwrap().meta.translation, "first");
    }
}
