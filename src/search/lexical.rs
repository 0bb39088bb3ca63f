use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Okapi BM25 parameters.
const K1: f32 = 1.5;
const B: f32 = 0.75;

/// Lowercase word tokens: maximal runs of alphanumeric characters.
/// Must be applied identically at build time and query time; a mismatch
/// silently degrades recall.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Posting {
    /// Index into `doc_ids`
    doc: u32,
    term_freq: u32,
}

/// BM25 inverted index over the composed verse bodies. Built once from the
/// full corpus; immutable during serving. Term statistics are only valid
/// against the corpus snapshot they were built from.
#[derive(Debug, Serialize, Deserialize)]
pub struct LexicalIndex {
    postings: HashMap<String, Vec<Posting>>,
    doc_ids: Vec<String>,
    doc_lengths: Vec<u32>,
    avg_doc_len: f32,
}

/// A scored lexical hit. Rank is the hit's position in the returned list.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub verse_id: String,
    pub score: f32,
}

impl LexicalIndex {
    /// Build the index from `(verse_id, text)` pairs, one entry per document.
    pub fn build<'a, I>(docs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_ids = Vec::new();
        let mut doc_lengths = Vec::new();

        for (verse_id, text) in docs {
            let doc = doc_ids.len() as u32;
            doc_ids.push(verse_id.to_string());

            let tokens = tokenize(text);
            doc_lengths.push(tokens.len() as u32);

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for (term, term_freq) in freqs {
                postings
                    .entry(term)
                    .or_default()
                    .push(Posting { doc, term_freq });
            }
        }

        let total_len: u64 = doc_lengths.iter().map(|&l| l as u64).sum();
        let avg_doc_len = if doc_ids.is_empty() {
            0.0
        } else {
            total_len as f32 / doc_ids.len() as f32
        };

        Self {
            postings,
            doc_ids,
            doc_lengths,
            avg_doc_len,
        }
    }

    pub fn doc_count(&self) -> usize {
        self.doc_ids.len()
    }

    /// Score the query against every document and return at most `k` hits,
    /// best first. Documents with no matching term, or whose accumulated
    /// score is not positive, are not candidates. Ties keep corpus order.
    pub fn search(&self, query: &str, k: usize) -> Vec<LexicalHit> {
        if k == 0 || self.doc_ids.is_empty() {
            return Vec::new();
        }

        let n = self.doc_ids.len() as f32;
        let mut scores: HashMap<u32, f32> = HashMap::new();

        for term in tokenize(query) {
            let Some(postings) = self.postings.get(&term) else {
                continue;
            };
            let df = postings.len() as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for posting in postings {
                let tf = posting.term_freq as f32;
                let dl = self.doc_lengths[posting.doc as usize] as f32;
                let norm = K1 * (1.0 - B + B * dl / self.avg_doc_len);
                let term_score = idf * tf * (K1 + 1.0) / (tf + norm);
                *scores.entry(posting.doc).or_insert(0.0) += term_score;
            }
        }

        let mut hits: Vec<(u32, f32)> = scores
            .into_iter()
            .filter(|&(_, score)| score > 0.0)
            .collect();
        // Corpus order first so the stable sort breaks score ties by
        // first-encountered document.
        hits.sort_by_key(|&(doc, _)| doc);
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);

        hits.into_iter()
            .map(|(doc, score)| LexicalHit {
                verse_id: self.doc_ids[doc as usize].clone(),
                score,
            })
            .collect()
    }

    /// Persist to disk as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string(self).context("Failed to serialize lexical index")?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Load a previously built index.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&data).context("Failed to parse lexical index")
    }
}
