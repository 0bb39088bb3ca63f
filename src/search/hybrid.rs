use std::collections::HashMap;

use crate::search::lexical::LexicalHit;
use crate::search::vector::VectorHit;

/// Fusion knobs, taken from [`crate::config::RetrievalConfig`].
#[derive(Debug, Clone, Copy)]
pub struct FusionParams {
    /// RRF constant
    pub rrf_k: f32,
    /// Size of the fused candidate pool
    pub candidate_pool: usize,
}

/// A fused candidate. Carries no document text; the reranker fetches
/// bodies from the store.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub verse_id: String,
    pub fused_score: f32,
}

/// Reciprocal Rank Fusion of the semantic and lexical ranked lists.
///
/// Each document appearing in either list scores
/// `1/(rrf_k + rank + 1)` per list it appears in; documents in neither
/// list never appear. The semantic list arrives already chapter-filtered
/// (the vector index applies the predicate natively); the lexical list is
/// filtered here, and surviving hits are re-ranked contiguously so rank
/// positions reflect only filter-surviving documents. The lexical list is
/// expected to be over-fetched; at most `candidate_pool` lexical ranks are
/// assigned. If the over-fetch ceiling leaves fewer survivors, the fused
/// pool is simply smaller.
///
/// Ties in fused score break ascending by verse id.
pub fn rrf_fuse<F>(
    vector_hits: &[VectorHit],
    lexical_hits: &[LexicalHit],
    chapter_filter: Option<u32>,
    chapter_of: F,
    params: FusionParams,
) -> Vec<Candidate>
where
    F: Fn(&str) -> Option<u32>,
{
    let mut vector_ranks: HashMap<&str, usize> = HashMap::new();
    for (rank, hit) in vector_hits.iter().enumerate() {
        vector_ranks.entry(hit.verse_id.as_str()).or_insert(rank);
    }

    let mut lexical_ranks: HashMap<&str, usize> = HashMap::new();
    let mut rank = 0usize;
    for hit in lexical_hits {
        if let Some(wanted) = chapter_filter {
            if chapter_of(&hit.verse_id) != Some(wanted) {
                continue;
            }
        }
        lexical_ranks.entry(hit.verse_id.as_str()).or_insert(rank);
        rank += 1;
        if rank >= params.candidate_pool {
            break;
        }
    }

    let mut fused: Vec<Candidate> = Vec::with_capacity(vector_ranks.len() + lexical_ranks.len());
    for (&verse_id, &v_rank) in &vector_ranks {
        let mut score = 1.0 / (params.rrf_k + v_rank as f32 + 1.0);
        if let Some(&l_rank) = lexical_ranks.get(verse_id) {
            score += 1.0 / (params.rrf_k + l_rank as f32 + 1.0);
        }
        fused.push(Candidate {
            verse_id: verse_id.to_string(),
            fused_score: score,
        });
    }
    for (&verse_id, &l_rank) in &lexical_ranks {
        if vector_ranks.contains_key(verse_id) {
            continue;
        }
        fused.push(Candidate {
            verse_id: verse_id.to_string(),
            fused_score: 1.0 / (params.rrf_k + l_rank as f32 + 1.0),
        });
    }

    fused.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.verse_id.cmp(&b.verse_id))
    });
    fused.truncate(params.candidate_pool);
    fused
}
