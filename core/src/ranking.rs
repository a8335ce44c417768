//! Ranking applied on top of boolean retrieval: query-term match counting and Okapi BM25.
//!
//! Both rankers order by score descending and break ties by ascending doc id.

use crate::corpus::CorpusStats;
use crate::error::QueryError;
use crate::index::{DocId, InvertedIndex, PostingEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// BM25 free parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation, k1 >= 0.
    pub k1: f64,
    /// Length normalization, 0 <= b <= 1.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Params {
    pub fn new(k1: f64, b: f64) -> Result<Self, QueryError> {
        let params = Self { k1, b };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if !(self.k1.is_finite() && self.k1 >= 0.0) {
            return Err(QueryError::InvalidRankingParameter {
                name: "k1",
                value: self.k1,
                reason: "must be greater than or equal to 0",
            });
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(QueryError::InvalidRankingParameter {
                name: "b",
                value: self.b,
                reason: "must be between 0 and 1",
            });
        }
        Ok(())
    }
}

fn sort_ranked(ranked: &mut [RankedDoc]) {
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
}

/// Rank the duplicate-preserving union of an OR query by how many query terms matched each
/// document. The counts sum to the length of `union`.
pub fn query_term_rank(union: &[DocId]) -> Vec<RankedDoc> {
    let mut counts: BTreeMap<DocId, u32> = BTreeMap::new();
    for &doc_id in union {
        *counts.entry(doc_id).or_insert(0) += 1;
    }
    let mut ranked: Vec<RankedDoc> = counts
        .into_iter()
        .map(|(doc_id, count)| RankedDoc { doc_id, score: f64::from(count) })
        .collect();
    sort_ranked(&mut ranked);
    ranked
}

/// `ln(N / df)`, or 0 for an unseen term. Not clamped or smoothed.
pub fn idf(num_docs: usize, df: usize) -> f64 {
    if df == 0 {
        return 0.0;
    }
    (num_docs as f64 / df as f64).ln()
}

/// Score `candidates` with BM25. Postings without a term frequency contribute nothing, so
/// callers reject bare doc-id indexes before getting here.
///
/// Only documents in `candidates` that contain at least one query term get a score. Returns
/// `None` when there is nothing to rank or every accumulated score is exactly zero.
pub fn bm25_rank<P: PostingEntry>(
    query_terms: &[String],
    candidates: &[DocId],
    index: &InvertedIndex<P>,
    stats: &CorpusStats,
    params: Bm25Params,
) -> Option<Vec<RankedDoc>> {
    let Bm25Params { k1, b } = params;
    let n = stats.num_docs();
    let avg_len = stats.avg_doc_length();
    let candidates: HashSet<DocId> = candidates.iter().copied().collect();

    let mut scores: BTreeMap<DocId, f64> = BTreeMap::new();
    for term in query_terms {
        let Some(plist) = index.postings(term) else {
            continue;
        };
        let idf = idf(n, plist.len());
        for posting in plist.iter().filter(|p| candidates.contains(&p.doc_id())) {
            let Some(tf) = posting.term_frequency() else {
                continue;
            };
            let doc_id = posting.doc_id();
            let tf = f64::from(tf);
            let len = f64::from(stats.doc_length(doc_id).unwrap_or(0));
            let rel_len = if avg_len > 0.0 { len / avg_len } else { 0.0 };
            let contribution = idf * (tf * (k1 + 1.0)) / (k1 * ((1.0 - b) + b * rel_len) + tf);
            *scores.entry(doc_id).or_insert(0.0) += contribution;
        }
    }

    if scores.values().all(|&s| s == 0.0) {
        return None;
    }
    let mut ranked: Vec<RankedDoc> = scores
        .into_iter()
        .map(|(doc_id, score)| RankedDoc { doc_id, score })
        .collect();
    sort_ranked(&mut ranked);
    Some(ranked)
}
