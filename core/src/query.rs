//! Boolean query processing over either index flavour, with optional ranking.

use crate::corpus::CorpusStats;
use crate::error::QueryError;
use crate::index::{DocId, InvertedIndex, PostingEntry};
use crate::ranking::{bm25_rank, query_term_rank, Bm25Params, RankedDoc};
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    And,
    #[default]
    Or,
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Operation::And),
            "or" => Ok(Operation::Or),
            other => Err(format!("'{other}' is not a valid operation (expected 'and' or 'or')")),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::And => f.write_str("AND"),
            Operation::Or => f.write_str("OR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankingMode {
    #[default]
    #[serde(rename = "none")]
    None,
    /// Count of query terms matched per document; OR queries with several terms only.
    #[serde(rename = "qtr")]
    QueryTerm,
    #[serde(rename = "bm25")]
    Bm25,
}

impl FromStr for RankingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(RankingMode::None),
            "qtr" | "q" | "query-term" => Ok(RankingMode::QueryTerm),
            "bm25" | "b" => Ok(RankingMode::Bm25),
            other => Err(format!("'{other}' is not a valid ranking (expected 'none', 'qtr' or 'bm25')")),
        }
    }
}

impl fmt::Display for RankingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingMode::None => f.write_str("None"),
            RankingMode::QueryTerm => f.write_str("Query Term Ranking"),
            RankingMode::Bm25 => f.write_str("BM25"),
        }
    }
}

/// Which of the two built indexes a caller wants to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexChoice {
    Spimi,
    Naive,
    #[default]
    Both,
}

impl IndexChoice {
    pub fn includes_spimi(self) -> bool {
        matches!(self, IndexChoice::Spimi | IndexChoice::Both)
    }

    pub fn includes_naive(self) -> bool {
        matches!(self, IndexChoice::Naive | IndexChoice::Both)
    }
}

impl FromStr for IndexChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spimi" | "s" => Ok(IndexChoice::Spimi),
            "naive" | "n" => Ok(IndexChoice::Naive),
            "both" | "b" => Ok(IndexChoice::Both),
            other => Err(format!("'{other}' is not a valid index (expected 'spimi', 'naive' or 'both')")),
        }
    }
}

/// Everything a query needs besides its text.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Only consulted for queries of two or more terms.
    pub operation: Operation,
    pub ranking: RankingMode,
    pub bm25: Bm25Params,
}

impl QueryConfig {
    pub fn new(operation: Operation, ranking: RankingMode) -> Self {
        Self { operation, ranking, bm25: Bm25Params::default() }
    }

    pub fn with_bm25(mut self, params: Bm25Params) -> Self {
        self.bm25 = params;
        self
    }

    /// Config for the naive side of a request against `target`. When both indexes are queried,
    /// BM25 applies to SPIMI only and the naive index answers unranked.
    pub fn for_naive(&self, target: IndexChoice) -> QueryConfig {
        match (target, self.ranking) {
            (IndexChoice::Both, RankingMode::Bm25) => QueryConfig { ranking: RankingMode::None, ..*self },
            _ => *self,
        }
    }

    /// Reject ranking requests that cannot apply to a query of `num_terms` terms against an
    /// index with or without term frequencies.
    pub fn validate(&self, num_terms: usize, has_frequencies: bool) -> Result<(), QueryError> {
        match self.ranking {
            RankingMode::None => Ok(()),
            RankingMode::QueryTerm => {
                if num_terms < 2 || self.operation != Operation::Or {
                    return Err(QueryError::incompatible(
                        "query term ranking is only for multi-term OR queries",
                    ));
                }
                Ok(())
            }
            RankingMode::Bm25 => {
                if !has_frequencies {
                    return Err(QueryError::incompatible(
                        "bm25 ranking is only available for the spimi index",
                    ));
                }
                self.bm25.validate()
            }
        }
    }
}

/// Outcome of one query against one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "hits", rename_all = "snake_case")]
pub enum SearchResult {
    /// Nothing matched, or ranking found no signal.
    NoMatch,
    /// Unranked doc ids, ascending.
    Docs(Vec<DocId>),
    /// Ranked hits, best first.
    Ranked(Vec<RankedDoc>),
}

impl SearchResult {
    fn from_docs(docs: Vec<DocId>) -> Self {
        if docs.is_empty() {
            SearchResult::NoMatch
        } else {
            SearchResult::Docs(docs)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SearchResult::NoMatch => 0,
            SearchResult::Docs(docs) => docs.len(),
            SearchResult::Ranked(ranked) => ranked.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Doc ids in result order.
    pub fn doc_ids(&self) -> Vec<DocId> {
        match self {
            SearchResult::NoMatch => Vec::new(),
            SearchResult::Docs(docs) => docs.clone(),
            SearchResult::Ranked(ranked) => ranked.iter().map(|r| r.doc_id).collect(),
        }
    }
}

/// Two-pointer merge of two ascending lists.
pub fn intersect(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(a[i]);
            i += 1;
            j += 1;
        } else if a[i] < b[j] {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// AND of postings lists. Any absent term empties the result; otherwise lists are intersected
/// shortest first, stopping as soon as the running result is empty.
pub fn conjunction(lists: &[Option<Vec<DocId>>]) -> Vec<DocId> {
    let mut present: Vec<&[DocId]> = Vec::with_capacity(lists.len());
    for list in lists {
        match list {
            Some(ids) => present.push(ids),
            None => return Vec::new(),
        }
    }
    present.sort_by_key(|ids| ids.len());

    let mut iter = present.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let mut result = first.to_vec();
    for ids in iter {
        if result.is_empty() {
            break;
        }
        result = intersect(&result, ids);
    }
    result
}

/// OR of postings lists, skipping absent terms. With `keep_duplicates` the raw concatenation
/// is returned (one entry per matching term); otherwise the union is deduplicated and sorted.
pub fn disjunction(lists: &[Option<Vec<DocId>>], keep_duplicates: bool) -> Vec<DocId> {
    let mut union: Vec<DocId> = lists.iter().flatten().flatten().copied().collect();
    union.sort_unstable();
    if !keep_duplicates {
        union.dedup();
    }
    union
}

/// Answers queries against a borrowed, already-built index.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a, P> {
    index: &'a InvertedIndex<P>,
    stats: Option<&'a CorpusStats>,
}

impl<'a, P: PostingEntry> QueryEngine<'a, P> {
    pub fn new(index: &'a InvertedIndex<P>) -> Self {
        Self { index, stats: None }
    }

    /// Corpus statistics are required for BM25.
    pub fn with_stats(mut self, stats: &'a CorpusStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn search(&self, query: &str, config: &QueryConfig) -> Result<SearchResult, QueryError> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Err(QueryError::InvalidQuery(query.to_string()));
        }
        config.validate(terms.len(), P::HAS_FREQUENCIES)?;
        let bm25_stats = match config.ranking {
            RankingMode::Bm25 => Some(
                self.stats
                    .ok_or_else(|| QueryError::incompatible("bm25 ranking needs corpus statistics"))?,
            ),
            _ => None,
        };

        let lists: Vec<Option<Vec<DocId>>> = terms.iter().map(|t| self.index.doc_ids(t)).collect();
        let candidates = if terms.len() == 1 {
            lists.into_iter().next().flatten().unwrap_or_default()
        } else {
            match config.operation {
                Operation::And => conjunction(&lists),
                Operation::Or => disjunction(&lists, config.ranking == RankingMode::QueryTerm),
            }
        };
        tracing::debug!(
            terms = terms.len(),
            operation = %config.operation,
            ranking = %config.ranking,
            candidates = candidates.len(),
            "boolean stage done"
        );

        if candidates.is_empty() {
            return Ok(SearchResult::NoMatch);
        }
        let result = match config.ranking {
            RankingMode::None => SearchResult::from_docs(candidates),
            RankingMode::QueryTerm => SearchResult::Ranked(query_term_rank(&candidates)),
            RankingMode::Bm25 => {
                let ranked = bm25_stats
                    .and_then(|stats| bm25_rank(&terms, &candidates, self.index, stats, config.bm25));
                match ranked {
                    Some(ranked) => SearchResult::Ranked(ranked),
                    None => {
                        tracing::info!(query, "bm25 found no signal among candidates");
                        SearchResult::NoMatch
                    }
                }
            }
        };
        Ok(result)
    }
}
