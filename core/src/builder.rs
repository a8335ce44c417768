//! Index construction: the single-pass SPIMI builder and the sort-then-group baseline.
//!
//! Both builders walk the corpus in document order and stop once `budget` term occurrences
//! have been consumed. A document cut short by the budget still consumes its id.

use crate::corpus::Corpus;
use crate::index::{DocId, InvertedIndex, NaiveIndex, Posting, SpimiIndex};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    Spimi,
    Naive,
}

impl fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderKind::Spimi => f.write_str("SPIMI"),
            BuilderKind::Naive => f.write_str("Naive"),
        }
    }
}

/// What a single build consumed and how long it took.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub kind: BuilderKind,
    /// Term occurrences (term, doc) consumed, before any dedup.
    pub pairs: usize,
    /// Document ids consumed, including one truncated by the budget.
    pub documents_seen: usize,
    pub terms: usize,
    pub elapsed: Duration,
}

fn budget_reached(budget: Option<usize>, pairs: usize) -> bool {
    budget.is_some_and(|limit| pairs >= limit)
}

/// Single-pass in-memory indexing.
///
/// Tokens of one document arrive contiguously, so a repeat of a term within the current
/// document can only ever be the last posting of that term's list.
pub fn build_spimi(corpus: &Corpus, budget: Option<usize>) -> (SpimiIndex, BuildReport) {
    let start = Instant::now();
    let mut terms: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
    let mut pairs = 0usize;
    let mut documents_seen = 0usize;

    'docs: for (doc_id, tokens) in corpus.iter() {
        if budget_reached(budget, pairs) {
            break;
        }
        documents_seen += 1;
        for token in tokens {
            if let Some(plist) = terms.get_mut(token.as_str()) {
                match plist.last_mut() {
                    Some(last) if last.doc_id == doc_id => last.tf += 1,
                    _ => plist.push(Posting::new(doc_id)),
                }
            } else {
                terms.insert(token.clone(), vec![Posting::new(doc_id)]);
            }
            pairs += 1;
            if budget_reached(budget, pairs) {
                tracing::debug!(doc_id, pairs, "occurrence budget reached");
                break 'docs;
            }
        }
    }

    let index = InvertedIndex::from_terms(terms);
    let report = BuildReport {
        kind: BuilderKind::Spimi,
        pairs,
        documents_seen,
        terms: index.num_terms(),
        elapsed: start.elapsed(),
    };
    tracing::info!(
        pairs,
        documents = documents_seen,
        terms = report.terms,
        elapsed_ms = ms(report.elapsed),
        "SPIMI index built"
    );
    (index, report)
}

/// Baseline: collect every (term, doc) pair, sort, dedup, then group by term.
pub fn build_sort_based(corpus: &Corpus, budget: Option<usize>) -> (NaiveIndex, BuildReport) {
    let start = Instant::now();
    let mut pairs: Vec<(&str, DocId)> = Vec::new();
    let mut documents_seen = 0usize;

    'docs: for (doc_id, tokens) in corpus.iter() {
        if budget_reached(budget, pairs.len()) {
            break;
        }
        documents_seen += 1;
        for token in tokens {
            pairs.push((token.as_str(), doc_id));
            if budget_reached(budget, pairs.len()) {
                tracing::debug!(doc_id, pairs = pairs.len(), "occurrence budget reached");
                break 'docs;
            }
        }
    }
    let pair_count = pairs.len();

    pairs.sort_unstable();
    pairs.dedup();

    // Pairs are sorted and unique, so each list grows in ascending doc order.
    let mut terms: BTreeMap<String, Vec<DocId>> = BTreeMap::new();
    for (term, doc_id) in pairs {
        if let Some(ids) = terms.get_mut(term) {
            ids.push(doc_id);
        } else {
            terms.insert(term.to_string(), vec![doc_id]);
        }
    }

    let index = InvertedIndex::from_terms(terms);
    let report = BuildReport {
        kind: BuilderKind::Naive,
        pairs: pair_count,
        documents_seen,
        terms: index.num_terms(),
        elapsed: start.elapsed(),
    };
    tracing::info!(
        pairs = pair_count,
        documents = documents_seen,
        terms = report.terms,
        elapsed_ms = ms(report.elapsed),
        "Naive index built"
    );
    (index, report)
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Side-by-side timing of the two builders over the same corpus and budget.
#[derive(Debug, Clone)]
pub struct BuildComparison {
    pub spimi: BuildReport,
    pub naive: BuildReport,
}

impl BuildComparison {
    pub fn new(spimi: BuildReport, naive: BuildReport) -> Self {
        Self { spimi, naive }
    }

    /// Naive time minus SPIMI time, in milliseconds (positive when SPIMI is faster).
    pub fn time_difference_ms(&self) -> f64 {
        ms(self.naive.elapsed) - ms(self.spimi.elapsed)
    }

    /// Difference relative to the naive build, in percent. 0 when the naive build took no time.
    pub fn time_difference_percent(&self) -> f64 {
        let naive = ms(self.naive.elapsed);
        if naive == 0.0 {
            return 0.0;
        }
        self.time_difference_ms() / naive * 100.0
    }
}

impl fmt::Display for BuildComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "========== STATISTICS ==========")?;
        for report in [&self.spimi, &self.naive] {
            writeln!(f)?;
            writeln!(f, "--- {} construction ---", report.kind)?;
            writeln!(f, "Pairs processed: {}", report.pairs)?;
            writeln!(f, "Documents seen: {}", report.documents_seen)?;
            writeln!(f, "Time (ms): {:.3}", ms(report.elapsed))?;
            writeln!(f, "Size: {} terms", report.terms)?;
        }
        writeln!(f)?;
        writeln!(f, "--- Differences ---")?;
        writeln!(f, "Time difference (ms): {:.3}", self.time_difference_ms())?;
        write!(f, "Time difference (%): {:.3}%", self.time_difference_percent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        Corpus::from_texts(["the cat sat", "the dog sat", "cat and dog"])
    }

    #[test]
    fn spimi_counts_frequencies() {
        let corpus = Corpus::from_texts(["a b a", "b b"]);
        let (idx, report) = build_spimi(&corpus, None);
        assert_eq!(idx.postings("a"), Some(&[Posting { doc_id: 1, tf: 2 }][..]));
        assert_eq!(
            idx.postings("b"),
            Some(&[Posting { doc_id: 1, tf: 1 }, Posting { doc_id: 2, tf: 2 }][..])
        );
        assert_eq!(report.pairs, 5);
        assert_eq!(report.documents_seen, 2);
    }

    #[test]
    fn sort_based_groups_unique_ids() {
        let (idx, report) = build_sort_based(&corpus(), None);
        assert_eq!(idx.postings("cat"), Some(&[1, 3][..]));
        assert_eq!(idx.postings("sat"), Some(&[1, 2][..]));
        assert_eq!(idx.postings("the"), Some(&[1, 2][..]));
        assert_eq!(report.pairs, 9);
        assert_eq!(report.terms, 5);
    }

    #[test]
    fn budget_truncates_mid_document() {
        // 4 occurrences: all of doc 1 and the first token of doc 2.
        let (idx, report) = build_spimi(&corpus(), Some(4));
        assert_eq!(report.pairs, 4);
        assert_eq!(report.documents_seen, 2);
        assert_eq!(idx.total_occurrences(), 4);
        assert_eq!(idx.doc_ids("the"), Some(vec![1, 2]));
        assert_eq!(idx.doc_ids("dog"), None);

        let (naive, report) = build_sort_based(&corpus(), Some(4));
        assert_eq!(report.pairs, 4);
        assert_eq!(report.documents_seen, 2);
        assert_eq!(naive, idx.to_doc_id_index());
    }

    #[test]
    fn zero_budget_builds_nothing() {
        let (idx, report) = build_spimi(&corpus(), Some(0));
        assert!(idx.is_empty());
        assert_eq!(report.documents_seen, 0);
    }

    #[test]
    fn empty_documents_consume_ids() {
        let corpus = Corpus::from_texts(["", "cat", ""]);
        let (idx, report) = build_spimi(&corpus, None);
        assert_eq!(idx.doc_ids("cat"), Some(vec![2]));
        assert_eq!(report.documents_seen, 3);
    }

    #[test]
    fn comparison_is_printable() {
        let (_, s) = build_spimi(&corpus(), None);
        let (_, n) = build_sort_based(&corpus(), None);
        let text = BuildComparison::new(s, n).to_string();
        assert!(text.contains("SPIMI construction"));
        assert!(text.contains("Naive construction"));
        assert!(text.contains("Size: 5 terms"));
    }
}
