use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// 1-based document number, assigned in corpus traversal order.
pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32, // occurrences of the term in doc_id
}

impl Posting {
    pub fn new(doc_id: DocId) -> Self {
        Self { doc_id, tf: 1 }
    }
}

/// An entry of a postings list. Both index flavours share the boolean machinery through this
/// trait; only frequency-bearing entries can feed BM25.
pub trait PostingEntry {
    /// Whether entries of this type carry a term frequency.
    const HAS_FREQUENCIES: bool;

    fn doc_id(&self) -> DocId;
    fn term_frequency(&self) -> Option<u32>;
}

impl PostingEntry for Posting {
    const HAS_FREQUENCIES: bool = true;

    fn doc_id(&self) -> DocId {
        self.doc_id
    }
    fn term_frequency(&self) -> Option<u32> {
        Some(self.tf)
    }
}

impl PostingEntry for DocId {
    const HAS_FREQUENCIES: bool = false;

    fn doc_id(&self) -> DocId {
        *self
    }
    fn term_frequency(&self) -> Option<u32> {
        None
    }
}

/// Term -> postings mapping. Keys iterate in lexical order; every postings list is strictly
/// increasing by doc id. Immutable once a builder hands it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex<P> {
    terms: BTreeMap<String, Vec<P>>,
}

/// Frequency-bearing index produced by the single-pass builder.
pub type SpimiIndex = InvertedIndex<Posting>;
/// Bare doc-id index produced by the sort-based builder.
pub type NaiveIndex = InvertedIndex<DocId>;

impl<P> Default for InvertedIndex<P> {
    fn default() -> Self {
        Self { terms: BTreeMap::new() }
    }
}

impl<P: PostingEntry> InvertedIndex<P> {
    pub(crate) fn from_terms(terms: BTreeMap<String, Vec<P>>) -> Self {
        Self { terms }
    }

    pub fn postings(&self, term: &str) -> Option<&[P]> {
        self.terms.get(term).map(Vec::as_slice)
    }

    /// Postings of `term` reduced to doc ids, `None` if the term is absent.
    pub fn doc_ids(&self, term: &str) -> Option<Vec<DocId>> {
        self.postings(term)
            .map(|plist| plist.iter().map(PostingEntry::doc_id).collect())
    }

    /// Document frequency, 0 for absent terms.
    pub fn df(&self, term: &str) -> usize {
        self.terms.get(term).map_or(0, Vec::len)
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    /// Sum of term frequencies; for a bare-id index each entry counts once.
    pub fn total_occurrences(&self) -> u64 {
        self.terms
            .values()
            .flatten()
            .map(|p| u64::from(p.term_frequency().unwrap_or(1)))
            .sum()
    }

    /// Check that every list is strictly increasing by doc id.
    pub fn is_well_formed(&self) -> bool {
        self.terms
            .values()
            .all(|plist| plist.windows(2).all(|w| w[0].doc_id() < w[1].doc_id()))
    }
}

impl SpimiIndex {
    /// Drop frequencies, giving the same shape the sort-based builder produces.
    pub fn to_doc_id_index(&self) -> NaiveIndex {
        InvertedIndex::from_terms(
            self.terms
                .iter()
                .map(|(term, plist)| (term.clone(), plist.iter().map(|p| p.doc_id).collect()))
                .collect(),
        )
    }
}

impl<'a, P> IntoIterator for &'a InvertedIndex<P> {
    type Item = (&'a String, &'a Vec<P>);
    type IntoIter = btree_map::Iter<'a, String, Vec<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}
