use crate::index::DocId;
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};

/// Display metadata for a document, kept beside the index but never consulted by retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub external_id: Option<String>,
    pub title: String,
}

/// Ordered token streams, one per document. Position `i` holds document `i + 1`.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Vec<String>>,
}

impl Corpus {
    pub fn from_documents(documents: Vec<Vec<String>>) -> Self {
        Self { documents }
    }

    /// Tokenize each text in order.
    pub fn from_texts<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self { documents: texts.into_iter().map(tokenize).collect() }
    }

    /// Append a document and return its id.
    pub fn push(&mut self, tokens: Vec<String>) -> DocId {
        self.documents.push(tokens);
        self.documents.len() as DocId
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Vec<String>] {
        &self.documents
    }

    pub fn total_tokens(&self) -> usize {
        self.documents.iter().map(Vec::len).sum()
    }

    /// Documents paired with their 1-based ids.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &[String])> {
        self.documents
            .iter()
            .enumerate()
            .map(|(i, tokens)| (i as DocId + 1, tokens.as_slice()))
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            doc_lengths: self.documents.iter().map(|d| d.len() as u32).collect(),
        }
    }
}

/// Global statistics BM25 needs: document count and per-document token counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    doc_lengths: Vec<u32>,
}

impl CorpusStats {
    pub fn from_lengths(doc_lengths: Vec<u32>) -> Self {
        Self { doc_lengths }
    }

    pub fn num_docs(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn doc_length(&self, doc_id: DocId) -> Option<u32> {
        let idx = (doc_id as usize).checked_sub(1)?;
        self.doc_lengths.get(idx).copied()
    }

    pub fn total_tokens(&self) -> u64 {
        self.doc_lengths.iter().map(|&l| u64::from(l)).sum()
    }

    /// Mean tokens per document; 0.0 for an empty corpus.
    pub fn avg_doc_length(&self) -> f64 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        self.total_tokens() as f64 / self.doc_lengths.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_one_based() {
        let corpus = Corpus::from_texts(["the cat sat", "", "cat and dog"]);
        let ids: Vec<DocId> = corpus.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(corpus.total_tokens(), 6);
    }

    #[test]
    fn stats_lengths_and_average() {
        let stats = Corpus::from_texts(["a b c", "d", "e f"]).stats();
        assert_eq!(stats.num_docs(), 3);
        assert_eq!(stats.doc_length(1), Some(3));
        assert_eq!(stats.doc_length(3), Some(2));
        assert_eq!(stats.doc_length(0), None);
        assert_eq!(stats.doc_length(4), None);
        assert!((stats.avg_doc_length() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_stats() {
        let stats = CorpusStats::default();
        assert_eq!(stats.avg_doc_length(), 0.0);
        assert_eq!(stats.num_docs(), 0);
    }
}
