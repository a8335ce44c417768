pub mod builder;
pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod ranking;
pub mod tokenizer;

pub use builder::{build_sort_based, build_spimi, BuildComparison, BuildReport};
pub use corpus::{Corpus, CorpusStats, DocMeta};
pub use error::QueryError;
pub use index::{DocId, InvertedIndex, NaiveIndex, Posting, PostingEntry, SpimiIndex};
pub use query::{IndexChoice, Operation, QueryConfig, QueryEngine, RankingMode, SearchResult};
pub use ranking::{Bm25Params, RankedDoc};
