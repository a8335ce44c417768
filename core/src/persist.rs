use crate::{CorpusStats, DocMeta, NaiveIndex, SpimiIndex};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_tokens: u64,
    /// Occurrence budget the indexes were built with, if any.
    pub budget: Option<usize>,
    pub spimi_terms: usize,
    pub naive_terms: usize,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn spimi(&self) -> PathBuf { self.root.join("spimi.json") }
    pub fn naive(&self) -> PathBuf { self.root.join("naive.json") }
    fn stats(&self) -> PathBuf { self.root.join("corpus_stats.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value)?;
    w.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(f))?;
    Ok(value)
}

fn write_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let value = bincode::deserialize(&buf)?;
    Ok(value)
}

/// Write the SPIMI index as pretty JSON; keys come out in lexical order.
pub fn save_spimi_index(paths: &IndexPaths, index: &SpimiIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_json(&paths.spimi(), index)
}

pub fn load_spimi_index(paths: &IndexPaths) -> Result<SpimiIndex> {
    read_json(&paths.spimi())
}

pub fn save_naive_index(paths: &IndexPaths, index: &NaiveIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_json(&paths.naive(), index)
}

pub fn load_naive_index(paths: &IndexPaths) -> Result<NaiveIndex> {
    read_json(&paths.naive())
}

pub fn save_corpus_stats(paths: &IndexPaths, stats: &CorpusStats) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bin(&paths.stats(), stats)
}

pub fn load_corpus_stats(paths: &IndexPaths) -> Result<CorpusStats> {
    read_bin(&paths.stats())
}

/// Document metadata in doc id order (position `i` is document `i + 1`).
pub fn save_docs(paths: &IndexPaths, docs: &[DocMeta]) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bin(&paths.docs(), &docs)
}

pub fn load_docs(paths: &IndexPaths) -> Result<Vec<DocMeta>> {
    read_bin(&paths.docs())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_json(&paths.meta(), meta)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    read_json(&paths.meta())
}

/// Everything a query service needs, loaded from one index directory.
pub struct StoredIndex {
    pub spimi: SpimiIndex,
    pub naive: NaiveIndex,
    pub stats: CorpusStats,
    pub docs: Vec<DocMeta>,
    pub meta: MetaFile,
}

pub fn load_all(paths: &IndexPaths) -> Result<StoredIndex> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        anyhow::bail!("unsupported index version {} (expected {FORMAT_VERSION})", meta.version);
    }
    Ok(StoredIndex {
        spimi: load_spimi_index(paths)?,
        naive: load_naive_index(paths)?,
        stats: load_corpus_stats(paths)?,
        docs: load_docs(paths)?,
        meta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_sort_based, build_spimi, Corpus};

    #[test]
    fn round_trips_an_index_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("idx"));
        let corpus = Corpus::from_texts(["the cat sat", "cat and dog"]);
        let (spimi, _) = build_spimi(&corpus, None);
        let (naive, _) = build_sort_based(&corpus, None);
        let docs = vec![DocMeta { external_id: Some("a".into()), title: "A".into() }, DocMeta::default()];
        let meta = MetaFile {
            num_docs: 2,
            num_tokens: 6,
            budget: None,
            spimi_terms: spimi.num_terms(),
            naive_terms: naive.num_terms(),
            created_at: "2024-01-01T00:00:00Z".into(),
            version: FORMAT_VERSION,
        };
        save_spimi_index(&paths, &spimi).unwrap();
        save_naive_index(&paths, &naive).unwrap();
        save_corpus_stats(&paths, &corpus.stats()).unwrap();
        save_docs(&paths, &docs).unwrap();
        save_meta(&paths, &meta).unwrap();

        let stored = load_all(&paths).unwrap();
        assert_eq!(stored.spimi, spimi);
        assert_eq!(stored.naive, naive);
        assert_eq!(stored.stats, corpus.stats());
        assert_eq!(stored.docs, docs);
        assert_eq!(stored.meta, meta);

        let text = std::fs::read_to_string(paths.naive()).unwrap();
        assert!(text.find("\"and\"").unwrap() < text.find("\"the\"").unwrap());
    }

    #[test]
    fn missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_all(&IndexPaths::new(dir.path().join("nope"))).is_err());
    }
}
