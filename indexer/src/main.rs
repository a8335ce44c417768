use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use spimi_core::persist::{
    load_all, save_corpus_stats, save_docs, save_meta, save_naive_index, save_spimi_index, IndexPaths, MetaFile,
    FORMAT_VERSION,
};
use spimi_core::tokenizer::tokenize;
use spimi_core::{
    build_sort_based, build_spimi, Bm25Params, BuildComparison, Corpus, DocMeta, IndexChoice, Operation, QueryConfig,
    QueryEngine, RankingMode, SearchResult,
};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One document as extracted from the source collection.
#[derive(Debug, Deserialize)]
struct InputDoc {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    /// "BRIEF" documents only carry a headline worth indexing.
    #[serde(default, rename = "type")]
    doc_type: Option<String>,
}

impl InputDoc {
    /// Objects with neither a title nor a body (index files, manifests) are not documents.
    fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.body.as_deref().map_or(true, |b| b.trim().is_empty())
    }

    fn text(&self) -> String {
        match (&self.body, self.doc_type.as_deref()) {
            (Some(body), ty) if ty != Some("BRIEF") => format!("{} {}", self.title, body),
            _ => self.title.clone(),
        }
    }
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build SPIMI and sort-based inverted indexes and query them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build both indexes from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Stop after this many term occurrences (partial, timed builds)
        #[arg(long)]
        budget: Option<usize>,
    },
    /// Run one query against a built index directory and print the result as JSON
    Query {
        /// Index directory
        #[arg(long, default_value = "./indexes")]
        index: String,
        /// Query text
        #[arg(long, short)]
        query: String,
        /// Boolean operation for multi-term queries: and | or
        #[arg(long, default_value = "or")]
        op: Operation,
        /// Ranking: none | qtr | bm25
        #[arg(long, default_value = "none")]
        ranking: RankingMode,
        #[arg(long, default_value_t = 1.2)]
        k1: f64,
        #[arg(long, default_value_t = 0.75)]
        b: f64,
        /// Which index to query: spimi | naive | both
        #[arg(long, default_value = "both")]
        target: IndexChoice,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, budget } => {
            let comparison = build_index(&input, &output, budget)?;
            println!("\n{comparison}");
            Ok(())
        }
        Commands::Query { index, query, op, ranking, k1, b, target } => {
            let config = QueryConfig::new(op, ranking).with_bm25(Bm25Params { k1, b });
            let out = run_query(&index, &query, &config, target)?;
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
    }
}

/// Accumulates documents in traversal order.
#[derive(Default)]
struct CorpusLoader {
    corpus: Corpus,
    docs: Vec<DocMeta>,
    /// Directory left out of the walk, normally the index output.
    exclude: Option<PathBuf>,
    skipped: usize,
}

impl CorpusLoader {
    fn load_path(&mut self, input_path: &Path) -> Result<()> {
        let mut files: Vec<PathBuf> = Vec::new();
        if input_path.is_dir() {
            let walker = WalkDir::new(input_path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| self.exclude.as_deref() != Some(e.path()));
            for entry in walker.filter_map(|e| e.ok()) {
                let p = entry.path();
                if p.is_file() {
                    if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                        if matches!(ext, "json" | "jsonl") {
                            files.push(p.to_path_buf());
                        }
                    }
                }
            }
        } else if input_path.is_file() {
            files.push(input_path.to_path_buf());
        } else {
            anyhow::bail!("input path {} does not exist", input_path.display());
        }

        for file in files {
            if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                self.load_jsonl(&file)?;
            } else {
                self.load_json(&file)?;
            }
        }
        Ok(())
    }

    fn load_jsonl(&mut self, file: &Path) -> Result<()> {
        let f = File::open(file)?;
        let reader = BufReader::new(f);
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let doc: InputDoc = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
            self.ingest_doc(doc);
        }
        Ok(())
    }

    fn load_json(&mut self, file: &Path) -> Result<()> {
        let f = File::open(file)?;
        let reader = BufReader::new(f);
        let json: serde_json::Value = serde_json::from_reader(reader)
            .with_context(|| format!("parsing {}", file.display()))?;
        match json {
            serde_json::Value::Array(arr) => {
                for v in arr {
                    let doc: InputDoc = serde_json::from_value(v)?;
                    self.ingest_doc(doc);
                }
            }
            serde_json::Value::Object(_) => {
                let doc: InputDoc = serde_json::from_value(json)?;
                self.ingest_doc(doc);
            }
            _ => tracing::warn!(file = %file.display(), "skipping JSON that is neither an object nor an array"),
        }
        Ok(())
    }

    fn ingest_doc(&mut self, doc: InputDoc) {
        if doc.is_blank() {
            self.skipped += 1;
            return;
        }
        let tokens = tokenize(&doc.text());
        self.corpus.push(tokens);
        self.docs.push(DocMeta { external_id: doc.id, title: doc.title });
    }
}

fn load_corpus(input: &str, exclude: Option<&Path>) -> Result<(Corpus, Vec<DocMeta>)> {
    let mut loader = CorpusLoader { exclude: exclude.map(Path::to_path_buf), ..Default::default() };
    loader.load_path(Path::new(input))?;
    if loader.skipped > 0 {
        tracing::warn!(skipped = loader.skipped, "skipped objects with no title or body");
    }
    tracing::info!(
        num_docs = loader.corpus.len(),
        num_tokens = loader.corpus.total_tokens(),
        "tokens retrieved"
    );
    Ok((loader.corpus, loader.docs))
}

fn build_index(input: &str, output: &str, budget: Option<usize>) -> Result<BuildComparison> {
    let (corpus, docs) = load_corpus(input, Some(Path::new(output)))?;
    let out_paths = IndexPaths::new(output);

    let (spimi, spimi_report) = build_spimi(&corpus, budget);
    let (naive, naive_report) = build_sort_based(&corpus, budget);

    save_spimi_index(&out_paths, &spimi)?;
    save_naive_index(&out_paths, &naive)?;
    save_corpus_stats(&out_paths, &corpus.stats())?;
    save_docs(&out_paths, &docs)?;
    let meta = MetaFile {
        num_docs: corpus.len() as u32,
        num_tokens: corpus.total_tokens() as u64,
        budget,
        spimi_terms: spimi.num_terms(),
        naive_terms: naive.num_terms(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(output, "index build complete");
    Ok(BuildComparison::new(spimi_report, naive_report))
}

fn run_query(index_dir: &str, query: &str, config: &QueryConfig, target: IndexChoice) -> Result<serde_json::Value> {
    let stored = load_all(&IndexPaths::new(index_dir))?;
    let mut results = Vec::new();
    if target.includes_naive() {
        let result = QueryEngine::new(&stored.naive).search(query, &config.for_naive(target))?;
        results.push(describe("naive", result));
    }
    if target.includes_spimi() {
        let result = QueryEngine::new(&stored.spimi)
            .with_stats(&stored.stats)
            .search(query, config)?;
        results.push(describe("spimi", result));
    }
    Ok(serde_json::json!({
        "query": query,
        "operation": config.operation.to_string(),
        "ranking": config.ranking.to_string(),
        "results": results,
    }))
}

fn describe(index: &str, result: SearchResult) -> serde_json::Value {
    serde_json::json!({
        "index": index,
        "total_hits": result.len(),
        "result": result,
    })
}
