use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use spimi_core::persist::{load_all, IndexPaths, MetaFile, StoredIndex};
use spimi_core::{
    Bm25Params, DocId, IndexChoice, Operation, QueryConfig, QueryEngine, RankingMode, SearchResult,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 1000;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// and | or
    pub op: Option<String>,
    /// none | qtr | bm25
    pub ranking: Option<String>,
    /// spimi | naive | both
    pub index: Option<String>,
    pub k1: Option<f64>,
    pub b: Option<f64>,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 100 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub operation: String,
    pub ranking: String,
    pub took_ms: u128,
    pub took_s: f64,
    pub results: Vec<IndexHits>,
}

#[derive(Serialize)]
pub struct IndexHits {
    pub index: &'static str,
    pub total_hits: usize,
    pub ranked: bool,
    pub hits: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub title: Option<String>,
}

/// Indexes are built once and never mutated, so handlers share them without locking.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<StoredIndex>,
}

pub fn build_app(index_dir: String) -> Result<Router> {
    // Load the whole index directory at startup
    let stored = load_all(&IndexPaths::new(&index_dir))?;
    tracing::info!(
        index_dir,
        num_docs = stored.meta.num_docs,
        spimi_terms = stored.spimi.num_terms(),
        naive_terms = stored.naive.num_terms(),
        "index loaded"
    );
    let app_state = AppState { index: Arc::new(stored) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/stats", get(stats_handler))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

fn bad_request(msg: impl ToString) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.to_string())
}

fn parse_or_default<T: std::str::FromStr<Err = String> + Default>(raw: Option<&str>) -> Result<T, (StatusCode, String)> {
    raw.map_or_else(|| Ok(T::default()), |s| s.parse().map_err(bad_request))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let operation: Operation = parse_or_default(params.op.as_deref())?;
    let ranking: RankingMode = parse_or_default(params.ranking.as_deref())?;
    let target: IndexChoice = parse_or_default(params.index.as_deref())?;
    let defaults = Bm25Params::default();
    let bm25 = Bm25Params { k1: params.k1.unwrap_or(defaults.k1), b: params.b.unwrap_or(defaults.b) };
    let config = QueryConfig::new(operation, ranking).with_bm25(bm25);
    let k = params.k.clamp(1, MAX_K);

    let index = &state.index;
    // Run every requested index first so a rejection leaves no partial response.
    let mut outcomes: Vec<(&'static str, SearchResult)> = Vec::new();
    if target.includes_naive() {
        let result = QueryEngine::new(&index.naive)
            .search(&params.q, &config.for_naive(target))
            .map_err(bad_request)?;
        outcomes.push(("naive", result));
    }
    if target.includes_spimi() {
        let result = QueryEngine::new(&index.spimi)
            .with_stats(&index.stats)
            .search(&params.q, &config)
            .map_err(bad_request)?;
        outcomes.push(("spimi", result));
    }

    let results = outcomes
        .into_iter()
        .map(|(name, result)| to_hits(index, name, result, k))
        .collect();

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse {
        query: params.q,
        operation: operation.to_string(),
        ranking: ranking.to_string(),
        took_ms: elapsed.as_millis(),
        took_s: elapsed.as_secs_f64(),
        results,
    }))
}

fn title_of(index: &StoredIndex, doc_id: DocId) -> Option<String> {
    let meta = index.docs.get((doc_id as usize).checked_sub(1)?)?;
    Some(meta.title.clone())
}

fn to_hits(index: &StoredIndex, name: &'static str, result: SearchResult, k: usize) -> IndexHits {
    let total_hits = result.len();
    let (ranked, hits) = match result {
        SearchResult::NoMatch => (false, Vec::new()),
        SearchResult::Docs(docs) => (
            false,
            docs.into_iter()
                .take(k)
                .map(|doc_id| SearchHit { doc_id, score: None, title: title_of(index, doc_id) })
                .collect(),
        ),
        SearchResult::Ranked(ranked) => (
            true,
            ranked
                .into_iter()
                .take(k)
                .map(|r| SearchHit { doc_id: r.doc_id, score: Some(r.score), title: title_of(index, r.doc_id) })
                .collect(),
        ),
    };
    IndexHits { index: name, total_hits, ranked, hits }
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<MetaFile> {
    Json(state.index.meta.clone())
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let index = &state.index;
    let meta = (doc_id as usize)
        .checked_sub(1)
        .and_then(|i| index.docs.get(i))
        .ok_or((StatusCode::NOT_FOUND, format!("document {doc_id} not found")))?;
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "external_id": meta.external_id,
        "title": meta.title,
        "length": index.stats.doc_length(doc_id),
    })))
}
