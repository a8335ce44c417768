use spimi_core::query::{conjunction, disjunction};
use spimi_core::{
    build_sort_based, build_spimi, Bm25Params, Corpus, DocId, Operation, QueryConfig, QueryEngine, QueryError,
    RankingMode, SearchResult,
};

fn scenario() -> Corpus {
    Corpus::from_texts(["the cat sat", "the dog sat", "cat and dog"])
}

fn docs(result: SearchResult) -> Vec<DocId> {
    match result {
        SearchResult::Docs(ids) => ids,
        other => panic!("expected unranked docs, got {other:?}"),
    }
}

#[test]
fn scenario_on_both_indexes() {
    let corpus = scenario();
    let (spimi, _) = build_spimi(&corpus, None);
    let (naive, _) = build_sort_based(&corpus, None);
    let or = QueryConfig::new(Operation::Or, RankingMode::None);
    let and = QueryConfig::new(Operation::And, RankingMode::None);

    let s = QueryEngine::new(&spimi);
    let n = QueryEngine::new(&naive);
    let cases: [(&str, QueryConfig, Vec<DocId>); 3] = [
        ("cat", or, vec![1, 3]),
        ("cat dog", or, vec![1, 2, 3]),
        ("cat dog", and, vec![3]),
    ];
    for (query, config, expected) in cases {
        assert_eq!(docs(s.search(query, &config).unwrap()), expected, "spimi {query}");
        assert_eq!(docs(n.search(query, &config).unwrap()), expected, "naive {query}");
    }
}

#[test]
fn scenario_query_term_ranking() {
    let (naive, _) = build_sort_based(&scenario(), None);
    let config = QueryConfig::new(Operation::Or, RankingMode::QueryTerm);
    let result = QueryEngine::new(&naive).search("cat dog", &config).unwrap();
    let SearchResult::Ranked(ranked) = result else {
        panic!("expected ranked result");
    };
    let pairs: Vec<(DocId, f64)> = ranked.iter().map(|r| (r.doc_id, r.score)).collect();
    assert_eq!(pairs, vec![(3, 2.0), (1, 1.0), (2, 1.0)]);
}

#[test]
fn absent_terms() {
    let (spimi, _) = build_spimi(&scenario(), None);
    let engine = QueryEngine::new(&spimi);
    let or = QueryConfig::new(Operation::Or, RankingMode::None);
    let and = QueryConfig::new(Operation::And, RankingMode::None);
    assert_eq!(engine.search("bird", &or).unwrap(), SearchResult::NoMatch);
    assert_eq!(engine.search("cat bird", &and).unwrap(), SearchResult::NoMatch);
    assert_eq!(docs(engine.search("cat bird", &or).unwrap()), vec![1, 3]);
    assert_eq!(engine.search("bird fish", &or).unwrap(), SearchResult::NoMatch);
}

#[test]
fn empty_query_is_invalid() {
    let (naive, _) = build_sort_based(&scenario(), None);
    let err = QueryEngine::new(&naive).search(" ?! ", &QueryConfig::default()).unwrap_err();
    assert_eq!(err, QueryError::InvalidQuery(" ?! ".to_string()));
}

#[test]
fn incompatible_rankings_are_rejected_up_front() {
    let corpus = scenario();
    let (spimi, _) = build_spimi(&corpus, None);
    let (naive, _) = build_sort_based(&corpus, None);
    let stats = corpus.stats();

    let bm25 = QueryConfig::new(Operation::Or, RankingMode::Bm25);
    let err = QueryEngine::new(&naive).with_stats(&stats).search("cat dog", &bm25).unwrap_err();
    assert!(matches!(err, QueryError::IncompatibleRankingRequest(_)));
    // BM25 without statistics
    let err = QueryEngine::new(&spimi).search("cat dog", &bm25).unwrap_err();
    assert!(matches!(err, QueryError::IncompatibleRankingRequest(_)));

    let qtr = QueryConfig::new(Operation::And, RankingMode::QueryTerm);
    assert!(QueryEngine::new(&spimi).search("cat dog", &qtr).is_err());
    let qtr_single = QueryConfig::new(Operation::Or, RankingMode::QueryTerm);
    assert!(QueryEngine::new(&spimi).search("cat", &qtr_single).is_err());

    let bad = bm25.with_bm25(Bm25Params { k1: 1.2, b: -0.1 });
    let err = QueryEngine::new(&spimi).with_stats(&stats).search("cat", &bad).unwrap_err();
    assert!(matches!(err, QueryError::InvalidRankingParameter { name: "b", .. }));
}

#[test]
fn bm25_ranks_only_matching_documents() {
    let corpus = Corpus::from_texts([
        "rates rates rates fell",
        "bank rates rose",
        "the bank said nothing",
        "weather was fine",
        "markets closed early",
    ]);
    let (spimi, _) = build_spimi(&corpus, None);
    let stats = corpus.stats();
    let engine = QueryEngine::new(&spimi).with_stats(&stats);

    let or = QueryConfig::new(Operation::Or, RankingMode::Bm25);
    let SearchResult::Ranked(ranked) = engine.search("rates bank", &or).unwrap() else {
        panic!("expected ranked result");
    };
    let ids: Vec<DocId> = ranked.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids.len(), 3);
    assert!(!ids.contains(&4) && !ids.contains(&5));
    assert_eq!(ids[0], 2, "doc 2 matches both terms");
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));

    // AND filters before ranking
    let and = QueryConfig::new(Operation::And, RankingMode::Bm25);
    let ranked = engine.search("rates bank", &and).unwrap();
    assert_eq!(ranked.doc_ids(), vec![2]);

    // single-term queries rank their postings directly
    let single = engine.search("rates", &or).unwrap();
    assert_eq!(single.doc_ids(), vec![1, 2]);
}

#[test]
fn bm25_with_no_signal_reports_no_match() {
    // every document holds "news", so idf = 0
    let corpus = Corpus::from_texts(["news today", "news tonight"]);
    let (spimi, _) = build_spimi(&corpus, None);
    let stats = corpus.stats();
    let config = QueryConfig::new(Operation::Or, RankingMode::Bm25);
    let result = QueryEngine::new(&spimi).with_stats(&stats).search("news", &config).unwrap();
    assert_eq!(result, SearchResult::NoMatch);
}

#[test]
fn boolean_properties() {
    let lists = [
        Some(vec![1, 2, 4, 8, 9]),
        Some(vec![2, 3, 4, 9]),
        Some(vec![4, 5, 9, 11]),
        None,
    ];
    let present: Vec<Option<Vec<DocId>>> = lists[..3].to_vec();

    let and = conjunction(&present);
    let or = disjunction(&present, false);
    assert_eq!(and, vec![4, 9]);
    assert!(and.iter().all(|id| or.contains(id)));

    // commutative and associative up to ordering
    let mut reversed = present.clone();
    reversed.reverse();
    assert_eq!(conjunction(&reversed), and);
    let ab = conjunction(&present[..2]);
    let nested = conjunction(&[Some(ab), present[2].clone()]);
    assert_eq!(nested, and);

    // duplicate-preserving union keeps one entry per matching term
    let raw = disjunction(&lists, true);
    let total: usize = lists.iter().flatten().map(Vec::len).sum();
    assert_eq!(raw.len(), total);
    assert!(conjunction(&lists).is_empty());
}

#[test]
fn query_term_counts_sum_to_list_lengths() {
    let corpus = Corpus::from_texts([
        "alpha beta",
        "beta gamma",
        "alpha beta gamma",
        "delta",
    ]);
    let (naive, _) = build_sort_based(&corpus, None);
    let config = QueryConfig::new(Operation::Or, RankingMode::QueryTerm);
    let SearchResult::Ranked(ranked) = QueryEngine::new(&naive).search("alpha beta gamma omega", &config).unwrap() else {
        panic!("expected ranked result");
    };
    let total: f64 = ranked.iter().map(|r| r.score).sum();
    let expected: usize = ["alpha", "beta", "gamma"].iter().map(|t| naive.df(t)).sum();
    assert_eq!(total as usize, expected);
    assert_eq!(ranked[0].doc_id, 3);
}
