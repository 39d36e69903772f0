//! Pagination completeness under random page sizes and tight budgets.

use std::sync::Arc;

use dualdex::analysis::{tokenize, tokenize_lossy_query, tokenize_lossy_trigrams};
use dualdex::backend::{MemoryBackend, MemoryBackendConfig};
use dualdex::config::EngineConfig;
use dualdex::doc_id::DocId;
use dualdex::error::Result;
use dualdex::limits::{DEFAULT_MAX_TOKENS, SearchLimits};
use dualdex::search::{IndexRequest, SearchEngine, SearchRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

const WORDS: &[&str] = &["amber", "basalt", "cobalt", "delta", "ember", "fjord"];

#[derive(Clone, Copy, Debug)]
enum Mode {
    Lossy,
    Exact,
}

fn random_corpus(rng: &mut StdRng, count: i64) -> Vec<(i64, String)> {
    (1..=count)
        .map(|id| {
            let len = rng.random_range(1..6);
            let words: Vec<&str> = (0..len)
                .map(|_| WORDS[rng.random_range(0..WORDS.len())])
                .collect();
            (id, words.join(" "))
        })
        .collect()
}

async fn engine(
    config: MemoryBackendConfig,
    page_size: usize,
    docs: &[(i64, String)],
) -> Result<SearchEngine> {
    let engine_config = EngineConfig {
        postings_page_size: page_size,
        ..Default::default()
    };
    let engine = SearchEngine::new(Arc::new(MemoryBackend::new(config)), engine_config)?;
    for (id, text) in docs {
        engine
            .index_document(IndexRequest::new(json!({"id": id, "text": text})))
            .await?;
    }
    Ok(engine)
}

/// Follow cursors until exhausted and return every identifier seen.
async fn collect(
    engine: &SearchEngine,
    mode: Mode,
    query: &str,
    limit: usize,
    limits: Option<SearchLimits>,
) -> Result<Vec<DocId>> {
    let mut all = Vec::new();
    let mut cursor = None;
    for _ in 0..10_000 {
        let mut request = SearchRequest::new(query)
            .with_limit(limit)
            .with_cursor(cursor.take());
        request.limits = limits;
        let response = match mode {
            Mode::Lossy => engine.search_lossy(request).await?,
            Mode::Exact => engine.search_exact(request).await?,
        };
        assert!(response.ids.len() <= limit);
        all.extend(response.ids);
        match response.cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(all),
        }
    }
    panic!("pagination for {query:?} did not terminate");
}

fn expected_lossy(docs: &[(i64, String)], query: &str) -> Vec<DocId> {
    let mut wanted = tokenize_lossy_query(query);
    wanted.truncate(DEFAULT_MAX_TOKENS);
    docs.iter()
        .filter(|(_, text)| {
            let tokens = tokenize_lossy_trigrams(text);
            wanted.trigrams.iter().all(|t| tokens.contains(t))
        })
        .map(|(id, _)| DocId::from(*id))
        .collect()
}

fn expected_exact(docs: &[(i64, String)], query: &str) -> Vec<DocId> {
    let phrase = tokenize(query).tokens;
    docs.iter()
        .filter(|(_, text)| {
            tokenize(text)
                .tokens
                .windows(phrase.len())
                .any(|window| window == phrase.as_slice())
        })
        .map(|(id, _)| DocId::from(*id))
        .collect()
}

#[tokio::test]
async fn test_random_paging_is_complete() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let docs = random_corpus(&mut rng, 60);

    for config in [MemoryBackendConfig::default(), MemoryBackendConfig::minimal()] {
        let page_size = rng.random_range(1..9);
        let engine = engine(config, page_size, &docs).await?;

        for word in WORDS {
            let limit = rng.random_range(1..7);
            let found = collect(&engine, Mode::Lossy, word, limit, None).await?;
            assert_eq!(found, expected_lossy(&docs, word), "lossy {word} limit {limit}");
        }

        for phrase in ["amber basalt", "delta delta", "cobalt ember fjord"] {
            let limit = rng.random_range(1..7);
            let found = collect(&engine, Mode::Exact, phrase, limit, None).await?;
            assert_eq!(found, expected_exact(&docs, phrase), "exact {phrase} limit {limit}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_tight_budget_loses_nothing() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let docs = random_corpus(&mut rng, 40);
    let tight = SearchLimits {
        max_candidates_verified: Some(1.0),
        max_postings_pages: Some(1.0),
        ..Default::default()
    };

    for config in [MemoryBackendConfig::default(), MemoryBackendConfig::minimal()] {
        let engine = engine(config, 4, &docs).await?;
        for (mode, query) in [
            (Mode::Lossy, "cobalt"),
            (Mode::Lossy, "amber fjord"),
            (Mode::Exact, "ember"),
            (Mode::Exact, "basalt delta"),
        ] {
            let unlimited = collect(&engine, mode, query, 1000, None).await?;
            let budgeted = collect(&engine, mode, query, 1000, Some(tight)).await?;
            assert_eq!(budgeted, unlimited, "{mode:?} {query}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_plan_survives_index_changes() -> Result<()> {
    let docs: Vec<(i64, String)> = (1..=6).map(|id| (id, "amber basalt".to_string())).collect();
    let engine = engine(MemoryBackendConfig::default(), 2, &docs).await?;

    let first = engine
        .search_lossy(SearchRequest::new("amber basalt").with_limit(2))
        .await?;
    assert_eq!(first.ids, vec![DocId::from(1), DocId::from(2)]);

    // Skew the token statistics between pages.
    for id in 100..110 {
        engine
            .index_document(IndexRequest::new(json!({"id": id, "text": "amber"})))
            .await?;
    }

    let rest = {
        let mut ids = Vec::new();
        let mut cursor = first.cursor;
        while let Some(current) = cursor.take() {
            let response = engine
                .search_lossy(
                    SearchRequest::new("amber basalt")
                        .with_limit(2)
                        .with_cursor(Some(current)),
                )
                .await?;
            ids.extend(response.ids);
            cursor = response.cursor;
        }
        ids
    };
    assert_eq!(rest, (3..=6i64).map(DocId::from).collect::<Vec<DocId>>());
    Ok(())
}

#[tokio::test]
async fn test_single_candidate_budget_pages_one_by_one() -> Result<()> {
    let docs: Vec<(i64, String)> = (1..=5).map(|id| (id, "silver lining".to_string())).collect();
    let one = SearchLimits {
        max_candidates_verified: Some(1.0),
        ..Default::default()
    };

    for config in [MemoryBackendConfig::default(), MemoryBackendConfig::minimal()] {
        let engine = engine(config, 128, &docs).await?;
        for (mode, query) in [(Mode::Lossy, "silver"), (Mode::Exact, "silver lining")] {
            let request = SearchRequest::new(query).with_limit(10).with_limits(one);
            let first = match mode {
                Mode::Lossy => engine.search_lossy(request).await?,
                Mode::Exact => engine.search_exact(request).await?,
            };
            assert!(first.ids.len() <= 1, "{mode:?}");
            assert!(first.cursor.is_some(), "{mode:?}");

            let all = collect(&engine, mode, query, 10, Some(one)).await?;
            assert_eq!(all, (1..=5i64).map(DocId::from).collect::<Vec<DocId>>());
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_single_page_budget_returns_whole_page() -> Result<()> {
    let one_page = SearchLimits {
        max_postings_pages: Some(1.0),
        ..Default::default()
    };
    let expected: Vec<DocId> = (1..=10i64).map(DocId::from).collect();

    for config in [MemoryBackendConfig::default(), MemoryBackendConfig::minimal()] {
        let cats: Vec<(i64, String)> = (1..=10).map(|id| (id, "cat".to_string())).collect();
        let cat_engine = engine(config, 128, &cats).await?;
        let response = cat_engine
            .search_lossy(SearchRequest::new("cat").with_limit(10).with_limits(one_page))
            .await?;
        assert_eq!(response.ids, expected, "lossy cat");
        assert!(response.cursor.is_none());

        let lined: Vec<(i64, String)> =
            (1..=10).map(|id| (id, "silver lining".to_string())).collect();
        let engine = engine(config, 128, &lined).await?;
        for (mode, query) in [(Mode::Lossy, "silver"), (Mode::Exact, "silver lining")] {
            let request = SearchRequest::new(query).with_limit(10).with_limits(one_page);
            let response = match mode {
                Mode::Lossy => engine.search_lossy(request).await?,
                Mode::Exact => engine.search_exact(request).await?,
            };
            assert_eq!(response.ids, expected, "{mode:?} {query}");
            assert!(response.cursor.is_none(), "{mode:?} {query}");
        }
    }
    Ok(())
}
