//! Criterion benchmarks for the dualdex search engine.
//!
//! Covers the hot paths of a request:
//! - text analysis (normalization, exact and lossy tokenization)
//! - document indexing into the in-memory backend
//! - lossy and exact search, with and without optional backend capabilities

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use dualdex::analysis::{tokenize, tokenize_lossy_query, tokenize_lossy_trigrams};
use dualdex::backend::{MemoryBackend, MemoryBackendConfig};
use dualdex::search::{IndexRequest, SearchEngine, SearchRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tokio::runtime::Runtime;

const WORDS: &[&str] = &[
    "search", "engine", "full", "text", "index", "query", "document", "field", "token", "phrase",
    "trigram", "prefix", "cursor", "budget", "backend", "postings", "verify", "membership",
    "planner", "page", "river", "stone", "amber", "delta",
];

/// Generate test documents for benchmarking.
fn generate_test_documents(count: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|i| {
            let len = 20 + (i % 40);
            (0..len)
                .map(|_| WORDS[rng.random_range(0..WORDS.len())])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn seeded_engine(runtime: &Runtime, config: MemoryBackendConfig, docs: &[String]) -> SearchEngine {
    let engine = SearchEngine::with_backend(Arc::new(MemoryBackend::new(config)));
    runtime.block_on(async {
        for (id, text) in docs.iter().enumerate() {
            engine
                .index_document(IndexRequest::new(json!({"id": id, "text": text})))
                .await
                .unwrap();
        }
    });
    engine
}

fn bench_analysis(c: &mut Criterion) {
    let docs = generate_test_documents(100);
    let bytes: usize = docs.iter().map(String::len).sum();

    let mut group = c.benchmark_group("analysis");
    group.throughput(Throughput::Bytes(bytes as u64));
    group.bench_function("tokenize", |b| {
        b.iter(|| {
            for doc in &docs {
                black_box(tokenize(black_box(doc)));
            }
        })
    });
    group.bench_function("tokenize_lossy_trigrams", |b| {
        b.iter(|| {
            for doc in &docs {
                black_box(tokenize_lossy_trigrams(black_box(doc)));
            }
        })
    });
    group.bench_function("tokenize_lossy_query", |b| {
        b.iter(|| black_box(tokenize_lossy_query(black_box("membership planner go"))))
    });
    group.finish();
}

fn bench_indexing(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let docs = generate_test_documents(200);

    let mut group = c.benchmark_group("indexing");
    group.throughput(Throughput::Elements(docs.len() as u64));
    group.sample_size(20);
    group.bench_function("index_200_documents", |b| {
        b.to_async(&runtime).iter(|| async {
            let engine = SearchEngine::with_backend(Arc::new(MemoryBackend::new_default()));
            for (id, text) in docs.iter().enumerate() {
                engine
                    .index_document(IndexRequest::new(json!({"id": id, "text": text})))
                    .await
                    .unwrap();
            }
            black_box(engine);
        })
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let docs = generate_test_documents(1000);

    for (name, config) in [
        ("default", MemoryBackendConfig::default()),
        ("minimal", MemoryBackendConfig::minimal()),
    ] {
        let engine = seeded_engine(&runtime, config, &docs);
        let mut group = c.benchmark_group(format!("search_{name}"));

        group.bench_function("lossy", |b| {
            b.to_async(&runtime).iter(|| async {
                let response = engine
                    .search_lossy(SearchRequest::new("membership planner").with_limit(50))
                    .await
                    .unwrap();
                black_box(response);
            })
        });
        group.bench_function("exact", |b| {
            b.to_async(&runtime).iter(|| async {
                let response = engine
                    .search_exact(SearchRequest::new("river stone").with_limit(50))
                    .await
                    .unwrap();
                black_box(response);
            })
        });
        group.finish();
    }
}

criterion_group!(benches, bench_analysis, bench_indexing, bench_search);
criterion_main!(benches);
