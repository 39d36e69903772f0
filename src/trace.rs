//! Per-call search counters.
//!
//! A [`SearchTrace`] is created by every search call and, when the backend
//! advertises the `trace` capability, handed to it so backend-side reads are
//! attributed to the call. It is observability only; no search decision reads
//! it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Mutable counters shared between the orchestrator and a backend.
#[derive(Debug)]
pub struct SearchTrace {
    started_at: Instant,
    postings_pages: AtomicU64,
    candidates_verified: AtomicU64,
    tokens_consumed: AtomicU64,
    batch_calls: AtomicU64,
    batch_keys: AtomicU64,
    backend_queries: AtomicU64,
    backend_reads: AtomicU64,
}

impl Default for SearchTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTrace {
    pub fn new() -> Self {
        SearchTrace {
            started_at: Instant::now(),
            postings_pages: AtomicU64::new(0),
            candidates_verified: AtomicU64::new(0),
            tokens_consumed: AtomicU64::new(0),
            batch_calls: AtomicU64::new(0),
            batch_keys: AtomicU64::new(0),
            backend_queries: AtomicU64::new(0),
            backend_reads: AtomicU64::new(0),
        }
    }

    pub fn record_postings_page(&self) {
        self.postings_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_candidate(&self, cost: usize) {
        self.candidates_verified.fetch_add(1, Ordering::Relaxed);
        self.tokens_consumed
            .fetch_add(cost as u64, Ordering::Relaxed);
    }

    /// One batched backend call covering `keys` lookups.
    pub fn record_batch(&self, keys: usize) {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        self.batch_keys.fetch_add(keys as u64, Ordering::Relaxed);
    }

    /// A backend query (postings scan, page read).
    pub fn record_query(&self) {
        self.backend_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// A backend point read (positions, membership, stats).
    pub fn record_reads(&self, count: usize) {
        self.backend_reads
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TraceSnapshot {
        TraceSnapshot {
            postings_pages: self.postings_pages.load(Ordering::Relaxed),
            candidates_verified: self.candidates_verified.load(Ordering::Relaxed),
            tokens_consumed: self.tokens_consumed.load(Ordering::Relaxed),
            batch_calls: self.batch_calls.load(Ordering::Relaxed),
            batch_keys: self.batch_keys.load(Ordering::Relaxed),
            backend_queries: self.backend_queries.load(Ordering::Relaxed),
            backend_reads: self.backend_reads.load(Ordering::Relaxed),
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }
}

/// Plain copy of a [`SearchTrace`] returned with search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSnapshot {
    pub postings_pages: u64,
    pub candidates_verified: u64,
    pub tokens_consumed: u64,
    pub batch_calls: u64,
    pub batch_keys: u64,
    pub backend_queries: u64,
    pub backend_reads: u64,
    pub elapsed_ms: u64,
}
