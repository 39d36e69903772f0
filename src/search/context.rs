//! Per-call state shared by the search paths.

use std::sync::Arc;

use crate::backend::{BackendCapabilities, IndexBackend};
use crate::limits::{LimitTracker, ResolvedLimits};
use crate::trace::SearchTrace;

/// The limit tracker plus the trace counters it mirrors into.
pub(crate) struct Budget {
    tracker: LimitTracker,
    trace: Arc<SearchTrace>,
}

impl Budget {
    fn new(limits: ResolvedLimits, trace: Arc<SearchTrace>) -> Self {
        Budget {
            tracker: LimitTracker::new(limits),
            trace,
        }
    }

    /// Account for one candidate; `false` means stop after it.
    pub fn candidate(&mut self, cost: usize) -> bool {
        self.trace.record_candidate(cost);
        self.tracker.try_consume_candidate(cost)
    }

    /// Account for one postings page; `false` means stop after it.
    pub fn postings_page(&mut self) -> bool {
        self.trace.record_postings_page();
        self.tracker.try_consume_postings_page()
    }

    pub fn should_stop(&self) -> bool {
        self.tracker.should_stop()
    }

    /// Like [`Budget::should_stop`], but ignores the page cap so a fetched page is scanned to its end.
    pub fn should_stop_within_page(&self) -> bool {
        self.tracker.should_stop_within_page()
    }

    pub fn max_tokens(&self) -> usize {
        self.tracker.limits().max_tokens
    }
}

/// Detaches the trace from the backend when the call ends, on every path.
struct TraceGuard<'a> {
    backend: &'a dyn IndexBackend,
    attached: Option<Arc<SearchTrace>>,
}

impl Drop for TraceGuard<'_> {
    fn drop(&mut self) {
        if let Some(trace) = self.attached.take() {
            self.backend.detach_trace(&trace);
        }
    }
}

/// Everything one search call needs, with the capability descriptor read once.
pub(crate) struct SearchContext<'a> {
    pub backend: &'a dyn IndexBackend,
    pub field: String,
    pub capabilities: BackendCapabilities,
    pub trace: Arc<SearchTrace>,
    pub budget: Budget,
    pub limit: usize,
    pub page_size: usize,
    _guard: TraceGuard<'a>,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        backend: &'a dyn IndexBackend,
        field: String,
        limits: ResolvedLimits,
        limit: usize,
        page_size: usize,
    ) -> Self {
        let capabilities = backend.capabilities();
        let trace = Arc::new(SearchTrace::new());
        if capabilities.trace {
            backend.set_active_trace(Some(trace.clone()));
        }
        SearchContext {
            backend,
            field,
            capabilities,
            trace: trace.clone(),
            budget: Budget::new(limits, trace.clone()),
            limit,
            page_size,
            _guard: TraceGuard {
                backend,
                attached: capabilities.trace.then_some(trace),
            },
        }
    }
}
