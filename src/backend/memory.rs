//! In-memory backend for testing and embedding.

use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::backend::{BackendCapabilities, DocTokenKey, IndexBackend, TokenSpace, TokenStats};
use crate::doc_id::DocId;
use crate::error::{DualdexError, Result};
use crate::index::{ExactIndex, LossyIndex, PageRequest, PostingsPage, posting_key};
use crate::trace::SearchTrace;

/// Which optional capabilities a [`MemoryBackend`] exposes.
///
/// Everything is on by default. Switching capabilities off is how the
/// fallback search paths are exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemoryBackendConfig {
    pub paged_postings: bool,
    pub doc_token_lookup: bool,
    pub batch_doc_token_lookup: bool,
    pub batch_positions: bool,
    pub trace: bool,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        MemoryBackendConfig {
            paged_postings: true,
            doc_token_lookup: true,
            batch_doc_token_lookup: true,
            batch_positions: true,
            trace: true,
        }
    }
}

impl MemoryBackendConfig {
    /// Only the mandatory backend surface.
    pub fn minimal() -> Self {
        MemoryBackendConfig {
            paged_postings: false,
            doc_token_lookup: false,
            batch_doc_token_lookup: false,
            batch_positions: false,
            trace: false,
        }
    }
}

/// Counts describing the stored state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryBackendStats {
    pub lossy_keys: usize,
    pub lossy_postings: usize,
    pub exact_keys: usize,
    pub exact_entries: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    lossy: LossyIndex,
    exact: ExactIndex,
    /// Last mutation version per lossy `(field, token)` key.
    versions: AHashMap<String, u64>,
    next_version: u64,
}

impl MemoryState {
    fn bump(&mut self, field: &str, token: &str) {
        self.next_version += 1;
        self.versions
            .insert(posting_key(field, token), self.next_version);
    }

    fn has_doc_token(&self, field: &str, space: TokenSpace, doc_id: &DocId, token: &str) -> bool {
        match space {
            TokenSpace::Lossy => self.lossy.contains(token, field, doc_id),
            TokenSpace::Exact => self.exact.get_positions(token, field, doc_id).is_some(),
        }
    }
}

/// A backend keeping both indexes in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    config: MemoryBackendConfig,
    state: RwLock<MemoryState>,
    active_trace: Mutex<Option<Arc<SearchTrace>>>,
}

impl MemoryBackend {
    pub fn new(config: MemoryBackendConfig) -> Self {
        MemoryBackend {
            config,
            state: RwLock::new(MemoryState::default()),
            active_trace: Mutex::new(None),
        }
    }

    /// A backend with every capability enabled.
    pub fn new_default() -> Self {
        Self::new(MemoryBackendConfig::default())
    }

    pub fn config(&self) -> &MemoryBackendConfig {
        &self.config
    }

    pub fn stats(&self) -> MemoryBackendStats {
        let state = self.state.read();
        MemoryBackendStats {
            lossy_keys: state.lossy.key_count(),
            lossy_postings: state.lossy.posting_count(),
            exact_keys: state.exact.key_count(),
            exact_entries: state.exact.entry_count(),
        }
    }

    /// Synchronous view of a postings list.
    pub fn lossy_postings(&self, field: &str, token: &str) -> Vec<DocId> {
        self.state.read().lossy.postings(token, field).to_vec()
    }

    /// Synchronous view of a position list.
    pub fn exact_positions(&self, field: &str, token: &str, doc_id: &DocId) -> Option<Vec<u32>> {
        self.state
            .read()
            .exact
            .get_positions(token, field, doc_id)
            .map(<[u32]>::to_vec)
    }

    /// Drop all stored postings and positions.
    pub fn clear(&self) {
        let mut state = self.state.write();
        let next_version = state.next_version;
        *state = MemoryState {
            next_version,
            ..MemoryState::default()
        };
    }

    fn on_trace(&self, record: impl FnOnce(&SearchTrace)) {
        if let Some(trace) = self.active_trace.lock().as_ref() {
            record(trace);
        }
    }

    fn require(&self, enabled: bool, capability: &str) -> Result<()> {
        if enabled {
            Ok(())
        } else {
            Err(DualdexError::unsupported(capability))
        }
    }
}

#[async_trait]
impl IndexBackend for MemoryBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            paged_postings: self.config.paged_postings,
            doc_token_lookup: self.config.doc_token_lookup,
            batch_doc_token_lookup: self.config.batch_doc_token_lookup,
            batch_positions: self.config.batch_positions,
            trace: self.config.trace,
        }
    }

    async fn load_lossy_postings(&self, field: &str, token: &str) -> Result<Vec<DocId>> {
        self.on_trace(SearchTrace::record_query);
        Ok(self.lossy_postings(field, token))
    }

    async fn load_exact_positions(
        &self,
        field: &str,
        token: &str,
        doc_id: &DocId,
    ) -> Result<Vec<u32>> {
        self.on_trace(|trace| trace.record_reads(1));
        Ok(self
            .exact_positions(field, token, doc_id)
            .unwrap_or_default())
    }

    async fn load_token_stats(&self, field: &str, token: &str) -> Result<Option<TokenStats>> {
        self.on_trace(|trace| trace.record_reads(1));
        let state = self.state.read();
        let df = state.lossy.document_frequency(token, field) as u64;
        if df == 0 {
            return Ok(None);
        }
        let version = state
            .versions
            .get(&posting_key(field, token))
            .copied()
            .unwrap_or_default();
        Ok(Some(TokenStats { df, version }))
    }

    async fn add_lossy_posting(&self, field: &str, token: &str, doc_id: &DocId) -> Result<()> {
        let mut state = self.state.write();
        if state.lossy.add_posting(token, field, doc_id.clone()) {
            state.bump(field, token);
        }
        Ok(())
    }

    async fn remove_lossy_posting(&self, field: &str, token: &str, doc_id: &DocId) -> Result<()> {
        let mut state = self.state.write();
        if state.lossy.remove_posting(token, field, doc_id) {
            state.bump(field, token);
        }
        Ok(())
    }

    async fn add_exact_positions(
        &self,
        field: &str,
        token: &str,
        doc_id: &DocId,
        positions: &[u32],
    ) -> Result<()> {
        self.state
            .write()
            .exact
            .add_positions(token, field, doc_id.clone(), positions.to_vec());
        Ok(())
    }

    async fn remove_exact_positions(
        &self,
        field: &str,
        token: &str,
        doc_id: &DocId,
    ) -> Result<()> {
        self.state
            .write()
            .exact
            .remove_positions(token, field, doc_id);
        Ok(())
    }

    async fn query_lossy_postings_page(
        &self,
        field: &str,
        token: &str,
        page: &PageRequest,
    ) -> Result<PostingsPage> {
        self.require(self.config.paged_postings, "query_lossy_postings_page")?;
        self.on_trace(SearchTrace::record_query);
        Ok(self.state.read().lossy.get_postings(token, field, page))
    }

    async fn has_doc_token(
        &self,
        field: &str,
        space: TokenSpace,
        doc_id: &DocId,
        token: &str,
    ) -> Result<bool> {
        self.require(self.config.doc_token_lookup, "has_doc_token")?;
        self.on_trace(|trace| trace.record_reads(1));
        Ok(self.state.read().has_doc_token(field, space, doc_id, token))
    }

    async fn batch_has_doc_tokens(
        &self,
        field: &str,
        space: TokenSpace,
        keys: &[DocTokenKey],
    ) -> Result<Vec<bool>> {
        self.require(self.config.batch_doc_token_lookup, "batch_has_doc_tokens")?;
        self.on_trace(|trace| trace.record_reads(keys.len()));
        let state = self.state.read();
        Ok(keys
            .iter()
            .map(|key| state.has_doc_token(field, space, &key.doc_id, &key.token))
            .collect())
    }

    async fn batch_load_exact_positions(
        &self,
        field: &str,
        keys: &[DocTokenKey],
    ) -> Result<Vec<Vec<u32>>> {
        self.require(self.config.batch_positions, "batch_load_exact_positions")?;
        self.on_trace(|trace| trace.record_reads(keys.len()));
        let state = self.state.read();
        Ok(keys
            .iter()
            .map(|key| {
                state
                    .exact
                    .get_positions(&key.token, field, &key.doc_id)
                    .map(<[u32]>::to_vec)
                    .unwrap_or_default()
            })
            .collect())
    }

    fn set_active_trace(&self, trace: Option<Arc<SearchTrace>>) {
        if self.config.trace {
            *self.active_trace.lock() = trace;
        }
    }

    fn detach_trace(&self, trace: &Arc<SearchTrace>) {
        let mut active = self.active_trace.lock();
        if active.as_ref().is_some_and(|current| Arc::ptr_eq(current, trace)) {
            *active = None;
        }
    }
}
