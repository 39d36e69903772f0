//! Index backend abstraction.
//!
//! The search core never touches storage directly. It talks to an
//! [`IndexBackend`], which every storage flavour (in-memory, key-value,
//! wide-column) implements.
//!
//! # Capabilities
//!
//! The mandatory surface reads and writes postings, positions and token
//! statistics. Anything beyond that is optional and announced up front through
//! [`IndexBackend::capabilities`]:
//!
//! | Capability | Methods | Enables |
//! |------------|---------|---------|
//! | `paged_postings` | `query_lossy_postings_page` | paged lossy/exact search |
//! | `doc_token_lookup` | `has_doc_token` | membership prefiltering |
//! | `batch_doc_token_lookup` | `batch_has_doc_tokens` | batched membership |
//! | `batch_positions` | `batch_load_exact_positions` | batched position preload |
//! | `trace` | `set_active_trace` | backend-side metrics attribution |
//!
//! Optional methods have default implementations that fail with
//! [`DualdexError::unsupported`]; the orchestrator only calls them when the
//! descriptor says they exist.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::doc_id::DocId;
use crate::error::{DualdexError, Result};
use crate::index::{PageRequest, PostingsPage};
use crate::trace::SearchTrace;

pub mod memory;

pub use memory::{MemoryBackend, MemoryBackendConfig};

/// Document frequency and change marker of a `(field, token)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStats {
    /// Number of documents listed under the token.
    pub df: u64,
    /// Opaque, monotonically increasing version of the postings.
    pub version: u64,
}

/// A `(document, token)` lookup key for batched calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocTokenKey {
    pub doc_id: DocId,
    pub token: String,
}

impl DocTokenKey {
    pub fn new(doc_id: DocId, token: impl Into<String>) -> Self {
        DocTokenKey {
            doc_id,
            token: token.into(),
        }
    }
}

/// Which index a membership question is about.
///
/// Lossy tokens (3-grams, wildcard prefixes) and exact tokens (whole words)
/// share one string space: `"the"` is both a gram of `"there"` and a word of
/// its own. Lookups name the index so the two are never conflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSpace {
    /// Tokens of the lossy postings.
    Lossy,
    /// Whole words with stored positions.
    Exact,
}

/// Optional capabilities a backend provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendCapabilities {
    pub paged_postings: bool,
    pub doc_token_lookup: bool,
    pub batch_doc_token_lookup: bool,
    pub batch_positions: bool,
    pub trace: bool,
}

impl BackendCapabilities {
    /// Only the mandatory surface.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        BackendCapabilities {
            paged_postings: true,
            doc_token_lookup: true,
            batch_doc_token_lookup: true,
            batch_positions: true,
            trace: true,
        }
    }

    /// How document-token membership can be answered.
    pub fn membership(&self) -> MembershipMode {
        if self.batch_doc_token_lookup {
            MembershipMode::Batch
        } else if self.doc_token_lookup {
            MembershipMode::Single
        } else {
            MembershipMode::Unavailable
        }
    }
}

/// Resolution strategy for membership lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipMode {
    /// No lookup exists; every membership question is answered `true`.
    Unavailable,
    /// One backend call per `(document, token)`.
    Single,
    /// One backend call per resolution round.
    Batch,
}

/// The storage contract consumed by the search core.
///
/// Readers must be side-effect free. Writers must be idempotent under retry:
/// adding an existing posting, or re-adding identical positions, leaves the
/// state unchanged.
#[async_trait]
pub trait IndexBackend: Send + Sync + Debug {
    /// Optional capabilities of this backend.
    fn capabilities(&self) -> BackendCapabilities;

    /// Complete, ascending postings of `(field, token)`.
    async fn load_lossy_postings(&self, field: &str, token: &str) -> Result<Vec<DocId>>;

    /// Positions of `token` in `doc_id`; empty when the token is absent.
    async fn load_exact_positions(
        &self,
        field: &str,
        token: &str,
        doc_id: &DocId,
    ) -> Result<Vec<u32>>;

    /// Statistics of the lossy `(field, token)` postings, if any exist.
    async fn load_token_stats(&self, field: &str, token: &str) -> Result<Option<TokenStats>>;

    async fn add_lossy_posting(&self, field: &str, token: &str, doc_id: &DocId) -> Result<()>;

    async fn remove_lossy_posting(&self, field: &str, token: &str, doc_id: &DocId) -> Result<()>;

    /// Store the positions of `token` in `doc_id`, replacing earlier ones.
    async fn add_exact_positions(
        &self,
        field: &str,
        token: &str,
        doc_id: &DocId,
        positions: &[u32],
    ) -> Result<()>;

    async fn remove_exact_positions(&self, field: &str, token: &str, doc_id: &DocId)
    -> Result<()>;

    /// One exclusive-start page of `(field, token)` postings.
    async fn query_lossy_postings_page(
        &self,
        _field: &str,
        _token: &str,
        _page: &PageRequest,
    ) -> Result<PostingsPage> {
        Err(DualdexError::unsupported("query_lossy_postings_page"))
    }

    /// Whether `doc_id` contains `token` of the given space in `field`.
    async fn has_doc_token(
        &self,
        _field: &str,
        _space: TokenSpace,
        _doc_id: &DocId,
        _token: &str,
    ) -> Result<bool> {
        Err(DualdexError::unsupported("has_doc_token"))
    }

    /// Membership of every key, in key order.
    async fn batch_has_doc_tokens(
        &self,
        _field: &str,
        _space: TokenSpace,
        _keys: &[DocTokenKey],
    ) -> Result<Vec<bool>> {
        Err(DualdexError::unsupported("batch_has_doc_tokens"))
    }

    /// Positions for every key, in key order.
    async fn batch_load_exact_positions(
        &self,
        _field: &str,
        _keys: &[DocTokenKey],
    ) -> Result<Vec<Vec<u32>>> {
        Err(DualdexError::unsupported("batch_load_exact_positions"))
    }

    /// Attribute subsequent backend work to `trace` (or stop with `None`).
    ///
    /// A backend holds a single active trace. When searches overlap on one
    /// backend, backend-side counters go to the search that attached last;
    /// the engine-side counters of each trace stay exact.
    fn set_active_trace(&self, _trace: Option<Arc<SearchTrace>>) {}

    /// Stop attributing work to `trace`, leaving any newer trace in place.
    fn detach_trace(&self, _trace: &Arc<SearchTrace>) {
        self.set_active_trace(None);
    }
}

/// Storage backends bundled with the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    Memory(MemoryBackendConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Memory(MemoryBackendConfig::default())
    }
}

/// Builds backends from a [`BackendConfig`].
pub struct BackendFactory;

impl BackendFactory {
    pub fn create(config: BackendConfig) -> Arc<dyn IndexBackend> {
        match config {
            BackendConfig::Memory(memory) => Arc::new(MemoryBackend::new(memory)),
        }
    }
}
