//! # Dualdex
//!
//! An embeddable full-text search engine over JSON documents with two
//! complementary modes.
//!
//! ## Features
//!
//! - Lossy search: trigram and prefix recall, cheap and approximate
//! - Exact search: phrase matching verified against stored positions
//! - Pluggable async storage backends with capability negotiation
//! - Stateless cursor pagination with per-call work budgets
//! - Per-call search traces

pub mod analysis;
pub mod backend;
pub mod cli;
pub mod config;
pub mod cursor;
pub mod doc_id;
pub mod error;
pub mod handler;
pub mod index;
pub mod limits;
pub mod membership;
pub mod planner;
pub mod positions;
pub mod registry;
pub mod search;
pub mod trace;

pub mod prelude {
    pub use crate::backend::{BackendCapabilities, IndexBackend, MemoryBackend};
    pub use crate::config::EngineConfig;
    pub use crate::doc_id::DocId;
    pub use crate::error::{DualdexError, Result};
    pub use crate::limits::SearchLimits;
    pub use crate::search::{
        IndexRequest, IndexResponse, RemoveRequest, SearchEngine, SearchRequest, SearchResponse,
    };
}

pub use crate::error::{DualdexError, Result};
pub use crate::registry::{clear_index_backend, index_backend, set_index_backend};
pub use crate::search::{index_document, remove_document, search_exact, search_lossy};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
