//! Search orchestration.
//!
//! [`SearchEngine`] is the entry point for indexing, removal and both search
//! modes. It pairs a backend with an [`EngineConfig`]; every call builds a
//! fresh per-call context (capability descriptor, trace, limit tracker and
//! caches) that is discarded when the call returns.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use dualdex::backend::MemoryBackend;
//! use dualdex::search::{IndexRequest, SearchEngine, SearchRequest};
//! use serde_json::json;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let engine = SearchEngine::with_backend(Arc::new(MemoryBackend::new_default()));
//!     engine
//!         .index_document(IndexRequest::new(json!({"id": 1, "text": "hello world"})))
//!         .await
//!         .unwrap();
//!
//!     let response = engine
//!         .search_exact(SearchRequest::new("\"hello world\""))
//!         .await
//!         .unwrap();
//!     assert_eq!(response.ids.len(), 1);
//! });
//! ```

pub mod types;

mod context;
mod exact;
mod indexing;
mod lossy;

use std::sync::Arc;

use crate::backend::{BackendFactory, IndexBackend};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::registry::resolve_backend;

use self::context::SearchContext;

pub use self::types::{
    DocumentRequest, IndexRequest, IndexResponse, RemoveRequest, SearchRequest, SearchResponse,
};

/// A backend plus the defaults applied to requests.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    backend: Arc<dyn IndexBackend>,
    config: EngineConfig,
}

impl SearchEngine {
    /// Create an engine around `backend` after validating `config`.
    pub fn new(backend: Arc<dyn IndexBackend>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(SearchEngine { backend, config })
    }

    /// Create an engine with the default configuration.
    pub fn with_backend(backend: Arc<dyn IndexBackend>) -> Self {
        SearchEngine {
            backend,
            config: EngineConfig::default(),
        }
    }

    /// Build the backend described by `config.backend`.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let backend = BackendFactory::create(config.backend.clone());
        Self::new(backend, config)
    }

    /// Use `backend` if given, else the process-wide default backend.
    pub fn resolve(backend: Option<Arc<dyn IndexBackend>>, config: EngineConfig) -> Result<Self> {
        Self::new(resolve_backend(backend)?, config)
    }

    pub fn backend(&self) -> &Arc<dyn IndexBackend> {
        &self.backend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Write the lossy postings and exact positions of a document.
    pub async fn index_document(&self, request: IndexRequest) -> Result<IndexResponse> {
        indexing::index_document(self.backend.as_ref(), &self.config, &request).await
    }

    /// Remove the postings and positions the given document content created.
    pub async fn remove_document(&self, request: RemoveRequest) -> Result<IndexResponse> {
        indexing::remove_document(self.backend.as_ref(), &self.config, &request).await
    }

    /// Recall-oriented search over trigram and prefix postings.
    pub async fn search_lossy(&self, request: SearchRequest) -> Result<SearchResponse> {
        let mut ctx = self.context(&request);
        let (ids, cursor) =
            lossy::search_lossy(&mut ctx, &request.query, request.effective_cursor()).await?;
        Ok(SearchResponse {
            ids,
            cursor,
            trace: ctx.trace.snapshot(),
        })
    }

    /// Phrase search: lossy candidates verified against token positions.
    pub async fn search_exact(&self, request: SearchRequest) -> Result<SearchResponse> {
        let mut ctx = self.context(&request);
        let (ids, cursor) =
            exact::search_exact(&mut ctx, &request.query, request.effective_cursor()).await?;
        Ok(SearchResponse {
            ids,
            cursor,
            trace: ctx.trace.snapshot(),
        })
    }

    fn context(&self, request: &SearchRequest) -> SearchContext<'_> {
        let limits = match &request.limits {
            Some(requested) => self.config.limits.merged_with(requested),
            None => self.config.limits,
        };
        let field = request
            .index_field
            .clone()
            .unwrap_or_else(|| self.config.index_field.clone());
        SearchContext::new(
            self.backend.as_ref(),
            field,
            limits.resolve(),
            self.config.effective_limit(request.limit),
            self.config.postings_page_size.max(1),
        )
    }
}

/// [`SearchEngine::index_document`] against `backend` or the default backend.
pub async fn index_document(
    request: IndexRequest,
    backend: Option<Arc<dyn IndexBackend>>,
) -> Result<IndexResponse> {
    SearchEngine::resolve(backend, EngineConfig::default())?
        .index_document(request)
        .await
}

/// [`SearchEngine::remove_document`] against `backend` or the default backend.
pub async fn remove_document(
    request: RemoveRequest,
    backend: Option<Arc<dyn IndexBackend>>,
) -> Result<IndexResponse> {
    SearchEngine::resolve(backend, EngineConfig::default())?
        .remove_document(request)
        .await
}

/// [`SearchEngine::search_lossy`] against `backend` or the default backend.
pub async fn search_lossy(
    request: SearchRequest,
    backend: Option<Arc<dyn IndexBackend>>,
) -> Result<SearchResponse> {
    SearchEngine::resolve(backend, EngineConfig::default())?
        .search_lossy(request)
        .await
}

/// [`SearchEngine::search_exact`] against `backend` or the default backend.
pub async fn search_exact(
    request: SearchRequest,
    backend: Option<Arc<dyn IndexBackend>>,
) -> Result<SearchResponse> {
    SearchEngine::resolve(backend, EngineConfig::default())?
        .search_exact(request)
        .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::{MemoryBackend, MemoryBackendConfig};
    use crate::doc_id::DocId;
    use crate::error::DualdexError;
    use crate::limits::SearchLimits;

    async fn engine(config: MemoryBackendConfig, docs: &[(i64, &str)]) -> SearchEngine {
        let engine = SearchEngine::with_backend(Arc::new(MemoryBackend::new(config)));
        for (id, text) in docs {
            engine
                .index_document(IndexRequest::new(json!({"id": id, "text": text})))
                .await
                .unwrap();
        }
        engine
    }

    fn ids(values: &[i64]) -> Vec<DocId> {
        values.iter().map(|v| DocId::from(*v)).collect()
    }

    const CORPUS: &[(i64, &str)] = &[
        (1, "hello world"),
        (2, "hello there"),
        (3, "worldly matters"),
    ];

    #[tokio::test]
    async fn test_lossy_paging_on_every_backend_shape() {
        for config in [MemoryBackendConfig::default(), MemoryBackendConfig::minimal()] {
            let engine = engine(config, CORPUS).await;
            let first = engine
                .search_lossy(SearchRequest::new("hello").with_limit(1))
                .await
                .unwrap();
            assert_eq!(first.ids, ids(&[1]));
            assert!(first.cursor.is_some());

            let second = engine
                .search_lossy(SearchRequest::new("hello").with_limit(1).with_cursor(first.cursor))
                .await
                .unwrap();
            assert_eq!(second.ids, ids(&[2]));
            assert_eq!(second.cursor, None);
        }
    }

    #[tokio::test]
    async fn test_exact_phrase_on_every_backend_shape() {
        for config in [MemoryBackendConfig::default(), MemoryBackendConfig::minimal()] {
            let engine = engine(config, CORPUS).await;
            let response = engine
                .search_exact(SearchRequest::new("\"hello world\""))
                .await
                .unwrap();
            assert_eq!(response.ids, ids(&[1]));
            assert_eq!(response.cursor, None);

            let reversed = engine
                .search_exact(SearchRequest::new("world hello"))
                .await
                .unwrap();
            assert!(reversed.ids.is_empty());
        }
    }

    #[tokio::test]
    async fn test_short_words_use_prefix_tokens() {
        let engine = engine(MemoryBackendConfig::default(), &[(1, "go home"), (2, "gone")]).await;
        // "go*" is the prefix token of "go" only; "gone" indexes "gone*".
        let response = engine.search_lossy(SearchRequest::new("go")).await.unwrap();
        assert_eq!(response.ids, ids(&[1]));

        let exact = engine.search_exact(SearchRequest::new("go home")).await.unwrap();
        assert_eq!(exact.ids, ids(&[1]));
    }

    #[tokio::test]
    async fn test_prefix_and_trigram_groups_are_united() {
        // "at" matches by prefix, "matters" by trigrams.
        let engine = engine(MemoryBackendConfig::default(), CORPUS).await;
        let response = engine
            .search_lossy(SearchRequest::new("at matters"))
            .await
            .unwrap();
        assert_eq!(response.ids, ids(&[3]));
    }

    #[tokio::test]
    async fn test_empty_query() {
        let engine = engine(MemoryBackendConfig::default(), CORPUS).await;
        let response = engine.search_lossy(SearchRequest::new("  !! ")).await.unwrap();
        assert!(response.ids.is_empty());
        assert_eq!(response.cursor, None);
        let response = engine.search_exact(SearchRequest::new("")).await.unwrap();
        assert!(response.ids.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_cursor_kind_is_an_error() {
        let engine = engine(MemoryBackendConfig::default(), CORPUS).await;
        let lossy = engine
            .search_lossy(SearchRequest::new("hello").with_limit(1))
            .await
            .unwrap();
        let err = engine
            .search_exact(SearchRequest::new("hello").with_cursor(lossy.cursor))
            .await
            .unwrap_err();
        assert!(matches!(err, DualdexError::Cursor(_)));
    }

    #[tokio::test]
    async fn test_trace_is_reported_and_detached() {
        let engine = engine(MemoryBackendConfig::default(), CORPUS).await;
        let response = engine
            .search_lossy(SearchRequest::new("hello"))
            .await
            .unwrap();
        assert!(response.trace.postings_pages >= 1);
        assert!(response.trace.backend_queries >= 1);
        assert_eq!(response.trace.candidates_verified, 2);
    }

    #[tokio::test]
    async fn test_exact_budget_resumes_from_pending_buffer() {
        let docs: Vec<(i64, String)> = (1..=5).map(|id| (id, "red fox".to_string())).collect();
        let engine = SearchEngine::with_backend(Arc::new(MemoryBackend::new_default()));
        for (id, text) in &docs {
            engine
                .index_document(IndexRequest::new(json!({"id": id, "text": text})))
                .await
                .unwrap();
        }

        let limits = SearchLimits {
            max_candidates_verified: Some(2.0),
            ..Default::default()
        };
        let mut collected = Vec::new();
        let mut cursor = None;
        let mut calls = 0;
        loop {
            let response = engine
                .search_exact(
                    SearchRequest::new("red fox")
                        .with_limits(limits)
                        .with_cursor(cursor.take()),
                )
                .await
                .unwrap();
            assert!(response.ids.len() <= 2);
            collected.extend(response.ids);
            calls += 1;
            match response.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
            assert!(calls < 10);
        }
        assert_eq!(collected, ids(&[1, 2, 3, 4, 5]));
    }

    #[tokio::test]
    async fn test_exact_prefilter_skips_substring_matches() {
        let engine = engine(
            MemoryBackendConfig::default(),
            &[(1, "there"), (2, "other"), (3, "thereafter"), (4, "the end")],
        )
        .await;
        let response = engine.search_exact(SearchRequest::new("the")).await.unwrap();
        assert_eq!(response.ids, ids(&[4]));
        // Only the document holding the word reaches verification.
        assert_eq!(response.trace.candidates_verified, 1);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = EngineConfig {
            postings_page_size: 0,
            ..Default::default()
        };
        let backend: Arc<dyn IndexBackend> = Arc::new(MemoryBackend::new_default());
        assert!(SearchEngine::new(backend, config).is_err());
    }
}
