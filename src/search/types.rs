//! Requests and responses of the search engine entry points.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::doc_id::DocId;
use crate::limits::SearchLimits;
use crate::trace::TraceSnapshot;

/// A document to index or remove.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    /// JSON object holding the identifier and the text.
    pub document: Value,
    /// Overrides the engine's primary field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_field: Option<String>,
    /// Overrides the engine's index field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_field: Option<String>,
}

pub type IndexRequest = DocumentRequest;
pub type RemoveRequest = DocumentRequest;

impl DocumentRequest {
    pub fn new(document: Value) -> Self {
        DocumentRequest {
            document,
            primary_field: None,
            index_field: None,
        }
    }

    pub fn with_primary_field<S: Into<String>>(mut self, field: S) -> Self {
        self.primary_field = Some(field.into());
        self
    }

    pub fn with_index_field<S: Into<String>>(mut self, field: S) -> Self {
        self.index_field = Some(field.into());
        self
    }
}

/// A lossy or exact search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_field: Option<String>,
    /// Maximum number of identifiers to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Cursor returned by the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Budget overrides for this call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<SearchLimits>,
}

impl SearchRequest {
    pub fn new<S: Into<String>>(query: S) -> Self {
        SearchRequest {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_index_field<S: Into<String>>(mut self, field: S) -> Self {
        self.index_field = Some(field.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Continue from `cursor`; `None` starts from the beginning.
    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// The cursor, treating a blank string as absent.
    pub fn effective_cursor(&self) -> Option<&str> {
        self.cursor
            .as_deref()
            .map(str::trim)
            .filter(|cursor| !cursor.is_empty())
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Matching identifiers, ascending.
    pub ids: Vec<DocId>,
    /// Present iff more results may follow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub trace: TraceSnapshot,
}

impl SearchResponse {
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }
}

/// Outcome of indexing or removing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResponse {
    pub id: DocId,
    /// Distinct lossy tokens written or removed.
    pub lossy_tokens: usize,
    /// Distinct exact tokens written or removed.
    pub exact_tokens: usize,
}
