//! In-memory posting structures.
//!
//! - [`lossy::LossyIndex`]: `(field, token) -> sorted DocId list`
//! - [`exact::ExactIndex`]: `(field, token, DocId) -> token positions`
//!
//! Both are plain data structures without I/O. The bundled
//! [`MemoryBackend`](crate::backend::memory::MemoryBackend) wraps them behind
//! the async backend contract.

use serde::{Deserialize, Serialize};

use crate::doc_id::DocId;

pub mod exact;
pub mod lossy;

pub use exact::ExactIndex;
pub use lossy::LossyIndex;

/// Separator between the parts of a storage key.
pub const KEY_SEPARATOR: char = '\0';

/// Storage key of a `(field, token)` pair.
pub fn posting_key(field: &str, token: &str) -> String {
    let mut key = String::with_capacity(field.len() + token.len() + 1);
    key.push_str(field);
    key.push(KEY_SEPARATOR);
    key.push_str(token);
    key
}

/// Exclusive-start page request over an ascending identifier list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of items to return.
    pub limit: usize,
    /// Only items strictly greater than this identifier are returned.
    pub last_doc_id: Option<DocId>,
}

impl PageRequest {
    pub fn new(limit: usize) -> Self {
        PageRequest {
            limit,
            last_doc_id: None,
        }
    }

    pub fn after(mut self, last_doc_id: Option<DocId>) -> Self {
        self.last_doc_id = last_doc_id;
        self
    }
}

/// One page of a postings list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingsPage {
    pub doc_ids: Vec<DocId>,
    /// Last identifier of this page, present only when more items follow.
    pub next_cursor: Option<DocId>,
}

/// Result of verifying a slice of candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedPage {
    pub matches: Vec<DocId>,
    /// Last *processed* candidate, present only when candidates remain.
    pub next_cursor: Option<DocId>,
}

/// Whether the position lists describe a contiguous phrase.
///
/// `lists[i]` holds the positions of the i-th phrase token. The phrase
/// matches iff some start `s` of the first token has `s + i` in every
/// following list.
pub fn phrase_matches(lists: &[&[u32]]) -> bool {
    let Some((first, rest)) = lists.split_first() else {
        return false;
    };
    if rest.is_empty() {
        return !first.is_empty();
    }

    first.iter().any(|&start| {
        rest.iter().enumerate().all(|(i, positions)| {
            let wanted = start as u64 + i as u64 + 1;
            positions.iter().any(|&p| p as u64 == wanted)
        })
    })
}
