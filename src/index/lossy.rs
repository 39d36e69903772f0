//! Lossy posting lists: `(field, token) -> ascending DocId list`.

use ahash::{AHashMap, AHashSet};

use crate::doc_id::{DocId, first_after};
use crate::index::{PageRequest, PostingsPage, posting_key};

/// Sorted, duplicate-free posting lists keyed by `field \0 token`.
///
/// Insertions and deletions splice at the binary-search position, so a list
/// is never re-sorted.
#[derive(Debug, Clone, Default)]
pub struct LossyIndex {
    postings: AHashMap<String, Vec<DocId>>,
}

impl LossyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `doc_id` to the postings of `(field, token)`.
    ///
    /// Returns `false` if it was already present.
    pub fn add_posting(&mut self, token: &str, field: &str, doc_id: DocId) -> bool {
        let list = self.postings.entry(posting_key(field, token)).or_default();
        match list.binary_search(&doc_id) {
            Ok(_) => false,
            Err(pos) => {
                list.insert(pos, doc_id);
                true
            }
        }
    }

    /// Remove `doc_id` from the postings of `(field, token)`.
    ///
    /// An emptied list drops its key. Returns `false` if nothing was removed.
    pub fn remove_posting(&mut self, token: &str, field: &str, doc_id: &DocId) -> bool {
        let key = posting_key(field, token);
        let Some(list) = self.postings.get_mut(&key) else {
            return false;
        };
        let removed = match list.binary_search(doc_id) {
            Ok(pos) => {
                list.remove(pos);
                true
            }
            Err(_) => false,
        };
        if list.is_empty() {
            self.postings.remove(&key);
        }
        removed
    }

    /// Add `doc_id` under every distinct token.
    ///
    /// Returns the number of postings that were newly inserted.
    pub fn add_document(&mut self, doc_id: &DocId, field: &str, tokens: &[String]) -> usize {
        let mut seen = AHashSet::new();
        tokens
            .iter()
            .filter(|token| seen.insert(token.as_str()))
            .filter(|token| self.add_posting(token, field, doc_id.clone()))
            .count()
    }

    /// Read one exclusive-start page of `(field, token)`.
    ///
    /// A zero limit is read as one so a non-empty remainder always yields a cursor.
    pub fn get_postings(&self, token: &str, field: &str, page: &PageRequest) -> PostingsPage {
        let list = self.postings(token, field);
        let start = first_after(list, page.last_doc_id.as_ref());
        let end = start.saturating_add(page.limit.max(1)).min(list.len());
        let doc_ids = list[start..end].to_vec();

        let next_cursor = if end < list.len() {
            doc_ids.last().cloned()
        } else {
            None
        };

        PostingsPage {
            doc_ids,
            next_cursor,
        }
    }

    /// The complete postings of `(field, token)`.
    pub fn postings(&self, token: &str, field: &str) -> &[DocId] {
        self.postings
            .get(&posting_key(field, token))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, token: &str, field: &str, doc_id: &DocId) -> bool {
        self.postings(token, field).binary_search(doc_id).is_ok()
    }

    /// Number of documents listed under `(field, token)`.
    pub fn document_frequency(&self, token: &str, field: &str) -> usize {
        self.postings(token, field).len()
    }

    /// Number of `(field, token)` keys.
    pub fn key_count(&self) -> usize {
        self.postings.len()
    }

    /// Total number of postings over all keys.
    pub fn posting_count(&self) -> usize {
        self.postings.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[i64]) -> Vec<DocId> {
        values.iter().map(|v| DocId::Int(*v)).collect()
    }

    #[test]
    fn test_insert_keeps_order_and_uniqueness() {
        let mut index = LossyIndex::new();
        for id in [5, 1, 3, 1, 9, 3] {
            index.add_posting("hel", "text", DocId::from(id));
        }
        assert_eq!(index.postings("hel", "text"), ids(&[1, 3, 5, 9]).as_slice());
        assert!(!index.add_posting("hel", "text", DocId::from(5)));
    }

    #[test]
    fn test_remove_drops_empty_key() {
        let mut index = LossyIndex::new();
        index.add_posting("hel", "text", DocId::from(1));
        index.add_posting("hel", "text", DocId::from(2));
        assert!(index.remove_posting("hel", "text", &DocId::from(1)));
        assert!(!index.remove_posting("hel", "text", &DocId::from(1)));
        assert_eq!(index.key_count(), 1);
        assert!(index.remove_posting("hel", "text", &DocId::from(2)));
        assert_eq!(index.key_count(), 0);
        assert!(!index.remove_posting("zzz", "text", &DocId::from(2)));
    }

    #[test]
    fn test_fields_are_separate() {
        let mut index = LossyIndex::new();
        index.add_posting("hel", "title", DocId::from(1));
        index.add_posting("hel", "text", DocId::from(2));
        assert!(index.contains("hel", "title", &DocId::from(1)));
        assert!(!index.contains("hel", "title", &DocId::from(2)));
    }

    #[test]
    fn test_add_document_dedupes() {
        let mut index = LossyIndex::new();
        let tokens = vec!["aaa".to_string(), "aaa".to_string(), "aaaa*".to_string()];
        assert_eq!(index.add_document(&DocId::from(4), "text", &tokens), 2);
        assert_eq!(index.add_document(&DocId::from(4), "text", &tokens), 0);
        assert_eq!(index.document_frequency("aaa", "text"), 1);
    }

    #[test]
    fn test_paging_exclusive_start() {
        let mut index = LossyIndex::new();
        for id in 1..=5 {
            index.add_posting("tok", "f", DocId::from(id));
        }

        let page = index.get_postings("tok", "f", &PageRequest::new(2));
        assert_eq!(page.doc_ids, ids(&[1, 2]));
        assert_eq!(page.next_cursor, Some(DocId::from(2)));

        let page = index.get_postings("tok", "f", &PageRequest::new(2).after(page.next_cursor));
        assert_eq!(page.doc_ids, ids(&[3, 4]));
        assert_eq!(page.next_cursor, Some(DocId::from(4)));

        let page = index.get_postings("tok", "f", &PageRequest::new(2).after(page.next_cursor));
        assert_eq!(page.doc_ids, ids(&[5]));
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn test_exact_fit_page_has_no_cursor() {
        let mut index = LossyIndex::new();
        for id in 1..=4 {
            index.add_posting("tok", "f", DocId::from(id));
        }
        let page = index.get_postings("tok", "f", &PageRequest::new(4));
        assert_eq!(page.doc_ids.len(), 4);
        assert_eq!(page.next_cursor, None);

        let missing = index.get_postings("nope", "f", &PageRequest::new(4));
        assert!(missing.doc_ids.is_empty());
        assert_eq!(missing.next_cursor, None);
    }

    #[test]
    fn test_zero_limit_still_advances() {
        let mut index = LossyIndex::new();
        for id in 1..=3 {
            index.add_posting("tok", "f", DocId::from(id));
        }
        let page = index.get_postings("tok", "f", &PageRequest::new(0));
        assert_eq!(page.doc_ids, ids(&[1]));
        assert_eq!(page.next_cursor, Some(DocId::from(1)));

        let page = index.get_postings("tok", "f", &PageRequest::new(0).after(Some(DocId::from(2))));
        assert_eq!(page.doc_ids, ids(&[3]));
        assert_eq!(page.next_cursor, None);
    }
}
