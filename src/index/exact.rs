//! Exact position lists: `(field, token, DocId) -> token offsets`.

use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::doc_id::{DocId, first_after};
use crate::index::{PageRequest, VerifiedPage, phrase_matches, posting_key};

/// Token offsets per document, keyed by `field \0 token`.
#[derive(Debug, Clone, Default)]
pub struct ExactIndex {
    positions: AHashMap<String, BTreeMap<DocId, Vec<u32>>>,
}

impl ExactIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the positions of `token` in `doc_id`, replacing any previous list.
    ///
    /// An empty `positions` list removes the entry.
    pub fn add_positions(&mut self, token: &str, field: &str, doc_id: DocId, positions: Vec<u32>) {
        if positions.is_empty() {
            self.remove_positions(token, field, &doc_id);
            return;
        }
        self.positions
            .entry(posting_key(field, token))
            .or_default()
            .insert(doc_id, positions);
    }

    /// Drop the positions of `token` in `doc_id`. Returns whether anything was removed.
    pub fn remove_positions(&mut self, token: &str, field: &str, doc_id: &DocId) -> bool {
        let key = posting_key(field, token);
        let Some(docs) = self.positions.get_mut(&key) else {
            return false;
        };
        let removed = docs.remove(doc_id).is_some();
        if docs.is_empty() {
            self.positions.remove(&key);
        }
        removed
    }

    /// Index a token sequence; each token's positions are its ordinals in `tokens`.
    ///
    /// Returns the number of distinct tokens stored.
    pub fn add_document(&mut self, doc_id: &DocId, field: &str, tokens: &[String]) -> usize {
        let grouped = group_positions(tokens);
        let count = grouped.len();
        for (token, positions) in grouped {
            self.add_positions(token, field, doc_id.clone(), positions);
        }
        count
    }

    pub fn get_positions(&self, token: &str, field: &str, doc_id: &DocId) -> Option<&[u32]> {
        self.positions
            .get(&posting_key(field, token))
            .and_then(|docs| docs.get(doc_id))
            .map(Vec::as_slice)
    }

    /// Whether `phrase_tokens` occur contiguously in `doc_id`.
    pub fn has_phrase(&self, doc_id: &DocId, field: &str, phrase_tokens: &[String]) -> bool {
        let mut lists = Vec::with_capacity(phrase_tokens.len());
        for token in phrase_tokens {
            match self.get_positions(token, field, doc_id) {
                Some(positions) => lists.push(positions),
                None => return false,
            }
        }
        phrase_matches(&lists)
    }

    /// Verify ascending `candidates` after `page.last_doc_id` until `page.limit` match.
    pub fn verify_candidates(
        &self,
        phrase_tokens: &[String],
        field: &str,
        candidates: &[DocId],
        page: &PageRequest,
    ) -> VerifiedPage {
        let start = first_after(candidates, page.last_doc_id.as_ref());
        let mut matches = Vec::new();

        if page.limit == 0 {
            return VerifiedPage {
                matches,
                next_cursor: page.last_doc_id.clone(),
            };
        }

        for (i, doc_id) in candidates.iter().enumerate().skip(start) {
            if self.has_phrase(doc_id, field, phrase_tokens) {
                matches.push(doc_id.clone());
            }
            if matches.len() >= page.limit {
                let next_cursor = (i + 1 < candidates.len()).then(|| doc_id.clone());
                return VerifiedPage {
                    matches,
                    next_cursor,
                };
            }
        }

        VerifiedPage {
            matches,
            next_cursor: None,
        }
    }

    /// Distinct documents holding `(field, token)`, ascending.
    pub fn documents(&self, token: &str, field: &str) -> Vec<DocId> {
        self.positions
            .get(&posting_key(field, token))
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of `(field, token)` keys.
    pub fn key_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of `(field, token, document)` entries.
    pub fn entry_count(&self) -> usize {
        self.positions.values().map(BTreeMap::len).sum()
    }
}

/// Group a token sequence into `(token, ordinals)` pairs in first-seen order.
pub fn group_positions(tokens: &[String]) -> Vec<(&str, Vec<u32>)> {
    let mut index: AHashMap<&str, usize> = AHashMap::new();
    let mut grouped: Vec<(&str, Vec<u32>)> = Vec::new();
    for (position, token) in tokens.iter().enumerate() {
        let slot = *index.entry(token.as_str()).or_insert_with(|| {
            grouped.push((token.as_str(), Vec::new()));
            grouped.len() - 1
        });
        grouped[slot].1.push(position as u32);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenize;

    fn phrase(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn indexed(docs: &[(i64, &str)]) -> ExactIndex {
        let mut index = ExactIndex::new();
        for (id, text) in docs {
            index.add_document(&DocId::from(*id), "text", &tokenize(text).tokens);
        }
        index
    }

    #[test]
    fn test_has_phrase() {
        let index = indexed(&[(1, "hello world")]);
        let doc = DocId::from(1);
        assert!(index.has_phrase(&doc, "text", &phrase(&["hello", "world"])));
        assert!(!index.has_phrase(&doc, "text", &phrase(&["world", "hello"])));
        assert!(index.has_phrase(&doc, "text", &phrase(&["hello"])));
        assert!(!index.has_phrase(&doc, "text", &phrase(&["goodbye"])));
        assert!(!index.has_phrase(&doc, "text", &[]));
    }

    #[test]
    fn test_group_positions() {
        let tokens = tokenize("a b a c a").tokens;
        let grouped = group_positions(&tokens);
        assert_eq!(
            grouped,
            vec![("a", vec![0, 2, 4]), ("b", vec![1]), ("c", vec![3])]
        );
    }

    #[test]
    fn test_add_positions_overwrites_and_remove() {
        let mut index = ExactIndex::new();
        let doc = DocId::from(1);
        index.add_positions("x", "f", doc.clone(), vec![0, 3]);
        index.add_positions("x", "f", doc.clone(), vec![0, 3]);
        assert_eq!(index.get_positions("x", "f", &doc), Some(&[0u32, 3][..]));

        assert!(index.remove_positions("x", "f", &doc));
        assert!(!index.remove_positions("x", "f", &doc));
        assert_eq!(index.get_positions("x", "f", &doc), None);
        assert!(index.documents("x", "f").is_empty());
    }

    #[test]
    fn test_verify_candidates_paging() {
        let index = indexed(&[
            (1, "hello world"),
            (2, "world hello"),
            (3, "say hello world"),
            (4, "hello world again"),
        ]);
        let candidates: Vec<DocId> = (1..=4).map(DocId::from).collect();
        let words = phrase(&["hello", "world"]);

        let first = index.verify_candidates(&words, "text", &candidates, &PageRequest::new(2));
        assert_eq!(first.matches, vec![DocId::from(1), DocId::from(3)]);
        assert_eq!(first.next_cursor, Some(DocId::from(3)));

        let second = index.verify_candidates(
            &words,
            "text",
            &candidates,
            &PageRequest::new(2).after(first.next_cursor),
        );
        assert_eq!(second.matches, vec![DocId::from(4)]);
        assert_eq!(second.next_cursor, None);
    }

    #[test]
    fn test_verify_last_candidate_match_has_no_cursor() {
        let index = indexed(&[(1, "hello world"), (2, "hello world")]);
        let candidates = vec![DocId::from(1), DocId::from(2)];
        let page = index.verify_candidates(
            &phrase(&["hello", "world"]),
            "text",
            &candidates,
            &PageRequest::new(2),
        );
        assert_eq!(page.matches.len(), 2);
        assert_eq!(page.next_cursor, None);
    }
}
