//! Per-call loader for exact token positions.

use std::slice;

use ahash::{AHashMap, AHashSet};
use futures::future::try_join_all;

use crate::backend::{BackendCapabilities, DocTokenKey, IndexBackend};
use crate::doc_id::DocId;
use crate::error::{DualdexError, Result};
use crate::index::phrase_matches;
use crate::trace::SearchTrace;

/// Loads and caches `(document, token) -> positions` for phrase checks.
pub struct PositionsLoader<'a> {
    backend: &'a dyn IndexBackend,
    field: &'a str,
    batch: bool,
    trace: &'a SearchTrace,
    cache: AHashMap<(DocId, String), Vec<u32>>,
}

impl<'a> PositionsLoader<'a> {
    pub fn new(
        backend: &'a dyn IndexBackend,
        field: &'a str,
        capabilities: &BackendCapabilities,
        trace: &'a SearchTrace,
    ) -> Self {
        PositionsLoader {
            backend,
            field,
            batch: capabilities.batch_positions,
            trace,
            cache: AHashMap::new(),
        }
    }

    /// Fetch positions for every uncached `doc_ids x tokens` pair at once.
    pub async fn preload(&mut self, doc_ids: &[DocId], tokens: &[String]) -> Result<()> {
        let mut seen = AHashSet::new();
        let keys: Vec<DocTokenKey> = doc_ids
            .iter()
            .flat_map(|doc_id| tokens.iter().map(move |token| (doc_id, token)))
            .filter(|(doc_id, token)| {
                !self.cache.contains_key(&((*doc_id).clone(), (*token).clone()))
            })
            .filter(|pair| seen.insert(*pair))
            .map(|(doc_id, token)| DocTokenKey::new(doc_id.clone(), token.as_str()))
            .collect();
        if keys.is_empty() {
            return Ok(());
        }

        let loaded = if self.batch {
            self.trace.record_batch(keys.len());
            self.backend
                .batch_load_exact_positions(self.field, &keys)
                .await?
        } else {
            try_join_all(keys.iter().map(|key| {
                self.backend
                    .load_exact_positions(self.field, &key.token, &key.doc_id)
            }))
            .await?
        };

        if loaded.len() != keys.len() {
            return Err(DualdexError::backend(format!(
                "position lookup returned {} lists for {} keys",
                loaded.len(),
                keys.len()
            )));
        }
        for (key, positions) in keys.into_iter().zip(loaded) {
            self.cache.insert((key.doc_id, key.token), positions);
        }
        Ok(())
    }

    /// Whether `tokens` occur contiguously in `doc_id`.
    pub async fn has_exact_phrase(&mut self, doc_id: &DocId, tokens: &[String]) -> Result<bool> {
        if tokens.is_empty() {
            return Ok(false);
        }
        self.preload(slice::from_ref(doc_id), tokens).await?;

        let mut lists: Vec<&[u32]> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let positions = self
                .cache
                .get(&(doc_id.clone(), token.clone()))
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            lists.push(positions);
        }
        Ok(phrase_matches(&lists))
    }
}
