//! Document-token membership with per-call caching.

use std::slice;

use ahash::{AHashMap, AHashSet};
use futures::future::try_join_all;

use crate::backend::{BackendCapabilities, DocTokenKey, IndexBackend, MembershipMode, TokenSpace};
use crate::doc_id::DocId;
use crate::error::{DualdexError, Result};
use crate::trace::SearchTrace;

/// Answers "does document D contain token T in this field".
///
/// Lookups are resolved against the backend in rounds: every [`ensure`]
/// collects the uncached `(document, token)` pairs and resolves them with one
/// batched call, or with concurrent single lookups when the backend has no
/// batch method. Backends without any membership lookup make every answer
/// `true`, so lossy candidates pass through unfiltered.
///
/// The cache lives for one search call.
///
/// [`ensure`]: DocTokenOracle::ensure
pub struct DocTokenOracle<'a> {
    backend: &'a dyn IndexBackend,
    field: &'a str,
    space: TokenSpace,
    mode: MembershipMode,
    trace: &'a SearchTrace,
    cache: AHashMap<String, bool>,
}

impl<'a> DocTokenOracle<'a> {
    pub fn new(
        backend: &'a dyn IndexBackend,
        field: &'a str,
        space: TokenSpace,
        capabilities: &BackendCapabilities,
        trace: &'a SearchTrace,
    ) -> Self {
        DocTokenOracle {
            backend,
            field,
            space,
            mode: capabilities.membership(),
            trace,
            cache: AHashMap::new(),
        }
    }

    /// Whether membership answers come from the backend.
    pub fn is_available(&self) -> bool {
        self.mode != MembershipMode::Unavailable
    }

    pub fn mode(&self) -> MembershipMode {
        self.mode
    }

    fn key(&self, doc_id: &DocId, token: &str) -> String {
        format!("{}#{}#{}", self.field, doc_id.cache_key(), token)
    }

    /// Resolve every uncached `doc_ids x tokens` pair.
    pub async fn ensure(&mut self, doc_ids: &[DocId], tokens: &[String]) -> Result<()> {
        if self.mode == MembershipMode::Unavailable || doc_ids.is_empty() || tokens.is_empty() {
            return Ok(());
        }

        let mut seen = AHashSet::new();
        let mut missing: Vec<(String, DocTokenKey)> = Vec::new();
        for doc_id in doc_ids {
            for token in tokens {
                let key = self.key(doc_id, token);
                if self.cache.contains_key(&key) || !seen.insert(key.clone()) {
                    continue;
                }
                missing.push((key, DocTokenKey::new(doc_id.clone(), token.as_str())));
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        let lookups: Vec<DocTokenKey> = missing.iter().map(|(_, key)| key.clone()).collect();
        let answers = match self.mode {
            MembershipMode::Batch => {
                self.trace.record_batch(lookups.len());
                self.backend
                    .batch_has_doc_tokens(self.field, self.space, &lookups)
                    .await?
            }
            MembershipMode::Single => {
                try_join_all(lookups.iter().map(|key| {
                    self.backend
                        .has_doc_token(self.field, self.space, &key.doc_id, &key.token)
                }))
                .await?
            }
            MembershipMode::Unavailable => return Ok(()),
        };

        if answers.len() != missing.len() {
            return Err(DualdexError::backend(format!(
                "membership lookup returned {} answers for {} keys",
                answers.len(),
                missing.len()
            )));
        }
        for ((key, _), present) in missing.into_iter().zip(answers) {
            self.cache.insert(key, present);
        }
        Ok(())
    }

    /// Cached answer for a pair; unresolved pairs count as absent.
    fn cached(&self, doc_id: &DocId, token: &str) -> bool {
        if self.mode == MembershipMode::Unavailable {
            return true;
        }
        self.cache
            .get(&self.key(doc_id, token))
            .copied()
            .unwrap_or(false)
    }

    pub async fn has(&mut self, doc_id: &DocId, token: &str) -> Result<bool> {
        let tokens = [token.to_string()];
        self.ensure(slice::from_ref(doc_id), &tokens).await?;
        Ok(self.cached(doc_id, token))
    }

    /// Whether `doc_id` contains every token.
    pub async fn has_all(&mut self, doc_id: &DocId, tokens: &[String]) -> Result<bool> {
        self.ensure(slice::from_ref(doc_id), tokens).await?;
        Ok(tokens.iter().all(|token| self.cached(doc_id, token)))
    }

    /// The documents of `doc_ids` that contain all `tokens`, in input order.
    pub async fn filter_docs_by_tokens(
        &mut self,
        doc_ids: &[DocId],
        tokens: &[String],
    ) -> Result<Vec<DocId>> {
        self.ensure(doc_ids, tokens).await?;
        Ok(doc_ids
            .iter()
            .filter(|doc_id| tokens.iter().all(|token| self.cached(doc_id, token)))
            .cloned()
            .collect())
    }

    /// Number of cached answers.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
