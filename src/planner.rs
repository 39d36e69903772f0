//! Primary-token selection.
//!
//! A paged search scans the postings of a single *primary* token and checks
//! every other query token per candidate. The cheapest primary is the token
//! with the smallest document frequency. Once chosen, the plan travels inside
//! the cursor so every later page keeps scanning the same list, even if
//! frequencies drift in between.

use ahash::{AHashMap, AHashSet};
use futures::future::try_join_all;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::backend::{IndexBackend, TokenStats};
use crate::error::Result;

/// Order in which the primary postings are scanned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Sorting {
    /// Ascending by [`DocId`](crate::doc_id::DocId).
    #[default]
    DocIdAsc,
}

impl Sorting {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sorting::DocIdAsc => "docIdAsc",
        }
    }

    pub fn parse(value: &str) -> Option<Sorting> {
        match value {
            "docIdAsc" => Some(Sorting::DocIdAsc),
            _ => None,
        }
    }
}

/// The planner's decision, persisted in cursors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryPlan {
    pub primary_token: String,
    /// Version of the primary token's stats when it was chosen.
    pub stats_version: Option<u64>,
    pub sorting: Sorting,
}

impl QueryPlan {
    pub fn new(primary_token: impl Into<String>) -> Self {
        QueryPlan {
            primary_token: primary_token.into(),
            stats_version: None,
            sorting: Sorting::default(),
        }
    }

    pub fn with_stats_version(mut self, version: Option<u64>) -> Self {
        self.stats_version = version;
        self
    }
}

/// Per-call cache of [`TokenStats`] lookups.
#[derive(Debug, Default)]
pub struct TokenStatsCache {
    entries: AHashMap<String, Option<TokenStats>>,
}

impl TokenStatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stats for every token, fetching the missing ones concurrently.
    pub async fn load(
        &mut self,
        backend: &dyn IndexBackend,
        field: &str,
        tokens: &[String],
    ) -> Result<Vec<Option<TokenStats>>> {
        let mut seen = AHashSet::new();
        let missing: Vec<&String> = tokens
            .iter()
            .filter(|token| !self.entries.contains_key(token.as_str()))
            .filter(|token| seen.insert(token.as_str()))
            .collect();

        if !missing.is_empty() {
            let fetched = try_join_all(
                missing
                    .iter()
                    .map(|token| backend.load_token_stats(field, token)),
            )
            .await?;
            for (token, stats) in missing.into_iter().zip(fetched) {
                self.entries.insert(token.clone(), stats);
            }
        }

        Ok(tokens
            .iter()
            .map(|token| self.entries.get(token).copied().flatten())
            .collect())
    }
}

/// Choose the primary token for `tokens`.
///
/// An `existing` plan whose primary token still belongs to the query is
/// reused unchanged. Otherwise the token with the smallest `df` wins; ties
/// keep the first one, and without any stats the first token is chosen.
/// Returns `None` only for an empty token list.
pub async fn select_primary_token(
    backend: &dyn IndexBackend,
    field: &str,
    tokens: &[String],
    existing: Option<&QueryPlan>,
    cache: &mut TokenStatsCache,
) -> Result<Option<QueryPlan>> {
    if let Some(plan) = existing {
        if tokens.iter().any(|token| *token == plan.primary_token) {
            return Ok(Some(plan.clone()));
        }
    }
    let Some(first) = tokens.first() else {
        return Ok(None);
    };

    let stats = cache.load(backend, field, tokens).await?;
    let mut best: Option<(&String, TokenStats)> = None;
    for (token, stats) in tokens.iter().zip(stats) {
        let Some(stats) = stats else {
            continue;
        };
        match best {
            Some((_, current)) if current.df <= stats.df => {}
            _ => best = Some((token, stats)),
        }
    }

    let plan = match best {
        Some((token, stats)) => QueryPlan::new(token.clone()).with_stats_version(Some(stats.version)),
        None => QueryPlan::new(first.clone()),
    };
    debug!(
        "planner chose primary token {:?} (stats version {:?}) among {} tokens",
        plan.primary_token,
        plan.stats_version,
        tokens.len()
    );
    Ok(Some(plan))
}
