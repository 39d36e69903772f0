//! Lossy (trigram/prefix) search.

use futures::future::try_join_all;
use log::debug;

use crate::analysis::{LossyQuery, tokenize_lossy_query};
use crate::backend::{MembershipMode, TokenSpace};
use crate::cursor::{LossyCursorState, decode_lossy_cursor, encode_lossy_cursor};
use crate::doc_id::{DocId, first_after, intersect_sorted, union_sorted};
use crate::error::Result;
use crate::index::PageRequest;
use crate::membership::DocTokenOracle;
use crate::planner::{TokenStatsCache, select_primary_token};
use crate::search::context::SearchContext;

/// Identifiers of one page plus the encoded continuation, if any.
pub(crate) type Page = (Vec<DocId>, Option<String>);

pub(crate) async fn search_lossy(
    ctx: &mut SearchContext<'_>,
    query: &str,
    cursor: Option<&str>,
) -> Result<Page> {
    let state = match cursor {
        Some(cursor) => decode_lossy_cursor(cursor)?,
        None => LossyCursorState::default(),
    };

    let mut tokens = tokenize_lossy_query(query);
    tokens.truncate(ctx.budget.max_tokens());
    if tokens.is_empty() {
        return Ok((Vec::new(), None));
    }

    if ctx.capabilities.paged_postings && tokens.prefixes.is_empty() {
        debug!(
            "lossy search for {query:?}: paged path over {} tokens",
            tokens.trigrams.len()
        );
        paged(ctx, tokens.trigrams, state).await
    } else {
        debug!(
            "lossy search for {query:?}: full postings path ({} trigrams, {} prefixes)",
            tokens.trigrams.len(),
            tokens.prefixes.len()
        );
        full_postings(ctx, &tokens, state).await
    }
}

/// Intersect each token group, union the groups, scan past the cursor.
async fn full_postings(
    ctx: &mut SearchContext<'_>,
    tokens: &LossyQuery,
    state: LossyCursorState,
) -> Result<Page> {
    let backend = ctx.backend;
    let field = ctx.field.as_str();
    let (trigram_lists, prefix_lists) = futures::try_join!(
        try_join_all(
            tokens
                .trigrams
                .iter()
                .map(|token| backend.load_lossy_postings(field, token))
        ),
        try_join_all(
            tokens
                .prefixes
                .iter()
                .map(|token| backend.load_lossy_postings(field, token))
        ),
    )?;

    let candidates = match (
        intersect_sorted(&trigram_lists),
        intersect_sorted(&prefix_lists),
    ) {
        (Some(trigrams), Some(prefixes)) => union_sorted(&trigrams, &prefixes),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => Vec::new(),
    };

    let start = first_after(&candidates, state.last_doc_id.as_ref());
    let remaining = &candidates[start..];
    let mut ids = Vec::new();
    let mut stopped_at: Option<usize> = None;

    for (i, doc_id) in remaining.iter().enumerate() {
        if i > 0 && ctx.budget.should_stop() {
            stopped_at = Some(i);
            break;
        }
        let within = ctx.budget.candidate(0);
        ids.push(doc_id.clone());
        if ids.len() >= ctx.limit || !within {
            stopped_at = Some(i + 1);
            break;
        }
    }

    let cursor = match stopped_at {
        Some(next) if next < remaining.len() => encode_lossy_cursor(&LossyCursorState {
            last_doc_id: next.checked_sub(1).map(|last| remaining[last].clone()),
            plan: None,
        })?,
        _ => None,
    };
    Ok((ids, cursor))
}

/// Page through the primary token, confirming secondary tokens per candidate.
async fn paged(
    ctx: &mut SearchContext<'_>,
    tokens: Vec<String>,
    state: LossyCursorState,
) -> Result<Page> {
    let mut stats = TokenStatsCache::new();
    let Some(plan) = select_primary_token(
        ctx.backend,
        &ctx.field,
        &tokens,
        state.plan.as_ref(),
        &mut stats,
    )
    .await?
    else {
        return Ok((Vec::new(), None));
    };
    let secondary: Vec<String> = tokens
        .into_iter()
        .filter(|token| *token != plan.primary_token)
        .collect();

    let mut oracle = DocTokenOracle::new(
        ctx.backend,
        &ctx.field,
        TokenSpace::Lossy,
        &ctx.capabilities,
        &ctx.trace,
    );
    let mut ids = Vec::new();
    let mut last = state.last_doc_id;
    let mut processed = 0usize;
    let mut more = false;

    'pages: loop {
        if processed > 0 && ctx.budget.should_stop() {
            more = true;
            break;
        }
        let page = ctx
            .backend
            .query_lossy_postings_page(
                &ctx.field,
                &plan.primary_token,
                &PageRequest::new(ctx.page_size).after(last.clone()),
            )
            .await?;
        let page_within = ctx.budget.postings_page();

        // One batch round per page; single lookups stay lazy.
        if !secondary.is_empty() && oracle.mode() == MembershipMode::Batch {
            oracle.ensure(&page.doc_ids, &secondary).await?;
        }

        for (i, doc_id) in page.doc_ids.iter().enumerate() {
            let rest_of_page = i + 1 < page.doc_ids.len();
            if processed > 0 && ctx.budget.should_stop_within_page() {
                more = true;
                break 'pages;
            }
            processed += 1;
            // Single-token scans are bounded by the postings page budget only.
            let within = secondary.is_empty() || ctx.budget.candidate(secondary.len());
            last = Some(doc_id.clone());

            if secondary.is_empty() || oracle.has_all(doc_id, &secondary).await? {
                ids.push(doc_id.clone());
            }
            if ids.len() >= ctx.limit || !within {
                more = rest_of_page || page.next_cursor.is_some();
                break 'pages;
            }
        }

        if page.next_cursor.is_none() {
            break;
        }
        if !page_within {
            more = true;
            break;
        }
    }

    let cursor = if more {
        encode_lossy_cursor(&LossyCursorState {
            last_doc_id: last,
            plan: Some(plan),
        })?
    } else {
        None
    };
    Ok((ids, cursor))
}
