//! Exact phrase search.
//!
//! Candidates come from the lossy index; each one is prefiltered through the
//! membership oracle against the phrase words and then verified against the
//! stored positions.
//!
//! With paged postings the scan runs in two phases that survive across
//! cursor pages. Phase one drains the pending buffer a previous call left
//! behind when its budget ran out halfway through a page. Phase two keeps
//! paging the primary token. A page interrupted mid-verification stores its
//! filtered candidates and the resume offset in the cursor, so the page is
//! neither skipped nor rescanned.

use futures::future::try_join_all;
use log::debug;

use crate::analysis::{tokenize, tokenize_lossy_query};
use crate::backend::TokenSpace;
use crate::cursor::{
    ExactCursorState, LossyProgress, VerificationProgress, decode_exact_cursor,
    encode_exact_cursor,
};
use crate::doc_id::{DocId, first_after, intersect_sorted};
use crate::error::Result;
use crate::index::PageRequest;
use crate::membership::DocTokenOracle;
use crate::planner::{QueryPlan, TokenStatsCache, select_primary_token};
use crate::positions::PositionsLoader;
use crate::search::context::SearchContext;
use crate::search::lossy::Page;

pub(crate) async fn search_exact(
    ctx: &mut SearchContext<'_>,
    query: &str,
    cursor: Option<&str>,
) -> Result<Page> {
    let state = match cursor {
        Some(cursor) => decode_exact_cursor(cursor)?,
        None => ExactCursorState::default(),
    };

    let phrase = tokenize(query).tokens;
    let mut lossy = tokenize_lossy_query(query);
    lossy.truncate(ctx.budget.max_tokens());
    let lossy = lossy.all();
    if phrase.is_empty() || lossy.is_empty() {
        return Ok((Vec::new(), None));
    }

    if ctx.capabilities.paged_postings {
        debug!(
            "exact search for {query:?}: paged path, {} phrase tokens, {} pending",
            phrase.len(),
            state.remaining_pending().len()
        );
        paged(ctx, &phrase, lossy, state).await
    } else {
        debug!(
            "exact search for {query:?}: full postings path over {} lossy tokens",
            lossy.len()
        );
        full_postings(ctx, &phrase, &lossy, state).await
    }
}

/// Where a cursor sequence resumes in the candidate stream.
fn scan_position(state: &ExactCursorState) -> Option<DocId> {
    state
        .lossy
        .last_doc_id
        .clone()
        .or_else(|| state.verification.last_doc_id.clone())
        .or_else(|| state.last_doc_id.clone())
}

async fn full_postings(
    ctx: &mut SearchContext<'_>,
    phrase: &[String],
    lossy: &[String],
    state: ExactCursorState,
) -> Result<Page> {
    let lists = try_join_all(
        lossy
            .iter()
            .map(|token| ctx.backend.load_lossy_postings(&ctx.field, token)),
    )
    .await?;
    let candidates = intersect_sorted(&lists).unwrap_or_default();
    let start = first_after(&candidates, scan_position(&state).as_ref());

    let mut oracle = DocTokenOracle::new(
        ctx.backend,
        &ctx.field,
        TokenSpace::Exact,
        &ctx.capabilities,
        &ctx.trace,
    );
    let mut loader = PositionsLoader::new(ctx.backend, &ctx.field, &ctx.capabilities, &ctx.trace);
    let mut ids = Vec::new();
    let mut scanned = scan_position(&state);
    let mut verified = state.verification.last_doc_id.clone();
    let mut processed = 0usize;
    let mut more = false;

    'chunks: for chunk in candidates[start..].chunks(ctx.page_size) {
        if processed > 0 && ctx.budget.should_stop() {
            more = true;
            break;
        }
        let survivors = oracle.filter_docs_by_tokens(chunk, phrase).await?;
        if ctx.capabilities.batch_positions {
            loader.preload(&survivors, phrase).await?;
        }

        for doc_id in &survivors {
            if processed > 0 && ctx.budget.should_stop() {
                more = true;
                break 'chunks;
            }
            processed += 1;
            let within = ctx.budget.candidate(phrase.len());
            scanned = Some(doc_id.clone());
            verified = Some(doc_id.clone());
            if loader.has_exact_phrase(doc_id, phrase).await? {
                ids.push(doc_id.clone());
            }
            if ids.len() >= ctx.limit || !within {
                more = first_after(&candidates, Some(doc_id)) < candidates.len();
                break 'chunks;
            }
        }
        scanned = chunk.last().cloned();
    }

    let cursor = if more {
        encode_exact_cursor(&ExactCursorState {
            last_doc_id: ids.last().cloned().or(state.last_doc_id),
            plan: None,
            lossy: LossyProgress {
                last_doc_id: scanned,
            },
            verification: VerificationProgress {
                last_doc_id: verified,
                ..Default::default()
            },
        })?
    } else {
        None
    };
    Ok((ids, cursor))
}

/// Why a verification loop stopped.
enum Halt {
    /// The loop ran to the end of its input.
    Drained,
    /// Stopped before the candidate at this index.
    Before(usize),
    /// Stopped right after the candidate at this index.
    After(usize),
}

/// Verify `candidates` in order until the limit or the budget stops it.
async fn verify(
    ctx: &mut SearchContext<'_>,
    loader: &mut PositionsLoader<'_>,
    phrase: &[String],
    candidates: &[DocId],
    ids: &mut Vec<DocId>,
    verified: &mut Option<DocId>,
    processed: &mut usize,
) -> Result<Halt> {
    for (i, doc_id) in candidates.iter().enumerate() {
        if *processed > 0 && ctx.budget.should_stop_within_page() {
            return Ok(Halt::Before(i));
        }
        *processed += 1;
        let within = ctx.budget.candidate(phrase.len());
        *verified = Some(doc_id.clone());
        if loader.has_exact_phrase(doc_id, phrase).await? {
            ids.push(doc_id.clone());
        }
        if ids.len() >= ctx.limit || !within {
            return Ok(Halt::After(i));
        }
    }
    Ok(Halt::Drained)
}

async fn paged(
    ctx: &mut SearchContext<'_>,
    phrase: &[String],
    lossy: Vec<String>,
    state: ExactCursorState,
) -> Result<Page> {
    let mut stats = TokenStatsCache::new();
    let Some(plan) = select_primary_token(
        ctx.backend,
        &ctx.field,
        &lossy,
        state.plan.as_ref(),
        &mut stats,
    )
    .await?
    else {
        return Ok((Vec::new(), None));
    };

    let backend = ctx.backend;
    let field = ctx.field.clone();
    let capabilities = ctx.capabilities;
    let trace = ctx.trace.clone();
    let mut oracle = DocTokenOracle::new(backend, &field, TokenSpace::Exact, &capabilities, &trace);
    let mut loader = PositionsLoader::new(backend, &field, &capabilities, &trace);

    let mut ids = Vec::new();
    let mut verified = state.verification.last_doc_id.clone();
    let mut scanned = state.lossy.last_doc_id.clone().or_else(|| state.last_doc_id.clone());
    let mut processed = 0usize;

    // Phase one: the pending buffer of an interrupted page.
    if let Some(pending) = state.verification.pending_candidates.clone() {
        let offset = state.verification.pending_offset.unwrap_or(0).min(pending.len());
        let remaining = &pending[offset..];
        if capabilities.batch_positions && !remaining.is_empty() {
            loader.preload(remaining, phrase).await?;
        }
        let halt = verify(
            ctx,
            &mut loader,
            phrase,
            remaining,
            &mut ids,
            &mut verified,
            &mut processed,
        )
        .await?;
        let resume = match halt {
            Halt::Drained => None,
            Halt::Before(i) => Some(offset + i),
            Halt::After(i) => Some(offset + i + 1),
        };
        if let Some(resume) = resume {
            let pending = (resume < pending.len()).then_some((pending, resume));
            return finish(&state, plan, ids, scanned, verified, pending, true);
        }
    }

    // Phase two: keep paging the primary token.
    loop {
        if processed > 0 && ctx.budget.should_stop() {
            return finish(&state, plan, ids, scanned, verified, None, true);
        }
        let page = backend
            .query_lossy_postings_page(
                &field,
                &plan.primary_token,
                &PageRequest::new(ctx.page_size).after(scanned.clone()),
            )
            .await?;
        let page_within = ctx.budget.postings_page();
        if let Some(last) = page.doc_ids.last() {
            scanned = Some(last.clone());
        }

        let survivors = oracle.filter_docs_by_tokens(&page.doc_ids, phrase).await?;
        if capabilities.batch_positions && !survivors.is_empty() {
            loader.preload(&survivors, phrase).await?;
        }
        let halt = verify(
            ctx,
            &mut loader,
            phrase,
            &survivors,
            &mut ids,
            &mut verified,
            &mut processed,
        )
        .await?;
        let resume = match halt {
            Halt::Drained => None,
            Halt::Before(i) => Some(i),
            Halt::After(i) => Some(i + 1),
        };
        let has_next_page = page.next_cursor.is_some();
        if let Some(resume) = resume {
            if resume < survivors.len() {
                return finish(&state, plan, ids, scanned, verified, Some((survivors, resume)), true);
            }
            return finish(&state, plan, ids, scanned, verified, None, has_next_page);
        }
        if !has_next_page {
            return finish(&state, plan, ids, scanned, verified, None, false);
        }
        if !page_within {
            return finish(&state, plan, ids, scanned, verified, None, true);
        }
    }
}

/// Assemble the page and, when `more` may follow, its cursor.
fn finish(
    state: &ExactCursorState,
    plan: QueryPlan,
    ids: Vec<DocId>,
    scanned: Option<DocId>,
    verified: Option<DocId>,
    pending: Option<(Vec<DocId>, usize)>,
    more: bool,
) -> Result<Page> {
    if !more {
        return Ok((ids, None));
    }
    let (pending_candidates, pending_offset) = match pending {
        Some((candidates, offset)) => (Some(candidates), Some(offset)),
        None => (None, None),
    };
    let cursor = encode_exact_cursor(&ExactCursorState {
        last_doc_id: ids.last().cloned().or_else(|| state.last_doc_id.clone()),
        plan: Some(plan),
        lossy: LossyProgress {
            last_doc_id: scanned,
        },
        verification: VerificationProgress {
            last_doc_id: verified,
            pending_candidates,
            pending_offset,
        },
    })?;
    Ok((ids, cursor))
}
