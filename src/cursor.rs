//! Opaque, versioned pagination cursors.
//!
//! A cursor snapshots everything needed to continue a search: the last
//! identifier handed out, the planner's primary-token choice and, for exact
//! search, the verification progress including any candidates that were
//! filtered but not yet verified when the budget ran out.
//!
//! Encoders always emit the lowest version able to express a state; decoders
//! accept every version ever written and migrate it to the current state
//! types.

pub mod wire;

use crate::doc_id::DocId;
use crate::error::{DualdexError, Result};
use crate::planner::QueryPlan;

use self::wire::{CursorPayload, WirePlan, decode_payload, encode_payload};

/// Continuation state of a lossy search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LossyCursorState {
    pub last_doc_id: Option<DocId>,
    pub plan: Option<QueryPlan>,
}

impl LossyCursorState {
    pub fn is_empty(&self) -> bool {
        self.last_doc_id.is_none() && self.plan.is_none()
    }
}

/// Progress of the candidate scan over lossy postings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LossyProgress {
    pub last_doc_id: Option<DocId>,
}

/// Progress of phrase verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationProgress {
    pub last_doc_id: Option<DocId>,
    /// Filtered candidates of an interrupted page, still to be verified.
    pub pending_candidates: Option<Vec<DocId>>,
    /// Index of the first unverified entry of `pending_candidates`.
    pub pending_offset: Option<usize>,
}

/// Continuation state of an exact search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExactCursorState {
    /// Last identifier returned to the caller.
    pub last_doc_id: Option<DocId>,
    pub plan: Option<QueryPlan>,
    pub lossy: LossyProgress,
    pub verification: VerificationProgress,
}

impl ExactCursorState {
    pub fn is_empty(&self) -> bool {
        self.last_doc_id.is_none()
            && self.plan.is_none()
            && self.lossy.last_doc_id.is_none()
            && self.verification.last_doc_id.is_none()
            && self.verification.pending_candidates.is_none()
    }

    /// Unverified pending candidates, starting at the stored offset.
    pub fn remaining_pending(&self) -> &[DocId] {
        match &self.verification.pending_candidates {
            Some(pending) => {
                let offset = self.verification.pending_offset.unwrap_or(0).min(pending.len());
                &pending[offset..]
            }
            None => &[],
        }
    }
}

fn plan_from_wire(plan: Option<WirePlan>) -> Result<Option<QueryPlan>> {
    plan.map(QueryPlan::try_from).transpose()
}

fn offset_from_wire(offset: Option<u64>) -> Result<Option<usize>> {
    offset
        .map(|value| {
            usize::try_from(value)
                .map_err(|_| DualdexError::cursor(format!("cursor offset {value} is out of range")))
        })
        .transpose()
}

fn wrong_kind(expected: &str, payload: &CursorPayload) -> DualdexError {
    DualdexError::cursor(format!(
        "expected a {expected} cursor but got a {} cursor (v{})",
        payload.kind(),
        payload.version()
    ))
}

/// Encode a lossy state; `None` when there is nothing to continue from.
pub fn encode_lossy_cursor(state: &LossyCursorState) -> Result<Option<String>> {
    if state.is_empty() {
        return Ok(None);
    }
    let payload = match &state.plan {
        None => CursorPayload::LossyV1 {
            last_doc_id: state.last_doc_id.clone(),
        },
        Some(plan) => CursorPayload::LossyV2 {
            last_doc_id: state.last_doc_id.clone(),
            plan: Some(WirePlan::from(plan)),
        },
    };
    encode_payload(payload).map(Some)
}

pub fn decode_lossy_cursor(cursor: &str) -> Result<LossyCursorState> {
    match decode_payload(cursor)? {
        CursorPayload::LossyV1 { last_doc_id } => Ok(LossyCursorState {
            last_doc_id,
            plan: None,
        }),
        CursorPayload::LossyV2 { last_doc_id, plan } | CursorPayload::LossyV3 { last_doc_id, plan } => {
            Ok(LossyCursorState {
                last_doc_id,
                plan: plan_from_wire(plan)?,
            })
        }
        other @ (CursorPayload::ExactV1 { .. }
        | CursorPayload::ExactV2 { .. }
        | CursorPayload::ExactV3 { .. }) => Err(wrong_kind(wire::LOSSY_TAG, &other)),
    }
}

/// Encode an exact state; `None` when there is nothing to continue from.
pub fn encode_exact_cursor(state: &ExactCursorState) -> Result<Option<String>> {
    if state.is_empty() {
        return Ok(None);
    }
    let last_doc_id = state.last_doc_id.clone();
    let lossy_last_doc_id = state.lossy.last_doc_id.clone();
    let verification_last_doc_id = state.verification.last_doc_id.clone();
    let plan = state.plan.as_ref().map(WirePlan::from);

    let payload = if state.verification.pending_candidates.is_some() {
        CursorPayload::ExactV3 {
            last_doc_id,
            lossy_last_doc_id,
            verification_last_doc_id,
            plan,
            pending: state.verification.pending_candidates.clone(),
            offset: state.verification.pending_offset.map(|offset| offset as u64),
        }
    } else if plan.is_some() {
        CursorPayload::ExactV2 {
            last_doc_id,
            lossy_last_doc_id,
            verification_last_doc_id,
            plan,
        }
    } else {
        CursorPayload::ExactV1 {
            last_doc_id,
            lossy_last_doc_id,
            verification_last_doc_id,
        }
    };
    encode_payload(payload).map(Some)
}

pub fn decode_exact_cursor(cursor: &str) -> Result<ExactCursorState> {
    match decode_payload(cursor)? {
        CursorPayload::ExactV1 {
            last_doc_id,
            lossy_last_doc_id,
            verification_last_doc_id,
        } => Ok(ExactCursorState {
            last_doc_id,
            plan: None,
            lossy: LossyProgress {
                last_doc_id: lossy_last_doc_id,
            },
            verification: VerificationProgress {
                last_doc_id: verification_last_doc_id,
                ..VerificationProgress::default()
            },
        }),
        CursorPayload::ExactV2 {
            last_doc_id,
            lossy_last_doc_id,
            verification_last_doc_id,
            plan,
        } => Ok(ExactCursorState {
            last_doc_id,
            plan: plan_from_wire(plan)?,
            lossy: LossyProgress {
                last_doc_id: lossy_last_doc_id,
            },
            verification: VerificationProgress {
                last_doc_id: verification_last_doc_id,
                ..VerificationProgress::default()
            },
        }),
        CursorPayload::ExactV3 {
            last_doc_id,
            lossy_last_doc_id,
            verification_last_doc_id,
            plan,
            pending,
            offset,
        } => Ok(ExactCursorState {
            last_doc_id,
            plan: plan_from_wire(plan)?,
            lossy: LossyProgress {
                last_doc_id: lossy_last_doc_id,
            },
            verification: VerificationProgress {
                last_doc_id: verification_last_doc_id,
                pending_candidates: pending,
                pending_offset: offset_from_wire(offset)?,
            },
        }),
        other @ (CursorPayload::LossyV1 { .. }
        | CursorPayload::LossyV2 { .. }
        | CursorPayload::LossyV3 { .. }) => Err(wrong_kind(wire::EXACT_TAG, &other)),
    }
}
