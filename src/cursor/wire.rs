//! Wire representation of cursors.
//!
//! The encoded string is URL-safe base64 (no padding) over a UTF-8 JSON
//! object. [`RawCursor`] is the loose serde shape of that object; it is
//! immediately narrowed into the closed [`CursorPayload`] union, which is the
//! only thing the in-memory states are migrated from.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::doc_id::DocId;
use crate::error::{DualdexError, Result};
use crate::planner::{QueryPlan, Sorting};

pub const LOSSY_TAG: &str = "lossy";
pub const EXACT_TAG: &str = "exact";

/// Planner metadata as stored on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePlan {
    /// Primary token.
    pub p: String,
    /// Stats version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sv: Option<u64>,
    /// Sorting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
}

impl From<&QueryPlan> for WirePlan {
    fn from(plan: &QueryPlan) -> Self {
        WirePlan {
            p: plan.primary_token.clone(),
            sv: plan.stats_version,
            s: Some(plan.sorting.as_str().to_string()),
        }
    }
}

impl TryFrom<WirePlan> for QueryPlan {
    type Error = DualdexError;

    fn try_from(plan: WirePlan) -> Result<QueryPlan> {
        let sorting = match plan.s.as_deref() {
            None => Sorting::default(),
            Some(name) => Sorting::parse(name)
                .ok_or_else(|| DualdexError::cursor(format!("unknown cursor sorting: {name}")))?,
        };
        Ok(QueryPlan {
            primary_token: plan.p,
            stats_version: plan.sv,
            sorting,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCursor {
    pub v: u64,
    pub t: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_doc_id: Option<DocId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lossy_last_doc_id: Option<DocId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_last_doc_id: Option<DocId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<WirePlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_pending: Option<Vec<DocId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_offset: Option<u64>,
}

/// Every cursor layout the codec understands.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorPayload {
    LossyV1 {
        last_doc_id: Option<DocId>,
    },
    LossyV2 {
        last_doc_id: Option<DocId>,
        plan: Option<WirePlan>,
    },
    /// Written by older encoders; read exactly like v2.
    LossyV3 {
        last_doc_id: Option<DocId>,
        plan: Option<WirePlan>,
    },
    ExactV1 {
        last_doc_id: Option<DocId>,
        lossy_last_doc_id: Option<DocId>,
        verification_last_doc_id: Option<DocId>,
    },
    ExactV2 {
        last_doc_id: Option<DocId>,
        lossy_last_doc_id: Option<DocId>,
        verification_last_doc_id: Option<DocId>,
        plan: Option<WirePlan>,
    },
    ExactV3 {
        last_doc_id: Option<DocId>,
        lossy_last_doc_id: Option<DocId>,
        verification_last_doc_id: Option<DocId>,
        plan: Option<WirePlan>,
        pending: Option<Vec<DocId>>,
        offset: Option<u64>,
    },
}

impl CursorPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            CursorPayload::LossyV1 { .. }
            | CursorPayload::LossyV2 { .. }
            | CursorPayload::LossyV3 { .. } => LOSSY_TAG,
            CursorPayload::ExactV1 { .. }
            | CursorPayload::ExactV2 { .. }
            | CursorPayload::ExactV3 { .. } => EXACT_TAG,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            CursorPayload::LossyV1 { .. } | CursorPayload::ExactV1 { .. } => 1,
            CursorPayload::LossyV2 { .. } | CursorPayload::ExactV2 { .. } => 2,
            CursorPayload::LossyV3 { .. } | CursorPayload::ExactV3 { .. } => 3,
        }
    }

    /// Narrow a raw object; fields that do not belong to its version are ignored.
    pub fn from_raw(raw: RawCursor) -> Result<CursorPayload> {
        let RawCursor {
            v,
            t,
            last_doc_id,
            lossy_last_doc_id,
            verification_last_doc_id,
            plan,
            verification_pending,
            verification_offset,
        } = raw;

        match (t.as_str(), v) {
            (LOSSY_TAG, 1) => Ok(CursorPayload::LossyV1 { last_doc_id }),
            (LOSSY_TAG, 2) => Ok(CursorPayload::LossyV2 { last_doc_id, plan }),
            (LOSSY_TAG, 3) => Ok(CursorPayload::LossyV3 { last_doc_id, plan }),
            (EXACT_TAG, 1) => Ok(CursorPayload::ExactV1 {
                last_doc_id,
                lossy_last_doc_id,
                verification_last_doc_id,
            }),
            (EXACT_TAG, 2) => Ok(CursorPayload::ExactV2 {
                last_doc_id,
                lossy_last_doc_id,
                verification_last_doc_id,
                plan,
            }),
            (EXACT_TAG, 3) => Ok(CursorPayload::ExactV3 {
                last_doc_id,
                lossy_last_doc_id,
                verification_last_doc_id,
                plan,
                pending: verification_pending,
                offset: verification_offset,
            }),
            (LOSSY_TAG | EXACT_TAG, version) => Err(DualdexError::cursor(format!(
                "unsupported {t} cursor version: {version}"
            ))),
            (other, _) => Err(DualdexError::cursor(format!(
                "unknown cursor type: {other:?}"
            ))),
        }
    }

    pub fn into_raw(self) -> RawCursor {
        let v = self.version();
        let t = self.kind().to_string();
        match self {
            CursorPayload::LossyV1 { last_doc_id } => RawCursor {
                v,
                t,
                last_doc_id,
                ..RawCursor::default()
            },
            CursorPayload::LossyV2 { last_doc_id, plan }
            | CursorPayload::LossyV3 { last_doc_id, plan } => RawCursor {
                v,
                t,
                last_doc_id,
                plan,
                ..RawCursor::default()
            },
            CursorPayload::ExactV1 {
                last_doc_id,
                lossy_last_doc_id,
                verification_last_doc_id,
            } => RawCursor {
                v,
                t,
                last_doc_id,
                lossy_last_doc_id,
                verification_last_doc_id,
                ..RawCursor::default()
            },
            CursorPayload::ExactV2 {
                last_doc_id,
                lossy_last_doc_id,
                verification_last_doc_id,
                plan,
            } => RawCursor {
                v,
                t,
                last_doc_id,
                lossy_last_doc_id,
                verification_last_doc_id,
                plan,
                ..RawCursor::default()
            },
            CursorPayload::ExactV3 {
                last_doc_id,
                lossy_last_doc_id,
                verification_last_doc_id,
                plan,
                pending,
                offset,
            } => RawCursor {
                v,
                t,
                last_doc_id,
                lossy_last_doc_id,
                verification_last_doc_id,
                plan,
                verification_pending: pending,
                verification_offset: offset,
            },
        }
    }
}

/// JSON + base64url encoding of a payload.
pub fn encode_payload(payload: CursorPayload) -> Result<String> {
    let json = serde_json::to_vec(&payload.into_raw())?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Inverse of [`encode_payload`]; every failure is a cursor error.
pub fn decode_payload(cursor: &str) -> Result<CursorPayload> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor.trim())
        .map_err(|e| DualdexError::cursor(format!("cursor is not valid base64url: {e}")))?;
    let raw: RawCursor = serde_json::from_slice(&bytes)
        .map_err(|e| DualdexError::cursor(format!("cursor payload is not valid JSON: {e}")))?;
    CursorPayload::from_raw(raw)
}
