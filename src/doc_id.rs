//! Document identifiers and their total order.
//!
//! A [`DocId`] is either an integer or a string, mirroring what a JSON
//! document may carry in its primary field. Every place that merges, pages or
//! bisects postings relies on the `Ord` implementation here.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DualdexError, Result};

/// A string-or-integer document identifier.
///
/// Values of the same kind compare natively. Across kinds every integer sorts
/// before every string, which keeps the order total.
///
/// ```
/// use dualdex::doc_id::DocId;
///
/// let mut ids = vec![DocId::from("b"), DocId::from(10), DocId::from("a"), DocId::from(2)];
/// ids.sort();
/// assert_eq!(ids, vec![DocId::from(2), DocId::from(10), DocId::from("a"), DocId::from("b")]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocId {
    Int(i64),
    Str(String),
}

impl DocId {
    /// Normalize a raw primary-field value into an identifier.
    ///
    /// Integers (and floats without a fractional part) become [`DocId::Int`],
    /// non-empty strings become [`DocId::Str`]. Anything else, including a
    /// missing value or a blank string, is an input error.
    pub fn from_value(value: Option<&Value>) -> Result<DocId> {
        match value {
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Ok(DocId::Int(i))
                } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0 && f.is_finite())
                {
                    if f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                        Ok(DocId::Int(f as i64))
                    } else {
                        Err(DualdexError::input(format!(
                            "document identifier {n} is out of range"
                        )))
                    }
                } else {
                    Err(DualdexError::input(format!(
                        "document identifier {n} is not an integer"
                    )))
                }
            }
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(DocId::Str(s.clone())),
            Some(Value::String(_)) | Some(Value::Null) | None => Err(DualdexError::input(
                "missing or empty primary field value",
            )),
            Some(other) => Err(DualdexError::input(format!(
                "unsupported document identifier type: {other}"
            ))),
        }
    }

    /// Key fragment used by per-call caches.
    pub fn cache_key(&self) -> String {
        match self {
            DocId::Int(i) => format!("i:{i}"),
            DocId::Str(s) => format!("s:{s}"),
        }
    }
}

impl Ord for DocId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DocId::Int(a), DocId::Int(b)) => a.cmp(b),
            (DocId::Str(a), DocId::Str(b)) => a.cmp(b),
            (DocId::Int(_), DocId::Str(_)) => Ordering::Less,
            (DocId::Str(_), DocId::Int(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for DocId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocId::Int(i) => write!(f, "{i}"),
            DocId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for DocId {
    fn from(value: i64) -> Self {
        DocId::Int(value)
    }
}

impl From<i32> for DocId {
    fn from(value: i32) -> Self {
        DocId::Int(value as i64)
    }
}

impl From<&str> for DocId {
    fn from(value: &str) -> Self {
        DocId::Str(value.to_string())
    }
}

impl From<String> for DocId {
    fn from(value: String) -> Self {
        DocId::Str(value)
    }
}

/// Index of the first element of `sorted` strictly greater than `after`.
///
/// With `after == None` this is `0`.
pub fn first_after(sorted: &[DocId], after: Option<&DocId>) -> usize {
    match after {
        Some(bound) => sorted.partition_point(|id| id <= bound),
        None => 0,
    }
}

/// Intersect ascending, duplicate-free identifier lists.
///
/// Returns `None` when `lists` is empty so callers can tell "no constraint"
/// apart from "empty result".
pub fn intersect_sorted(lists: &[Vec<DocId>]) -> Option<Vec<DocId>> {
    let mut ordered: Vec<&Vec<DocId>> = lists.iter().collect();
    ordered.sort_by_key(|list| list.len());
    let (first, rest) = ordered.split_first()?;

    let mut result: Vec<DocId> = (*first).clone();
    for list in rest {
        if result.is_empty() {
            break;
        }
        result.retain(|id| list.binary_search(id).is_ok());
    }
    Some(result)
}

/// Union of two ascending, duplicate-free identifier lists.
pub fn union_sorted(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
