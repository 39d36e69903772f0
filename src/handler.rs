//! JSON request dispatcher.
//!
//! An envelope is a JSON object carrying an `action` plus the fields of the
//! matching request type:
//!
//! ```json
//! {"action": "searchLossy", "query": "hello", "limit": 10, "cursor": "..."}
//! ```
//!
//! Unknown actions answer with status 400. Failures of the engine itself
//! (bad cursor, bad document, backend error) are returned as `Err`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{DualdexError, Result};
use crate::search::{IndexRequest, RemoveRequest, SearchEngine, SearchRequest};

/// Operations reachable through an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    IndexDocument,
    RemoveDocument,
    SearchLossy,
    SearchExact,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::IndexDocument => "indexDocument",
            Action::RemoveDocument => "removeDocument",
            Action::SearchLossy => "searchLossy",
            Action::SearchExact => "searchExact",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DualdexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "indexDocument" => Ok(Action::IndexDocument),
            "removeDocument" => Ok(Action::RemoveDocument),
            "searchLossy" => Ok(Action::SearchLossy),
            "searchExact" => Ok(Action::SearchExact),
            other => Err(DualdexError::input(format!("unsupported action: {other}"))),
        }
    }
}

/// Status code plus serialized JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    fn ok<T: Serialize>(result: &T) -> Result<Self> {
        Ok(HandlerResponse {
            status_code: 200,
            body: serde_json::to_string(result)?,
        })
    }

    fn bad_request(message: String) -> Result<Self> {
        Ok(HandlerResponse {
            status_code: 400,
            body: json!({ "error": message }).to_string(),
        })
    }

    /// The body parsed back into JSON.
    pub fn body_json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Dispatch one envelope against `engine`.
pub async fn handle(engine: &SearchEngine, envelope: Value) -> Result<HandlerResponse> {
    let Value::Object(mut fields) = envelope else {
        return Err(DualdexError::input("request envelope must be a JSON object"));
    };
    let action = match fields.remove("action") {
        Some(Value::String(name)) => name,
        Some(other) => return HandlerResponse::bad_request(format!("unsupported action: {other}")),
        None => return HandlerResponse::bad_request("unsupported action: <missing>".to_string()),
    };
    let Ok(action) = action.parse::<Action>() else {
        return HandlerResponse::bad_request(format!("unsupported action: {action}"));
    };

    match action {
        Action::IndexDocument => {
            let request: IndexRequest = from_fields(fields)?;
            HandlerResponse::ok(&engine.index_document(request).await?)
        }
        Action::RemoveDocument => {
            let request: RemoveRequest = from_fields(fields)?;
            HandlerResponse::ok(&engine.remove_document(request).await?)
        }
        Action::SearchLossy => {
            let request: SearchRequest = from_fields(fields)?;
            HandlerResponse::ok(&engine.search_lossy(request).await?)
        }
        Action::SearchExact => {
            let request: SearchRequest = from_fields(fields)?;
            HandlerResponse::ok(&engine.search_exact(request).await?)
        }
    }
}

fn from_fields<T: serde::de::DeserializeOwned>(fields: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| DualdexError::input(format!("invalid request: {e}")))
}
