//! Writing and removing a document's postings and positions.

use futures::future::try_join_all;
use log::debug;
use serde_json::Value;

use crate::analysis::{tokenize, tokenize_lossy_trigrams};
use crate::backend::IndexBackend;
use crate::config::EngineConfig;
use crate::doc_id::DocId;
use crate::error::{DualdexError, Result};
use crate::index::exact::group_positions;
use crate::search::types::{DocumentRequest, IndexResponse};

/// Identifier, field and text of a request's document.
struct Extracted<'a> {
    doc_id: DocId,
    field: &'a str,
    text: String,
}

fn extract<'a>(config: &'a EngineConfig, request: &'a DocumentRequest) -> Result<Extracted<'a>> {
    let Value::Object(document) = &request.document else {
        return Err(DualdexError::input("document must be a JSON object"));
    };
    let primary_field = request
        .primary_field
        .as_deref()
        .unwrap_or(&config.primary_field);
    let field = request.index_field.as_deref().unwrap_or(&config.index_field);

    let doc_id = DocId::from_value(document.get(primary_field))?;
    let text = field_text(document.get(field))
        .map_err(|e| DualdexError::input(format!("field {field:?} of document {doc_id}: {e}")))?;
    Ok(Extracted {
        doc_id,
        field,
        text,
    })
}

/// Text of a field value. Scalars are stringified, arrays are joined.
fn field_text(value: Option<&Value>) -> std::result::Result<String, String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Array(items)) => {
            let parts = items
                .iter()
                .map(|item| field_text(Some(item)))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(parts.join(" "))
        }
        Some(Value::Object(_)) => Err("objects cannot be indexed as text".to_string()),
    }
}

pub(crate) async fn index_document(
    backend: &dyn IndexBackend,
    config: &EngineConfig,
    request: &DocumentRequest,
) -> Result<IndexResponse> {
    let Extracted {
        doc_id,
        field,
        text,
    } = extract(config, request)?;

    let lossy = tokenize_lossy_trigrams(&text);
    let exact = tokenize(&text).tokens;
    let positions = group_positions(&exact);

    try_join_all(
        lossy
            .iter()
            .map(|token| backend.add_lossy_posting(field, token, &doc_id)),
    )
    .await?;
    try_join_all(
        positions
            .iter()
            .map(|(token, offsets)| backend.add_exact_positions(field, token, &doc_id, offsets)),
    )
    .await?;

    debug!(
        "indexed document {doc_id} in field {field:?}: {} lossy tokens, {} exact tokens",
        lossy.len(),
        positions.len()
    );
    Ok(IndexResponse {
        id: doc_id,
        lossy_tokens: lossy.len(),
        exact_tokens: positions.len(),
    })
}

/// Remove exactly the entries indexing `request` would have written.
pub(crate) async fn remove_document(
    backend: &dyn IndexBackend,
    config: &EngineConfig,
    request: &DocumentRequest,
) -> Result<IndexResponse> {
    let Extracted {
        doc_id,
        field,
        text,
    } = extract(config, request)?;

    let lossy = tokenize_lossy_trigrams(&text);
    let exact = tokenize(&text).tokens;
    let positions = group_positions(&exact);

    try_join_all(
        lossy
            .iter()
            .map(|token| backend.remove_lossy_posting(field, token, &doc_id)),
    )
    .await?;
    try_join_all(
        positions
            .iter()
            .map(|(token, _)| backend.remove_exact_positions(field, token, &doc_id)),
    )
    .await?;

    debug!(
        "removed document {doc_id} from field {field:?}: {} lossy tokens, {} exact tokens",
        lossy.len(),
        positions.len()
    );
    Ok(IndexResponse {
        id: doc_id,
        lossy_tokens: lossy.len(),
        exact_tokens: positions.len(),
    })
}
