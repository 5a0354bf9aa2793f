//! Decoding of the search endpoint's JSON payload.
//!
//! The endpoint answers with an object that carries the list of results under
//! a known key, e.g. `{"recipes": [{"id": 1, "name": "Pizza", ...}], "total": 1}`.

use serde_json::Value;

use crate::ResultItem;

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response is not a JSON object")]
    NotAnObject,
    #[error("results under '{key}' are malformed: {source}")]
    Items {
        key: String,
        source: serde_json::Error,
    },
}

/// Extracts the results stored under `key`.
///
/// A missing or `null` key means the service found nothing and is not an
/// error.
pub fn decode_results(body: &[u8], key: &str) -> Result<Vec<ResultItem>, DecodeError> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(mut top) = value else {
        return Err(DecodeError::NotAnObject);
    };

    match top.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(items) => serde_json::from_value(items).map_err(|source| DecodeError::Items {
            key: key.to_string(),
            source,
        }),
    }
}
