use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{PipedriveError, Result};
use crate::models::RemoteId;

/// Every successful Pipedrive response wraps its payload in `data`.
///
/// Decoding goes through `serde_json::Value` first so a missing envelope can
/// be told apart from a malformed record.
pub fn unwrap_data(body: Value) -> Result<Value> {
    match body {
        Value::Object(mut map) => map.remove("data").ok_or_else(|| {
            PipedriveError::Protocol("Response is missing the 'data' envelope".to_string())
        }),
        other => Err(PipedriveError::Protocol(format!(
            "Expected a JSON object response, got: {}",
            type_name(&other)
        ))),
    }
}

/// Decodes the `data` payload of a response into `T`.
pub fn decode_data<T: serde::de::DeserializeOwned>(body: Value) -> Result<T> {
    let data = unwrap_data(body)?;
    serde_json::from_value(data)
        .map_err(|e| PipedriveError::Protocol(format!("Unexpected 'data' payload: {}", e)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `data` of search endpoints: `{"items": [{"result_score": .., "item": {..}}]}`.
///
/// `items` can be `null` when nothing matched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchData {
    #[serde(default)]
    pub items: Option<Vec<SearchResult>>,
}

impl SearchData {
    /// Ids of the matches, best first.
    pub fn ids(&self) -> Vec<RemoteId> {
        self.items
            .iter()
            .flatten()
            .map(|result| result.item.id.clone())
            .collect()
    }

    pub fn first_id(&self) -> Option<RemoteId> {
        self.items
            .as_ref()
            .and_then(|items| items.first())
            .map(|result| result.item.id.clone())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResult {
    #[serde(default)]
    pub result_score: Option<f64>,
    pub item: SearchItem,
}

/// A search match. Its shape differs from the canonical record (leads come
/// back without label ids), so only the id is relied on.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchItem {
    pub id: RemoteId,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    /// Remaining search-specific fields
    #[serde(flatten)]
    pub raw: Value,
}

/// Outcome of an exact-match lookup.
///
/// Create-vs-update decisions match on this instead of treating any error
/// as "not found".
#[derive(Debug)]
pub enum SearchOutcome<T> {
    Found(T),
    NotFound,
    Failed(PipedriveError),
}

impl<T> SearchOutcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }

    /// Collapses into a `Result`, mapping `NotFound` to `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>> {
        match self {
            SearchOutcome::Found(value) => Ok(Some(value)),
            SearchOutcome::NotFound => Ok(None),
            SearchOutcome::Failed(err) => Err(err),
        }
    }
}

impl<T> From<Result<Option<T>>> for SearchOutcome<T> {
    fn from(result: Result<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => SearchOutcome::Found(value),
            Ok(None) => SearchOutcome::NotFound,
            Err(err) => SearchOutcome::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_envelope_is_protocol_error() {
        let err = unwrap_data(json!({"success": true})).unwrap_err();
        assert!(matches!(err, PipedriveError::Protocol(_)));

        let err = unwrap_data(json!([1, 2])).unwrap_err();
        assert!(matches!(err, PipedriveError::Protocol(_)));
    }

    #[test]
    fn test_decode_data_reports_bad_payload() {
        let err = decode_data::<Vec<String>>(json!({"data": {"not": "a list"}})).unwrap_err();
        assert!(matches!(err, PipedriveError::Protocol(_)));

        let names: Vec<String> = decode_data(json!({"data": ["a", "b"]})).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_search_data_shapes() {
        let data: SearchData = serde_json::from_value(json!({
            "items": [
                {"result_score": 0.9, "item": {"id": "lead-1", "type": "lead", "title": "App: a@b.co"}},
                {"result_score": 0.3, "item": {"id": "lead-2", "type": "lead", "title": "App: a@b.com"}}
            ]
        }))
        .unwrap();
        assert_eq!(data.first_id(), Some(RemoteId::from("lead-1")));
        assert_eq!(data.ids().len(), 2);

        let empty: SearchData = serde_json::from_value(json!({"items": null})).unwrap();
        assert_eq!(empty.first_id(), None);
        assert!(empty.ids().is_empty());
    }

    #[test]
    fn test_search_outcome_from_result() {
        let found: SearchOutcome<u8> = Ok(Some(1)).into();
        assert!(found.is_found());

        let missing: SearchOutcome<u8> = Ok(None).into();
        assert!(matches!(missing.into_result(), Ok(None)));

        let failed: SearchOutcome<u8> = Err(PipedriveError::Protocol("x".into())).into();
        assert!(failed.into_result().is_err());
    }
}
