//! InventorySource trait — where product records come from.
//!
//! Sources are allowed to fail; callers that must never fail (the chat turn)
//! go through a cache that degrades to an empty list.

use crate::error::InventoryError;
use crate::product::ProductRecord;
use async_trait::async_trait;

#[async_trait]
pub trait InventorySource: Send + Sync {
    /// A short label for logs (e.g., "http", "file").
    fn name(&self) -> &str;

    /// Fetch the full product list.
    async fn fetch(&self) -> Result<Vec<ProductRecord>, InventoryError>;
}

/// Decode the endpoint payload: `{"data": [ {..}, {..} ]}`.
///
/// A bare top-level array is also accepted. A missing or non-array `data`
/// field reads as an empty inventory; entries that are not objects are skipped.
pub fn parse_payload(body: &str) -> Result<Vec<ProductRecord>, InventoryError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| InventoryError::Malformed(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("data") {
            Some(serde_json::Value::Array(items)) => items,
            _ => Vec::new(),
        },
        other => {
            return Err(InventoryError::Malformed(format!(
                "expected an object or array, got {}",
                json_kind(&other)
            )));
        }
    };

    Ok(items.into_iter().filter_map(ProductRecord::from_value).collect())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
