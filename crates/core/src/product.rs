//! Product records as delivered by the inventory endpoint.
//!
//! The upstream schema is loose: every record is a flat JSON object whose
//! keys vary between catalog exports. Only a handful of field names are
//! relied upon (`item_name`, `image`, `productlink`, a price field); every
//! accessor tolerates their absence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the display name of a product.
pub const NAME_FIELD: &str = "item_name";
/// Field holding the product image URL.
pub const IMAGE_FIELD: &str = "image";
/// Field holding the purchase link.
pub const LINK_FIELD: &str = "productlink";
/// Candidate price fields, checked in order.
pub const PRICE_FIELDS: &[&str] = &["price", "item_price", "selling_price", "sale_price", "mrp"];

/// A single purchasable product. Immutable once fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductRecord(Map<String, Value>);

impl ProductRecord {
    /// Build a record from a JSON value; non-objects yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Read a field as display text. Numbers and booleans are rendered,
    /// `null` and missing fields read as `None`.
    pub fn field(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(render_scalar)
    }

    /// The product name, or an empty string when absent.
    pub fn name(&self) -> String {
        self.field(NAME_FIELD).unwrap_or_default()
    }

    pub fn image(&self) -> Option<String> {
        self.field(IMAGE_FIELD).filter(|s| !s.is_empty())
    }

    pub fn link(&self) -> Option<String> {
        self.field(LINK_FIELD).filter(|s| !s.is_empty())
    }

    /// The first non-empty price field.
    pub fn price(&self) -> Option<String> {
        PRICE_FIELDS
            .iter()
            .filter_map(|key| self.field(key))
            .find(|s| !s.trim().is_empty())
    }

    /// All field values joined by a space.
    pub fn text_blob(&self) -> String {
        self.0
            .values()
            .filter_map(render_scalar)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // Nested values are rare in catalog exports; keep them searchable.
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ProductRecord {
        ProductRecord::from_value(value).unwrap()
    }

    #[test]
    fn reads_well_known_fields() {
        let p = record(json!({
            "item_name": "Panadol Advance",
            "image": "https://cdn.example.com/panadol.jpg",
            "productlink": "https://shop.example.com/panadol",
            "price": 12.5
        }));
        assert_eq!(p.name(), "Panadol Advance");
        assert_eq!(p.image().as_deref(), Some("https://cdn.example.com/panadol.jpg"));
        assert_eq!(p.link().as_deref(), Some("https://shop.example.com/panadol"));
        assert_eq!(p.price().as_deref(), Some("12.5"));
    }

    #[test]
    fn missing_fields_read_as_absent() {
        let p = record(json!({"stock": 3}));
        assert_eq!(p.name(), "");
        assert!(p.image().is_none());
        assert!(p.link().is_none());
        assert!(p.price().is_none());
    }

    #[test]
    fn price_falls_back_through_candidates() {
        let p = record(json!({"price": "", "item_price": null, "mrp": "QAR 9"}));
        assert_eq!(p.price().as_deref(), Some("QAR 9"));
    }

    #[test]
    fn text_blob_skips_nulls_and_renders_numbers() {
        let p = record(json!({"item_name": "Brufen", "stock": 4, "note": null}));
        assert_eq!(p.text_blob(), "Brufen 4");
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(ProductRecord::from_value(json!("Panadol")).is_none());
        assert!(ProductRecord::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn serializes_as_plain_object() {
        let p = record(json!({"item_name": "Colgate"}));
        assert_eq!(serde_json::to_string(&p).unwrap(), r#"{"item_name":"Colgate"}"#);
    }
}
