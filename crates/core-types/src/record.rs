//! Listing records: the data substituted into a trace during replay.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Canonical field identifiers recognized by the substitution engine.
pub const CANONICAL_FIELDS: [&str; 10] = [
    "address",
    "city",
    "state",
    "zip",
    "price",
    "bedrooms",
    "bathrooms",
    "squarefeet",
    "description",
    "mlsnumber",
];

/// One listing: canonical typed fields plus a free-form data bag.
///
/// One record drives one full pass over a recorded trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squarefeet: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mlsnumber: Option<String>,

    /// Arbitrary extra fields. Consulted when a token misses the canonical
    /// map.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, Value>,
}

impl ListingRecord {
    /// Resolve a canonical field by its lower-cased identifier.
    pub fn canonical(&self, field: &str) -> Option<String> {
        match field {
            "address" => self.address.clone(),
            "city" => self.city.clone(),
            "state" => self.state.clone(),
            "zip" => self.zip.clone(),
            "price" => self.price.map(format_number),
            "bedrooms" => self.bedrooms.map(|v| v.to_string()),
            "bathrooms" => self.bathrooms.map(format_number_f64),
            "squarefeet" => self.squarefeet.map(|v| v.to_string()),
            "description" => self.description.clone(),
            "mlsnumber" => self.mlsnumber.clone(),
            _ => None,
        }
    }

    /// Resolve a field: canonical map first, free-form bag second.
    ///
    /// `field` is expected lower-cased by the caller. Bag lookup is also
    /// case-insensitive on key names.
    pub fn lookup(&self, field: &str) -> Option<String> {
        if let Some(value) = self.canonical(field) {
            return Some(value);
        }
        self.data
            .iter()
            .find(|(key, _)| key.to_lowercase() == field)
            .and_then(|(_, value)| value_to_string(value))
    }
}

fn format_number(value: f64) -> String {
    format_number_f64(value)
}

fn format_number_f64(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> ListingRecord {
        ListingRecord {
            address: Some("123 Main St".into()),
            price: Some(450_000.0),
            bathrooms: Some(2.5),
            ..Default::default()
        }
    }

    #[test]
    fn canonical_fields_resolve() {
        let rec = record();
        assert_eq!(rec.lookup("address").as_deref(), Some("123 Main St"));
        assert_eq!(rec.lookup("price").as_deref(), Some("450000"));
        assert_eq!(rec.lookup("bathrooms").as_deref(), Some("2.5"));
    }

    #[test]
    fn bag_lookup_is_case_insensitive_fallback() {
        let mut rec = record();
        rec.data.insert("LotSize".into(), json!("0.4 acres"));
        assert_eq!(rec.lookup("lotsize").as_deref(), Some("0.4 acres"));
    }

    #[test]
    fn missing_fields_return_none() {
        let rec = record();
        assert_eq!(rec.lookup("garage"), None);
        assert_eq!(rec.lookup("city"), None);
    }

    #[test]
    fn non_scalar_bag_values_do_not_resolve() {
        let mut rec = record();
        rec.data.insert("photos".into(), json!(["a.jpg", "b.jpg"]));
        assert_eq!(rec.lookup("photos"), None);
    }
}
