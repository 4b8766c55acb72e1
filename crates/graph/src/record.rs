use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property bundle as returned by the backend, keyed by field name.
pub type PropertyMap = serde_json::Map<String, Value>;

/// One discovery-path result row: node and edge property bundles.
///
/// `rels` and `supports` are both edge lists; `supports` carries edges
/// returned by support lookups and is assembled the same way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub nodes: Vec<PropertyMap>,
    #[serde(default)]
    pub rels: Vec<PropertyMap>,
    #[serde(default)]
    pub supports: Vec<PropertyMap>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, properties: PropertyMap) -> Self {
        self.nodes.push(properties);
        self
    }

    pub fn with_rel(mut self, properties: PropertyMap) -> Self {
        self.rels.push(properties);
        self
    }

    pub fn with_support(mut self, properties: PropertyMap) -> Self {
        self.supports.push(properties);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.rels.is_empty() && self.supports.is_empty()
    }

    /// All edge bundles, `rels` first.
    pub fn edges(&self) -> impl Iterator<Item = &PropertyMap> {
        self.rels.iter().chain(self.supports.iter())
    }
}

/// Normalise a backend identifier to text.
///
/// Strings are taken as-is and numbers use their decimal rendering;
/// anything else is not an identifier. The JSON kind is not part of the
/// key: `1` and `"1"` name the same node, so a record mixing both kinds
/// for different elements collapses them into one.
pub fn key_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_from_strings_and_numbers() {
        assert_eq!(key_from_value(&json!("MONDO:0004979")), Some("MONDO:0004979".into()));
        assert_eq!(key_from_value(&json!(42)), Some("42".into()));
        assert_eq!(key_from_value(&json!(null)), None);
        assert_eq!(key_from_value(&json!({"id": 1})), None);
    }

    #[test]
    fn numeric_and_textual_ids_share_a_key() {
        assert_eq!(key_from_value(&json!(1)), key_from_value(&json!("1")));
    }

    #[test]
    fn missing_columns_default_to_empty() {
        let record: RawRecord = serde_json::from_value(json!({"nodes": [{"id": "a"}]})).unwrap();
        assert_eq!(record.nodes.len(), 1);
        assert!(record.rels.is_empty());
        assert!(record.supports.is_empty());
        assert!(!record.is_empty());
    }
}
