use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::TemplateError;

/// JSON keys a node spec document may carry. Anything else is ignored with a warning.
pub const NODE_SPEC_FIELDS: &[&str] = &[
    "nodeSpecType",
    "type",
    "label",
    "isBoundName",
    "isBoundType",
    "meta",
    "negateName",
    "negateType",
];

/// File name looked up when a template is loaded from a directory.
pub const TEMPLATE_FILE_NAME: &str = "query.json";

// ── NodeSpecType ──────────────────────────────────────────────

/// Kind of a single template element.
///
/// Decoding never fails on an unrecognised kind: the raw text is kept in
/// [`NodeSpecType::Unknown`] so the compiler can report the position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeSpecType {
    NamedNode,
    UnspecifiedNodes,
    TypedNode,
    Unknown(String),
}

impl NodeSpecType {
    /// Wildcard hop-span entries carry no alias of their own.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, NodeSpecType::UnspecifiedNodes)
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, NodeSpecType::NamedNode | NodeSpecType::TypedNode)
    }
}

impl From<String> for NodeSpecType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Named Node" | "NamedNode" => NodeSpecType::NamedNode,
            "Unspecified Nodes" | "UnspecifiedNodes" => NodeSpecType::UnspecifiedNodes,
            "Typed Node" | "TypedNode" => NodeSpecType::TypedNode,
            _ => NodeSpecType::Unknown(value),
        }
    }
}

impl From<NodeSpecType> for String {
    fn from(value: NodeSpecType) -> Self {
        match value {
            NodeSpecType::NamedNode => "Named Node".to_string(),
            NodeSpecType::UnspecifiedNodes => "Unspecified Nodes".to_string(),
            NodeSpecType::TypedNode => "Typed Node".to_string(),
            NodeSpecType::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for NodeSpecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeSpecType::NamedNode => write!(f, "Named Node"),
            NodeSpecType::UnspecifiedNodes => write!(f, "Unspecified Nodes"),
            NodeSpecType::TypedNode => write!(f, "Typed Node"),
            NodeSpecType::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

// ── HopSpan ───────────────────────────────────────────────────

/// Inclusive bounds on how many edges a path segment may span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HopSpan {
    pub num_nodes_min: u32,
    pub num_nodes_max: u32,
}

impl HopSpan {
    /// A direct edge between two consecutive concrete nodes.
    pub const SINGLE: HopSpan = HopSpan {
        num_nodes_min: 1,
        num_nodes_max: 1,
    };

    pub fn new(min: u32, max: u32) -> Self {
        Self {
            num_nodes_min: min,
            num_nodes_max: max,
        }
    }

    pub fn is_single(&self) -> bool {
        self.num_nodes_min == 1 && self.num_nodes_max == 1
    }
}

impl Default for HopSpan {
    fn default() -> Self {
        HopSpan::SINGLE
    }
}

// ── NodeSpec ──────────────────────────────────────────────────

/// One element of a query template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub node_spec_type: NodeSpecType,
    /// Semantic category, e.g. "DISEASE" or "DRUG".
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub node_type: String,
    /// Concrete bound name, when the element names one.
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_bound_name: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_bound_type: bool,
    /// Hop span of an `UnspecifiedNodes` element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<HopSpan>,
    /// Exclude matches on the name instead of requiring them.
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "null_as_default")]
    pub negate_name: bool,
    /// Exclude matches on the type tag instead of requiring them.
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "null_as_default")]
    pub negate_type: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Explicit `null` decodes like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl NodeSpec {
    fn base(node_spec_type: NodeSpecType, node_type: &str, label: &str) -> Self {
        Self {
            node_spec_type,
            node_type: node_type.to_string(),
            label: label.to_string(),
            is_bound_name: false,
            is_bound_type: false,
            meta: None,
            negate_name: false,
            negate_type: false,
        }
    }

    /// A specific entity of the given category, bound by name.
    pub fn named(node_type: &str, label: &str) -> Self {
        let mut spec = Self::base(NodeSpecType::NamedNode, node_type, label);
        spec.is_bound_name = true;
        spec
    }

    /// Any entity of the given category, bound by type.
    pub fn typed(node_type: &str) -> Self {
        let mut spec = Self::base(NodeSpecType::TypedNode, node_type, "");
        spec.is_bound_type = true;
        spec
    }

    /// A wildcard standing for `min..=max` hops.
    pub fn unspecified(min: u32, max: u32) -> Self {
        let mut spec = Self::base(NodeSpecType::UnspecifiedNodes, "", "");
        spec.meta = Some(HopSpan::new(min, max));
        spec
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_bound_name(mut self, bound: bool) -> Self {
        self.is_bound_name = bound;
        self
    }

    pub fn with_bound_type(mut self, bound: bool) -> Self {
        self.is_bound_type = bound;
        self
    }

    pub fn negating_name(mut self) -> Self {
        self.negate_name = true;
        self
    }

    pub fn negating_type(mut self) -> Self {
        self.negate_type = true;
        self
    }

    /// Whether the compiled projection reports this position as bound.
    pub fn is_bound(&self) -> bool {
        self.is_bound_name || self.is_bound_type
    }
}

// ── QueryTemplate ─────────────────────────────────────────────

/// Ordered chain of node constraints and wildcard hop spans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryTemplate {
    nodes: Vec<NodeSpec>,
}

/// A JSON key that ingestion skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredField {
    pub position: usize,
    pub field: String,
}

/// Result of lenient template ingestion.
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    pub template: QueryTemplate,
    pub ignored: Vec<IgnoredField>,
}

impl QueryTemplate {
    pub fn new(nodes: Vec<NodeSpec>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<NodeSpec> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn concrete_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.node_spec_type.is_concrete())
            .count()
    }

    /// Decode a JSON array of node specs, ignoring unknown keys.
    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        Ok(parse_template(json)?.template)
    }

    /// Load a template from a JSON file, or from `query.json` inside a directory.
    pub fn load(path: impl AsRef<Path>) -> Result<ParsedTemplate, TemplateError> {
        let path = path.as_ref();
        let file = if path.is_dir() {
            path.join(TEMPLATE_FILE_NAME)
        } else {
            path.to_path_buf()
        };
        let json = std::fs::read_to_string(&file)?;
        parse_template(&json)
    }

    /// SHA-256 hex digest of the canonical JSON encoding.
    ///
    /// Equal templates always share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&encoded);
        format!("{digest:x}")
    }
}

impl From<Vec<NodeSpec>> for QueryTemplate {
    fn from(nodes: Vec<NodeSpec>) -> Self {
        Self::new(nodes)
    }
}

impl FromIterator<NodeSpec> for QueryTemplate {
    fn from_iter<I: IntoIterator<Item = NodeSpec>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Decode a template document, collecting (and logging) unrecognised keys.
pub fn parse_template(json: &str) -> Result<ParsedTemplate, TemplateError> {
    let raw: Value = serde_json::from_str(json)?;
    parse_template_value(raw)
}

/// Same as [`parse_template`], starting from an already-parsed JSON value.
pub fn parse_template_value(raw: Value) -> Result<ParsedTemplate, TemplateError> {
    let items = match raw {
        Value::Array(items) => items,
        other => return Err(TemplateError::NotAnArray(json_kind(&other).to_string())),
    };

    let mut nodes = Vec::with_capacity(items.len());
    let mut ignored = Vec::new();

    for (position, item) in items.into_iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or(TemplateError::NotAnObject { position })?;

        for key in obj.keys() {
            if !NODE_SPEC_FIELDS.contains(&key.as_str()) {
                warn!(position, field = %key, "JSON field ignored");
                ignored.push(IgnoredField {
                    position,
                    field: key.clone(),
                });
            }
        }

        nodes.push(serde_json::from_value::<NodeSpec>(item)?);
    }

    Ok(ParsedTemplate {
        template: QueryTemplate::new(nodes),
        ignored,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISEASE_TO_DRUG: &str = r#"[
        {"nodeSpecType": "Named Node", "type": "DISEASE", "label": "asthma",
         "isBoundName": true, "isBoundType": false},
        {"nodeSpecType": "Unspecified Nodes", "meta": {"numNodesMin": 1, "numNodesMax": 3}},
        {"nodeSpecType": "Typed Node", "type": "DRUG", "isBoundName": false, "isBoundType": true}
    ]"#;

    #[test]
    fn decodes_wire_spellings() {
        let template = QueryTemplate::from_json_str(DISEASE_TO_DRUG).unwrap();
        assert_eq!(template.len(), 3);
        assert_eq!(template.concrete_count(), 2);

        let nodes = template.nodes();
        assert_eq!(nodes[0].node_spec_type, NodeSpecType::NamedNode);
        assert_eq!(nodes[0].node_type, "DISEASE");
        assert_eq!(nodes[0].label, "asthma");
        assert!(nodes[0].is_bound_name);
        assert_eq!(nodes[1].meta, Some(HopSpan::new(1, 3)));
        assert!(nodes[2].is_bound_type);
        assert!(nodes[2].label.is_empty());
    }

    #[test]
    fn null_fields_decode_as_absent() {
        let json = r#"[{"nodeSpecType": "Typed Node", "type": "DRUG", "label": null,
                        "isBoundName": null, "isBoundType": true, "negateName": null}]"#;
        let template = QueryTemplate::from_json_str(json).unwrap();
        let node = &template.nodes()[0];
        assert!(node.label.is_empty());
        assert!(!node.is_bound_name);
        assert!(node.is_bound_type);
        assert!(!node.negate_name);

        let json = r#"[{"nodeSpecType": "Typed Node", "type": null}]"#;
        assert!(QueryTemplate::from_json_str(json).unwrap().nodes()[0].node_type.is_empty());
    }

    #[test]
    fn identifier_spellings_are_accepted() {
        let json = r#"[{"nodeSpecType": "TypedNode", "type": "GENE"}]"#;
        let template = QueryTemplate::from_json_str(json).unwrap();
        assert_eq!(template.nodes()[0].node_spec_type, NodeSpecType::TypedNode);
    }

    #[test]
    fn unknown_kind_is_kept_for_the_compiler() {
        let json = r#"[{"nodeSpecType": "Mystery Node"}]"#;
        let template = QueryTemplate::from_json_str(json).unwrap();
        assert_eq!(
            template.nodes()[0].node_spec_type,
            NodeSpecType::Unknown("Mystery Node".into())
        );
    }

    #[test]
    fn unknown_fields_are_reported_not_rejected() {
        let json = r#"[
            {"nodeSpecType": "Typed Node", "type": "DRUG", "color": "red"},
            {"nodeSpecType": "Typed Node", "type": "GENE", "x": 1, "y": 2}
        ]"#;
        let parsed = parse_template(json).unwrap();
        assert_eq!(parsed.template.len(), 2);
        assert_eq!(
            parsed.ignored,
            vec![
                IgnoredField { position: 0, field: "color".into() },
                IgnoredField { position: 1, field: "x".into() },
                IgnoredField { position: 1, field: "y".into() },
            ]
        );
    }

    #[test]
    fn rejects_non_array_documents() {
        let err = parse_template(r#"{"nodeSpecType": "Typed Node"}"#).unwrap_err();
        assert!(matches!(err, TemplateError::NotAnArray(ref kind) if kind == "object"));

        let err = parse_template("[1]").unwrap_err();
        assert!(matches!(err, TemplateError::NotAnObject { position: 0 }));
    }

    #[test]
    fn missing_kind_is_a_json_error() {
        let err = parse_template(r#"[{"type": "DRUG"}]"#).unwrap_err();
        assert!(matches!(err, TemplateError::Json(_)));
    }

    #[test]
    fn load_from_directory_reads_query_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TEMPLATE_FILE_NAME), DISEASE_TO_DRUG).unwrap();

        let from_dir = QueryTemplate::load(dir.path()).unwrap();
        let from_file = QueryTemplate::load(dir.path().join(TEMPLATE_FILE_NAME)).unwrap();
        assert_eq!(from_dir.template, from_file.template);
        assert!(from_dir.ignored.is_empty());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = QueryTemplate::load(dir.path()).unwrap_err();
        assert!(matches!(err, TemplateError::Io(_)));
    }

    #[test]
    fn fingerprint_tracks_equality() {
        let a = QueryTemplate::from_json_str(DISEASE_TO_DRUG).unwrap();
        let b = QueryTemplate::from_json_str(DISEASE_TO_DRUG).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let c: QueryTemplate = vec![NodeSpec::typed("DRUG")].into();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn serialization_uses_wire_names() {
        let template: QueryTemplate = vec![NodeSpec::unspecified(2, 4)].into();
        let json = serde_json::to_value(&template).unwrap();
        assert_eq!(json[0]["nodeSpecType"], "Unspecified Nodes");
        assert_eq!(json[0]["meta"]["numNodesMax"], 4);
        assert!(json[0].get("negateName").is_none());
    }

    #[test]
    fn bound_combines_name_and_type() {
        assert!(NodeSpec::named("DISEASE", "asthma").is_bound());
        assert!(NodeSpec::typed("DRUG").is_bound());
        assert!(!NodeSpec::typed("DRUG").with_bound_type(false).is_bound());
    }
}
