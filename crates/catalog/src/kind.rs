use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Number of leading label characters that identify a template kind.
const KIND_PREFIX_LEN: usize = 7;

/// Kinds of stored query templates, recognised by label prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TemplateKind {
    /// `Query1_*`: a single disease.
    Query1,
    /// `Query2_*`: a disease and a drug.
    Query2,
    /// `Query2a*`: a phenotype and a drug.
    Query2a,
}

/// One lookup a template kind needs: output field and the node type tag holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLookup {
    pub field: &'static str,
    pub node_type: &'static str,
}

const DISEASE: FieldLookup = FieldLookup {
    field: "disease",
    node_type: "NAME.DISEASE",
};
const PHENOTYPE: FieldLookup = FieldLookup {
    field: "phenotype",
    node_type: "NAME.DISEASE",
};
const DRUG: FieldLookup = FieldLookup {
    field: "drug",
    node_type: "NAME.DRUG",
};

impl TemplateKind {
    /// Classify a label by its first seven characters.
    pub fn detect(label: &str) -> Option<Self> {
        match label.get(..KIND_PREFIX_LEN)? {
            "Query1_" => Some(TemplateKind::Query1),
            "Query2_" => Some(TemplateKind::Query2),
            "Query2a" => Some(TemplateKind::Query2a),
            _ => None,
        }
    }

    /// Kind name as the catalog reports it: the label text before the first `_`.
    ///
    /// Usually equal to [`TemplateKind::as_str`], but `Query2aX_...` reports `Query2aX`.
    pub fn reported_name(label: &str) -> &str {
        label.split('_').next().unwrap_or(label)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Query1 => "Query1",
            TemplateKind::Query2 => "Query2",
            TemplateKind::Query2a => "Query2a",
        }
    }

    /// Lookups run for a label of this kind, in output order.
    pub fn lookups(&self) -> &'static [FieldLookup] {
        match self {
            TemplateKind::Query1 => &[DISEASE],
            TemplateKind::Query2 => &[DISEASE, DRUG],
            TemplateKind::Query2a => &[PHENOTYPE, DRUG],
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered query template: its kind, its label, and the looked-up values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDescriptor {
    pub kind: TemplateKind,
    /// Label text before the first `_`.
    pub kind_name: String,
    /// The catalog label itself.
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl TemplateDescriptor {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
