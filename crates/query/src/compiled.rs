use std::fmt;

use kgpath_core::HopSpan;

use crate::ast::{Filter, MatchPattern, Projection};

/// Edge alias between two consecutive concrete nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledEdge {
    pub alias: String,
    pub span: HopSpan,
}

/// Backend-ready query derived from one template. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    node_aliases: Vec<String>,
    bound: Vec<bool>,
    edges: Vec<CompiledEdge>,
    filter: Filter,
    projection_column: String,
    match_clause: String,
    where_clause: String,
    return_clause: String,
    text: String,
}

impl CompiledQuery {
    pub(crate) fn new(
        node_aliases: Vec<String>,
        bound: Vec<bool>,
        edges: Vec<CompiledEdge>,
        pattern: &MatchPattern,
        filter: Filter,
        projection: &Projection,
    ) -> Self {
        let match_clause = pattern.render();
        let where_clause = filter.render();
        let return_clause = projection.render();

        let text = [&match_clause, &where_clause, &return_clause]
            .iter()
            .filter(|clause| !clause.is_empty())
            .map(|clause| clause.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            node_aliases,
            bound,
            edges,
            filter,
            projection_column: projection.column.clone(),
            match_clause,
            where_clause,
            return_clause,
            text,
        }
    }

    /// `n0..n(k-1)`, in template order.
    pub fn node_aliases(&self) -> &[String] {
        &self.node_aliases
    }

    /// Per node alias, whether the position is name- or type-bound.
    pub fn bound_flags(&self) -> &[bool] {
        &self.bound
    }

    pub fn edges(&self) -> &[CompiledEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.node_aliases.len()
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Column holding the projected `{id, bound}` list.
    pub fn projection_column(&self) -> &str {
        &self.projection_column
    }

    pub fn match_clause(&self) -> &str {
        &self.match_clause
    }

    /// Empty when no filter applies.
    pub fn where_clause(&self) -> &str {
        &self.where_clause
    }

    pub fn return_clause(&self) -> &str {
        &self.return_clause
    }

    /// Full query text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
