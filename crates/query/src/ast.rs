//! Clause fragments of a pattern query, rendered to Cypher text last.

use kgpath_core::HopSpan;

/// Cypher string literal with `\` and `'` escaped.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

// ── Match pattern ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEdge {
    pub alias: String,
    pub span: HopSpan,
}

impl PatternEdge {
    fn render(&self) -> String {
        if self.span.is_single() {
            format!("[{}]", self.alias)
        } else {
            format!(
                "[{}*{}..{}]",
                self.alias, self.span.num_nodes_min, self.span.num_nodes_max
            )
        }
    }
}

/// Alternating node and edge aliases, undirected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPattern {
    first: String,
    hops: Vec<(PatternEdge, String)>,
}

impl MatchPattern {
    pub fn new(first: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            hops: Vec::new(),
        }
    }

    pub fn push(&mut self, edge: PatternEdge, node: impl Into<String>) {
        self.hops.push((edge, node.into()));
    }

    pub fn render(&self) -> String {
        let mut out = format!("MATCH ({})", self.first);
        for (edge, node) in &self.hops {
            out.push_str(&format!("-{}-({})", edge.render(), node));
        }
        out
    }
}

// ── Filter predicate ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Property { alias: String, key: String },
    RelType { alias: String },
}

impl Operand {
    fn render(&self) -> String {
        match self {
            Operand::Property { alias, key } => format!("{}.{}", alias, key),
            Operand::RelType { alias } => format!("type({})", alias),
        }
    }
}

/// Equality test against a literal, optionally negated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub operand: Operand,
    pub value: String,
    pub negated: bool,
}

impl Condition {
    pub fn equals(operand: Operand, value: impl Into<String>) -> Self {
        Self {
            operand,
            value: value.into(),
            negated: false,
        }
    }

    pub fn negate_if(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    fn render(&self) -> String {
        let not = if self.negated { "NOT " } else { "" };
        format!("{}{}={}", not, self.operand.render(), quote(&self.value))
    }

    fn is_rel_type(&self) -> bool {
        matches!(self.operand, Operand::RelType { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterGroup {
    /// Alternatives joined by OR.
    AnyOf(Vec<Condition>),
    /// Conditions joined by AND; used for exclusions.
    AllOf(Vec<Condition>),
    /// Every relationship along a variable-length path matches one alternative.
    AllAlong {
        path: String,
        var: String,
        alternatives: Vec<Condition>,
    },
}

impl FilterGroup {
    fn render(&self) -> String {
        match self {
            FilterGroup::AnyOf(conds) => parenthesize(conds, " OR "),
            FilterGroup::AllOf(conds) => parenthesize(conds, " AND "),
            FilterGroup::AllAlong {
                path,
                var,
                alternatives,
            } => format!(
                "ALL({} IN {} WHERE {})",
                var,
                path,
                parenthesize(alternatives, " OR ")
            ),
        }
    }

    fn conditions(&self) -> &[Condition] {
        match self {
            FilterGroup::AnyOf(conds) | FilterGroup::AllOf(conds) => conds,
            FilterGroup::AllAlong { alternatives, .. } => alternatives,
        }
    }
}

fn parenthesize(conds: &[Condition], joiner: &str) -> String {
    let parts: Vec<String> = conds.iter().map(Condition::render).collect();
    format!("({})", parts.join(joiner))
}

/// Conjunction of groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    groups: Vec<FilterGroup>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: FilterGroup) {
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[FilterGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether any group constrains a relationship kind.
    pub fn constrains_relationships(&self) -> bool {
        self.groups
            .iter()
            .any(|g| g.conditions().iter().any(Condition::is_rel_type))
    }

    /// `WHERE ...`, or an empty string when there is nothing to filter.
    pub fn render(&self) -> String {
        if self.groups.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self.groups.iter().map(FilterGroup::render).collect();
        format!("WHERE {}", parts.join(" AND "))
    }
}

// ── Projection ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionItem {
    pub alias: String,
    pub bound: bool,
}

/// A single list-valued column of `{id, bound}` maps, one per node alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub items: Vec<ProjectionItem>,
    pub id_property: String,
    pub column: String,
    pub distinct: bool,
}

impl Projection {
    pub fn render(&self) -> String {
        let items: Vec<String> = self
            .items
            .iter()
            .map(|item| {
                format!(
                    "{{id:{}.{}, bound:{}}}",
                    item.alias, self.id_property, item.bound
                )
            })
            .collect();
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        format!("RETURN {}[{}] AS {}", distinct, items.join(", "), self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(alias: &str, value: &str) -> Condition {
        Condition::equals(
            Operand::Property {
                alias: alias.into(),
                key: "name".into(),
            },
            value,
        )
    }

    fn rel(alias: &str, value: &str) -> Condition {
        Condition::equals(Operand::RelType { alias: alias.into() }, value)
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("asthma"), "'asthma'");
        assert_eq!(quote("crohn's"), r"'crohn\'s'");
        assert_eq!(quote(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn pattern_renders_single_and_ranged_hops() {
        let mut p = MatchPattern::new("n0");
        p.push(PatternEdge { alias: "r01".into(), span: HopSpan::SINGLE }, "n1");
        p.push(PatternEdge { alias: "r12".into(), span: HopSpan::new(1, 3) }, "n2");
        assert_eq!(p.render(), "MATCH (n0)-[r01]-(n1)-[r12*1..3]-(n2)");
    }

    #[test]
    fn lone_node_pattern() {
        assert_eq!(MatchPattern::new("n0").render(), "MATCH (n0)");
    }

    #[test]
    fn filter_groups_and_negation() {
        let mut f = Filter::new();
        f.push(FilterGroup::AnyOf(vec![
            name("n0", "DISEASE.asthma"),
            name("n0", "asthma"),
        ]));
        f.push(FilterGroup::AllOf(vec![
            name("n1", "x").negate_if(true),
            name("n1", "y").negate_if(true),
        ]));
        assert_eq!(
            f.render(),
            "WHERE (n0.name='DISEASE.asthma' OR n0.name='asthma') \
             AND (NOT n1.name='x' AND NOT n1.name='y')"
        );
        assert!(!f.constrains_relationships());
    }

    #[test]
    fn quantified_relationship_group() {
        let mut f = Filter::new();
        f.push(FilterGroup::AllAlong {
            path: "r01".into(),
            var: "r".into(),
            alternatives: vec![rel("r", "Result"), rel("r", "Lookup")],
        });
        assert_eq!(
            f.render(),
            "WHERE ALL(r IN r01 WHERE (type(r)='Result' OR type(r)='Lookup'))"
        );
        assert!(f.constrains_relationships());
    }

    #[test]
    fn empty_filter_renders_nothing() {
        assert_eq!(Filter::new().render(), "");
    }

    #[test]
    fn projection_lists_id_and_bound() {
        let p = Projection {
            items: vec![
                ProjectionItem { alias: "n0".into(), bound: true },
                ProjectionItem { alias: "n1".into(), bound: false },
            ],
            id_property: "id".into(),
            column: "nodes".into(),
            distinct: true,
        };
        assert_eq!(
            p.render(),
            "RETURN DISTINCT [{id:n0.id, bound:true}, {id:n1.id, bound:false}] AS nodes"
        );
    }
}
