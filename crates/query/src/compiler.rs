//! Template → pattern query compilation.
//!
//! Compilation runs in fixed stages: validation, named-node anchoring,
//! wildcard collapsing, alias assignment, then filter/match/projection
//! construction on the [`ast`](crate::ast) fragments.

use kgpath_core::config::CompilerConfig;
use kgpath_core::{HopSpan, NodeSpec, NodeSpecType, QueryTemplate};
use tracing::debug;

use crate::ast::{
    Condition, Filter, FilterGroup, MatchPattern, Operand, PatternEdge, Projection,
    ProjectionItem,
};
use crate::compiled::{CompiledEdge, CompiledQuery};
use crate::error::CompileError;

/// Loop variable used when constraining every hop of a ranged edge.
const PATH_REL_VAR: &str = "r";

/// A concrete template element with the span of the edge leading into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcreteNode {
    pub spec: NodeSpec,
    pub leading_span: HopSpan,
}

/// Compiles [`QueryTemplate`]s. Pure; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    config: CompilerConfig,
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compile(&self, template: &QueryTemplate) -> Result<CompiledQuery, CompileError> {
        validate(template.nodes())?;
        let normalized = anchor_named_nodes(template.nodes());
        let nodes = collapse_wildcards(&normalized)?;

        if nodes.len() > 1 && self.config.edge_kinds.is_empty() {
            return Err(CompileError::NoEdgeKinds);
        }

        let node_aliases: Vec<String> = (0..nodes.len()).map(|i| format!("n{}", i)).collect();
        let edges: Vec<CompiledEdge> = nodes
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, node)| CompiledEdge {
                alias: format!("r{}{}", i - 1, i),
                span: node.leading_span,
            })
            .collect();
        let bound: Vec<bool> = nodes.iter().map(|n| n.spec.is_bound()).collect();

        let mut pattern = MatchPattern::new(node_aliases[0].clone());
        for (edge, alias) in edges.iter().zip(node_aliases.iter().skip(1)) {
            pattern.push(
                PatternEdge {
                    alias: edge.alias.clone(),
                    span: edge.span,
                },
                alias.clone(),
            );
        }

        let mut filter = Filter::new();
        for (node, alias) in nodes.iter().zip(&node_aliases) {
            for group in self.node_groups(&node.spec, alias) {
                filter.push(group);
            }
        }
        for edge in &edges {
            filter.push(self.edge_group(edge));
        }

        let projection = Projection {
            items: node_aliases
                .iter()
                .zip(&bound)
                .map(|(alias, &bound)| ProjectionItem {
                    alias: alias.clone(),
                    bound,
                })
                .collect(),
            id_property: self.config.id_property.clone(),
            column: self.config.projection_column.clone(),
            distinct: true,
        };

        let compiled = CompiledQuery::new(node_aliases, bound, edges, &pattern, filter, &projection);
        debug!(
            nodes = compiled.node_count(),
            edges = compiled.edges().len(),
            query = %compiled.text(),
            "compiled template"
        );
        Ok(compiled)
    }

    fn node_groups(&self, spec: &NodeSpec, alias: &str) -> Vec<FilterGroup> {
        let mut groups = Vec::new();

        if spec.is_bound_name {
            let name = |value: String| {
                Condition::equals(
                    Operand::Property {
                        alias: alias.to_string(),
                        key: self.config.name_property.clone(),
                    },
                    value,
                )
                .negate_if(spec.negate_name)
            };
            let alternatives = vec![
                name(format!("{}.{}", spec.node_type, spec.label)),
                name(spec.label.clone()),
            ];
            // Inclusion matches either spelling (OR). Exclusion negates each
            // condition, so the node must differ from both spellings (AND).
            groups.push(if spec.negate_name {
                FilterGroup::AllOf(alternatives)
            } else {
                FilterGroup::AnyOf(alternatives)
            });
        }

        if spec.is_bound_type {
            let tag: String = spec.node_type.chars().filter(|c| !c.is_whitespace()).collect();
            let cond = Condition::equals(
                Operand::Property {
                    alias: alias.to_string(),
                    key: self.config.type_property.clone(),
                },
                tag,
            )
            .negate_if(spec.negate_type);
            groups.push(FilterGroup::AnyOf(vec![cond]));
        }

        groups
    }

    fn edge_group(&self, edge: &CompiledEdge) -> FilterGroup {
        let kinds = |alias: &str| -> Vec<Condition> {
            self.config
                .edge_kinds
                .iter()
                .map(|kind| {
                    Condition::equals(
                        Operand::RelType {
                            alias: alias.to_string(),
                        },
                        kind.clone(),
                    )
                })
                .collect()
        };

        if edge.span.is_single() {
            FilterGroup::AnyOf(kinds(&edge.alias))
        } else {
            FilterGroup::AllAlong {
                path: edge.alias.clone(),
                var: PATH_REL_VAR.to_string(),
                alternatives: kinds(PATH_REL_VAR),
            }
        }
    }
}

/// Reject malformed templates before any transformation.
pub fn validate(nodes: &[NodeSpec]) -> Result<(), CompileError> {
    if nodes.is_empty() {
        return Err(CompileError::Empty);
    }

    for (position, node) in nodes.iter().enumerate() {
        if let NodeSpecType::Unknown(value) = &node.node_spec_type {
            return Err(CompileError::UnknownNodeSpecType {
                position,
                value: value.clone(),
            });
        }
    }

    for position in 1..nodes.len() {
        if nodes[position - 1].node_spec_type.is_wildcard()
            && nodes[position].node_spec_type.is_wildcard()
        {
            return Err(CompileError::AdjacentWildcards { position });
        }
    }

    if !nodes.iter().any(|n| n.node_spec_type.is_concrete()) {
        return Err(CompileError::NoConcreteNodes);
    }

    if let Some(position) = nodes
        .iter()
        .position(|n| n.node_spec_type.is_concrete() && n.is_bound_name && n.label.trim().is_empty())
    {
        return Err(CompileError::MissingLabel { position });
    }

    let last = nodes.len() - 1;
    for (position, node) in nodes.iter().enumerate() {
        if !node.node_spec_type.is_wildcard() {
            continue;
        }
        if position == 0 || position == last {
            return Err(CompileError::DanglingWildcard { position });
        }
        let span = node.meta.ok_or(CompileError::MissingSpan { position })?;
        if span.num_nodes_min > span.num_nodes_max {
            return Err(CompileError::InvalidSpan {
                position,
                min: span.num_nodes_min,
                max: span.num_nodes_max,
            });
        }
    }

    Ok(())
}

/// Name-binding normalisation.
///
/// When the last element is a NamedNode the anchoring pass runs on the
/// reversed list first, then forward; otherwise it runs forward only.
/// Exactly one or two passes, independent of length.
pub fn anchor_named_nodes(nodes: &[NodeSpec]) -> Vec<NodeSpec> {
    let mut out = nodes.to_vec();
    let trailing_named = matches!(
        out.last().map(|n| &n.node_spec_type),
        Some(NodeSpecType::NamedNode)
    );

    if trailing_named {
        out.reverse();
        anchoring_pass(&mut out);
        out.reverse();
    }
    anchoring_pass(&mut out);
    out
}

/// One left-to-right pass.
///
/// A pass that starts on a NamedNode is anchored: every labelled concrete
/// element after it is name-bound. Otherwise only labelled NamedNodes bind
/// their own name. Flags are only ever set.
fn anchoring_pass(nodes: &mut [NodeSpec]) {
    let anchored = matches!(
        nodes.first().map(|n| &n.node_spec_type),
        Some(NodeSpecType::NamedNode)
    );

    for node in nodes.iter_mut() {
        if node.label.is_empty() {
            continue;
        }
        match node.node_spec_type {
            NodeSpecType::NamedNode => node.is_bound_name = true,
            NodeSpecType::TypedNode if anchored => node.is_bound_name = true,
            _ => {}
        }
    }
}

/// Drop wildcard entries, attaching each one's span to the next concrete node.
///
/// Concrete nodes without a preceding wildcard get [`HopSpan::SINGLE`].
pub fn collapse_wildcards(nodes: &[NodeSpec]) -> Result<Vec<ConcreteNode>, CompileError> {
    let mut out = Vec::with_capacity(nodes.len());
    let mut pending: Option<HopSpan> = None;

    for (position, node) in nodes.iter().enumerate() {
        match &node.node_spec_type {
            NodeSpecType::UnspecifiedNodes => {
                if pending.is_some() {
                    return Err(CompileError::AdjacentWildcards { position });
                }
                pending = Some(node.meta.ok_or(CompileError::MissingSpan { position })?);
            }
            NodeSpecType::NamedNode | NodeSpecType::TypedNode => out.push(ConcreteNode {
                spec: node.clone(),
                leading_span: pending.take().unwrap_or(HopSpan::SINGLE),
            }),
            NodeSpecType::Unknown(value) => {
                return Err(CompileError::UnknownNodeSpecType {
                    position,
                    value: value.clone(),
                })
            }
        }
    }

    if out.is_empty() {
        return Err(CompileError::NoConcreteNodes);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(nodes: Vec<NodeSpec>) -> Result<CompiledQuery, CompileError> {
        QueryCompiler::default().compile(&QueryTemplate::new(nodes))
    }

    #[test]
    fn single_concrete_node() {
        let q = compile(vec![NodeSpec::typed("DISEASE")]).unwrap();
        assert_eq!(q.node_aliases(), ["n0"]);
        assert!(q.edges().is_empty());
        assert!(!q.filter().constrains_relationships());
        assert_eq!(
            q.text(),
            "MATCH (n0) WHERE (n0.node_type='DISEASE') RETURN DISTINCT [{id:n0.id, bound:true}] AS nodes"
        );
    }

    #[test]
    fn unbound_single_node_has_no_where() {
        let q = compile(vec![NodeSpec::typed("DISEASE").with_bound_type(false)]).unwrap();
        assert_eq!(q.where_clause(), "");
        assert_eq!(
            q.text(),
            "MATCH (n0) RETURN DISTINCT [{id:n0.id, bound:false}] AS nodes"
        );
    }

    #[test]
    fn disease_to_drug_scenario() {
        let q = compile(vec![NodeSpec::typed("DISEASE"), NodeSpec::typed("DRUG")]).unwrap();

        assert_eq!(q.node_aliases(), ["n0", "n1"]);
        assert_eq!(
            q.edges(),
            [CompiledEdge { alias: "r01".into(), span: HopSpan::SINGLE }]
        );
        assert_eq!(q.bound_flags(), [true, true]);
        assert_eq!(q.match_clause(), "MATCH (n0)-[r01]-(n1)");
        assert_eq!(
            q.where_clause(),
            "WHERE (n0.node_type='DISEASE') AND (n1.node_type='DRUG') \
             AND (type(r01)='Result' OR type(r01)='Lookup')"
        );
        assert_eq!(
            q.return_clause(),
            "RETURN DISTINCT [{id:n0.id, bound:true}, {id:n1.id, bound:true}] AS nodes"
        );
        assert_eq!(q.filter().groups().len(), 3);
    }

    #[test]
    fn wildcard_becomes_edge_span() {
        let q = compile(vec![
            NodeSpec::named("DISEASE", "asthma"),
            NodeSpec::unspecified(2, 4),
            NodeSpec::typed("GENE"),
        ])
        .unwrap();

        assert_eq!(q.node_count(), 2);
        assert_eq!(q.edges()[0].span, HopSpan::new(2, 4));
        assert_eq!(q.match_clause(), "MATCH (n0)-[r01*2..4]-(n1)");
        assert!(q
            .where_clause()
            .ends_with("ALL(r IN r01 WHERE (type(r)='Result' OR type(r)='Lookup'))"));
    }

    #[test]
    fn named_node_binds_qualified_and_bare_name() {
        let q = compile(vec![
            NodeSpec::named("DISEASE", "asthma").with_bound_type(true),
        ])
        .unwrap();
        assert_eq!(
            q.where_clause(),
            "WHERE (n0.name='DISEASE.asthma' OR n0.name='asthma') AND (n0.node_type='DISEASE')"
        );
    }

    #[test]
    fn type_tag_whitespace_is_stripped() {
        let q = compile(vec![NodeSpec::typed("GENETIC CONDITION")]).unwrap();
        assert!(q.where_clause().contains("n0.node_type='GENETICCONDITION'"));
    }

    #[test]
    fn negation_is_per_condition() {
        let q = compile(vec![
            NodeSpec::typed("DISEASE"),
            NodeSpec::named("DRUG", "aspirin").negating_name().with_bound_type(true),
        ])
        .unwrap();
        let w = q.where_clause();
        assert!(w.contains("(NOT n1.name='DRUG.aspirin' AND NOT n1.name='aspirin')"));
        assert!(w.contains("(n1.node_type='DRUG')"));
    }

    #[test]
    fn compilation_is_deterministic() {
        let nodes = vec![
            NodeSpec::named("DISEASE", "asthma"),
            NodeSpec::unspecified(1, 3),
            NodeSpec::typed("GENE"),
            NodeSpec::typed("DRUG"),
        ];
        let a = compile(nodes.clone()).unwrap();
        let b = compile(nodes).unwrap();
        assert_eq!(a.text(), b.text());
        assert_eq!(a, b);
    }

    #[test]
    fn four_nodes_alias_numbering() {
        let q = compile(vec![
            NodeSpec::typed("A"),
            NodeSpec::typed("B"),
            NodeSpec::unspecified(1, 2),
            NodeSpec::typed("C"),
            NodeSpec::typed("D"),
        ])
        .unwrap();
        let aliases: Vec<&str> = q.edges().iter().map(|e| e.alias.as_str()).collect();
        assert_eq!(aliases, ["r01", "r12", "r23"]);
        assert_eq!(q.edges()[1].span, HopSpan::new(1, 2));
        assert_eq!(q.edges()[2].span, HopSpan::SINGLE);
    }

    #[test]
    fn adjacent_wildcards_are_rejected() {
        let err = compile(vec![
            NodeSpec::typed("DISEASE"),
            NodeSpec::unspecified(1, 2),
            NodeSpec::unspecified(1, 2),
            NodeSpec::typed("DRUG"),
        ])
        .unwrap_err();
        assert_eq!(err, CompileError::AdjacentWildcards { position: 2 });
    }

    #[test]
    fn malformed_templates() {
        assert_eq!(compile(vec![]).unwrap_err(), CompileError::Empty);
        assert_eq!(
            compile(vec![NodeSpec::unspecified(1, 2)]).unwrap_err(),
            CompileError::NoConcreteNodes
        );
        assert_eq!(
            compile(vec![NodeSpec::unspecified(1, 2), NodeSpec::typed("DRUG")]).unwrap_err(),
            CompileError::DanglingWildcard { position: 0 }
        );
        assert_eq!(
            compile(vec![NodeSpec::typed("DRUG"), NodeSpec::unspecified(1, 2)]).unwrap_err(),
            CompileError::DanglingWildcard { position: 1 }
        );
        assert_eq!(
            compile(vec![
                NodeSpec::typed("A"),
                NodeSpec::unspecified(3, 1),
                NodeSpec::typed("B"),
            ])
            .unwrap_err(),
            CompileError::InvalidSpan { position: 1, min: 3, max: 1 }
        );

        let mut no_meta = NodeSpec::unspecified(1, 1);
        no_meta.meta = None;
        assert_eq!(
            compile(vec![NodeSpec::typed("A"), no_meta, NodeSpec::typed("B")]).unwrap_err(),
            CompileError::MissingSpan { position: 1 }
        );
    }

    #[test]
    fn name_bound_node_needs_a_label() {
        assert_eq!(
            compile(vec![NodeSpec::named("DISEASE", "")]).unwrap_err(),
            CompileError::MissingLabel { position: 0 }
        );
        assert_eq!(
            compile(vec![
                NodeSpec::typed("DISEASE"),
                NodeSpec::typed("DRUG").with_label("  ").with_bound_name(true),
            ])
            .unwrap_err(),
            CompileError::MissingLabel { position: 1 }
        );
    }

    #[test]
    fn negated_name_group_excludes_both_spellings() {
        let q = compile(vec![NodeSpec::named("DRUG", "aspirin").negating_name()]).unwrap();
        match &q.filter().groups()[0] {
            FilterGroup::AllOf(conds) => {
                assert_eq!(conds.len(), 2);
                assert!(conds.iter().all(|c| c.negated));
            }
            other => panic!("unexpected group: {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_names_position() {
        let mut odd = NodeSpec::typed("DRUG");
        odd.node_spec_type = NodeSpecType::Unknown("Fuzzy Node".into());
        let err = compile(vec![NodeSpec::typed("DISEASE"), odd]).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownNodeSpecType { position: 1, value: "Fuzzy Node".into() }
        );
    }

    #[test]
    fn empty_edge_kinds_are_rejected_only_with_edges() {
        let compiler = QueryCompiler::new(CompilerConfig {
            edge_kinds: vec![],
            ..CompilerConfig::default()
        });
        let one = QueryTemplate::new(vec![NodeSpec::typed("A")]);
        let two = QueryTemplate::new(vec![NodeSpec::typed("A"), NodeSpec::typed("B")]);
        assert!(compiler.compile(&one).is_ok());
        assert_eq!(compiler.compile(&two).unwrap_err(), CompileError::NoEdgeKinds);
    }

    #[test]
    fn trailing_named_node_anchors_backwards() {
        let nodes = vec![
            NodeSpec::typed("DISEASE").with_label("asthma"),
            NodeSpec::typed("GENE"),
            NodeSpec::named("DRUG", "albuterol").with_bound_name(false),
        ];
        let out = anchor_named_nodes(&nodes);
        assert!(out[0].is_bound_name, "labelled typed node bound by the trailing anchor");
        assert!(!out[1].is_bound_name, "unlabelled nodes stay free");
        assert!(out[2].is_bound_name);
    }

    #[test]
    fn leading_named_node_anchors_forwards() {
        let nodes = vec![
            NodeSpec::named("DISEASE", "asthma").with_bound_name(false),
            NodeSpec::typed("DRUG").with_label("albuterol"),
        ];
        let out = anchor_named_nodes(&nodes);
        assert!(out[0].is_bound_name);
        assert!(out[1].is_bound_name);
    }

    #[test]
    fn mid_template_named_node_binds_only_itself() {
        let nodes = vec![
            NodeSpec::typed("DISEASE").with_label("asthma"),
            NodeSpec::named("GENE", "IL4").with_bound_name(false),
            NodeSpec::typed("DRUG").with_label("albuterol"),
        ];
        let out = anchor_named_nodes(&nodes);
        assert!(!out[0].is_bound_name);
        assert!(out[1].is_bound_name);
        assert!(!out[2].is_bound_name);
    }

    #[test]
    fn anchoring_never_clears_flags() {
        let nodes = vec![NodeSpec::typed("DRUG").with_bound_name(true)];
        assert!(anchor_named_nodes(&nodes)[0].is_bound_name);
    }

    #[test]
    fn collapse_defaults_to_single_hop() {
        let nodes = vec![
            NodeSpec::typed("A"),
            NodeSpec::unspecified(0, 2),
            NodeSpec::typed("B"),
            NodeSpec::typed("C"),
        ];
        let collapsed = collapse_wildcards(&nodes).unwrap();
        let spans: Vec<HopSpan> = collapsed.iter().map(|n| n.leading_span).collect();
        assert_eq!(spans, [HopSpan::SINGLE, HopSpan::new(0, 2), HopSpan::SINGLE]);
    }
}
