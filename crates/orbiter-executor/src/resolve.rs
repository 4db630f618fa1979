use std::collections::BTreeMap;

use orbiter_domain::{Node, Value};
use orbiter_expr::{resolve_value, Lookup, ResolutionContext};
use orbiter_graph::Graph;

/// Bridges the live [`Graph`] to the expression resolver's lookup surface
/// (spec.md §4.2(a)): `kind.name.prop` addresses another node of the
/// current node's own component, `variables.key` addresses the current
/// node's own inputs, `observability.prop` addresses the component's
/// singleton `Observability` node.
pub struct GraphResolutionContext<'a> {
    pub graph: &'a Graph,
    pub current: &'a Node,
}

impl<'a> ResolutionContext for GraphResolutionContext<'a> {
    fn lookup_node_output(&self, kind: &str, name: &str, prop: &str) -> Lookup {
        let target = self
            .graph
            .nodes()
            .find(|n| n.component == self.current.component && n.name == name && n.ty.expr_kind() == Some(kind));
        match target {
            Some(node) => match self.graph.get_completed_output(&node.id, prop) {
                Some(v) => Lookup::Completed(v.clone()),
                None => Lookup::Unavailable,
            },
            None => Lookup::Unavailable,
        }
    }

    fn lookup_own_variable(&self, key: &str) -> Option<Value> {
        self.current.inputs.get(key).cloned()
    }

    fn lookup_observability(&self, prop: &str) -> Option<Value> {
        let obs = self
            .graph
            .nodes()
            .find(|n| n.component == self.current.component && n.ty == orbiter_domain::NodeType::Observability)?;
        self.graph.get_completed_output(&obs.id, prop).cloned()
    }
}

/// Resolve every `${{ }}` template in `node`'s inputs against the live
/// graph, without mutating the graph (spec.md §4.1: "during execution only
/// `outputs` and `state` fields of nodes are mutated").
pub fn resolve_node_inputs(graph: &Graph, node: &Node) -> BTreeMap<String, Value> {
    let ctx = GraphResolutionContext { graph, current: node };
    node.inputs.iter().map(|(k, v)| (k.clone(), resolve_value(v, &ctx))).collect()
}
