mod error;

pub use error::GraphError;

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use orbiter_domain::{Node, NodeId, NodeType, Value};

/// The typed dependency graph (spec.md §3 `Graph`).
///
/// Nodes live in a contiguous arena (`Vec<Node>`); edges are `NodeId` sets
/// on each node rather than pointers, per Design Note §9 ("use an arena...
/// this removes the cycle and makes the graph trivially shareable between
/// planner and executor").
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateNodeId(node.id));
        }
        let idx = self.nodes.len();
        self.index.insert(node.id.clone(), idx);
        self.nodes.push(node);
        Ok(())
    }

    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId) -> Result<(), GraphError> {
        let from_idx = *self
            .index
            .get(from)
            .ok_or_else(|| GraphError::UnknownNode(from.clone()))?;
        let to_idx = *self
            .index
            .get(to)
            .ok_or_else(|| GraphError::UnknownNode(to.clone()))?;
        self.nodes[from_idx].depends_on.insert(to.clone());
        self.nodes[to_idx].dependents.insert(from.clone());
        Ok(())
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        if let Some(&i) = self.index.get(id) {
            Some(&mut self.nodes[i])
        } else {
            None
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes_of_type(&self, ty: NodeType) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.ty == ty).collect()
    }

    /// Read an output property of `id` only if that node has completed
    /// (spec.md §4.1 `get_completed_output`); used by the expression
    /// resolver's component-interpolation lookups.
    pub fn get_completed_output(&self, id: &NodeId, prop: &str) -> Option<&Value> {
        let node = self.get(id)?;
        if node.state != orbiter_domain::NodeState::Completed {
            return None;
        }
        node.outputs.get(prop)
    }

    /// Kahn's algorithm. Ties among equally-ready nodes break by
    /// lexicographic `id` so ordering is deterministic (spec.md §4.1).
    pub fn topological_sort(&self) -> Result<Vec<NodeId>, GraphError> {
        self.kahn()
    }

    /// The reverse of [`Graph::topological_sort`] — used for destroy plans
    /// (spec.md §3 `Plan`, §4.4 step 5).
    pub fn reverse_topological_sort(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut order = self.topological_sort()?;
        order.reverse();
        Ok(order)
    }

    fn kahn(&self) -> Result<Vec<NodeId>, GraphError> {
        // in_degree counts unresolved dependencies in the apply direction:
        // a node is ready once every node it depends_on has been emitted.
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        for n in &self.nodes {
            in_degree.insert(n.id.clone(), n.depends_on.len());
        }

        let mut ready: BinaryHeap<Reverse<NodeId>> = BinaryHeap::new();
        for n in &self.nodes {
            if n.depends_on.is_empty() {
                ready.push(Reverse(n.id.clone()));
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut seen: HashSet<NodeId> = HashSet::new();

        while let Some(Reverse(id)) = ready.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            order.push(id.clone());

            let node = self.get(&id).expect("id came from this graph's index");
            for dependent in &node.dependents {
                let deg = in_degree.get_mut(dependent).expect("dependent exists");
                *deg -= 1;
                if *deg == 0 {
                    ready.push(Reverse(dependent.clone()));
                }
            }
        }

        if order.len() != self.nodes.len() {
            let mut remaining: Vec<NodeId> = self
                .nodes
                .iter()
                .map(|n| n.id.clone())
                .filter(|id| !seen.contains(id))
                .collect();
            remaining.sort();
            return Err(GraphError::Cycle(remaining));
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbiter_domain::ComponentName;

    fn node(component: &str, ty: NodeType, name: &str) -> Node {
        Node::new(ComponentName::new(component), ty, name)
    }

    #[test]
    fn topo_sort_orders_dependency_before_dependent() {
        let mut g = Graph::new();
        let db = node("app", NodeType::Database, "main");
        let deploy = node("app", NodeType::Deployment, "api");
        let db_id = db.id.clone();
        let deploy_id = deploy.id.clone();
        g.add_node(db).unwrap();
        g.add_node(deploy).unwrap();
        g.add_edge(&deploy_id, &db_id).unwrap();

        let order = g.topological_sort().unwrap();
        let pos_db = order.iter().position(|n| n == &db_id).unwrap();
        let pos_deploy = order.iter().position(|n| n == &deploy_id).unwrap();
        assert!(pos_db < pos_deploy);
    }

    #[test]
    fn topo_sort_is_deterministic_for_unrelated_nodes() {
        let mut g = Graph::new();
        g.add_node(node("app", NodeType::Bucket, "z")).unwrap();
        g.add_node(node("app", NodeType::Bucket, "a")).unwrap();
        g.add_node(node("app", NodeType::Bucket, "m")).unwrap();

        let order = g.topological_sort().unwrap();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted, "ties must break lexicographically by id");
    }

    #[test]
    fn cycle_is_detected() {
        let mut g = Graph::new();
        let a = node("app", NodeType::Service, "a");
        let b = node("app", NodeType::Service, "b");
        let a_id = a.id.clone();
        let b_id = b.id.clone();
        g.add_node(a).unwrap();
        g.add_node(b).unwrap();
        g.add_edge(&a_id, &b_id).unwrap();
        g.add_edge(&b_id, &a_id).unwrap();

        let result = g.topological_sort();
        assert!(matches!(result, Err(GraphError::Cycle(_))));
    }

    #[test]
    fn add_edge_rejects_unknown_node() {
        let mut g = Graph::new();
        let a = node("app", NodeType::Service, "a");
        let a_id = a.id.clone();
        g.add_node(a).unwrap();
        let unknown = NodeId::new(&ComponentName::new("app"), NodeType::Service, "nope");
        assert!(matches!(
            g.add_edge(&a_id, &unknown),
            Err(GraphError::UnknownNode(_))
        ));
    }

    #[test]
    fn reverse_topological_sort_is_exact_reverse() {
        let mut g = Graph::new();
        let db = node("app", NodeType::Database, "main");
        let deploy = node("app", NodeType::Deployment, "api");
        let db_id = db.id.clone();
        let deploy_id = deploy.id.clone();
        g.add_node(db).unwrap();
        g.add_node(deploy).unwrap();
        g.add_edge(&deploy_id, &db_id).unwrap();

        let fwd = g.topological_sort().unwrap();
        let rev = g.reverse_topological_sort().unwrap();
        let mut fwd_reversed = fwd.clone();
        fwd_reversed.reverse();
        assert_eq!(rev, fwd_reversed);
    }

    #[test]
    fn duplicate_node_id_rejected() {
        let mut g = Graph::new();
        g.add_node(node("app", NodeType::Service, "a")).unwrap();
        let dup = node("app", NodeType::Service, "a");
        assert!(matches!(g.add_node(dup), Err(GraphError::DuplicateNodeId(_))));
    }
}
