use serde::{Deserialize, Serialize};

/// A component name as declared in the component front end.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentName(pub String);

impl ComponentName {
    pub fn new(s: impl Into<String>) -> Self {
        ComponentName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ComponentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnvironmentName(pub String);

impl EnvironmentName {
    pub fn new(s: impl Into<String>) -> Self {
        EnvironmentName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatacenterName(pub String);

impl DatacenterName {
    pub fn new(s: impl Into<String>) -> Self {
        DatacenterName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatacenterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical `component/type/name` node identifier.
///
/// `Ord` is derived from the string form so that `BTreeSet<NodeId>` and
/// `BinaryHeap<Reverse<NodeId>>` give the lexicographic tie-break the
/// planner and the graph's topological sort both require.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Build the canonical id for a node. `observability` nodes are one per
    /// component and always use the fixed name `observability`.
    pub fn new(component: &ComponentName, ty: crate::NodeType, name: &str) -> Self {
        NodeId(format!("{}/{}/{}", component.as_str(), ty.as_str(), name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
