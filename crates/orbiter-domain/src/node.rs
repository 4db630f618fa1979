use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{ComponentName, NodeId, Value};

/// The closed set of resource types the core understands (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Database,
    DatabaseUser,
    Bucket,
    Deployment,
    Function,
    Service,
    Route,
    Cronjob,
    DockerBuild,
    Task,
    EncryptionKey,
    Smtp,
    Observability,
    NetworkPolicy,
}

impl NodeType {
    /// The lowercase token used in node ids and in `${{ kind.name.prop }}`
    /// expression `kind` segments.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Database => "database",
            NodeType::DatabaseUser => "database_user",
            NodeType::Bucket => "bucket",
            NodeType::Deployment => "deployment",
            NodeType::Function => "function",
            NodeType::Service => "service",
            NodeType::Route => "route",
            NodeType::Cronjob => "cronjob",
            NodeType::DockerBuild => "docker_build",
            NodeType::Task => "task",
            NodeType::EncryptionKey => "encryption_key",
            NodeType::Smtp => "smtp",
            NodeType::Observability => "observability",
            NodeType::NetworkPolicy => "network_policy",
        }
    }

    /// The expression-language `kind` plural used in `${{ kind.name.prop }}`
    /// references (spec.md §4.2(a)). `None` for types with no interpolation
    /// mapping.
    pub fn expr_kind(&self) -> Option<&'static str> {
        match self {
            NodeType::DockerBuild => Some("builds"),
            NodeType::Database => Some("databases"),
            NodeType::Service => Some("services"),
            NodeType::Bucket => Some("buckets"),
            NodeType::Route => Some("routes"),
            NodeType::Observability => Some("observability"),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Monotonic per-run lifecycle state (spec.md §3): `Pending -> Running ->
/// Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeState::Pending => "pending",
            NodeState::Running => "running",
            NodeState::Completed => "completed",
            NodeState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One resource in the dependency graph (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub ty: NodeType,
    pub component: ComponentName,
    pub name: String,
    pub inputs: BTreeMap<String, Value>,
    pub outputs: BTreeMap<String, Value>,
    pub depends_on: BTreeSet<NodeId>,
    pub dependents: BTreeSet<NodeId>,
    pub state: NodeState,
}

impl Node {
    pub fn new(component: ComponentName, ty: NodeType, name: impl Into<String>) -> Self {
        let name = name.into();
        let id = NodeId::new(&component, ty, &name);
        Node {
            id,
            ty,
            component,
            name,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            depends_on: BTreeSet::new(),
            dependents: BTreeSet::new(),
            state: NodeState::Pending,
        }
    }

    pub fn with_inputs(mut self, inputs: BTreeMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }
}
