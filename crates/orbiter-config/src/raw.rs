use std::collections::BTreeMap;

use serde::Deserialize;

use orbiter_domain::{NodeType, Value};
use orbiter_hooks::Hook;

/// Raw YAML representation of a component file (`components/<name>/component.yml`).
#[derive(Debug, Deserialize)]
pub struct RawComponent {
    pub name: String,
    #[serde(default)]
    pub resources: Vec<RawResource>,
}

#[derive(Debug, Deserialize)]
pub struct RawResource {
    #[serde(rename = "type")]
    pub ty: NodeType,
    pub name: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    /// Explicit `type/name` references, for dependencies a node's inputs
    /// don't already express through a `${{ }}` template (rare — most edges
    /// are inferred from the templates themselves, see `loader::infer_edges`).
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Raw YAML representation of the datacenter file (`datacenter.yml`).
#[derive(Debug, Deserialize)]
pub struct RawDatacenter {
    pub name: String,
    #[serde(default = "default_source_path")]
    pub source_path: String,
    #[serde(default)]
    pub hooks: BTreeMap<NodeType, Vec<Hook>>,
    #[serde(default)]
    pub observability_attributes: Option<Value>,
}

fn default_source_path() -> String {
    ".".to_string()
}

/// Raw YAML representation of the environment file (`environment.yml`).
#[derive(Debug, Deserialize)]
pub struct RawEnvironment {
    pub name: String,
    pub datacenter: String,
    #[serde(default)]
    pub force_update: bool,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}
