use std::path::Path;

use serde::{Deserialize, Serialize};

use orbiter_domain::{NodeType, Value};

/// One IaC module a hook can invoke (spec.md §3 `Module`). `inputs` holds
/// the raw `${{ }}`/predicate-language expression source for each input
/// key, evaluated by the binder against the node's own inputs and the run's
/// variables (spec.md §4.3 step 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default = "default_plugin")]
    pub plugin: String,
    pub build_path: Option<String>,
    pub source_path: Option<String>,
    #[serde(default)]
    pub inputs: std::collections::BTreeMap<String, String>,
}

fn default_plugin() -> String {
    "native".to_string()
}

/// A datacenter's response to one node type: a predicate plus the module
/// chain to run when it matches (spec.md §3 `Hook`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    #[serde(default)]
    pub when: String,
    pub modules: Vec<Module>,
    #[serde(default)]
    pub outputs: std::collections::BTreeMap<String, String>,
    pub error: Option<String>,
}

/// The datacenter surface the binder reads (spec.md §6 "Datacenter"):
/// an ordered hook list per node type, plus the path hooks' relative
/// module paths are resolved against.
pub trait Datacenter: Send + Sync {
    fn hooks_for(&self, ty: NodeType) -> &[Hook];
    fn source_path(&self) -> &Path;

    /// Datacenter-provided observability attributes (spec.md §4.6), in any
    /// of the three accepted shapes: a `map<string,string>`/`map<string,Any>`
    /// (`Value::Map`) or an already-formatted `"k=v,k2=v2"` string
    /// (`Value::String`). `None` if the datacenter declares nothing.
    fn observability_attributes(&self) -> Option<&Value> {
        None
    }
}
