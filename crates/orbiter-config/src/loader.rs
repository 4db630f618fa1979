use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use orbiter_domain::{ComponentName, DatacenterName, EnvironmentName, Node, NodeId, NodeType, Value};
use orbiter_graph::Graph;

use crate::datacenter::YamlDatacenter;
use crate::error::ConfigError;
use crate::raw::{RawComponent, RawDatacenter, RawEnvironment, RawResource};

/// Everything `orbiter-cli` needs to drive a run, assembled from one
/// workspace directory (spec.md §10 "front-end loader").
pub struct LoadedWorkspace {
    pub graph: Graph,
    pub environment: EnvironmentName,
    pub datacenter_name: DatacenterName,
    pub datacenter: YamlDatacenter,
    pub variables: BTreeMap<String, Value>,
    pub force_update: bool,
}

/// Load a workspace directory laid out as:
///
/// ```text
/// <dir>/
///   environment.yml        <- RawEnvironment
///   datacenter.yml          <- RawDatacenter
///   components/
///     <name>/
///       component.yml       <- RawComponent
///       <nested>/...        <- recursed into, same as components/<name>
/// ```
pub fn load_workspace(dir: &Path) -> Result<LoadedWorkspace, ConfigError> {
    let environment = read_yaml::<RawEnvironment>(&dir.join("environment.yml"))?;
    let raw_dc = read_yaml::<RawDatacenter>(&dir.join("datacenter.yml"))?;

    let mut components = Vec::new();
    let components_dir = dir.join("components");
    if components_dir.is_dir() {
        collect_components(&components_dir, &mut components)?;
    }

    let mut graph = Graph::new();
    for raw in &components {
        let component = ComponentName::new(raw.name.clone());
        for res in &raw.resources {
            let node = Node::new(component.clone(), res.ty, res.name.clone()).with_inputs(res.inputs.clone());
            graph.add_node(node)?;
        }
    }

    for raw in &components {
        let component = ComponentName::new(raw.name.clone());
        for res in &raw.resources {
            let from = NodeId::new(&component, res.ty, &res.name);
            for to in resource_dependencies(&component, res) {
                debug!(from = %from, to = %to, "wiring dependency edge");
                graph.add_edge(&from, &to)?;
            }
        }
    }

    let source_path = dir.join(&raw_dc.source_path);
    let datacenter = YamlDatacenter::new(raw_dc.hooks, source_path, raw_dc.observability_attributes);

    Ok(LoadedWorkspace {
        graph,
        environment: EnvironmentName::new(environment.name),
        datacenter_name: DatacenterName::new(raw_dc.name),
        datacenter,
        variables: environment.variables,
        force_update: environment.force_update,
    })
}

fn collect_components(dir: &Path, out: &mut Vec<RawComponent>) -> Result<(), ConfigError> {
    let config_path = dir.join("component.yml");
    if config_path.exists() {
        let component = read_yaml::<RawComponent>(&config_path)?;
        debug!(path = %config_path.display(), "loaded component");
        out.push(component);
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::Io { path: dir.display().to_string(), source: e })?;
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::Io { path: dir.display().to_string(), source: e })?;
        let path = entry.path();
        if path.is_dir() {
            collect_components(&path, out)?;
        }
    }
    Ok(())
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io { path: path.display().to_string(), source: e })?;
    serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse { path: path.display().to_string(), source: e })
}

/// The dependency edges a resource needs: every explicit `type/name` entry
/// in `depends_on`, plus every node an interpolation template in its inputs
/// references (spec.md §4.2(a) `kind.name.prop`) — the same templates the
/// expression resolver reads back out at execution time, so a node that
/// references another one's output always has the edge that makes that
/// output available.
fn resource_dependencies(component: &ComponentName, res: &RawResource) -> Vec<NodeId> {
    let mut ids = Vec::new();

    for explicit in &res.depends_on {
        if let Some((ty, name)) = explicit.split_once('/') {
            if let Some(ty) = node_type_from_str(ty) {
                ids.push(NodeId::new(component, ty, name));
            }
        }
    }

    for (kind, name) in referenced_nodes(&res.inputs) {
        if let Some(ty) = node_type_from_kind(&kind) {
            ids.push(NodeId::new(component, ty, &name));
        }
    }

    ids.sort();
    ids.dedup();
    ids
}

/// Walk every string leaf of `inputs` looking for `${{ kind.name.prop }}`
/// templates, returning the `(kind, name)` pairs found.
fn referenced_nodes(inputs: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for v in inputs.values() {
        scan_value(v, &mut out);
    }
    out
}

fn scan_value(v: &Value, out: &mut Vec<(String, String)>) {
    match v {
        Value::String(s) => scan_string(s, out),
        Value::List(items) => items.iter().for_each(|i| scan_value(i, out)),
        Value::Map(m) => m.values().for_each(|i| scan_value(i, out)),
        _ => {}
    }
}

fn scan_string(s: &str, out: &mut Vec<(String, String)>) {
    let mut search_from = 0;
    while let Some(rel_start) = s[search_from..].find("${{") {
        let body_start = search_from + rel_start + 3;
        let Some(rel_end) = s[body_start..].find("}}") else { break };
        let body_end = body_start + rel_end;
        let path = s[body_start..body_end].trim();
        let segments: Vec<&str> = path.split('.').collect();
        if let [kind, name, _prop] = segments.as_slice() {
            out.push((kind.to_string(), name.to_string()));
        }
        search_from = body_end + 2;
    }
}

fn node_type_from_kind(kind: &str) -> Option<NodeType> {
    match kind {
        "builds" => Some(NodeType::DockerBuild),
        "databases" => Some(NodeType::Database),
        "services" => Some(NodeType::Service),
        "buckets" => Some(NodeType::Bucket),
        "routes" => Some(NodeType::Route),
        "observability" => Some(NodeType::Observability),
        _ => None,
    }
}

fn node_type_from_str(ty: &str) -> Option<NodeType> {
    match ty {
        "database" => Some(NodeType::Database),
        "database_user" => Some(NodeType::DatabaseUser),
        "bucket" => Some(NodeType::Bucket),
        "deployment" => Some(NodeType::Deployment),
        "function" => Some(NodeType::Function),
        "service" => Some(NodeType::Service),
        "route" => Some(NodeType::Route),
        "cronjob" => Some(NodeType::Cronjob),
        "docker_build" => Some(NodeType::DockerBuild),
        "task" => Some(NodeType::Task),
        "encryption_key" => Some(NodeType::EncryptionKey),
        "smtp" => Some(NodeType::Smtp),
        "observability" => Some(NodeType::Observability),
        "network_policy" => Some(NodeType::NetworkPolicy),
        _ => None,
    }
}
