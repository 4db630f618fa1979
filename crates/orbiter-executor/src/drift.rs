use std::collections::BTreeMap;

use orbiter_domain::{ComponentName, EnvironmentName, Node, NodeId, NodeType, Value};
use orbiter_graph::Graph;
use orbiter_hooks::Datacenter;
use orbiter_plugin::{PluginError, PluginRegistry};
use orbiter_state::{EnvironmentState, Status};
use tokio_util::sync::CancellationToken;

use crate::error::ExecutorError;
use crate::step::observe_node;

/// One resource's observed-vs-recorded drift (spec.md §10.1). `outputs_changed`
/// is a cheap inequality check against the last recorded outputs; a full
/// property-level diff is the planner's job on the next `plan`, not this
/// read-only sweep's.
#[derive(Debug, Clone)]
pub struct DriftEntry {
    pub node_id: NodeId,
    pub component: ComponentName,
    pub ty: NodeType,
    pub name: String,
    pub exists: bool,
    pub healthy: bool,
    pub outputs_changed: bool,
}

/// Observe every `Ready` resource recorded in `state` through its plugin's
/// read-only path, without mutating `state` or `graph` (spec.md §10.1). A
/// plugin that reports `ObserveUnsupported` is skipped rather than failing
/// the whole sweep, since not every plugin has a drift story.
pub async fn drift_report(
    graph: &Graph,
    state: &EnvironmentState,
    datacenter: &dyn Datacenter,
    plugins: &dyn PluginRegistry,
    environment: &EnvironmentName,
    variables: &BTreeMap<String, Value>,
) -> Result<Vec<DriftEntry>, ExecutorError> {
    let mut entries = Vec::new();

    for component in state.components.values() {
        for resource in component.resources.values() {
            if resource.status != Status::Ready {
                continue;
            }

            let node = Node::new(resource.component.clone(), resource.ty, &resource.name).with_inputs(resource.inputs.clone());
            let node_id = node.id.clone();

            let observed = match observe_node(graph, &node, resource, datacenter, plugins, environment, variables, CancellationToken::new()).await {
                Ok(observed) => observed,
                Err(ExecutorError::Plugin(PluginError::ObserveUnsupported(_))) => continue,
                Err(err) => return Err(err),
            };

            let outputs_changed = observed.outputs.len() != resource.outputs.len()
                || observed.outputs.iter().any(|(k, v)| resource.outputs.get(k) != Some(&v.value));

            entries.push(DriftEntry {
                node_id,
                component: resource.component.clone(),
                ty: resource.ty,
                name: resource.name.clone(),
                exists: observed.exists,
                healthy: observed.healthy,
                outputs_changed,
            });
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use orbiter_domain::NodeType;
    use orbiter_hooks::{Hook, Module};
    use orbiter_plugin::{LocalPlugin, Plugin, StaticPluginRegistry};
    use orbiter_state::{ComponentState, ResourceKey, ResourceState};

    struct FixtureDatacenter {
        hook: Hook,
        root: PathBuf,
    }

    impl FixtureDatacenter {
        fn new() -> Self {
            FixtureDatacenter {
                hook: Hook {
                    when: String::new(),
                    modules: vec![Module {
                        name: "m".to_string(),
                        plugin: "native".to_string(),
                        build_path: Some("m".to_string()),
                        source_path: None,
                        inputs: BTreeMap::new(),
                    }],
                    outputs: BTreeMap::new(),
                    error: None,
                },
                root: PathBuf::from("/dc"),
            }
        }
    }

    impl Datacenter for FixtureDatacenter {
        fn hooks_for(&self, _ty: NodeType) -> &[Hook] {
            std::slice::from_ref(&self.hook)
        }

        fn source_path(&self) -> &Path {
            &self.root
        }
    }

    #[tokio::test]
    async fn observed_resource_with_matching_outputs_reports_no_change() {
        let graph = Graph::new();
        let mut registry = StaticPluginRegistry::new();
        registry.register(std::sync::Arc::new(LocalPlugin::new()));

        let mut inputs = BTreeMap::new();
        inputs.insert("name".to_string(), Value::from("prod-app-main"));
        let plugin = LocalPlugin::new();
        let run_options = orbiter_plugin::RunOptions { module_path: PathBuf::from("m"), inputs: inputs.clone(), environment: BTreeMap::new(), state_reader: None };
        let applied = plugin.apply(run_options, CancellationToken::new()).await.unwrap();
        let outputs: BTreeMap<String, Value> = applied.outputs.iter().map(|(k, v)| (k.clone(), v.value.clone())).collect();

        let mut state = EnvironmentState::new(EnvironmentName::new("prod"), orbiter_domain::DatacenterName::new("dc"));
        let mut component_state = ComponentState::new(ComponentName::new("app"));
        component_state.resources.insert(
            ResourceKey::new(NodeType::Database, "main"),
            ResourceState::applied(ComponentName::new("app"), "main".to_string(), NodeType::Database, inputs, outputs, applied.state, None, chrono::Utc::now()),
        );
        state.components.insert(ComponentName::new("app"), component_state);

        let dc = FixtureDatacenter::new();
        let entries = drift_report(&graph, &state, &dc, &registry, &EnvironmentName::new("prod"), &BTreeMap::new()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].exists);
        assert!(!entries[0].outputs_changed);
    }
}
