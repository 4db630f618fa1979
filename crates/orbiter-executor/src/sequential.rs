use std::collections::BTreeMap;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use orbiter_domain::{Action, EnvironmentName, Node, NodeState, NodeType, Plan, Value};
use orbiter_graph::Graph;
use orbiter_hooks::Datacenter;
use orbiter_plugin::PluginRegistry;
use orbiter_state::{ComponentState, EnvironmentState, ResourceKey, ResourceState, StateBackend};

use crate::error::ExecutorError;
use crate::observability::enrich_observability_outputs;
use crate::run::{epilogue, preamble, record_failed};
use crate::step::{execute_node, StepKind};
use crate::types::{ExecutionOptions, ExecutionResult, NodeResult, ProgressEvent, ProgressStatus};

/// Iterate `plan.changes` in order, resolving, binding, and applying each
/// one, short-circuiting dependents of a failed node (spec.md §4.5
/// "Sequential driver").
pub async fn run_sequential(
    graph: &mut Graph,
    plan: &Plan,
    datacenter: &dyn Datacenter,
    plugins: &dyn PluginRegistry,
    backend: &dyn StateBackend,
    options: &ExecutionOptions,
    cancel: CancellationToken,
) -> Result<ExecutionResult, ExecutorError> {
    let mut state = preamble(backend, &plan.environment, &options.datacenter).await?;
    let mut results = Vec::new();

    for change in &plan.changes {
        if cancel.is_cancelled() {
            break;
        }

        if change.action == Action::Delete {
            results.push(run_delete(graph, &mut state, change, datacenter, plugins, &plan.environment, options, cancel.clone()).await);
            if matches!(results.last(), Some(r) if r.status == ProgressStatus::Failed) && options.stop_on_error {
                break;
            }
            continue;
        }

        let node = graph.get(&change.node_id).expect("plan only references nodes in the graph").clone();

        if let Some(failed_dep) = node.depends_on.iter().find(|dep| graph.get(dep).map(|n| n.state == NodeState::Failed).unwrap_or(false)) {
            let failed_dep = failed_dep.clone();
            let message = format!("dependency {} failed", failed_dep);
            record_failed(&mut state, graph, &node, message.clone());
            graph.get_mut(&node.id).expect("node exists").state = NodeState::Failed;
            options.emit(ProgressEvent {
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                node_type: node.ty,
                status: ProgressStatus::Failed,
                message: message.clone(),
                error: Some(message.clone()),
            });
            results.push(NodeResult { node_id: node.id.clone(), action: change.action, status: ProgressStatus::Failed, error: Some(message) });
            if options.stop_on_error {
                break;
            }
            continue;
        }

        if change.action == Action::Noop {
            apply_noop(graph, &state, &node);
            options.emit(ProgressEvent {
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                node_type: node.ty,
                status: ProgressStatus::Skipped,
                message: "no change".to_string(),
                error: None,
            });
            results.push(NodeResult { node_id: node.id.clone(), action: change.action, status: ProgressStatus::Skipped, error: None });
            continue;
        }

        options.emit(ProgressEvent {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            node_type: node.ty,
            status: ProgressStatus::Running,
            message: "applying".to_string(),
            error: None,
        });

        let result = run_apply(graph, &mut state, &node, datacenter, plugins, &plan.environment, options, cancel.clone()).await;
        let failed = result.status == ProgressStatus::Failed;
        results.push(result);
        if failed && options.stop_on_error {
            break;
        }
    }

    let succeeded = results.iter().all(|r| r.status != ProgressStatus::Failed);
    epilogue(backend, &mut state, succeeded && !cancel.is_cancelled()).await?;
    Ok(ExecutionResult { state, results })
}

fn apply_noop(graph: &mut Graph, state: &EnvironmentState, node: &Node) {
    let outputs = state
        .components
        .get(&node.component)
        .and_then(|c| ResourceKey::lookup(&c.resources, node.ty, &node.name))
        .map(|(_, r)| r.outputs.clone())
        .unwrap_or_default();
    let live = graph.get_mut(&node.id).expect("node exists");
    live.outputs = outputs;
    live.state = NodeState::Completed;
}

async fn run_apply(
    graph: &mut Graph,
    state: &mut EnvironmentState,
    node: &Node,
    datacenter: &dyn Datacenter,
    plugins: &dyn PluginRegistry,
    environment: &EnvironmentName,
    options: &ExecutionOptions,
    cancel: CancellationToken,
) -> NodeResult {
    let outcome = execute_node(graph, node, StepKind::Apply, datacenter, plugins, environment, &options.datacenter_variables, cancel).await;

    match outcome {
        Ok(outcome) => {
            let mut outputs = outcome.outputs.clone();
            if node.ty == NodeType::Observability {
                let merged = enrich_observability_outputs(
                    &node.component,
                    environment,
                    datacenter.observability_attributes(),
                    outcome.resolved_inputs.get("attributes"),
                );
                outputs.insert("attributes".to_string(), Value::String(merged));
            }

            {
                let live = graph.get_mut(&node.id).expect("node exists");
                live.outputs = outputs.clone();
                live.state = NodeState::Completed;
            }

            let previous = state
                .components
                .get(&node.component)
                .and_then(|c| ResourceKey::lookup(&c.resources, node.ty, &node.name))
                .map(|(_, r)| r.clone());
            let component_state = state.components.entry(node.component.clone()).or_insert_with(|| ComponentState::new(node.component.clone()));
            component_state.resources.insert(
                ResourceKey::new(node.ty, &node.name),
                ResourceState::applied(node.component.clone(), node.name.clone(), node.ty, outcome.resolved_inputs, outputs, outcome.iac_state, previous.as_ref(), Utc::now()),
            );
            component_state.updated_at = Utc::now();

            options.emit(ProgressEvent {
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                node_type: node.ty,
                status: ProgressStatus::Completed,
                message: "applied".to_string(),
                error: None,
            });
            NodeResult { node_id: node.id.clone(), action: Action::Update, status: ProgressStatus::Completed, error: None }
        }
        Err(err) => {
            let message = err.to_string();
            warn!(node = %node.id, error = %message, "node apply failed");
            record_failed(state, graph, node, message.clone());
            graph.get_mut(&node.id).expect("node exists").state = NodeState::Failed;
            options.emit(ProgressEvent {
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                node_type: node.ty,
                status: ProgressStatus::Failed,
                message: message.clone(),
                error: Some(message.clone()),
            });
            NodeResult { node_id: node.id.clone(), action: Action::Update, status: ProgressStatus::Failed, error: Some(message) }
        }
    }
}

pub(crate) async fn run_delete(
    graph: &Graph,
    state: &mut EnvironmentState,
    change: &orbiter_domain::ResourceChange,
    datacenter: &dyn Datacenter,
    plugins: &dyn PluginRegistry,
    environment: &EnvironmentName,
    options: &ExecutionOptions,
    cancel: CancellationToken,
) -> NodeResult {
    let name = change.node_id.as_str().rsplit('/').next().unwrap_or_default();
    let key = ResourceKey::new(change.node_type, name);

    let existing = state
        .components
        .get(&change.component)
        .and_then(|c| ResourceKey::lookup(&c.resources, change.node_type, name))
        .map(|(_, r)| r.clone());

    let Some(existing) = existing else {
        warn!(node = %change.node_id, "planned delete has no recorded resource state, skipping");
        return NodeResult { node_id: change.node_id.clone(), action: Action::Delete, status: ProgressStatus::Skipped, error: None };
    };

    let synthetic = Node::new(change.component.clone(), change.node_type, name).with_inputs(existing.inputs.clone());
    let outcome = execute_node(graph, &synthetic, StepKind::Destroy { existing: &existing }, datacenter, plugins, environment, &options.datacenter_variables, cancel).await;

    match outcome {
        Ok(_) => {
            state.remove_resource(&change.component, &key);
            options.emit(ProgressEvent {
                node_id: change.node_id.clone(),
                node_name: name.to_string(),
                node_type: change.node_type,
                status: ProgressStatus::Completed,
                message: "destroyed".to_string(),
                error: None,
            });
            debug!(node = %change.node_id, "resource destroyed");
            NodeResult { node_id: change.node_id.clone(), action: Action::Delete, status: ProgressStatus::Completed, error: None }
        }
        Err(err) => {
            let message = err.to_string();
            options.emit(ProgressEvent {
                node_id: change.node_id.clone(),
                node_name: name.to_string(),
                node_type: change.node_type,
                status: ProgressStatus::Failed,
                message: message.clone(),
                error: Some(message.clone()),
            });
            NodeResult { node_id: change.node_id.clone(), action: Action::Delete, status: ProgressStatus::Failed, error: Some(message) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use orbiter_domain::{ComponentName, DatacenterName, NodeType};
    use orbiter_hooks::{Hook, Module};
    use orbiter_plugin::{LocalPlugin, StaticPluginRegistry};
    use orbiter_state::InMemoryBackend;

    /// A datacenter that hands out a trivial "native" hook for every node
    /// type except those listed in `no_hooks` (used to force a bind
    /// failure on a specific node).
    struct FixtureDatacenter {
        hook: Hook,
        no_hooks: Vec<NodeType>,
        root: PathBuf,
    }

    impl FixtureDatacenter {
        fn new(no_hooks: Vec<NodeType>) -> Self {
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
                no_hooks,
                root: PathBuf::from("/dc"),
            }
        }
    }

    impl Datacenter for FixtureDatacenter {
        fn hooks_for(&self, ty: NodeType) -> &[Hook] {
            if self.no_hooks.contains(&ty) {
                &[]
            } else {
                std::slice::from_ref(&self.hook)
            }
        }

        fn source_path(&self) -> &Path {
            &self.root
        }
    }

    fn registry() -> StaticPluginRegistry {
        let mut registry = StaticPluginRegistry::new();
        registry.register(std::sync::Arc::new(LocalPlugin::new()));
        registry
    }

    fn options() -> ExecutionOptions {
        ExecutionOptions::new(DatacenterName::new("dc"))
    }

    #[tokio::test]
    async fn applies_a_two_node_chain_in_order() {
        let mut graph = Graph::new();
        let db = Node::new(ComponentName::new("app"), NodeType::Database, "main");
        let db_id = db.id.clone();
        graph.add_node(db).unwrap();

        let mut deploy = Node::new(ComponentName::new("app"), NodeType::Deployment, "api");
        deploy.inputs.insert("db_host".to_string(), Value::from("${{ databases.main.host }}"));
        let deploy_id = deploy.id.clone();
        graph.add_node(deploy).unwrap();
        graph.add_edge(&deploy_id, &db_id).unwrap();

        let plan = orbiter_planner::plan(&graph, None, EnvironmentName::new("test"), DatacenterName::new("dc"), false).unwrap();
        let dc = FixtureDatacenter::new(vec![]);
        let plugins = registry();
        let backend = InMemoryBackend::new();
        let opts = options();

        let result = run_sequential(&mut graph, &plan, &dc, &plugins, &backend, &opts, CancellationToken::new()).await.unwrap();
        assert!(result.succeeded());
        let app = result.state.components.get(&ComponentName::new("app")).unwrap();
        assert_eq!(app.resources.len(), 2);
    }

    #[tokio::test]
    async fn dependent_of_a_failed_node_is_skipped_without_attempting_apply() {
        let mut graph = Graph::new();
        let broken = Node::new(ComponentName::new("app"), NodeType::Database, "broken");
        let broken_id = broken.id.clone();
        graph.add_node(broken).unwrap();

        let mut deploy = Node::new(ComponentName::new("app"), NodeType::Deployment, "api");
        let deploy_id = deploy.id.clone();
        deploy.depends_on.insert(broken_id.clone());
        graph.add_node(deploy).unwrap();
        graph.add_edge(&deploy_id, &broken_id).unwrap();

        let plan = orbiter_planner::plan(&graph, None, EnvironmentName::new("test"), DatacenterName::new("dc"), false).unwrap();
        let dc = FixtureDatacenter::new(vec![NodeType::Database]);
        let plugins = registry();
        let backend = InMemoryBackend::new();
        let opts = options();

        let result = run_sequential(&mut graph, &plan, &dc, &plugins, &backend, &opts, CancellationToken::new()).await.unwrap();
        assert!(!result.succeeded());
        let deploy_result = result.results.iter().find(|r| r.node_id == deploy_id).unwrap();
        assert_eq!(deploy_result.status, ProgressStatus::Failed);
        assert!(deploy_result.error.as_ref().unwrap().contains("dependency"));
    }
}
