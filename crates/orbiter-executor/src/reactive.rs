use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use orbiter_domain::{Action, EnvironmentName, Node, NodeId, NodeState, NodeType, Plan, Value};
use orbiter_graph::Graph;
use orbiter_hooks::Datacenter;
use orbiter_plugin::PluginRegistry;
use orbiter_state::{ComponentState, EnvironmentState, ResourceKey, ResourceState, StateBackend};

use crate::error::ExecutorError;
use crate::observability::enrich_observability_outputs;
use crate::run::{epilogue, preamble, record_failed};
use crate::sequential::run_delete;
use crate::step::{execute_node, StepKind, StepOutcome};
use crate::types::{ExecutionOptions, ExecutionResult, NodeResult, ProgressEvent, ProgressStatus};

struct TaskMessage {
    node_id: NodeId,
    outcome: Result<StepOutcome, ExecutorError>,
}

/// Apply ready nodes concurrently, up to `options.parallelism` in flight at
/// once, cascading a dependency failure through its dependents instead of
/// attempting them (spec.md §4.5 "Reactive driver").
///
/// Deletes carry no live graph edges to reason about, so they run first, in
/// the planner's order, exactly as the sequential driver runs them.
pub async fn run_reactive(
    graph: &mut Graph,
    plan: &Plan,
    datacenter: Arc<dyn Datacenter>,
    plugins: Arc<dyn PluginRegistry>,
    backend: &dyn StateBackend,
    options: &ExecutionOptions,
    cancel: CancellationToken,
) -> Result<ExecutionResult, ExecutorError> {
    let mut state = preamble(backend, &plan.environment, &options.datacenter).await?;
    let mut results = Vec::new();

    for change in plan.changes.iter().filter(|c| c.action == Action::Delete) {
        results.push(run_delete(graph, &mut state, change, datacenter.as_ref(), plugins.as_ref(), &plan.environment, options, cancel.clone()).await);
    }
    if options.stop_on_error && results.iter().any(|r| r.status == ProgressStatus::Failed) {
        epilogue(backend, &mut state, false).await?;
        return Ok(ExecutionResult { state, results });
    }

    let mut pending: HashMap<NodeId, Action> = HashMap::new();
    for change in plan.changes.iter().filter(|c| c.action != Action::Delete) {
        if change.action == Action::Noop {
            let node = graph.get(&change.node_id).expect("plan only references nodes in the graph").clone();
            let outputs = state
                .components
                .get(&node.component)
                .and_then(|c| ResourceKey::lookup(&c.resources, node.ty, &node.name))
                .map(|(_, r)| r.outputs.clone())
                .unwrap_or_default();
            let live = graph.get_mut(&node.id).expect("node exists");
            live.outputs = outputs;
            live.state = NodeState::Completed;
            options.emit(ProgressEvent {
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                node_type: node.ty,
                status: ProgressStatus::Skipped,
                message: "no change".to_string(),
                error: None,
            });
            results.push(NodeResult { node_id: node.id.clone(), action: Action::Noop, status: ProgressStatus::Skipped, error: None });
        } else {
            pending.insert(change.node_id.clone(), change.action);
        }
    }

    let mut completed: HashSet<NodeId> = graph.nodes().filter(|n| n.state == NodeState::Completed).map(|n| n.id.clone()).collect();
    let mut failed: HashSet<NodeId> = HashSet::new();

    let semaphore = Arc::new(Semaphore::new(options.parallelism.max(1)));
    let (tx, mut rx) = mpsc::unbounded_channel::<TaskMessage>();
    let environment = plan.environment.clone();
    let variables = options.datacenter_variables.clone();
    let mut stop_dispatch = false;

    let mut in_flight = dispatch_ready(graph, &mut pending, &completed, &datacenter, &plugins, &semaphore, &tx, &environment, &variables, &cancel);

    while in_flight > 0 {
        let Some(msg) = rx.recv().await else { break };
        in_flight -= 1;

        let node = graph.get(&msg.node_id).expect("node exists").clone();

        match msg.outcome {
            Ok(outcome) => {
                let mut outputs = outcome.outputs.clone();
                if node.ty == NodeType::Observability {
                    let merged = enrich_observability_outputs(
                        &node.component,
                        &plan.environment,
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

                completed.insert(node.id.clone());
                options.emit(ProgressEvent {
                    node_id: node.id.clone(),
                    node_name: node.name.clone(),
                    node_type: node.ty,
                    status: ProgressStatus::Completed,
                    message: "applied".to_string(),
                    error: None,
                });
                results.push(NodeResult { node_id: node.id.clone(), action: Action::Update, status: ProgressStatus::Completed, error: None });
            }
            Err(err) => {
                let message = err.to_string();
                warn!(node = %node.id, error = %message, "node apply failed");
                record_failed(&mut state, graph, &node, message.clone());
                graph.get_mut(&node.id).expect("node exists").state = NodeState::Failed;
                failed.insert(node.id.clone());
                options.emit(ProgressEvent {
                    node_id: node.id.clone(),
                    node_name: node.name.clone(),
                    node_type: node.ty,
                    status: ProgressStatus::Failed,
                    message: message.clone(),
                    error: Some(message.clone()),
                });
                results.push(NodeResult { node_id: node.id.clone(), action: Action::Update, status: ProgressStatus::Failed, error: Some(message) });

                if options.stop_on_error {
                    stop_dispatch = true;
                }
                cascade_fail(graph, &node.id, &mut state, &mut pending, &mut failed, &mut results, options);
            }
        }

        if stop_dispatch {
            let remaining: Vec<NodeId> = pending.keys().cloned().collect();
            for id in remaining {
                pending.remove(&id);
                let n = graph.get(&id).expect("node exists").clone();
                let message = "stopped after earlier failure".to_string();
                record_failed(&mut state, graph, &n, message.clone());
                graph.get_mut(&id).expect("node exists").state = NodeState::Failed;
                failed.insert(id.clone());
                options.emit(ProgressEvent { node_id: id.clone(), node_name: n.name.clone(), node_type: n.ty, status: ProgressStatus::Failed, message: message.clone(), error: Some(message.clone()) });
                results.push(NodeResult { node_id: id, action: Action::Update, status: ProgressStatus::Failed, error: Some(message) });
            }
        } else if !cancel.is_cancelled() {
            in_flight += dispatch_ready(graph, &mut pending, &completed, &datacenter, &plugins, &semaphore, &tx, &environment, &variables, &cancel);
        }
    }

    if !pending.is_empty() {
        let stuck = pending.keys().next().cloned().expect("non-empty");
        warn!(node = %stuck, "reactive driver finished with unresolved pending nodes");
        epilogue(backend, &mut state, false).await?;
        return Err(ExecutorError::UnresolvableDependencies(stuck));
    }

    let succeeded = !cancel.is_cancelled() && results.iter().all(|r| r.status != ProgressStatus::Failed);
    epilogue(backend, &mut state, succeeded).await?;
    Ok(ExecutionResult { state, results })
}

/// Spawn every currently-ready node (all dependencies in `completed`) as an
/// independent task, each bounded by `semaphore`. Nodes are dispatched
/// against a frozen clone of `graph` taken at spawn time: a node only
/// becomes ready once everything it reads has already been written back
/// into `graph`, so the clone can never be stale for its own resolution.
#[allow(clippy::too_many_arguments)]
fn dispatch_ready(
    graph: &Graph,
    pending: &mut HashMap<NodeId, Action>,
    completed: &HashSet<NodeId>,
    datacenter: &Arc<dyn Datacenter>,
    plugins: &Arc<dyn PluginRegistry>,
    semaphore: &Arc<Semaphore>,
    tx: &mpsc::UnboundedSender<TaskMessage>,
    environment: &EnvironmentName,
    variables: &BTreeMap<String, Value>,
    cancel: &CancellationToken,
) -> usize {
    let ready: Vec<NodeId> = pending
        .keys()
        .filter(|id| {
            let node = graph.get(id).expect("pending node exists in graph");
            node.depends_on.iter().all(|dep| completed.contains(dep))
        })
        .cloned()
        .collect();

    for id in &ready {
        pending.remove(id);
    }

    let mut dispatched = 0;
    for node_id in ready {
        let node: Node = graph.get(&node_id).expect("node exists").clone();
        let graph_snapshot = graph.clone();
        let datacenter = Arc::clone(datacenter);
        let plugins = Arc::clone(plugins);
        let environment = environment.clone();
        let variables = variables.clone();
        let permit = Arc::clone(semaphore);
        let tx = tx.clone();
        let cancel = cancel.clone();
        dispatched += 1;
        tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore is never closed");
            let outcome = execute_node(&graph_snapshot, &node, StepKind::Apply, datacenter.as_ref(), plugins.as_ref(), &environment, &variables, cancel).await;
            let _ = tx.send(TaskMessage { node_id: node.id, outcome });
        });
    }
    dispatched
}

/// Propagate a node's failure to its transitive dependents, marking each
/// `Failed` with no plugin call attempted (spec.md §4.5 "cascade pass").
/// Inputs are still resolved against `graph` before the node is marked
/// failed, so the recorded `ResourceState` shows resolved values even though
/// nothing was actually applied (spec.md §4.5.1).
#[allow(clippy::too_many_arguments)]
fn cascade_fail(
    graph: &mut Graph,
    failed_id: &NodeId,
    state: &mut EnvironmentState,
    pending: &mut HashMap<NodeId, Action>,
    failed: &mut HashSet<NodeId>,
    results: &mut Vec<NodeResult>,
    options: &ExecutionOptions,
) {
    let mut queue: VecDeque<NodeId> = graph.get(failed_id).map(|n| n.dependents.iter().cloned().collect()).unwrap_or_default();

    while let Some(id) = queue.pop_front() {
        if !pending.contains_key(&id) {
            continue;
        }
        pending.remove(&id);
        let node = graph.get(&id).expect("node exists").clone();
        let message = format!("dependency {} failed", failed_id);
        record_failed(state, graph, &node, message.clone());
        graph.get_mut(&id).expect("node exists").state = NodeState::Failed;
        failed.insert(id.clone());

        options.emit(ProgressEvent {
            node_id: id.clone(),
            node_name: node.name.clone(),
            node_type: node.ty,
            status: ProgressStatus::Failed,
            message: message.clone(),
            error: Some(message.clone()),
        });
        results.push(NodeResult { node_id: id, action: Action::Update, status: ProgressStatus::Failed, error: Some(message) });

        queue.extend(node.dependents.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use orbiter_domain::{ComponentName, DatacenterName};
    use orbiter_hooks::{Hook, Module};
    use orbiter_plugin::{LocalPlugin, StaticPluginRegistry};
    use orbiter_state::InMemoryBackend;

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

    fn options(parallelism: usize) -> ExecutionOptions {
        let mut opts = ExecutionOptions::new(DatacenterName::new("dc"));
        opts.parallelism = parallelism;
        opts
    }

    #[tokio::test]
    async fn independent_nodes_all_complete() {
        let mut graph = Graph::new();
        for name in ["a", "b", "c"] {
            graph.add_node(Node::new(ComponentName::new("app"), NodeType::Bucket, name)).unwrap();
        }

        let plan = orbiter_planner::plan(&graph, None, EnvironmentName::new("test"), DatacenterName::new("dc"), false).unwrap();
        let dc = Arc::new(FixtureDatacenter::new(vec![]));
        let plugins: Arc<dyn PluginRegistry> = Arc::new(registry());
        let backend = InMemoryBackend::new();
        let opts = options(2);

        let result = run_reactive(&mut graph, &plan, dc, plugins, &backend, &opts, CancellationToken::new()).await.unwrap();
        assert!(result.succeeded());
        assert_eq!(result.results.len(), 3);
    }

    #[tokio::test]
    async fn failure_cascades_to_transitive_dependents() {
        let mut graph = Graph::new();
        let broken = Node::new(ComponentName::new("app"), NodeType::Database, "broken");
        let broken_id = broken.id.clone();
        graph.add_node(broken).unwrap();

        let mut mid = Node::new(ComponentName::new("app"), NodeType::Deployment, "mid");
        let mid_id = mid.id.clone();
        mid.depends_on.insert(broken_id.clone());
        graph.add_node(mid).unwrap();
        graph.add_edge(&mid_id, &broken_id).unwrap();

        let mut leaf = Node::new(ComponentName::new("app"), NodeType::Service, "leaf");
        let leaf_id = leaf.id.clone();
        leaf.depends_on.insert(mid_id.clone());
        graph.add_node(leaf).unwrap();
        graph.add_edge(&leaf_id, &mid_id).unwrap();

        let plan = orbiter_planner::plan(&graph, None, EnvironmentName::new("test"), DatacenterName::new("dc"), false).unwrap();
        let dc = Arc::new(FixtureDatacenter::new(vec![NodeType::Database]));
        let plugins: Arc<dyn PluginRegistry> = Arc::new(registry());
        let backend = InMemoryBackend::new();
        let opts = options(4);

        let result = run_reactive(&mut graph, &plan, dc, plugins, &backend, &opts, CancellationToken::new()).await.unwrap();
        assert!(!result.succeeded());
        let leaf_result = result.results.iter().find(|r| r.node_id == leaf_id).unwrap();
        assert_eq!(leaf_result.status, ProgressStatus::Failed);
    }
}
