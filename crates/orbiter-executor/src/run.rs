use orbiter_domain::{DatacenterName, EnvironmentName, Node};
use orbiter_graph::Graph;
use orbiter_state::{ComponentState, EnvironmentState, ResourceKey, ResourceState, StateBackend, Status};
use tracing::info;

use crate::error::ExecutorError;
use crate::resolve::resolve_node_inputs;

/// Load-or-create the run's `EnvironmentState` and mark it `Provisioning`
/// (spec.md §4.5, shared by both drivers).
pub(crate) async fn preamble(
    backend: &dyn StateBackend,
    environment: &EnvironmentName,
    datacenter: &DatacenterName,
) -> Result<EnvironmentState, ExecutorError> {
    let mut state = match backend.get_environment(environment).await? {
        Some(existing) => existing,
        None => {
            info!(environment = %environment, "no prior state, creating new environment");
            EnvironmentState::new(environment.clone(), datacenter.clone())
        }
    };
    state.status = Status::Provisioning;
    backend.save_environment(&state).await?;
    Ok(state)
}

/// Set the final status and flush (spec.md §4.5, shared by both drivers;
/// also the path used on cancellation).
pub(crate) async fn epilogue(
    backend: &dyn StateBackend,
    state: &mut EnvironmentState,
    succeeded: bool,
) -> Result<(), ExecutorError> {
    state.status = if succeeded { Status::Ready } else { Status::Failed };
    state.updated_at = chrono::Utc::now();
    backend.save_environment(state).await?;
    info!(environment = %state.name, status = ?state.status, "run finished");
    Ok(())
}

/// Record a `Status::Failed` [`ResourceState`] for a node that never applied
/// (spec.md §4.5.1, §5): own-apply failures and cascade/dependency failures
/// alike. Inputs are resolved against `graph` first, so the recorded state
/// shows the values the node would have used rather than the raw templates
/// (spec.md §4.5.1: "still run expression resolution on its inputs").
pub(crate) fn record_failed(state: &mut EnvironmentState, graph: &Graph, node: &Node, message: String) {
    let resolved_inputs = resolve_node_inputs(graph, node);
    let previous = state
        .components
        .get(&node.component)
        .and_then(|c| ResourceKey::lookup(&c.resources, node.ty, &node.name))
        .map(|(_, r)| r.clone());

    let component_state = state.components.entry(node.component.clone()).or_insert_with(|| ComponentState::new(node.component.clone()));
    component_state.resources.insert(
        ResourceKey::new(node.ty, &node.name),
        ResourceState::failed(node.component.clone(), node.name.clone(), node.ty, resolved_inputs, message, previous.as_ref(), chrono::Utc::now()),
    );
    component_state.updated_at = chrono::Utc::now();
}
