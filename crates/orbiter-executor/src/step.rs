use std::collections::BTreeMap;

use orbiter_domain::{EnvironmentName, Node, Value};
use orbiter_graph::Graph;
use orbiter_hooks::{bind_hook, Datacenter};
use orbiter_plugin::{ObservedState, PluginRegistry, RunOptions};
use orbiter_state::ResourceState;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ExecutorError;
use crate::resolve::resolve_node_inputs;

/// What triggered this step: a fresh apply against the live graph, or a
/// destroy of a resource no longer present in it.
pub(crate) enum StepKind<'a> {
    Apply,
    Destroy { existing: &'a ResourceState },
}

pub(crate) struct StepOutcome {
    pub resolved_inputs: BTreeMap<String, Value>,
    pub outputs: BTreeMap<String, Value>,
    pub iac_state: Vec<u8>,
    pub module_name: String,
}

/// The resolve -> bind -> apply|destroy sequence both drivers share
/// (spec.md §4.5: "the same resolve→bind→apply sequence as the sequential
/// driver").
pub(crate) async fn execute_node(
    graph: &Graph,
    node: &Node,
    kind: StepKind<'_>,
    datacenter: &dyn Datacenter,
    plugins: &dyn PluginRegistry,
    environment: &EnvironmentName,
    variables: &BTreeMap<String, Value>,
    cancel: CancellationToken,
) -> Result<StepOutcome, ExecutorError> {
    let resolved_inputs = match &kind {
        StepKind::Apply => resolve_node_inputs(graph, node),
        StepKind::Destroy { existing } => existing.inputs.clone(),
    };

    let mut resolved_node = node.clone();
    resolved_node.inputs = resolved_inputs.clone();

    let bound = bind_hook(datacenter, graph, &resolved_node, environment, variables).map_err(ExecutorError::Hook)?;

    let environment_vars: BTreeMap<String, String> = bound
        .inputs
        .get("environment")
        .and_then(Value::as_map)
        .map(|m| m.iter().filter_map(|(k, v)| v.stringify_scalar().map(|s| (k.clone(), s))).collect())
        .unwrap_or_default();

    let plugin = plugins.get(&bound.plugin)?;

    match kind {
        StepKind::Apply => {
            debug!(node = %node.id, module = %bound.module_name, "applying module");
            let run_options = RunOptions {
                module_path: bound.module_path.clone(),
                inputs: bound.inputs.clone(),
                environment: environment_vars,
                state_reader: None,
            };
            let applied = plugin.apply(run_options, cancel).await?;
            let outputs = applied.outputs.into_iter().map(|(k, v)| (k, v.value)).collect();
            Ok(StepOutcome { resolved_inputs, outputs, iac_state: applied.state, module_name: bound.module_name })
        }
        StepKind::Destroy { existing } => {
            debug!(node = %node.id, module = %bound.module_name, "destroying module");
            let run_options = RunOptions {
                module_path: bound.module_path.clone(),
                inputs: bound.inputs.clone(),
                environment: environment_vars,
                state_reader: Some(existing.iac_state.clone()),
            };
            plugin.destroy(run_options, cancel).await?;
            Ok(StepOutcome { resolved_inputs, outputs: BTreeMap::new(), iac_state: Vec::new(), module_name: bound.module_name })
        }
    }
}

/// Resolve -> bind -> observe against an already-recorded resource, without
/// attempting to apply or destroy anything (spec.md §10.1 "drift
/// detection"). Inputs come from `existing` rather than a live resolution
/// pass, mirroring `StepKind::Destroy` — a recorded resource's inputs are
/// already resolved values, not templates to re-evaluate.
pub(crate) async fn observe_node(
    graph: &Graph,
    node: &Node,
    existing: &ResourceState,
    datacenter: &dyn Datacenter,
    plugins: &dyn PluginRegistry,
    environment: &EnvironmentName,
    variables: &BTreeMap<String, Value>,
    cancel: CancellationToken,
) -> Result<ObservedState, crate::error::ExecutorError> {
    let mut resolved_node = node.clone();
    resolved_node.inputs = existing.inputs.clone();

    let bound = bind_hook(datacenter, graph, &resolved_node, environment, variables).map_err(crate::error::ExecutorError::Hook)?;

    let environment_vars: BTreeMap<String, String> = bound
        .inputs
        .get("environment")
        .and_then(Value::as_map)
        .map(|m| m.iter().filter_map(|(k, v)| v.stringify_scalar().map(|s| (k.clone(), s))).collect())
        .unwrap_or_default();

    let plugin = plugins.get(&bound.plugin)?;

    debug!(node = %node.id, module = %bound.module_name, "observing module");
    let run_options = RunOptions {
        module_path: bound.module_path.clone(),
        inputs: bound.inputs.clone(),
        environment: environment_vars,
        state_reader: Some(existing.iac_state.clone()),
    };
    Ok(plugin.observe(run_options, cancel).await?)
}
