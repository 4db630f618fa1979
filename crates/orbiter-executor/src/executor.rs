use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use orbiter_domain::Plan;
use orbiter_graph::Graph;
use orbiter_hooks::Datacenter;
use orbiter_plugin::PluginRegistry;
use orbiter_state::StateBackend;

use crate::error::ExecutorError;
use crate::reactive::run_reactive;
use crate::sequential::run_sequential;
use crate::types::{ExecutionOptions, ExecutionResult};

/// The entry point callers construct once per run, wiring together the
/// datacenter, plugin registry, and state backend the rest of the crate
/// needs (spec.md §6).
pub struct Executor {
    datacenter: Arc<dyn Datacenter>,
    plugins: Arc<dyn PluginRegistry>,
    backend: Arc<dyn StateBackend>,
}

impl Executor {
    pub fn new(datacenter: Arc<dyn Datacenter>, plugins: Arc<dyn PluginRegistry>, backend: Arc<dyn StateBackend>) -> Self {
        Executor { datacenter, plugins, backend }
    }

    /// Apply `plan` to `graph` one node at a time, in plan order
    /// (spec.md §4.5 "Sequential driver").
    pub async fn run_sequential(&self, graph: &mut Graph, plan: &Plan, options: &ExecutionOptions, cancel: CancellationToken) -> Result<ExecutionResult, ExecutorError> {
        run_sequential(graph, plan, self.datacenter.as_ref(), self.plugins.as_ref(), self.backend.as_ref(), options, cancel).await
    }

    /// Apply `plan` to `graph` with up to `options.parallelism` nodes in
    /// flight at once (spec.md §4.5 "Reactive driver").
    pub async fn run_reactive(&self, graph: &mut Graph, plan: &Plan, options: &ExecutionOptions, cancel: CancellationToken) -> Result<ExecutionResult, ExecutorError> {
        run_reactive(graph, plan, Arc::clone(&self.datacenter), Arc::clone(&self.plugins), self.backend.as_ref(), options, cancel).await
    }
}
