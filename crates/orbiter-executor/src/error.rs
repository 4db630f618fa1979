use orbiter_domain::NodeId;
use thiserror::Error;

/// Aggregates every upstream crate's error type, following the teacher's
/// `nclav_reconciler::ReconcileError` shape — one wide enum with `#[from]`
/// conversions so call sites can use `?` across crate boundaries.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Planner(#[from] orbiter_planner::PlannerError),

    #[error(transparent)]
    Graph(#[from] orbiter_graph::GraphError),

    #[error(transparent)]
    Hook(#[from] orbiter_hooks::HookError),

    #[error(transparent)]
    Plugin(#[from] orbiter_plugin::PluginError),

    #[error(transparent)]
    State(#[from] orbiter_state::StateError),

    #[error("dependencies unsatisfied for node {node}: {failed_dependency} failed")]
    DependenciesUnsatisfied { node: NodeId, failed_dependency: NodeId },

    #[error("run cancelled")]
    Cancelled,

    #[error("node {0} left pending with no path to completion (topological sort guaranteed this cannot happen)")]
    UnresolvableDependencies(NodeId),
}
