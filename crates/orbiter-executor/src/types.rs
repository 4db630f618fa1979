use std::collections::BTreeMap;
use std::sync::Arc;

use orbiter_domain::{Action, DatacenterName, NodeId, NodeType, Value};

/// One state transition the core emits, invoked exactly once per
/// transition per node (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub node_id: NodeId,
    pub node_name: String,
    pub node_type: NodeType,
    pub status: ProgressStatus,
    pub message: String,
    pub error: Option<String>,
}

/// The programmatic side channel for user-visible output (spec.md §6, §7
/// ambient-logging note: "all user-visible output goes through the
/// progress callback or the configured writer" — `tracing` stays the
/// operator-facing side, this is the caller-facing one).
pub type OnProgress = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// `{ parallelism, output, dry_run, stop_on_error, on_progress, datacenter,
/// datacenter_variables }` (spec.md §6 `Options`).
#[derive(Clone)]
pub struct ExecutionOptions {
    pub parallelism: usize,
    pub dry_run: bool,
    pub stop_on_error: bool,
    pub on_progress: Option<OnProgress>,
    pub datacenter: DatacenterName,
    pub datacenter_variables: BTreeMap<String, Value>,
}

impl ExecutionOptions {
    pub fn new(datacenter: DatacenterName) -> Self {
        ExecutionOptions {
            parallelism: 10,
            dry_run: false,
            stop_on_error: false,
            on_progress: None,
            datacenter,
            datacenter_variables: BTreeMap::new(),
        }
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        if let Some(cb) = &self.on_progress {
            cb(event);
        }
    }
}

impl std::fmt::Debug for ExecutionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionOptions")
            .field("parallelism", &self.parallelism)
            .field("dry_run", &self.dry_run)
            .field("stop_on_error", &self.stop_on_error)
            .field("datacenter", &self.datacenter)
            .field("datacenter_variables", &self.datacenter_variables)
            .finish()
    }
}

/// Per-node outcome folded into an [`ExecutionResult`].
#[derive(Debug, Clone)]
pub struct NodeResult {
    pub node_id: NodeId,
    pub action: Action,
    pub status: ProgressStatus,
    pub error: Option<String>,
}

/// What a completed run returns: the final recorded state plus a per-node
/// audit trail, mirroring the teacher's `ReconcileReport`.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub state: orbiter_state::EnvironmentState,
    pub results: Vec<NodeResult>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.results.iter().all(|r| r.status != ProgressStatus::Failed)
    }
}
