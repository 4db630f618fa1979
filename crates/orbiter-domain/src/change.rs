use serde::{Deserialize, Serialize};

use crate::{ComponentName, EnvironmentName, NodeId, NodeType, Value};

/// One field-level delta between a node's desired inputs and the recorded
/// resource's inputs (spec.md §4.4 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PropertyChange {
    Added { key: String, value: Value },
    Removed { key: String, value: Value },
    Changed { key: String, before: Value, after: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    /// Reserved for destructive changes a future implementation may detect
    /// (spec.md §4.4 step 3) — the current planner never emits this.
    Replace,
    Delete,
    Noop,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Replace => "replace",
            Action::Delete => "delete",
            Action::Noop => "noop",
        };
        write!(f, "{}", s)
    }
}

/// One planned resource change (spec.md §3 `ResourceChange`).
///
/// `node_id`/`node_type`/`component` stand in for a borrowed `&Node`: the
/// planner and executor live in separate crates sharing a `Graph` owned by
/// the caller, so `ResourceChange` carries a cheap snapshot of node
/// identity instead of a lifetime-entangled reference. The executor looks
/// the live `Node` back up from the `Graph` by `node_id` when it needs the
/// full `inputs`/`dependents` the reference would have given it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceChange {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub component: ComponentName,
    pub action: Action,
    pub reason: String,
    pub property_changes: Vec<PropertyChange>,
}

impl ResourceChange {
    pub fn noop(node_id: NodeId, node_type: NodeType, component: ComponentName) -> Self {
        ResourceChange {
            node_id,
            node_type,
            component,
            action: Action::Noop,
            reason: String::new(),
            property_changes: Vec::new(),
        }
    }
}

/// An ordered, typed list of resource changes (spec.md §3 `Plan`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub environment: EnvironmentName,
    pub datacenter: crate::DatacenterName,
    pub changes: Vec<ResourceChange>,
    pub to_create: usize,
    pub to_update: usize,
    pub to_delete: usize,
    pub no_change: usize,
}

impl Plan {
    pub fn new(environment: EnvironmentName, datacenter: crate::DatacenterName) -> Self {
        Plan {
            environment,
            datacenter,
            changes: Vec::new(),
            to_create: 0,
            to_update: 0,
            to_delete: 0,
            no_change: 0,
        }
    }

    pub fn push(&mut self, change: ResourceChange) {
        match change.action {
            Action::Create => self.to_create += 1,
            Action::Update | Action::Replace => self.to_update += 1,
            Action::Delete => self.to_delete += 1,
            Action::Noop => self.no_change += 1,
        }
        self.changes.push(change);
    }

    /// A plan is empty iff all three counters are zero (spec.md §3).
    pub fn is_empty(&self) -> bool {
        self.to_create == 0 && self.to_update == 0 && self.to_delete == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_has_zero_counters_only() {
        let mut plan = Plan::new(EnvironmentName::new("dev"), crate::DatacenterName::new("dc"));
        plan.push(ResourceChange::noop(
            NodeId::new(&ComponentName::new("app"), NodeType::Database, "main"),
            NodeType::Database,
            ComponentName::new("app"),
        ));
        assert!(plan.is_empty());
        assert_eq!(plan.no_change, 1);
    }
}
