mod error;

pub use error::PlannerError;

use std::collections::BTreeMap;

use orbiter_domain::{Action, DatacenterName, EnvironmentName, Node, Plan, PropertyChange, ResourceChange, Value};
use orbiter_graph::Graph;
use orbiter_state::{compute_desired_hash, EnvironmentState, ResourceKey, ResourceState};
use tracing::debug;

/// Diff `graph` against `previous` and emit an apply-ordered [`Plan`]
/// (spec.md §4.4). A missing `previous` state is treated as an environment
/// with no existing resources — every node becomes a `Create`. `environment`
/// and `datacenter` name the run being planned directly, rather than being
/// inferred from `previous` — a brand-new environment has no prior state to
/// infer them from.
pub fn plan(
    graph: &Graph,
    previous: Option<&EnvironmentState>,
    environment: EnvironmentName,
    datacenter: DatacenterName,
    force_update: bool,
) -> Result<Plan, PlannerError> {
    let order = graph.topological_sort()?;

    let mut result = Plan::new(environment, datacenter);

    let mut matched: std::collections::HashSet<(orbiter_domain::ComponentName, ResourceKey)> = std::collections::HashSet::new();

    for node_id in &order {
        let node = graph.get(node_id).expect("id came from this graph's topological sort");
        let existing = previous.and_then(|state| {
            let component_state = state.components.get(&node.component)?;
            ResourceKey::lookup(&component_state.resources, node.ty, &node.name)
        });

        let change = match existing {
            None => {
                debug!(node = %node.id, "no existing resource, planning create");
                ResourceChange {
                    node_id: node.id.clone(),
                    node_type: node.ty,
                    component: node.component.clone(),
                    action: Action::Create,
                    reason: "no existing resource".to_string(),
                    property_changes: node.inputs.iter().map(|(k, v)| PropertyChange::Added { key: k.clone(), value: v.clone() }).collect(),
                }
            }
            Some((key, resource_state)) => {
                matched.insert((node.component.clone(), key.clone()));
                diff_existing(node, resource_state, force_update)
            }
        };
        result.push(change);
    }

    if let Some(previous) = previous {
        for change in deletions(previous, &matched) {
            result.push(change);
        }
    }

    Ok(result)
}

/// A destroy plan: every currently recorded resource, in reverse
/// dependency order (spec.md §4.4 step 5). Since `EnvironmentState` does
/// not itself encode a dependency graph, resources are ordered by
/// component-declared `dependencies` then lexicographically within a
/// component — an approximation that is exact when components form a DAG,
/// which the front end guarantees.
pub fn plan_destroy(state: &EnvironmentState) -> Plan {
    let mut result = Plan::new(state.name.clone(), state.datacenter.clone());
    let mut components: Vec<_> = state.components.values().collect();
    components.sort_by(|a, b| component_rank(state, &b.name).cmp(&component_rank(state, &a.name)).then(a.name.cmp(&b.name)));

    for component in components {
        let mut keys: Vec<_> = component.resources.keys().collect();
        keys.sort();
        for key in keys.into_iter().rev() {
            let resource = &component.resources[key];
            result.push(ResourceChange {
                node_id: orbiter_domain::NodeId::new(&component.name, resource.ty, &resource.name),
                node_type: resource.ty,
                component: component.name.clone(),
                action: Action::Delete,
                reason: "resource not present in destroy target".to_string(),
                property_changes: Vec::new(),
            });
        }
    }
    result
}

fn component_rank(state: &EnvironmentState, name: &orbiter_domain::ComponentName) -> usize {
    state.components.get(name).map(|c| c.dependencies.len()).unwrap_or(0)
}

/// Diffs a node against its previously recorded resource (spec.md §4.4 step
/// 3). A recorded `desired_hash` that still matches `node.inputs` short-
/// circuits straight to a noop without the deeper `diff_inputs` walk
/// (spec.md §10.3) — the planner's analogue of the teacher's hash-unchanged
/// fast path, generalized from string equality to `Value` hashing.
fn diff_existing(node: &Node, resource: &ResourceState, force_update: bool) -> ResourceChange {
    if !force_update {
        if let Some(existing_hash) = &resource.desired_hash {
            if *existing_hash == compute_desired_hash(&node.inputs) {
                return ResourceChange::noop(node.id.clone(), node.ty, node.component.clone());
            }
        }
    }
    let changes = diff_inputs(&resource.inputs, &node.inputs);
    if changes.is_empty() {
        if force_update {
            return ResourceChange {
                node_id: node.id.clone(),
                node_type: node.ty,
                component: node.component.clone(),
                action: Action::Update,
                reason: "force".to_string(),
                property_changes: Vec::new(),
            };
        }
        return ResourceChange::noop(node.id.clone(), node.ty, node.component.clone());
    }
    ResourceChange {
        node_id: node.id.clone(),
        node_type: node.ty,
        component: node.component.clone(),
        action: Action::Update,
        reason: "inputs changed".to_string(),
        property_changes: changes,
    }
}

/// Deep, value-level diff of two input maps (spec.md §4.4 step 3):
/// primitives by `==`, maps by key set and recursive equality, arrays by
/// length and positional equality — all implied by `Value`'s derived
/// structural `PartialEq`.
fn diff_inputs(before: &BTreeMap<String, Value>, after: &BTreeMap<String, Value>) -> Vec<PropertyChange> {
    let mut changes = Vec::new();
    for (key, after_value) in after {
        match before.get(key) {
            None => changes.push(PropertyChange::Added { key: key.clone(), value: after_value.clone() }),
            Some(before_value) if before_value != after_value => changes.push(PropertyChange::Changed {
                key: key.clone(),
                before: before_value.clone(),
                after: after_value.clone(),
            }),
            Some(_) => {}
        }
    }
    for (key, before_value) in before {
        if !after.contains_key(key) {
            changes.push(PropertyChange::Removed { key: key.clone(), value: before_value.clone() });
        }
    }
    changes
}

fn deletions(
    previous: &EnvironmentState,
    matched: &std::collections::HashSet<(orbiter_domain::ComponentName, ResourceKey)>,
) -> Vec<ResourceChange> {
    let mut out = Vec::new();
    for (component_name, component_state) in &previous.components {
        for (key, resource) in &component_state.resources {
            if matched.contains(&(component_name.clone(), key.clone())) {
                continue;
            }
            out.push(ResourceChange {
                node_id: orbiter_domain::NodeId::new(component_name, resource.ty, &resource.name),
                node_type: resource.ty,
                component: component_name.clone(),
                action: Action::Delete,
                reason: "resource no longer present in graph".to_string(),
                property_changes: Vec::new(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbiter_domain::{ComponentName, NodeType};
    use orbiter_state::ComponentState;

    fn simple_graph() -> Graph {
        let mut g = Graph::new();
        let mut node = Node::new(ComponentName::new("app"), NodeType::Database, "main");
        node.inputs.insert("type".to_string(), Value::from("postgres"));
        g.add_node(node).unwrap();
        g
    }

    #[test]
    fn empty_previous_state_plans_all_creates() {
        let graph = simple_graph();
        let result = plan(&graph, None, orbiter_domain::EnvironmentName::new("dev"), orbiter_domain::DatacenterName::new("dc"), false).unwrap();
        assert_eq!(result.to_create, 1);
        assert_eq!(result.to_update, 0);
        assert_eq!(result.to_delete, 0);
    }

    #[test]
    fn unchanged_inputs_plan_as_noop() {
        let graph = simple_graph();
        let mut state = EnvironmentState::new(orbiter_domain::EnvironmentName::new("prod"), orbiter_domain::DatacenterName::new("aws"));
        let mut component = ComponentState::new(ComponentName::new("app"));
        let mut inputs = BTreeMap::new();
        inputs.insert("type".to_string(), Value::from("postgres"));
        component.resources.insert(
            ResourceKey::new(NodeType::Database, "main"),
            ResourceState::applied(ComponentName::new("app"), "main".to_string(), NodeType::Database, inputs, BTreeMap::new(), vec![], None, chrono::Utc::now()),
        );
        state.components.insert(ComponentName::new("app"), component);

        let result = plan(&graph, Some(&state), orbiter_domain::EnvironmentName::new("prod"), orbiter_domain::DatacenterName::new("aws"), false).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.no_change, 1);
    }

    #[test]
    fn changed_input_plans_update_with_property_change() {
        let graph = simple_graph();
        let mut state = EnvironmentState::new(orbiter_domain::EnvironmentName::new("prod"), orbiter_domain::DatacenterName::new("aws"));
        let mut component = ComponentState::new(ComponentName::new("app"));
        let mut inputs = BTreeMap::new();
        inputs.insert("type".to_string(), Value::from("mysql"));
        component.resources.insert(
            ResourceKey::new(NodeType::Database, "main"),
            ResourceState::applied(ComponentName::new("app"), "main".to_string(), NodeType::Database, inputs, BTreeMap::new(), vec![], None, chrono::Utc::now()),
        );
        state.components.insert(ComponentName::new("app"), component);

        let result = plan(&graph, Some(&state), orbiter_domain::EnvironmentName::new("prod"), orbiter_domain::DatacenterName::new("aws"), false).unwrap();
        assert_eq!(result.to_update, 1);
        assert!(matches!(result.changes[0].property_changes[0], PropertyChange::Changed { .. }));
    }

    #[test]
    fn resource_absent_from_graph_plans_delete() {
        let graph = Graph::new();
        let mut state = EnvironmentState::new(orbiter_domain::EnvironmentName::new("prod"), orbiter_domain::DatacenterName::new("aws"));
        let mut component = ComponentState::new(ComponentName::new("app"));
        component.resources.insert(
            ResourceKey::new(NodeType::Database, "main"),
            ResourceState::applied(ComponentName::new("app"), "main".to_string(), NodeType::Database, BTreeMap::new(), BTreeMap::new(), vec![], None, chrono::Utc::now()),
        );
        state.components.insert(ComponentName::new("app"), component);

        let result = plan(&graph, Some(&state), orbiter_domain::EnvironmentName::new("prod"), orbiter_domain::DatacenterName::new("aws"), false).unwrap();
        assert_eq!(result.to_delete, 1);
    }

    #[test]
    fn cyclic_graph_fails_to_plan() {
        let mut g = Graph::new();
        let a = Node::new(ComponentName::new("app"), NodeType::Service, "a");
        let b = Node::new(ComponentName::new("app"), NodeType::Service, "b");
        let a_id = a.id.clone();
        let b_id = b.id.clone();
        g.add_node(a).unwrap();
        g.add_node(b).unwrap();
        g.add_edge(&a_id, &b_id).unwrap();
        g.add_edge(&b_id, &a_id).unwrap();
        assert!(matches!(plan(&g, None, orbiter_domain::EnvironmentName::new("dev"), orbiter_domain::DatacenterName::new("dc"), false), Err(PlannerError::Cycle(_))));
    }
}
