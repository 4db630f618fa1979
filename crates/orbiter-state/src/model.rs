use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use orbiter_domain::{ComponentName, NodeType, Value};

/// `Provisioning -> Ready | Failed`, tracked at both the environment and
/// component/resource level (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Provisioning,
    Ready,
    Failed,
}

/// `"<type>.<name>"`, the canonical key under which a resource's state is
/// stored (spec.md §3). A bare `<name>` is accepted when *reading* state
/// written before the type was included in the key, so existing state
/// files keep working; every write uses the canonical form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey(pub String);

impl ResourceKey {
    pub fn new(ty: NodeType, name: &str) -> Self {
        ResourceKey(format!("{}.{}", ty.as_str(), name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Look up `ty.name` in `resources`, falling back to the legacy
    /// bare-name key and logging the fallback so call sites can be migrated
    /// off it (spec.md §9 open question "legacy resource key deprecation",
    /// decided in DESIGN.md).
    pub fn lookup<'a>(
        resources: &'a BTreeMap<ResourceKey, ResourceState>,
        ty: NodeType,
        name: &str,
    ) -> Option<(&'a ResourceKey, &'a ResourceState)> {
        let canonical = ResourceKey::new(ty, name);
        if let Some(found) = resources.get_key_value(&canonical) {
            return Some(found);
        }
        let legacy = ResourceKey(name.to_string());
        if let Some(found) = resources.get_key_value(&legacy) {
            warn!(key = name, "resource state found only under legacy bare-name key");
            return Some(found);
        }
        None
    }
}

/// One provisioned resource's recorded state (spec.md §3). `iac_state` is
/// the plugin's opaque state blob; it must be preserved verbatim to destroy
/// the resource later.
///
/// `created_at`/`last_seen_at`/`last_error`/`desired_hash`/`generation` carry
/// over the teacher's `ResourceMeta` lifecycle bookkeeping (spec.md §10.2):
/// `generation` counts every recorded transition (apply or failure) for this
/// key, `desired_hash` is the planner's fast-path fingerprint of the inputs
/// that produced this record, and `last_seen_at` is only ever set by drift
/// observation, never by apply/destroy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub component: ComponentName,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: NodeType,
    pub status: Status,
    pub inputs: BTreeMap<String, Value>,
    pub outputs: BTreeMap<String, Value>,
    #[serde(with = "iac_state_base64")]
    pub iac_state: Vec<u8>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub desired_hash: Option<String>,
    pub generation: u64,
}

impl ResourceState {
    /// Build the record for a successful apply, rotating bookkeeping forward
    /// from `previous` if this key has been recorded before (spec.md §10.2,
    /// mirroring `ResourceMeta::mark_active`). `desired_hash` is stamped from
    /// `inputs` so the planner's fast path (spec.md §10.3) has something to
    /// compare against next run.
    pub fn applied(
        component: ComponentName,
        name: String,
        ty: NodeType,
        inputs: BTreeMap<String, Value>,
        outputs: BTreeMap<String, Value>,
        iac_state: Vec<u8>,
        previous: Option<&ResourceState>,
        now: DateTime<Utc>,
    ) -> Self {
        let desired_hash = Some(crate::hash::compute_desired_hash(&inputs));
        ResourceState {
            component,
            name,
            ty,
            status: Status::Ready,
            inputs,
            outputs,
            iac_state,
            last_error: None,
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
            last_seen_at: previous.and_then(|p| p.last_seen_at),
            desired_hash,
            generation: previous.map(|p| p.generation + 1).unwrap_or(1),
        }
    }

    /// Build the record for a failed apply or a dependency cascade (spec.md
    /// §4.5.1, §5). `inputs` must already be resolved by the caller so the
    /// failure is inspectable; outputs and `iac_state` carry over unchanged
    /// from `previous` since nothing new was actually applied.
    pub fn failed(
        component: ComponentName,
        name: String,
        ty: NodeType,
        inputs: BTreeMap<String, Value>,
        message: String,
        previous: Option<&ResourceState>,
        now: DateTime<Utc>,
    ) -> Self {
        ResourceState {
            component,
            name,
            ty,
            status: Status::Failed,
            inputs,
            outputs: previous.map(|p| p.outputs.clone()).unwrap_or_default(),
            iac_state: previous.map(|p| p.iac_state.clone()).unwrap_or_default(),
            last_error: Some(message),
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
            last_seen_at: previous.and_then(|p| p.last_seen_at),
            desired_hash: previous.and_then(|p| p.desired_hash.clone()),
            generation: previous.map(|p| p.generation + 1).unwrap_or(1),
        }
    }
}

mod iac_state_base64 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        let encoded = bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>();
        encoded.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// One component's recorded state (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentState {
    pub name: ComponentName,
    pub status: Status,
    pub dependencies: BTreeSet<ComponentName>,
    pub resources: BTreeMap<ResourceKey, ResourceState>,
    pub updated_at: DateTime<Utc>,
}

impl ComponentState {
    pub fn new(name: ComponentName) -> Self {
        ComponentState {
            name,
            status: Status::Provisioning,
            dependencies: BTreeSet::new(),
            resources: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }
}

/// The full recorded state of one environment (spec.md §3). The executor is
/// the sole writer of this type during a run; it is read once at the start
/// and flushed once at the end (and on cancellation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentState {
    pub name: orbiter_domain::EnvironmentName,
    pub datacenter: orbiter_domain::DatacenterName,
    pub status: Status,
    pub components: BTreeMap<ComponentName, ComponentState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnvironmentState {
    pub fn new(name: orbiter_domain::EnvironmentName, datacenter: orbiter_domain::DatacenterName) -> Self {
        let now = Utc::now();
        EnvironmentState {
            name,
            datacenter,
            status: Status::Provisioning,
            components: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Remove a resource, dropping the owning [`ComponentState`] entirely if
    /// it was the last one left (spec.md §3 invariant).
    pub fn remove_resource(&mut self, component: &ComponentName, key: &ResourceKey) {
        if let Some(state) = self.components.get_mut(component) {
            state.resources.remove(key);
            if state.resources.is_empty() {
                self.components.remove(component);
            } else {
                state.updated_at = Utc::now();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbiter_domain::EnvironmentName;

    #[test]
    fn removing_last_resource_drops_component_entry() {
        let mut env = EnvironmentState::new(EnvironmentName::new("prod"), orbiter_domain::DatacenterName::new("aws"));
        let component = ComponentName::new("app");
        let mut comp = ComponentState::new(component.clone());
        let key = ResourceKey::new(NodeType::Database, "main");
        comp.resources.insert(
            key.clone(),
            ResourceState::applied(
                component.clone(),
                "main".to_string(),
                NodeType::Database,
                BTreeMap::new(),
                BTreeMap::new(),
                vec![],
                None,
                Utc::now(),
            ),
        );
        env.components.insert(component.clone(), comp);

        env.remove_resource(&component, &key);
        assert!(!env.components.contains_key(&component));
    }

    #[test]
    fn resource_key_lookup_falls_back_to_legacy_bare_name() {
        let mut resources = BTreeMap::new();
        let component = ComponentName::new("app");
        resources.insert(
            ResourceKey("main".to_string()),
            ResourceState::applied(
                component.clone(),
                "main".to_string(),
                NodeType::Database,
                BTreeMap::new(),
                BTreeMap::new(),
                vec![],
                None,
                Utc::now(),
            ),
        );
        let found = ResourceKey::lookup(&resources, NodeType::Database, "main");
        assert!(found.is_some());
    }

    #[test]
    fn iac_state_round_trips_through_hex_encoding() {
        let state = ResourceState::applied(
            ComponentName::new("app"),
            "main".to_string(),
            NodeType::Database,
            BTreeMap::new(),
            BTreeMap::new(),
            vec![0xDE, 0xAD, 0xBE, 0xEF],
            None,
            Utc::now(),
        );
        let json = serde_json::to_string(&state).unwrap();
        let back: ResourceState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.iac_state, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
