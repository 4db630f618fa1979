use std::collections::BTreeMap;

use orbiter_domain::{ComponentName, EnvironmentName, Node, NodeType, Value};
use orbiter_graph::Graph;
use sha2::{Digest, Sha256};

/// `"<env>-<component>-<node>"`, the default resource name (spec.md §4.3
/// step 2).
pub fn name_mangle(environment: &EnvironmentName, component: &ComponentName, node_name: &str) -> String {
    format!("{}-{}-{}", environment.as_str(), component.as_str(), node_name)
}

/// A stable port in `30000..40000` derived from `name`, replacing the
/// teacher's unspecified "stable hash of the name" (spec.md §4.3 step 2)
/// with a concrete, tested algorithm: the first 4 bytes of `SHA-256(name)`
/// read as a big-endian `u32`, reduced into the 10000-wide band.
pub fn port_from_hash(name: &str) -> u32 {
    let digest = Sha256::digest(name.as_bytes());
    let bytes: [u8; 4] = digest[0..4].try_into().expect("sha256 digest is at least 4 bytes");
    30_000 + (u32::from_be_bytes(bytes) % 10_000)
}

/// Splits a `"<type>:<version>"` input into its two halves (spec.md §4.3
/// step 2). Returns `None` if there is no `:` separator.
pub fn extract_version(type_spec: &str) -> Option<(&str, &str)> {
    type_spec.split_once(':')
}

/// The `image` output of the `DockerBuild` dependency of `node`, if any
/// (spec.md §4.3 step 2 "build image lookups from `DockerBuild`
/// dependencies").
pub fn find_build_image(graph: &Graph, node: &Node) -> Option<Value> {
    node.depends_on.iter().find_map(|dep_id| {
        let dep = graph.get(dep_id)?;
        if dep.ty != NodeType::DockerBuild {
            return None;
        }
        graph.get_completed_output(dep_id, "image").cloned()
    })
}

/// The `port` input of a `Service` node that depends on `node` (a service
/// "targets" the deployment it fronts), used to inject `PORT` into the
/// target's environment (spec.md §4.3 step 2, §4.6).
pub fn find_targeting_service_port(graph: &Graph, node: &Node) -> Option<i64> {
    node.dependents.iter().find_map(|dependent_id| {
        let dependent = graph.get(dependent_id)?;
        if dependent.ty != NodeType::Service {
            return None;
        }
        match dependent.inputs.get("port")? {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    })
}

/// The component's `Observability` node, if one exists with `inject=true`
/// in its inputs, together with its merged `attributes` output (spec.md
/// §4.6 "when injection is enabled").
pub fn observability_injection(graph: &Graph, component: &ComponentName) -> Option<(Node, String)> {
    let obs = graph
        .nodes()
        .find(|n| n.ty == NodeType::Observability && &n.component == component)?;
    let inject = matches!(obs.inputs.get("inject"), Some(Value::Bool(true)));
    if !inject {
        return None;
    }
    let attrs = graph
        .get_completed_output(&obs.id, "attributes")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((obs.clone(), attrs))
}

/// The full `OTEL_*` set injected into deployments/functions/cronjobs in
/// the same component as a completed, injecting `Observability` node
/// (spec.md §4.6). Never overwrites a key already present in `environment`.
pub fn inject_otel(environment: &mut BTreeMap<String, Value>, component: &ComponentName, node_name: &str, node_type: NodeType, merged_attrs: &str, endpoint: &str, protocol: &str) {
    let resource_attrs = if merged_attrs.is_empty() {
        format!("service.type={}", node_type.as_str())
    } else {
        format!("{},service.type={}", merged_attrs, node_type.as_str())
    };
    let defaults = [
        ("OTEL_EXPORTER_OTLP_ENDPOINT", endpoint.to_string()),
        ("OTEL_EXPORTER_OTLP_PROTOCOL", protocol.to_string()),
        ("OTEL_SERVICE_NAME", format!("{}-{}", component.as_str(), node_name)),
        ("OTEL_LOGS_EXPORTER", "otlp".to_string()),
        ("OTEL_TRACES_EXPORTER", "otlp".to_string()),
        ("OTEL_METRICS_EXPORTER", "otlp".to_string()),
        ("OTEL_RESOURCE_ATTRIBUTES", resource_attrs),
    ];
    for (key, value) in defaults {
        environment.entry(key.to_string()).or_insert_with(|| Value::String(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_from_hash_is_stable_and_in_band() {
        let p1 = port_from_hash("prod-app-main");
        let p2 = port_from_hash("prod-app-main");
        assert_eq!(p1, p2);
        assert!((30_000..40_000).contains(&p1));
    }

    #[test]
    fn port_from_hash_differs_for_different_names() {
        assert_ne!(port_from_hash("prod-app-main"), port_from_hash("prod-app-other"));
    }

    #[test]
    fn name_mangle_joins_with_dashes() {
        let env = EnvironmentName::new("prod");
        let comp = ComponentName::new("app");
        assert_eq!(name_mangle(&env, &comp, "main"), "prod-app-main");
    }

    #[test]
    fn extract_version_splits_on_colon() {
        assert_eq!(extract_version("postgres:14"), Some(("postgres", "14")));
        assert_eq!(extract_version("postgres"), None);
    }

    #[test]
    fn inject_otel_never_overwrites_existing_keys() {
        let mut env = BTreeMap::new();
        env.insert("OTEL_SERVICE_NAME".to_string(), Value::from("custom"));
        let comp = ComponentName::new("app");
        inject_otel(&mut env, &comp, "api", NodeType::Deployment, "service.namespace=app", "collector:4317", "grpc");
        assert_eq!(env.get("OTEL_SERVICE_NAME"), Some(&Value::from("custom")));
        assert_eq!(env.get("OTEL_LOGS_EXPORTER"), Some(&Value::from("otlp")));
    }
}
