use std::collections::BTreeMap;

use orbiter_domain::{ComponentName, EnvironmentName, Value};

/// Normalize a datacenter- or component-declared attribute source into a
/// flat string map (spec.md §4.6: "accepting `map<string,string>`,
/// `map<string,Any>`, or an already-formatted string").
fn normalize_attrs(source: Option<&Value>) -> BTreeMap<String, String> {
    match source {
        None => BTreeMap::new(),
        Some(Value::Map(m)) => m
            .iter()
            .filter_map(|(k, v)| v.stringify_scalar().map(|s| (k.clone(), s)))
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect(),
        Some(_) => BTreeMap::new(),
    }
}

/// Merge the three observability attribute layers and serialize to a
/// deterministic, lexicographically sorted `key=value` comma-joined string
/// (spec.md §4.6). Lowest to highest priority: auto-generated,
/// datacenter-provided, component-declared.
pub fn enrich_observability_outputs(
    component: &ComponentName,
    environment: &EnvironmentName,
    datacenter_attrs: Option<&Value>,
    component_attrs: Option<&Value>,
) -> String {
    let mut merged = BTreeMap::new();
    merged.insert("service.namespace".to_string(), component.as_str().to_string());
    merged.insert("deployment.environment".to_string(), environment.as_str().to_string());

    for (k, v) in normalize_attrs(datacenter_attrs) {
        merged.insert(k, v);
    }
    for (k, v) in normalize_attrs(component_attrs) {
        merged.insert(k, v);
    }

    merged.into_iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_order_lets_component_override_datacenter_and_auto() {
        let component = ComponentName::new("app");
        let environment = EnvironmentName::new("prod");
        let dc_attrs = Value::Map(
            [("team".to_string(), Value::from("platform")), ("deployment.environment".to_string(), Value::from("dc-override"))]
                .into_iter()
                .collect(),
        );
        let comp_attrs = Value::String("deployment.environment=comp-override".to_string());
        let result = enrich_observability_outputs(&component, &environment, Some(&dc_attrs), Some(&comp_attrs));
        assert_eq!(result, "deployment.environment=comp-override,service.namespace=app,team=platform");
    }

    #[test]
    fn missing_layers_still_produce_auto_attributes() {
        let component = ComponentName::new("app");
        let environment = EnvironmentName::new("prod");
        let result = enrich_observability_outputs(&component, &environment, None, None);
        assert_eq!(result, "deployment.environment=prod,service.namespace=app");
    }

    #[test]
    fn merge_is_idempotent() {
        let component = ComponentName::new("app");
        let environment = EnvironmentName::new("prod");
        let once = enrich_observability_outputs(&component, &environment, None, None);
        let twice = enrich_observability_outputs(&component, &environment, Some(&Value::String(once.clone())), None);
        assert_eq!(once, twice);
    }
}
