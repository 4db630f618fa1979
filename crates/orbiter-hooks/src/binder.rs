use std::collections::BTreeMap;
use std::path::PathBuf;

use orbiter_domain::{EnvironmentName, Node, NodeType, Value};
use orbiter_expr::{evaluate_predicate, EvalOptions};
use orbiter_graph::Graph;
use tracing::debug;

use crate::defaults;
use crate::error::HookError;
use crate::eval_context::{render_template, HookEvalContext};
use crate::types::{Datacenter, Hook};

/// The resolved outcome of [`bind_hook`]: a module path, the plugin to
/// invoke it with, the merged input map, and the hook's output-key aliases
/// (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct BoundHook {
    pub module_name: String,
    pub module_path: PathBuf,
    pub plugin: String,
    pub inputs: BTreeMap<String, Value>,
    pub outputs: BTreeMap<String, String>,
}

/// Default OTLP endpoint/protocol injected when a component opts into
/// observability. The datacenter may override these per-node by declaring
/// `OTEL_EXPORTER_OTLP_ENDPOINT`/`_PROTOCOL` explicitly in `environment`.
const DEFAULT_OTLP_ENDPOINT: &str = "otel-collector:4317";
const DEFAULT_OTLP_PROTOCOL: &str = "grpc";

/// Select and bind the first matching hook for `node` (spec.md §4.3).
pub fn bind_hook(
    datacenter: &dyn Datacenter,
    graph: &Graph,
    node: &Node,
    environment: &EnvironmentName,
    variables: &BTreeMap<String, Value>,
) -> Result<BoundHook, HookError> {
    let hooks = datacenter.hooks_for(node.ty);
    if hooks.is_empty() {
        return Err(HookError::NoHookDefined(node.id.clone()));
    }

    let ctx = HookEvalContext { node, variables, environment: environment.as_str() };
    let opts = EvalOptions::default();

    let hook = hooks
        .iter()
        .find(|h| match evaluate_predicate(&h.when, &ctx, &opts) {
            Ok(matched) => matched,
            Err(err) => {
                debug!(node = %node.id, error = %err, "hook predicate failed to evaluate, treating as no-match");
                false
            }
        })
        .ok_or_else(|| HookError::NoMatchingHook(node.id.clone()))?;

    if let Some(template) = &hook.error {
        let message = render_template(template, &ctx);
        return Err(HookError::DatacenterRejected { node: node.id.clone(), message });
    }

    let module = hook
        .modules
        .first()
        .ok_or_else(|| HookError::NoMatchingHook(node.id.clone()))?;

    let module_path = resolve_module_path(datacenter, module);
    let mut inputs = default_inputs(graph, node, environment, variables);
    let explicit = explicit_inputs(module, &ctx).map_err(|source| HookError::Expr { node: node.id.clone(), source })?;
    inputs.extend(explicit);

    Ok(BoundHook {
        module_name: module.name.clone(),
        module_path,
        plugin: module.plugin.clone(),
        inputs,
        outputs: hook.outputs.clone(),
    })
}

fn resolve_module_path(datacenter: &dyn Datacenter, module: &crate::types::Module) -> PathBuf {
    let rel = module
        .build_path
        .as_deref()
        .or(module.source_path.as_deref())
        .unwrap_or(&module.name);
    datacenter.source_path().join(rel)
}

/// Step 1 of spec.md §4.3's two-source merge: evaluate every module-declared
/// input expression, dropping results that are null or the empty string.
fn explicit_inputs(
    module: &crate::types::Module,
    ctx: &HookEvalContext<'_>,
) -> Result<BTreeMap<String, Value>, orbiter_expr::ExprError> {
    let mut out = BTreeMap::new();
    for (key, expr_src) in &module.inputs {
        let expr = orbiter_expr::Parser::parse(expr_src)?;
        let value = orbiter_expr::eval(&expr, ctx)?;
        if !value.is_null_or_empty() {
            out.insert(key.clone(), value);
        }
    }
    Ok(out)
}

/// Step 2 of spec.md §4.3's merge: the per-module-kind default recipe.
fn default_inputs(
    graph: &Graph,
    node: &Node,
    environment: &EnvironmentName,
    variables: &BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();

    out.insert("name".to_string(), Value::from(defaults::name_mangle(environment, &node.component, &node.name)));

    if let Some(network) = variables.get("network_name") {
        out.insert("network".to_string(), network.clone());
    }
    if let Some(host) = variables.get("host") {
        out.insert("host".to_string(), host.clone());
    }

    out.insert(
        "port".to_string(),
        Value::Int(defaults::port_from_hash(&defaults::name_mangle(environment, &node.component, &node.name)) as i64),
    );

    if let Some(Value::String(type_spec)) = node.inputs.get("type") {
        if let Some((_, version)) = defaults::extract_version(type_spec) {
            out.insert("version".to_string(), Value::from(version));
        }
    }

    if let Some(image) = defaults::find_build_image(graph, node) {
        out.insert("image".to_string(), image);
    }

    if matches!(node.ty, NodeType::Deployment | NodeType::Function | NodeType::Cronjob) {
        let mut env_map = node
            .inputs
            .get("environment")
            .and_then(|v| v.as_map())
            .cloned()
            .unwrap_or_default();

        let port = match node.inputs.get("port") {
            Some(Value::Int(i)) => Some(*i),
            _ => defaults::find_targeting_service_port(graph, node),
        };
        if let Some(port) = port {
            env_map.entry("PORT".to_string()).or_insert_with(|| Value::Int(port));
        }

        if let Some((_, merged_attrs)) = defaults::observability_injection(graph, &node.component) {
            defaults::inject_otel(
                &mut env_map,
                &node.component,
                &node.name,
                node.ty,
                &merged_attrs,
                DEFAULT_OTLP_ENDPOINT,
                DEFAULT_OTLP_PROTOCOL,
            );
        }

        if !env_map.is_empty() {
            out.insert("environment".to_string(), Value::Map(env_map));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbiter_domain::ComponentName;
    use std::path::Path;

    struct FakeDatacenter {
        hooks: Vec<Hook>,
        empty: Vec<Hook>,
        root: PathBuf,
    }

    impl Datacenter for FakeDatacenter {
        fn hooks_for(&self, ty: NodeType) -> &[Hook] {
            if ty == NodeType::Database {
                &self.hooks
            } else {
                &self.empty
            }
        }

        fn source_path(&self) -> &Path {
            &self.root
        }
    }

    fn hook(when: &str, module: crate::types::Module, error: Option<&str>) -> Hook {
        Hook { when: when.to_string(), modules: vec![module], outputs: BTreeMap::new(), error: error.map(String::from) }
    }

    fn module(name: &str, inputs: &[(&str, &str)]) -> crate::types::Module {
        crate::types::Module {
            name: name.to_string(),
            plugin: "native".to_string(),
            build_path: Some("modules/postgres".to_string()),
            source_path: None,
            inputs: inputs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn first_matching_hook_wins_and_explicit_inputs_override_defaults() {
        let dc = FakeDatacenter {
            hooks: vec![hook(
                r#"node.inputs.type == "postgres""#,
                module("postgres", &[("port", "9999")]),
                None,
            )],
            empty: vec![],
            root: PathBuf::from("/datacenters/aws"),
        };
        let mut node = Node::new(ComponentName::new("app"), NodeType::Database, "main");
        node.inputs.insert("type".to_string(), Value::from("postgres:14"));
        let env = EnvironmentName::new("prod");
        let graph = Graph::new();
        let bound = bind_hook(&dc, &graph, &node, &env, &BTreeMap::new()).unwrap();
        assert_eq!(bound.inputs.get("port"), Some(&Value::Int(9999)));
        assert_eq!(bound.inputs.get("version"), Some(&Value::from("14")));
        assert_eq!(bound.module_path, PathBuf::from("/datacenters/aws/modules/postgres"));
    }

    #[test]
    fn no_hooks_defined_errors() {
        let dc = FakeDatacenter { hooks: vec![], empty: vec![], root: PathBuf::from("/dc") };
        let node = Node::new(ComponentName::new("app"), NodeType::Database, "main");
        let env = EnvironmentName::new("prod");
        let graph = Graph::new();
        assert!(matches!(
            bind_hook(&dc, &graph, &node, &env, &BTreeMap::new()),
            Err(HookError::NoHookDefined(_))
        ));
    }

    #[test]
    fn no_matching_predicate_errors() {
        let dc = FakeDatacenter {
            hooks: vec![hook(r#"node.inputs.type == "mysql""#, module("postgres", &[]), None)],
            empty: vec![],
            root: PathBuf::from("/dc"),
        };
        let mut node = Node::new(ComponentName::new("app"), NodeType::Database, "main");
        node.inputs.insert("type".to_string(), Value::from("postgres"));
        let env = EnvironmentName::new("prod");
        let graph = Graph::new();
        assert!(matches!(
            bind_hook(&dc, &graph, &node, &env, &BTreeMap::new()),
            Err(HookError::NoMatchingHook(_))
        ));
    }

    #[test]
    fn error_template_rejects_with_rendered_message() {
        let dc = FakeDatacenter {
            hooks: vec![hook("", module("unsupported", &[]), Some("unsupported type ${node.inputs.type}"))],
            empty: vec![],
            root: PathBuf::from("/dc"),
        };
        let mut node = Node::new(ComponentName::new("app"), NodeType::Database, "main");
        node.inputs.insert("type".to_string(), Value::from("oracle"));
        let env = EnvironmentName::new("prod");
        let graph = Graph::new();
        match bind_hook(&dc, &graph, &node, &env, &BTreeMap::new()) {
            Err(HookError::DatacenterRejected { message, .. }) => {
                assert_eq!(message, "unsupported type oracle");
            }
            other => panic!("expected DatacenterRejected, got {:?}", other),
        }
    }
}
