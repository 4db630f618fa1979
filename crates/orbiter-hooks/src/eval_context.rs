use std::collections::BTreeMap;

use orbiter_domain::{Node, Value};
use orbiter_expr::EvalContext;

/// Resolves `node.inputs.*`, `variable.*`, and `environment.name` for both
/// the hook `when` predicate and the `${…}` rejection-message template
/// (spec.md §4.2(b), §4.3) — the same namespaces, evaluated the same way.
pub struct HookEvalContext<'a> {
    pub node: &'a Node,
    pub variables: &'a BTreeMap<String, Value>,
    pub environment: &'a str,
}

impl<'a> EvalContext for HookEvalContext<'a> {
    fn resolve_var(&self, path: &[String]) -> Value {
        match path {
            [] => Value::Null,
            _ if path[0] == "node" && path.get(1).map(String::as_str) == Some("inputs") => {
                dig_map(&self.node.inputs, &path[2..])
            }
            _ if path[0] == "variable" => dig_map(self.variables, &path[1..]),
            _ if path[0] == "environment" && path.get(1).map(String::as_str) == Some("name") => {
                Value::String(self.environment.to_string())
            }
            _ => Value::Null,
        }
    }
}

fn dig_map(map: &BTreeMap<String, Value>, rest: &[String]) -> Value {
    let Some((head, tail)) = rest.split_first() else {
        return Value::Null;
    };
    let Some(v) = map.get(head) else {
        return Value::Null;
    };
    dig_value(v, tail)
}

fn dig_value(v: &Value, rest: &[String]) -> Value {
    match rest.split_first() {
        None => v.clone(),
        Some((head, tail)) => match v.as_map() {
            Some(m) => m.get(head).map(|v| dig_value(v, tail)).unwrap_or(Value::Null),
            None => Value::Null,
        },
    }
}

/// Render a `${…}` rejection-message template: every `${path.to.value}`
/// span is replaced with its `%v`-stringified resolution; unresolved or
/// non-scalar spans degrade to the empty string (spec.md §4.3).
pub fn render_template(tpl: &str, ctx: &HookEvalContext<'_>) -> String {
    let mut out = String::new();
    let mut rest = tpl;
    loop {
        match rest.find("${") {
            None => {
                out.push_str(rest);
                break;
            }
            Some(start) => {
                out.push_str(&rest[..start]);
                let after = &rest[start + 2..];
                match after.find('}') {
                    None => {
                        out.push_str(&rest[start..]);
                        break;
                    }
                    Some(end) => {
                        let path: Vec<String> = after[..end].trim().split('.').map(str::to_string).collect();
                        let value = ctx.resolve_var(&path);
                        out.push_str(&value.stringify_scalar().unwrap_or_default());
                        rest = &after[end + 1..];
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbiter_domain::{ComponentName, NodeType};

    #[test]
    fn resolves_node_input_by_key() {
        let mut node = Node::new(ComponentName::new("app"), NodeType::Database, "main");
        node.inputs.insert("type".to_string(), Value::from("postgres"));
        let vars = BTreeMap::new();
        let ctx = HookEvalContext { node: &node, variables: &vars, environment: "prod" };
        assert_eq!(
            ctx.resolve_var(&["node".into(), "inputs".into(), "type".into()]),
            Value::from("postgres")
        );
    }

    #[test]
    fn renders_template_with_fallback_for_missing() {
        let node = Node::new(ComponentName::new("app"), NodeType::Database, "main");
        let vars = BTreeMap::new();
        let ctx = HookEvalContext { node: &node, variables: &vars, environment: "prod" };
        let rendered = render_template("rejected in ${environment.name}: missing ${variable.region}", &ctx);
        assert_eq!(rendered, "rejected in prod: missing ");
    }
}
