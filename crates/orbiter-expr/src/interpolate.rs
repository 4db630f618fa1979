use orbiter_domain::Value;

/// Outcome of looking up another node's output by `kind.name.prop`
/// (spec.md §4.2(a)). A node that exists but has not finished provisioning
/// resolves to `Unavailable` rather than `Value::Null`, so callers can tell
/// "not ready yet" apart from "explicitly null".
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Completed(Value),
    Unavailable,
}

/// Supplies the three lookup surfaces `${{ }}` interpolation can address:
/// another node's completed output, the current node's own variable inputs,
/// and the merged observability attributes (spec.md §4.2(a), §4.6).
pub trait ResolutionContext {
    fn lookup_node_output(&self, kind: &str, name: &str, prop: &str) -> Lookup;
    fn lookup_own_variable(&self, key: &str) -> Option<Value>;
    fn lookup_observability(&self, prop: &str) -> Option<Value>;
}

/// Walk a [`Value`] tree resolving every `${{ ... }}` template found in
/// string leaves (spec.md §4.2(a) rule 2: resolution recurses into map
/// values). Lists and maps are rebuilt with their leaves resolved in place.
pub fn resolve_value(v: &Value, ctx: &dyn ResolutionContext) -> Value {
    match v {
        Value::String(s) => resolve_string(s, ctx),
        Value::List(items) => Value::List(items.iter().map(|i| resolve_value(i, ctx)).collect()),
        Value::Map(m) => {
            Value::Map(m.iter().map(|(k, v)| (k.clone(), resolve_value(v, ctx))).collect())
        }
        other => other.clone(),
    }
}

/// Resolve the templates in a single string. When the whole string is
/// exactly one `${{ ... }}` template, the resolved value's structure is
/// preserved (rule 2). Otherwise every template is stringified with
/// [`Value::stringify_scalar`] and spliced into the surrounding text; a
/// non-scalar resolution found mid-string is left as literal text (rule 3)
/// since there is no sensible way to splice a list or map into a string.
pub fn resolve_string(s: &str, ctx: &dyn ResolutionContext) -> Value {
    let templates = find_templates(s);
    if templates.is_empty() {
        return Value::String(s.to_string());
    }

    if templates.len() == 1 {
        let (start, end, path) = &templates[0];
        if *start == 0 && *end == s.len() {
            return resolve_path(path, ctx);
        }
    }

    let mut out = String::new();
    let mut cursor = 0;
    for (start, end, path) in &templates {
        out.push_str(&s[cursor..*start]);
        let resolved = resolve_path(path, ctx);
        match resolved.stringify_scalar() {
            Some(text) => out.push_str(&text),
            None => out.push_str(&s[*start..*end]),
        }
        cursor = *end;
    }
    out.push_str(&s[cursor..]);
    Value::String(out)
}

/// Returns `(start, end, inner_path)` for each `${{ ... }}` span, byte
/// offsets into `s` spanning the full `${{ ... }}` delimiters.
fn find_templates(s: &str) -> Vec<(usize, usize, String)> {
    let mut out = Vec::new();
    let mut search_from = 0;
    while let Some(rel_start) = s[search_from..].find("${{") {
        let start = search_from + rel_start;
        let body_start = start + 3;
        if let Some(rel_end) = s[body_start..].find("}}") {
            let body_end = body_start + rel_end;
            let end = body_end + 2;
            out.push((start, end, s[body_start..body_end].trim().to_string()));
            search_from = end;
        } else {
            break;
        }
    }
    out
}

fn resolve_path(path: &str, ctx: &dyn ResolutionContext) -> Value {
    let segments: Vec<&str> = path.split('.').collect();
    match segments.as_slice() {
        ["observability", prop] => ctx.lookup_observability(prop).unwrap_or_else(|| Value::String(String::new())),
        ["variables", key] => ctx.lookup_own_variable(key).unwrap_or(Value::Null),
        [kind, name, prop] => match ctx.lookup_node_output(kind, name, prop) {
            Lookup::Completed(v) => v,
            Lookup::Unavailable => Value::Null,
        },
        _ => Value::Null,
    }
}
