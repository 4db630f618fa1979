use orbiter_domain::{Action, Plan};
use orbiter_executor::{DriftEntry, ExecutionResult, ProgressStatus};
use orbiter_graph::Graph;

/// Render a plan as human-readable text, one line per change.
pub fn render_plan_text(plan: &Plan) -> String {
    if plan.is_empty() {
        return "No changes.\n".to_string();
    }
    let mut out = String::new();
    for change in &plan.changes {
        let marker = match change.action {
            Action::Create => "+",
            Action::Update | Action::Replace => "~",
            Action::Delete => "-",
            Action::Noop => " ",
        };
        out.push_str(&format!("{} {} ({})\n", marker, change.node_id, change.reason));
        for pc in &change.property_changes {
            out.push_str(&format!("    {}\n", render_property_change(pc)));
        }
    }
    out.push_str(&format!(
        "\n{} to create, {} to update, {} to delete, {} unchanged.\n",
        plan.to_create, plan.to_update, plan.to_delete, plan.no_change
    ));
    out
}

fn render_property_change(pc: &orbiter_domain::PropertyChange) -> String {
    use orbiter_domain::PropertyChange::*;
    match pc {
        Added { key, value } => format!("+ {key} = {value:?}"),
        Removed { key, value } => format!("- {key} = {value:?}"),
        Changed { key, before, after } => format!("~ {key}: {before:?} -> {after:?}"),
    }
}

/// Render a completed run's per-node outcomes as human-readable text.
pub fn render_result_text(result: &ExecutionResult) -> String {
    let mut out = String::new();
    for node_result in &result.results {
        let marker = match node_result.status {
            ProgressStatus::Completed => "✓",
            ProgressStatus::Failed => "✗",
            ProgressStatus::Skipped => "·",
            ProgressStatus::Pending | ProgressStatus::Running => "?",
        };
        out.push_str(&format!("{} {} ({})\n", marker, node_result.node_id, node_result.action));
        if let Some(err) = &node_result.error {
            out.push_str(&format!("    ! {err}\n"));
        }
    }
    out.push_str(&format!(
        "\nrun {}.\n",
        if result.succeeded() { "succeeded" } else { "failed" }
    ));
    out
}

/// Render the dependency graph as plain text, one node per line with its
/// declared dependencies.
pub fn render_graph_text(graph: &Graph) -> String {
    let mut out = String::new();
    for node in graph.nodes() {
        out.push_str(&format!("{} [{}]\n", node.id, node.state));
        for dep in &node.depends_on {
            out.push_str(&format!("  -> {dep}\n"));
        }
    }
    out
}

/// Render a drift sweep's findings as human-readable text.
pub fn render_drift_text(entries: &[DriftEntry]) -> String {
    if entries.is_empty() {
        return "No observable resources.\n".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let marker = if !entry.exists {
            "!"
        } else if !entry.healthy || entry.outputs_changed {
            "~"
        } else {
            " "
        };
        out.push_str(&format!("{} {}.{} ({})\n", marker, entry.ty.as_str(), entry.name, entry.node_id));
        if !entry.exists {
            out.push_str("    missing from live state\n");
        } else if !entry.healthy {
            out.push_str("    unhealthy\n");
        } else if entry.outputs_changed {
            out.push_str("    outputs changed since last recorded\n");
        }
    }
    out
}

/// Render the dependency graph as Graphviz DOT.
pub fn render_dot(graph: &Graph) -> String {
    let mut out = String::from("digraph orbiter {\n  rankdir=LR;\n  node [shape=box];\n\n");
    for node in graph.nodes() {
        out.push_str(&format!("  \"{}\" [label=\"{}\"];\n", node.id, node.name));
    }
    out.push('\n');
    for node in graph.nodes() {
        for dep in &node.depends_on {
            out.push_str(&format!("  \"{}\" -> \"{}\";\n", node.id, dep));
        }
    }
    out.push('}');
    out
}
