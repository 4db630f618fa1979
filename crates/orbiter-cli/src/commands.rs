use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use orbiter_config::load_workspace;
use orbiter_executor::{ExecutionOptions, Executor};
use orbiter_hooks::Datacenter;
use orbiter_plugin::{LocalPlugin, StaticPluginRegistry};
use orbiter_state::{FileBackend, StateBackend};

use crate::cli::GraphOutput;
use crate::output;

pub async fn plan(workspace: PathBuf, state_dir: PathBuf) -> Result<()> {
    let ws = load_workspace(&workspace).with_context(|| format!("loading workspace at {}", workspace.display()))?;
    let backend = FileBackend::new(state_dir);
    let previous = backend.get_environment(&ws.environment).await.context("reading recorded state")?;

    let result = orbiter_planner::plan(&ws.graph, previous.as_ref(), ws.environment, ws.datacenter_name, ws.force_update)
        .context("planning")?;

    print!("{}", output::render_plan_text(&result));
    Ok(())
}

pub async fn apply(
    workspace: PathBuf,
    state_dir: PathBuf,
    reactive: bool,
    parallelism: usize,
    stop_on_error: bool,
    dry_run: bool,
) -> Result<()> {
    let ws = load_workspace(&workspace).with_context(|| format!("loading workspace at {}", workspace.display()))?;
    let mut graph = ws.graph;
    let backend: Arc<dyn StateBackend> = Arc::new(FileBackend::new(state_dir));
    let previous = backend.get_environment(&ws.environment).await.context("reading recorded state")?;

    let change_plan = orbiter_planner::plan(&graph, previous.as_ref(), ws.environment.clone(), ws.datacenter_name.clone(), ws.force_update)
        .context("planning")?;

    print!("{}", output::render_plan_text(&change_plan));

    if dry_run {
        println!("(dry run, no changes applied)");
        return Ok(());
    }
    if change_plan.is_empty() {
        return Ok(());
    }

    let datacenter: Arc<dyn Datacenter> = Arc::new(ws.datacenter);
    let mut plugins = StaticPluginRegistry::new();
    plugins.register(Arc::new(LocalPlugin::new()));

    let executor = Executor::new(datacenter, Arc::new(plugins), backend);

    let mut options = ExecutionOptions::new(ws.datacenter_name.clone());
    options.parallelism = parallelism;
    options.stop_on_error = stop_on_error;
    options.datacenter_variables = ws.variables;

    let result = if reactive {
        executor.run_reactive(&mut graph, &change_plan, &options, CancellationToken::new()).await
    } else {
        executor.run_sequential(&mut graph, &change_plan, &options, CancellationToken::new()).await
    }
    .context("applying plan")?;

    print!("{}", output::render_result_text(&result));
    if !result.succeeded() {
        anyhow::bail!("one or more nodes failed");
    }
    Ok(())
}

pub async fn destroy(workspace: PathBuf, state_dir: PathBuf, yes: bool) -> Result<()> {
    let ws = load_workspace(&workspace).with_context(|| format!("loading workspace at {}", workspace.display()))?;
    let mut graph = ws.graph;
    let backend: Arc<dyn StateBackend> = Arc::new(FileBackend::new(state_dir));
    let Some(state) = backend.get_environment(&ws.environment).await.context("reading recorded state")? else {
        println!("No recorded state for environment '{}', nothing to destroy.", ws.environment.as_str());
        return Ok(());
    };

    let destroy_plan = orbiter_planner::plan_destroy(&state);
    print!("{}", output::render_plan_text(&destroy_plan));
    if destroy_plan.is_empty() {
        return Ok(());
    }

    if !yes && !confirm(&format!("This will destroy {} resource(s) in '{}'.", destroy_plan.to_delete, ws.environment.as_str()))? {
        anyhow::bail!("aborted");
    }

    let datacenter: Arc<dyn Datacenter> = Arc::new(ws.datacenter);
    let mut plugins = StaticPluginRegistry::new();
    plugins.register(Arc::new(LocalPlugin::new()));
    let executor = Executor::new(datacenter, Arc::new(plugins), backend);

    let mut options = ExecutionOptions::new(ws.datacenter_name);
    options.datacenter_variables = ws.variables;

    let result = executor
        .run_sequential(&mut graph, &destroy_plan, &options, CancellationToken::new())
        .await
        .context("destroying resources")?;

    print!("{}", output::render_result_text(&result));
    if !result.succeeded() {
        anyhow::bail!("one or more destroys failed");
    }
    Ok(())
}

pub async fn graph(workspace: PathBuf, format: GraphOutput) -> Result<()> {
    let ws = load_workspace(&workspace).with_context(|| format!("loading workspace at {}", workspace.display()))?;
    match format {
        GraphOutput::Text => print!("{}", output::render_graph_text(&ws.graph)),
        GraphOutput::Dot => println!("{}", output::render_dot(&ws.graph)),
        GraphOutput::Json => println!("{}", serde_json::to_string_pretty(&ws.graph.nodes().collect::<Vec<_>>())?),
    }
    Ok(())
}

pub async fn drift(workspace: PathBuf, state_dir: PathBuf) -> Result<()> {
    let ws = load_workspace(&workspace).with_context(|| format!("loading workspace at {}", workspace.display()))?;
    let backend = FileBackend::new(state_dir);
    let Some(state) = backend.get_environment(&ws.environment).await.context("reading recorded state")? else {
        println!("No recorded state for environment '{}', nothing to observe.", ws.environment.as_str());
        return Ok(());
    };

    let datacenter = ws.datacenter;
    let mut plugins = StaticPluginRegistry::new();
    plugins.register(Arc::new(LocalPlugin::new()));

    let entries = orbiter_executor::drift_report(&ws.graph, &state, &datacenter, &plugins, &ws.environment, &ws.variables)
        .await
        .context("observing drift")?;

    print!("{}", output::render_drift_text(&entries));
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::{self, BufRead, Write};
    println!("{prompt}");
    print!("Type 'yes' to continue: ");
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim() == "yes")
}
