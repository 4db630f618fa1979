mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = if std::env::var("ARCCTL_DEBUG").is_ok() {
        EnvFilter::from_default_env().add_directive("orbiter_executor=debug".parse().expect("valid directive"))
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan { workspace, state_dir } => commands::plan(workspace, state_dir).await,
        Command::Apply { workspace, state_dir, reactive, parallelism, stop_on_error, dry_run } => {
            commands::apply(workspace, state_dir, reactive, parallelism, stop_on_error, dry_run).await
        }
        Command::Destroy { workspace, state_dir, yes } => commands::destroy(workspace, state_dir, yes).await,
        Command::Graph { workspace, output } => commands::graph(workspace, output).await,
        Command::Drift { workspace, state_dir } => commands::drift(workspace, state_dir).await,
    }
}
