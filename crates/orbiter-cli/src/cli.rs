use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "orbiter",
    about = "Infrastructure deployment engine: typed graph, planner, reactive executor",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute and print the delta against recorded state without applying it.
    Plan {
        /// Path to the workspace directory (environment.yml, datacenter.yml, components/).
        workspace: PathBuf,

        #[arg(long, default_value = "./.orbiter-state")]
        state_dir: PathBuf,
    },

    /// Compute and apply the delta against recorded state.
    Apply {
        workspace: PathBuf,

        #[arg(long, default_value = "./.orbiter-state")]
        state_dir: PathBuf,

        /// Run the reactive parallel driver instead of the sequential one.
        #[arg(long)]
        reactive: bool,

        /// Max nodes in flight at once; only meaningful with --reactive.
        #[arg(long, default_value_t = 10)]
        parallelism: usize,

        /// Stop launching new work as soon as any node fails.
        #[arg(long)]
        stop_on_error: bool,

        /// Recompute and recheck force-update flags but skip the plugin calls.
        #[arg(long)]
        dry_run: bool,
    },

    /// Destroy every resource recorded for this environment.
    Destroy {
        workspace: PathBuf,

        #[arg(long, default_value = "./.orbiter-state")]
        state_dir: PathBuf,

        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Render the dependency graph built from the workspace.
    Graph {
        workspace: PathBuf,

        #[arg(long, default_value = "text")]
        output: GraphOutput,
    },

    /// Observe every recorded resource's live state, without changing anything.
    Drift {
        workspace: PathBuf,

        #[arg(long, default_value = "./.orbiter-state")]
        state_dir: PathBuf,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum GraphOutput {
    Text,
    Json,
    Dot,
}
