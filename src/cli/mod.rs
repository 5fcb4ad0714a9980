//! Command-line interface for unitver.
//!
//! Subcommands:
//! - `graph`: show discovered units and their topological order
//! - `versions`: compute effective versions (full or cold-start-cached)
//! - `diff`: compare the persisted EV map against a fresh computation
//! - `key`: derive the build cache key for one unit
//! - `extract`: materialize a unit's pinned source tree for a build
//!
//! All commands discover the unit graph from `--workspace` (default: the
//! current directory) before dispatching.

mod diff;
mod extract;
mod graph;
mod key;
mod versions;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::git::ensure_git_available;
use crate::graph::UnitGraph;
use crate::state::StateStore;

/// Content-addressed build versioning for multi-unit workspaces.
#[derive(Parser)]
#[command(name = "unitver", version, about, long_about = None)]
pub struct Cli {
    /// Workspace root containing the `units/`, `apps/`, and `plugins/`
    /// directories.
    #[arg(long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Override the state directory (default: the platform data dir).
    #[arg(long, global = true, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show discovered units and their topological order.
    Graph(graph::GraphCommand),
    /// Compute effective versions for all buildable units.
    Versions(versions::VersionsCommand),
    /// Diff the persisted effective versions against a fresh computation.
    Diff(diff::DiffCommand),
    /// Derive the build cache key for a unit.
    Key(key::KeyCommand),
    /// Extract a unit and its dependencies at exact commits.
    Extract(extract::ExtractCommand),
}

impl Cli {
    /// Execute the selected command.
    pub async fn execute(self) -> Result<()> {
        ensure_git_available()?;
        let graph = UnitGraph::discover(&self.workspace)?;
        let store = match self.state_dir {
            Some(dir) => StateStore::at(dir),
            None => StateStore::new()?,
        };
        match self.command {
            Commands::Graph(cmd) => cmd.execute(&graph),
            Commands::Versions(cmd) => cmd.execute(&graph, &store).await,
            Commands::Diff(cmd) => cmd.execute(&graph, &store).await,
            Commands::Key(cmd) => cmd.execute(&graph).await,
            Commands::Extract(cmd) => cmd.execute(&graph).await,
        }
    }
}
