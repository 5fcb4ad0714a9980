//! The `diff` command: what changed since the last persisted computation.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::graph::UnitGraph;
use crate::state::StateStore;
use crate::version::{EvComputer, diff_ev_maps};

/// Diff the persisted effective versions against a fresh computation.
#[derive(Args)]
pub struct DiffCommand;

impl DiffCommand {
    pub async fn execute(self, graph: &UnitGraph, store: &StateStore) -> Result<()> {
        let previous = store.load_ev_map().await;
        let outcome = EvComputer::new().compute_all(graph).await?;
        let changes = diff_ev_maps(&previous, &outcome.evs);

        if changes.is_empty() {
            println!("no changes");
            return Ok(());
        }
        for name in &changes.changed {
            println!("{} {name}", "~".yellow());
        }
        for name in &changes.added {
            println!("{} {name}", "+".green());
        }
        for name in &changes.removed {
            println!("{} {name}", "-".red());
        }
        Ok(())
    }
}
