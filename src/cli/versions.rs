//! The `versions` command: compute effective versions.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::graph::UnitGraph;
use crate::state::StateStore;
use crate::version::EvComputer;

/// Compute effective versions for all buildable units.
#[derive(Args)]
pub struct VersionsCommand {
    /// Reuse persisted state for units whose refs are unchanged instead of
    /// recomputing everything.
    #[arg(long)]
    cold_start: bool,

    /// Persist the resulting EV map and ref-state snapshot.
    #[arg(long)]
    save: bool,
}

impl VersionsCommand {
    pub async fn execute(self, graph: &UnitGraph, store: &StateStore) -> Result<()> {
        let computer = EvComputer::new();
        let outcome = if self.cold_start {
            let prev_evs = store.load_ev_map().await;
            let prev_refs = store.load_ref_state().await;
            let current_refs = computer.snapshot_ref_state(graph).await;
            computer.compute_cold_start(graph, &current_refs, &prev_refs, &prev_evs).await?
        } else {
            computer.compute_all(graph).await?
        };

        for (name, ev) in &outcome.evs {
            println!("{}  {}", ev.green(), name);
        }
        let skipped = graph.len() - outcome.evs.len();
        if skipped > 0 {
            println!("{}", format!("({skipped} units not buildable yet)").dimmed());
        }

        if self.save {
            store.save_ev_map(&outcome.evs).await?;
            store.save_ref_state(&outcome.ref_state).await?;
            println!("{}", format!("state saved to {}", store.dir().display()).dimmed());
        }
        Ok(())
    }
}
