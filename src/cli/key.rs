//! The `key` command: derive a unit's build cache key.

use anyhow::{Context, Result};
use clap::Args;

use crate::graph::UnitGraph;
use crate::version::EvComputer;
use crate::version::build_key::build_key;

/// Derive the build cache key for a unit.
#[derive(Args)]
pub struct KeyCommand {
    /// Unit name (e.g. `@units/auth`).
    unit: String,

    /// Derive the key for a minified build.
    #[arg(long)]
    minify: bool,
}

impl KeyCommand {
    pub async fn execute(self, graph: &UnitGraph) -> Result<()> {
        graph.require_unit(&self.unit)?;
        let outcome = EvComputer::new().compute_all(graph).await?;
        let ev = outcome
            .evs
            .get(&self.unit)
            .with_context(|| format!("'{}' is not buildable yet (no default branch)", self.unit))?;
        println!("{}", build_key(&self.unit, ev, self.minify));
        Ok(())
    }
}
