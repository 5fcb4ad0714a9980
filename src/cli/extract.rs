//! The `extract` command: materialize a unit's source tree.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::extract::extract_for_build;
use crate::graph::UnitGraph;

/// Extract a unit and its transitive dependencies at exact commits.
#[derive(Args)]
pub struct ExtractCommand {
    /// Unit name (e.g. `@apps/web`).
    unit: String,
}

impl ExtractCommand {
    pub async fn execute(self, graph: &UnitGraph) -> Result<()> {
        let unit = graph.require_unit(&self.unit)?;
        let source = extract_for_build(unit, graph, None).await?;
        for (name, commit) in source.commits() {
            let short = commit.get(..12).unwrap_or(commit);
            println!("{}  {name}", short.dimmed());
        }
        // Hand the tree over to the caller; cleanup becomes their problem.
        let root = source.keep();
        println!("{}", root.display().to_string().bold());
        Ok(())
    }
}
