//! The `graph` command: inspect the discovered unit graph.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::graph::UnitGraph;

/// Show discovered units and their topological order.
#[derive(Args)]
pub struct GraphCommand {
    /// Also list each unit's internal dependencies.
    #[arg(long)]
    deps: bool,
}

impl GraphCommand {
    pub fn execute(self, graph: &UnitGraph) -> Result<()> {
        if graph.is_empty() {
            println!("no units discovered");
            return Ok(());
        }
        let order = graph.topo_order()?;
        println!("{} ({} units, dependencies first):", "Topological order".bold(), order.len());
        for name in &order {
            let Some(unit) = graph.unit(name) else { continue };
            println!("  {}  {}", name.cyan(), format!("[{}]", unit.kind).dimmed());
            if self.deps {
                for dep in &unit.internal_deps {
                    let raw = unit.dep_refs.get(dep).map_or("", |r| r.raw.as_str());
                    println!("    └─ {dep} {}", format!("({raw})").dimmed());
                }
            }
        }
        Ok(())
    }
}
