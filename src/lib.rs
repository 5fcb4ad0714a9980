//! Content-addressed build versioning for multi-unit workspaces.
//!
//! A workspace here is a monorepo-style tree of independently buildable
//! "units" (libraries under `units/`, applications under `apps/`, plugins
//! under `plugins/`), each unit being its own git repository. For every
//! unit, unitver computes a single deterministic fingerprint, the
//! **effective version (EV)**, that changes if and only if the unit's own
//! content, or the content/linkage of any transitive internal dependency,
//! has changed. The EV keys a build cache and decides which units need
//! rebuilding.
//!
//! # Pipeline
//!
//! 1. [`graph`] discovers units and builds the internal dependency graph
//!    (cycle detection, topological ordering, reverse-dependency closure).
//! 2. [`version`] walks the graph in topological order, consulting
//!    [`fingerprint`] for git tree hashes and ref→commit resolution, and
//!    combines each unit's content hash with its sorted dependency
//!    signatures into the EV. Full, incremental, and cold-start-cached
//!    strategies produce identical results.
//! 3. [`state`] persists the EV map and a ref-state snapshot so a restarted
//!    process only recomputes what actually moved.
//! 4. [`version::build_key`] turns an EV into the final cache key.
//! 5. [`extract`] materializes a unit plus its transitive dependencies at
//!    exact commits for handoff to the bundler.
//!
//! Everything that touches a repository goes through [`git`], a thin
//! wrapper over the system `git` binary; each call runs one subprocess to
//! completion. The core spawns no background work and keeps no global
//! state (per-pass ref caches live inside each [`version::EvComputer`]),
//! so concurrent computations for different units are safe.

pub mod cli;
pub mod constants;
pub mod core;
pub mod extract;
pub mod fingerprint;
pub mod git;
pub mod graph;
pub mod manifest;
pub mod state;
pub mod version;
