//! Error types for unitver.
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`UnitverError`]) for failure modes callers
//!    need to branch on: a unit with no default branch is routine and must
//!    be distinguishable from a broken git installation.
//! 2. **`anyhow` context** everywhere else, so CLI output carries the chain
//!    of operations that led to a failure.
//!
//! Severity conventions:
//! - [`UnitverError::NoDefaultBranch`] is non-fatal: the unit is simply not
//!   buildable yet and is omitted from the effective-version map.
//! - [`UnitverError::CircularDependency`] is fatal for the whole graph
//!   computation and carries the exact offending chain.
//! - [`UnitverError::FileMissingAtCommit`] is fatal for an extraction:
//!   reproducible builds must never silently substitute working-tree
//!   content for pinned content.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for unitver operations.
#[derive(Error, Debug)]
pub enum UnitverError {
    /// Git executable not found in PATH.
    #[error("git command not found. Install git and ensure it is in your PATH")]
    GitNotFound,

    /// A git subprocess exited with a non-zero status.
    #[error("git {operation} failed{}", stderr.as_ref().map(|s| format!(": {s}")).unwrap_or_default())]
    GitCommandError {
        /// The git subcommand that failed (e.g. "rev-parse", "archive").
        operation: String,
        /// Captured stderr, when available.
        stderr: Option<String>,
    },

    /// A git subprocess did not finish within its timeout.
    #[error("git {operation} timed out after {seconds} seconds")]
    GitTimeout { operation: String, seconds: u64 },

    /// Neither the primary nor the fallback default branch exists in a unit
    /// repository. Callers treat this as "unit not buildable yet".
    #[error("no default branch in {}: tried '{primary}' and '{fallback}'", location.display())]
    NoDefaultBranch {
        location: PathBuf,
        primary: String,
        fallback: String,
    },

    /// The internal dependency graph contains a cycle. The payload is the
    /// full chain, first node repeated at the end.
    #[error("circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// A unit manifest could not be parsed.
    #[error("failed to parse unit manifest {}: {reason}", path.display())]
    ManifestParseError { path: PathBuf, reason: String },

    /// A file does not exist at a pinned commit. Raised during extraction;
    /// there is deliberately no fallback to the working tree.
    #[error("'{path}' does not exist at commit {commit}")]
    FileMissingAtCommit { path: String, commit: String },

    /// A unit's commit could not be resolved during the pre-extraction
    /// resolve phase. Fails the whole extraction.
    #[error("cannot resolve a commit for unit '{unit}' during source extraction")]
    UnresolvedExtractionCommit { unit: String },

    /// The named unit is not present in the workspace graph.
    #[error("unknown unit '{name}'")]
    UnknownUnit { name: String },
}
