//! Dependency ref parsing.
//!
//! Internal dependencies are declared with `workspace:`-style specifier
//! strings that select how the dependency's repository is resolved during
//! version computation:
//!
//! | Specifier | Mode |
//! |---|---|
//! | `""`, `"*"`, `"workspace:"`, `"workspace:*"` | default branch |
//! | `"workspace:commit:<sha>"` | pinned commit |
//! | `"workspace:ref:<ref>"` | explicit ref |
//! | `"workspace:branch:<name>"` | branch |
//! | `"workspace:<7-40 hex chars>"` | pinned commit (shorthand) |
//! | `"workspace:refs/..."` | explicit ref (shorthand) |
//! | `"workspace:<anything else>"` | branch (shorthand) |
//! | bare `<7-40 hex chars>` | pinned commit |
//! | bare `refs/...` | explicit ref |
//! | anything else | default branch |
//!
//! The shorthand rules are heuristics with real ambiguity: a branch
//! literally named as 40 hex characters is classified as a pinned commit.
//! That behavior is kept for compatibility with existing workspaces; use
//! the explicit `branch:` marker to disambiguate.
//!
//! Parsing is pure: no I/O, fully deterministic.

/// How a dependency's repository state is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefMode {
    /// Follow the dependency repository's default branch.
    Default,
    /// Follow a named branch.
    Branch(String),
    /// Follow a full ref string (e.g. `refs/tags/v2`).
    ExplicitRef(String),
    /// Pin to a commit SHA (7–40 hex characters, possibly abbreviated).
    Commit(String),
}

/// A parsed internal-dependency specifier. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    /// The raw specifier string exactly as declared in the manifest. Feeds
    /// into dependency signatures so that changing the declaration changes
    /// the dependent's effective version even when the resolved commit is
    /// momentarily identical.
    pub raw: String,
    /// The resolution mode derived from the raw specifier.
    pub mode: RefMode,
}

impl DependencyRef {
    /// Whether this ref follows the dependency's default branch.
    pub fn is_default(&self) -> bool {
        matches!(self.mode, RefMode::Default)
    }
}

/// Parse a raw internal-dependency specifier into a [`DependencyRef`].
pub fn parse_dependency_ref(raw: &str) -> DependencyRef {
    let spec = raw.trim();
    let mode = match strip_workspace_prefix(spec) {
        Some(rest) => parse_workspace_rest(rest.trim()),
        None => {
            if spec.is_empty() || spec == "*" {
                RefMode::Default
            } else if is_hex_sha(spec) {
                RefMode::Commit(spec.to_string())
            } else if spec.starts_with("refs/") {
                RefMode::ExplicitRef(spec.to_string())
            } else {
                // External-style version ranges and anything unrecognized
                // fall back to the default branch.
                RefMode::Default
            }
        }
    };
    DependencyRef {
        raw: raw.to_string(),
        mode,
    }
}

/// Strip a case-insensitive `workspace:` prefix.
fn strip_workspace_prefix(spec: &str) -> Option<&str> {
    const PREFIX: &str = "workspace:";
    match spec.split_at_checked(PREFIX.len()) {
        Some((head, rest)) if head.eq_ignore_ascii_case(PREFIX) => Some(rest),
        _ => None,
    }
}

/// Parse everything after `workspace:`.
fn parse_workspace_rest(rest: &str) -> RefMode {
    if rest.is_empty() || rest == "*" {
        RefMode::Default
    } else if let Some(sha) = rest.strip_prefix("commit:") {
        RefMode::Commit(sha.to_string())
    } else if let Some(r) = rest.strip_prefix("ref:") {
        RefMode::ExplicitRef(r.to_string())
    } else if let Some(b) = rest.strip_prefix("branch:") {
        RefMode::Branch(b.to_string())
    } else if is_hex_sha(rest) {
        RefMode::Commit(rest.to_string())
    } else if rest.starts_with("refs/") {
        RefMode::ExplicitRef(rest.to_string())
    } else {
        // Branch name shorthand.
        RefMode::Branch(rest.to_string())
    }
}

/// A bare 7–40 character hex string, i.e. a plausible (abbreviated) SHA.
fn is_hex_sha(s: &str) -> bool {
    (7..=40).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
}
