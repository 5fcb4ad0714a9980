//! Core types shared across the versioning engine.

pub mod error;

pub use error::UnitverError;

use std::fmt;

/// Kind of a buildable unit, derived from the workspace subdirectory it
/// lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Shared library under `units/`.
    Library,
    /// Deployable application under `apps/`.
    Application,
    /// Auxiliary member (plugins, tooling) under `plugins/`.
    Auxiliary,
}

impl UnitKind {
    /// Map a workspace subdirectory name to a unit kind.
    pub fn from_workspace_dir(dir: &str) -> Option<Self> {
        match dir {
            "units" => Some(Self::Library),
            "apps" => Some(Self::Application),
            "plugins" => Some(Self::Auxiliary),
            _ => None,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Library => "library",
            Self::Application => "application",
            Self::Auxiliary => "auxiliary",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_workspace_dir() {
        assert_eq!(UnitKind::from_workspace_dir("units"), Some(UnitKind::Library));
        assert_eq!(UnitKind::from_workspace_dir("apps"), Some(UnitKind::Application));
        assert_eq!(UnitKind::from_workspace_dir("plugins"), Some(UnitKind::Auxiliary));
        assert_eq!(UnitKind::from_workspace_dir("vendor"), None);
    }

    #[test]
    fn kind_display() {
        assert_eq!(UnitKind::Library.to_string(), "library");
        assert_eq!(UnitKind::Application.to_string(), "application");
        assert_eq!(UnitKind::Auxiliary.to_string(), "auxiliary");
    }
}
