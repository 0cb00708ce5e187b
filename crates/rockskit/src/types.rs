//! Core types for declarative rock management.

use serde::{Deserialize, Serialize};

/// An installed rock as reported by the package manager.
///
/// Immutable value record; a fresh one is produced whenever installed
/// state is re-read or an install completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rock {
    /// Rock name, lowercased (the identity key)
    pub name: String,
    /// Installed version string as reported, e.g. "2.1.0-1" or "scm-1"
    pub version: String,
}

impl Rock {
    /// Create a rock, normalizing the name to lowercase.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            version: version.into(),
        }
    }
}

/// A declared (desired) rock from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredSpec {
    /// Rock name, lowercased (the identity key)
    pub name: String,
    /// Pinned version; `None` means "latest"
    pub version: Option<String>,
    /// Lazy flag: do not auto-activate the rock's runtime files
    #[serde(default)]
    pub opt: bool,
}

impl DesiredSpec {
    /// Create a desired spec, normalizing the name to lowercase.
    pub fn new(name: impl Into<String>, version: Option<String>, opt: bool) -> Self {
        Self {
            name: name.into().to_lowercase(),
            version,
            opt,
        }
    }

    /// Desired spec with no pin (install latest).
    pub fn latest(name: impl Into<String>) -> Self {
        Self::new(name, None, false)
    }

    /// Desired spec pinned to a version.
    pub fn pinned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(name, Some(version.into()), false)
    }
}

/// An installed rock with a newer version available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutdatedRock {
    /// Rock name, lowercased
    pub name: String,
    /// Currently installed version
    pub installed: String,
    /// Newest version the package manager knows about
    pub available: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_lowercased() {
        assert_eq!(Rock::new("LuaFileSystem", "1.8.0-1").name, "luafilesystem");
        assert_eq!(DesiredSpec::latest("Telescope").name, "telescope");
        assert_eq!(
            DesiredSpec::pinned("CJSON", "2.1.0").name,
            "cjson"
        );
    }

    #[test]
    fn test_desired_spec_defaults() {
        let spec = DesiredSpec::latest("plenary");
        assert_eq!(spec.version, None);
        assert!(!spec.opt);
    }
}
