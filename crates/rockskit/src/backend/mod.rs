//! Backend abstraction for LuaRocks operations.
//!
//! The [`Backend`] trait defines the interface for querying and
//! mutating the installed rock tree, allowing for different
//! implementations (real CLI, mock for testing).
//!
//! Queries are read-only views over current on-disk truth. No caching
//! happens inside a backend; installed state goes stale the moment any
//! install or remove returns, so callers re-read as often as they need.

pub mod luarocks;
pub mod mock;

use crate::error::Result;
use crate::types::{OutdatedRock, Rock};
use std::collections::BTreeMap;

/// Backend trait for LuaRocks operations.
pub trait Backend {
    /// Check if the package manager is available.
    fn is_available(&self) -> bool;

    /// The currently installed rocks, keyed by lowercased name.
    fn installed(&self) -> Result<BTreeMap<String, Rock>>;

    /// Direct dependencies of an installed rock, keyed by name.
    ///
    /// Used only to decide pruning eligibility, never for install
    /// ordering.
    fn dependencies(&self, name: &str) -> Result<BTreeMap<String, Rock>>;

    /// Installed rocks with a newer version available.
    fn outdated(&self) -> Result<BTreeMap<String, OutdatedRock>>;

    /// Install a rock, optionally at a pinned version.
    ///
    /// The development marker becomes `--dev` rather than a version
    /// argument. Returns the concretely installed rock recovered from
    /// the tool's stdout.
    fn install(&self, name: &str, version: Option<&str>) -> Result<Rock>;

    /// Remove an installed rock.
    fn remove(&self, name: &str) -> Result<()>;
}
