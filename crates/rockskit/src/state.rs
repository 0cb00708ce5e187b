//! Process-scoped derived state.
//!
//! The prune-eligibility cache answers "which rocks are currently safe
//! to prune" for UI affordances without re-querying the package
//! manager. It starts empty, is invalidated before any install or
//! remove, and is refreshed after every completed run, including runs
//! that finished with errors.

use std::collections::BTreeSet;

/// Cache of rocks that are currently safe to prune.
#[derive(Debug, Default)]
pub struct PruneCache {
    prunable: Option<BTreeSet<String>>,
}

impl PruneCache {
    /// Create an empty (stale) cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached set; installed state is about to change.
    pub fn invalidate(&mut self) {
        self.prunable = None;
    }

    /// Store a freshly computed prunable set.
    pub fn refresh(&mut self, prunable: BTreeSet<String>) {
        self.prunable = Some(prunable);
    }

    /// Whether the cache currently holds a value.
    pub fn is_fresh(&self) -> bool {
        self.prunable.is_some()
    }

    /// The cached prunable set, if fresh.
    pub fn prunable(&self) -> Option<&BTreeSet<String>> {
        self.prunable.as_ref()
    }

    /// Whether a rock is prunable; `None` when the cache is stale.
    pub fn is_prunable(&self, name: &str) -> Option<bool> {
        self.prunable
            .as_ref()
            .map(|set| set.contains(&name.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_stale() {
        let cache = PruneCache::new();
        assert!(!cache.is_fresh());
        assert_eq!(cache.is_prunable("anything"), None);
    }

    #[test]
    fn test_refresh_and_invalidate() {
        let mut cache = PruneCache::new();
        cache.refresh(BTreeSet::from(["orphan".to_string()]));
        assert_eq!(cache.is_prunable("Orphan"), Some(true));
        assert_eq!(cache.is_prunable("kept"), Some(false));

        cache.invalidate();
        assert_eq!(cache.is_prunable("orphan"), None);
    }
}
