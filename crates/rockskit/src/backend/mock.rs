//! In-memory backend for testing.
//!
//! Mimics the observable behavior of the real CLI backend: installs
//! record a `-1` rockspec revision, development installs land as
//! `scm-1`, and configured failures surface as tool errors.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{OutdatedRock, Rock};
use crate::version;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct MockState {
    installed: BTreeMap<String, Rock>,
    install_calls: Vec<(String, Option<String>)>,
    remove_calls: Vec<String>,
}

/// Backend over an in-memory rock tree.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    dependencies: BTreeMap<String, Vec<String>>,
    available: BTreeMap<String, String>,
    fail_install: BTreeSet<String>,
    fail_remove: BTreeSet<String>,
    fail_dependencies: BTreeSet<String>,
}

impl MockBackend {
    /// Create an empty mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an installed rock.
    pub fn with_installed(mut self, name: &str, installed_version: &str) -> Self {
        let rock = Rock::new(name, installed_version);
        self.state
            .get_mut()
            .expect("fresh mutex")
            .installed
            .insert(rock.name.clone(), rock);
        self
    }

    /// Declare a dependency edge for an installed rock.
    pub fn with_dependency(mut self, name: &str, dep: &str) -> Self {
        self.dependencies
            .entry(name.to_lowercase())
            .or_default()
            .push(dep.to_lowercase());
        self
    }

    /// Set the newest available version for a rock.
    pub fn with_available(mut self, name: &str, available_version: &str) -> Self {
        self.available
            .insert(name.to_lowercase(), available_version.to_string());
        self
    }

    /// Make installs of a rock fail.
    pub fn with_failing_install(mut self, name: &str) -> Self {
        self.fail_install.insert(name.to_lowercase());
        self
    }

    /// Make removals of a rock fail.
    pub fn with_failing_remove(mut self, name: &str) -> Self {
        self.fail_remove.insert(name.to_lowercase());
        self
    }

    /// Make dependency queries for a rock fail.
    pub fn with_failing_dependencies(mut self, name: &str) -> Self {
        self.fail_dependencies.insert(name.to_lowercase());
        self
    }

    /// Names currently installed, for assertions.
    pub fn installed_names(&self) -> Vec<String> {
        self.lock().installed.keys().cloned().collect()
    }

    /// Install calls seen so far, in order.
    pub fn install_calls(&self) -> Vec<(String, Option<String>)> {
        self.lock().install_calls.clone()
    }

    /// Remove calls seen so far, in order.
    pub fn remove_calls(&self) -> Vec<String> {
        self.lock().remove_calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Backend for MockBackend {
    fn is_available(&self) -> bool {
        true
    }

    fn installed(&self) -> Result<BTreeMap<String, Rock>> {
        Ok(self.lock().installed.clone())
    }

    fn dependencies(&self, name: &str) -> Result<BTreeMap<String, Rock>> {
        let key = name.to_lowercase();
        if self.fail_dependencies.contains(&key) {
            return Err(Error::tool("show", &key, "mock dependency query failure"));
        }
        let mut deps = BTreeMap::new();
        if let Some(names) = self.dependencies.get(&key) {
            for dep in names {
                deps.insert(dep.clone(), Rock::new(dep.clone(), ""));
            }
        }
        Ok(deps)
    }

    fn outdated(&self) -> Result<BTreeMap<String, OutdatedRock>> {
        let state = self.lock();
        let mut outdated = BTreeMap::new();
        for (name, rock) in &state.installed {
            if let Some(available) = self.available.get(name)
                && version::strip_revision(&rock.version) != version::strip_revision(available)
            {
                outdated.insert(
                    name.clone(),
                    OutdatedRock {
                        name: name.clone(),
                        installed: rock.version.clone(),
                        available: available.clone(),
                    },
                );
            }
        }
        Ok(outdated)
    }

    fn install(&self, name: &str, pin: Option<&str>) -> Result<Rock> {
        let key = name.to_lowercase();
        let mut state = self.lock();
        state
            .install_calls
            .push((key.clone(), pin.map(str::to_string)));

        if self.fail_install.contains(&key) {
            return Err(Error::tool("install", &key, "mock install failure"));
        }

        let stored = match pin {
            Some(v) if version::is_dev(v) => "scm-1".to_string(),
            Some(v) => format!("{v}-1"),
            None => self
                .available
                .get(&key)
                .cloned()
                .unwrap_or_else(|| "1.0.0-1".to_string()),
        };

        let rock = Rock::new(&key, &stored);
        state.installed.insert(key.clone(), rock);

        Ok(Rock::new(key, version::strip_revision(&stored)))
    }

    fn remove(&self, name: &str) -> Result<()> {
        let key = name.to_lowercase();
        let mut state = self.lock();
        state.remove_calls.push(key.clone());

        if self.fail_remove.contains(&key) {
            return Err(Error::tool("remove", &key, "mock remove failure"));
        }

        if state.installed.remove(&key).is_none() {
            return Err(Error::tool("remove", &key, "rock is not installed"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_records_revision() {
        let backend = MockBackend::new();
        let rock = backend.install("CJSON", Some("2.1.0")).unwrap();
        assert_eq!(rock.name, "cjson");
        assert_eq!(rock.version, "2.1.0");
        assert_eq!(backend.installed().unwrap()["cjson"].version, "2.1.0-1");
    }

    #[test]
    fn test_dev_install_lands_as_scm() {
        let backend = MockBackend::new();
        backend.install("telescope", Some("dev")).unwrap();
        assert_eq!(backend.installed().unwrap()["telescope"].version, "scm-1");
    }

    #[test]
    fn test_failing_install() {
        let backend = MockBackend::new().with_failing_install("broken");
        assert!(backend.install("broken", None).is_err());
        assert!(backend.installed().unwrap().is_empty());
    }

    #[test]
    fn test_outdated_compares_stripped_versions() {
        let backend = MockBackend::new()
            .with_installed("cjson", "2.1.0-1")
            .with_installed("lfs", "1.8.0-1")
            .with_available("cjson", "2.2.0-1")
            .with_available("lfs", "1.8.0-2");
        let outdated = backend.outdated().unwrap();
        assert!(outdated.contains_key("cjson"));
        // Revision-only bumps are not an upgrade
        assert!(!outdated.contains_key("lfs"));
    }
}
