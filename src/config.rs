//! The rocks manifest: the declared desired state.
//!
//! `rocks.toml` maps rock names to either a bare version string or a
//! structured entry:
//!
//! ```toml
//! [rocks]
//! lua-cjson = "2.1.0"
//! telescope = "dev"
//! neotest = { version = "5.2.3", opt = true }
//! plenary = {}
//! ```
//!
//! A bare string pins a version (`"dev"` pins the unreleased build);
//! an empty table tracks the latest release.

use anyhow::{Context, Result};
use rockskit::DesiredSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default manifest location: `<config dir>/rocksync/rocks.toml`.
pub fn default_manifest_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("rocksync").join("rocks.toml"))
}

/// One manifest entry, either a bare version string or a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    /// `name = "2.1.0"`
    Version(String),
    /// `name = { version = "2.1.0", opt = true }`
    Spec {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        opt: bool,
    },
}

/// The declared rock set.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub rocks: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Load the manifest; a missing file is an empty manifest.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid manifest format in {}", path.display()))
    }

    /// Write the manifest back to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Could not write {}", path.display()))?;
        Ok(())
    }

    /// Normalize every entry into the engine's desired-state shape,
    /// keyed by canonical (lowercased) name.
    pub fn desired(&self) -> BTreeMap<String, DesiredSpec> {
        self.rocks
            .iter()
            .map(|(name, entry)| {
                let spec = match entry {
                    ManifestEntry::Version(version) => {
                        DesiredSpec::new(name, Some(version.clone()), false)
                    }
                    ManifestEntry::Spec { version, opt } => {
                        DesiredSpec::new(name, version.clone(), *opt)
                    }
                };
                (spec.name.clone(), spec)
            })
            .collect()
    }

    /// Write back a single entry, using the compact bare-string form
    /// where nothing but a pin needs recording.
    pub fn set(&mut self, spec: &DesiredSpec) {
        let entry = match (&spec.version, spec.opt) {
            (Some(version), false) => ManifestEntry::Version(version.clone()),
            (version, opt) => ManifestEntry::Spec {
                version: version.clone(),
                opt,
            },
        };
        // Drop any differently-cased duplicate of the same rock.
        self.rocks
            .retain(|name, _| name.to_lowercase() != spec.name);
        self.rocks.insert(spec.name.clone(), entry);
    }

    /// Drop an entry; returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let canonical = name.to_lowercase();
        let before = self.rocks.len();
        self.rocks.retain(|key, _| key.to_lowercase() != canonical);
        self.rocks.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_and_structured_entries() {
        let manifest: Manifest = toml::from_str(
            r#"
            [rocks]
            lua-cjson = "2.1.0"
            telescope = "dev"
            neotest = { version = "5.2.3", opt = true }
            plenary = {}
            "#,
        )
        .unwrap();

        let desired = manifest.desired();
        assert_eq!(desired["lua-cjson"].version.as_deref(), Some("2.1.0"));
        assert_eq!(desired["telescope"].version.as_deref(), Some("dev"));
        assert!(desired["neotest"].opt);
        assert_eq!(desired["plenary"].version, None);
        assert!(!desired["plenary"].opt);
    }

    #[test]
    fn test_names_are_canonicalized() {
        let manifest: Manifest = toml::from_str(
            r#"
            [rocks]
            Penlight = "1.13.1"
            "#,
        )
        .unwrap();
        assert!(manifest.desired().contains_key("penlight"));
    }

    #[test]
    fn test_set_prefers_bare_form() {
        let mut manifest = Manifest::default();
        manifest.set(&DesiredSpec::pinned("cjson", "2.1.0"));
        assert_eq!(
            manifest.rocks["cjson"],
            ManifestEntry::Version("2.1.0".to_string())
        );

        manifest.set(&DesiredSpec::new("neotest", Some("5.2.3".to_string()), true));
        assert_eq!(
            manifest.rocks["neotest"],
            ManifestEntry::Spec {
                version: Some("5.2.3".to_string()),
                opt: true,
            }
        );
    }

    #[test]
    fn test_remove_is_case_insensitive() {
        let mut manifest = Manifest::default();
        manifest.rocks.insert(
            "Penlight".to_string(),
            ManifestEntry::Version("1.13.1".to_string()),
        );
        assert!(manifest.remove("penlight"));
        assert!(manifest.rocks.is_empty());
        assert!(!manifest.remove("penlight"));
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rocks.toml");

        let mut manifest = Manifest::default();
        manifest.set(&DesiredSpec::pinned("cjson", "2.1.0"));
        manifest.set(&DesiredSpec::new("lazy-rock", None, true));
        manifest.save(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded.desired(), manifest.desired());
    }

    #[test]
    fn test_missing_file_is_empty_manifest() {
        let manifest = Manifest::load(Path::new("/nonexistent/rocks.toml")).unwrap();
        assert!(manifest.rocks.is_empty());
    }
}
