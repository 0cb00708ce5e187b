//! Version parsing and ordering for rock versions.
//!
//! LuaRocks versions are `<semver-ish>-<revision>` strings such as
//! `2.1.0-1`. The rockspec revision is packaging metadata, not a
//! package version, so it is stripped before comparison. Development
//! builds are published as `scm-<rev>` (declared as `dev` in the
//! manifest) and compare greater than every released version.

use crate::error::{Error, Result};
use std::cmp::Ordering;

/// Manifest marker for a development (unreleased) version.
pub const DEV: &str = "dev";

/// Prefix luarocks uses for installed development versions.
pub const SCM_PREFIX: &str = "scm";

/// A parsed rock version.
#[derive(Debug, Clone)]
pub enum Version {
    /// Development/unreleased build, newer than anything released.
    Dev,
    /// Released version as numeric components (revision stripped).
    Release(Vec<u64>),
}

impl Version {
    /// Parse a version string.
    ///
    /// Accepts `dev`, `scm`, `scm-1`, `1.0.0`, `1.0.0-1`, `v2.4`.
    /// Fails if no numeric component can be recovered.
    pub fn parse(name: &str, raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if is_dev(raw) {
            return Ok(Version::Dev);
        }

        // Strip the rockspec revision suffix and a leading 'v'.
        let base = raw.split('-').next().unwrap_or(raw);
        let base = base.strip_prefix('v').unwrap_or(base);

        let mut components = Vec::new();
        for part in base.split('.') {
            match part.parse::<u64>() {
                Ok(n) => components.push(n),
                Err(_) => break,
            }
        }

        if components.is_empty() {
            return Err(Error::Parse {
                name: name.to_string(),
                version: raw.to_string(),
            });
        }

        Ok(Version::Release(components))
    }

    /// Whether this is a development version.
    pub fn is_dev(&self) -> bool {
        matches!(self, Version::Dev)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Version::Dev, Version::Dev) => Ordering::Equal,
            (Version::Dev, Version::Release(_)) => Ordering::Greater,
            (Version::Release(_), Version::Dev) => Ordering::Less,
            (Version::Release(a), Version::Release(b)) => {
                // Compare component-wise, treating missing trailing
                // components as zero so 1.0 == 1.0.0.
                let len = a.len().max(b.len());
                for i in 0..len {
                    let x = a.get(i).copied().unwrap_or(0);
                    let y = b.get(i).copied().unwrap_or(0);
                    match x.cmp(&y) {
                        Ordering::Equal => {}
                        ord => return ord,
                    }
                }
                Ordering::Equal
            }
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Whether a raw version string denotes a development build.
pub fn is_dev(raw: &str) -> bool {
    let raw = raw.trim().to_lowercase();
    raw == DEV || raw.starts_with(SCM_PREFIX)
}

/// Strip the rockspec revision suffix from an installed version string.
///
/// `"2.1.0-1"` becomes `"2.1.0"`; `"scm-1"` stays `"scm-1"` since the
/// whole token identifies the build.
pub fn strip_revision(raw: &str) -> &str {
    if is_dev(raw) {
        return raw;
    }
    raw.split('-').next().unwrap_or(raw)
}

/// Decide whether moving from `installed` to `desired` is a downgrade.
///
/// A development install dominates: replacing it with any released
/// version is a downgrade regardless of numeric comparison.
pub fn is_downgrade(name: &str, installed: &str, desired: &str) -> Result<bool> {
    if is_dev(installed) && !is_dev(desired) {
        return Ok(true);
    }
    let from = Version::parse(name, installed)?;
    let to = Version::parse(name, desired)?;
    Ok(to < from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release() {
        assert_eq!(
            Version::parse("cjson", "2.1.0-1").unwrap(),
            Version::Release(vec![2, 1, 0])
        );
        assert_eq!(
            Version::parse("cjson", "v1.4").unwrap(),
            Version::Release(vec![1, 4])
        );
    }

    #[test]
    fn test_parse_dev_markers() {
        assert_eq!(Version::parse("x", "dev").unwrap(), Version::Dev);
        assert_eq!(Version::parse("x", "scm-1").unwrap(), Version::Dev);
        assert_eq!(Version::parse("x", "SCM-1").unwrap(), Version::Dev);
    }

    #[test]
    fn test_parse_failure() {
        assert!(Version::parse("x", "").is_err());
        assert!(Version::parse("x", "latest").is_err());
    }

    #[test]
    fn test_ordering() {
        let v = |s: &str| Version::parse("x", s).unwrap();
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("0.9.0") < v("1.0.0"));
        assert!(v("1.0") == v("1.0.0"));
        assert!(v("scm-1") > v("99.99.99"));
    }

    #[test]
    fn test_strip_revision() {
        assert_eq!(strip_revision("2.1.0-1"), "2.1.0");
        assert_eq!(strip_revision("2.1.0"), "2.1.0");
        assert_eq!(strip_revision("scm-1"), "scm-1");
    }

    #[test]
    fn test_downgrade_classification() {
        // Plain numeric downgrade
        assert!(is_downgrade("x", "1.0.0", "0.9.0").unwrap());
        assert!(!is_downgrade("x", "0.9.0", "1.0.0").unwrap());
        // Development marker dominates
        assert!(is_downgrade("x", "scm-1", "1.0.0").unwrap());
        // Moving to dev is an upgrade
        assert!(!is_downgrade("x", "1.0.0", "dev").unwrap());
    }
}
