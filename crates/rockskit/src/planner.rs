//! Action planning: diff desired state against installed state.
//!
//! Planning is pure given its two state reads. It produces ordered
//! action lists; whether a provisional prune candidate actually gets
//! removed is decided later by the engine, after installs have run and
//! installed state has been re-read.

use crate::handler::{HandlerCallback, HandlerRegistry};
use crate::types::{DesiredSpec, Rock};
use crate::version;
use std::collections::{BTreeMap, BTreeSet};

/// Direction of a version change, used for messaging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Pinned version is newer than the installed one
    Upgrade,
    /// Pinned version is older, or replaces a development install
    Downgrade,
}

/// Install a rock that is desired but not installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallAction {
    /// Rock to install
    pub name: String,
    /// Pinned version; `None` installs the latest release
    pub version: Option<String>,
}

/// Move an installed rock to its pinned version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAction {
    /// Rock to move
    pub name: String,
    /// Currently installed version
    pub from: String,
    /// Pinned version to install
    pub to: String,
    /// Direction of the change, for messaging
    pub kind: UpdateKind,
}

/// A declared entry claimed by an external handler.
pub struct HandlerAction {
    /// Rock the handler claimed
    pub name: String,
    /// The handler's sync callback
    pub callback: HandlerCallback,
}

/// Planned actions for one reconciliation run.
#[derive(Default)]
pub struct Plan {
    /// Handler-claimed entries, run before anything else
    pub handler_actions: Vec<HandlerAction>,
    /// Rocks to install
    pub installs: Vec<InstallAction>,
    /// Rocks to move to their pinned version
    pub updates: Vec<UpdateAction>,
    /// Installed-but-not-desired rocks; pruning is gated on dependency
    /// exclusion computed after installs complete
    pub prune_candidates: Vec<String>,
    /// Entries skipped because their version could not be resolved
    pub errors: Vec<String>,
}

impl Plan {
    /// Total planned actions, counting provisional prunes.
    pub fn total_actions(&self) -> usize {
        self.handler_actions.len()
            + self.installs.len()
            + self.updates.len()
            + self.prune_candidates.len()
    }

    /// Whether the plan contains no actions at all.
    pub fn is_empty(&self) -> bool {
        self.total_actions() == 0
    }
}

/// Compute the plan converging `installed` toward `desired`.
///
/// Single pass over the union of desired and installed names. Names are
/// already lowercased by [`DesiredSpec`] and [`Rock`] construction; the
/// union is keyed on those canonical names.
pub fn plan(
    desired: &BTreeMap<String, DesiredSpec>,
    installed: &BTreeMap<String, Rock>,
    registry: &HandlerRegistry,
) -> Plan {
    let mut plan = Plan::default();

    let keys: BTreeSet<&String> = desired.keys().chain(installed.keys()).collect();

    for key in keys {
        let spec = desired.get(key);
        let rock = installed.get(key);

        // A handler claim pre-empts all other classification.
        if let Some(spec) = spec
            && let Some(callback) = registry.sync_callback(spec)
        {
            plan.handler_actions.push(HandlerAction {
                name: spec.name.clone(),
                callback,
            });
            continue;
        }

        match (spec, rock) {
            (Some(spec), None) => {
                // A pin that cannot be parsed is not installable.
                if let Some(pin) = &spec.version
                    && version::Version::parse(&spec.name, pin).is_err()
                {
                    plan.errors
                        .push(format!("cannot resolve version {pin:?} for {}", spec.name));
                    continue;
                }
                plan.installs.push(InstallAction {
                    name: spec.name.clone(),
                    version: spec.version.clone(),
                });
            }
            (Some(spec), Some(rock)) => {
                let Some(pin) = &spec.version else {
                    // Installed and desired at "latest": no action.
                    continue;
                };
                match classify_pin(&spec.name, &rock.version, pin) {
                    Ok(Some(kind)) => plan.updates.push(UpdateAction {
                        name: spec.name.clone(),
                        from: rock.version.clone(),
                        to: pin.clone(),
                        kind,
                    }),
                    Ok(None) => {}
                    Err(message) => plan.errors.push(message),
                }
            }
            (None, Some(rock)) => plan.prune_candidates.push(rock.name.clone()),
            (None, None) => unreachable!("key came from the union of both maps"),
        }
    }

    plan
}

/// Compare a pinned version against the installed one.
///
/// `Ok(None)` means the pin is already satisfied.
fn classify_pin(name: &str, installed: &str, pin: &str) -> Result<Option<UpdateKind>, String> {
    let current = version::Version::parse(name, installed)
        .map_err(|e| e.to_string())?;
    let wanted = version::Version::parse(name, pin).map_err(|e| e.to_string())?;

    if current == wanted {
        return Ok(None);
    }

    let kind = if version::is_downgrade(name, installed, pin).map_err(|e| e.to_string())? {
        UpdateKind::Downgrade
    } else {
        UpdateKind::Upgrade
    };
    Ok(Some(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{EventSink, Handler, HandlerCallback};

    fn desired(specs: &[DesiredSpec]) -> BTreeMap<String, DesiredSpec> {
        specs
            .iter()
            .map(|s| (s.name.clone(), s.clone()))
            .collect()
    }

    fn installed(rocks: &[Rock]) -> BTreeMap<String, Rock> {
        rocks.iter().map(|r| (r.name.clone(), r.clone())).collect()
    }

    #[test]
    fn test_noop_sync_is_empty() {
        let plan = plan(
            &desired(&[DesiredSpec::pinned("cjson", "2.1.0")]),
            &installed(&[Rock::new("cjson", "2.1.0-1")]),
            &HandlerRegistry::new(),
        );
        assert!(plan.is_empty());
        assert!(plan.errors.is_empty());
    }

    #[test]
    fn test_missing_rock_is_installed() {
        let plan = plan(
            &desired(&[DesiredSpec::latest("plenary")]),
            &installed(&[]),
            &HandlerRegistry::new(),
        );
        assert_eq!(
            plan.installs,
            vec![InstallAction {
                name: "plenary".to_string(),
                version: None,
            }]
        );
        assert!(plan.prune_candidates.is_empty());
    }

    #[test]
    fn test_undesired_rock_is_prune_candidate() {
        let plan = plan(
            &desired(&[]),
            &installed(&[Rock::new("orphan", "1.0.0-1")]),
            &HandlerRegistry::new(),
        );
        assert_eq!(plan.prune_candidates, vec!["orphan".to_string()]);
        assert!(plan.installs.is_empty());
    }

    #[test]
    fn test_pin_mismatch_is_upgrade() {
        let plan = plan(
            &desired(&[DesiredSpec::pinned("cjson", "2.2.0")]),
            &installed(&[Rock::new("cjson", "2.1.0-1")]),
            &HandlerRegistry::new(),
        );
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].kind, UpdateKind::Upgrade);
        assert_eq!(plan.updates[0].to, "2.2.0");
    }

    #[test]
    fn test_pin_below_installed_is_downgrade() {
        let plan = plan(
            &desired(&[DesiredSpec::pinned("cjson", "0.9.0")]),
            &installed(&[Rock::new("cjson", "1.0.0-1")]),
            &HandlerRegistry::new(),
        );
        assert_eq!(plan.updates[0].kind, UpdateKind::Downgrade);
    }

    #[test]
    fn test_dev_install_is_downgraded_to_release() {
        // Development marker dominates numeric comparison.
        let plan = plan(
            &desired(&[DesiredSpec::pinned("tele", "1.0.0")]),
            &installed(&[Rock::new("tele", "scm-1")]),
            &HandlerRegistry::new(),
        );
        assert_eq!(plan.updates[0].kind, UpdateKind::Downgrade);
    }

    #[test]
    fn test_unparseable_pin_is_reported_not_dropped() {
        let plan = plan(
            &desired(&[DesiredSpec::pinned("weird", "latest-and-greatest")]),
            &installed(&[]),
            &HandlerRegistry::new(),
        );
        assert!(plan.installs.is_empty());
        assert_eq!(plan.errors.len(), 1);
        assert!(plan.errors[0].contains("weird"));
    }

    #[test]
    fn test_revision_only_difference_is_satisfied() {
        let plan = plan(
            &desired(&[DesiredSpec::pinned("lfs", "1.8.0")]),
            &installed(&[Rock::new("lfs", "1.8.0-2")]),
            &HandlerRegistry::new(),
        );
        assert!(plan.is_empty());
    }

    struct ClaimAll;

    impl Handler for ClaimAll {
        fn sync_callback(&self, _spec: &DesiredSpec) -> Option<HandlerCallback> {
            Some(Box::new(|_sink: &mut dyn EventSink| {}))
        }
        fn prune_callback(
            &self,
            _desired: &BTreeMap<String, DesiredSpec>,
        ) -> Option<HandlerCallback> {
            None
        }
    }

    #[test]
    fn test_handler_claim_preempts_install() {
        let mut registry = HandlerRegistry::new();
        registry.register(Box::new(ClaimAll));

        let plan = plan(
            &desired(&[DesiredSpec::latest("claimed")]),
            &installed(&[]),
            &registry,
        );
        assert!(plan.installs.is_empty());
        assert_eq!(plan.handler_actions.len(), 1);
        assert_eq!(plan.handler_actions[0].name, "claimed");
    }

    #[test]
    fn test_handler_claim_preempts_update_and_prune_classification() {
        let mut registry = HandlerRegistry::new();
        registry.register(Box::new(ClaimAll));

        // Desired and installed at different pins: would be an update,
        // but the handler claim wins.
        let plan = plan(
            &desired(&[DesiredSpec::pinned("claimed", "2.0.0")]),
            &installed(&[Rock::new("claimed", "1.0.0-1")]),
            &registry,
        );
        assert!(plan.updates.is_empty());
        assert_eq!(plan.handler_actions.len(), 1);
    }
}
