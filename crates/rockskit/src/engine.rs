//! The sync engine: plans and executes reconciliation runs.
//!
//! One run walks `Planning → RunningHandlers → Installing →
//! UpdatingVersions → ReReadingState → Pruning → Finalizing` and always
//! ends in a terminal state. Individual action failures are caught,
//! accumulated, and reported; they never abort the run. Installs and
//! removals are strictly sequential because two concurrent
//! package-manager invocations would corrupt the shared on-disk tree.
//!
//! A run is not guaranteed to fully converge: a rock that is still a
//! dependency of another installed rock is excluded from pruning and
//! becomes prunable on a later run, once its dependent is gone. That
//! multi-pass behavior is intentional; correct transitive pruning
//! depends on re-querying the package manager's own dependency
//! bookkeeping after each mutation.

use crate::backend::Backend;
use crate::error::Result;
use crate::handler::{EventSink, HandlerRegistry};
use crate::planner::{self, Plan, UpdateKind};
use crate::reporter::{Progress, Reporter};
use crate::state::PruneCache;
use crate::types::{DesiredSpec, Rock};
use std::collections::{BTreeMap, BTreeSet};

/// Phases and terminal states of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Reading installed state and computing action lists
    Planning,
    /// Invoking handler-claimed sync callbacks
    RunningHandlers,
    /// Installing missing rocks
    Installing,
    /// Moving installed rocks to their pinned versions
    UpdatingVersions,
    /// Re-reading installed state for dependency exclusion
    ReReadingState,
    /// Removing eligible prune candidates
    Pruning,
    /// Refreshing derived state and classifying the outcome
    Finalizing,
    /// Terminal: every action succeeded
    Succeeded,
    /// Terminal: the run completed but some actions failed
    SucceededWithErrors,
}

/// Result of one reconciliation run.
#[derive(Debug)]
pub struct SyncOutcome {
    /// Terminal state, [`RunState::Succeeded`] or
    /// [`RunState::SucceededWithErrors`]
    pub state: RunState,
    /// Errors accumulated over the run, in order of occurrence
    pub errors: Vec<String>,
    /// Rocks installed this run
    pub installed: usize,
    /// Rocks moved to a different version this run
    pub updated: usize,
    /// Rocks pruned this run
    pub pruned: usize,
}

impl SyncOutcome {
    /// Whether the run finished without any accumulated error.
    pub fn is_clean(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// Whether the run changed anything at all.
    pub fn changed(&self) -> bool {
        self.installed + self.updated + self.pruned > 0
    }
}

/// Runtime-activation collaborator.
///
/// Invoked post-install for eagerly-loaded rocks only; lazy (`opt`)
/// rocks are left un-activated.
pub trait Activator {
    /// Activate an installed rock's runtime files.
    fn activate(&self, name: &str) -> Result<()>;
}

#[derive(Default)]
struct Counts {
    installed: usize,
    updated: usize,
    pruned: usize,
}

/// Executes reconciliation runs and single-package operations.
///
/// Collaborators are passed in explicitly: the backend is the sole
/// source of installed-state truth, the registry is consulted for
/// handler claims, and the prune cache is invalidated before any
/// mutation and refreshed after every run.
pub struct SyncEngine<'a> {
    backend: &'a dyn Backend,
    registry: &'a HandlerRegistry,
    cache: &'a mut PruneCache,
    activator: Option<&'a dyn Activator>,
    eager_activation: bool,
}

impl<'a> SyncEngine<'a> {
    /// Create an engine over the given collaborators.
    pub fn new(
        backend: &'a dyn Backend,
        registry: &'a HandlerRegistry,
        cache: &'a mut PruneCache,
    ) -> Self {
        Self {
            backend,
            registry,
            cache,
            activator: None,
            eager_activation: true,
        }
    }

    /// Attach the runtime-activation collaborator.
    pub fn with_activator(mut self, activator: &'a dyn Activator) -> Self {
        self.activator = Some(activator);
        self
    }

    /// Configure whether non-lazy rocks are activated after install.
    pub fn activate_eagerly(mut self, eager: bool) -> Self {
        self.eager_activation = eager;
        self
    }

    /// Run one full reconciliation pass.
    ///
    /// Always reaches a terminal state; per-action failures accumulate
    /// into the outcome instead of aborting the run.
    pub fn sync(
        &mut self,
        desired: &BTreeMap<String, DesiredSpec>,
        reporter: &mut dyn Reporter,
    ) -> SyncOutcome {
        let mut errors = Vec::new();
        let mut counts = Counts::default();

        if let Err(e) = self.sync_inner(desired, reporter, &mut errors, &mut counts) {
            errors.push(e.to_string());
        }

        // Finalizing: the prune cache is refreshed on every run, even
        // one that accumulated errors.
        self.refresh_prune_cache();

        let state = if errors.is_empty() {
            reporter.finish();
            RunState::Succeeded
        } else {
            reporter.cancel();
            for error in &errors {
                reporter.error("Sync error", error);
            }
            RunState::SucceededWithErrors
        };

        SyncOutcome {
            state,
            errors,
            installed: counts.installed,
            updated: counts.updated,
            pruned: counts.pruned,
        }
    }

    fn sync_inner(
        &mut self,
        desired: &BTreeMap<String, DesiredSpec>,
        reporter: &mut dyn Reporter,
        errors: &mut Vec<String>,
        counts: &mut Counts,
    ) -> Result<()> {
        reporter.report(Progress::titled("Syncing rocks", "Computing sync actions"));

        let installed = self.backend.installed()?;
        let Plan {
            handler_actions,
            installs,
            updates,
            prune_candidates,
            errors: plan_errors,
        } = planner::plan(desired, &installed, self.registry);
        errors.extend(plan_errors);

        let mut total = handler_actions.len()
            + installs.len()
            + updates.len()
            + prune_candidates.len();
        let mut ct = 0usize;

        // External handler actions run first, sequentially.
        for action in handler_actions {
            let mut sink = AccumulatingSink {
                reporter: &mut *reporter,
                errors: &mut *errors,
            };
            (action.callback)(&mut sink);
            ct += 1;
            reporter.report(Progress::percent(
                &format!("Synced {}", action.name),
                percentage(ct, total),
            ));
        }

        // Installs run sequentially; one failure must not abort the rest.
        for action in installs {
            let opt = desired.get(&action.name).is_some_and(|s| s.opt);
            let message = match self.install_rock(&action.name, action.version.as_deref(), opt) {
                Ok(rock) => {
                    counts.installed += 1;
                    format!("Installed {} {}", rock.name, rock.version)
                }
                Err(e) => {
                    errors.push(e.to_string());
                    format!("Failed to install {}", action.name)
                }
            };
            ct += 1;
            reporter.report(Progress::percent(&message, percentage(ct, total)));
        }

        // Version changes use the same install primitive: an install
        // with an explicit version overwrites the existing rock.
        for action in updates {
            let opt = desired.get(&action.name).is_some_and(|s| s.opt);
            let verb = match action.kind {
                UpdateKind::Upgrade => "Upgraded",
                UpdateKind::Downgrade => "Downgraded",
            };
            let message = match self.install_rock(&action.name, Some(&action.to), opt) {
                Ok(rock) => {
                    counts.updated += 1;
                    format!("{verb} {} to {}", rock.name, rock.version)
                }
                Err(e) => {
                    errors.push(e.to_string());
                    format!("Failed to update {}", action.name)
                }
            };
            ct += 1;
            reporter.report(Progress::percent(&message, percentage(ct, total)));
        }

        // Installed state is stale now; re-read it and union every
        // surviving rock's dependencies into one referenced set.
        reporter.report(Progress::message("Checking dependencies"));
        let installed_now = self.backend.installed()?;
        let mut referenced = BTreeSet::new();
        for name in installed_now.keys() {
            match self.backend.dependencies(name) {
                Ok(deps) => referenced.extend(deps.into_keys()),
                Err(e) => errors.push(e.to_string()),
            }
        }

        // A candidate still referenced by an installed rock is excluded
        // this pass; it becomes prunable once its dependent is pruned.
        let eligible: Vec<String> = prune_candidates
            .iter()
            .filter(|name| !referenced.contains(*name))
            .cloned()
            .collect();

        // Re-derive the total before any further increment so the
        // percentage never exceeds 100 or moves backward.
        total -= prune_candidates.len() - eligible.len();
        ct = ct.min(total);

        if total == 0 {
            reporter.report(Progress::message("Nothing to sync"));
            return Ok(());
        }

        // Handlers prune what they own before the engine prunes.
        for callback in self.registry.prune_callbacks(desired) {
            let mut sink = AccumulatingSink {
                reporter: &mut *reporter,
                errors: &mut *errors,
            };
            callback(&mut sink);
        }

        // Eligible prunes run sequentially, each removing its own
        // now-orphaned dependencies; rocks in the desired set are kept.
        let keep: BTreeSet<String> = desired.keys().cloned().collect();
        for name in eligible {
            let mut failures = Vec::new();
            let ok = self.remove_tree(&name, &keep, &mut failures);
            // Non-fatal failures (e.g. a dependency query that errored
            // while the removal itself went through) still accumulate.
            errors.extend(failures.iter().map(|(_, e)| e.clone()));
            let message = if ok {
                counts.pruned += 1;
                format!("Removed {name}")
            } else {
                errors.push(
                    crate::error::Error::PartialRemoval {
                        name: name.clone(),
                        failed: failures.into_iter().map(|(n, _)| n).collect(),
                    }
                    .to_string(),
                );
                format!("Failed to remove {name}")
            };
            ct += 1;
            reporter.report(Progress::percent(&message, percentage(ct, total)));
        }

        Ok(())
    }

    /// Install one rock, standalone or as part of a run.
    ///
    /// Invalidates the prune cache first, then activates the rock
    /// unless it is lazy or eager activation is off.
    pub fn install(&mut self, spec: &DesiredSpec) -> Result<Rock> {
        self.install_rock(&spec.name, spec.version.as_deref(), spec.opt)
    }

    /// Remove one rock, without touching its dependencies.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.cache.invalidate();
        self.backend.remove(&name.to_lowercase())
    }

    /// Remove a rock and, recursively, each of its dependencies that is
    /// currently prunable and not in `keep`.
    ///
    /// Returns the logical AND of the root removal and every attempted
    /// descendant removal. Descendants removed before a failure are not
    /// rolled back; partial removal is accepted.
    pub fn remove_recursive(&mut self, name: &str, keep: &BTreeSet<String>) -> bool {
        let mut failures = Vec::new();
        let ok = self.remove_tree(&name.to_lowercase(), keep, &mut failures);
        for (_, error) in &failures {
            log::warn!("{error}");
        }
        ok
    }

    /// Remove `name` and recurse into its now-removable dependencies.
    ///
    /// Failures are recorded as `(rock, message)` pairs so the caller
    /// can name exactly which rocks were left behind.
    fn remove_tree(
        &mut self,
        name: &str,
        keep: &BTreeSet<String>,
        failures: &mut Vec<(String, String)>,
    ) -> bool {
        let installed = match self.backend.installed() {
            Ok(installed) => installed,
            Err(e) => {
                failures.push((name.to_string(), e.to_string()));
                return false;
            }
        };
        // Already gone, possibly removed by a handler or an earlier
        // branch of the recursion.
        if !installed.contains_key(name) {
            return true;
        }

        // Capture the dependency list before the rock disappears.
        let deps = match self.backend.dependencies(name) {
            Ok(deps) => deps,
            Err(e) => {
                failures.push((name.to_string(), e.to_string()));
                BTreeMap::new()
            }
        };

        self.cache.invalidate();
        if let Err(e) = self.backend.remove(name) {
            failures.push((name.to_string(), e.to_string()));
            return false;
        }

        // Fresh removability query: only descend into dependencies no
        // longer referenced by anything still installed.
        let removable = match removable_rocks(self.backend) {
            Ok(removable) => removable,
            Err(e) => {
                failures.push((name.to_string(), e.to_string()));
                return false;
            }
        };

        let mut ok = true;
        for dep in deps.keys() {
            if keep.contains(dep) || !removable.contains(dep) {
                continue;
            }
            ok &= self.remove_tree(dep, keep, failures);
        }
        ok
    }

    fn install_rock(&mut self, name: &str, version: Option<&str>, opt: bool) -> Result<Rock> {
        self.cache.invalidate();
        let rock = self.backend.install(name, version)?;

        if self.eager_activation
            && !opt
            && let Some(activator) = self.activator
        {
            activator.activate(&rock.name)?;
        }

        Ok(rock)
    }

    fn refresh_prune_cache(&mut self) {
        match removable_rocks(self.backend) {
            Ok(removable) => self.cache.refresh(removable),
            Err(e) => {
                log::warn!("could not refresh prune cache: {e}");
                self.cache.invalidate();
            }
        }
    }
}

/// Installed rocks that nothing else installed depends on.
pub fn removable_rocks(backend: &dyn Backend) -> Result<BTreeSet<String>> {
    let installed = backend.installed()?;
    let mut referenced = BTreeSet::new();
    for name in installed.keys() {
        referenced.extend(backend.dependencies(name)?.into_keys());
    }
    Ok(installed
        .keys()
        .filter(|name| !referenced.contains(*name))
        .cloned()
        .collect())
}

/// Progress percentage after `ct` of `total` completed actions.
pub(crate) fn percentage(ct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((100 * ct / total).min(100)) as u8
}

struct AccumulatingSink<'r, 'e> {
    reporter: &'r mut dyn Reporter,
    errors: &'e mut Vec<String>,
}

impl EventSink for AccumulatingSink<'_, '_> {
    fn progress(&mut self, message: &str) {
        self.reporter.report(Progress::message(message));
    }

    fn error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
