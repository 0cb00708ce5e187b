//! # rockskit
//!
//! Pure Rust library for declarative LuaRocks package management.
//!
//! This crate provides functionality for:
//! - Diffing a declared rock set against the installed tree
//! - Converging the two through install/upgrade/downgrade/prune actions
//! - Recursive removal that follows the package manager's own
//!   dependency bookkeeping
//! - Asynchronous invocation of the `luarocks` binary
//!
//! ## Example
//!
//! ```no_run
//! use rockskit::{
//!     DesiredSpec, HandlerRegistry, LuaRocksBackend, NullReporter, PruneCache, SyncEngine,
//! };
//! use std::collections::BTreeMap;
//!
//! let backend = LuaRocksBackend::new();
//! let registry = HandlerRegistry::new();
//! let mut cache = PruneCache::new();
//!
//! let mut desired = BTreeMap::new();
//! let spec = DesiredSpec::pinned("lua-cjson", "2.1.0");
//! desired.insert(spec.name.clone(), spec);
//!
//! let mut engine = SyncEngine::new(&backend, &registry, &mut cache);
//! let outcome = engine.sync(&desired, &mut NullReporter);
//! if !outcome.is_clean() {
//!     for error in &outcome.errors {
//!         eprintln!("{error}");
//!     }
//! }
//! ```
//!
//! ## Convergence
//!
//! A single run is not guaranteed to reach a fully clean state: a rock
//! that is still a dependency of another installed rock is skipped by
//! the prune phase and picked up on a later run. See
//! [`SyncEngine::sync`] for the exact rules.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod engine;
pub mod error;
pub mod handler;
pub mod invoker;
pub mod planner;
pub mod reporter;
pub mod state;
pub mod types;
pub mod version;

pub use backend::Backend;
pub use backend::luarocks::LuaRocksBackend;
pub use backend::mock::MockBackend;
pub use engine::{Activator, RunState, SyncEngine, SyncOutcome, removable_rocks};
pub use error::{Error, Result};
pub use handler::{EventSink, Handler, HandlerCallback, HandlerRegistry};
pub use invoker::{Invocation, Invoker, ProcessOutput};
pub use planner::{InstallAction, Plan, UpdateAction, UpdateKind, plan};
pub use reporter::{NullReporter, Progress, Reporter};
pub use state::PruneCache;
pub use types::{DesiredSpec, OutdatedRock, Rock};
