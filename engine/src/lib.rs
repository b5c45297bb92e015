//!
//! Task graph execution engine: content-addressed artifact naming, idempotent
//! caching, atomic publication, and dependency-ordered scheduling.
//!
//! A run proceeds in 3 steps:
//! 1. [`Graph::resolve`] walks [`Task::requires`] transitively from the
//!    requested terminal task, deduping shared dependencies and rejecting
//!    cycles before anything executes.
//! 2. [`Scheduler::plan`] splits the graph into cache hits and pending work,
//!    using nothing but [`OutputTarget::exists`].
//! 3. [`Scheduler::run`] executes the pending tasks in dependency order;
//!    each task produces a private scratch file and publishes it atomically,
//!    then repoints its family's `current` alias.

/// content-addressed artifact naming
mod fingerprint;
pub use fingerprint::Fingerprint;

/// final artifact locations and the `current` alias
mod target;
pub use target::OutputTarget;

/// runs external transformation steps
mod shellout;
pub use shellout::shellout;

/// the unit of work
mod task;
pub use task::{Inputs, Requires, Task, TaskRef};

/// dependency graph resolution
mod graph;
pub use graph::Graph;

/// dependency-ordered execution
mod scheduler;
pub use scheduler::{Outcome, Plan, RunReport, Scheduler};

#[derive(thiserror::Error, Debug)]
#[error("Filesystem path is not valid UTF-8")]
pub struct PathEncodingError;

type Hasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;
type HashMap<K, V> = hashbrown::HashMap<K, V, Hasher>;
type HashSet<T> = hashbrown::HashSet<T, Hasher>;
