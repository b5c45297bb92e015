use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::{HashMap, OutputTarget};

pub type TaskRef = Arc<dyn Task>;

/// Name bound to the input of a single-dependency task.
pub(crate) const SOLE_INPUT: &str = "input";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Task has no input named \"{0}\"")]
    NoSuchInput(String),
    #[error("Task expected exactly one input, found {0}")]
    NotSoleInput(usize),
}

/// Upstream dependencies declared by a task: none, one, or a named mapping.
pub enum Requires {
    None,
    One(TaskRef),
    Named(Vec<(String, TaskRef)>),
}

impl Requires {
    /// Uniform view for the resolver; a sole dependency is named
    /// [`SOLE_INPUT`].
    pub(crate) fn into_named(self) -> Vec<(String, TaskRef)> {
        match self {
            Self::None => Vec::with_capacity(0),
            Self::One(task) => vec![(SOLE_INPUT.to_owned(), task)],
            Self::Named(deps) => deps,
        }
    }
}

/// Materialized upstream artifact paths, keyed by dependency name.
///
/// Built by the scheduler from dependencies that have already reached `DONE`;
/// a task never re-resolves its upstreams.
#[derive(Debug, Default)]
pub struct Inputs {
    paths: HashMap<String, PathBuf>,
}

impl Inputs {
    pub(crate) fn insert(&mut self, name: String, path: PathBuf) {
        self.paths.insert(name, path);
    }

    /// Artifact path of the named dependency.
    pub fn named(&self, name: &str) -> Result<&Path, Error> {
        self.paths
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::NoSuchInput(name.to_owned()))
    }

    /// Artifact path of the single dependency.
    pub fn sole(&self) -> Result<&Path, Error> {
        let mut paths = self.paths.values();
        match (paths.next(), paths.next()) {
            (Some(path), None) => Ok(path.as_path()),
            _ => Err(Error::NotSoleInput(self.paths.len())),
        }
    }
}

/// The unit of work: declares upstream dependencies, a deterministic output
/// location, and a run procedure that turns materialized inputs into that
/// output.
///
/// Tasks are stateless between runs; the only thing a run leaves behind is
/// the artifact on storage. `output()` must be computable without running,
/// so the scheduler can test for a cache hit before doing any work.
pub trait Task: Send + Sync {
    /// Artifact directory name, shared by every parameterization of this
    /// task. Scopes the fingerprint namespace and the `current` alias.
    fn family(&self) -> &'static str;

    /// Display identity, including parameter values.
    fn name(&self) -> String {
        self.family().to_owned()
    }

    /// Upstream dependencies, materialized before `run` is called.
    fn requires(&self) -> Requires {
        Requires::None
    }

    /// Final artifact location; a pure function of this task's configuration.
    fn output(&self) -> OutputTarget;

    /// Produce the artifact from the given inputs and publish it via
    /// [`OutputTarget::publish`]. Must not leave a partial artifact at the
    /// output path on failure.
    fn run(&self, inputs: &Inputs) -> Result<()>;

    /// Hook invoked after a successful (non-cached) run.
    fn on_success(&self) -> Result<()> {
        self.output().point_current()
    }
}
