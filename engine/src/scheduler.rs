use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};

use crate::graph::{Graph, Node, NodeId};
use crate::task::Inputs;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Task \"{0}\" completed without publishing its artifact: {1}")]
    NothingPublished(String, String),
}

/// Per-invocation task state.
///
/// `PENDING -> DONE` on a cache hit, `PENDING -> RUNNING -> DONE | FAILED`
/// otherwise; dependents of a failed or blocked task become `BLOCKED`.
/// There is no transition out of `FAILED`; a later run starts over from
/// `PENDING`.
#[derive(Debug)]
enum State {
    Pending,
    Running,
    Done { cached: bool },
    Failed(anyhow::Error),
    Blocked,
}

impl State {
    fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    fn is_failed_or_blocked(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Blocked)
    }
}

/// Outcome of one task, as reported to the caller.
#[derive(Debug)]
pub enum Outcome {
    /// Output already existed; no step was executed.
    Cached,
    /// Step executed and artifact published.
    Ran,
    /// Step failed; the error is the root cause for every blocked dependent.
    Failed(anyhow::Error),
    /// Not attempted because a transitive dependency failed.
    Blocked,
}

/// What a run would do, computed without executing anything.
pub struct Plan {
    pub cached: Vec<String>,
    pub to_run: Vec<String>,
}

impl Plan {
    pub fn has_tasks_to_run(&self) -> bool {
        !self.to_run.is_empty()
    }
}

/// Per-task outcomes in dependency order, plus the terminal artifact path.
pub struct RunReport {
    pub outcomes: Vec<(String, Outcome)>,
    terminal_path: PathBuf,
    terminal_ok: bool,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.terminal_ok
    }

    /// Path of the requested terminal artifact, if the run succeeded.
    pub fn terminal_path(&self) -> Option<&std::path::Path> {
        self.terminal_ok.then_some(self.terminal_path.as_path())
    }

    /// Identity and error of the first task that directly failed.
    pub fn first_failure(&self) -> Option<(&str, &anyhow::Error)> {
        self.outcomes.iter().find_map(|(name, outcome)| match outcome {
            Outcome::Failed(e) => Some((name.as_str(), e)),
            _ => None,
        })
    }
}

/// Executes a resolved [`Graph`] with a bounded worker pool.
///
/// The graph's partial order is the only ordering authority: a task starts
/// only once every declared dependency is `DONE`, and tasks with no
/// dependency relationship may run concurrently, each worker blocking on its
/// external process. Distinct configurations have distinct fingerprints, so
/// concurrent tasks never write to the same output path.
pub struct Scheduler {
    jobs: usize,
}

impl Scheduler {
    pub fn new(jobs: usize) -> Self {
        Self { jobs: jobs.max(1) }
    }

    /// Split the graph into cache hits and pending work, without running.
    pub fn plan(&self, graph: &Graph) -> Plan {
        let mut cached = Vec::with_capacity(graph.len());
        let mut to_run = Vec::new();
        for node in &graph.nodes {
            if node.task.output().exists() {
                cached.push(node.task.name());
            } else {
                to_run.push(node.task.name());
            }
        }
        Plan { cached, to_run }
    }

    /// Execute every task whose output is missing, in dependency order.
    ///
    /// Failures are not retried; tasks downstream of a failure are reported
    /// as blocked, never attempted. Scratch files of failed steps are
    /// discarded by their owners, so nothing partial is ever published.
    pub fn run(&self, graph: &Graph) -> RunReport {
        let mut states: Vec<State> = Vec::with_capacity(graph.len());

        // cache hits first, so they never reach a worker:
        for node in &graph.nodes {
            if node.task.output().exists() {
                log::info!("cache hit: {}", node.task.name());
                states.push(State::Done { cached: true });
            } else {
                states.push(State::Pending);
            }
        }

        loop {
            self.propagate_blocked(graph, &mut states);

            let ready = self.ready_tasks(graph, &states);
            if ready.is_empty() {
                break;
            }
            // bounded worker pool, one wave of independent tasks at a time:
            for wave in ready.chunks(self.jobs) {
                self.run_wave(graph, wave, &mut states);
            }
        }

        debug_assert!(states.iter().all(|s| !matches!(s, State::Pending)));
        self.report(graph, states)
    }

    /// A pending task with a failed or blocked dependency is blocked.
    /// Nodes are in topological order, so one forward pass propagates
    /// transitively.
    fn propagate_blocked(&self, graph: &Graph, states: &mut [State]) {
        for id in 0..states.len() {
            if !matches!(states[id], State::Pending) {
                continue;
            }
            let node = &graph.nodes[id];
            if node.deps.iter().any(|(_, dep)| states[*dep].is_failed_or_blocked()) {
                log::warn!("blocked: {}", node.task.name());
                states[id] = State::Blocked;
            }
        }
    }

    fn ready_tasks(&self, graph: &Graph, states: &[State]) -> Vec<NodeId> {
        (0..states.len())
            .filter(|&id| {
                matches!(states[id], State::Pending)
                    && graph.nodes[id].deps.iter().all(|(_, dep)| states[*dep].is_done())
            })
            .collect()
    }

    fn run_wave(&self, graph: &Graph, wave: &[NodeId], states: &mut Vec<State>) {
        for &id in wave {
            states[id] = State::Running;
        }

        let results: Vec<(NodeId, Result<()>)> = thread::scope(|scope| {
            let handles: Vec<_> = wave
                .iter()
                .map(|&id| {
                    let node = &graph.nodes[id];
                    let inputs = materialize_inputs(graph, node);
                    scope.spawn(move || (id, run_task(node, &inputs)))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("task worker panicked"))
                .collect()
        });

        for (id, result) in results {
            let node = &graph.nodes[id];
            match result {
                Ok(()) => {
                    log::info!("done: {}", node.task.name());
                    states[id] = State::Done { cached: false };
                }
                Err(e) => {
                    log::error!("failed: {}: {e:#}", node.task.name());
                    states[id] = State::Failed(e);
                }
            }
        }
    }

    fn report(&self, graph: &Graph, states: Vec<State>) -> RunReport {
        let terminal_ok = states[graph.terminal].is_done();
        let terminal_path = graph.nodes[graph.terminal]
            .task
            .output()
            .path()
            .to_path_buf();

        let outcomes = states
            .into_iter()
            .zip(&graph.nodes)
            .map(|(state, node)| {
                let outcome = match state {
                    State::Done { cached: true } => Outcome::Cached,
                    State::Done { cached: false } => Outcome::Ran,
                    State::Failed(e) => Outcome::Failed(e),
                    State::Blocked => Outcome::Blocked,
                    State::Pending | State::Running => {
                        unreachable!("run loop left a task unsettled")
                    }
                };
                (node.task.name(), outcome)
            })
            .collect();

        RunReport {
            outcomes,
            terminal_path,
            terminal_ok,
        }
    }
}

/// Collect the already-materialized output paths of a node's dependencies.
fn materialize_inputs(graph: &Graph, node: &Node) -> Inputs {
    let mut inputs = Inputs::default();
    for (name, dep) in &node.deps {
        let path = graph.nodes[*dep].task.output().path().to_path_buf();
        inputs.insert(name.clone(), path);
    }
    inputs
}

fn run_task(node: &Node, inputs: &Inputs) -> Result<()> {
    let name = node.task.name();
    log::info!("running: {name}");

    node.task
        .run(inputs)
        .with_context(|| format!("while running task \"{name}\""))?;

    // tasks publish their own artifacts; a task that returns Ok without
    // publishing is a bug we refuse to paper over:
    let output = node.task.output();
    if !output.exists() {
        return Err(Error::NothingPublished(name, output.path().display().to_string()).into());
    }

    node.task
        .on_success()
        .with_context(|| format!("in on_success hook of task \"{name}\""))
}
