use std::path::PathBuf;

use crate::task::{Task, TaskRef};
use crate::{HashMap, HashSet};

pub(crate) type NodeId = usize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Dependency cycle through task \"{0}\"")]
    DependencyCycle(String),
}

/// One resolved task plus its dependency edges.
pub struct Node {
    pub(crate) task: TaskRef,
    /// dependency name -> node index, in declaration order
    pub(crate) deps: Vec<(String, NodeId)>,
}

/// Explicit dependency graph resolved from a terminal task.
///
/// Nodes are keyed by output path, so two task objects with identical
/// configuration share a single node. `nodes` is a DFS postorder, which is
/// also a topological order: every node appears after all of its
/// dependencies, and in particular a dependency's index is always lower than
/// its dependent's.
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) terminal: NodeId,
}

impl Graph {
    /// Resolve the transitive dependencies of `terminal`.
    ///
    /// A cycle is a configuration error, rejected here before anything runs.
    pub fn resolve(terminal: TaskRef) -> Result<Self, Error> {
        let mut builder = GraphBuilder::default();
        let terminal = builder.visit(terminal)?;
        log::debug!("resolved graph with {} tasks", builder.nodes.len());
        Ok(Self {
            nodes: builder.nodes,
            terminal,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Tasks in execution order.
    pub fn tasks(&self) -> impl Iterator<Item = &dyn Task> {
        self.nodes.iter().map(|n| &*n.task)
    }

    pub fn terminal_task(&self) -> &dyn Task {
        &*self.nodes[self.terminal].task
    }
}

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<Node>,
    resolved: HashMap<PathBuf, NodeId>,
    on_stack: HashSet<PathBuf>,
}

impl GraphBuilder {
    fn visit(&mut self, task: TaskRef) -> Result<NodeId, Error> {
        let key = task.output().path().to_path_buf();
        if let Some(&id) = self.resolved.get(&key) {
            return Ok(id);
        }
        if !self.on_stack.insert(key.clone()) {
            return Err(Error::DependencyCycle(task.name()));
        }

        let mut deps = Vec::with_capacity(2);
        for (name, dep) in task.requires().into_named() {
            deps.push((name, self.visit(dep)?));
        }

        self.on_stack.remove(&key);
        let id = self.nodes.len();
        log::trace!("node {id}: {}", task.name());
        self.nodes.push(Node { task, deps });
        self.resolved.insert(key, id);
        Ok(id)
    }
}
