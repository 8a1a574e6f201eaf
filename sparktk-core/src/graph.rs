//! Task graph.  Schedulers consume a `Graph`; users build one through `Deferred`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::task::{Payload, Stage};

static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(0);

/// Interface for providing inputs into the graph, such as a lifted value
pub trait Source: Send + Sync {
    /// Produces the value of the source
    fn read(&self) -> Payload;
}

/// Unique value naming a node in a Graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    label: String,
    id: usize,
}

impl Handle {
    fn new(label: String) -> Self {
        Handle {
            label,
            id: NEXT_HANDLE.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Human readable label of the node
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.label, self.id)
    }
}

/// Either a stage, which consumes upstream values, or a source of data
pub(crate) enum Node {
    /// Node which consumes upstream data to produce new data
    Stage(Box<dyn Stage>),

    /// Node which generates data
    Source(Box<dyn Source>),
}

/// Upstream values a stage is evaluated with
#[derive(Debug, Clone)]
pub enum Inputs {
    /// Single argument
    Single(Arc<Handle>),

    /// Used for joining two separate stage outputs
    Pair(Arc<Handle>, Arc<Handle>),
}

impl Inputs {
    /// Handles this stage depends on
    pub fn handles(&self) -> Vec<Arc<Handle>> {
        match self {
            Inputs::Single(h) => vec![h.clone()],
            Inputs::Pair(l, r) => vec![l.clone(), r.clone()],
        }
    }
}

/// Graphs contain the computational pieces needed to represent the data flow
/// between stages, their combination, and eventual output.
#[derive(Clone, Default)]
pub struct Graph {
    pub(crate) nodes: HashMap<Arc<Handle>, Arc<Node>>,
    pub(crate) inputs: HashMap<Arc<Handle>, Option<Inputs>>,
}

impl Graph {
    /// Creates an empty Graph
    pub fn new() -> Self {
        Graph::default()
    }

    /// Number of nodes in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn add_source<S: Source + 'static>(&mut self, source: S, name: &str) -> Arc<Handle> {
        let handle = Arc::new(Handle::new(format!("Source<{}>", name)));
        self.inputs.insert(handle.clone(), None);
        self.nodes
            .insert(handle.clone(), Arc::new(Node::Source(Box::new(source))));
        handle
    }

    /// No effort is made to ensure the input handles exist within the graph.
    pub(crate) fn add_stage<S: Stage + 'static>(
        &mut self,
        inputs: Inputs,
        stage: S,
        name: &str,
    ) -> Arc<Handle> {
        let handle = Arc::new(Handle::new(format!("Stage<{}>", name)));
        self.inputs.insert(handle.clone(), Some(inputs));
        self.nodes
            .insert(handle.clone(), Arc::new(Node::Stage(Box::new(stage))));
        handle
    }

    /// Given two graphs, returns one holding the nodes of both.
    pub(crate) fn merge(&self, other: &Graph) -> Graph {
        let mut merged = self.clone();
        for (handle, inputs) in other.inputs.iter() {
            merged
                .inputs
                .entry(handle.clone())
                .or_insert_with(|| inputs.clone());
        }
        for (handle, node) in other.nodes.iter() {
            merged
                .nodes
                .entry(handle.clone())
                .or_insert_with(|| node.clone());
        }
        merged
    }
}

#[cfg(test)]
mod test_graph {
    use super::*;
    use crate::task::Unary;
    use std::convert::Infallible;

    struct Zero;

    impl Source for Zero {
        fn read(&self) -> Payload {
            Box::new(0usize)
        }
    }

    #[test]
    fn test_merge_keeps_shared_nodes_once() {
        let mut base = Graph::new();
        let root = base.add_source(Zero, "zero");

        let mut left = base.clone();
        left.add_stage(Inputs::Single(root.clone()),
                       Unary::new(|x: &usize| Ok::<_, Infallible>(x + 1)), "left");
        let mut right = base.clone();
        right.add_stage(Inputs::Single(root.clone()),
                        Unary::new(|x: &usize| Ok::<_, Infallible>(x + 2)), "right");

        let merged = left.merge(&right);
        assert_eq!(merged.len(), 3);
        assert!(merged.inputs[&root].is_none());
    }

    #[test]
    fn test_handles_are_unique() {
        let mut g = Graph::new();
        let a = g.add_source(Zero, "same");
        let b = g.add_source(Zero, "same");
        assert_ne!(a, b);
        assert_eq!(a.label(), b.label());
    }
}
