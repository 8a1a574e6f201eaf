use std::any::Any;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::EngineError;
use crate::graph::{Graph, Handle, Inputs, Source};
use crate::scheduler::Scheduler;
use crate::task::{Binary, Payload, Unary};

struct Lift<A>(A);

impl<A: Any + Send + Sync + Clone> Source for Lift<A> {
    fn read(&self) -> Payload {
        Box::new(self.0.clone())
    }
}

/// Lazily evaluated value of type `A`, backed by a task graph.
pub struct Deferred<A> {
    graph: Graph,
    items: PhantomData<A>,
    handle: Arc<Handle>,
}

impl<A> Clone for Deferred<A> {
    fn clone(&self) -> Self {
        Deferred {
            graph: self.graph.clone(),
            items: PhantomData,
            handle: self.handle.clone(),
        }
    }
}

impl<A: Any + Send + Sync> Deferred<A> {
    /// Applies `f` to the value once it is computed.
    pub fn apply<B, F>(&self, f: F) -> Deferred<B>
    where
        B: Any + Send + Sync,
        F: Send + Sync + 'static + Fn(&A) -> B,
    {
        self.stage("Apply", move |a: &A| Ok::<B, Infallible>(f(a)))
    }

    /// Like `apply`, but an `Err` returned by `f` aborts the whole run.
    pub fn try_apply<B, E, F>(&self, f: F) -> Deferred<B>
    where
        B: Any + Send + Sync,
        E: StdError + Send + Sync + 'static,
        F: Send + Sync + 'static + Fn(&A) -> Result<B, E>,
    {
        self.stage("TryApply", f)
    }

    fn stage<B, E, F>(&self, name: &str, f: F) -> Deferred<B>
    where
        B: Any + Send + Sync,
        E: StdError + Send + Sync + 'static,
        F: Send + Sync + 'static + Fn(&A) -> Result<B, E>,
    {
        let mut graph = self.graph.clone();
        let handle = graph.add_stage(Inputs::Single(self.handle.clone()), Unary::new(f), name);
        Deferred {
            graph,
            items: PhantomData,
            handle,
        }
    }

    /// Combines this value with `other` through `f`.
    pub fn join<B, C, F>(&self, other: &Deferred<B>, f: F) -> Deferred<C>
    where
        B: Any + Send + Sync,
        C: Any + Send + Sync,
        F: Send + Sync + 'static + Fn(&A, &B) -> C,
    {
        self.try_join(other, move |a: &A, b: &B| Ok::<C, Infallible>(f(a, b)))
    }

    /// Like `join`, but an `Err` returned by `f` aborts the whole run.
    pub fn try_join<B, C, E, F>(&self, other: &Deferred<B>, f: F) -> Deferred<C>
    where
        B: Any + Send + Sync,
        C: Any + Send + Sync,
        E: StdError + Send + Sync + 'static,
        F: Send + Sync + 'static + Fn(&A, &B) -> Result<C, E>,
    {
        let mut graph = self.graph.merge(&other.graph);
        let handle = graph.add_stage(
            Inputs::Pair(self.handle.clone(), other.handle.clone()),
            Binary::new(f),
            "Join",
        );
        Deferred {
            graph,
            items: PhantomData,
            handle,
        }
    }

    /// Number of nodes that evaluating this value touches
    pub fn graph_size(&self) -> usize {
        self.graph.len()
    }
}

impl<A: Any + Send + Sync + Clone> Deferred<A> {
    /// Lifts a concrete value into the graph.
    pub fn lift(a: A, name: Option<&str>) -> Self {
        let mut graph = Graph::new();
        let handle = graph.add_source(Lift(a), name.unwrap_or("Input"));
        Deferred {
            graph,
            items: PhantomData,
            handle,
        }
    }

    /// Evaluates the graph on `s`, blocking until it finishes.
    pub fn run<S: Scheduler>(&self, s: &mut S) -> Result<A, EngineError> {
        let graph = Arc::new(self.graph.clone());
        let mut outputs = s.compute(graph, &[self.handle.clone()])?;
        let missing = || EngineError::MissingOutput(self.handle.to_string());
        let out = outputs.pop().ok_or_else(missing)?;
        let value = match Arc::try_unwrap(out) {
            Ok(owned) => owned.downcast::<A>().map(|a| *a).ok(),
            Err(shared) => shared.downcast_ref::<A>().cloned(),
        };
        value.ok_or_else(|| EngineError::TypeMismatch {
            stage: self.handle.to_string(),
        })
    }
}

/// Applies `f` to every deferred value, passing along its position.
pub fn batch_apply<A, B, F>(defs: &[Deferred<A>], f: F) -> Vec<Deferred<B>>
where
    A: Any + Send + Sync,
    B: Any + Send + Sync,
    F: 'static + Sync + Send + Clone + Fn(usize, &A) -> B,
{
    defs.iter()
        .enumerate()
        .map(|(idx, d)| {
            let mf = f.clone();
            d.apply(move |vs| mf(idx, vs))
        })
        .collect()
}

/// Fallible `batch_apply`.  The first failing partition aborts the run.
pub fn try_batch_apply<A, B, E, F>(defs: &[Deferred<A>], f: F) -> Vec<Deferred<B>>
where
    A: Any + Send + Sync,
    B: Any + Send + Sync,
    E: StdError + Send + Sync + 'static,
    F: 'static + Sync + Send + Clone + Fn(usize, &A) -> Result<B, E>,
{
    defs.iter()
        .enumerate()
        .map(|(idx, d)| {
            let mf = f.clone();
            d.try_apply(move |vs| mf(idx, vs))
        })
        .collect()
}

/// Pairwise reduces the values into one.  Returns None for an empty slice.
pub fn tree_reduce<A, F>(defs: &[Deferred<A>], f: F) -> Option<Deferred<A>>
where
    A: Any + Send + Sync + Clone,
    F: 'static + Sync + Send + Clone + Fn(&A, &A) -> A,
{
    tree_reduce_until(defs, 1, f).map(|mut defs| defs.remove(0))
}

/// Pairwise reduces the values until at most `parts` remain.
pub fn tree_reduce_until<A, F>(defs: &[Deferred<A>], parts: usize, f: F) -> Option<Vec<Deferred<A>>>
where
    A: Any + Send + Sync + Clone,
    F: 'static + Sync + Send + Clone + Fn(&A, &A) -> A,
{
    if defs.is_empty() {
        None
    } else if defs.len() <= parts.max(1) {
        Some(defs.to_vec())
    } else {
        let mut pass: Vec<_> = defs
            .chunks(2)
            .map(|pair| match pair {
                [l, r] => l.join(r, f.clone()),
                [single] => single.clone(),
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
        pass.shrink_to_fit();
        tree_reduce_until(&pass, parts, f)
    }
}
