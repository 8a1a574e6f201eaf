//! Collection
//! ---
//! `Collection` is a partitioned, lazily evaluated sequence of values.  Every partition is a
//! `Deferred<Vec<A>>`; operators add per-partition tasks to the graph and nothing runs until
//! `run` is called.  Frames store their rows in a `Collection<Row>` and exports turn it into
//! a `Collection<String>` of formatted lines.

use std::any::Any;
use std::error::Error as StdError;

use sparktk_core::deferred::{batch_apply, try_batch_apply, tree_reduce, Deferred};
use sparktk_core::scheduler::{GreedyScheduler, Scheduler};

use crate::error::Result;
use crate::partitioned::{concat, partition};

/// Collection struct
pub struct Collection<A> {
    partitions: Vec<Deferred<Vec<A>>>,
}

impl<A> Clone for Collection<A> {
    fn clone(&self) -> Self {
        Collection {
            partitions: self.partitions.clone(),
        }
    }
}

impl<A: Any + Send + Sync + Clone> Collection<A> {
    /// Creates a Collection from a set of Deferred partitions.
    pub fn from_defs(vs: Vec<Deferred<Vec<A>>>) -> Collection<A> {
        Collection { partitions: vs }
    }

    /// Provides raw access to the underlying Deferred partitions
    pub fn to_defs(&self) -> &[Deferred<Vec<A>>] {
        &self.partitions
    }

    /// Creates a single-partition Collection from a Vec of items
    /// ```rust
    ///   use sparktk_core::scheduler::LeveledScheduler;
    ///   use sparktk_frame::collection::Collection;
    ///
    ///   let col = Collection::from_vec(vec![1, 2, 3usize]);
    ///   assert_eq!(col.run(&mut LeveledScheduler).unwrap(), vec![1, 2, 3usize]);
    /// ```
    pub fn from_vec(vs: Vec<A>) -> Collection<A> {
        Collection {
            partitions: vec![Deferred::lift(vs, None)],
        }
    }

    /// Returns the current number of data partitions
    pub fn n_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Concatenates two collections; the partitions of `other` follow those of `self`.
    /// ```rust
    ///   use sparktk_core::scheduler::LeveledScheduler;
    ///   use sparktk_frame::collection::Collection;
    ///
    ///   let one = Collection::from_vec(vec![1, 2, 3usize]);
    ///   let two = Collection::from_vec(vec![4usize, 5, 6]);
    ///   let cat = one.concat(&two);
    ///   assert_eq!(cat.n_partitions(), 2);
    ///   assert_eq!(cat.run(&mut LeveledScheduler).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    /// ```
    pub fn concat(&self, other: &Collection<A>) -> Collection<A> {
        let partitions = self
            .partitions
            .iter()
            .chain(other.partitions.iter())
            .cloned()
            .collect();
        Collection { partitions }
    }

    /// Maps a function over the values in the Collection
    /// ```rust
    ///   use sparktk_core::scheduler::LeveledScheduler;
    ///   use sparktk_frame::collection::Collection;
    ///
    ///   let one = Collection::from_vec(vec![1, 2, 3usize]);
    ///   let strings = one.map(|i| format!("{}", i));
    ///   assert_eq!(strings.run(&mut LeveledScheduler).unwrap(),
    ///              vec!["1".to_string(), "2".into(), "3".into()]);
    /// ```
    pub fn map<B: Any + Send + Sync + Clone, F: 'static + Sync + Send + Clone + Fn(&A) -> B>(
        &self,
        f: F,
    ) -> Collection<B> {
        self.emit(move |x, emitter| emitter(f(x)))
    }

    /// Filters out items in the collection that fail the predicate.
    /// ```rust
    ///   use sparktk_core::scheduler::LeveledScheduler;
    ///   use sparktk_frame::collection::Collection;
    ///
    ///   let col = Collection::from_vec(vec![1, 2, 3usize]);
    ///   let odds = col.filter(|x| x % 2 == 1);
    ///   assert_eq!(odds.run(&mut LeveledScheduler).unwrap(), vec![1, 3usize]);
    /// ```
    pub fn filter<F: 'static + Sync + Send + Clone + Fn(&A) -> bool>(&self, f: F) -> Collection<A> {
        self.emit(move |x, emitter| {
            if f(x) {
                emitter(x.clone())
            }
        })
    }

    /// Maps over all items in a collection, optionally emitting new values.  It fuses a
    /// number of map/filter/flat_map functions into a single task per partition.
    /// ```rust
    ///   use sparktk_core::scheduler::LeveledScheduler;
    ///   use sparktk_frame::collection::Collection;
    ///
    ///   let col = Collection::from_vec(vec![1, 2, 3usize]);
    ///   let new = col.emit(|item, emitter| {
    ///     if item % 2 == 0 {
    ///         emitter(format!("{}!", item));
    ///     }
    ///   });
    ///   assert_eq!(new.run(&mut LeveledScheduler).unwrap(), vec!["2!".to_string()]);
    /// ```
    pub fn emit<
        B: Any + Send + Sync + Clone,
        F: 'static + Sync + Send + Clone + Fn(&A, &mut dyn FnMut(B)),
    >(
        &self,
        f: F,
    ) -> Collection<B> {
        let partitions = batch_apply(&self.partitions, move |_idx, vs| {
            let mut out = Vec::with_capacity(vs.len());
            for v in vs.iter() {
                f(v, &mut |r| out.push(r));
            }
            out
        });
        Collection { partitions }
    }

    /// Like `emit`, but `f` may fail.  The first failure aborts evaluation and is returned
    /// from `run`.
    pub fn try_emit<
        B: Any + Send + Sync + Clone,
        E: StdError + Send + Sync + 'static,
        F: 'static + Sync + Send + Clone + Fn(usize, &A, &mut dyn FnMut(B)) -> std::result::Result<(), E>,
    >(
        &self,
        f: F,
    ) -> Collection<B> {
        let partitions = try_batch_apply(&self.partitions, move |part, vs| {
            let mut out = Vec::with_capacity(vs.len());
            for v in vs.iter() {
                f(part, v, &mut |r| out.push(r))?;
            }
            Ok::<_, E>(out)
        });
        Collection { partitions }
    }

    /// Re-partitions a collection into `n_chunks` partitions, dealing items out round-robin
    /// from each old partition.
    /// ```rust
    ///   use sparktk_frame::collection::Collection;
    ///
    ///   let col = Collection::from_vec(vec![1, 2, 3usize]);
    ///   assert_eq!(col.n_partitions(), 1);
    ///   let two = col.split(2);
    ///   assert_eq!(two.n_partitions(), 2);
    /// ```
    pub fn split(&self, n_chunks: usize) -> Collection<A> {
        self.partition(n_chunks, |idx, _k| idx)
    }

    /// Re-partitions data into N new partitions by the given function.  The returned value
    /// is taken modulo N to pick the destination partition.
    /// ```rust
    ///   use sparktk_core::scheduler::LeveledScheduler;
    ///   use sparktk_frame::collection::Collection;
    ///
    ///   let col = Collection::from_vec(vec![1, 2, 3, 4usize]);
    ///   let new_col = col.partition(2, |_idx, x| if *x < 3 { 1 } else { 2 });
    ///
    ///   assert_eq!(new_col.n_partitions(), 2);
    ///   assert_eq!(new_col.run(&mut LeveledScheduler).unwrap(), vec![3, 4, 1, 2]);
    /// ```
    pub fn partition<F: 'static + Sync + Send + Clone + Fn(usize, &A) -> usize>(
        &self,
        partitions: usize,
        f: F,
    ) -> Collection<A> {
        Collection {
            partitions: partition(&self.partitions, partitions, f),
        }
    }

    /// Returns the number of items in the collection as a single-value deferred.
    pub fn count(&self) -> Deferred<usize> {
        let sizes = batch_apply(&self.partitions, |_idx, vs| vs.len());
        tree_reduce(&sizes, |x, y| x + y).unwrap_or_else(|| Deferred::lift(0, None))
    }

    /// Executes the Collection, returning its items partition by partition.
    pub fn run<S: Scheduler>(&self, s: &mut S) -> Result<Vec<A>> {
        match concat(&self.partitions) {
            Some(all) => Ok(all.run(s)?),
            None => Ok(Vec::new()),
        }
    }

    /// Executes the Collection on a `GreedyScheduler` sized to the machine
    pub fn eval(&self) -> Result<Vec<A>> {
        self.run(&mut GreedyScheduler::default())
    }
}
