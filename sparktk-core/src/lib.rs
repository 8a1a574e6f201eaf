//! sparktk-core
//!
//! `sparktk-core` provides the deferred, task-based computation engine that sparktk frames
//! are evaluated on.
//!
//! What is it?
//! ---
//!
//! A `Deferred` value describes a computation without running it.  Deferred values are
//! combined into a task graph which a `Scheduler` executes concurrently on the local machine.
//! Frames keep one `Deferred` per partition, so every per-partition transform becomes an
//! independent task.
//!
//! How to Use It?
//! ---
//!
//! `Deferred` objects are built with a handful of functions:
//!
//! 1. `lift` - Lift takes a concrete value and lifts it into a Deferred object
//! 2. `apply` - Apply applies a function to a Deferred, producing a new Deferred object.
//! 3. `join` -  Join combines two Deferred objects with a joiner function, producing a new Deferred.
//! 4. `try_apply` / `try_join` - Fallible variants.  The first failure stops the scheduler
//!    and is returned from `run`.
//!
//! Example
//! ---
//! ```rust
//! use sparktk_core::deferred::Deferred;
//! use sparktk_core::scheduler::LeveledScheduler;
//!
//! let header = Deferred::lift("id".to_owned(), None);
//! let body = Deferred::lift(vec![1, 2, 3usize], None);
//! let rendered = body.apply(|ids| ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("\n"));
//! let csv = header.join(&rendered, |h, b| format!("{}\n{}", h, b));
//! assert_eq!(csv.run(&mut LeveledScheduler).unwrap(), "id\n1\n2\n3");
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate log;

/// Contains Deferred primitive and function definitions
pub mod deferred;

/// Contains Scheduler trait definition and implementations
pub mod scheduler;

/// Engine error type
pub mod error;

/// Task graph representation consumed by schedulers
pub mod graph;

/// Internal task definitions
mod task;

pub use error::{EngineError, StageFailure};
pub use task::Payload;
