//! sparktk-frame
//! ---
//! Frames for sparktk: typed, partitioned tables evaluated on the `sparktk-core` engine.
//!
//! What is it?
//! ---
//! A `Frame` pairs a `Schema` with a lazily evaluated collection of rows.  Each partition is
//! an independent task, so transforms such as `filter` or `add_column` and the CSV export run
//! in parallel across partitions.
//!
//! CSV export renders every row as one RFC4180 line with `CsvRowFormatter` and hands the lines
//! to a `TextSink`.  The default `LocalTextSink` writes one `part-NNNNN` shard per partition
//! and commits them together, marking the output with `_SUCCESS`.
//!
//! Example - Export
//! ---
//!
//! ```rust
//! use sparktk_frame::{row, DataType, Frame, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     ("id", DataType::Int32),
//!     ("name", DataType::Str),
//!     ("scores", DataType::List),
//! ]).unwrap();
//!
//! let frame = Frame::create(vec![
//!     row![1, "ann", vec![1.5, 2.0]],
//!     row![2, Value::Null, vec![3.0]],
//! ], schema.clone()).unwrap().split(2);
//!
//! let scratch = tempfile::tempdir().unwrap();
//! let dir = scratch.path().join("people");
//! let summary = frame.export_to_csv(&dir, ';').unwrap();
//! assert_eq!(summary.lines, 2);
//!
//! let back = Frame::import_csv(&dir, schema, ';', false).unwrap();
//! assert_eq!(back.collect().unwrap(), frame.collect().unwrap());
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate log;

/// Frame error type
pub mod error;

/// Cell values, column types and rows
pub mod value;

/// Column definitions
pub mod schema;

/// Partitioned lazy collections
pub mod collection;

/// Tabular datasets
pub mod frame;

/// CSV export: row formatting, options and text sinks
pub mod export;

/// CSV import
pub mod import;

mod partitioned;

pub use crate::collection::Collection;
pub use crate::error::{FrameError, Result};
pub use crate::export::{CsvExportOptions, CsvRowFormatter, ExportSummary, LocalTextSink, TextSink};
pub use crate::frame::Frame;
pub use crate::schema::{Column, Schema};
pub use crate::value::{DataType, Row, Value};
