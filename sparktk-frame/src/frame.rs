//! Frame
//! ---
//! A `Frame` is a schema plus a partitioned, lazily evaluated collection of rows.  Operations
//! return new frames sharing the underlying graph; evaluation happens in `row_count`, `take`,
//! `collect` and the exports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sparktk_core::deferred::try_batch_apply;
use sparktk_core::scheduler::{GreedyScheduler, Scheduler};

use crate::collection::Collection;
use crate::error::{FrameError, Result};
use crate::export::{self, CsvExportOptions, ExportSummary, LocalTextSink, TextSink};
use crate::import;
use crate::schema::Schema;
use crate::value::{DataType, Row, Value};

/// Tabular dataset
#[derive(Clone)]
pub struct Frame {
    schema: Arc<Schema>,
    rows: Collection<Row>,
}

impl Frame {
    /// Builds a one-partition frame, checking every row against `schema`.
    /// ```rust
    ///   use sparktk_frame::{row, Frame, Schema, DataType};
    ///
    ///   let schema = Schema::new(vec![("id", DataType::Int32), ("name", DataType::Str)]).unwrap();
    ///   let frame = Frame::create(vec![row![1, "a"], row![2, "b"]], schema).unwrap();
    ///   assert_eq!(frame.row_count().unwrap(), 2);
    /// ```
    pub fn create(rows: Vec<Row>, schema: Schema) -> Result<Frame> {
        for (idx, row) in rows.iter().enumerate() {
            schema.validate(idx, row)?;
        }
        Ok(Frame::from_collection(schema, Collection::from_vec(rows)))
    }

    /// Wraps an existing collection.  Rows are trusted to match `schema`.
    pub fn from_collection(schema: Schema, rows: Collection<Row>) -> Frame {
        Frame {
            schema: Arc::new(schema),
            rows,
        }
    }

    /// Reads a CSV file, or an exported directory of shards, into a frame.
    pub fn import_csv<P: AsRef<Path>>(path: P, schema: Schema, delimiter: char, header: bool) -> Result<Frame> {
        let rows = import::read_csv(path, &schema, delimiter, header)?;
        Ok(Frame::from_collection(schema, rows))
    }

    /// Frame schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Underlying row collection
    pub fn rows(&self) -> &Collection<Row> {
        &self.rows
    }

    /// Number of partitions
    pub fn n_partitions(&self) -> usize {
        self.rows.n_partitions()
    }

    /// Deals rows round-robin into `n` partitions.
    pub fn split(&self, n: usize) -> Frame {
        self.with_rows(self.rows.split(n.max(1)))
    }

    /// Keeps the rows matching `pred`.
    pub fn filter<F: 'static + Sync + Send + Clone + Fn(&Row) -> bool>(&self, pred: F) -> Frame {
        self.with_rows(self.rows.filter(pred))
    }

    /// Appends a column computed from each row.
    ///
    /// Fails up front if `name` is taken.  A computed value that does not fit `data_type`
    /// fails evaluation with `SchemaMismatch`.
    /// ```rust
    ///   use sparktk_frame::{row, Frame, Schema, DataType, Value};
    ///
    ///   let schema = Schema::new(vec![("x", DataType::Int32)]).unwrap();
    ///   let frame = Frame::create(vec![row![1], row![2]], schema).unwrap();
    ///   let doubled = frame
    ///       .add_column("x2", DataType::Int64, |r| match r.get(0) {
    ///           Some(Value::Int(x)) => Value::Long(2 * *x as i64),
    ///           _ => Value::Null,
    ///       })
    ///       .unwrap();
    ///   assert_eq!(doubled.collect().unwrap(), vec![row![1, 2i64], row![2, 4i64]]);
    /// ```
    pub fn add_column<S, F>(&self, name: S, data_type: DataType, f: F) -> Result<Frame>
    where
        S: Into<String>,
        F: 'static + Sync + Send + Clone + Fn(&Row) -> Value,
    {
        let name = name.into();
        let schema = self.schema.with_column(name.clone(), data_type)?;
        let parts = try_batch_apply(self.rows.to_defs(), move |part, rows: &Vec<Row>| {
            let mut out = Vec::with_capacity(rows.len());
            for (idx, row) in rows.iter().enumerate() {
                let value = f(row);
                if !data_type.accepts(&value) {
                    return Err(FrameError::SchemaMismatch {
                        row: idx,
                        reason: format!(
                            "partition {}: column {} expects {}, computed {:?}",
                            part,
                            name,
                            data_type.name(),
                            value
                        ),
                    });
                }
                let mut extended = row.clone();
                extended.push(value);
                out.push(extended);
            }
            Ok(out)
        });
        Ok(Frame::from_collection(schema, Collection::from_defs(parts)))
    }

    /// Number of rows
    pub fn row_count(&self) -> Result<usize> {
        self.row_count_with(&mut GreedyScheduler::default())
    }

    /// Number of rows, evaluated on `s`
    pub fn row_count_with<S: Scheduler>(&self, s: &mut S) -> Result<usize> {
        Ok(self.rows.count().run(s)?)
    }

    /// First `n` rows in partition order
    pub fn take(&self, n: usize) -> Result<Vec<Row>> {
        self.take_with(n, &mut GreedyScheduler::default())
    }

    /// First `n` rows in partition order, evaluated on `s`.  Stops evaluating partitions once
    /// enough rows are collected.
    pub fn take_with<S: Scheduler>(&self, n: usize, s: &mut S) -> Result<Vec<Row>> {
        let mut out = Vec::with_capacity(n);
        for part in self.rows.to_defs() {
            if out.len() >= n {
                break;
            }
            let rows = part.run(s)?;
            let wanted = n - out.len();
            out.extend(rows.into_iter().take(wanted));
        }
        Ok(out)
    }

    /// Every row in partition order
    pub fn collect(&self) -> Result<Vec<Row>> {
        self.collect_with(&mut GreedyScheduler::default())
    }

    /// Every row in partition order, evaluated on `s`
    pub fn collect_with<S: Scheduler>(&self, s: &mut S) -> Result<Vec<Row>> {
        self.rows.run(s)
    }

    /// Writes the frame as CSV shards under `file_name` on the local file system.
    pub fn export_to_csv<P: Into<PathBuf>>(&self, file_name: P, separator: char) -> Result<ExportSummary> {
        let options = CsvExportOptions::new(file_name).with_separator(separator);
        self.export_to_csv_with(&options, &mut LocalTextSink::new())
    }

    /// Writes the frame as CSV through `sink`.
    pub fn export_to_csv_with<T: TextSink>(&self, options: &CsvExportOptions, sink: &mut T) -> Result<ExportSummary> {
        export::export_to_csv(&self.rows, options, sink)
    }

    fn with_rows(&self, rows: Collection<Row>) -> Frame {
        Frame {
            schema: self.schema.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod test_frame {
    use super::*;
    use crate::row;
    use sparktk_core::scheduler::LeveledScheduler;

    fn people() -> Frame {
        let schema = Schema::new(vec![("id", DataType::Int32), ("name", DataType::Str)]).unwrap();
        Frame::create(vec![row![1, "ann"], row![2, "bob"], row![3, "cy"]], schema).unwrap()
    }

    // Keeps the formatted lines in memory instead of writing files.
    #[derive(Default)]
    struct MemorySink {
        saved: Vec<(PathBuf, Vec<String>)>,
    }

    impl TextSink for MemorySink {
        fn save_as_text_file(&mut self, lines: &Collection<String>, path: &Path) -> Result<ExportSummary> {
            let all = lines.run(&mut LeveledScheduler)?;
            let summary = ExportSummary {
                path: path.to_path_buf(),
                shards: lines.n_partitions(),
                lines: all.len(),
            };
            self.saved.push((path.to_path_buf(), all));
            Ok(summary)
        }
    }

    #[test]
    fn test_create_rejects_bad_row() {
        let schema = Schema::new(vec![("id", DataType::Int32)]).unwrap();
        match Frame::create(vec![row![1], row!["two"]], schema) {
            Err(FrameError::SchemaMismatch { row, .. }) => assert_eq!(row, 1),
            other => panic!("unexpected {:?}", other.map(|f| f.n_partitions())),
        }
    }

    #[test]
    fn test_split_and_count() {
        let frame = people().split(2);
        assert_eq!(frame.n_partitions(), 2);
        assert_eq!(frame.row_count_with(&mut LeveledScheduler).unwrap(), 3);
    }

    #[test]
    fn test_filter_keeps_schema() {
        let frame = people().filter(|r| r.get(0) != Some(&Value::Int(2)));
        assert_eq!(frame.schema(), people().schema());
        assert_eq!(frame.collect().unwrap(), vec![row![1, "ann"], row![3, "cy"]]);
    }

    #[test]
    fn test_take_stops_at_n() {
        let frame = people().split(3);
        assert_eq!(frame.take_with(2, &mut LeveledScheduler).unwrap().len(), 2);
        assert_eq!(frame.take(10).unwrap().len(), 3);
        assert!(frame.take(0).unwrap().is_empty());
    }

    #[test]
    fn test_add_column_duplicate() {
        let err = people().add_column("name", DataType::Str, |_| Value::Null).err();
        assert!(matches!(err, Some(FrameError::DuplicateColumn(ref c)) if c == "name"));
    }

    #[test]
    fn test_add_column_type_mismatch() {
        let frame = people().add_column("flag", DataType::Bool, |_| Value::Int(1)).unwrap();
        assert_eq!(frame.schema().column_names(), vec!["id", "name", "flag"]);
        assert!(matches!(frame.collect(), Err(FrameError::SchemaMismatch { row: 0, .. })));
    }

    #[test]
    fn test_export_through_injected_sink() {
        let mut sink = MemorySink::default();
        let options = CsvExportOptions::new("mem://people").with_separator('|');
        let frame = people().add_column("tags", DataType::List, |_| Value::from(vec!["x", "y"])).unwrap();

        let summary = frame.export_to_csv_with(&options, &mut sink).unwrap();
        assert_eq!(summary.lines, 3);
        assert_eq!(sink.saved.len(), 1);
        assert_eq!(sink.saved[0].0, PathBuf::from("mem://people"));
        assert_eq!(sink.saved[0].1, vec!["1|ann|\"x,y\"", "2|bob|\"x,y\"", "3|cy|\"x,y\""]);
    }

    #[test]
    fn test_invalid_separator_skips_sink() {
        let mut sink = MemorySink::default();
        let options = CsvExportOptions::new("mem://people").with_separator('\n');
        let err = people().export_to_csv_with(&options, &mut sink).unwrap_err();
        assert!(matches!(err, FrameError::InvalidSeparator('\n')));
        assert!(sink.saved.is_empty());
    }
}
