//! CSV export
//!
//! Exporting applies a `CsvRowFormatter` to every row of every partition and hands the
//! resulting lines to a `TextSink`, which owns shard naming and the commit.

/// Row to RFC4180 line rendering
pub mod format;

/// Export configuration
pub mod options;

/// Sharded text output
pub mod sink;

pub use self::format::CsvRowFormatter;
pub use self::options::CsvExportOptions;
pub use self::sink::{ExportSummary, LocalTextSink, TextSink};

use crate::collection::Collection;
use crate::error::Result;
use crate::value::Row;

/// Formats `rows` per `options` and saves them through `sink`.
pub fn export_to_csv<T: TextSink>(
    rows: &Collection<Row>,
    options: &CsvExportOptions,
    sink: &mut T,
) -> Result<ExportSummary> {
    options.validate()?;
    let formatter = options.formatter();
    debug!(
        "Exporting {} partitions to {} with separator {:?}",
        rows.n_partitions(),
        options.file_name.display(),
        formatter.delimiter()
    );
    let lines = rows.map(move |row| formatter.format(row));
    sink.save_as_text_file(&lines, &options.file_name)
}
