//! Reads RFC4180 text into a `Collection<Row>`.
//!
//! A path may be a single file or a directory produced by an export, in which case every
//! `part-*` shard becomes one partition, in shard order.  Files are opened eagerly so a
//! missing path fails immediately; records are parsed when the collection is evaluated.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord};
use sparktk_core::deferred::{try_batch_apply, Deferred};

use crate::collection::Collection;
use crate::error::{FrameError, Result};
use crate::schema::Schema;
use crate::value::Row;

const SHARD_PREFIX: &str = "part-";

/// Delimiter as the single byte the reader needs.
fn delimiter_byte(delimiter: char) -> Result<u8> {
    match delimiter {
        '"' | '\r' | '\n' => Err(FrameError::InvalidSeparator(delimiter)),
        c if c.is_ascii() => Ok(c as u8),
        c => Err(FrameError::InvalidSeparator(c)),
    }
}

// Shards of an export directory, sorted by name.
fn list_shards(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut shards = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| FrameError::io(dir, e))? {
        let entry = entry.map_err(|e| FrameError::io(dir, e))?;
        let is_shard = entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.starts_with(SHARD_PREFIX));
        if is_shard && entry.path().is_file() {
            shards.push(entry.path());
        }
    }
    shards.sort();
    Ok(shards)
}

fn parse_record(schema: &Schema, row: usize, record: &StringRecord) -> Result<Row> {
    if record.len() != schema.len() {
        return Err(FrameError::SchemaMismatch {
            row,
            reason: format!("expected {} fields, found {}", schema.len(), record.len()),
        });
    }
    let mut values = Vec::with_capacity(record.len());
    for (column, text) in schema.columns().iter().zip(record.iter()) {
        let value = column.data_type.parse(text).ok_or_else(|| FrameError::ParseValue {
            row,
            column: column.name.clone(),
            text: text.to_owned(),
            expected: column.data_type.name(),
        })?;
        values.push(value);
    }
    Ok(Row::new(values))
}

fn read_file(path: &Path, schema: &Schema, delimiter: u8, header: bool) -> Result<Vec<Row>> {
    let file = File::open(path).map_err(|e| FrameError::io(path, e))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(header)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        rows.push(parse_record(schema, idx, &record?)?);
    }
    trace!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Reads `path` as a collection with one partition per file.
///
/// Every record must have one field per column of `schema`; each cell is parsed with
/// `DataType::parse`.  With `header` set, the first record of every file is skipped.
pub fn read_csv<P: AsRef<Path>>(
    path: P,
    schema: &Schema,
    delimiter: char,
    header: bool,
) -> Result<Collection<Row>> {
    let path = path.as_ref();
    let delimiter = delimiter_byte(delimiter)?;
    let meta = fs::metadata(path).map_err(|e| FrameError::io(path, e))?;
    let files = if meta.is_dir() {
        list_shards(path)?
    } else {
        vec![path.to_path_buf()]
    };
    debug!("Reading {} files from {}", files.len(), path.display());

    let sources: Vec<_> = files
        .into_iter()
        .map(|f| {
            let name = format!("File: {}", f.display());
            Deferred::lift(f, Some(&name))
        })
        .collect();

    let schema = Arc::new(schema.clone());
    let parts = try_batch_apply(&sources, move |_idx, file: &PathBuf| {
        read_file(file, &schema, delimiter, header)
    });
    Ok(Collection::from_defs(parts))
}
