use std::io;
use std::path::PathBuf;

use sparktk_core::EngineError;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors raised by frames, exports and imports.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Export target is already present.  Exports never overwrite.
    #[error("output path {0} already exists")]
    PathExists(PathBuf),

    /// Reading or writing `path` failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// The separator cannot delimit RFC4180 fields.
    #[error("{0:?} cannot be used as a field separator")]
    InvalidSeparator(char),

    /// A row does not fit the frame schema.
    #[error("row {row} does not match the schema: {reason}")]
    SchemaMismatch {
        /// Index of the offending row
        row: usize,
        /// Description of the mismatch
        reason: String,
    },

    /// A column name is used twice.
    #[error("column {0} already exists")]
    DuplicateColumn(String),

    /// A text cell could not be parsed into the column type.
    #[error("row {row}, column {column}: cannot parse {text:?} as {expected}")]
    ParseValue {
        /// Index of the row
        row: usize,
        /// Name of the column
        column: String,
        /// Raw cell text
        text: String,
        /// Name of the expected type
        expected: &'static str,
    },

    /// CSV reader failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Malformed export configuration.
    #[error("invalid export configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Failure inside the evaluation engine.
    #[error(transparent)]
    Engine(EngineError),
}

impl FrameError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FrameError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<EngineError> for FrameError {
    /// Unwraps errors raised by a frame stage so callers see the original failure.
    fn from(e: EngineError) -> Self {
        match e.into_stage_error::<FrameError>() {
            Ok(original) => original,
            Err(other) => FrameError::Engine(other),
        }
    }
}
