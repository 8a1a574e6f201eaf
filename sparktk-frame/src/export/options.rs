use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::format::CsvRowFormatter;
use crate::error::{FrameError, Result};

/// Separator used when none is configured
pub const DEFAULT_SEPARATOR: char = ',';

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

/// Destination and delimiter of a CSV export.
///
/// The serialized form uses the front-end's parameter names:
/// ```rust
///   use sparktk_frame::export::CsvExportOptions;
///
///   let opts = CsvExportOptions::from_json(r#"{"fileName": "/tmp/out", "separator": ";"}"#).unwrap();
///   assert_eq!(opts.separator, ';');
///   let defaulted = CsvExportOptions::from_json(r#"{"fileName": "/tmp/out"}"#).unwrap();
///   assert_eq!(defaulted.separator, ',');
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CsvExportOptions {
    /// Output directory the shards are written into
    pub file_name: PathBuf,

    /// Field delimiter
    #[serde(default = "default_separator")]
    pub separator: char,
}

impl CsvExportOptions {
    /// Options for `file_name` with the default separator
    pub fn new<P: Into<PathBuf>>(file_name: P) -> Self {
        CsvExportOptions {
            file_name: file_name.into(),
            separator: DEFAULT_SEPARATOR,
        }
    }

    /// Replaces the separator
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Parses and validates a JSON options object
    pub fn from_json(s: &str) -> Result<Self> {
        let opts: CsvExportOptions = serde_json::from_str(s)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Quotes and line breaks cannot delimit RFC4180 fields.
    pub fn validate(&self) -> Result<()> {
        match self.separator {
            '"' | '\r' | '\n' => Err(FrameError::InvalidSeparator(self.separator)),
            _ => Ok(()),
        }
    }

    /// Formatter matching these options
    pub fn formatter(&self) -> CsvRowFormatter {
        CsvRowFormatter::new(self.separator)
    }
}
