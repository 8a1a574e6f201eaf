//! RFC4180 rendering of rows.
//!
//! Field policy, applied to each field in order:
//!
//! * `Null` renders as the empty string.
//! * `List` renders its elements joined with a literal `,`, whatever the configured
//!   delimiter is.  This is long-standing export behaviour that downstream readers depend on;
//!   it is kept as is.
//! * Everything else renders with its canonical `Display` form.
//!
//! A field is quoted when it contains the delimiter, a `,`, a `"`, `\r` or `\n`.  Embedded
//! quotes are doubled.  No line terminator is appended.

use std::borrow::Cow;

use crate::value::{Row, Value};

/// Separator used inside nested sequence fields, independent of the row delimiter.
pub const NESTED_SEPARATOR: char = ',';

const QUOTE: char = '"';

/// Turns rows into RFC4180 lines.  Stateless, so it is freely shared between partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvRowFormatter {
    delimiter: char,
}

impl Default for CsvRowFormatter {
    fn default() -> Self {
        CsvRowFormatter::new(',')
    }
}

impl CsvRowFormatter {
    /// Creates a formatter joining fields with `delimiter`
    pub fn new(delimiter: char) -> Self {
        CsvRowFormatter { delimiter }
    }

    /// Field delimiter
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Renders one field to its unquoted text.
    pub fn render_field(value: &Value) -> Cow<'_, str> {
        match value {
            Value::Null => Cow::Borrowed(""),
            Value::Str(s) => Cow::Borrowed(s.as_str()),
            Value::List(items) => Cow::Owned(join_nested(items)),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Unquoted text of every field of `row`
    pub fn fields(&self, row: &Row) -> Vec<String> {
        row.iter().map(|v| Self::render_field(v).into_owned()).collect()
    }

    /// Formats `row` as a single line.
    /// ```rust
    ///   use sparktk_frame::row;
    ///   use sparktk_frame::value::Value;
    ///   use sparktk_frame::export::CsvRowFormatter;
    ///
    ///   let fmt = CsvRowFormatter::new(';');
    ///   assert_eq!(fmt.format(&row![vec![1, 2, 3], "x"]), "\"1,2,3\";x");
    ///   assert_eq!(CsvRowFormatter::default().format(&row![Value::Null, "a"]), ",a");
    /// ```
    pub fn format(&self, row: &Row) -> String {
        let mut line = String::new();
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                line.push(self.delimiter);
            }
            self.push_escaped(&mut line, &Self::render_field(value));
        }
        // A lone empty field is quoted so the line is not read back as a blank line
        if row.len() == 1 && line.is_empty() {
            line.push(QUOTE);
            line.push(QUOTE);
        }
        line
    }

    fn needs_quotes(&self, field: &str) -> bool {
        field.chars().any(|c| {
            c == self.delimiter || c == NESTED_SEPARATOR || c == QUOTE || c == '\r' || c == '\n'
        })
    }

    fn push_escaped(&self, out: &mut String, field: &str) {
        if !self.needs_quotes(field) {
            out.push_str(field);
            return;
        }
        out.push(QUOTE);
        for c in field.chars() {
            if c == QUOTE {
                out.push(QUOTE);
            }
            out.push(c);
        }
        out.push(QUOTE);
    }
}

fn join_nested(items: &[Value]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(NESTED_SEPARATOR);
        }
        out.push_str(&CsvRowFormatter::render_field(item));
    }
    out
}

#[cfg(test)]
mod test_format {
    use super::*;
    use crate::row;

    fn comma() -> CsvRowFormatter {
        CsvRowFormatter::default()
    }

    #[test]
    fn test_null_is_empty() {
        assert_eq!(comma().format(&row![Value::Null, "a"]), ",a");
        assert_eq!(comma().format(&row!["a", Value::Null]), "a,");
    }

    #[test]
    fn test_delimiter_is_quoted() {
        assert_eq!(comma().format(&row!["a,b", "c"]), "\"a,b\",c");
        assert_eq!(CsvRowFormatter::new('|').format(&row!["a|b", "c"]), "\"a|b\"|c");
    }

    #[test]
    fn test_quotes_are_doubled() {
        assert_eq!(comma().format(&row!["a\"b"]), "\"a\"\"b\"");
    }

    #[test]
    fn test_line_breaks_are_quoted() {
        assert_eq!(comma().format(&row!["one\ntwo", "x\r"]), "\"one\ntwo\",\"x\r\"");
    }

    // Legacy behaviour: nested values are always comma joined, even with another delimiter.
    #[test]
    fn test_nested_sequence_keeps_comma_with_other_delimiter() {
        let fmt = CsvRowFormatter::new(';');
        assert_eq!(fmt.format(&row![vec![1, 2, 3], "x"]), "\"1,2,3\";x");
        assert_eq!(fmt.fields(&row![vec![1.5, 2.0]]), vec!["1.5,2.0".to_string()]);
    }

    #[test]
    fn test_nested_nulls_and_nesting() {
        let nested = Value::List(vec![
            Value::Int(1),
            Value::Null,
            Value::List(vec![Value::Str("a".into()), Value::Bool(false)]),
        ]);
        assert_eq!(CsvRowFormatter::render_field(&nested), "1,,a,false");
    }

    #[test]
    fn test_scalars_use_canonical_form() {
        let line = comma().format(&row![7, 8i64, 0.25f32, 3.0, true, "plain"]);
        assert_eq!(line, "7,8,0.25,3.0,true,plain");
    }

    #[test]
    fn test_large_and_small_floats_keep_fraction() {
        let line = comma().format(&row![1e20f64, 1e-7f64, 123456789012345680000.0f64, 1e-7f32]);
        assert_eq!(line, "1.0e20,1.0e-7,1.2345678901234568e20,1.0e-7");
    }

    #[test]
    fn test_single_empty_field_is_quoted() {
        assert_eq!(comma().format(&row![Value::Null]), "\"\"");
        assert_eq!(comma().format(&Row::default()), "");
    }

    #[test]
    fn test_format_is_deterministic() {
        let r = row!["a\"b", Value::Null, vec![1, 2], 4.5];
        let fmt = CsvRowFormatter::new('\t');
        assert_eq!(fmt.format(&r), fmt.format(&r.clone()));
        assert_eq!(fmt.format(&r), "\"a\"\"b\"\t\t\"1,2\"\t4.5");
    }
}
