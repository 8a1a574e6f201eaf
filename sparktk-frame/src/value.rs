//! Cell values and rows.

use std::fmt;
use std::slice;

/// A single cell of a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Text
    Str(String),
    /// Nested sequence of values, e.g. a vector column
    List(Vec<Value>),
}

impl Value {
    /// True for `Value::Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    /// Canonical text form.  Floats always carry a fractional part; lists print bracketed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(x) => write_float(f, x),
            Value::Double(x) => write_float(f, x),
            Value::Str(s) => f.write_str(s),
            Value::List(vs) => {
                f.write_str("[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            }
        }
    }
}

// Shortest round-trippable form.  Exponent forms keep a fractional mantissa, `1e20` is
// written as `1.0e20`.
fn write_float<T: fmt::Debug>(f: &mut fmt::Formatter<'_>, x: T) -> fmt::Result {
    let text = format!("{:?}", x);
    match text.split_once('e') {
        Some((mantissa, exp)) if !mantissa.contains('.') => write!(f, "{}.0e{}", mantissa, exp),
        _ => f.write_str(&text),
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from!(bool => Bool, i32 => Int, i64 => Long, f32 => Float, f64 => Double,
            String => Str, &str => Str);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(vs: Vec<T>) -> Self {
        Value::List(vs.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Column types a schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `Value::Bool`
    Bool,
    /// `Value::Int`
    Int32,
    /// `Value::Long`
    Int64,
    /// `Value::Float`
    Float32,
    /// `Value::Double`
    Float64,
    /// `Value::Str`
    Str,
    /// `Value::List`
    List,
}

impl DataType {
    /// Type name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Str => "str",
            DataType::List => "list",
        }
    }

    /// True if `v` may be stored in a column of this type.  Null fits every column.
    pub fn accepts(&self, v: &Value) -> bool {
        matches!(
            (self, v),
            (_, Value::Null)
                | (DataType::Bool, Value::Bool(_))
                | (DataType::Int32, Value::Int(_))
                | (DataType::Int64, Value::Long(_))
                | (DataType::Float32, Value::Float(_))
                | (DataType::Float64, Value::Double(_))
                | (DataType::Str, Value::Str(_))
                | (DataType::List, Value::List(_))
        )
    }

    /// Parses the text form of a cell.  The empty string is Null for every type, matching how
    /// the CSV export renders Null.
    pub fn parse(&self, text: &str) -> Option<Value> {
        if text.is_empty() {
            return Some(Value::Null);
        }
        match self {
            DataType::Bool => text.trim().parse().ok().map(Value::Bool),
            DataType::Int32 => text.trim().parse().ok().map(Value::Int),
            DataType::Int64 => text.trim().parse().ok().map(Value::Long),
            DataType::Float32 => text.trim().parse().ok().map(Value::Float),
            DataType::Float64 => text.trim().parse().ok().map(Value::Double),
            DataType::Str => Some(Value::Str(text.to_owned())),
            DataType::List => text
                .split(',')
                .map(|item| match item.trim() {
                    "" => Some(Value::Null),
                    t => t.parse().ok().map(Value::Double),
                })
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
        }
    }
}

/// One record of a frame: an ordered list of values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(Vec<Value>);

impl Row {
    /// Creates a row from its values
    pub fn new(values: Vec<Value>) -> Self {
        Row(values)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a row without fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field at `idx`
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.0.get(idx)
    }

    /// All fields in order
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Appends a field
    pub fn push(&mut self, v: Value) {
        self.0.push(v);
    }

    /// Iterates over the fields
    pub fn iter(&self) -> slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row(values)
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Builds a `Row`, converting every field with `Value::from`.
/// ```rust
///   use sparktk_frame::row;
///   use sparktk_frame::value::Value;
///
///   let r = row![1, "a", Value::Null, vec![1.5, 2.0]];
///   assert_eq!(r.len(), 4);
///   assert_eq!(r.get(1), Some(&Value::Str("a".into())));
/// ```
#[macro_export]
macro_rules! row {
    ($($v:expr),* $(,)?) => {
        $crate::value::Row::new(vec![$($crate::value::Value::from($v)),*])
    };
}

#[cfg(test)]
mod test_value {
    use super::*;

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Double(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
    }

    #[test]
    fn test_exponent_floats_keep_fraction() {
        assert_eq!(Value::Double(1e20).to_string(), "1.0e20");
        assert_eq!(Value::Double(1e-7).to_string(), "1.0e-7");
        assert_eq!(Value::Double(-2e-9).to_string(), "-2.0e-9");
        assert_eq!(Value::Double(123456789012345680000.0).to_string(), "1.2345678901234568e20");
        assert_eq!(Value::Float(1e-7).to_string(), "1.0e-7");
        assert_eq!(Value::Double(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Double(f64::INFINITY).to_string(), "inf");
        assert_eq!(DataType::Float64.parse("1.0e20"), Some(Value::Double(1e20)));
    }

    #[test]
    fn test_accepts() {
        assert!(DataType::Int32.accepts(&Value::Int(1)));
        assert!(DataType::Int32.accepts(&Value::Null));
        assert!(!DataType::Int32.accepts(&Value::Long(1)));
        assert!(DataType::List.accepts(&Value::from(vec![1.0, 2.0])));
    }

    #[test]
    fn test_parse() {
        assert_eq!(DataType::Int64.parse("42"), Some(Value::Long(42)));
        assert_eq!(DataType::Float64.parse(""), Some(Value::Null));
        assert_eq!(DataType::Bool.parse("yes"), None);
        assert_eq!(DataType::Bool.parse(" true "), Some(Value::Bool(true)));
        assert_eq!(DataType::Int32.parse(" 1 "), Some(Value::Int(1)));
        assert_eq!(DataType::List.parse("1.0,,3"),
                   Some(Value::List(vec![Value::Double(1.0), Value::Null, Value::Double(3.0)])));
    }

    #[test]
    fn test_option_into_value() {
        let missing: Option<i32> = None;
        assert_eq!(Value::from(missing), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Str("x".into()));
    }
}
