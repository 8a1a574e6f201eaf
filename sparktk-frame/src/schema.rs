use crate::error::{FrameError, Result};
use crate::value::{DataType, Row};

/// Named, typed column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name, unique within a schema
    pub name: String,
    /// Type of the values stored in the column
    pub data_type: DataType,
}

/// Ordered list of columns describing every row of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Builds a schema, rejecting duplicate column names.
    /// ```rust
    ///   use sparktk_frame::schema::Schema;
    ///   use sparktk_frame::value::DataType;
    ///
    ///   let schema = Schema::new(vec![("id", DataType::Int32), ("name", DataType::Str)]).unwrap();
    ///   assert_eq!(schema.column_names(), vec!["id", "name"]);
    ///   assert!(Schema::new(vec![("id", DataType::Int32), ("id", DataType::Str)]).is_err());
    /// ```
    pub fn new<S: Into<String>>(columns: Vec<(S, DataType)>) -> Result<Schema> {
        let mut schema = Schema::default();
        for (name, data_type) in columns {
            schema = schema.with_column(name, data_type)?;
        }
        Ok(schema)
    }

    /// Returns a copy of the schema with one more column.
    pub fn with_column<S: Into<String>>(&self, name: S, data_type: DataType) -> Result<Schema> {
        let name = name.into();
        if self.index_of(&name).is_some() {
            return Err(FrameError::DuplicateColumn(name));
        }
        let mut columns = self.columns.clone();
        columns.push(Column { name, data_type });
        Ok(Schema { columns })
    }

    /// Columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when there are no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the column called `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Checks arity and value types of a row.  `idx` only labels the error.
    pub fn validate(&self, idx: usize, row: &Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(FrameError::SchemaMismatch {
                row: idx,
                reason: format!("expected {} fields, found {}", self.columns.len(), row.len()),
            });
        }
        for (col, v) in self.columns.iter().zip(row.iter()) {
            if !col.data_type.accepts(v) {
                return Err(FrameError::SchemaMismatch {
                    row: idx,
                    reason: format!("column {} expects {}, found {:?}", col.name, col.data_type.name(), v),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_schema {
    use super::*;
    use crate::row;

    fn people() -> Schema {
        Schema::new(vec![("id", DataType::Int32), ("name", DataType::Str)]).unwrap()
    }

    #[test]
    fn test_validate_accepts_nulls() {
        assert!(people().validate(0, &row![1, crate::value::Value::Null]).is_ok());
    }

    #[test]
    fn test_validate_arity() {
        match people().validate(3, &row![1]) {
            Err(FrameError::SchemaMismatch { row, .. }) => assert_eq!(row, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validate_type() {
        assert!(people().validate(0, &row!["1", "bob"]).is_err());
    }

    #[test]
    fn test_with_column() {
        let s = people().with_column("score", DataType::Float64).unwrap();
        assert_eq!(s.index_of("score"), Some(2));
        assert!(matches!(s.with_column("id", DataType::Str), Err(FrameError::DuplicateColumn(_))));
        assert_eq!(s.len(), 3);
    }
}
