//! Result rows returned by statement execution backends.

use std::fmt;

use crate::error::SqlError;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    /// Renders the value as a SQL literal for statement building.
    pub fn literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// An ordered, name-keyed result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style cell append, handy for fixtures.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.push(name, value.into());
        self
    }

    /// Appends a named cell.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.cells.push((name.into(), value));
    }

    /// Cell value by column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.cells.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Required text column; errors when the column is absent, null,
    /// or not text.
    pub fn string(&self, name: &str) -> Result<&str, SqlError> {
        match self.get(name) {
            Some(Value::Text(s)) => Ok(s),
            Some(other) => Err(SqlError::malformed(format!(
                "column {name} is {}, expected text",
                other.type_name()
            ))),
            None => Err(SqlError::malformed(format!("missing column {name}"))),
        }
    }

    /// Nullable text column; `None` for SQL null, error when the
    /// column is absent or not text.
    pub fn opt_string(&self, name: &str) -> Result<Option<&str>, SqlError> {
        match self.get(name) {
            Some(Value::Null) => Ok(None),
            Some(Value::Text(s)) => Ok(Some(s)),
            Some(other) => Err(SqlError::malformed(format!(
                "column {name} is {}, expected text or null",
                other.type_name()
            ))),
            None => Err(SqlError::malformed(format!("missing column {name}"))),
        }
    }

    /// Required integer column.
    pub fn int(&self, name: &str) -> Result<i64, SqlError> {
        match self.get(name) {
            Some(Value::Int(i)) => Ok(*i),
            Some(other) => Err(SqlError::malformed(format!(
                "column {name} is {}, expected int",
                other.type_name()
            ))),
            None => Err(SqlError::malformed(format!("missing column {name}"))),
        }
    }

    /// Cell values in column order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cells.iter().map(|(_, v)| v)
    }

    /// Column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
