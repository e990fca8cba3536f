// 📄 Records & Tables - the in-memory shape of an ingested sheet
// A Record is an ordered column → scalar mapping; a Table is records + column order

use crate::error::{CleanerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// SCALAR VALUE
// ============================================================================

/// One untyped cell as received from the loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Only produced by in-memory callers or JSON arrays of scalars
    List(Vec<Value>),
}

impl Value {
    /// Null, or a string that is blank after trimming
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text rendering used by cleaners that accept numbers as well as strings.
    /// Integral numbers are rendered without a fractional part.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(|v| v.to_text())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Interpret the cell as a non-negative count (employee numbers etc.)
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Value::Number(n) if *n >= 0.0 && n.is_finite() => Some(*n as u64),
            Value::String(s) => {
                let digits: String = s.trim().replace(',', "");
                if let Ok(n) = digits.parse::<u64>() {
                    return Some(n);
                }
                digits
                    .parse::<f64>()
                    .ok()
                    .filter(|n| *n >= 0.0 && n.is_finite())
                    .map(|n| n as u64)
            }
            _ => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// Ordered mapping from column name to value.
///
/// Records are never mutated by the cleaning stages: each stage builds a new
/// record with its derived columns appended (`augmented`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Record { fields: Vec::new() }
    }

    /// Builder: append a field (replaces an existing field with the same name)
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Text of a column, empty when absent or null
    pub fn text(&self, column: &str) -> String {
        self.get(column).map(|v| v.to_text()).unwrap_or_default()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consume the record and return it with extra columns appended
    pub fn augmented<I>(mut self, derived: I) -> Record
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (column, value) in derived {
            self.set(column, value);
        }
        self
    }

    fn set(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// Ordered record set plus the column order of the source sheet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    /// Create a table, rejecting duplicate column names
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Result<Self> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(CleanerError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    column
                )));
            }
        }
        Ok(Table { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// All values of one column in row order (Null where a row lacks the column)
    pub fn column_values(&self, column: &str) -> Vec<&Value> {
        static NULL: Value = Value::Null;
        self.rows
            .iter()
            .map(|row| row.get(column).unwrap_or(&NULL))
            .collect()
    }

    /// Register derived columns so they follow the source columns in output order
    pub fn push_columns<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.has_column(&name) {
                self.columns.push(name);
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
