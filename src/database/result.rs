//! Query result and parameter value types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rows and column metadata returned by a driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOutput {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl QueryOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Row data as a map of column name to value.
pub type Row = HashMap<String, CellValue>;

/// Positional statement parameter (`$1`, `$2`, ...).
pub type QueryParam = CellValue;

/// Cell value that can hold different SQL types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<Utc>),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl CellValue {
    /// Guess the type of a textual value: `null`, booleans, integers, floats, else text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("null") {
            return Self::Null;
        }
        if let Ok(v) = trimmed.parse::<bool>() {
            return Self::Bool(v);
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return Self::Int(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return Self::Float(v);
        }
        Self::String(raw.to_string())
    }
}

impl From<()> for CellValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for CellValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}
