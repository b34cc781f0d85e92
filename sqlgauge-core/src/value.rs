//! Dynamically-typed column values and float coercion.

use std::collections::HashMap;

use crate::{Result, SynthesisError};

/// A single value decoded from a result-set column.
///
/// Result sets carry no schema we control, so every cell arrives as one of
/// these variants and is coerced at the point of use.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Null,
}

/// One result row, keyed by column name.
pub type Row = HashMap<String, ColumnValue>;

impl ColumnValue {
    /// Type name used in coercion error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Int(_) => "integer",
            ColumnValue::UInt(_) => "unsigned integer",
            ColumnValue::Float(_) => "float",
            ColumnValue::Text(_) => "text",
            ColumnValue::Bytes(_) => "bytes",
            ColumnValue::Null => "null",
        }
    }

    fn render(&self) -> String {
        match self {
            ColumnValue::Int(v) => v.to_string(),
            ColumnValue::UInt(v) => v.to_string(),
            ColumnValue::Float(v) => v.to_string(),
            ColumnValue::Text(s) => s.clone(),
            ColumnValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            ColumnValue::Null => "NULL".to_string(),
        }
    }
}

/// Coerce the named column of `row` into a float sample value.
///
/// Numeric variants convert directly. Text and byte values are parsed as
/// decimal floats, which covers databases that return numerics as strings.
/// A column absent from the row yields `0.0`; a present but unparseable or
/// NULL value is a [`SynthesisError::TypeMismatch`].
pub fn coerce_value(row: &Row, column: &str) -> Result<f64> {
    let Some(value) = row.get(column) else {
        return Ok(0.0);
    };
    match value {
        ColumnValue::Int(v) => Ok(*v as f64),
        ColumnValue::UInt(v) => Ok(*v as f64),
        ColumnValue::Float(v) => Ok(*v),
        ColumnValue::Text(s) => parse_float(s, column, value),
        ColumnValue::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => parse_float(s, column, value),
            Err(_) => Err(mismatch(column, value)),
        },
        ColumnValue::Null => Err(mismatch(column, value)),
    }
}

fn parse_float(text: &str, column: &str, value: &ColumnValue) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| mismatch(column, value))
}

fn mismatch(column: &str, value: &ColumnValue) -> SynthesisError {
    SynthesisError::TypeMismatch {
        column: column.to_string(),
        type_name: value.type_name(),
        value: value.render(),
    }
}
