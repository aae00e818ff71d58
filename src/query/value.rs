//! Scalar cell value model shared by the cursor and drill-through layers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Typed cell value tagged with explicit type information so the wire
/// format stays unambiguous across consumers.
///
/// Precision-sensitive figures (currency, exact aggregates) travel as
/// [`CellValue::Decimal`], which preserves the exact decimal representation
/// instead of rounding through a binary float. Integers stay exact integers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum CellValue {
    /// Empty cell.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer value.
    Int(i64),
    /// Exact decimal value.
    Decimal(Decimal),
    /// 64-bit floating point value.
    Float(f64),
    /// UTF-8 string value.
    String(String),
}

impl CellValue {
    /// True for the empty-cell marker.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value as i64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<Decimal> for CellValue {
    fn from(value: Decimal) -> Self {
        CellValue::Decimal(value)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}
