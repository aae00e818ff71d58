#![forbid(unsafe_code)]

//! Cellset consumption: collaborator contracts, the result cursor, and
//! drill-through row cursors.
//!
//! The traits here are the whole surface the core expects from the
//! surrounding system. Implementations wrap a real engine; the
//! [`fixture`] module provides in-memory stand-ins for tests and
//! prototyping.

/// Multi-axis result cursor over a cellset handle.
pub mod cursor;

/// Drill-through row cursor with guaranteed resource release.
pub mod drill;

/// In-memory cellset fixture used by tests and prototyping.
pub mod fixture;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::query::value::CellValue;
use crate::types::Result;

/// A single labeled point within a hierarchy.
pub trait Member {
    /// Short member name.
    fn name(&self) -> String;
    /// Fully qualified member name.
    fn full_name(&self) -> String;
    /// Display caption.
    fn caption(&self) -> String;
    /// Depth within the hierarchy, root level zero.
    fn depth(&self) -> u32;
    /// True for calculated members.
    fn is_calculated(&self) -> bool;
    /// Child members in hierarchy order.
    fn children(&self) -> Vec<Arc<dyn Member>>;
}

/// One coordinate value along an axis: one member per participating
/// hierarchy.
pub type Position = Vec<Arc<dyn Member>>;

/// Declared metadata for one drill-through result column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Source table name, when the engine reports one.
    pub table: Option<String>,
    /// Declared type name as reported by the engine.
    pub column_type: String,
}

/// Exclusive, single-consumer stream of disaggregated rows behind one cell.
pub trait RowStream {
    /// Pulls the next row, or `None` once the stream is drained.
    fn try_next(&mut self) -> Result<Option<Vec<CellValue>>>;
    /// Column metadata for the rows this stream yields.
    fn column_metadata(&self) -> Result<Vec<ColumnMeta>>;
    /// Releases the underlying resource. Called exactly once by the
    /// consuming cursor.
    fn close(&mut self) -> Result<()>;
}

/// One addressed cell of a cellset.
pub trait Cell {
    /// The raw typed value.
    fn raw_value(&self) -> CellValue;
    /// The engine's display-formatted rendering.
    fn formatted_value(&self) -> String;
    /// Opens the row-level disaggregation behind this cell, or `None` when
    /// the cell does not support drill-through.
    fn open_row_stream(&self, max_rows: Option<u64>) -> Result<Option<Box<dyn RowStream>>> {
        let _ = max_rows;
        Ok(None)
    }
}

/// Fixed-shape N-axis cellset handle returned by query execution.
pub trait CellSet {
    /// Number of axes, fixed for the lifetime of the handle.
    fn axis_count(&self) -> usize;
    /// Ordered positions along one axis.
    fn positions(&self, axis: usize) -> Result<Vec<Position>>;
    /// The cell addressed by one zero-based ordinal per axis.
    fn cell(&self, coords: &[usize]) -> Result<Box<dyn Cell>>;
}

/// Executes rendered query text against the engine.
pub trait QueryEngine {
    /// Runs the query and returns the resulting cellset handle.
    fn execute(&self, mdx: &str) -> Result<Box<dyn CellSet>>;
}

/// Resolves member identifiers to member handles.
pub trait MemberResolver {
    /// Looks up the member at `segments` within `source_name`, or `None`
    /// when no such member exists.
    fn resolve(&self, source_name: &str, segments: &[String]) -> Result<Option<Arc<dyn Member>>>;
}
