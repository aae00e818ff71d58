//! Multi-axis result cursor.
//!
//! [`CellSetCursor`] wraps a [`CellSet`] handle and exposes axis metadata
//! projection plus a nested-sequence view over cell values with a
//! configurable axis iteration order. Axis positions load lazily and cache
//! idempotently: concurrent metadata readers may race the first load, but
//! every initializer computes identical data, so the first stored value
//! simply wins.

use std::fmt;
use std::sync::{Arc, OnceLock};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::cellset::drill::RowCursor;
use crate::cellset::{Cell, CellSet, Member, Position};
use crate::query::ast::axis_index;
use crate::query::value::CellValue;
use crate::types::{AxialError, Result};

/// One axis position projected through a member accessor: a single value
/// when one hierarchy participates, an ordered tuple otherwise.
#[derive(Clone, Debug, PartialEq)]
pub enum PositionView<T> {
    /// Position with exactly one coordinating hierarchy.
    Single(T),
    /// Position spanning several hierarchies.
    Tuple(Vec<T>),
}

/// Reference to an axis by index or canonical name.
#[derive(Clone, Debug, PartialEq)]
pub enum AxisRef {
    /// Zero-based axis index.
    Index(usize),
    /// Canonical axis name (columns, rows, pages, sections, chapters).
    Name(String),
}

impl AxisRef {
    fn resolve(&self) -> Result<usize> {
        match self {
            AxisRef::Index(index) => Ok(*index),
            AxisRef::Name(name) => axis_index(name)
                .ok_or_else(|| AxialError::usage(format!("unknown axis name '{name}'"))),
        }
    }
}

impl From<usize> for AxisRef {
    fn from(index: usize) -> Self {
        AxisRef::Index(index)
    }
}

impl From<&str> for AxisRef {
    fn from(name: &str) -> Self {
        AxisRef::Name(name.to_owned())
    }
}

impl From<String> for AxisRef {
    fn from(name: String) -> Self {
        AxisRef::Name(name)
    }
}

/// Nested sequences produced by value traversal. Nesting depth equals the
/// axis count; leaves are projected cell values.
#[derive(Clone, Debug, PartialEq)]
pub enum Nested<T> {
    /// A single projected cell.
    Leaf(T),
    /// One sequence level, ordered by axis position.
    Seq(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// The sequence at this level, or `None` for a leaf.
    pub fn as_seq(&self) -> Option<&[Nested<T>]> {
        match self {
            Nested::Seq(items) => Some(items),
            Nested::Leaf(_) => None,
        }
    }

    /// The projected cell at this level, or `None` for a sequence.
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Nested::Leaf(value) => Some(value),
            Nested::Seq(_) => None,
        }
    }
}

/// Read cursor over a fixed-shape N-axis cellset.
pub struct CellSetCursor {
    cellset: Box<dyn CellSet>,
    axis_count: usize,
    positions: Vec<OnceLock<Arc<Vec<Position>>>>,
}

impl fmt::Debug for CellSetCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellSetCursor")
            .field("axis_count", &self.axis_count)
            .finish_non_exhaustive()
    }
}

impl CellSetCursor {
    /// Wraps a cellset handle; the axis count is fixed from this point on.
    pub fn new(cellset: Box<dyn CellSet>) -> Self {
        let axis_count = cellset.axis_count();
        Self {
            cellset,
            axis_count,
            positions: (0..axis_count).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Number of axes in the wrapped cellset.
    pub fn axis_count(&self) -> usize {
        self.axis_count
    }

    /// Ordered positions along one axis, loaded on first access.
    pub fn axis_positions(&self, axis: usize) -> Result<Arc<Vec<Position>>> {
        let slot = self
            .positions
            .get(axis)
            .ok_or(AxialError::AxisOutOfRange {
                axis,
                count: self.axis_count,
            })?;
        if let Some(cached) = slot.get() {
            return Ok(Arc::clone(cached));
        }
        let loaded = Arc::new(self.cellset.positions(axis)?);
        trace!(axis, positions = loaded.len(), "cellset.positions.load");
        let _ = slot.set(Arc::clone(&loaded));
        Ok(slot.get().map(Arc::clone).unwrap_or(loaded))
    }

    /// Positions projected as member handles.
    pub fn axis_members(&self, axis: usize) -> Result<Vec<PositionView<Arc<dyn Member>>>> {
        self.project(axis, Arc::clone)
    }

    /// Positions projected as short member names.
    pub fn axis_names(&self, axis: usize) -> Result<Vec<PositionView<String>>> {
        self.project(axis, |member| member.name())
    }

    /// Positions projected as fully qualified member names.
    pub fn axis_full_names(&self, axis: usize) -> Result<Vec<PositionView<String>>> {
        self.project(axis, |member| member.full_name())
    }

    /// Positions projected as display captions.
    pub fn axis_captions(&self, axis: usize) -> Result<Vec<PositionView<String>>> {
        self.project(axis, |member| member.caption())
    }

    /// Short names along the columns axis.
    pub fn column_names(&self) -> Result<Vec<PositionView<String>>> {
        self.axis_names(0)
    }

    /// Short names along the rows axis.
    pub fn row_names(&self) -> Result<Vec<PositionView<String>>> {
        self.axis_names(1)
    }

    /// Full names along the columns axis.
    pub fn column_full_names(&self) -> Result<Vec<PositionView<String>>> {
        self.axis_full_names(0)
    }

    /// Full names along the rows axis.
    pub fn row_full_names(&self) -> Result<Vec<PositionView<String>>> {
        self.axis_full_names(1)
    }

    /// Member handles along the columns axis.
    pub fn column_members(&self) -> Result<Vec<PositionView<Arc<dyn Member>>>> {
        self.axis_members(0)
    }

    /// Member handles along the rows axis.
    pub fn row_members(&self) -> Result<Vec<PositionView<Arc<dyn Member>>>> {
        self.axis_members(1)
    }

    fn project<T>(
        &self,
        axis: usize,
        f: impl Fn(&Arc<dyn Member>) -> T,
    ) -> Result<Vec<PositionView<T>>> {
        let positions = self.axis_positions(axis)?;
        Ok(positions
            .iter()
            .map(|position| match position.as_slice() {
                [single] => PositionView::Single(f(single)),
                many => PositionView::Tuple(many.iter().map(&f).collect()),
            })
            .collect())
    }

    /// Raw cell values as nested sequences in the default axis order:
    /// all axes descending, so the outermost level is the highest axis.
    pub fn values(&self) -> Result<Nested<CellValue>> {
        self.traverse(&self.default_order(), &|cell| cell.raw_value())
    }

    /// Raw cell values in an explicit axis order.
    pub fn values_ordered(&self, order: &[AxisRef]) -> Result<Nested<CellValue>> {
        self.traverse(&self.resolve_order(order)?, &|cell| cell.raw_value())
    }

    /// Display-formatted cell values in the default axis order.
    pub fn formatted_values(&self) -> Result<Nested<String>> {
        self.traverse(&self.default_order(), &|cell| cell.formatted_value())
    }

    /// Display-formatted cell values in an explicit axis order.
    pub fn formatted_values_ordered(&self, order: &[AxisRef]) -> Result<Nested<String>> {
        self.traverse(&self.resolve_order(order)?, &|cell| cell.formatted_value())
    }

    /// The raw value of one cell addressed by per-axis ordinals.
    pub fn cell_value(&self, coords: &[usize]) -> Result<CellValue> {
        self.validate_coords(coords)?;
        Ok(self.cellset.cell(coords)?.raw_value())
    }

    /// The display-formatted value of one cell.
    pub fn cell_formatted(&self, coords: &[usize]) -> Result<String> {
        self.validate_coords(coords)?;
        Ok(self.cellset.cell(coords)?.formatted_value())
    }

    /// Opens drill-through on one cell. A cell without row-level
    /// disaggregation yields an already-exhausted cursor, not an error.
    pub fn drill_through(&self, coords: &[usize], max_rows: Option<u64>) -> Result<RowCursor> {
        self.validate_coords(coords)?;
        let cell = self.cellset.cell(coords)?;
        let stream = cell.open_row_stream(max_rows)?;
        debug!(rows_available = stream.is_some(), "cellset.drill.open");
        Ok(RowCursor::new(stream))
    }

    fn default_order(&self) -> Vec<usize> {
        (0..self.axis_count).rev().collect()
    }

    fn resolve_order(&self, order: &[AxisRef]) -> Result<Vec<usize>> {
        if order.len() != self.axis_count {
            return Err(AxialError::usage(format!(
                "axis order names {} axes, cellset has {}",
                order.len(),
                self.axis_count
            )));
        }
        let mut resolved = Vec::with_capacity(order.len());
        let mut seen = vec![false; self.axis_count];
        for axis_ref in order {
            let axis = axis_ref.resolve()?;
            if axis >= self.axis_count {
                return Err(AxialError::AxisOutOfRange {
                    axis,
                    count: self.axis_count,
                });
            }
            if seen[axis] {
                return Err(AxialError::usage(format!(
                    "axis order repeats axis {axis}"
                )));
            }
            seen[axis] = true;
            resolved.push(axis);
        }
        Ok(resolved)
    }

    fn traverse<T>(&self, order: &[usize], project: &dyn Fn(&dyn Cell) -> T) -> Result<Nested<T>> {
        let mut coords: SmallVec<[usize; 4]> = SmallVec::from_elem(0, self.axis_count);
        self.descend(order, 0, &mut coords, project)
    }

    fn descend<T>(
        &self,
        order: &[usize],
        depth: usize,
        coords: &mut SmallVec<[usize; 4]>,
        project: &dyn Fn(&dyn Cell) -> T,
    ) -> Result<Nested<T>> {
        if depth == order.len() {
            let cell = self.cellset.cell(coords)?;
            return Ok(Nested::Leaf(project(cell.as_ref())));
        }
        let axis = order[depth];
        let positions = self.axis_positions(axis)?;
        let mut items = Vec::with_capacity(positions.len());
        for index in 0..positions.len() {
            coords[axis] = index;
            items.push(self.descend(order, depth + 1, coords, project)?);
        }
        Ok(Nested::Seq(items))
    }

    fn validate_coords(&self, coords: &[usize]) -> Result<()> {
        if coords.len() != self.axis_count {
            return Err(AxialError::ArityMismatch {
                got: coords.len(),
                expected: self.axis_count,
            });
        }
        for (axis, &index) in coords.iter().enumerate() {
            let len = self.axis_positions(axis)?.len();
            if index >= len {
                return Err(AxialError::PositionOutOfRange { axis, index, len });
            }
        }
        Ok(())
    }
}
