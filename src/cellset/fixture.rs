//! Simple in-memory cellset used for tests or prototyping.
//!
//! [`GridCellSet`] holds a dense axis layout with a sparse cell map, built
//! through chaining `with_*` calls. Drill-through streams count their
//! closes so resource-release behavior stays observable from tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::cellset::{Cell, CellSet, ColumnMeta, Member, MemberResolver, Position, RowStream};
use crate::query::value::CellValue;
use crate::types::{AxialError, Result};

/// In-memory member handle.
#[derive(Clone, Debug)]
pub struct GridMember {
    full_name: String,
    name: String,
    caption: String,
    depth: u32,
    calculated: bool,
    children: Vec<Arc<GridMember>>,
}

impl GridMember {
    /// Creates a member from its fully qualified name; the short name and
    /// caption default to the last bracketed segment.
    pub fn new(full_name: impl Into<String>) -> Self {
        let full_name = full_name.into();
        let name = leaf_segment(&full_name);
        Self {
            caption: name.clone(),
            name,
            full_name,
            depth: 0,
            calculated: false,
            children: Vec::new(),
        }
    }

    /// Overrides the display caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Sets the hierarchy depth.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Marks the member as calculated.
    pub fn with_calculated(mut self, calculated: bool) -> Self {
        self.calculated = calculated;
        self
    }

    /// Attaches child members in hierarchy order.
    pub fn with_children(mut self, children: Vec<GridMember>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }
}

/// Last bracketed segment of a qualified name, e.g. `Q1` for
/// `[Time].[2024].[Q1]`. Unbracketed names pass through whole.
fn leaf_segment(full_name: &str) -> String {
    full_name
        .rsplit('.')
        .next()
        .unwrap_or(full_name)
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_owned()
}

impl Member for GridMember {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn full_name(&self) -> String {
        self.full_name.clone()
    }

    fn caption(&self) -> String {
        self.caption.clone()
    }

    fn depth(&self) -> u32 {
        self.depth
    }

    fn is_calculated(&self) -> bool {
        self.calculated
    }

    fn children(&self) -> Vec<Arc<dyn Member>> {
        self.children
            .iter()
            .map(|child| Arc::clone(child) as Arc<dyn Member>)
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
struct GridCell {
    value: CellValue,
    formatted: Option<String>,
    drill: Option<DrillRows>,
}

#[derive(Clone, Debug)]
struct DrillRows {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<CellValue>>,
}

/// In-memory cellset built through chaining `with_*` calls.
#[derive(Default)]
pub struct GridCellSet {
    axes: Vec<Vec<Position>>,
    cells: FxHashMap<Vec<usize>, GridCell>,
    closes: Arc<AtomicUsize>,
}

impl GridCellSet {
    /// Creates an empty cellset with no axes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an axis whose positions each hold a single member.
    pub fn with_axis<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let positions = members
            .into_iter()
            .map(|m| vec![Arc::new(GridMember::new(m)) as Arc<dyn Member>])
            .collect();
        self.axes.push(positions);
        self
    }

    /// Appends an axis of multi-member tuple positions.
    pub fn with_tuple_axis<I, P, S>(mut self, positions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let positions = positions
            .into_iter()
            .map(|tuple| {
                tuple
                    .into_iter()
                    .map(|m| Arc::new(GridMember::new(m)) as Arc<dyn Member>)
                    .collect()
            })
            .collect();
        self.axes.push(positions);
        self
    }

    /// Appends an axis of prebuilt members, one per position.
    pub fn with_member_axis(mut self, members: Vec<GridMember>) -> Self {
        let positions = members
            .into_iter()
            .map(|m| vec![Arc::new(m) as Arc<dyn Member>])
            .collect();
        self.axes.push(positions);
        self
    }

    /// Sets the value of one cell.
    pub fn with_cell(mut self, coords: &[usize], value: impl Into<CellValue>) -> Self {
        self.cell_entry(coords).value = value.into();
        self
    }

    /// Sets the value and display formatting of one cell.
    pub fn with_formatted_cell(
        mut self,
        coords: &[usize],
        value: impl Into<CellValue>,
        formatted: impl Into<String>,
    ) -> Self {
        let cell = self.cell_entry(coords);
        cell.value = value.into();
        cell.formatted = Some(formatted.into());
        self
    }

    /// Attaches drill-through rows behind one cell.
    pub fn with_drill_rows(
        mut self,
        coords: &[usize],
        columns: Vec<ColumnMeta>,
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        self.cell_entry(coords).drill = Some(DrillRows { columns, rows });
        self
    }

    /// Shared counter of row-stream closes, for asserting release behavior.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    fn cell_entry(&mut self, coords: &[usize]) -> &mut GridCell {
        self.cells.entry(coords.to_vec()).or_default()
    }
}

impl CellSet for GridCellSet {
    fn axis_count(&self) -> usize {
        self.axes.len()
    }

    fn positions(&self, axis: usize) -> Result<Vec<Position>> {
        self.axes
            .get(axis)
            .cloned()
            .ok_or(AxialError::AxisOutOfRange {
                axis,
                count: self.axes.len(),
            })
    }

    fn cell(&self, coords: &[usize]) -> Result<Box<dyn Cell>> {
        let cell = self.cells.get(coords).cloned().unwrap_or_default();
        Ok(Box::new(GridCellHandle {
            cell,
            closes: Arc::clone(&self.closes),
        }))
    }
}

struct GridCellHandle {
    cell: GridCell,
    closes: Arc<AtomicUsize>,
}

impl Cell for GridCellHandle {
    fn raw_value(&self) -> CellValue {
        self.cell.value.clone()
    }

    fn formatted_value(&self) -> String {
        match &self.cell.formatted {
            Some(formatted) => formatted.clone(),
            None => default_format(&self.cell.value),
        }
    }

    fn open_row_stream(&self, max_rows: Option<u64>) -> Result<Option<Box<dyn RowStream>>> {
        let Some(drill) = &self.cell.drill else {
            return Ok(None);
        };
        let mut rows = drill.rows.clone();
        if let Some(max) = max_rows {
            rows.truncate(max as usize);
        }
        Ok(Some(Box::new(GridRowStream {
            columns: drill.columns.clone(),
            rows: rows.into(),
            closed: false,
            closes: Arc::clone(&self.closes),
        })))
    }
}

fn default_format(value: &CellValue) -> String {
    match value {
        CellValue::Null => String::new(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Int(i) => i.to_string(),
        CellValue::Decimal(d) => d.to_string(),
        CellValue::Float(f) => f.to_string(),
        CellValue::String(s) => s.clone(),
    }
}

/// Row stream over fixture drill rows, counting closes.
pub struct GridRowStream {
    columns: Vec<ColumnMeta>,
    rows: VecDeque<Vec<CellValue>>,
    closed: bool,
    closes: Arc<AtomicUsize>,
}

impl RowStream for GridRowStream {
    fn try_next(&mut self) -> Result<Option<Vec<CellValue>>> {
        Ok(self.rows.pop_front())
    }

    fn column_metadata(&self) -> Result<Vec<ColumnMeta>> {
        Ok(self.columns.clone())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// In-memory member catalog, the lookup-side counterpart of [`GridCellSet`].
#[derive(Default)]
pub struct GridCatalog {
    members: FxHashMap<(String, String), Arc<GridMember>>,
}

impl GridCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a member under a source name, keyed by its fully
    /// qualified name.
    pub fn with_member(mut self, source_name: impl Into<String>, member: GridMember) -> Self {
        self.members.insert(
            (source_name.into(), member.full_name.clone()),
            Arc::new(member),
        );
        self
    }
}

impl MemberResolver for GridCatalog {
    fn resolve(&self, source_name: &str, segments: &[String]) -> Result<Option<Arc<dyn Member>>> {
        let key = (source_name.to_owned(), qualified_name(segments));
        Ok(self
            .members
            .get(&key)
            .map(|member| Arc::clone(member) as Arc<dyn Member>))
    }
}

/// Joins unbracketed segments into a fully qualified name, e.g.
/// `["Time", "Q1"]` into `[Time].[Q1]`.
fn qualified_name(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| format!("[{segment}]"))
        .collect::<Vec<_>>()
        .join(".")
}

/// Builds a [`ColumnMeta`] in one call, for terse fixture setup.
pub fn column(name: &str, column_type: &str) -> ColumnMeta {
    ColumnMeta {
        name: name.to_owned(),
        label: name.to_owned(),
        table: None,
        column_type: column_type.to_owned(),
    }
}
