//! Multidimensional query construction and cellset traversal.
//!
//! `axial` builds MDX-style query text through a fluent [`QueryBuilder`] and
//! walks the N-axis cellsets an external engine returns through a
//! [`CellSetCursor`]. The engine itself (connections, execution, member
//! catalogs) stays behind the collaborator traits in [`cellset`].

#![warn(missing_docs)]

pub mod cellset;
pub mod query;
pub mod types;

pub use cellset::cursor::{AxisRef, CellSetCursor, Nested, PositionView};
pub use cellset::drill::RowCursor;
pub use cellset::{
    Cell, CellSet, ColumnMeta, Member, MemberResolver, Position, QueryEngine, RowStream,
};
pub use query::ast::{
    ExtremesKind, HierarchizeMode, KeySpec, Literal, OrderDirection, SetExpr, Threshold, WithDef,
};
pub use query::builder::QueryBuilder;
pub use query::value::CellValue;
pub use types::{AxialError, Result};
