#![forbid(unsafe_code)]

//! Query construction: set-expression trees, the fluent builder, and the
//! text serializer.
//!
//! The builder accumulates one [`ast::SetExpr`] per axis (plus slicer
//! conditions and WITH-clause definitions) and renders the whole query
//! through [`render`]. Rendering is pure: the same tree always produces
//! the same text.

/// Tagged set-expression tree and supporting query vocabulary.
pub mod ast;

/// Fluent builder for axes, slicers, and WITH-clause definitions.
pub mod builder;

/// Pure serialization of set expressions and whole queries to MDX text.
pub mod render;

/// Scalar cell value model shared with the cellset layer.
pub mod value;

pub use builder::QueryBuilder;
