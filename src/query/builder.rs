//! Fluent query builder.
//!
//! A [`QueryBuilder`] is bound to one fact source and mutated through
//! chaining calls. Structural operators (`crossjoin`, `hierarchize`,
//! `order`, the extremes family) act on the most recently targeted slot,
//! which is either an axis or a WITH-set body. Misuse surfaces as a
//! [`AxialError::Usage`] at the violating call, so chains compose with `?`.
//!
//! ```
//! use axial::query::QueryBuilder;
//!
//! let mut q = QueryBuilder::new("[Sales]");
//! q.columns(["[Measures].[Unit Sales]"])?;
//! q.rows(["[Product].children"])?.crossjoin(["[Time].[2024]"])?;
//! q.r#where(["[Customer].[USA]"]);
//! let mdx = q.to_mdx();
//! # assert!(mdx.starts_with("SELECT"));
//! # Ok::<(), axial::AxialError>(())
//! ```

use std::mem;

use crate::cellset::cursor::CellSetCursor;
use crate::cellset::QueryEngine;
use crate::query::ast::{
    ExtremesKind, HierarchizeMode, KeySpec, Literal, OrderDirection, SetExpr, Threshold, WithDef,
};
use crate::query::render;
use crate::types::{AxialError, Result};

/// The slot structural operators currently target.
#[derive(Clone, Copy, Debug)]
enum Slot {
    Axis(usize),
    WithSet(usize),
}

/// Mutable accumulator of axes, slicer conditions, and WITH definitions.
///
/// Created empty and bound to a source name; consumed read-only by the
/// serializer. Ordinary mutable state: not for concurrent mutation.
#[derive(Debug)]
pub struct QueryBuilder {
    pub(crate) source_name: String,
    pub(crate) axes: Vec<Option<SetExpr>>,
    pub(crate) where_conditions: Vec<String>,
    pub(crate) with_defs: Vec<WithDef>,
    current: Option<Slot>,
    filter_alias_seq: usize,
}

impl QueryBuilder {
    /// Creates an empty builder bound to the given fact source.
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            axes: Vec::new(),
            where_conditions: Vec::new(),
            with_defs: Vec::new(),
            current: None,
            filter_alias_seq: 0,
        }
    }

    /// The fact source this query runs against.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Current expression on axis `index`, if the axis has been started.
    pub fn axis_expr(&self, index: usize) -> Option<&SetExpr> {
        self.axes.get(index).and_then(Option::as_ref)
    }

    /// Slicer conditions accumulated so far.
    pub fn where_conditions(&self) -> &[String] {
        &self.where_conditions
    }

    /// WITH definitions in declaration order.
    pub fn with_defs(&self) -> &[WithDef] {
        &self.with_defs
    }

    /// Places members on axis `index`, or appends to its still-flat member
    /// list. Appending after a structural operator is a usage error.
    pub fn axis<I, S>(&mut self, index: usize, members: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members = collect_members(members, "axis")?;
        if self.axes.len() <= index {
            self.axes.resize_with(index + 1, || None);
        }
        match &mut self.axes[index] {
            slot @ None => *slot = Some(SetExpr::Members(members)),
            Some(SetExpr::Members(existing)) => existing.extend(members),
            Some(_) => {
                return Err(AxialError::usage(format!(
                    "axis {index} already holds a structured set; members append only to a flat list"
                )))
            }
        }
        self.current = Some(Slot::Axis(index));
        Ok(self)
    }

    /// Places members on the columns axis.
    pub fn columns<I, S>(&mut self, members: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.axis(0, members)
    }

    /// Places members on the rows axis.
    pub fn rows<I, S>(&mut self, members: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.axis(1, members)
    }

    /// Places members on the pages axis.
    pub fn pages<I, S>(&mut self, members: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.axis(2, members)
    }

    /// Places members on the sections axis.
    pub fn sections<I, S>(&mut self, members: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.axis(3, members)
    }

    /// Places members on the chapters axis.
    pub fn chapters<I, S>(&mut self, members: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.axis(4, members)
    }

    /// Cross-joins the current slot with a further member list. Operands
    /// keep flattening into one join node across repeated calls.
    pub fn crossjoin<I, S>(&mut self, members: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crossjoin_inner(members, false, "crossjoin")
    }

    /// Like [`crossjoin`](Self::crossjoin) but the resulting join eliminates
    /// empty tuples.
    pub fn nonempty_crossjoin<I, S>(&mut self, members: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crossjoin_inner(members, true, "nonempty_crossjoin")
    }

    fn crossjoin_inner<I, S>(
        &mut self,
        members: I,
        nonempty: bool,
        op: &'static str,
    ) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members = collect_members(members, op)?;
        let expr = self.current_expr_mut(op)?;
        match expr {
            SetExpr::CrossJoin {
                operands,
                nonempty: flag,
            } => {
                operands.push(SetExpr::Members(members));
                *flag = nonempty;
            }
            other => wrap(other, |current| SetExpr::CrossJoin {
                operands: vec![current, SetExpr::Members(members)],
                nonempty,
            }),
        }
        Ok(self)
    }

    /// Prefixes the whole slot expression with the empty-tuple filter.
    /// Applying it twice is a no-op.
    pub fn nonempty(&mut self) -> Result<&mut Self> {
        let expr = self.current_expr_mut("nonempty")?;
        if !matches!(expr, SetExpr::NonEmpty(_)) {
            wrap(expr, |current| SetExpr::NonEmpty(Box::new(current)));
        }
        Ok(self)
    }

    /// Hierarchizes the most recently added cross-join operand, or the whole
    /// expression when the slot holds no cross-join.
    pub fn hierarchize(&mut self) -> Result<&mut Self> {
        self.hierarchize_inner(HierarchizeMode::Default, false, "hierarchize")
    }

    /// [`hierarchize`](Self::hierarchize) in post-order.
    pub fn hierarchize_post(&mut self) -> Result<&mut Self> {
        self.hierarchize_inner(HierarchizeMode::Post, false, "hierarchize_post")
    }

    /// Hierarchizes the entire slot expression, cross-join included.
    pub fn hierarchize_all(&mut self) -> Result<&mut Self> {
        self.hierarchize_inner(HierarchizeMode::Default, true, "hierarchize_all")
    }

    /// [`hierarchize_all`](Self::hierarchize_all) in post-order.
    pub fn hierarchize_all_post(&mut self) -> Result<&mut Self> {
        self.hierarchize_inner(HierarchizeMode::Post, true, "hierarchize_all_post")
    }

    fn hierarchize_inner(
        &mut self,
        mode: HierarchizeMode,
        whole: bool,
        op: &'static str,
    ) -> Result<&mut Self> {
        let expr = self.current_expr_mut(op)?;
        let target = last_operand_or_whole(expr, whole);
        wrap(target, |current| SetExpr::Hierarchize {
            operand: Box::new(current),
            mode,
        });
        Ok(self)
    }

    /// Subtracts members from the most recently added cross-join operand,
    /// or from the whole expression when the slot holds no cross-join.
    pub fn except<I, S>(&mut self, members: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members = collect_members(members, "except")?;
        let expr = self.current_expr_mut("except")?;
        let target = last_operand_or_whole(expr, false);
        wrap(target, |current| SetExpr::Except {
            left: Box::new(current),
            right: Box::new(SetExpr::Members(members)),
        });
        Ok(self)
    }

    /// Filters the whole slot expression by a boolean condition.
    pub fn filter(&mut self, condition: impl Into<String>) -> Result<&mut Self> {
        self.filter_inner(condition.into(), None)
    }

    /// Filters with a named alias for the current-iteration member. The
    /// caller keeps `condition` and `alias` in agreement.
    pub fn filter_as(
        &mut self,
        condition: impl Into<String>,
        alias: impl Into<String>,
    ) -> Result<&mut Self> {
        self.filter_inner(condition.into(), Some(alias.into()))
    }

    /// Drops tuples whose current member is empty, using a generated alias.
    pub fn filter_nonempty(&mut self) -> Result<&mut Self> {
        self.filter_alias_seq += 1;
        let alias = format!("S{}", self.filter_alias_seq);
        let condition = format!("NOT ISEMPTY({alias}.CURRENT)");
        self.filter_inner(condition, Some(alias))
    }

    fn filter_inner(&mut self, condition: String, alias: Option<String>) -> Result<&mut Self> {
        let expr = self.current_expr_mut("filter")?;
        wrap(expr, |current| SetExpr::Filter {
            operand: Box::new(current),
            condition,
            alias,
        });
        Ok(self)
    }

    /// Sorts the whole slot expression by a key expression or tuple.
    pub fn order(
        &mut self,
        key: impl Into<KeySpec>,
        direction: OrderDirection,
    ) -> Result<&mut Self> {
        let key = key.into();
        let expr = self.current_expr_mut("order")?;
        wrap(expr, |current| SetExpr::Order {
            operand: Box::new(current),
            key,
            direction,
        });
        Ok(self)
    }

    /// Keeps the first `count` members in natural rank order.
    pub fn top_count(&mut self, count: u64) -> Result<&mut Self> {
        self.extremes(ExtremesKind::TopCount, Threshold::Count(count), None, "top_count")
    }

    /// Keeps the first `count` members ranked by `measure`.
    pub fn top_count_by(&mut self, count: u64, measure: impl Into<KeySpec>) -> Result<&mut Self> {
        self.extremes(
            ExtremesKind::TopCount,
            Threshold::Count(count),
            Some(measure.into()),
            "top_count_by",
        )
    }

    /// Keeps the last `count` members in natural rank order.
    pub fn bottom_count(&mut self, count: u64) -> Result<&mut Self> {
        self.extremes(
            ExtremesKind::BottomCount,
            Threshold::Count(count),
            None,
            "bottom_count",
        )
    }

    /// Keeps the last `count` members ranked by `measure`.
    pub fn bottom_count_by(
        &mut self,
        count: u64,
        measure: impl Into<KeySpec>,
    ) -> Result<&mut Self> {
        self.extremes(
            ExtremesKind::BottomCount,
            Threshold::Count(count),
            Some(measure.into()),
            "bottom_count_by",
        )
    }

    /// Keeps leading members covering `percent` of the total.
    pub fn top_percent(&mut self, percent: f64) -> Result<&mut Self> {
        self.extremes(
            ExtremesKind::TopPercent,
            Threshold::Value(percent),
            None,
            "top_percent",
        )
    }

    /// Keeps leading members covering `percent` of the total of `measure`.
    pub fn top_percent_by(
        &mut self,
        percent: f64,
        measure: impl Into<KeySpec>,
    ) -> Result<&mut Self> {
        self.extremes(
            ExtremesKind::TopPercent,
            Threshold::Value(percent),
            Some(measure.into()),
            "top_percent_by",
        )
    }

    /// Keeps trailing members covering `percent` of the total.
    pub fn bottom_percent(&mut self, percent: f64) -> Result<&mut Self> {
        self.extremes(
            ExtremesKind::BottomPercent,
            Threshold::Value(percent),
            None,
            "bottom_percent",
        )
    }

    /// Keeps trailing members covering `percent` of the total of `measure`.
    pub fn bottom_percent_by(
        &mut self,
        percent: f64,
        measure: impl Into<KeySpec>,
    ) -> Result<&mut Self> {
        self.extremes(
            ExtremesKind::BottomPercent,
            Threshold::Value(percent),
            Some(measure.into()),
            "bottom_percent_by",
        )
    }

    /// Keeps leading members until their running sum reaches `total`.
    pub fn top_sum(&mut self, total: f64) -> Result<&mut Self> {
        self.extremes(ExtremesKind::TopSum, Threshold::Value(total), None, "top_sum")
    }

    /// Keeps leading members until the running sum of `measure` reaches `total`.
    pub fn top_sum_by(&mut self, total: f64, measure: impl Into<KeySpec>) -> Result<&mut Self> {
        self.extremes(
            ExtremesKind::TopSum,
            Threshold::Value(total),
            Some(measure.into()),
            "top_sum_by",
        )
    }

    /// Keeps trailing members until their running sum reaches `total`.
    pub fn bottom_sum(&mut self, total: f64) -> Result<&mut Self> {
        self.extremes(
            ExtremesKind::BottomSum,
            Threshold::Value(total),
            None,
            "bottom_sum",
        )
    }

    /// Keeps trailing members until the running sum of `measure` reaches `total`.
    pub fn bottom_sum_by(&mut self, total: f64, measure: impl Into<KeySpec>) -> Result<&mut Self> {
        self.extremes(
            ExtremesKind::BottomSum,
            Threshold::Value(total),
            Some(measure.into()),
            "bottom_sum_by",
        )
    }

    fn extremes(
        &mut self,
        kind: ExtremesKind,
        threshold: Threshold,
        measure: Option<KeySpec>,
        op: &'static str,
    ) -> Result<&mut Self> {
        let expr = self.current_expr_mut(op)?;
        wrap(expr, |current| SetExpr::Extremes {
            operand: Box::new(current),
            kind,
            threshold,
            measure,
        });
        Ok(self)
    }

    /// Appends slicer conditions, combined into the single WHERE clause.
    pub fn r#where<I, S>(&mut self, conditions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.where_conditions
            .extend(conditions.into_iter().map(Into::into));
        self
    }

    /// Starts a calculated-member definition; attach it with
    /// [`MemberDef::r#as`].
    pub fn with_member(&mut self, name: impl Into<String>) -> MemberDef<'_> {
        MemberDef {
            builder: self,
            name: name.into(),
        }
    }

    /// Starts a named-set definition; attach it with [`SetDef::r#as`]. The
    /// attached set then accepts the same structural chaining as an axis.
    pub fn with_set(&mut self, name: impl Into<String>) -> SetDef<'_> {
        SetDef {
            builder: self,
            name: name.into(),
        }
    }

    /// Renders the accumulated query to MDX text. Pure with respect to the
    /// builder state: identical call sequences yield identical text.
    pub fn to_mdx(&self) -> String {
        render::render_query(self)
    }

    /// Renders the query, hands it to the execution collaborator, and wraps
    /// the returned cellset in a cursor.
    pub fn execute(&self, engine: &dyn QueryEngine) -> Result<CellSetCursor> {
        let mdx = self.to_mdx();
        let cellset = engine.execute(&mdx)?;
        Ok(CellSetCursor::new(cellset))
    }

    fn current_expr_mut(&mut self, op: &'static str) -> Result<&mut SetExpr> {
        let missing =
            || AxialError::usage(format!("cannot {op} before an axis or set is started"));
        match self.current {
            Some(Slot::Axis(index)) => self
                .axes
                .get_mut(index)
                .and_then(Option::as_mut)
                .ok_or_else(missing),
            Some(Slot::WithSet(index)) => match self.with_defs.get_mut(index) {
                Some(WithDef::Set { expr, .. }) => Ok(expr),
                _ => Err(missing()),
            },
            None => Err(missing()),
        }
    }
}

/// Rewrites `expr` in place through `f`.
fn wrap(expr: &mut SetExpr, f: impl FnOnce(SetExpr) -> SetExpr) {
    let current = mem::replace(expr, SetExpr::Members(Vec::new()));
    *expr = f(current);
}

/// The slot node hierarchize/except operate on: the last cross-join operand
/// when one exists, otherwise the whole expression. This asymmetry is
/// deliberate and must not be generalized.
fn last_operand_or_whole(expr: &mut SetExpr, whole: bool) -> &mut SetExpr {
    let use_last = matches!(
        &*expr,
        SetExpr::CrossJoin { operands, .. } if !whole && !operands.is_empty()
    );
    if use_last {
        if let SetExpr::CrossJoin { operands, .. } = expr {
            let last = operands.len() - 1;
            return &mut operands[last];
        }
        unreachable!()
    }
    expr
}

fn collect_members<I, S>(members: I, op: &'static str) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let members: Vec<String> = members.into_iter().map(Into::into).collect();
    if members.is_empty() {
        return Err(AxialError::usage(format!(
            "{op} requires at least one member"
        )));
    }
    Ok(members)
}

/// Pending calculated-member definition. The definition only reaches the
/// WITH list through [`MemberDef::r#as`], so a member without its formula
/// cannot exist.
pub struct MemberDef<'a> {
    builder: &'a mut QueryBuilder,
    name: String,
}

impl<'a> MemberDef<'a> {
    /// Attaches the mandatory formula and appends the definition.
    pub fn r#as(self, formula: impl Into<String>) -> MemberOptions<'a> {
        let index = self.builder.with_defs.len();
        self.builder.with_defs.push(WithDef::Member {
            name: self.name,
            formula: formula.into(),
            options: Vec::new(),
        });
        MemberOptions {
            builder: self.builder,
            index,
        }
    }
}

/// Appends trailing `KEY = value` clauses to the member definition just
/// attached.
pub struct MemberOptions<'a> {
    builder: &'a mut QueryBuilder,
    index: usize,
}

impl<'a> MemberOptions<'a> {
    /// Adds one trailing option clause.
    pub fn option(self, key: impl Into<String>, value: impl Into<Literal>) -> Self {
        if let Some(WithDef::Member { options, .. }) = self.builder.with_defs.get_mut(self.index) {
            options.push((key.into(), value.into()));
        }
        self
    }

    /// Hands the underlying builder back for further chaining.
    pub fn builder(self) -> &'a mut QueryBuilder {
        self.builder
    }
}

/// Pending named-set definition. Attachment requires the mandatory body via
/// [`SetDef::r#as`].
pub struct SetDef<'a> {
    builder: &'a mut QueryBuilder,
    name: String,
}

impl<'a> SetDef<'a> {
    /// Attaches the set body and makes this definition the target of
    /// subsequent structural calls.
    pub fn r#as(self, seed: impl Into<SetSeed>) -> Result<&'a mut QueryBuilder> {
        let expr = match seed.into() {
            SetSeed::Members(members) => {
                if members.is_empty() {
                    return Err(AxialError::usage(format!(
                        "with_set '{}' requires a nonempty body",
                        self.name
                    )));
                }
                SetExpr::Members(members)
            }
            SetSeed::Expr(expr) => expr,
        };
        let index = self.builder.with_defs.len();
        self.builder.with_defs.push(WithDef::Set {
            name: self.name,
            expr,
        });
        self.builder.current = Some(Slot::WithSet(index));
        Ok(self.builder)
    }
}

/// Accepted bodies for a named-set definition.
pub enum SetSeed {
    /// One or more member identifiers.
    Members(Vec<String>),
    /// A prebuilt set expression.
    Expr(SetExpr),
}

impl From<&str> for SetSeed {
    fn from(member: &str) -> Self {
        SetSeed::Members(vec![member.to_owned()])
    }
}

impl From<String> for SetSeed {
    fn from(member: String) -> Self {
        SetSeed::Members(vec![member])
    }
}

impl From<Vec<String>> for SetSeed {
    fn from(members: Vec<String>) -> Self {
        SetSeed::Members(members)
    }
}

impl From<Vec<&str>> for SetSeed {
    fn from(members: Vec<&str>) -> Self {
        SetSeed::Members(members.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for SetSeed {
    fn from(members: [&str; N]) -> Self {
        SetSeed::Members(members.iter().map(|m| (*m).to_owned()).collect())
    }
}

impl From<SetExpr> for SetSeed {
    fn from(expr: SetExpr) -> Self {
        SetSeed::Expr(expr)
    }
}
