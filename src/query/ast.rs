//! Set-expression tree underlying every axis, slicer, and WITH definition.
//!
//! The structures here are built exclusively through the fluent
//! [`QueryBuilder`](crate::query::builder::QueryBuilder) mutators, which keeps
//! every tree fully formed: member lists are nonempty, cross-joins hold at
//! least two operands, and no placeholder nodes exist.

/// Hierarchical reordering mode for `HIERARCHIZE`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HierarchizeMode {
    /// Natural hierarchy order.
    Default,
    /// Post-order (children before parents).
    Post,
}

/// Sort direction tokens accepted by `ORDER`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderDirection {
    /// Ascending within hierarchy.
    Asc,
    /// Descending within hierarchy.
    Desc,
    /// Ascending, breaking hierarchy.
    BAsc,
    /// Descending, breaking hierarchy.
    BDesc,
}

impl OrderDirection {
    /// The uppercase token emitted into query text.
    pub fn token(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
            OrderDirection::BAsc => "BASC",
            OrderDirection::BDesc => "BDESC",
        }
    }
}

/// Extreme-member selection functions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExtremesKind {
    /// First N members by rank.
    TopCount,
    /// Last N members by rank.
    BottomCount,
    /// Leading members covering N percent of the total.
    TopPercent,
    /// Trailing members covering N percent of the total.
    BottomPercent,
    /// Leading members whose running sum reaches N.
    TopSum,
    /// Trailing members whose running sum reaches N.
    BottomSum,
}

impl ExtremesKind {
    /// The function name emitted into query text.
    pub fn token(self) -> &'static str {
        match self {
            ExtremesKind::TopCount => "TOPCOUNT",
            ExtremesKind::BottomCount => "BOTTOMCOUNT",
            ExtremesKind::TopPercent => "TOPPERCENT",
            ExtremesKind::BottomPercent => "BOTTOMPERCENT",
            ExtremesKind::TopSum => "TOPSUM",
            ExtremesKind::BottomSum => "BOTTOMSUM",
        }
    }
}

/// Numeric threshold for an extremes selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Threshold {
    /// Whole-member count (`TOPCOUNT` and friends).
    Count(u64),
    /// Percent or running-sum target.
    Value(f64),
}

/// A scalar sort key or ranking expression: a single expression, or an
/// ordered tuple rendered in parentheses.
#[derive(Clone, Debug, PartialEq)]
pub enum KeySpec {
    /// One scalar expression, rendered bare.
    Expr(String),
    /// Ordered expressions, parenthesized as a tuple when more than one.
    Tuple(Vec<String>),
}

impl From<&str> for KeySpec {
    fn from(expr: &str) -> Self {
        KeySpec::Expr(expr.to_owned())
    }
}

impl From<String> for KeySpec {
    fn from(expr: String) -> Self {
        KeySpec::Expr(expr)
    }
}

impl From<Vec<String>> for KeySpec {
    fn from(exprs: Vec<String>) -> Self {
        KeySpec::Tuple(exprs)
    }
}

impl From<Vec<&str>> for KeySpec {
    fn from(exprs: Vec<&str>) -> Self {
        KeySpec::Tuple(exprs.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for KeySpec {
    fn from(exprs: [&str; N]) -> Self {
        KeySpec::Tuple(exprs.iter().map(|e| (*e).to_owned()).collect())
    }
}

/// Tagged set of members or tuples, the operand of every axis, filter, and
/// WITH-set definition.
#[derive(Clone, Debug, PartialEq)]
pub enum SetExpr {
    /// Explicit member or tuple list. Singletons render bare, longer lists
    /// render brace-delimited.
    Members(Vec<String>),
    /// Two or more operands combined pairwise left-to-right. The list is
    /// kept flat: repeated cross-join calls append operands instead of
    /// nesting join nodes.
    CrossJoin {
        /// Join operands in application order.
        operands: Vec<SetExpr>,
        /// Use the empty-tuple-eliminating join variant.
        nonempty: bool,
    },
    /// Empty-tuple filter prefix, legal only as the outermost node of an
    /// axis expression.
    NonEmpty(Box<SetExpr>),
    /// Hierarchical reordering call.
    Hierarchize {
        /// Set being reordered.
        operand: Box<SetExpr>,
        /// Natural or post-order.
        mode: HierarchizeMode,
    },
    /// Set difference: `left` minus `right`.
    Except {
        /// Set to subtract from.
        left: Box<SetExpr>,
        /// Members removed from `left`.
        right: Box<SetExpr>,
    },
    /// Boolean-condition filter.
    Filter {
        /// Set being filtered.
        operand: Box<SetExpr>,
        /// Condition text, emitted verbatim.
        condition: String,
        /// Optional alias for the current-iteration member referenced
        /// inside `condition`.
        alias: Option<String>,
    },
    /// Sort by one or more scalar expressions.
    Order {
        /// Set being sorted.
        operand: Box<SetExpr>,
        /// Sort key expression or tuple.
        key: KeySpec,
        /// Direction token.
        direction: OrderDirection,
    },
    /// Extreme-member selection by count, percent, or running sum.
    Extremes {
        /// Set being ranked.
        operand: Box<SetExpr>,
        /// Which selection function.
        kind: ExtremesKind,
        /// Numeric threshold.
        threshold: Threshold,
        /// Optional ranking expression.
        measure: Option<KeySpec>,
    },
}

impl SetExpr {
    /// Renders this set expression alone, without any surrounding query.
    pub fn to_mdx(&self) -> String {
        crate::query::render::render_set(self)
    }

    /// True once any structural operator has been applied, i.e. the
    /// expression is no longer a flat member list.
    pub(crate) fn is_structured(&self) -> bool {
        !matches!(self, SetExpr::Members(_))
    }
}

/// Literal values accepted as trailing WITH-member option clauses.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// Emitted as `NULL`.
    Null,
    /// Emitted as `TRUE` / `FALSE`.
    Bool(bool),
    /// Emitted in literal form.
    Int(i64),
    /// Emitted in literal form.
    Float(f64),
    /// Emitted single-quoted with embedded quotes doubled.
    String(String),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_owned())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value as i64)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

/// WITH-clause declaration, emitted in declaration order ahead of `SELECT`.
/// Order matters: later definitions may reference earlier ones.
#[derive(Clone, Debug, PartialEq)]
pub enum WithDef {
    /// Calculated member definition.
    Member {
        /// Fully qualified member name.
        name: String,
        /// Formula text, quoted on emission.
        formula: String,
        /// Trailing `KEY = value` clauses in declaration order.
        options: Vec<(String, Literal)>,
    },
    /// Named set definition.
    Set {
        /// Set name.
        name: String,
        /// The set body; accepts the same structural chaining as an axis.
        expr: SetExpr,
    },
}

/// Canonical alias for an axis index: indices 0 through 4 carry names,
/// higher indices are positional.
pub fn axis_token(index: usize) -> String {
    match index {
        0 => "COLUMNS".to_owned(),
        1 => "ROWS".to_owned(),
        2 => "PAGES".to_owned(),
        3 => "SECTIONS".to_owned(),
        4 => "CHAPTERS".to_owned(),
        n => format!("AXIS({n})"),
    }
}

/// Resolves a canonical axis name to its index, case-insensitively.
pub fn axis_index(name: &str) -> Option<usize> {
    match name.to_ascii_uppercase().as_str() {
        "COLUMNS" => Some(0),
        "ROWS" => Some(1),
        "PAGES" => Some(2),
        "SECTIONS" => Some(3),
        "CHAPTERS" => Some(4),
        _ => None,
    }
}
