//! Pure serialization of set expressions and whole queries.
//!
//! Rendering is stateless and referentially transparent: the same tree
//! always produces the same text. Whitespace is incidental, but tokens and
//! punctuation are exact since the downstream engine parses the output.

use tracing::debug;

use crate::query::ast::{
    axis_token, HierarchizeMode, KeySpec, Literal, SetExpr, Threshold, WithDef,
};
use crate::query::builder::QueryBuilder;

/// Renders one set expression.
pub fn render_set(expr: &SetExpr) -> String {
    match expr {
        SetExpr::Members(members) => render_members(members),
        SetExpr::CrossJoin { operands, nonempty } => {
            let op = if *nonempty {
                "NONEMPTYCROSSJOIN"
            } else {
                "CROSSJOIN"
            };
            let mut rendered = operands.iter().map(render_set);
            // Left fold: OP(OP(a, b), c). A single operand degenerates to
            // the operand itself.
            match rendered.next() {
                None => String::new(),
                Some(first) => rendered.fold(first, |acc, next| format!("{op}({acc}, {next})")),
            }
        }
        SetExpr::NonEmpty(inner) => format!("NON EMPTY {}", render_set(inner)),
        SetExpr::Hierarchize { operand, mode } => match mode {
            HierarchizeMode::Default => format!("HIERARCHIZE({})", render_set(operand)),
            HierarchizeMode::Post => format!("HIERARCHIZE({}, POST)", render_set(operand)),
        },
        SetExpr::Except { left, right } => {
            // The subtrahend is always braced when it is a bare member list,
            // singleton included.
            let right = match right.as_ref() {
                SetExpr::Members(members) => render_braced(members),
                other => render_set(other),
            };
            format!("EXCEPT({}, {})", render_set(left), right)
        }
        SetExpr::Filter {
            operand,
            condition,
            alias,
        } => match alias {
            Some(alias) => format!("FILTER({} AS {alias}, {condition})", render_set(operand)),
            None => format!("FILTER({}, {condition})", render_set(operand)),
        },
        SetExpr::Order {
            operand,
            key,
            direction,
        } => format!(
            "ORDER({}, {}, {})",
            render_set(operand),
            render_key(key),
            direction.token()
        ),
        SetExpr::Extremes {
            operand,
            kind,
            threshold,
            measure,
        } => {
            let head = format!(
                "{}({}, {}",
                kind.token(),
                render_set(operand),
                render_threshold(*threshold)
            );
            match measure {
                Some(measure) => format!("{head}, {})", render_key(measure)),
                None => format!("{head})"),
            }
        }
    }
}

/// Renders the whole accumulated query.
pub(crate) fn render_query(builder: &QueryBuilder) -> String {
    let mut lines: Vec<String> = Vec::new();
    if !builder.with_defs.is_empty() {
        let defs: Vec<String> = builder.with_defs.iter().map(render_with_def).collect();
        lines.push(format!("WITH {}", defs.join("\n")));
    }
    let axes: Vec<String> = builder
        .axes
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|expr| format!("{} ON {}", render_set(expr), axis_token(index)))
        })
        .collect();
    if axes.is_empty() {
        lines.push("SELECT".to_owned());
    } else {
        lines.push(format!("SELECT {}", axes.join(",\n")));
    }
    lines.push(format!("FROM {}", builder.source_name));
    if !builder.where_conditions.is_empty() {
        // Always parenthesized, even for a single condition. Downstream
        // consumers depend on this exact textual shape.
        lines.push(format!("WHERE ({})", builder.where_conditions.join(", ")));
    }
    debug!(
        source = %builder.source_name,
        axes = axes.len(),
        with_defs = builder.with_defs.len(),
        "query.render"
    );
    lines.join("\n")
}

fn render_with_def(def: &WithDef) -> String {
    match def {
        WithDef::Member {
            name,
            formula,
            options,
        } => {
            let mut out = format!("MEMBER {name} AS {}", quote(formula));
            for (key, value) in options {
                out.push_str(&format!(", {key} = {}", render_literal(value)));
            }
            out
        }
        WithDef::Set { name, expr } => format!("SET {name} AS {}", quote(&render_set(expr))),
    }
}

fn render_members(members: &[String]) -> String {
    match members {
        [single] => single.clone(),
        _ => render_braced(members),
    }
}

fn render_braced(members: &[String]) -> String {
    format!("{{{}}}", members.join(", "))
}

fn render_key(key: &KeySpec) -> String {
    match key {
        KeySpec::Expr(expr) => expr.clone(),
        KeySpec::Tuple(exprs) => match exprs.as_slice() {
            [single] => single.clone(),
            _ => format!("({})", exprs.join(", ")),
        },
    }
}

fn render_threshold(threshold: Threshold) -> String {
    match threshold {
        Threshold::Count(count) => count.to_string(),
        Threshold::Value(value) => value.to_string(),
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "NULL".to_owned(),
        Literal::Bool(true) => "TRUE".to_owned(),
        Literal::Bool(false) => "FALSE".to_owned(),
        Literal::Int(value) => value.to_string(),
        Literal::Float(value) => value.to_string(),
        Literal::String(value) => quote(value),
    }
}

/// Single-quotes a string, doubling embedded quotes.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
