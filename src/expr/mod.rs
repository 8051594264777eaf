//! Deferred expression DSL.
//!
//! Expressions are built before any concrete frame exists (column references,
//! literals, operator trees) and resolved later against a `DataFrame` under an
//! evaluation [`Context`].

mod context;
mod eval;
#[allow(clippy::module_inception)]
mod expr;

pub use context::{Context, EvalCx};
pub(crate) use eval::aggregate;
pub use eval::{evaluate_names, evaluate_series};
pub use expr::{AggFunc, Expr, Operator, Scalar, UnaryOperator};

/// Create a deferred reference to a column.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// Create a literal expression.
pub fn lit(value: impl Into<Scalar>) -> Expr {
    Expr::Literal(value.into())
}

/// Mark a sort key as descending (meaningful inside `arrange`).
pub fn desc(expr: Expr) -> Expr {
    Expr::Desc(Box::new(expr))
}

/// The number of rows in the current frame or group.
pub fn n() -> Expr {
    Expr::Len
}
