//! The verb layer: table transformations polymorphic over `Table` shapes.
//!
//! Each verb is a builder struct implementing [`Verb`]. Verbs are callable
//! directly (`verb.apply(table)`) or through the pipe operator
//! (`table >> verb`), which threads `Result` values through a [`Piped`]
//! chain.

mod arrange;
mod counting;
mod distinct;
mod filter;
mod group_by;
mod join;
mod mutate;
mod relocate;
mod sets;
mod slice;
mod summarise;

pub use arrange::{arrange, Arrange};
pub use counting::{add_count, add_tally, count, tally, AddCount, AddTally, Count, Tally};
pub use distinct::{distinct, Distinct};
pub use filter::{filter, Filter, FilterArg};
pub use group_by::{
    group_by, group_keys, group_map, group_modify, group_rows, group_split, group_trim,
    group_vars, group_walk, rowwise, ungroup, with_groups, GroupBy, GroupKeys, GroupMap,
    GroupModify, GroupRows, GroupSplit, GroupTrim, GroupVars, GroupWalk, RowwiseVerb, Ungroup,
    WithGroups,
};
pub use join::{
    anti_join, full_join, inner_join, left_join, nest_join, right_join, semi_join, Join, JoinBy,
    JoinKind, NestJoin, SemiJoin,
};
pub use mutate::{mutate, transmute, Keep, Mutate, Mutation};
pub use relocate::{pull, pull_at, relocate, rename, rename_with, select, Pull, Pulled, Relocate,
    Rename, RenameWith, Select};
pub use sets::{
    bind_cols, bind_rows, intersect, setdiff, setequal, union, union_all, BindCols, BindRows,
    SetEqual, SetOp,
};
pub use slice::{
    slice, slice_head, slice_max, slice_min, slice_sample, slice_tail, Slice, SliceHead,
    SliceMax, SliceMin, SliceSample, SliceTail,
};
pub use summarise::{set_summarise_inform, summarise, Summarise, SummariseGroups, SummariseValue};

use std::ops::Shr;

use crate::config::{ast_fallback_for, AstFallback};
use crate::dataframe::{DataFrame, GroupedFrame, RowwiseFrame, Table};
use crate::expr::Context;
use crate::Result;

/// A table-transformation verb.
///
/// A verb declares its name (used for the environment-driven call-style
/// fallback policy), the evaluation context its arguments resolve under, and
/// the transformation itself.
pub trait Verb {
    /// What the verb produces (a `Table` for chainable verbs).
    type Output;

    /// The verb name, as used in configuration lookups.
    fn name(&self) -> &'static str;

    /// The declared evaluation context for this verb's arguments.
    fn context(&self) -> Context;

    /// Apply the verb.
    fn apply(self, table: Table) -> Result<Self::Output>;

    /// The configured call-style fallback policy for this verb.
    fn ast_fallback(&self) -> Result<AstFallback> {
        ast_fallback_for(self.name())
    }
}

/// The value flowing through a `>>` chain: a pending `Result`.
///
/// Chains keep piping while the output is a `Table`; terminal verbs (e.g.
/// `pull`, `setequal`) end the chain. Extract with [`Piped::into_result`].
#[must_use = "a piped chain does nothing until the result is extracted"]
#[derive(Debug)]
pub struct Piped<T>(Result<T>);

impl<T> Piped<T> {
    /// Unwrap the chained computation.
    pub fn into_result(self) -> Result<T> {
        self.0
    }
}

impl Piped<Table> {
    /// Unwrap and discard the grouping envelope.
    pub fn frame(self) -> Result<DataFrame> {
        self.0.map(Table::into_frame)
    }
}

impl<V: Verb> Shr<V> for Table {
    type Output = Piped<V::Output>;

    fn shr(self, verb: V) -> Piped<V::Output> {
        Piped(verb.apply(self))
    }
}

impl<V: Verb> Shr<V> for DataFrame {
    type Output = Piped<V::Output>;

    fn shr(self, verb: V) -> Piped<V::Output> {
        Piped(verb.apply(Table::Plain(self)))
    }
}

impl<V: Verb> Shr<V> for GroupedFrame {
    type Output = Piped<V::Output>;

    fn shr(self, verb: V) -> Piped<V::Output> {
        Piped(verb.apply(Table::Grouped(self)))
    }
}

impl<V: Verb> Shr<V> for RowwiseFrame {
    type Output = Piped<V::Output>;

    fn shr(self, verb: V) -> Piped<V::Output> {
        Piped(verb.apply(Table::Rowwise(self)))
    }
}

impl<V: Verb> Shr<V> for Piped<Table> {
    type Output = Piped<V::Output>;

    fn shr(self, verb: V) -> Piped<V::Output> {
        Piped(self.0.and_then(|table| verb.apply(table)))
    }
}

/// Apply an arbitrary function in a piping chain.
pub fn pipe<F>(func: F) -> Pipe<F>
where
    F: FnOnce(Table) -> Result<Table>,
{
    Pipe { func }
}

/// The [`pipe`] verb.
pub struct Pipe<F> {
    func: F,
}

impl<F> Verb for Pipe<F>
where
    F: FnOnce(Table) -> Result<Table>,
{
    type Output = Table;

    fn name(&self) -> &'static str {
        "pipe"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        (self.func)(table)
    }
}

/// `a` minus `b`, preserving `a`'s order.
pub(crate) fn list_diff(a: &[String], b: &[String]) -> Vec<String> {
    a.iter()
        .filter(|x| !b.iter().any(|y| y == *x))
        .cloned()
        .collect()
}

/// `a` followed by elements of `b` not already present.
pub(crate) fn list_union(a: &[String], b: &[String]) -> Vec<String> {
    let mut out = a.to_vec();
    for x in b {
        if !out.iter().any(|y| y == x) {
            out.push(x.clone());
        }
    }
    out
}

/// Elements of `a` also present in `b`, preserving `a`'s order.
pub(crate) fn list_intersect(a: &[String], b: &[String]) -> Vec<String> {
    a.iter()
        .filter(|x| b.iter().any(|y| y == *x))
        .cloned()
        .collect()
}

/// Resolve a row count from `n` or a proportion; defaults to 1 and silently
/// truncates to the available total.
pub(crate) fn get_n_from_prop(total: usize, n: Option<usize>, prop: Option<f64>) -> usize {
    let n = match (n, prop) {
        (Some(n), _) => n,
        (None, Some(p)) => (p * total as f64).floor() as usize,
        (None, None) => 1,
    };
    n.min(total)
}

#[cfg(test)]
mod tests {
    use super::get_n_from_prop;

    #[test]
    fn n_from_prop_floors_and_truncates() {
        assert_eq!(get_n_from_prop(5, None, Some(0.5)), 2);
        assert_eq!(get_n_from_prop(5, Some(9), None), 5);
        assert_eq!(get_n_from_prop(5, None, None), 1);
        assert_eq!(get_n_from_prop(0, None, None), 0);
    }
}
