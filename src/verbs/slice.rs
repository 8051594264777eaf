use arrow::compute::{sort_to_indices, SortOptions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataframe::{DataFrame, Group, GroupedFrame, RowwiseFrame, Table};
use crate::expr::{evaluate_series, Context, EvalCx, Expr, Scalar};
use crate::selector::{resolve_rows, Collection};
use crate::verbs::{get_n_from_prop, Verb};
use crate::{FrameError, Result};

/// Index rows by their integer locations (ranges and negated positions
/// allowed).
pub fn slice(rows: impl Into<Collection>) -> Slice {
    Slice {
        rows: rows.into(),
        preserve: false,
    }
}

/// The `slice` verb builder.
#[derive(Clone, Debug)]
pub struct Slice {
    rows: Collection,
    preserve: bool,
}

impl Slice {
    /// On grouped input, keep group key combinations that become empty.
    pub fn preserve(mut self, preserve: bool) -> Self {
        self.preserve = preserve;
        self
    }
}

impl Verb for Slice {
    type Output = Table;

    fn name(&self) -> &'static str {
        "slice"
    }

    fn context(&self) -> Context {
        Context::Mixed
    }

    fn apply(self, table: Table) -> Result<Table> {
        let rows = self.rows;
        apply_row_selection(
            table,
            self.preserve,
            move |sub| resolve_rows(sub.height(), &rows),
        )
    }
}

/// Select the first rows (per group on grouped input).
pub fn slice_head() -> SliceHead {
    SliceHead { n: None, prop: None }
}

/// The `slice_head` verb builder.
#[derive(Clone, Copy, Debug)]
pub struct SliceHead {
    n: Option<usize>,
    prop: Option<f64>,
}

impl SliceHead {
    /// Number of rows to select.
    pub fn n(mut self, n: usize) -> Self {
        self.n = Some(n);
        self
    }

    /// Proportion of rows to select (floored per group).
    pub fn prop(mut self, prop: f64) -> Self {
        self.prop = Some(prop);
        self
    }
}

impl Verb for SliceHead {
    type Output = Table;

    fn name(&self) -> &'static str {
        "slice_head"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        apply_row_selection(table, false, move |sub| {
            let n = get_n_from_prop(sub.height(), self.n, self.prop);
            Ok((0..n).collect())
        })
    }
}

/// Select the last rows (per group on grouped input).
pub fn slice_tail() -> SliceTail {
    SliceTail { n: None, prop: None }
}

/// The `slice_tail` verb builder.
#[derive(Clone, Copy, Debug)]
pub struct SliceTail {
    n: Option<usize>,
    prop: Option<f64>,
}

impl SliceTail {
    /// Number of rows to select.
    pub fn n(mut self, n: usize) -> Self {
        self.n = Some(n);
        self
    }

    /// Proportion of rows to select (floored per group).
    pub fn prop(mut self, prop: f64) -> Self {
        self.prop = Some(prop);
        self
    }
}

impl Verb for SliceTail {
    type Output = Table;

    fn name(&self) -> &'static str {
        "slice_tail"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        apply_row_selection(table, false, move |sub| {
            let height = sub.height();
            let n = get_n_from_prop(height, self.n, self.prop);
            Ok((height - n..height).collect())
        })
    }
}

/// Select rows with the lowest values of a variable.
pub fn slice_min(order_by: Expr) -> SliceMin {
    SliceMin {
        inner: SliceOrdered::new(order_by, false),
    }
}

/// Select rows with the highest values of a variable.
pub fn slice_max(order_by: Expr) -> SliceMax {
    SliceMax {
        inner: SliceOrdered::new(order_by, true),
    }
}

#[derive(Clone, Debug)]
struct SliceOrdered {
    order_by: Expr,
    descending: bool,
    n: Option<usize>,
    prop: Option<f64>,
    with_ties: bool,
}

impl SliceOrdered {
    fn new(order_by: Expr, descending: bool) -> Self {
        Self {
            order_by,
            descending,
            n: None,
            prop: None,
            with_ties: true,
        }
    }

    fn select(&self, sub: &DataFrame) -> Result<Vec<usize>> {
        let mut cx = EvalCx::new(Context::Eval);
        let order = evaluate_series(&self.order_by, sub, &mut cx)?;
        let order = order.broadcast(sub.height())?;

        let indices = sort_to_indices(
            order.array().as_ref(),
            Some(SortOptions {
                descending: self.descending,
                nulls_first: false,
            }),
            None,
        )?;
        let sorted: Vec<usize> = indices.values().iter().map(|i| *i as usize).collect();

        let mut n = get_n_from_prop(sub.height(), self.n, self.prop);
        if self.with_ties && n > 0 {
            let boundary = order.scalar_at(sorted[n - 1])?;
            while n < sorted.len() && order.scalar_at(sorted[n])? == boundary {
                n += 1;
            }
        }
        Ok(sorted[..n].to_vec())
    }
}

macro_rules! ordered_slice_verb {
    ($type:ident, $name:literal) => {
        /// Builder for an order-based slice.
        #[derive(Clone, Debug)]
        pub struct $type {
            inner: SliceOrdered,
        }

        impl $type {
            /// Number of rows to select (default 1).
            pub fn n(mut self, n: usize) -> Self {
                self.inner.n = Some(n);
                self
            }

            /// Proportion of rows to select (floored per group).
            pub fn prop(mut self, prop: f64) -> Self {
                self.inner.prop = Some(prop);
                self
            }

            /// Whether rows tied with the boundary value are all kept
            /// (default true).
            pub fn with_ties(mut self, with_ties: bool) -> Self {
                self.inner.with_ties = with_ties;
                self
            }
        }

        impl Verb for $type {
            type Output = Table;

            fn name(&self) -> &'static str {
                $name
            }

            fn context(&self) -> Context {
                Context::Eval
            }

            fn apply(self, table: Table) -> Result<Table> {
                let inner = self.inner;
                apply_row_selection(table, false, move |sub| inner.select(sub))
            }
        }
    };
}

ordered_slice_verb!(SliceMin, "slice_min");
ordered_slice_verb!(SliceMax, "slice_max");

/// Randomly select rows.
pub fn slice_sample() -> SliceSample {
    SliceSample {
        n: None,
        prop: None,
        replace: false,
        weight_by: None,
        seed: None,
    }
}

/// The `slice_sample` verb builder.
#[derive(Clone, Debug)]
pub struct SliceSample {
    n: Option<usize>,
    prop: Option<f64>,
    replace: bool,
    weight_by: Option<Expr>,
    seed: Option<u64>,
}

impl SliceSample {
    /// Number of rows to draw (default 1).
    pub fn n(mut self, n: usize) -> Self {
        self.n = Some(n);
        self
    }

    /// Proportion of rows to draw (floored per group).
    pub fn prop(mut self, prop: f64) -> Self {
        self.prop = Some(prop);
        self
    }

    /// Sample with replacement.
    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Sampling weights, evaluated per (sub)frame.
    pub fn weight_by(mut self, weights: Expr) -> Self {
        self.weight_by = Some(weights);
        self
    }

    /// Seed for reproducible draws.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Verb for SliceSample {
    type Output = Table;

    fn name(&self) -> &'static str {
        "slice_sample"
    }

    fn context(&self) -> Context {
        Context::Eval
    }

    fn apply(self, table: Table) -> Result<Table> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        // one rng threaded through all groups keeps a single seed reproducible
        let rng = std::cell::RefCell::new(rng);
        let call = self;
        apply_row_selection(table, false, move |sub| {
            call.select(sub, &mut rng.borrow_mut())
        })
    }
}

impl SliceSample {
    fn select(&self, sub: &DataFrame, rng: &mut StdRng) -> Result<Vec<usize>> {
        let height = sub.height();
        let n = get_n_from_prop(height, self.n, self.prop);
        if height == 0 || n == 0 {
            return Ok(Vec::new());
        }

        let mut weights = match &self.weight_by {
            None => vec![1.0_f64; height],
            Some(expr) => {
                let mut cx = EvalCx::new(Context::Eval);
                let series = evaluate_series(expr, sub, &mut cx)?.broadcast(height)?;
                (0..height)
                    .map(|row| match series.scalar_at(row)? {
                        Scalar::Null => Ok(0.0),
                        Scalar::Int64(v) => Ok(v as f64),
                        Scalar::Float64(v) => Ok(v),
                        other => Err(FrameError::type_mismatch(
                            Some(series.name().to_string()),
                            "numeric weights".to_string(),
                            format!("{other:?}"),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                return Err(FrameError::invalid_operation(
                    "sampling weights sum to zero",
                ));
            }
            let mut draw = rng.gen_range(0.0..total);
            let mut picked = height - 1;
            for (row, w) in weights.iter().enumerate() {
                if draw < *w {
                    picked = row;
                    break;
                }
                draw -= *w;
            }
            out.push(picked);
            if !self.replace {
                weights[picked] = 0.0;
            }
        }
        Ok(out)
    }
}

/// Shared shape dispatch for the slice family: compute kept row positions per
/// (sub)frame, reassemble, and restore the envelope.
fn apply_row_selection(
    table: Table,
    preserve: bool,
    select: impl Fn(&DataFrame) -> Result<Vec<usize>>,
) -> Result<Table> {
    match table {
        Table::Plain(df) => {
            let rows = select(&df)?;
            Ok(Table::Plain(df.take_indices(&rows)?))
        }
        Table::Rowwise(r) => {
            let ids = r.id_cols().to_vec();
            let rows = select(r.frame())?;
            Ok(Table::Rowwise(RowwiseFrame::new(
                r.frame().take_indices(&rows)?,
                ids,
            )?))
        }
        Table::Grouped(g) => {
            let keys = g.keys().to_vec();
            let mut all_rows: Vec<usize> = Vec::new();
            let mut declared: Vec<Group> = Vec::new();
            for group in g.groups() {
                let sub = g.subframe(group)?;
                let local = select(&sub)?;
                let start = all_rows.len();
                all_rows.extend(local.iter().map(|l| group.rows[*l]));
                declared.push(Group {
                    key: group.key.clone(),
                    rows: (start..all_rows.len()).collect(),
                });
            }
            let out = g.frame().take_indices(&all_rows)?;
            if preserve {
                Ok(Table::Grouped(GroupedFrame::with_declared_groups(
                    out, keys, declared,
                )))
            } else {
                Ok(Table::Grouped(GroupedFrame::new(out, keys)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{slice, slice_head, slice_max, slice_min, slice_sample, slice_tail};
    use crate::dataframe::{DataFrame, Series, Table};
    use crate::expr::col;
    use crate::selector::Negated;
    use crate::verbs::{group_by, Verb};

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::int64("x", [10, 20, 30, 40, 50, 60]),
            Series::utf8("g", ["a", "a", "a", "a", "a", "b"]),
        ])
        .unwrap()
    }

    #[test]
    fn slice_selects_positions_ranges_and_negations() {
        let out = slice([0_i64, -1])
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        assert_eq!(
            out.column("x").unwrap().i64_values().unwrap(),
            vec![Some(10), Some(60)]
        );

        let out = slice(Negated::new(0_i64..4))
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        assert_eq!(
            out.column("x").unwrap().i64_values().unwrap(),
            vec![Some(50), Some(60)]
        );
    }

    #[test]
    fn grouped_slice_head_truncates_to_group_size() {
        let t = group_by("g").apply(Table::Plain(df())).unwrap();
        let out = slice_head().n(2).apply(t).unwrap().into_frame();
        // 2 rows from the 5-row group, 1 row (all available) from the 1-row group
        assert_eq!(
            out.column("x").unwrap().i64_values().unwrap(),
            vec![Some(10), Some(20), Some(60)]
        );
    }

    #[test]
    fn slice_tail_takes_last_rows() {
        let out = slice_tail().n(2).apply(Table::Plain(df())).unwrap().into_frame();
        assert_eq!(
            out.column("x").unwrap().i64_values().unwrap(),
            vec![Some(50), Some(60)]
        );
    }

    #[test]
    fn slice_min_and_max_respect_ties() {
        let df = DataFrame::new(vec![Series::int64("x", [1, 1, 2, 3])]).unwrap();
        let out = slice_min(col("x")).apply(Table::Plain(df.clone())).unwrap();
        assert_eq!(out.height(), 2);

        let out = slice_min(col("x"))
            .with_ties(false)
            .apply(Table::Plain(df.clone()))
            .unwrap();
        assert_eq!(out.height(), 1);

        let out = slice_max(col("x")).apply(Table::Plain(df)).unwrap().into_frame();
        assert_eq!(
            out.column("x").unwrap().i64_values().unwrap(),
            vec![Some(3)]
        );
    }

    #[test]
    fn slice_sample_is_reproducible_with_a_seed() {
        let a = slice_sample()
            .n(3)
            .seed(42)
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        let b = slice_sample()
            .n(3)
            .seed(42)
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        assert!(a.content_eq(&b));
        assert_eq!(a.height(), 3);
    }

    #[test]
    fn slice_prop_uses_group_relative_sizes() {
        let t = group_by("g").apply(Table::Plain(df())).unwrap();
        let out = slice_head().prop(0.5).apply(t).unwrap().into_frame();
        // floor(0.5 * 5) = 2 rows from "a", floor(0.5 * 1) = 0 rows from "b"
        assert_eq!(
            out.column("x").unwrap().i64_values().unwrap(),
            vec![Some(10), Some(20)]
        );
    }
}
