use arrow::array::{Array, BooleanArray};
use arrow::compute::kernels::boolean;

use crate::across::IfCross;
use crate::dataframe::{DataFrame, Group, GroupedFrame, RowwiseFrame, Table};
use crate::expr::{evaluate_series, Context, EvalCx, Expr};
use crate::verbs::Verb;
use crate::Result;

/// A filter condition: a boolean expression or a row-wise predicate
/// reduction.
#[derive(Clone, Debug)]
pub enum FilterArg {
    /// A deferred boolean expression.
    Expr(Expr),
    /// An `if_any`/`if_all` middleware.
    IfCross(IfCross),
}

impl From<Expr> for FilterArg {
    fn from(e: Expr) -> Self {
        FilterArg::Expr(e)
    }
}

impl From<IfCross> for FilterArg {
    fn from(m: IfCross) -> Self {
        FilterArg::IfCross(m)
    }
}

/// Keep rows satisfying all conditions.
pub fn filter(condition: impl Into<FilterArg>) -> Filter {
    Filter {
        conditions: vec![condition.into()],
        preserve: false,
    }
}

/// The `filter` verb builder.
#[derive(Clone, Debug)]
pub struct Filter {
    conditions: Vec<FilterArg>,
    preserve: bool,
}

impl Filter {
    /// AND another condition.
    pub fn and(mut self, condition: impl Into<FilterArg>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// On grouped input, keep group key combinations that become empty
    /// instead of recomputing the grouping from surviving rows.
    pub fn preserve(mut self, preserve: bool) -> Self {
        self.preserve = preserve;
        self
    }
}

impl Verb for Filter {
    type Output = Table;

    fn name(&self) -> &'static str {
        "filter"
    }

    fn context(&self) -> Context {
        Context::Eval
    }

    fn apply(self, table: Table) -> Result<Table> {
        match table {
            Table::Plain(df) => {
                let mask = condition_mask(&df, &self.conditions)?;
                Ok(Table::Plain(df.filter_mask(&mask)?))
            }
            Table::Rowwise(r) => {
                let ids = r.id_cols().to_vec();
                let df = r.into_frame();
                let mask = condition_mask(&df, &self.conditions)?;
                Ok(Table::Rowwise(RowwiseFrame::new(
                    df.filter_mask(&mask)?,
                    ids,
                )?))
            }
            Table::Grouped(g) => {
                let keys = g.keys().to_vec();
                let mask = g.apply_mask(|sub| condition_mask(sub, &self.conditions))?;
                let filtered = g.frame().filter_mask(&mask)?;

                if !self.preserve {
                    return Ok(Table::Grouped(GroupedFrame::new(filtered, keys)?));
                }

                // remap surviving row positions, keeping empty key combinations
                let mut new_position = vec![None; mask.len()];
                let mut next = 0_usize;
                for (row, slot) in new_position.iter_mut().enumerate() {
                    if !mask.is_null(row) && mask.value(row) {
                        *slot = Some(next);
                        next += 1;
                    }
                }
                let groups = g
                    .groups()
                    .iter()
                    .map(|grp| Group {
                        key: grp.key.clone(),
                        rows: grp
                            .rows
                            .iter()
                            .filter_map(|r| new_position[*r])
                            .collect(),
                    })
                    .collect();
                Ok(Table::Grouped(GroupedFrame::with_declared_groups(
                    filtered, keys, groups,
                )))
            }
        }
    }
}

/// Evaluate conditions against one frame and AND them together.
fn condition_mask(df: &DataFrame, conditions: &[FilterArg]) -> Result<BooleanArray> {
    let mut acc: Option<BooleanArray> = None;
    for condition in conditions {
        let series = match condition {
            FilterArg::Expr(expr) => {
                let mut cx = EvalCx::new(Context::Eval);
                evaluate_series(expr, df, &mut cx)?
            }
            FilterArg::IfCross(m) => m.evaluate(df)?,
        };
        let mask = series.broadcast(df.height())?.to_bool()?;
        acc = Some(match acc {
            None => mask,
            Some(prev) => boolean::and(&prev, &mask)?,
        });
    }
    Ok(acc.unwrap_or_else(|| BooleanArray::from(vec![Some(true); df.height()])))
}
