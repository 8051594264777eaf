use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::across::{Across, CAcross};
use crate::dataframe::{append_aligned, DataFrame, GroupedFrame, RowwiseFrame, Table};
use crate::expr::{evaluate_series, Context, EvalCx, Expr};
use crate::verbs::{list_diff, Verb};
use crate::Result;

static INFORM: AtomicBool = AtomicBool::new(true);

/// Toggle the informational notices `summarise` emits when inferring the
/// output grouping structure.
pub fn set_summarise_inform(inform: bool) {
    INFORM.store(inform, Ordering::Relaxed);
}

/// Grouping structure of a `summarise` result.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SummariseGroups {
    /// Drop all levels of grouping.
    Drop,
    /// Drop the last level of grouping.
    DropLast,
    /// Keep the input grouping structure.
    Keep,
    /// Each output row becomes its own group.
    Rowwise,
}

/// A value bound to an output column in `summarise`.
#[derive(Clone, Debug)]
pub enum SummariseValue {
    /// A deferred expression (usually an aggregation).
    Expr(Expr),
    /// A multi-column apply; generated names take over the binding.
    Across(Across),
    /// A row-combining apply; the binding key names the output column.
    CAcross(CAcross),
}

impl From<Expr> for SummariseValue {
    fn from(e: Expr) -> Self {
        SummariseValue::Expr(e)
    }
}

impl From<Across> for SummariseValue {
    fn from(a: Across) -> Self {
        SummariseValue::Across(a)
    }
}

impl From<CAcross> for SummariseValue {
    fn from(c: CAcross) -> Self {
        SummariseValue::CAcross(c)
    }
}

/// Summarise each group to fewer rows.
pub fn summarise() -> Summarise {
    Summarise {
        acrosses: Vec::new(),
        named: Vec::new(),
        groups: None,
    }
}

/// The `summarise` verb builder.
#[derive(Clone, Debug)]
pub struct Summarise {
    acrosses: Vec<Across>,
    named: Vec<(String, SummariseValue)>,
    groups: Option<SummariseGroups>,
}

impl Summarise {
    /// Bind `name` to a summarised value.
    pub fn col(mut self, name: impl Into<String>, value: impl Into<SummariseValue>) -> Self {
        self.named.push((name.into(), value.into()));
        self
    }

    /// Apply a multi-column descriptor; generated names become columns.
    pub fn across(mut self, across: Across) -> Self {
        self.acrosses.push(across);
        self
    }

    /// Set the output grouping structure explicitly, overriding inference.
    pub fn groups(mut self, groups: SummariseGroups) -> Self {
        self.groups = Some(groups);
        self
    }
}

impl Verb for Summarise {
    type Output = Table;

    fn name(&self) -> &'static str {
        "summarise"
    }

    fn context(&self) -> Context {
        Context::Eval
    }

    fn apply(self, table: Table) -> Result<Table> {
        match table {
            Table::Plain(df) => {
                let out = summarise_frame(&df, &self, &[], false)?;
                Ok(finish_plain(out, self.groups)?)
            }
            Table::Rowwise(r) => {
                let out = summarise_frame(r.frame(), &self, r.id_cols(), true)?;
                Ok(finish_plain(out, self.groups)?)
            }
            Table::Grouped(g) => summarise_grouped(g, self),
        }
    }
}

fn finish_plain(out: DataFrame, groups: Option<SummariseGroups>) -> Result<Table> {
    match groups {
        Some(SummariseGroups::Rowwise) => {
            Ok(Table::Rowwise(RowwiseFrame::new(out, Vec::new())?))
        }
        _ => Ok(Table::Plain(out)),
    }
}

/// Core summarise over one concrete frame: only computed columns (and
/// row-wise identity columns) survive.
fn summarise_frame(
    df: &DataFrame,
    call: &Summarise,
    id_cols: &[String],
    rowwise: bool,
) -> Result<DataFrame> {
    let mut cx = EvalCx::new(Context::Eval);
    let mut ret: Option<DataFrame> = None;

    if !id_cols.is_empty() {
        ret = Some(df.select_names(id_cols)?);
    }

    for across in &call.acrosses {
        let frame = across.evaluate_frame(df)?;
        for column in frame.columns() {
            let name = column.name().to_string();
            append_aligned(&mut ret, &name, column)?;
        }
    }

    for (key, value) in &call.named {
        match value {
            SummariseValue::Expr(expr) => {
                let series = evaluate_series(expr, df, &mut cx)?;
                append_aligned(&mut ret, key, series)?;
            }
            SummariseValue::Across(across) => {
                let frame = across.evaluate_frame(df)?;
                for column in frame.columns() {
                    let name = column.name().to_string();
                    append_aligned(&mut ret, &name, column)?;
                }
            }
            SummariseValue::CAcross(cacross) => {
                let mut cacross = cacross.clone();
                cacross.set_name(key);
                let frame = cacross.evaluate(df, rowwise)?;
                for column in frame.columns() {
                    let name = column.name().to_string();
                    append_aligned(&mut ret, &name, column)?;
                }
            }
        }
    }

    Ok(ret.unwrap_or_else(DataFrame::empty))
}

fn summarise_grouped(g: GroupedFrame, call: Summarise) -> Result<Table> {
    let keys = g.keys().to_vec();
    let ret = g.apply_collect(|sub| {
        let body_cols = list_diff(&sub.column_names(), &keys);
        let body = sub.select_names(&body_cols)?;
        summarise_frame(&body, &call, &[], false)
    })?;

    let regrouped = GroupedFrame::new(ret.clone(), keys.clone())?;
    let sizes: Vec<usize> = regrouped.groups().iter().map(|grp| grp.rows.len()).collect();

    let groups = match call.groups {
        Some(explicit) => explicit,
        None => infer_groups(&keys, &sizes),
    };

    match groups {
        SummariseGroups::Drop => Ok(Table::Plain(ret)),
        SummariseGroups::DropLast => {
            let rest = keys[..keys.len().saturating_sub(1)].to_vec();
            if rest.is_empty() {
                Ok(Table::Plain(ret))
            } else {
                Ok(Table::Grouped(GroupedFrame::new(ret, rest)?))
            }
        }
        SummariseGroups::Keep => Ok(Table::Grouped(regrouped)),
        SummariseGroups::Rowwise => Ok(Table::Rowwise(RowwiseFrame::new(ret, Vec::new())?)),
    }
}

/// Infer the output grouping: singleton groups drop the last level; anything
/// else keeps every level, with a notice when group sizes are uneven.
fn infer_groups(keys: &[String], sizes: &[usize]) -> SummariseGroups {
    let inform = INFORM.load(Ordering::Relaxed);
    if sizes.iter().all(|s| *s == 1) {
        if inform {
            if keys.len() <= 1 {
                info!("`summarise()` ungrouping output (override with the `_groups` argument)");
            } else {
                info!(
                    "`summarise()` regrouping output by {:?} (override with the `_groups` argument)",
                    &keys[..keys.len() - 1]
                );
            }
        }
        return SummariseGroups::DropLast;
    }
    let uniform = sizes.windows(2).all(|w| w[0] == w[1]);
    if !uniform && inform {
        warn!(
            "`summarise()` regrouping output by {keys:?}; group sizes are unequal \
             (override with the `_groups` argument)"
        );
    }
    SummariseGroups::Keep
}
