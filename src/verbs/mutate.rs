use crate::across::{Across, CAcross};
use crate::dataframe::{DataFrame, GroupedFrame, RowwiseFrame, Table};
use crate::expr::{evaluate_series, Context, EvalCx, Expr};
use crate::selector::Collection;
use crate::verbs::relocate::relocate_frame;
use crate::verbs::{list_diff, list_union, Verb};
use crate::{FrameError, Result};

/// A value bound to a column name in `mutate`/`summarise`.
#[derive(Clone, Debug)]
pub enum Mutation {
    /// A deferred expression evaluated against the (progressively updated)
    /// frame.
    Expr(Expr),
    /// A multi-column apply; its generated names take over the binding.
    Across(Across),
    /// A row-combining apply; the binding key names the output column.
    CAcross(CAcross),
    /// Remove the column.
    Drop,
}

impl From<Expr> for Mutation {
    fn from(e: Expr) -> Self {
        Mutation::Expr(e)
    }
}

impl From<Across> for Mutation {
    fn from(a: Across) -> Self {
        Mutation::Across(a)
    }
}

impl From<CAcross> for Mutation {
    fn from(c: CAcross) -> Self {
        Mutation::CAcross(c)
    }
}

/// Which existing columns survive a `mutate`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Keep {
    /// Retain every column.
    #[default]
    All,
    /// Retain columns read while computing the new ones, plus the new ones.
    Used,
    /// Retain columns *not* read, plus the new ones.
    Unused,
    /// Retain only the new columns (and protected grouping keys).
    None,
}

/// Add new columns, preserving existing ones.
pub fn mutate() -> Mutate {
    Mutate {
        verb: "mutate",
        acrosses: Vec::new(),
        named: Vec::new(),
        keep: Keep::All,
        before: None,
        after: None,
    }
}

/// `mutate` with `Keep::None`: only the computed columns survive.
pub fn transmute() -> Mutate {
    Mutate {
        keep: Keep::None,
        verb: "transmute",
        ..mutate()
    }
}

/// The `mutate` verb builder.
#[derive(Clone, Debug)]
pub struct Mutate {
    verb: &'static str,
    acrosses: Vec<Across>,
    named: Vec<(String, Mutation)>,
    keep: Keep,
    before: Option<Collection>,
    after: Option<Collection>,
}

impl Mutate {
    /// Bind `name` to a value.
    pub fn col(mut self, name: impl Into<String>, value: impl Into<Mutation>) -> Self {
        self.named.push((name.into(), value.into()));
        self
    }

    /// Apply a multi-column descriptor; its generated names become columns.
    pub fn across(mut self, across: Across) -> Self {
        self.acrosses.push(across);
        self
    }

    /// Remove a column.
    pub fn drop(self, name: impl Into<String>) -> Self {
        self.col(name, Mutation::Drop)
    }

    /// Column-retention policy.
    pub fn keep(mut self, keep: Keep) -> Self {
        self.keep = keep;
        self
    }

    /// Place new columns before this selection.
    pub fn before(mut self, selection: impl Into<Collection>) -> Self {
        self.before = Some(selection.into());
        self
    }

    /// Place new columns after this selection.
    pub fn after(mut self, selection: impl Into<Collection>) -> Self {
        self.after = Some(selection.into());
        self
    }
}

impl Verb for Mutate {
    type Output = Table;

    fn name(&self) -> &'static str {
        self.verb
    }

    fn context(&self) -> Context {
        Context::Pending
    }

    fn apply(self, table: Table) -> Result<Table> {
        match table {
            Table::Plain(df) => {
                let out = mutate_frame(&df, &self, false, &[])?;
                Ok(Table::Plain(out))
            }
            Table::Grouped(g) => {
                let keys = g.keys().to_vec();
                let out = g.apply_transform(|sub| mutate_frame(sub, &self, false, &keys))?;
                Ok(Table::Grouped(GroupedFrame::new(out, keys)?))
            }
            Table::Rowwise(r) => {
                let ids = r.id_cols().to_vec();
                let out = mutate_frame(r.frame(), &self, true, &ids)?;
                Ok(Table::Rowwise(RowwiseFrame::new(out, ids)?))
            }
        }
    }
}

enum PendingValue {
    Ready(crate::dataframe::Series),
    Deferred(Mutation),
}

/// Core mutate over one concrete frame.
///
/// `protected` columns (grouping keys, row-wise identity columns) survive
/// every `Keep` policy.
pub(crate) fn mutate_frame(
    df: &DataFrame,
    call: &Mutate,
    rowwise: bool,
    protected: &[String],
) -> Result<DataFrame> {
    let mut cx = EvalCx::new(Context::Eval);

    // positional acrosses evaluate against the incoming frame first
    let mut items: Vec<(String, PendingValue)> = Vec::new();
    for across in &call.acrosses {
        for c in across.cols() {
            cx.track(c);
        }
        let frame = across.evaluate_frame(df)?;
        for column in frame.columns() {
            upsert(
                &mut items,
                column.name().to_string(),
                PendingValue::Ready(column),
            );
        }
    }
    for (key, value) in &call.named {
        upsert(
            &mut items,
            key.clone(),
            PendingValue::Deferred(value.clone()),
        );
    }

    let mut data = df.clone();
    let mut outcols: Vec<String> = Vec::new();

    for (key, value) in items {
        match value {
            PendingValue::Ready(series) => {
                assign(&mut data, &key, series, &mut outcols)?;
            }
            PendingValue::Deferred(Mutation::Drop) => {
                data = data.drop_column(&key)?;
                outcols.retain(|c| c != &key);
            }
            PendingValue::Deferred(Mutation::Expr(expr)) => {
                let series = evaluate_series(&expr, &data, &mut cx)?;
                assign(&mut data, &key, series, &mut outcols)?;
            }
            PendingValue::Deferred(Mutation::Across(across)) => {
                for c in across.cols() {
                    cx.track(c);
                }
                let frame = across.evaluate_frame(&data)?;
                assign_frame(&mut data, &key, frame, &mut outcols)?;
            }
            PendingValue::Deferred(Mutation::CAcross(mut cacross)) => {
                cacross.set_name(&key);
                for c in cacross.inner().cols() {
                    cx.track(c);
                }
                let frame = cacross.evaluate(&data, rowwise)?;
                assign_frame(&mut data, &key, frame, &mut outcols)?;
            }
        }
    }

    if call.before.is_some() || call.after.is_some() {
        data = relocate_frame(
            &data,
            &Collection::from(outcols.clone()),
            call.before.as_ref(),
            call.after.as_ref(),
            call.verb,
        )?;
    }

    let used = cx.used_refs().to_vec();
    let selection: Option<Vec<String>> = match call.keep {
        Keep::All => None,
        Keep::Used => Some(list_union(&used, &outcols)),
        Keep::Unused => {
            let unused = list_diff(&data.column_names(), &used);
            Some(list_union(&unused, &outcols))
        }
        Keep::None => Some(outcols.clone()),
    };

    match selection {
        None => Ok(data),
        Some(cols) => {
            let cols = list_union(protected, &cols);
            let existing: Vec<String> = cols
                .into_iter()
                .filter(|c| data.has_column(c))
                .collect();
            data.select_names(&existing)
        }
    }
}

fn upsert(items: &mut Vec<(String, PendingValue)>, key: String, value: PendingValue) {
    match items.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => items.push((key, value)),
    }
}

fn assign(
    data: &mut DataFrame,
    name: &str,
    value: crate::dataframe::Series,
    outcols: &mut Vec<String>,
) -> Result<()> {
    let value = if data.width() == 0 || value.len() == data.height() {
        value
    } else if value.len() == 1 {
        value.broadcast(data.height())?
    } else {
        return Err(FrameError::schema_mismatch(format!(
            "value for column '{name}' has length {}, expected {} or 1",
            value.len(),
            data.height()
        )));
    };
    *data = data.with_column(value.rename(name))?;
    if !outcols.iter().any(|c| c == name) {
        outcols.push(name.to_string());
    }
    Ok(())
}

/// Assign an evaluated multi-column result: a single column keeps its own
/// generated name; multiple columns expand to `key$col` compound names.
fn assign_frame(
    data: &mut DataFrame,
    key: &str,
    frame: DataFrame,
    outcols: &mut Vec<String>,
) -> Result<()> {
    if frame.width() == 1 {
        let column = frame.column_at(0);
        let name = column.name().to_string();
        assign(data, &name, column, outcols)
    } else {
        for column in frame.columns() {
            let name = format!("{key}${}", column.name());
            assign(data, &name, column, outcols)?;
        }
        Ok(())
    }
}
