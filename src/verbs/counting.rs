use crate::dataframe::{DataFrame, GroupedFrame, Series, Table};
use crate::expr::{col, desc, Context, Scalar};
use crate::verbs::mutate::{mutate, Mutation};
use crate::verbs::{arrange, join::left_join, list_union, Verb};
use crate::{FrameError, Result};

/// Count observations by group.
pub fn count(selection: impl Into<crate::selector::Collection>) -> Count {
    Count {
        selection: selection.into(),
        wt: None,
        sort: false,
        name: "n".to_string(),
        mutations: Vec::new(),
    }
}

/// The `count` verb builder.
#[derive(Clone, Debug)]
pub struct Count {
    selection: crate::selector::Collection,
    wt: Option<String>,
    sort: bool,
    name: String,
    mutations: Vec<(String, Mutation)>,
}

impl Count {
    /// Weight column: compute `sum(wt)` per group instead of row counts.
    pub fn wt(mut self, column: impl Into<String>) -> Self {
        self.wt = Some(column.into());
        self
    }

    /// Show the largest groups first.
    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Name of the count column (default `n`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Compute a column first and group by it as well.
    pub fn col(mut self, name: impl Into<String>, value: impl Into<Mutation>) -> Self {
        self.mutations.push((name.into(), value.into()));
        self
    }
}

impl Verb for Count {
    type Output = Table;

    fn name(&self) -> &'static str {
        "count"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        let out = count_frame(
            table.into_frame(),
            &self.selection,
            &self.mutations,
            self.wt.as_deref(),
            &self.name,
        )?;
        if self.sort {
            return arrange([desc(col(self.name))]).apply(Table::Plain(out));
        }
        Ok(Table::Plain(out))
    }
}

fn count_frame(
    mut df: DataFrame,
    selection: &crate::selector::Collection,
    mutations: &[(String, Mutation)],
    wt: Option<&str>,
    name: &str,
) -> Result<DataFrame> {
    let all = df.column_names();
    let mut columns =
        crate::selector::resolve_selectors(&all, selection, crate::selector::Dedup::Unique)?;

    if !mutations.is_empty() {
        let mut call = mutate();
        for (key, value) in mutations {
            call = call.col(key.clone(), value.clone());
        }
        df = call.apply(Table::Plain(df))?.into_frame();
        let mutated: Vec<String> = mutations.iter().map(|(n, _)| n.clone()).collect();
        columns = list_union(&columns, &mutated);
    }

    if columns.is_empty() {
        return Err(FrameError::invalid_operation(
            "count requires at least one grouping column",
        ));
    }

    let grouped = GroupedFrame::new(df, columns.clone())?;
    let mut keys = grouped.key_frame()?;
    let values = grouped
        .groups()
        .iter()
        .map(|g| group_weight(&grouped, &g.rows, wt))
        .collect::<Result<Vec<_>>>()?;
    keys = keys.with_column(Series::from_scalars(name.to_string(), &values)?)?;
    Ok(keys)
}

fn group_weight(grouped: &GroupedFrame, rows: &[usize], wt: Option<&str>) -> Result<Scalar> {
    match wt {
        None => Ok(Scalar::Int64(rows.len() as i64)),
        Some(wt) => {
            let series = grouped.frame().column(wt)?.take(rows)?;
            crate::expr::aggregate(crate::expr::AggFunc::Sum, &series)
        }
    }
}

/// A lower-level `count` assuming the grouping is already done.
pub fn tally() -> Tally {
    Tally {
        wt: None,
        sort: false,
        name: "n".to_string(),
    }
}

/// The `tally` verb builder.
#[derive(Clone, Debug)]
pub struct Tally {
    wt: Option<String>,
    sort: bool,
    name: String,
}

impl Tally {
    /// Weight column: compute `sum(wt)` instead of row counts.
    pub fn wt(mut self, column: impl Into<String>) -> Self {
        self.wt = Some(column.into());
        self
    }

    /// Show the largest groups first.
    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Name of the count column (default `n`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Verb for Tally {
    type Output = Table;

    fn name(&self) -> &'static str {
        "tally"
    }

    fn context(&self) -> Context {
        Context::Select
    }

    fn apply(self, table: Table) -> Result<Table> {
        match table {
            Table::Grouped(g) => {
                let keys = g.keys().to_vec();
                let call = count(keys).sort(self.sort).name(self.name.clone());
                let call = match self.wt {
                    Some(wt) => call.wt(wt),
                    None => call,
                };
                call.apply(Table::Plain(g.into_frame()))
            }
            other => {
                let df = other.into_frame();
                let value = match &self.wt {
                    None => Scalar::Int64(df.height() as i64),
                    Some(wt) => {
                        crate::expr::aggregate(crate::expr::AggFunc::Sum, &df.column(wt)?)?
                    }
                };
                let out =
                    DataFrame::new(vec![Series::from_scalar(self.name.clone(), &value, 1)?])?;
                Ok(Table::Plain(out))
            }
        }
    }
}

/// Like `count`, but attaches the per-group count to every row.
pub fn add_count(selection: impl Into<crate::selector::Collection>) -> AddCount {
    AddCount {
        inner: count(selection),
    }
}

/// The `add_count` verb builder.
#[derive(Clone, Debug)]
pub struct AddCount {
    inner: Count,
}

impl AddCount {
    /// Weight column: attach `sum(wt)` per group instead of row counts.
    pub fn wt(mut self, column: impl Into<String>) -> Self {
        self.inner = self.inner.wt(column);
        self
    }

    /// Sort rows by the attached count, largest first.
    pub fn sort(mut self, sort: bool) -> Self {
        self.inner = self.inner.sort(sort);
        self
    }

    /// Name of the attached column (default `n`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.name(name);
        self
    }
}

impl Verb for AddCount {
    type Output = Table;

    fn name(&self) -> &'static str {
        "add_count"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        let group_keys = table.group_vars().to_vec();
        let grouped = matches!(table, Table::Grouped(_));
        let df = table.into_frame();

        let counts = count_frame(
            df.clone(),
            &self.inner.selection,
            &self.inner.mutations,
            self.inner.wt.as_deref(),
            &self.inner.name,
        )?;
        let by: Vec<String> = counts
            .column_names()
            .into_iter()
            .filter(|c| c != &self.inner.name)
            .collect();

        let mut out = left_join(counts)
            .by(by)
            .apply(Table::Plain(df))?
            .into_frame();
        if self.inner.sort {
            out = arrange([desc(col(self.inner.name.clone()))])
                .apply(Table::Plain(out))?
                .into_frame();
        }

        if grouped {
            Ok(Table::Grouped(GroupedFrame::new(out, group_keys)?))
        } else {
            Ok(Table::Plain(out))
        }
    }
}

/// Like `tally`, but attaches the count to every row.
pub fn add_tally() -> AddTally {
    AddTally {
        wt: None,
        sort: false,
        name: "n".to_string(),
    }
}

/// The `add_tally` verb builder.
#[derive(Clone, Debug)]
pub struct AddTally {
    wt: Option<String>,
    sort: bool,
    name: String,
}

impl AddTally {
    /// Weight column: attach `sum(wt)` instead of row counts.
    pub fn wt(mut self, column: impl Into<String>) -> Self {
        self.wt = Some(column.into());
        self
    }

    /// Sort rows by the attached count, largest first.
    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Name of the attached column (default `n`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Verb for AddTally {
    type Output = Table;

    fn name(&self) -> &'static str {
        "add_tally"
    }

    fn context(&self) -> Context {
        Context::Select
    }

    fn apply(self, table: Table) -> Result<Table> {
        match table {
            Table::Grouped(g) => {
                let keys = g.keys().to_vec();
                let mut values = vec![Scalar::Null; g.frame().height()];
                for group in g.groups() {
                    let value = group_weight(&g, &group.rows, self.wt.as_deref())?;
                    for row in &group.rows {
                        values[*row] = value.clone();
                    }
                }
                let mut out = g
                    .frame()
                    .with_column(Series::from_scalars(self.name.clone(), &values)?)?;
                if self.sort {
                    out = arrange([desc(col(self.name.clone()))])
                        .apply(Table::Plain(out))?
                        .into_frame();
                }
                Ok(Table::Grouped(GroupedFrame::new(out, keys)?))
            }
            other => {
                let df = other.into_frame();
                let value = match &self.wt {
                    None => Scalar::Int64(df.height() as i64),
                    Some(wt) => {
                        crate::expr::aggregate(crate::expr::AggFunc::Sum, &df.column(wt)?)?
                    }
                };
                let out =
                    df.with_column(Series::from_scalar(self.name.clone(), &value, df.height())?)?;
                Ok(Table::Plain(out))
            }
        }
    }
}
