use std::collections::HashSet;

use arrow::compute::{lexsort_to_indices, SortColumn, SortOptions};

use crate::dataframe::{row_keys, DataFrame, Series, Table};
use crate::expr::Context;
use crate::selector::{repair_names, NameRepair};
use crate::verbs::{list_intersect, Verb};
use crate::{FrameError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SetOpKind {
    Intersect,
    Union,
    SetDiff,
}

/// Rows present in both tables (over the common columns unless `on` is
/// given), de-duplicated.
pub fn intersect(y: impl Into<DataFrame>) -> SetOp {
    SetOp::new(SetOpKind::Intersect, "intersect", y.into())
}

/// Rows present in either table, de-duplicated.
pub fn union(y: impl Into<DataFrame>) -> SetOp {
    SetOp::new(SetOpKind::Union, "union", y.into())
}

/// Rows of x absent from y, de-duplicated.
pub fn setdiff(y: impl Into<DataFrame>) -> SetOp {
    SetOp::new(SetOpKind::SetDiff, "setdiff", y.into())
}

/// The set-operation verb builder.
#[derive(Clone, Debug)]
pub struct SetOp {
    kind: SetOpKind,
    verb: &'static str,
    other: DataFrame,
    on: Option<Vec<String>>,
}

impl SetOp {
    fn new(kind: SetOpKind, verb: &'static str, other: DataFrame) -> Self {
        Self {
            kind,
            verb,
            other,
            on: None,
        }
    }

    /// Columns the operation is performed on (default: common columns).
    pub fn on<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.on = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

impl Verb for SetOp {
    type Output = Table;

    fn name(&self) -> &'static str {
        self.verb
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        let x = table.into_frame();
        let y = self.other;
        let on = match self.on {
            Some(on) => on,
            None => {
                let common = list_intersect(&x.column_names(), &y.column_names());
                if common.is_empty() {
                    return Err(FrameError::invalid_operation(
                        "no common columns for a set operation",
                    ));
                }
                common
            }
        };

        let x_keys = row_keys(&x, &on)?;
        let y_keys = row_keys(&y, &on)?;
        let y_set: HashSet<_> = y_keys.iter().cloned().collect();

        let mut seen = HashSet::new();
        let mut rows: Vec<usize> = Vec::new();
        for (row, key) in x_keys.iter().enumerate() {
            let wanted = match self.kind {
                SetOpKind::Intersect => y_set.contains(key),
                SetOpKind::Union => true,
                SetOpKind::SetDiff => !y_set.contains(key),
            };
            if wanted && seen.insert(key.clone()) {
                rows.push(row);
            }
        }
        let mut out = x.select_names(&on)?.take_indices(&rows)?;

        if self.kind == SetOpKind::Union {
            let mut extra: Vec<usize> = Vec::new();
            for (row, key) in y_keys.iter().enumerate() {
                if seen.insert(key.clone()) {
                    extra.push(row);
                }
            }
            let y_part = y.select_names(&on)?.take_indices(&extra)?;
            out = DataFrame::vstack(&[out, y_part])?;
        }

        Ok(Table::Plain(out))
    }
}

/// Append all rows of y (no de-duplication).
pub fn union_all(y: impl Into<DataFrame>) -> BindRows {
    BindRows {
        verb: "union_all",
        others: vec![y.into()],
    }
}

/// Bind the rows of the given frames below this table's rows.
pub fn bind_rows(others: impl IntoIterator<Item = DataFrame>) -> BindRows {
    BindRows {
        verb: "bind_rows",
        others: others.into_iter().collect(),
    }
}

/// The `bind_rows` / `union_all` verb builder.
#[derive(Clone, Debug)]
pub struct BindRows {
    verb: &'static str,
    others: Vec<DataFrame>,
}

impl Verb for BindRows {
    type Output = Table;

    fn name(&self) -> &'static str {
        self.verb
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        let mut frames = vec![table.into_frame()];
        frames.extend(self.others);
        Ok(Table::Plain(DataFrame::vstack(&frames)?))
    }
}

/// Bind the columns of the given frames to the right of this table's
/// columns; colliding names are repaired to be unique.
pub fn bind_cols(others: impl IntoIterator<Item = DataFrame>) -> BindCols {
    BindCols {
        others: others.into_iter().collect(),
    }
}

/// The `bind_cols` verb builder.
#[derive(Clone, Debug)]
pub struct BindCols {
    others: Vec<DataFrame>,
}

impl Verb for BindCols {
    type Output = Table;

    fn name(&self) -> &'static str {
        "bind_cols"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        let x = table.into_frame();
        let mut columns: Vec<Series> = x.columns();
        for other in &self.others {
            if other.height() != x.height() {
                return Err(FrameError::schema_mismatch(format!(
                    "cannot bind columns of height {} to a table of height {}",
                    other.height(),
                    x.height()
                )));
            }
            columns.extend(other.columns());
        }

        let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
        let repaired = repair_names(&names, NameRepair::Unique)?;
        let columns = columns
            .into_iter()
            .zip(repaired)
            .map(|(c, name)| c.rename(name))
            .collect();
        Ok(Table::Plain(DataFrame::new(columns)?))
    }
}

/// Whether two tables hold the same rows, ignoring row order.
pub fn setequal(y: impl Into<DataFrame>) -> SetEqual {
    SetEqual { other: y.into() }
}

/// The `setequal` verb builder.
#[derive(Clone, Debug)]
pub struct SetEqual {
    other: DataFrame,
}

impl Verb for SetEqual {
    type Output = bool;

    fn name(&self) -> &'static str {
        "setequal"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<bool> {
        let x = table.into_frame();
        let y = self.other;

        let x_names = x.column_names();
        let mut y_names = y.column_names();
        y_names.sort();
        let mut sorted_x_names = x_names.clone();
        sorted_x_names.sort();
        if sorted_x_names != y_names {
            return Ok(false);
        }

        let y = y.select_names(&x_names)?;
        Ok(sort_by_all(&x)?.content_eq(&sort_by_all(&y)?))
    }
}

fn sort_by_all(df: &DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Ok(df.clone());
    }
    let sort_columns: Vec<SortColumn> = df
        .columns()
        .into_iter()
        .map(|c| SortColumn {
            values: c.array().clone(),
            options: Some(SortOptions {
                descending: false,
                nulls_first: false,
            }),
        })
        .collect();
    let indices = lexsort_to_indices(&sort_columns, None)?;
    let positions: Vec<usize> = indices.values().iter().map(|i| *i as usize).collect();
    df.take_indices(&positions)
}

#[cfg(test)]
mod tests {
    use super::{bind_cols, bind_rows, intersect, setdiff, setequal, union, union_all};
    use crate::dataframe::{DataFrame, Series, Table};
    use crate::verbs::Verb;

    fn x() -> DataFrame {
        DataFrame::new(vec![Series::int64("v", [1, 2, 2, 3])]).unwrap()
    }

    fn y() -> DataFrame {
        DataFrame::new(vec![Series::int64("v", [2, 3, 4])]).unwrap()
    }

    #[test]
    fn set_operations_deduplicate() {
        let out = intersect(y()).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(
            out.column("v").unwrap().i64_values().unwrap(),
            vec![Some(2), Some(3)]
        );

        let out = setdiff(y()).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(
            out.column("v").unwrap().i64_values().unwrap(),
            vec![Some(1)]
        );

        let out = union(y()).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(
            out.column("v").unwrap().i64_values().unwrap(),
            vec![Some(1), Some(2), Some(3), Some(4)]
        );
    }

    #[test]
    fn union_all_keeps_duplicates() {
        let out = union_all(y()).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(out.height(), 7);
    }

    #[test]
    fn setequal_ignores_row_order() {
        let a = DataFrame::new(vec![Series::int64("v", [1, 2, 3])]).unwrap();
        let b = DataFrame::new(vec![Series::int64("v", [3, 1, 2])]).unwrap();
        assert!(setequal(b).apply(Table::Plain(a.clone())).unwrap());

        let c = DataFrame::new(vec![Series::int64("v", [1, 2])]).unwrap();
        assert!(!setequal(c).apply(Table::Plain(a)).unwrap());
    }

    #[test]
    fn bind_rows_stacks_and_bind_cols_repairs_names() {
        let out = bind_rows([y()]).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(out.height(), 7);

        let left = DataFrame::new(vec![Series::int64("v", [1, 2])]).unwrap();
        let right = DataFrame::new(vec![Series::int64("v", [3, 4])]).unwrap();
        let out = bind_cols([right]).apply(Table::Plain(left)).unwrap().into_frame();
        assert_eq!(out.column_names(), vec!["v__0", "v__1"]);
    }
}
