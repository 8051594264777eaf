use arrow::compute::{lexsort_to_indices, SortColumn, SortOptions};

use crate::across::Across;
use crate::dataframe::{DataFrame, GroupedFrame, Series, Table};
use crate::expr::{col, evaluate_series, Context, EvalCx, Expr};
use crate::selector::{repair_names, NameRepair};
use crate::verbs::Verb;
use crate::Result;

/// Order rows by the values of sort keys; wrap a key in
/// [`desc`](crate::expr::desc) for descending order.
pub fn arrange(keys: impl IntoIterator<Item = Expr>) -> Arrange {
    Arrange {
        keys: keys.into_iter().map(ArrangeKey::Expr).collect(),
        by_group: false,
    }
}

#[derive(Clone, Debug)]
enum ArrangeKey {
    Expr(Expr),
    Across { across: Across, descending: bool },
}

/// The `arrange` verb builder.
#[derive(Clone, Debug)]
pub struct Arrange {
    keys: Vec<ArrangeKey>,
    by_group: bool,
}

impl Arrange {
    /// Append another sort key.
    pub fn key(mut self, key: Expr) -> Self {
        self.keys.push(ArrangeKey::Expr(key));
        self
    }

    /// Sort by all columns an `Across` produces, ascending.
    pub fn across(mut self, across: Across) -> Self {
        self.keys.push(ArrangeKey::Across {
            across,
            descending: false,
        });
        self
    }

    /// Sort by all columns an `Across` produces, descending.
    pub fn across_desc(mut self, across: Across) -> Self {
        self.keys.push(ArrangeKey::Across {
            across,
            descending: true,
        });
        self
    }

    /// On grouped input, sort by the grouping keys first.
    pub fn by_group(mut self, by_group: bool) -> Self {
        self.by_group = by_group;
        self
    }
}

impl Verb for Arrange {
    type Output = Table;

    fn name(&self) -> &'static str {
        "arrange"
    }

    fn context(&self) -> Context {
        Context::Eval
    }

    fn apply(self, table: Table) -> Result<Table> {
        if self.keys.is_empty() {
            return Ok(table);
        }
        match table {
            Table::Plain(df) => Ok(Table::Plain(arrange_frame(&df, &self.keys)?)),
            Table::Rowwise(r) => {
                // row-wise tables sort like plain ones; the envelope survives
                let ids = r.id_cols().to_vec();
                let out = arrange_frame(r.frame(), &self.keys)?;
                Ok(Table::Rowwise(crate::dataframe::RowwiseFrame::new(
                    out, ids,
                )?))
            }
            Table::Grouped(g) => {
                let keys = g.keys().to_vec();
                let mut sort_keys: Vec<ArrangeKey> = Vec::new();
                if self.by_group {
                    sort_keys.extend(keys.iter().map(|k| ArrangeKey::Expr(col(k.clone()))));
                }
                sort_keys.extend(self.keys);
                let out = arrange_frame(g.frame(), &sort_keys)?;
                Ok(Table::Grouped(GroupedFrame::new(out, keys)?))
            }
        }
    }
}

fn arrange_frame(df: &DataFrame, keys: &[ArrangeKey]) -> Result<DataFrame> {
    repair_names(&df.column_names(), NameRepair::CheckUnique)?;

    let mut ordering: Vec<(Series, bool)> = Vec::new();
    for key in keys {
        match key {
            ArrangeKey::Expr(expr) => {
                let (expr, descending) = expr.clone().unwrap_desc();
                let mut cx = EvalCx::new(Context::Eval);
                let series = evaluate_series(&expr, df, &mut cx)?;
                ordering.push((series.broadcast(df.height())?, descending));
            }
            ArrangeKey::Across { across, descending } => {
                if across.has_fns() {
                    let frame = across.evaluate_frame(df)?;
                    for column in frame.columns() {
                        ordering.push((column.broadcast(df.height())?, *descending));
                    }
                } else {
                    for name in across.cols() {
                        ordering.push((df.column(name)?, *descending));
                    }
                }
            }
        }
    }

    if ordering.is_empty() {
        return Ok(df.clone());
    }

    let sort_columns: Vec<SortColumn> = ordering
        .iter()
        .map(|(series, descending)| SortColumn {
            values: series.array().clone(),
            options: Some(SortOptions {
                descending: *descending,
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
    use super::arrange;
    use crate::dataframe::{DataFrame, Series, Table};
    use crate::expr::{col, desc};
    use crate::verbs::{group_by, Verb};

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::int64("x", [2, 1, 3]),
            Series::utf8("g", ["b", "a", "a"]),
        ])
        .unwrap()
    }

    #[test]
    fn sorts_ascending_and_descending() {
        let out = arrange([col("x")])
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        assert_eq!(
            out.column("x").unwrap().i64_values().unwrap(),
            vec![Some(1), Some(2), Some(3)]
        );

        let out = arrange([desc(col("x"))])
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        assert_eq!(
            out.column("x").unwrap().i64_values().unwrap(),
            vec![Some(3), Some(2), Some(1)]
        );
    }

    #[test]
    fn multiple_keys_sort_lexicographically() {
        let out = arrange([col("g"), desc(col("x"))])
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        assert_eq!(
            out.column("x").unwrap().i64_values().unwrap(),
            vec![Some(3), Some(1), Some(2)]
        );
    }

    #[test]
    fn grouped_arrange_ignores_groups_unless_by_group() {
        let t = group_by("g").apply(Table::Plain(df())).unwrap();
        let out = arrange([col("x")]).apply(t.clone()).unwrap();
        assert_eq!(
            out.frame().column("x").unwrap().i64_values().unwrap(),
            vec![Some(1), Some(2), Some(3)]
        );

        let out = arrange([col("x")]).by_group(true).apply(t).unwrap();
        assert_eq!(
            out.frame().column("g").unwrap().str_values().unwrap(),
            vec![
                Some("a".to_string()),
                Some("a".to_string()),
                Some("b".to_string())
            ]
        );
    }

    #[test]
    fn duplicate_column_names_are_rejected() {
        let df = df();
        let dup = DataFrame::from_batch(
            arrow::record_batch::RecordBatch::try_new(
                arrow::datatypes::Schema::new(vec![
                    arrow::datatypes::Field::new("x", arrow::datatypes::DataType::Int64, true),
                    arrow::datatypes::Field::new("x", arrow::datatypes::DataType::Int64, true),
                ])
                .into(),
                vec![
                    df.column("x").unwrap().array().clone(),
                    df.column("x").unwrap().array().clone(),
                ],
            )
            .unwrap(),
        );
        let err = arrange([col("x")]).apply(Table::Plain(dup)).unwrap_err();
        assert!(matches!(err, crate::FrameError::NonUniqueName { .. }));
    }
}
