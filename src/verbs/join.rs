use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, ListArray, StructArray, UInt32Array};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, Fields};

use crate::dataframe::{row_keys, DataFrame, KeyValue, Series, Table};
use crate::expr::Context;
use crate::verbs::{list_diff, list_intersect, Verb};
use crate::{FrameError, Result};

/// How join keys pair up between the two tables.
#[derive(Clone, Debug)]
pub enum JoinBy {
    /// Key columns shared by name.
    Cols(Vec<String>),
    /// Left-name to right-name pairs for differently named keys.
    Map(Vec<(String, String)>),
}

/// Which rows a mutating join retains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    /// Rows matched in both tables.
    Inner,
    /// All rows of the left table.
    Left,
    /// All rows of the right table.
    Right,
    /// All rows of either table.
    Full,
}

/// Mutating join keeping rows matched in both tables.
pub fn inner_join(y: impl Into<DataFrame>) -> Join {
    Join::new(JoinKind::Inner, "inner_join", y.into())
}

/// Mutating join keeping all rows of the left table.
pub fn left_join(y: impl Into<DataFrame>) -> Join {
    Join::new(JoinKind::Left, "left_join", y.into())
}

/// Mutating join keeping all rows of the right table.
pub fn right_join(y: impl Into<DataFrame>) -> Join {
    Join::new(JoinKind::Right, "right_join", y.into())
}

/// Mutating join keeping all rows of either table.
pub fn full_join(y: impl Into<DataFrame>) -> Join {
    Join::new(JoinKind::Full, "full_join", y.into())
}

/// The mutating-join verb builder.
#[derive(Clone, Debug)]
pub struct Join {
    kind: JoinKind,
    verb: &'static str,
    other: DataFrame,
    by: Option<JoinBy>,
    suffix: (String, String),
    keep: bool,
}

impl Join {
    fn new(kind: JoinKind, verb: &'static str, other: DataFrame) -> Self {
        Self {
            kind,
            verb,
            other,
            by: None,
            suffix: ("_x".to_string(), "_y".to_string()),
            keep: false,
        }
    }

    /// Join by these shared key names (default: all common columns).
    pub fn by<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.by = Some(JoinBy::Cols(keys.into_iter().map(Into::into).collect()));
        self
    }

    /// Join differently named keys: `(left, right)` pairs.
    pub fn by_map<L: Into<String>, R: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (L, R)>,
    ) -> Self {
        self.by = Some(JoinBy::Map(
            pairs
                .into_iter()
                .map(|(l, r)| (l.into(), r.into()))
                .collect(),
        ));
        self
    }

    /// Suffixes disambiguating colliding non-key columns.
    pub fn suffix(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.suffix = (left.into(), right.into());
        self
    }

    /// Keep the right-side key columns when keys are differently named.
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }
}

impl Verb for Join {
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

        let (pairs, shared) = key_pairs(&x, &y, self.by.as_ref())?;
        let left_keys: Vec<String> = pairs.iter().map(|(l, _)| l.clone()).collect();
        let right_keys: Vec<String> = pairs.iter().map(|(_, r)| r.clone()).collect();

        let matches = match_rows(&x, &y, &left_keys, &right_keys, self.kind)?;

        // output key columns: from x, filled from y where only y matched
        let mut columns: Vec<Series> = Vec::new();
        if shared {
            for (l, r) in &pairs {
                let xs = x.column(l)?;
                let ys = y.column(r)?;
                let values = matches
                    .iter()
                    .map(|(li, ri)| match (li, ri) {
                        (Some(li), _) => xs.scalar_at(*li),
                        (None, Some(ri)) => ys.scalar_at(*ri),
                        (None, None) => unreachable!("a join row matches at least one side"),
                    })
                    .collect::<Result<Vec<_>>>()?;
                columns.push(Series::from_scalars(l.clone(), &values)?);
            }
        } else {
            for l in &left_keys {
                columns.push(take_opt(
                    &x.column(l)?,
                    matches.iter().map(|(li, _)| *li),
                )?);
            }
        }

        let x_rest = list_diff(&x.column_names(), &left_keys);
        let mut y_rest = list_diff(&y.column_names(), &right_keys);
        if !shared && self.keep {
            y_rest = y.column_names();
        }

        let overlap: Vec<String> = list_intersect(&x_rest, &y_rest);
        for name in &x_rest {
            let series = take_opt(&x.column(name)?, matches.iter().map(|(li, _)| *li))?;
            let out_name = if overlap.contains(name) {
                format!("{name}{}", self.suffix.0)
            } else {
                name.clone()
            };
            columns.push(series.rename(out_name));
        }
        for name in &y_rest {
            let series = take_opt(&y.column(name)?, matches.iter().map(|(_, ri)| *ri))?;
            let out_name = if overlap.contains(name) {
                format!("{name}{}", self.suffix.1)
            } else {
                name.clone()
            };
            columns.push(series.rename(out_name));
        }

        Ok(Table::Plain(DataFrame::from_series_unchecked(columns)?))
    }
}

/// Filtering join keeping rows of x with (semi) or without (anti) a match.
pub fn semi_join(y: impl Into<DataFrame>) -> SemiJoin {
    SemiJoin {
        other: y.into(),
        by: None,
        anti: false,
        verb: "semi_join",
    }
}

/// Filtering join keeping rows of x without a match in y.
pub fn anti_join(y: impl Into<DataFrame>) -> SemiJoin {
    SemiJoin {
        other: y.into(),
        by: None,
        anti: true,
        verb: "anti_join",
    }
}

/// The filtering-join verb builder.
#[derive(Clone, Debug)]
pub struct SemiJoin {
    other: DataFrame,
    by: Option<JoinBy>,
    anti: bool,
    verb: &'static str,
}

impl SemiJoin {
    /// Join by these shared key names (default: all common columns).
    pub fn by<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.by = Some(JoinBy::Cols(keys.into_iter().map(Into::into).collect()));
        self
    }

    /// Join differently named keys: `(left, right)` pairs.
    pub fn by_map<L: Into<String>, R: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (L, R)>,
    ) -> Self {
        self.by = Some(JoinBy::Map(
            pairs
                .into_iter()
                .map(|(l, r)| (l.into(), r.into()))
                .collect(),
        ));
        self
    }
}

impl Verb for SemiJoin {
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
        let (pairs, _) = key_pairs(&x, &y, self.by.as_ref())?;
        let left_keys: Vec<String> = pairs.iter().map(|(l, _)| l.clone()).collect();
        let right_keys: Vec<String> = pairs.iter().map(|(_, r)| r.clone()).collect();

        let right: std::collections::HashSet<_> =
            row_keys(&y, &right_keys)?.into_iter().collect();
        let keep: Vec<usize> = row_keys(&x, &left_keys)?
            .into_iter()
            .enumerate()
            .filter(|(_, key)| right.contains(key) != self.anti)
            .map(|(row, _)| row)
            .collect();
        Ok(Table::Plain(x.take_indices(&keep)?))
    }
}

/// Join keeping all rows and columns of x, with matches from y nested in a
/// `List<Struct>` column.
pub fn nest_join(y: impl Into<DataFrame>) -> NestJoin {
    NestJoin {
        other: y.into(),
        by: None,
        name: "data".to_string(),
        keep: false,
    }
}

/// The `nest_join` verb builder.
#[derive(Clone, Debug)]
pub struct NestJoin {
    other: DataFrame,
    by: Option<JoinBy>,
    name: String,
    keep: bool,
}

impl NestJoin {
    /// Join by these shared key names (default: all common columns).
    pub fn by<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.by = Some(JoinBy::Cols(keys.into_iter().map(Into::into).collect()));
        self
    }

    /// Name of the nested column (default `data`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Keep the key columns inside the nested frames.
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }
}

impl Verb for NestJoin {
    type Output = Table;

    fn name(&self) -> &'static str {
        "nest_join"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        let x = table.into_frame();
        let y = self.other;
        let (pairs, _) = key_pairs(&x, &y, self.by.as_ref())?;
        let left_keys: Vec<String> = pairs.iter().map(|(l, _)| l.clone()).collect();
        let right_keys: Vec<String> = pairs.iter().map(|(_, r)| r.clone()).collect();

        let mut index: HashMap<Vec<KeyValue>, Vec<usize>> = HashMap::new();
        for (row, key) in row_keys(&y, &right_keys)?.into_iter().enumerate() {
            index.entry(key).or_default().push(row);
        }

        let matched: Vec<Vec<usize>> = row_keys(&x, &left_keys)?
            .into_iter()
            .map(|key| index.get(&key).cloned().unwrap_or_default())
            .collect();

        let nested_cols = if self.keep {
            y.column_names()
        } else {
            list_diff(&y.column_names(), &right_keys)
        };

        let flat: Vec<usize> = matched.iter().flatten().copied().collect();
        let fields: Fields = nested_cols
            .iter()
            .map(|n| {
                y.column(n)
                    .map(|c| Arc::new(Field::new(n, c.dtype(), true)))
            })
            .collect::<Result<Vec<_>>>()?
            .into();
        let child: ArrayRef = if fields.is_empty() {
            Arc::new(StructArray::new_empty_fields(flat.len(), None))
        } else {
            let arrays = nested_cols
                .iter()
                .map(|n| y.column(n)?.take(&flat).map(|s| s.array().clone()))
                .collect::<Result<Vec<_>>>()?;
            Arc::new(StructArray::new(fields.clone(), arrays, None))
        };

        let list = ListArray::new(
            Arc::new(Field::new("item", DataType::Struct(fields), true)),
            OffsetBuffer::from_lengths(matched.iter().map(|m| m.len())),
            child,
            None,
        );

        let mut columns = x.columns();
        columns.push(Series::new(self.name, Arc::new(list)));
        Ok(Table::Plain(DataFrame::from_series_unchecked(columns)?))
    }
}

/// Resolve the key pairing; `None` joins on all common columns.
fn key_pairs(
    x: &DataFrame,
    y: &DataFrame,
    by: Option<&JoinBy>,
) -> Result<(Vec<(String, String)>, bool)> {
    let pairs = match by {
        None => {
            let common = list_intersect(&x.column_names(), &y.column_names());
            if common.is_empty() {
                return Err(FrameError::invalid_operation(
                    "no common columns to join by",
                ));
            }
            (common.into_iter().map(|c| (c.clone(), c)).collect(), true)
        }
        Some(JoinBy::Cols(keys)) => (
            keys.iter().map(|k| (k.clone(), k.clone())).collect(),
            true,
        ),
        Some(JoinBy::Map(pairs)) => (pairs.clone(), false),
    };
    for (l, r) in &pairs.0 {
        if !x.has_column(l) {
            return Err(FrameError::column_not_found(l.clone()));
        }
        if !y.has_column(r) {
            return Err(FrameError::column_not_found(r.clone()));
        }
    }
    Ok(pairs)
}

/// Pair up row indices for a mutating join.
fn match_rows(
    x: &DataFrame,
    y: &DataFrame,
    left_keys: &[String],
    right_keys: &[String],
    kind: JoinKind,
) -> Result<Vec<(Option<usize>, Option<usize>)>> {
    let mut index: HashMap<Vec<KeyValue>, Vec<usize>> = HashMap::new();
    for (row, key) in row_keys(y, right_keys)?.into_iter().enumerate() {
        index.entry(key).or_default().push(row);
    }

    let mut out = Vec::new();
    let mut right_matched = vec![false; y.height()];
    for (row, key) in row_keys(x, left_keys)?.into_iter().enumerate() {
        match index.get(&key) {
            Some(rights) => {
                for ri in rights {
                    right_matched[*ri] = true;
                    out.push((Some(row), Some(*ri)));
                }
            }
            None => {
                if matches!(kind, JoinKind::Left | JoinKind::Full) {
                    out.push((Some(row), None));
                }
            }
        }
    }
    if matches!(kind, JoinKind::Right | JoinKind::Full) {
        for (ri, matched) in right_matched.iter().enumerate() {
            if !matched {
                out.push((None, Some(ri)));
            }
        }
    }
    Ok(out)
}

/// Take with optional indices; `None` yields null.
fn take_opt(series: &Series, indices: impl Iterator<Item = Option<usize>>) -> Result<Series> {
    let idx = UInt32Array::from_iter(indices.map(|i| i.map(|i| i as u32)));
    let array = arrow::compute::take(series.array().as_ref(), &idx, None)?;
    Ok(Series::new(series.name().to_string(), array))
}

#[cfg(test)]
mod tests {
    use super::{anti_join, full_join, inner_join, left_join, nest_join, right_join, semi_join};
    use crate::dataframe::{DataFrame, Series, Table};
    use crate::verbs::Verb;

    fn x() -> DataFrame {
        DataFrame::new(vec![
            Series::utf8("k", ["a", "b", "c"]),
            Series::int64("vx", [1, 2, 3]),
        ])
        .unwrap()
    }

    fn y() -> DataFrame {
        DataFrame::new(vec![
            Series::utf8("k", ["a", "a", "b", "d"]),
            Series::int64("vy", [10, 11, 20, 40]),
        ])
        .unwrap()
    }

    #[test]
    fn inner_join_matches_on_common_columns() {
        let out = inner_join(y()).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(out.column_names(), vec!["k", "vx", "vy"]);
        assert_eq!(
            out.column("vy").unwrap().i64_values().unwrap(),
            vec![Some(10), Some(11), Some(20)]
        );
    }

    #[test]
    fn left_join_fills_unmatched_with_null() {
        let out = left_join(y()).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(
            out.column("vy").unwrap().i64_values().unwrap(),
            vec![Some(10), Some(11), Some(20), None]
        );
    }

    #[test]
    fn right_and_full_join_keep_right_rows() {
        let out = right_join(y()).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(out.height(), 4);
        assert_eq!(
            out.column("k").unwrap().str_values().unwrap().last().unwrap(),
            &Some("d".to_string())
        );

        let out = full_join(y()).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(out.height(), 5);
    }

    #[test]
    fn join_suffixes_colliding_columns() {
        let x = DataFrame::new(vec![
            Series::utf8("k", ["a"]),
            Series::int64("v", [1]),
        ])
        .unwrap();
        let y = DataFrame::new(vec![
            Series::utf8("k", ["a"]),
            Series::int64("v", [2]),
        ])
        .unwrap();
        let out = inner_join(y)
            .by(["k"])
            .apply(Table::Plain(x))
            .unwrap()
            .into_frame();
        assert_eq!(out.column_names(), vec!["k", "v_x", "v_y"]);
    }

    #[test]
    fn by_map_drops_right_keys_unless_keep() {
        let y = DataFrame::new(vec![
            Series::utf8("kk", ["a", "b"]),
            Series::int64("vy", [10, 20]),
        ])
        .unwrap();
        let out = inner_join(y.clone())
            .by_map([("k", "kk")])
            .apply(Table::Plain(x()))
            .unwrap()
            .into_frame();
        assert_eq!(out.column_names(), vec!["k", "vx", "vy"]);

        let out = inner_join(y)
            .by_map([("k", "kk")])
            .keep(true)
            .apply(Table::Plain(x()))
            .unwrap()
            .into_frame();
        assert_eq!(out.column_names(), vec!["k", "vx", "kk", "vy"]);
    }

    #[test]
    fn semi_and_anti_join_filter_by_membership() {
        let out = semi_join(y()).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(
            out.column("k").unwrap().str_values().unwrap(),
            vec![Some("a".to_string()), Some("b".to_string())]
        );

        let out = anti_join(y()).apply(Table::Plain(x())).unwrap().into_frame();
        assert_eq!(
            out.column("k").unwrap().str_values().unwrap(),
            vec![Some("c".to_string())]
        );
    }

    #[test]
    fn nest_join_packs_matches_per_row() {
        let out = nest_join(y())
            .name("ys")
            .apply(Table::Plain(x()))
            .unwrap()
            .into_frame();
        assert_eq!(out.height(), 3);
        let nested = out.column("ys").unwrap();
        let list = nested
            .array()
            .as_any()
            .downcast_ref::<arrow::array::ListArray>()
            .unwrap();
        assert_eq!(list.value(0).len(), 2);
        assert_eq!(list.value(1).len(), 1);
        assert_eq!(list.value(2).len(), 0);
    }
}
