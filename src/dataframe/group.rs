use std::collections::HashMap;

use arrow::array::{Array, BooleanArray};

use crate::dataframe::{DataFrame, Series};
use crate::expr::Scalar;
use crate::{FrameError, Result};

/// Hashable per-row key used for grouping, joins and distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeyValue {
    Null,
    Boolean(bool),
    Int(i64),
    Float(u64),
    Utf8(String),
}

impl From<&Scalar> for KeyValue {
    fn from(s: &Scalar) -> Self {
        match s {
            Scalar::Null => KeyValue::Null,
            Scalar::Boolean(b) => KeyValue::Boolean(*b),
            Scalar::Int64(i) => KeyValue::Int(*i),
            Scalar::Float64(f) => KeyValue::Float(f.to_bits()),
            Scalar::Utf8(s) => KeyValue::Utf8(s.clone()),
        }
    }
}

/// Compute one hashable key per row over `columns` of `df`.
pub(crate) fn row_keys(df: &DataFrame, columns: &[String]) -> Result<Vec<Vec<KeyValue>>> {
    let series = columns
        .iter()
        .map(|c| df.column(c))
        .collect::<Result<Vec<_>>>()?;
    let mut keys = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let key = series
            .iter()
            .map(|s| s.scalar_at(row).map(|v| KeyValue::from(&v)))
            .collect::<Result<Vec<_>>>()?;
        keys.push(key);
    }
    Ok(keys)
}

/// One group: its key values (aligned to the grouping columns) and the row
/// positions belonging to it.
#[derive(Debug, Clone)]
pub struct Group {
    /// Key scalar per grouping column.
    pub key: Vec<Scalar>,
    /// Row positions in the underlying frame, in original order.
    pub rows: Vec<usize>,
}

/// A frame tagged with an ordered list of grouping-key columns.
///
/// Group membership is computed at construction in first-seen key order and
/// recomputed whenever grouping columns change; it is never carried stale.
#[derive(Debug, Clone)]
pub struct GroupedFrame {
    df: DataFrame,
    keys: Vec<String>,
    groups: Vec<Group>,
}

impl GroupedFrame {
    /// Group `df` by `keys`, which must name existing columns.
    pub fn new(df: DataFrame, keys: Vec<String>) -> Result<Self> {
        for k in &keys {
            if !df.has_column(k) {
                return Err(FrameError::column_not_found(k.clone()));
            }
        }

        let hashed = row_keys(&df, &keys)?;
        let key_series = keys
            .iter()
            .map(|k| df.column(k))
            .collect::<Result<Vec<_>>>()?;

        let mut index: HashMap<Vec<KeyValue>, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();
        for (row, key) in hashed.into_iter().enumerate() {
            match index.get(&key) {
                Some(&g) => groups[g].rows.push(row),
                None => {
                    let scalars = key_series
                        .iter()
                        .map(|s| s.scalar_at(row))
                        .collect::<Result<Vec<_>>>()?;
                    index.insert(key, groups.len());
                    groups.push(Group {
                        key: scalars,
                        rows: vec![row],
                    });
                }
            }
        }

        Ok(Self { df, keys, groups })
    }

    /// Attach a declared group list (possibly containing empty groups), used
    /// by `filter(_preserve = true)`.
    pub(crate) fn with_declared_groups(
        df: DataFrame,
        keys: Vec<String>,
        groups: Vec<Group>,
    ) -> Self {
        Self { df, keys, groups }
    }

    /// The underlying frame.
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Discard the envelope, returning the frame unchanged.
    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    /// Grouping-key column names, in order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Groups in first-seen key order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Materialize one group's rows as a standalone frame.
    pub fn subframe(&self, group: &Group) -> Result<DataFrame> {
        self.df.take_indices(&group.rows)
    }

    /// One row per group key combination.
    pub fn key_frame(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.keys.len());
        for (i, key) in self.keys.iter().enumerate() {
            let values: Vec<Scalar> = self.groups.iter().map(|g| g.key[i].clone()).collect();
            columns.push(Series::from_scalars(key.clone(), &values)?);
        }
        DataFrame::new(columns)
    }

    /// Apply a length-preserving transformation to every group and scatter
    /// the results back to the original row order.
    pub(crate) fn apply_transform(
        &self,
        f: impl Fn(&DataFrame) -> Result<DataFrame>,
    ) -> Result<DataFrame> {
        let mut parts = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let sub = self.subframe(group)?;
            let out = f(&sub)?;
            if out.height() != group.rows.len() {
                return Err(FrameError::invalid_operation(format!(
                    "grouped transformation changed group height: {} -> {}",
                    group.rows.len(),
                    out.height()
                )));
            }
            parts.push(out);
        }

        let stacked = DataFrame::vstack(&parts)?;
        let mut positions = vec![0_usize; self.df.height()];
        for (stacked_row, original_row) in self
            .groups
            .iter()
            .flat_map(|g| g.rows.iter())
            .enumerate()
        {
            positions[*original_row] = stacked_row;
        }
        stacked.take_indices(&positions)
    }

    /// Evaluate a per-group boolean mask and scatter it to original row order.
    pub(crate) fn apply_mask(
        &self,
        f: impl Fn(&DataFrame) -> Result<BooleanArray>,
    ) -> Result<BooleanArray> {
        let mut out = vec![Some(false); self.df.height()];
        for group in &self.groups {
            let sub = self.subframe(group)?;
            let mask = f(&sub)?;
            if mask.len() != group.rows.len() {
                return Err(FrameError::invalid_operation(format!(
                    "grouped predicate changed group height: {} -> {}",
                    group.rows.len(),
                    mask.len()
                )));
            }
            for (local, original) in group.rows.iter().enumerate() {
                out[*original] = Some(!mask.is_null(local) && mask.value(local));
            }
        }
        Ok(BooleanArray::from(out))
    }

    /// Apply a collapsing computation per group, prepending the group-key
    /// columns to each part, and stack results in first-seen group order.
    pub(crate) fn apply_collect(
        &self,
        f: impl Fn(&DataFrame) -> Result<DataFrame>,
    ) -> Result<DataFrame> {
        let mut parts = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let sub = self.subframe(group)?;
            let body = f(&sub)?;
            let mut columns = Vec::with_capacity(self.keys.len() + body.width());
            for (i, key) in self.keys.iter().enumerate() {
                columns.push(Series::from_scalar(
                    key.clone(),
                    &group.key[i],
                    body.height(),
                )?);
            }
            columns.extend(body.columns());
            parts.push(DataFrame::new(columns)?);
        }
        DataFrame::vstack(&parts)
    }
}

/// A frame where every row is its own group, optionally preserving named
/// identity columns for `summarise`.
#[derive(Debug, Clone)]
pub struct RowwiseFrame {
    df: DataFrame,
    id_cols: Vec<String>,
}

impl RowwiseFrame {
    /// Tag `df` as row-wise; `id_cols` must name existing columns.
    pub fn new(df: DataFrame, id_cols: Vec<String>) -> Result<Self> {
        for c in &id_cols {
            if !df.has_column(c) {
                return Err(FrameError::column_not_found(c.clone()));
            }
        }
        Ok(Self { df, id_cols })
    }

    /// The underlying frame.
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Discard the envelope, returning the frame unchanged.
    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    /// Identity columns preserved by `summarise`.
    pub fn id_cols(&self) -> &[String] {
        &self.id_cols
    }
}

#[cfg(test)]
mod tests {
    use super::GroupedFrame;
    use crate::dataframe::{DataFrame, Series};
    use crate::expr::Scalar;

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::int64("x", [3, 1, 2]),
            Series::utf8("g", ["a", "a", "b"]),
        ])
        .unwrap()
    }

    #[test]
    fn groups_form_in_first_seen_order() {
        let g = GroupedFrame::new(df(), vec!["g".to_string()]).unwrap();
        assert_eq!(g.groups().len(), 2);
        assert_eq!(g.groups()[0].key, vec![Scalar::Utf8("a".to_string())]);
        assert_eq!(g.groups()[0].rows, vec![0, 1]);
        assert_eq!(g.groups()[1].rows, vec![2]);
    }

    #[test]
    fn apply_transform_restores_original_row_order() {
        let g = GroupedFrame::new(df(), vec!["g".to_string()]).unwrap();
        let out = g
            .apply_transform(|sub| {
                // reverse each group; the scatter maps part rows back onto the
                // group's original row slots positionally
                let idx: Vec<usize> = (0..sub.height()).rev().collect();
                sub.take_indices(&idx)
            })
            .unwrap();
        assert_eq!(
            out.column("x").unwrap().i64_values().unwrap(),
            vec![Some(1), Some(3), Some(2)]
        );
    }

    #[test]
    fn key_frame_lists_one_row_per_group() {
        let g = GroupedFrame::new(df(), vec!["g".to_string()]).unwrap();
        let keys = g.key_frame().unwrap();
        assert_eq!(keys.height(), 2);
        assert_eq!(
            keys.column("g").unwrap().str_values().unwrap(),
            vec![Some("a".to_string()), Some("b".to_string())]
        );
    }
}
