use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{new_null_array, ArrayRef, BooleanArray};
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::dataframe::Series;
use crate::{FrameError, Result};

/// An eager table backed by a single Arrow `RecordBatch`.
///
/// Columns are ordered and share one length. Construction through
/// [`DataFrame::new`] requires unique column names; frames assembled through
/// rename/suffix paths may transiently carry duplicates, which verbs that
/// need uniqueness (e.g. `arrange`) reject.
#[derive(Debug, Clone)]
pub struct DataFrame {
    schema: SchemaRef,
    batch: RecordBatch,
}

impl DataFrame {
    /// Construct a `DataFrame` from a list of `Series`.
    pub fn new(columns: Vec<Series>) -> Result<Self> {
        if columns.is_empty() {
            return Ok(Self::empty());
        }

        let mut seen_names = HashSet::with_capacity(columns.len());
        for c in &columns {
            if !seen_names.insert(c.name().to_string()) {
                return Err(FrameError::schema_mismatch(format!(
                    "duplicate column name '{}'",
                    c.name()
                )));
            }
        }

        let expected_len = columns[0].len();
        for c in &columns[1..] {
            if c.len() != expected_len {
                return Err(FrameError::schema_mismatch(format!(
                    "column length mismatch: '{}' has length {}, expected {}",
                    c.name(),
                    c.len(),
                    expected_len
                )));
            }
        }

        Self::from_series_unchecked(columns)
    }

    /// Construct from series without the uniqueness check (internal paths
    /// that may legitimately carry duplicate names, e.g. join suffixing).
    pub(crate) fn from_series_unchecked(columns: Vec<Series>) -> Result<Self> {
        let fields: Vec<Field> = columns
            .iter()
            .map(|c| Field::new(c.name(), c.dtype(), true))
            .collect();
        let schema: SchemaRef = Arc::new(Schema::new(fields));
        let arrays: Vec<ArrayRef> = columns.iter().map(|c| c.array().clone()).collect();

        let batch = RecordBatch::try_new(schema.clone(), arrays).map_err(|e| {
            FrameError::schema_mismatch(format!("failed to build RecordBatch: {e}"))
        })?;

        Ok(Self { schema, batch })
    }

    /// Construct a `DataFrame` from an Arrow record batch.
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batch,
        }
    }

    /// Return an empty `DataFrame` (no columns, no rows).
    pub fn empty() -> Self {
        let schema: SchemaRef = Arc::new(Schema::empty());
        Self {
            schema: schema.clone(),
            batch: RecordBatch::new_empty(schema),
        }
    }

    /// Return the number of rows.
    pub fn height(&self) -> usize {
        self.batch.num_rows()
    }

    /// Return the number of columns.
    pub fn width(&self) -> usize {
        self.schema.fields().len()
    }

    /// Return the Arrow schema.
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    /// Whether a column with `name` exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.schema.fields().iter().any(|f| f.name() == name)
    }

    /// Get a column by name (first match, case-sensitive).
    pub fn column(&self, name: &str) -> Result<Series> {
        let idx = self
            .schema
            .fields()
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| FrameError::column_not_found(name.to_string()))?;
        Ok(self.column_at(idx))
    }

    /// Get a column by position.
    pub fn column_at(&self, idx: usize) -> Series {
        Series::new(
            self.schema.fields()[idx].name().to_string(),
            self.batch.column(idx).clone(),
        )
    }

    /// Return all columns in order.
    pub fn columns(&self) -> Vec<Series> {
        (0..self.width()).map(|i| self.column_at(i)).collect()
    }

    /// Return the underlying Arrow batch.
    pub fn to_arrow(&self) -> RecordBatch {
        self.batch.clone()
    }

    /// Project to the given column names, in the given order.
    ///
    /// Duplicate requests resolve to the same underlying column once (Arrow
    /// schemas are name-unique at this boundary).
    pub fn select_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut out = Vec::with_capacity(names.len());
        let mut seen = HashSet::new();
        for name in names {
            if seen.insert(name.as_ref().to_string()) {
                out.push(self.column(name.as_ref())?);
            }
        }
        Self::new(out)
    }

    /// Replace a column by name or append it at the right-hand side.
    pub fn with_column(&self, series: Series) -> Result<Self> {
        let mut columns = self.columns();
        if let Some(idx) = columns.iter().position(|c| c.name() == series.name()) {
            columns[idx] = series;
        } else {
            columns.push(series);
        }
        Self::from_series_unchecked(columns)
    }

    /// Drop a column by name.
    pub fn drop_column(&self, name: &str) -> Result<Self> {
        if !self.has_column(name) {
            return Err(FrameError::column_not_found(name.to_string()));
        }
        let columns = self
            .columns()
            .into_iter()
            .filter(|c| c.name() != name)
            .collect();
        Self::from_series_unchecked(columns)
    }

    /// Rename columns via `(old, new)` pairs; names absent from the frame are
    /// ignored, matching last-wins rename semantics at the verb layer.
    pub fn rename(&self, pairs: &[(String, String)]) -> Result<Self> {
        let columns = self
            .columns()
            .into_iter()
            .map(|c| {
                match pairs.iter().rev().find(|(old, _)| old == c.name()) {
                    Some((_, new)) => c.rename(new.clone()),
                    None => c,
                }
            })
            .collect();
        Self::from_series_unchecked(columns)
    }

    /// Reindex rows by position.
    pub fn take_indices(&self, indices: &[usize]) -> Result<Self> {
        let columns = self
            .columns()
            .into_iter()
            .map(|c| c.take(indices))
            .collect::<Result<Vec<_>>>()?;
        Self::from_series_unchecked(columns)
    }

    /// Keep rows where `mask` is true (nulls excluded).
    pub fn filter_mask(&self, mask: &BooleanArray) -> Result<Self> {
        let batch = arrow::compute::filter_record_batch(&self.batch, mask)?;
        Ok(Self::from_batch(batch))
    }

    /// Stack frames vertically.
    ///
    /// Columns are aligned by name in first-seen order; a column missing from
    /// a frame is filled with nulls, and dtypes of shared columns must match.
    pub fn vstack(frames: &[DataFrame]) -> Result<Self> {
        let frames: Vec<&DataFrame> = frames.iter().filter(|f| f.width() > 0).collect();
        if frames.is_empty() {
            return Ok(Self::empty());
        }

        let mut names: Vec<String> = Vec::new();
        for f in &frames {
            for n in f.column_names() {
                if !names.iter().any(|x| *x == n) {
                    names.push(n);
                }
            }
        }

        let mut out = Vec::with_capacity(names.len());
        for name in &names {
            let dtype = frames
                .iter()
                .find_map(|f| f.column(name).ok().map(|c| c.dtype()))
                .ok_or_else(|| FrameError::column_not_found(name.clone()))?;
            let mut parts: Vec<ArrayRef> = Vec::with_capacity(frames.len());
            for f in &frames {
                match f.column(name) {
                    Ok(c) => {
                        if c.dtype() != dtype {
                            return Err(FrameError::type_mismatch(
                                Some(name.clone()),
                                dtype.to_string(),
                                c.dtype().to_string(),
                            ));
                        }
                        parts.push(c.array().clone());
                    }
                    Err(_) => parts.push(new_null_array(&dtype, f.height())),
                }
            }
            let refs: Vec<&dyn arrow::array::Array> =
                parts.iter().map(|a| a.as_ref()).collect();
            out.push(Series::new(name.clone(), arrow::compute::concat(&refs)?));
        }
        Self::from_series_unchecked(out)
    }

    /// Value-level equality, ignoring nothing: same columns, same order, same
    /// row values.
    pub fn content_eq(&self, other: &DataFrame) -> bool {
        self.batch == other.batch
    }
}

/// Append a column to a frame under construction, aligning lengths: the first
/// value fixes the height, later length-1 values broadcast to it.
pub(crate) fn append_aligned(
    ret: &mut Option<DataFrame>,
    name: &str,
    value: Series,
) -> Result<()> {
    match ret {
        None => {
            *ret = Some(DataFrame::new(vec![value.rename(name)])?);
        }
        Some(frame) => {
            let height = frame.height();
            let value = if value.len() == height {
                value
            } else if value.len() == 1 {
                value.broadcast(height)?
            } else {
                return Err(FrameError::schema_mismatch(format!(
                    "column '{name}' has length {}, expected {height}",
                    value.len()
                )));
            };
            *frame = frame.with_column(value.rename(name))?;
        }
    }
    Ok(())
}
