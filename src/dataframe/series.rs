use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int64Array, NullArray, StringArray, UInt32Array,
};
use arrow::datatypes::DataType;

use crate::expr::Scalar;
use crate::{FrameError, Result};

/// A named column backed by a single Arrow array.
#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    array: ArrayRef,
}

impl Series {
    /// Construct a `Series` from an Arrow array.
    pub fn new(name: impl Into<String>, array: ArrayRef) -> Self {
        Self {
            name: name.into(),
            array,
        }
    }

    /// Construct an `Int64` series from values.
    pub fn int64(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(name, Arc::new(Int64Array::from_iter_values(values)))
    }

    /// Construct a `Float64` series from values.
    pub fn float64(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, Arc::new(Float64Array::from_iter_values(values)))
    }

    /// Construct a `Utf8` series from values.
    pub fn utf8<'a>(name: impl Into<String>, values: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(
            name,
            Arc::new(StringArray::from_iter_values(values)),
        )
    }

    /// Construct a `Boolean` series from values.
    pub fn boolean(name: impl Into<String>, values: impl IntoIterator<Item = bool>) -> Self {
        Self::new(
            name,
            Arc::new(BooleanArray::from_iter(values.into_iter().map(Some))),
        )
    }

    /// Broadcast a scalar into a series of length `len`.
    pub fn from_scalar(name: impl Into<String>, value: &Scalar, len: usize) -> Result<Self> {
        let array: ArrayRef = match value {
            Scalar::Null => Arc::new(NullArray::new(len)),
            Scalar::Boolean(v) => Arc::new(BooleanArray::from(vec![Some(*v); len])),
            Scalar::Int64(v) => Arc::new(Int64Array::from(vec![Some(*v); len])),
            Scalar::Float64(v) => Arc::new(Float64Array::from(vec![Some(*v); len])),
            Scalar::Utf8(v) => Arc::new(StringArray::from(vec![Some(v.as_str()); len])),
        };
        Ok(Self::new(name, array))
    }

    /// Build a series from scalars, inferring a common Arrow dtype.
    ///
    /// Integers widen to floats when mixed; nulls are permitted in any column.
    pub fn from_scalars(name: impl Into<String>, values: &[Scalar]) -> Result<Self> {
        let mut has_int = false;
        let mut has_float = false;
        let mut has_bool = false;
        let mut has_utf8 = false;
        for v in values {
            match v {
                Scalar::Null => {}
                Scalar::Int64(_) => has_int = true,
                Scalar::Float64(_) => has_float = true,
                Scalar::Boolean(_) => has_bool = true,
                Scalar::Utf8(_) => has_utf8 = true,
            }
        }

        let array: ArrayRef = match (has_utf8, has_bool, has_float, has_int) {
            (true, false, false, false) => Arc::new(StringArray::from_iter(values.iter().map(
                |v| match v {
                    Scalar::Utf8(s) => Some(s.clone()),
                    _ => None,
                },
            ))),
            (false, true, false, false) => Arc::new(BooleanArray::from_iter(values.iter().map(
                |v| match v {
                    Scalar::Boolean(b) => Some(*b),
                    _ => None,
                },
            ))),
            (false, false, false, true) => Arc::new(Int64Array::from_iter(values.iter().map(
                |v| match v {
                    Scalar::Int64(i) => Some(*i),
                    _ => None,
                },
            ))),
            (false, false, true, _) => Arc::new(Float64Array::from_iter(values.iter().map(
                |v| match v {
                    Scalar::Float64(f) => Some(*f),
                    Scalar::Int64(i) => Some(*i as f64),
                    _ => None,
                },
            ))),
            (false, false, false, false) => Arc::new(NullArray::new(values.len())),
            _ => {
                return Err(FrameError::type_mismatch(
                    None::<String>,
                    "scalars of a single dtype".to_string(),
                    "mixed dtypes".to_string(),
                ))
            }
        };
        Ok(Self::new(name, array))
    }

    /// Return the series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return a copy of this series under a new name.
    pub fn rename(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.array.clone())
    }

    /// Return the underlying Arrow array.
    pub fn array(&self) -> &ArrayRef {
        &self.array
    }

    /// Return the logical length of the series.
    pub fn len(&self) -> usize {
        self.array.len()
    }

    /// Returns `true` if this series is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the Arrow dtype of the series.
    pub fn dtype(&self) -> DataType {
        self.array.data_type().clone()
    }

    /// Extract the value at `row` as a `Scalar`.
    pub fn scalar_at(&self, row: usize) -> Result<Scalar> {
        scalar_at(self.array.as_ref(), row)
    }

    /// Reindex this series by row positions.
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        let idx = UInt32Array::from_iter_values(indices.iter().map(|i| *i as u32));
        let array = arrow::compute::take(self.array.as_ref(), &idx, None)?;
        Ok(Self::new(self.name.clone(), array))
    }

    /// Repeat a length-1 series out to `len` rows.
    pub fn broadcast(&self, len: usize) -> Result<Self> {
        if self.len() == len {
            return Ok(self.clone());
        }
        if self.len() != 1 {
            return Err(FrameError::schema_mismatch(format!(
                "cannot broadcast series '{}' of length {} to length {len}",
                self.name,
                self.len()
            )));
        }
        self.take(&vec![0; len])
    }

    /// Coerce this series to booleans: null becomes false, numerics compare
    /// against zero.
    pub fn to_bool(&self) -> Result<BooleanArray> {
        let mut out = Vec::with_capacity(self.len());
        for row in 0..self.len() {
            let v = match self.scalar_at(row)? {
                Scalar::Null => false,
                Scalar::Boolean(b) => b,
                Scalar::Int64(i) => i != 0,
                Scalar::Float64(f) => f != 0.0,
                Scalar::Utf8(_) => {
                    return Err(FrameError::type_mismatch(
                        Some(self.name.clone()),
                        "boolean-coercible".to_string(),
                        DataType::Utf8.to_string(),
                    ))
                }
            };
            out.push(Some(v));
        }
        Ok(BooleanArray::from(out))
    }

    /// Values as optional `i64`, for tests and simple consumers.
    pub fn i64_values(&self) -> Result<Vec<Option<i64>>> {
        (0..self.len())
            .map(|row| match self.scalar_at(row)? {
                Scalar::Null => Ok(None),
                Scalar::Int64(v) => Ok(Some(v)),
                other => Err(FrameError::type_mismatch(
                    Some(self.name.clone()),
                    "int64".to_string(),
                    format!("{other:?}"),
                )),
            })
            .collect()
    }

    /// Values as optional `f64`, for tests and simple consumers.
    pub fn f64_values(&self) -> Result<Vec<Option<f64>>> {
        (0..self.len())
            .map(|row| match self.scalar_at(row)? {
                Scalar::Null => Ok(None),
                Scalar::Float64(v) => Ok(Some(v)),
                Scalar::Int64(v) => Ok(Some(v as f64)),
                other => Err(FrameError::type_mismatch(
                    Some(self.name.clone()),
                    "float64".to_string(),
                    format!("{other:?}"),
                )),
            })
            .collect()
    }

    /// Values as optional strings, for tests and simple consumers.
    pub fn str_values(&self) -> Result<Vec<Option<String>>> {
        (0..self.len())
            .map(|row| match self.scalar_at(row)? {
                Scalar::Null => Ok(None),
                Scalar::Utf8(v) => Ok(Some(v)),
                other => Err(FrameError::type_mismatch(
                    Some(self.name.clone()),
                    "utf8".to_string(),
                    format!("{other:?}"),
                )),
            })
            .collect()
    }

    /// Values as optional booleans, for tests and simple consumers.
    pub fn bool_values(&self) -> Result<Vec<Option<bool>>> {
        (0..self.len())
            .map(|row| match self.scalar_at(row)? {
                Scalar::Null => Ok(None),
                Scalar::Boolean(v) => Ok(Some(v)),
                other => Err(FrameError::type_mismatch(
                    Some(self.name.clone()),
                    "boolean".to_string(),
                    format!("{other:?}"),
                )),
            })
            .collect()
    }
}

/// Extract one row of any supported Arrow array as a `Scalar`.
pub(crate) fn scalar_at(array: &dyn Array, row: usize) -> Result<Scalar> {
    if array.is_null(row) {
        return Ok(Scalar::Null);
    }
    match array.data_type() {
        DataType::Null => Ok(Scalar::Null),
        DataType::Boolean => Ok(Scalar::Boolean(downcast::<BooleanArray>(array)?.value(row))),
        DataType::Int8 => Ok(Scalar::Int64(
            downcast::<arrow::array::Int8Array>(array)?.value(row) as i64,
        )),
        DataType::Int16 => Ok(Scalar::Int64(
            downcast::<arrow::array::Int16Array>(array)?.value(row) as i64,
        )),
        DataType::Int32 => Ok(Scalar::Int64(
            downcast::<arrow::array::Int32Array>(array)?.value(row) as i64,
        )),
        DataType::Int64 => Ok(Scalar::Int64(downcast::<Int64Array>(array)?.value(row))),
        DataType::UInt8 => Ok(Scalar::Int64(
            downcast::<arrow::array::UInt8Array>(array)?.value(row) as i64,
        )),
        DataType::UInt16 => Ok(Scalar::Int64(
            downcast::<arrow::array::UInt16Array>(array)?.value(row) as i64,
        )),
        DataType::UInt32 => Ok(Scalar::Int64(
            downcast::<arrow::array::UInt32Array>(array)?.value(row) as i64,
        )),
        DataType::UInt64 => {
            let v = downcast::<arrow::array::UInt64Array>(array)?.value(row);
            let v = i64::try_from(v).map_err(|_| {
                FrameError::type_mismatch(
                    None::<String>,
                    "UInt64 within i64 range".to_string(),
                    v.to_string(),
                )
            })?;
            Ok(Scalar::Int64(v))
        }
        DataType::Float32 => Ok(Scalar::Float64(
            downcast::<arrow::array::Float32Array>(array)?.value(row) as f64,
        )),
        DataType::Float64 => Ok(Scalar::Float64(downcast::<Float64Array>(array)?.value(row))),
        DataType::Utf8 => Ok(Scalar::Utf8(
            downcast::<StringArray>(array)?.value(row).to_string(),
        )),
        other => Err(FrameError::type_mismatch(
            None::<String>,
            "scalar extraction supported type".to_string(),
            other.to_string(),
        )),
    }
}

fn downcast<T: Array + 'static>(array: &dyn Array) -> Result<&T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        FrameError::invalid_operation(format!("bad array downcast for {:?}", array.data_type()))
    })
}
