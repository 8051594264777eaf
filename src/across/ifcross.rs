use std::sync::Arc;

use arrow::array::BooleanArray;
use arrow::compute::kernels::boolean;

use super::across::substitute_args;
use crate::across::{Across, AcrossFns};
use crate::dataframe::{DataFrame, Series};
use crate::selector::Collection;
use crate::{FrameError, Result};

/// Row-wise boolean reduction over per-column predicate results.
#[derive(Clone, Debug)]
pub struct IfCross {
    across: Across,
    kind: IfKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IfKind {
    Any,
    All,
}

/// `if_any`: true for a row when the predicate holds for at least one of the
/// selected columns.
pub fn if_any(data: &DataFrame, cols: Option<Collection>, fns: AcrossFns) -> Result<IfCross> {
    IfCross::new(data, cols, fns, IfKind::Any)
}

/// `if_all`: true for a row when the predicate holds for every selected
/// column.
pub fn if_all(data: &DataFrame, cols: Option<Collection>, fns: AcrossFns) -> Result<IfCross> {
    IfCross::new(data, cols, fns, IfKind::All)
}

impl IfCross {
    fn new(
        data: &DataFrame,
        cols: Option<Collection>,
        fns: AcrossFns,
        kind: IfKind,
    ) -> Result<Self> {
        let what = match kind {
            IfKind::Any => "if_any",
            IfKind::All => "if_all",
        };
        let across = Across::new(data, cols, fns)?;
        if !across.has_fns() {
            return Err(FrameError::NoFunction { what });
        }
        if across.fn_count() > 1 {
            return Err(FrameError::TooManyFunctions { what });
        }
        Ok(Self { across, kind })
    }

    /// Evaluate to one boolean per row.
    ///
    /// Each per-column result is coerced to boolean with nulls treated as
    /// false, then reduced across the row with OR (`if_any`) or AND
    /// (`if_all`).
    pub fn evaluate(&self, data: &DataFrame) -> Result<Series> {
        let record = &self.across.records()[0];
        let mut acc: Option<BooleanArray> = None;

        for col in self.across.cols() {
            let series = data.column(col)?;
            let args = substitute_args(self.across.args(), col);
            let value = (record.func)(&series, &args)?;
            let value = value.broadcast(data.height())?;
            let b = value.to_bool()?;
            acc = Some(match acc {
                None => b,
                Some(prev) => match self.kind {
                    IfKind::Any => boolean::or(&prev, &b)?,
                    IfKind::All => boolean::and(&prev, &b)?,
                },
            });
        }

        let array = acc.unwrap_or_else(|| {
            // no columns selected: vacuous truth for if_all, false for if_any
            BooleanArray::from(vec![Some(self.kind == IfKind::All); data.height()])
        });
        Ok(Series::new("", Arc::new(array)))
    }
}

#[cfg(test)]
mod tests {
    use super::{if_all, if_any};
    use crate::across::{series_fn, AcrossFns};
    use crate::dataframe::{DataFrame, Series};
    use crate::selector::Collection;

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::int64("a", [1, -1, 2]),
            Series::int64("b", [-1, -1, 2]),
        ])
        .unwrap()
    }

    fn positive() -> AcrossFns {
        AcrossFns::Single(series_fn(|s: &Series, _| {
            let flags: Vec<bool> = s
                .i64_values()?
                .into_iter()
                .map(|v| v.map(|x| x > 0).unwrap_or(false))
                .collect();
            Ok(Series::boolean(s.name(), flags))
        }))
    }

    #[test]
    fn if_any_reduces_with_or() {
        let cols = Some(Collection::from(vec!["a", "b"]));
        let m = if_any(&df(), cols, positive()).unwrap();
        let out = m.evaluate(&df()).unwrap();
        assert_eq!(
            out.bool_values().unwrap(),
            vec![Some(true), Some(false), Some(true)]
        );
    }

    #[test]
    fn if_all_reduces_with_and() {
        let cols = Some(Collection::from(vec!["a", "b"]));
        let m = if_all(&df(), cols, positive()).unwrap();
        let out = m.evaluate(&df()).unwrap();
        assert_eq!(
            out.bool_values().unwrap(),
            vec![Some(false), Some(false), Some(true)]
        );
    }

    #[test]
    fn zero_functions_error() {
        let err = if_any(&df(), None, AcrossFns::None).unwrap_err();
        assert!(matches!(err, crate::FrameError::NoFunction { .. }));
    }
}
