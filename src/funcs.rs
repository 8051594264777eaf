//! Ready-made column functions and selection helpers for the `Across`
//! family.

use crate::across::{series_fn, SeriesFn};
use crate::dataframe::{DataFrame, Series};
use crate::expr::AggFunc;
use crate::selector::Collection;

/// Select every column of `data`.
pub fn everything(data: &DataFrame) -> Collection {
    Collection::from(data.column_names())
}

/// Column function computing the sum of non-null values.
pub fn sum() -> SeriesFn {
    agg_fn(AggFunc::Sum)
}

/// Column function computing the mean of non-null values.
pub fn mean() -> SeriesFn {
    agg_fn(AggFunc::Mean)
}

/// Column function computing the minimum of non-null values.
pub fn min() -> SeriesFn {
    agg_fn(AggFunc::Min)
}

/// Column function computing the maximum of non-null values.
pub fn max() -> SeriesFn {
    agg_fn(AggFunc::Max)
}

/// Column function counting non-null values.
pub fn count() -> SeriesFn {
    agg_fn(AggFunc::Count)
}

fn agg_fn(func: AggFunc) -> SeriesFn {
    series_fn(move |s: &Series, _| {
        let value = crate::expr::aggregate(func, s)?;
        Series::from_scalar(s.name(), &value, 1)
    })
}

#[cfg(test)]
mod tests {
    use crate::dataframe::{DataFrame, Series};
    use crate::expr::Scalar;

    #[test]
    fn aggregating_fns_collapse_to_one_value() {
        let s = Series::int64("v", [1, 2, 3]);
        let out = (super::mean())(&s, &[]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.scalar_at(0).unwrap(), Scalar::Float64(2.0));
    }

    #[test]
    fn everything_lists_all_columns() {
        let df = DataFrame::new(vec![
            Series::int64("a", [1]),
            Series::int64("b", [2]),
        ])
        .unwrap();
        let sel = super::everything(&df);
        assert_eq!(sel.items().len(), 2);
    }
}
