//! Deferred multi-column application middlewares.
//!
//! [`Across`] represents "apply function(s) across columns" as a data object
//! consumed exactly once by `evaluate`, which is context- and grouping-aware.
//! [`CAcross`] combines the selected columns row-wise, and [`IfCross`]
//! reduces per-column predicates to a row-wise boolean.

#[allow(clippy::module_inception)]
mod across;
mod ifcross;

pub use across::{Across, AcrossFns, AcrossResult, Arg, CAcross, SeriesFn};
pub use ifcross::{if_all, if_any, IfCross};

use std::sync::Arc;

use crate::dataframe::Series;
use crate::Result;

/// Wrap a closure as a column function usable in the `Across` family.
pub fn series_fn<F>(f: F) -> SeriesFn
where
    F: Fn(&Series, &[crate::expr::Scalar]) -> Result<Series> + Send + Sync + 'static,
{
    Arc::new(f)
}
