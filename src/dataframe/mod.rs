//! Eager frame types and the grouping envelope.

#[allow(clippy::module_inception)]
mod dataframe;
mod group;
mod series;
mod table;

pub(crate) use dataframe::append_aligned;
pub use dataframe::DataFrame;
pub(crate) use group::{row_keys, KeyValue};
pub use group::{Group, GroupedFrame, RowwiseFrame};
pub use series::Series;
pub use table::Table;
