//! `tidyframe` is a tabular-data verb grammar built on Apache Arrow.
//!
//! Verbs (`mutate`, `filter`, `summarise`, `group_by`, joins, slices, …) are
//! polymorphic over the table's grouping envelope and accept deferred
//! arguments: column references built before any concrete frame exists,
//! selector middlewares (`Collection`, `Inverted`, `Negated`) and
//! multi-column apply descriptors (`Across`, `CAcross`, `if_any`/`if_all`).
//! Arguments are resolved only once the verb knows its evaluation context
//! and the concrete frame (or group) they apply to.
//!
//! ```
//! use tidyframe::expr::{col, lit};
//! use tidyframe::{group_by, mutate, ungroup, DataFrame, Series};
//!
//! let df = DataFrame::new(vec![
//!     Series::int64("x", [3, 1, 2]),
//!     Series::utf8("g", ["a", "a", "b"]),
//! ])?;
//!
//! let out = (df >> group_by("g") >> mutate().col("y", col("x") * lit(2_i64)) >> ungroup())
//!     .frame()?;
//! assert_eq!(
//!     out.column("y")?.i64_values()?,
//!     vec![Some(6), Some(2), Some(4)]
//! );
//! # Ok::<(), tidyframe::FrameError>(())
//! ```

mod error;

/// Deferred multi-column application middlewares.
pub mod across;
/// Environment-driven call-style fallback configuration.
pub mod config;
/// Eager frame types and the grouping envelope.
pub mod dataframe;
/// Deferred expression DSL and evaluation contexts.
pub mod expr;
/// Ready-made column functions and selection helpers.
pub mod funcs;
/// Named bundles of grouping columns.
pub mod nesting;
/// Column selectors and name repair.
pub mod selector;
/// The verb layer.
pub mod verbs;

/// Re-export of the crate error type and result alias.
pub use crate::error::{FrameError, Result};

/// Re-export of the primary frame types.
pub use crate::dataframe::{DataFrame, Group, GroupedFrame, RowwiseFrame, Series, Table};

/// Re-export of the expression DSL entrypoints.
pub use crate::expr::{col, desc, lit, n, Context, Expr, Scalar};

/// Re-export of the selector middlewares.
pub use crate::selector::{Collection, Inverted, Negated, Selector};

/// Re-export of the `Across` family.
pub use crate::across::{if_all, if_any, series_fn, Across, AcrossFns, Arg, CAcross, IfCross};

/// Re-export of the nesting bundle.
pub use crate::nesting::{Nesting, NestingItem};

/// Re-export of every verb and the piping machinery.
pub use crate::verbs::*;
