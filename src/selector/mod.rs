//! Column selectors: names, positions, ranges, nesting, inversion, negation.

mod collection;
mod inverted;
mod names;
mod resolve;

pub use collection::{ColRange, Collection, Negated, Selector};
pub use inverted::Inverted;
pub use names::{repair_names, NameRepair};
pub(crate) use resolve::resolve_rows;
pub use resolve::{resolve_selectors, Dedup};
