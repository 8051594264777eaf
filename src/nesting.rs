//! Named bundles of columns used for group-key construction.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

use crate::dataframe::Series;

static NESTING_ID: AtomicUsize = AtomicUsize::new(0);

/// An item contributed to a [`Nesting`]: an existing column by name, or a
/// series carrying its own name.
#[derive(Debug, Clone)]
pub enum NestingItem {
    /// Reference an existing column.
    Name(String),
    /// A computed series; its name is used when non-empty.
    Series(Series),
}

impl From<&str> for NestingItem {
    fn from(v: &str) -> Self {
        NestingItem::Name(v.to_string())
    }
}

impl From<String> for NestingItem {
    fn from(v: String) -> Self {
        NestingItem::Name(v)
    }
}

impl From<Series> for NestingItem {
    fn from(v: Series) -> Self {
        NestingItem::Series(v)
    }
}

/// A named bundle of grouping columns.
///
/// Unnamed values receive synthesized temporary names; prefer keyed entries
/// via [`Nesting::key`] to control the name.
#[derive(Debug, Clone, Default)]
pub struct Nesting {
    columns: Vec<NestingItem>,
    names: Vec<String>,
}

impl Nesting {
    /// Bundle positional items, inferring names where possible.
    pub fn new(items: impl IntoIterator<Item = NestingItem>) -> Self {
        let id = NESTING_ID.fetch_add(1, Ordering::Relaxed);
        let mut columns = Vec::new();
        let mut names = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let name = match &item {
                NestingItem::Name(name) => name.clone(),
                NestingItem::Series(series) if !series.name().is_empty() => {
                    series.name().to_string()
                }
                NestingItem::Series(_) => {
                    warn!(
                        "temporary name used for a nesting column, use a keyed \
                         entry to specify the name"
                    );
                    format!("_tmp{id:x}_{i}")
                }
            };
            columns.push(item);
            names.push(name);
        }
        Self { columns, names }
    }

    /// Add a keyed entry: `name` becomes the grouping column name.
    pub fn key(mut self, name: impl Into<String>, series: Series) -> Self {
        self.columns.push(NestingItem::Series(series));
        self.names.push(name.into());
        self
    }

    /// The bundled items.
    pub fn columns(&self) -> &[NestingItem] {
        &self.columns
    }

    /// The grouping column names, aligned with `columns()`.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The number of bundled columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Nesting, NestingItem};
    use crate::dataframe::Series;

    #[test]
    fn names_align_with_columns() {
        let n = Nesting::new([
            NestingItem::from("g"),
            NestingItem::from(Series::int64("h", [1])),
        ])
        .key("k", Series::int64("", [2]));
        assert_eq!(n.len(), 3);
        assert_eq!(n.names(), &["g", "h", "k"]);
        assert_eq!(n.columns().len(), n.names().len());
    }

    #[test]
    fn unnamed_series_get_synthesized_names() {
        let n = Nesting::new([NestingItem::from(Series::int64("", [1]))]);
        assert_eq!(n.len(), 1);
        assert!(n.names()[0].starts_with("_tmp"));
    }
}
