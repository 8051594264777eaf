use std::sync::OnceLock;

use crate::dataframe::DataFrame;
use crate::selector::{resolve_selectors, Collection, Dedup};
use crate::Result;

/// "Everything except" selector, bound to the frame it was built against.
///
/// The complement set is computed on first access and cached for the lifetime
/// of the instance.
#[derive(Debug, Clone)]
pub struct Inverted {
    elems: Collection,
    data: DataFrame,
    complements: OnceLock<Vec<String>>,
}

impl Inverted {
    /// Invert a selection against `data`.
    pub fn new(elems: impl Into<Collection>, data: &DataFrame) -> Self {
        Self {
            elems: elems.into(),
            data: data.clone(),
            complements: OnceLock::new(),
        }
    }

    /// The wrapped selection.
    pub fn elems(&self) -> &Collection {
        &self.elems
    }

    /// All columns of the bound frame minus the wrapped selection.
    ///
    /// Computed at most once per instance; later changes to the bound frame do
    /// not alter a previously cached result.
    pub fn complements(&self) -> Result<Vec<String>> {
        if let Some(cached) = self.complements.get() {
            return Ok(cached.clone());
        }
        let all = self.data.column_names();
        let selected = resolve_selectors(&all, &self.elems, Dedup::Unique)?;
        let complements: Vec<String> = all
            .into_iter()
            .filter(|c| !selected.iter().any(|s| s == c))
            .collect();
        Ok(self.complements.get_or_init(|| complements).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::Inverted;
    use crate::dataframe::{DataFrame, Series};

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::int64("a", [1]),
            Series::int64("b", [2]),
            Series::int64("c", [3]),
        ])
        .unwrap()
    }

    #[test]
    fn complements_are_the_set_difference() {
        let inv = Inverted::new(["b"], &df());
        assert_eq!(
            inv.complements().unwrap(),
            vec!["a".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn complements_are_cached_per_instance() {
        let inv = Inverted::new(["b"], &df());
        let first = inv.complements().unwrap();
        // second access must reuse the cached value
        let second = inv.complements().unwrap();
        assert_eq!(first, second);
        assert!(inv.complements.get().is_some());
    }

    #[test]
    fn unknown_name_is_reported() {
        let inv = Inverted::new(["zzz"], &df());
        let err = inv.complements().unwrap_err();
        assert!(matches!(err, crate::FrameError::ColumnNotFound { .. }));
    }
}
