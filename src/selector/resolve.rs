use crate::selector::{Collection, Selector};
use crate::{FrameError, Result};

/// Whether resolution removes duplicate names.
///
/// Verbs differ: `group_by` unions its key list, while `select` keeps
/// duplicates so last-wins rename semantics survive.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dedup {
    /// Set-union semantics: first occurrence wins, duplicates dropped.
    Unique,
    /// Preserve duplicates as requested.
    Keep,
}

/// Resolve selector atoms to concrete column names against `all_columns`.
///
/// Order is first-seen; a referenced name that is not a column fails with a
/// column-not-found error. Resolving a list of literal column names returns
/// them unchanged.
pub fn resolve_selectors(
    all_columns: &[String],
    selectors: &Collection,
    dedup: Dedup,
) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for selector in selectors.items() {
        resolve_one(all_columns, selector, &mut out)?;
    }
    if dedup == Dedup::Unique {
        let mut seen = Vec::with_capacity(out.len());
        for name in out {
            if !seen.iter().any(|s| *s == name) {
                seen.push(name);
            }
        }
        out = seen;
    }
    Ok(out)
}

fn resolve_one(all_columns: &[String], selector: &Selector, out: &mut Vec<String>) -> Result<()> {
    match selector {
        Selector::Name(name) => {
            if !all_columns.iter().any(|c| c == name) {
                return Err(FrameError::column_not_found(name.clone()));
            }
            out.push(name.clone());
        }
        Selector::Index(idx) => {
            out.push(resolve_index(all_columns, *idx)?);
        }
        Selector::Range(range) => {
            let (start, end) = range.bounds(all_columns.len());
            out.extend(all_columns[start..end].iter().cloned());
        }
        Selector::Collection(inner) => {
            for s in inner.items() {
                resolve_one(all_columns, s, out)?;
            }
        }
        Selector::Inverted(inv) => {
            out.extend(inv.complements()?);
        }
        Selector::Negated(neg) => {
            let dropped = resolve_selectors(all_columns, &neg.0, Dedup::Unique)?;
            out.extend(
                all_columns
                    .iter()
                    .filter(|c| !dropped.iter().any(|d| d == *c))
                    .cloned(),
            );
        }
    }
    Ok(())
}

fn resolve_index(all_columns: &[String], idx: i64) -> Result<String> {
    let len = all_columns.len() as i64;
    let pos = if idx < 0 { idx + len } else { idx };
    if pos < 0 || pos >= len {
        return Err(FrameError::invalid_operation(format!(
            "column position {idx} out of bounds for {len} columns"
        )));
    }
    Ok(all_columns[pos as usize].clone())
}

/// Expand row selectors (positions, ranges, negation) into row indices
/// against a frame of `height` rows.
pub(crate) fn resolve_rows(height: usize, selectors: &Collection) -> Result<Vec<usize>> {
    let mut keep: Vec<usize> = Vec::new();
    let mut dropped: Vec<usize> = Vec::new();
    for selector in selectors.items() {
        match selector {
            Selector::Index(idx) => keep.push(resolve_row_index(height, *idx)?),
            Selector::Range(range) => {
                let (start, end) = range.bounds(height);
                keep.extend(start..end);
            }
            Selector::Collection(inner) => {
                keep.extend(resolve_rows(height, inner)?);
            }
            Selector::Negated(neg) => {
                dropped.extend(resolve_rows(height, &neg.0)?);
            }
            other => {
                return Err(FrameError::invalid_operation(format!(
                    "row selection does not accept {other:?}"
                )))
            }
        }
    }
    if !dropped.is_empty() {
        if !keep.is_empty() {
            return Err(FrameError::invalid_operation(
                "cannot mix kept and negated row selections",
            ));
        }
        keep = (0..height).filter(|i| !dropped.contains(i)).collect();
    }
    Ok(keep)
}

fn resolve_row_index(height: usize, idx: i64) -> Result<usize> {
    let len = height as i64;
    let pos = if idx < 0 { idx + len } else { idx };
    if pos < 0 || pos >= len {
        return Err(FrameError::invalid_operation(format!(
            "row position {idx} out of bounds for {len} rows"
        )));
    }
    Ok(pos as usize)
}

#[cfg(test)]
mod tests {
    use super::{resolve_rows, resolve_selectors, Dedup};
    use crate::selector::{ColRange, Collection, Negated, Selector};

    fn cols() -> Vec<String> {
        ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn literal_names_resolve_to_themselves() {
        let sel = Collection::from(vec!["c", "a"]);
        let out = resolve_selectors(&cols(), &sel, Dedup::Keep).unwrap();
        assert_eq!(out, vec!["c".to_string(), "a".to_string()]);

        // idempotence: resolving the output again returns it unchanged
        let again = resolve_selectors(&cols(), &Collection::from(out.clone()), Dedup::Keep).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn positions_and_ranges_resolve_against_current_order() {
        let sel = Collection::new([
            Selector::Index(-1),
            Selector::Range(ColRange::new(0, 2)),
        ]);
        let out = resolve_selectors(&cols(), &sel, Dedup::Keep).unwrap();
        assert_eq!(
            out,
            vec!["d".to_string(), "a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn negation_keeps_the_complement() {
        let sel = Collection::from(Negated::new(["b", "d"]));
        let out = resolve_selectors(&cols(), &sel, Dedup::Keep).unwrap();
        assert_eq!(out, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn unknown_name_errors() {
        let sel = Collection::from("nope");
        let err = resolve_selectors(&cols(), &sel, Dedup::Keep).unwrap_err();
        assert!(matches!(err, crate::FrameError::ColumnNotFound { .. }));
    }

    #[test]
    fn dedup_unions_first_seen() {
        let sel = Collection::from(vec!["b", "a", "b"]);
        let out = resolve_selectors(&cols(), &sel, Dedup::Unique).unwrap();
        assert_eq!(out, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn row_negation_drops_positions() {
        let sel = Collection::from(Negated::new(vec![0_i64, 2]));
        assert_eq!(resolve_rows(4, &sel).unwrap(), vec![1, 3]);
    }
}
