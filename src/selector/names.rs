use crate::{FrameError, Result};

/// Column-name repair strategies.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NameRepair {
    /// Fill empty names with positional placeholders, leave the rest alone.
    Minimal,
    /// Make all names unique by suffixing duplicates with `__<position>`.
    Unique,
    /// Validate uniqueness; error on the first duplicate or empty name.
    CheckUnique,
}

/// Repair or validate a list of column names.
pub fn repair_names(names: &[String], repair: NameRepair) -> Result<Vec<String>> {
    match repair {
        NameRepair::Minimal => Ok(names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                if n.is_empty() {
                    format!("__{i}")
                } else {
                    n.clone()
                }
            })
            .collect()),
        NameRepair::Unique => {
            let mut out = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                let duplicated =
                    name.is_empty() || names.iter().filter(|n| *n == name).count() > 1;
                if duplicated {
                    out.push(format!("{name}__{i}"));
                } else {
                    out.push(name.clone());
                }
            }
            Ok(out)
        }
        NameRepair::CheckUnique => {
            for (i, name) in names.iter().enumerate() {
                if name.is_empty() {
                    return Err(FrameError::non_unique_name("<empty>"));
                }
                if names[..i].contains(name) {
                    return Err(FrameError::non_unique_name(name.clone()));
                }
            }
            Ok(names.to_vec())
        }
    }
}
