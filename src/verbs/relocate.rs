use crate::dataframe::{DataFrame, GroupedFrame, RowwiseFrame, Series, Table};
use crate::expr::Context;
use crate::selector::{resolve_selectors, Collection, Dedup};
use crate::verbs::{list_diff, Verb};
use crate::{FrameError, Result};

/// Change column positions.
pub fn relocate(selection: impl Into<Collection>) -> Relocate {
    Relocate {
        what: selection.into(),
        before: None,
        after: None,
    }
}

/// The `relocate` verb builder.
#[derive(Clone, Debug)]
pub struct Relocate {
    what: Collection,
    before: Option<Collection>,
    after: Option<Collection>,
}

impl Relocate {
    /// Destination: move before this selection.
    pub fn before(mut self, selection: impl Into<Collection>) -> Self {
        self.before = Some(selection.into());
        self
    }

    /// Destination: move after this selection.
    pub fn after(mut self, selection: impl Into<Collection>) -> Self {
        self.after = Some(selection.into());
        self
    }
}

impl Verb for Relocate {
    type Output = Table;

    fn name(&self) -> &'static str {
        "relocate"
    }

    fn context(&self) -> Context {
        Context::Select
    }

    fn apply(self, table: Table) -> Result<Table> {
        let out = relocate_frame(
            table.frame(),
            &self.what,
            self.before.as_ref(),
            self.after.as_ref(),
            "relocate",
        )?;
        rewrap(table, out)
    }
}

/// Shared relocation: resolve the moved set, cut it out of the column order,
/// and splice it at the requested position (front when unspecified).
pub(crate) fn relocate_frame(
    df: &DataFrame,
    what: &Collection,
    before: Option<&Collection>,
    after: Option<&Collection>,
    verb: &'static str,
) -> Result<DataFrame> {
    if before.is_some() && after.is_some() {
        return Err(FrameError::ConflictingDirective {
            verb,
            first: "_before",
            second: "_after",
        });
    }

    let all = df.column_names();
    let columns = resolve_selectors(&all, what, Dedup::Unique)?;
    let rest = list_diff(&all, &columns);

    let rearranged: Vec<String> = if let Some(before) = before {
        let anchors = resolve_selectors(&rest, before, Dedup::Unique)?;
        let cutpoint = anchors
            .iter()
            .filter_map(|a| rest.iter().position(|r| r == a))
            .min()
            .unwrap_or(0);
        splice(&rest, &columns, cutpoint)
    } else if let Some(after) = after {
        let anchors = resolve_selectors(&rest, after, Dedup::Unique)?;
        let cutpoint = anchors
            .iter()
            .filter_map(|a| rest.iter().position(|r| r == a))
            .max()
            .map(|p| p + 1)
            .unwrap_or(rest.len());
        splice(&rest, &columns, cutpoint)
    } else {
        columns.iter().chain(rest.iter()).cloned().collect()
    };

    df.select_names(&rearranged)
}

fn splice(rest: &[String], columns: &[String], cutpoint: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(rest.len() + columns.len());
    out.extend(rest[..cutpoint].iter().cloned());
    out.extend(columns.iter().cloned());
    out.extend(rest[cutpoint..].iter().cloned());
    out
}

/// Re-apply a table's envelope to a transformed frame.
pub(crate) fn rewrap(table: Table, out: DataFrame) -> Result<Table> {
    match table {
        Table::Plain(_) => Ok(Table::Plain(out)),
        Table::Grouped(g) => Ok(Table::Grouped(GroupedFrame::new(out, g.keys().to_vec())?)),
        Table::Rowwise(r) => Ok(Table::Rowwise(RowwiseFrame::new(
            out,
            r.id_cols().to_vec(),
        )?)),
    }
}

/// Select (and optionally rename) columns.
pub fn select(selection: impl Into<Collection>) -> Select {
    Select {
        what: selection.into(),
        renames: Vec::new(),
    }
}

/// The `select` verb builder.
#[derive(Clone, Debug)]
pub struct Select {
    what: Collection,
    renames: Vec<(String, String)>,
}

impl Select {
    /// Also select `old`, renamed to `new` (last rename wins).
    pub fn rename(mut self, new: impl Into<String>, old: impl Into<String>) -> Self {
        self.renames.push((new.into(), old.into()));
        self
    }
}

impl Verb for Select {
    type Output = Table;

    fn name(&self) -> &'static str {
        "select"
    }

    fn context(&self) -> Context {
        Context::Select
    }

    fn apply(self, table: Table) -> Result<Table> {
        let df = table.frame();
        let all = df.column_names();

        let mut selection = self.what.clone();
        for (_, old) in &self.renames {
            selection.push(old.as_str());
        }
        let selected = resolve_selectors(&all, &selection, Dedup::Keep)?;

        let pairs: Vec<(String, String)> = self
            .renames
            .iter()
            .filter(|(_, old)| selected.iter().any(|s| s == old))
            .map(|(new, old)| (old.clone(), new.clone()))
            .collect();

        let out = df.select_names(&selected)?.rename(&pairs)?;
        rewrap(table, out)
    }
}

/// Rename columns with `new = old` pairs.
pub fn rename(pairs: impl IntoIterator<Item = (&'static str, &'static str)>) -> Rename {
    Rename {
        pairs: pairs
            .into_iter()
            .map(|(new, old)| (new.to_string(), old.to_string()))
            .collect(),
    }
}

/// The `rename` verb builder.
#[derive(Clone, Debug)]
pub struct Rename {
    pairs: Vec<(String, String)>,
}

impl Verb for Rename {
    type Output = Table;

    fn name(&self) -> &'static str {
        "rename"
    }

    fn context(&self) -> Context {
        Context::Select
    }

    fn apply(self, table: Table) -> Result<Table> {
        let pairs: Vec<(String, String)> = self
            .pairs
            .iter()
            .map(|(new, old)| (old.clone(), new.clone()))
            .collect();
        let out = table.frame().rename(&pairs)?;
        rewrap(table, out)
    }
}

/// Rename columns with a function over the (optionally selected) names.
pub fn rename_with<F>(func: F) -> RenameWith<F>
where
    F: Fn(&str) -> String,
{
    RenameWith { func, cols: None }
}

/// The `rename_with` verb builder.
pub struct RenameWith<F> {
    func: F,
    cols: Option<Collection>,
}

impl<F> RenameWith<F> {
    /// Restrict renaming to a selection.
    pub fn cols(mut self, selection: impl Into<Collection>) -> Self {
        self.cols = Some(selection.into());
        self
    }
}

impl<F> Verb for RenameWith<F>
where
    F: Fn(&str) -> String,
{
    type Output = Table;

    fn name(&self) -> &'static str {
        "rename_with"
    }

    fn context(&self) -> Context {
        Context::Select
    }

    fn apply(self, table: Table) -> Result<Table> {
        let df = table.frame();
        let all = df.column_names();
        let targets = match &self.cols {
            Some(selection) => resolve_selectors(&all, selection, Dedup::Unique)?,
            None => all,
        };
        let pairs: Vec<(String, String)> = targets
            .iter()
            .map(|old| (old.clone(), (self.func)(old)))
            .collect();
        let out = df.rename(&pairs)?;
        rewrap(table, out)
    }
}

/// Result of `pull`: a plain column, or the sub-frame packed under a
/// compound `name$col` prefix.
#[derive(Debug, Clone)]
pub enum Pulled {
    /// A single column.
    Series(Series),
    /// A packed frame, column prefix stripped.
    Frame(DataFrame),
}

/// Extract a column by name.
pub fn pull(name: impl Into<String>) -> Pull {
    Pull {
        var: PullVar::Name(name.into()),
    }
}

/// Extract a column by position (negative counts from the end; `-1` pulls the
/// last column).
pub fn pull_at(position: i64) -> Pull {
    Pull {
        var: PullVar::Index(position),
    }
}

#[derive(Clone, Debug)]
enum PullVar {
    Name(String),
    Index(i64),
}

/// The `pull` verb builder.
#[derive(Clone, Debug)]
pub struct Pull {
    var: PullVar,
}

impl Verb for Pull {
    type Output = Pulled;

    fn name(&self) -> &'static str {
        "pull"
    }

    fn context(&self) -> Context {
        Context::Select
    }

    fn apply(self, table: Table) -> Result<Pulled> {
        let df = table.frame();
        let name = match self.var {
            PullVar::Name(name) => name,
            PullVar::Index(idx) => {
                let all = df.column_names();
                let len = all.len() as i64;
                let pos = if idx < 0 { idx + len } else { idx };
                if pos < 0 || pos >= len {
                    return Err(FrameError::invalid_operation(format!(
                        "column position {idx} out of bounds for {len} columns"
                    )));
                }
                all[pos as usize].clone()
            }
        };

        if df.has_column(&name) {
            return Ok(Pulled::Series(df.column(&name)?));
        }

        // compound columns written by multi-column mutate values
        let prefix = format!("{name}$");
        let packed: Vec<Series> = df
            .columns()
            .into_iter()
            .filter(|c| c.name().starts_with(&prefix))
            .map(|c| {
                let stripped = c.name()[prefix.len()..].to_string();
                c.rename(stripped)
            })
            .collect();
        if packed.is_empty() {
            return Err(FrameError::column_not_found(name));
        }
        Ok(Pulled::Frame(DataFrame::new(packed)?))
    }
}

#[cfg(test)]
mod tests {
    use super::{pull, pull_at, relocate, rename, rename_with, select, Pulled};
    use crate::dataframe::{DataFrame, Series, Table};
    use crate::verbs::Verb;

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::int64("a", [1]),
            Series::int64("b", [2]),
            Series::int64("c", [3]),
        ])
        .unwrap()
    }

    #[test]
    fn relocate_defaults_to_front() {
        let out = relocate("c").apply(Table::Plain(df())).unwrap().into_frame();
        assert_eq!(out.column_names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn relocate_after_anchors_at_last_match() {
        let out = relocate("a")
            .after("b")
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        assert_eq!(out.column_names(), vec!["b", "a", "c"]);
    }

    #[test]
    fn relocate_rejects_both_directives() {
        let err = relocate("a")
            .before("b")
            .after("c")
            .apply(Table::Plain(df()))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::FrameError::ConflictingDirective { .. }
        ));
    }

    #[test]
    fn select_reorders_and_renames() {
        let out = select(["c", "a"])
            .rename("bb", "b")
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        assert_eq!(out.column_names(), vec!["c", "a", "bb"]);
    }

    #[test]
    fn rename_with_transforms_names() {
        let out = rename_with(|n| n.to_uppercase())
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        assert_eq!(out.column_names(), vec!["A", "B", "C"]);
    }

    #[test]
    fn rename_uses_new_old_pairs() {
        let out = rename([("aa", "a")])
            .apply(Table::Plain(df()))
            .unwrap()
            .into_frame();
        assert_eq!(out.column_names(), vec!["aa", "b", "c"]);
    }

    #[test]
    fn pull_by_name_and_position() {
        match pull("b").apply(Table::Plain(df())).unwrap() {
            Pulled::Series(s) => assert_eq!(s.i64_values().unwrap(), vec![Some(2)]),
            other => panic!("unexpected pull result: {other:?}"),
        }
        match pull_at(-1).apply(Table::Plain(df())).unwrap() {
            Pulled::Series(s) => assert_eq!(s.name(), "c"),
            other => panic!("unexpected pull result: {other:?}"),
        }
    }
}
