use crate::dataframe::{DataFrame, GroupedFrame, RowwiseFrame, Table};
use crate::expr::Context;
use crate::nesting::{Nesting, NestingItem};
use crate::selector::{resolve_selectors, Collection, Dedup};
use crate::verbs::mutate::{mutate, Mutation};
use crate::verbs::{list_union, Verb};
use crate::{FrameError, Result};

/// Convert a table into one where operations are performed by group.
pub fn group_by(selection: impl Into<Collection>) -> GroupBy {
    GroupBy {
        selection: selection.into(),
        add: false,
        mutations: Vec::new(),
        nestings: Vec::new(),
    }
}

/// The `group_by` verb builder.
#[derive(Clone, Debug)]
pub struct GroupBy {
    selection: Collection,
    add: bool,
    mutations: Vec<(String, Mutation)>,
    nestings: Vec<Nesting>,
}

impl GroupBy {
    /// Append to existing grouping keys instead of replacing them.
    pub fn add(mut self, add: bool) -> Self {
        self.add = add;
        self
    }

    /// Compute a column first (via `mutate`) and group by it.
    pub fn col(mut self, name: impl Into<String>, value: impl Into<Mutation>) -> Self {
        self.mutations.push((name.into(), value.into()));
        self
    }

    /// Group by a named bundle of columns.
    pub fn nest(mut self, nesting: Nesting) -> Self {
        self.nestings.push(nesting);
        self
    }
}

impl Verb for GroupBy {
    type Output = Table;

    fn name(&self) -> &'static str {
        "group_by"
    }

    fn context(&self) -> Context {
        Context::Pending
    }

    fn apply(self, table: Table) -> Result<Table> {
        let existing_keys = table.group_vars().to_vec();

        // keyword mutations evaluate first
        let table = if self.mutations.is_empty() {
            table
        } else {
            let mut call = mutate();
            for (name, value) in &self.mutations {
                call = call.col(name.clone(), value.clone());
            }
            call.apply(table)?
        };

        let mut df = table.into_frame();
        let mut nested_names: Vec<String> = Vec::new();
        for nesting in &self.nestings {
            for (item, name) in nesting.columns().iter().zip(nesting.names()) {
                match item {
                    NestingItem::Name(existing) => {
                        if !df.has_column(existing) {
                            return Err(FrameError::column_not_found(existing.clone()));
                        }
                    }
                    NestingItem::Series(series) => {
                        df = df.with_column(series.rename(name.clone()))?;
                    }
                }
                nested_names.push(name.clone());
            }
        }

        let all = df.column_names();
        let mut keys = resolve_selectors(&all, &self.selection, Dedup::Unique)?;
        let mutated: Vec<String> = self.mutations.iter().map(|(n, _)| n.clone()).collect();
        keys = list_union(&keys, &mutated);
        keys = list_union(&keys, &nested_names);

        if self.add && !existing_keys.is_empty() {
            keys = list_union(&existing_keys, &keys);
        }

        Ok(Table::Grouped(GroupedFrame::new(df, keys)?))
    }
}

/// Discard the grouping envelope, leaving content unchanged.
pub fn ungroup() -> Ungroup {
    Ungroup
}

/// The `ungroup` verb.
#[derive(Clone, Copy, Debug)]
pub struct Ungroup;

impl Verb for Ungroup {
    type Output = Table;

    fn name(&self) -> &'static str {
        "ungroup"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        Ok(Table::Plain(table.into_frame()))
    }
}

/// Compute on a frame a row at a time; grouping information is lost.
pub fn rowwise(identity: impl Into<Collection>) -> RowwiseVerb {
    RowwiseVerb {
        identity: identity.into(),
    }
}

/// The `rowwise` verb builder.
#[derive(Clone, Debug)]
pub struct RowwiseVerb {
    identity: Collection,
}

impl Verb for RowwiseVerb {
    type Output = Table;

    fn name(&self) -> &'static str {
        "rowwise"
    }

    fn context(&self) -> Context {
        Context::Select
    }

    fn apply(self, table: Table) -> Result<Table> {
        let df = table.into_frame();
        let ids = resolve_selectors(&df.column_names(), &self.identity, Dedup::Unique)?;
        Ok(Table::Rowwise(RowwiseFrame::new(df, ids)?))
    }
}

/// Names of the grouping variables.
pub fn group_vars() -> GroupVars {
    GroupVars
}

/// The `group_vars` verb.
#[derive(Clone, Copy, Debug)]
pub struct GroupVars;

impl Verb for GroupVars {
    type Output = Vec<String>;

    fn name(&self) -> &'static str {
        "group_vars"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Vec<String>> {
        Ok(table.group_vars().to_vec())
    }
}

/// One row per group key combination.
pub fn group_keys() -> GroupKeys {
    GroupKeys { selection: None }
}

/// The `group_keys` verb builder.
#[derive(Clone, Debug)]
pub struct GroupKeys {
    selection: Option<Collection>,
}

impl GroupKeys {
    /// Group an ungrouped table by this selection first.
    pub fn by(mut self, selection: impl Into<Collection>) -> Self {
        self.selection = Some(selection.into());
        self
    }
}

impl Verb for GroupKeys {
    type Output = DataFrame;

    fn name(&self) -> &'static str {
        "group_keys"
    }

    fn context(&self) -> Context {
        Context::Select
    }

    fn apply(self, table: Table) -> Result<DataFrame> {
        let grouped = ensure_grouped(table, self.selection)?;
        grouped.key_frame()
    }
}

/// The row positions of each group.
pub fn group_rows() -> GroupRows {
    GroupRows
}

/// The `group_rows` verb.
#[derive(Clone, Copy, Debug)]
pub struct GroupRows;

impl Verb for GroupRows {
    type Output = Vec<Vec<usize>>;

    fn name(&self) -> &'static str {
        "group_rows"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Vec<Vec<usize>>> {
        match table {
            Table::Grouped(g) => Ok(g.groups().iter().map(|g| g.rows.clone()).collect()),
            other => Err(FrameError::invalid_operation(format!(
                "group_rows requires a grouped table, got {}",
                shape_name(&other)
            ))),
        }
    }
}

/// Split a table into one frame per group (per row when row-wise).
pub fn group_split() -> GroupSplit {
    GroupSplit { selection: None }
}

/// The `group_split` verb builder.
#[derive(Clone, Debug)]
pub struct GroupSplit {
    selection: Option<Collection>,
}

impl GroupSplit {
    /// Group an ungrouped table by this selection first.
    pub fn by(mut self, selection: impl Into<Collection>) -> Self {
        self.selection = Some(selection.into());
        self
    }
}

impl Verb for GroupSplit {
    type Output = Vec<DataFrame>;

    fn name(&self) -> &'static str {
        "group_split"
    }

    fn context(&self) -> Context {
        Context::Select
    }

    fn apply(self, table: Table) -> Result<Vec<DataFrame>> {
        if let Table::Rowwise(r) = &table {
            let df = r.frame();
            return (0..df.height()).map(|i| df.take_indices(&[i])).collect();
        }
        let grouped = ensure_grouped(table, self.selection)?;
        grouped
            .groups()
            .iter()
            .map(|g| grouped.subframe(g))
            .collect()
    }
}

/// Map a function over each group, collecting the results.
pub fn group_map<F, R>(func: F) -> GroupMap<F>
where
    F: Fn(&DataFrame) -> R,
{
    GroupMap { func }
}

/// The `group_map` verb.
pub struct GroupMap<F> {
    func: F,
}

impl<F, R> Verb for GroupMap<F>
where
    F: Fn(&DataFrame) -> R,
{
    type Output = Vec<R>;

    fn name(&self) -> &'static str {
        "group_map"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Vec<R>> {
        match table {
            Table::Grouped(g) => g
                .groups()
                .iter()
                .map(|grp| g.subframe(grp).map(|sub| (self.func)(&sub)))
                .collect(),
            other => Ok(vec![(self.func)(other.frame())]),
        }
    }
}

/// Modify each group with a frame-to-frame function, stacking the results.
pub fn group_modify<F>(func: F) -> GroupModify<F>
where
    F: Fn(&DataFrame) -> Result<DataFrame>,
{
    GroupModify { func }
}

/// The `group_modify` verb.
pub struct GroupModify<F> {
    func: F,
}

impl<F> Verb for GroupModify<F>
where
    F: Fn(&DataFrame) -> Result<DataFrame>,
{
    type Output = Table;

    fn name(&self) -> &'static str {
        "group_modify"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        match table {
            Table::Grouped(g) => {
                let parts = g
                    .groups()
                    .iter()
                    .map(|grp| g.subframe(grp).and_then(|sub| (self.func)(&sub)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Table::Plain(DataFrame::vstack(&parts)?))
            }
            other => Ok(Table::Plain((self.func)(other.frame())?)),
        }
    }
}

/// Walk each group for side effects; the table passes through untouched.
pub fn group_walk<F>(func: F) -> GroupWalk<F>
where
    F: Fn(&DataFrame),
{
    GroupWalk { func }
}

/// The `group_walk` verb.
pub struct GroupWalk<F> {
    func: F,
}

impl<F> Verb for GroupWalk<F>
where
    F: Fn(&DataFrame),
{
    type Output = ();

    fn name(&self) -> &'static str {
        "group_walk"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<()> {
        match table {
            Table::Grouped(g) => {
                for grp in g.groups() {
                    (self.func)(&g.subframe(grp)?);
                }
            }
            other => (self.func)(other.frame()),
        }
        Ok(())
    }
}

/// Recompute group membership, dropping unused levels.
pub fn group_trim() -> GroupTrim {
    GroupTrim
}

/// The `group_trim` verb.
#[derive(Clone, Copy, Debug)]
pub struct GroupTrim;

impl Verb for GroupTrim {
    type Output = Table;

    fn name(&self) -> &'static str {
        "group_trim"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        match table {
            Table::Grouped(g) => {
                let keys = g.keys().to_vec();
                Ok(Table::Grouped(GroupedFrame::new(g.into_frame(), keys)?))
            }
            other => Ok(other),
        }
    }
}

/// Modify the grouping variables for a single operation.
///
/// `None` temporarily ungroups; the function's result is returned as-is.
pub fn with_groups<F>(groups: Option<Collection>, func: F) -> WithGroups<F>
where
    F: FnOnce(Table) -> Result<Table>,
{
    WithGroups { groups, func }
}

/// The `with_groups` verb.
pub struct WithGroups<F> {
    groups: Option<Collection>,
    func: F,
}

impl<F> Verb for WithGroups<F>
where
    F: FnOnce(Table) -> Result<Table>,
{
    type Output = Table;

    fn name(&self) -> &'static str {
        "with_groups"
    }

    fn context(&self) -> Context {
        Context::Unset
    }

    fn apply(self, table: Table) -> Result<Table> {
        let regrouped = match self.groups {
            Some(selection) => group_by(selection).apply(table)?,
            None => Table::Plain(table.into_frame()),
        };
        (self.func)(regrouped)
    }
}

fn ensure_grouped(table: Table, selection: Option<Collection>) -> Result<GroupedFrame> {
    match table {
        Table::Grouped(g) => Ok(g),
        other => {
            let Some(selection) = selection else {
                return Err(FrameError::invalid_operation(format!(
                    "a grouped table (or a grouping selection) is required, got {}",
                    shape_name(&other)
                )));
            };
            match group_by(selection).apply(other)? {
                Table::Grouped(g) => Ok(g),
                _ => unreachable!("group_by returns a grouped table"),
            }
        }
    }
}

fn shape_name(table: &Table) -> &'static str {
    match table {
        Table::Plain(_) => "a plain table",
        Table::Grouped(_) => "a grouped table",
        Table::Rowwise(_) => "a row-wise table",
    }
}
