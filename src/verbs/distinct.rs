use std::collections::HashSet;

use crate::dataframe::{row_keys, GroupedFrame, Table};
use crate::expr::Context;
use crate::selector::{resolve_selectors, Collection, Dedup};
use crate::verbs::mutate::{mutate, Mutation};
use crate::verbs::{list_union, Verb};
use crate::Result;

/// Keep only unique rows, judged over the selected columns (all columns when
/// the selection is empty).
pub fn distinct(selection: impl Into<Collection>) -> Distinct {
    Distinct {
        selection: selection.into(),
        keep_all: false,
        mutations: Vec::new(),
    }
}

/// The `distinct` verb builder.
#[derive(Clone, Debug)]
pub struct Distinct {
    selection: Collection,
    keep_all: bool,
    mutations: Vec<(String, Mutation)>,
}

impl Distinct {
    /// Keep every column, not just the ones uniqueness was judged on.
    pub fn keep_all(mut self, keep_all: bool) -> Self {
        self.keep_all = keep_all;
        self
    }

    /// Compute a column first and include it in the uniqueness key.
    pub fn col(mut self, name: impl Into<String>, value: impl Into<Mutation>) -> Self {
        self.mutations.push((name.into(), value.into()));
        self
    }
}

impl Verb for Distinct {
    type Output = Table;

    fn name(&self) -> &'static str {
        "distinct"
    }

    fn context(&self) -> Context {
        Context::Mixed
    }

    fn apply(self, table: Table) -> Result<Table> {
        let group_keys = table.group_vars().to_vec();
        let grouped = matches!(table, Table::Grouped(_));

        let mut df = table.into_frame();
        let all = df.column_names();
        let mut columns = resolve_selectors(&all, &self.selection, Dedup::Unique)?;
        if grouped {
            columns = list_union(&group_keys, &columns);
        }

        if !self.mutations.is_empty() {
            let mut call = mutate();
            for (name, value) in &self.mutations {
                call = call.col(name.clone(), value.clone());
            }
            df = call.apply(Table::Plain(df))?.into_frame();
            let mutated: Vec<String> = self.mutations.iter().map(|(n, _)| n.clone()).collect();
            columns = list_union(&columns, &mutated);
        }

        if columns.is_empty() {
            columns = df.column_names();
        }

        let keys = row_keys(&df, &columns)?;
        let mut seen = HashSet::new();
        let rows: Vec<usize> = keys
            .into_iter()
            .enumerate()
            .filter(|(_, key)| seen.insert(key.clone()))
            .map(|(row, _)| row)
            .collect();

        let unique = df.take_indices(&rows)?;
        let out = if self.keep_all {
            unique
        } else {
            unique.select_names(&columns)?
        };

        if grouped {
            Ok(Table::Grouped(GroupedFrame::new(out, group_keys)?))
        } else {
            Ok(Table::Plain(out))
        }
    }
}
