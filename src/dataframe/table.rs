use crate::dataframe::{DataFrame, GroupedFrame, RowwiseFrame};

/// A frame together with its grouping envelope.
///
/// Every verb is polymorphic over the three shapes and dispatches with a
/// pattern match rather than runtime-type inspection.
#[derive(Debug, Clone)]
pub enum Table {
    /// An ungrouped frame.
    Plain(DataFrame),
    /// A frame grouped by an ordered key list.
    Grouped(GroupedFrame),
    /// A frame where every row is its own group.
    Rowwise(RowwiseFrame),
}

impl Table {
    /// The underlying frame, whatever the envelope.
    pub fn frame(&self) -> &DataFrame {
        match self {
            Table::Plain(df) => df,
            Table::Grouped(g) => g.frame(),
            Table::Rowwise(r) => r.frame(),
        }
    }

    /// Discard the envelope and return the frame.
    pub fn into_frame(self) -> DataFrame {
        match self {
            Table::Plain(df) => df,
            Table::Grouped(g) => g.into_frame(),
            Table::Rowwise(r) => r.into_frame(),
        }
    }

    /// The number of rows.
    pub fn height(&self) -> usize {
        self.frame().height()
    }

    /// The number of columns.
    pub fn width(&self) -> usize {
        self.frame().width()
    }

    /// Grouping-key column names; empty unless grouped.
    pub fn group_vars(&self) -> &[String] {
        match self {
            Table::Grouped(g) => g.keys(),
            _ => &[],
        }
    }

    /// Whether this table carries the row-wise envelope.
    pub fn is_rowwise(&self) -> bool {
        matches!(self, Table::Rowwise(_))
    }
}

impl From<DataFrame> for Table {
    fn from(df: DataFrame) -> Self {
        Table::Plain(df)
    }
}

impl From<GroupedFrame> for Table {
    fn from(g: GroupedFrame) -> Self {
        Table::Grouped(g)
    }
}

impl From<RowwiseFrame> for Table {
    fn from(r: RowwiseFrame) -> Self {
        Table::Rowwise(r)
    }
}

impl From<Table> for DataFrame {
    fn from(t: Table) -> Self {
        t.into_frame()
    }
}
