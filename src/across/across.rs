use std::sync::Arc;

use crate::dataframe::{append_aligned, DataFrame, Series};
use crate::expr::{Context, Scalar};
use crate::selector::{resolve_selectors, Collection, Dedup};
use crate::{FrameError, Result};

/// A column function: receives the column's values plus the verb-call extras.
pub type SeriesFn = Arc<dyn Fn(&Series, &[Scalar]) -> Result<Series> + Send + Sync>;

/// An extra argument forwarded to every function application.
#[derive(Clone)]
pub enum Arg {
    /// A concrete value.
    Value(Scalar),
    /// Placeholder substituted with the name of the column currently being
    /// processed.
    CurrentColumn,
}

impl std::fmt::Debug for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Value(v) => write!(f, "Value({v:?})"),
            Arg::CurrentColumn => write!(f, "CurrentColumn"),
        }
    }
}

/// The functions of an `Across`: nothing, one, a positional list, or a
/// name-labelled set.
#[derive(Clone, Default)]
pub enum AcrossFns {
    /// No functions: selection yields columns, value context applies identity.
    #[default]
    None,
    /// A single unlabelled function.
    Single(SeriesFn),
    /// Positionally indexed functions (index used in output naming).
    List(Vec<SeriesFn>),
    /// Name-labelled functions (label used in output naming).
    Named(Vec<(String, SeriesFn)>),
}

#[derive(Clone)]
pub(crate) struct FnRecord {
    pub(crate) label: FnLabel,
    pub(crate) func: SeriesFn,
}

#[derive(Clone)]
pub(crate) enum FnLabel {
    Single,
    Indexed(usize),
    Named(String),
}

/// Result of evaluating an `Across` under a caller context.
#[derive(Debug)]
pub enum AcrossResult {
    /// Selection context: resolved (or transformed) column names.
    Columns(Vec<String>),
    /// Value context: computed columns assembled into a frame.
    Frame(DataFrame),
}

/// Deferred "apply function(s) across columns" descriptor.
///
/// Columns are resolved against the frame at construction time, never left as
/// selectors; the descriptor is consumed exactly once by `evaluate`.
#[derive(Clone)]
pub struct Across {
    cols: Vec<String>,
    fns: Vec<FnRecord>,
    names: Option<String>,
    args: Vec<Arg>,
}

impl std::fmt::Debug for Across {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Across")
            .field("cols", &self.cols)
            .field("fns", &self.fns.len())
            .field("names", &self.names)
            .finish()
    }
}

impl Across {
    /// Build a descriptor over `cols` of `data` (`None` selects all columns,
    /// resolved now, not at evaluation time).
    pub fn new(data: &DataFrame, cols: Option<Collection>, fns: AcrossFns) -> Result<Self> {
        let all = data.column_names();
        let cols = match cols {
            None => all,
            Some(selection) => resolve_selectors(&all, &selection, Dedup::Unique)?,
        };

        let fns = match fns {
            AcrossFns::None => Vec::new(),
            AcrossFns::Single(func) => vec![FnRecord {
                label: FnLabel::Single,
                func,
            }],
            AcrossFns::List(list) => list
                .into_iter()
                .enumerate()
                .map(|(i, func)| FnRecord {
                    label: FnLabel::Indexed(i),
                    func,
                })
                .collect(),
            AcrossFns::Named(named) => named
                .into_iter()
                .map(|(name, func)| FnRecord {
                    label: FnLabel::Named(name),
                    func,
                })
                .collect(),
        };

        Ok(Self {
            cols,
            fns,
            names: None,
            args: Vec::new(),
        })
    }

    /// Set the output naming template (`{col}` and `{fn}` placeholders).
    pub fn with_names(mut self, template: impl Into<String>) -> Self {
        self.names = Some(template.into());
        self
    }

    /// Forward extra arguments to every function application.
    pub fn with_args(mut self, args: Vec<Arg>) -> Self {
        self.args = args;
        self
    }

    /// The resolved column names.
    pub fn cols(&self) -> &[String] {
        &self.cols
    }

    /// Whether any functions were supplied.
    pub fn has_fns(&self) -> bool {
        !self.fns.is_empty()
    }

    pub(crate) fn fn_count(&self) -> usize {
        self.fns.len()
    }

    pub(crate) fn set_names(&mut self, name: impl Into<String>) {
        self.names = Some(name.into());
    }

    pub(crate) fn names(&self) -> Option<&str> {
        self.names.as_deref()
    }

    /// Evaluate under the caller's context.
    pub fn evaluate(&self, data: &DataFrame, context: Context) -> Result<AcrossResult> {
        match context {
            Context::Select => self.evaluate_select().map(AcrossResult::Columns),
            _ => self.evaluate_frame(data).map(AcrossResult::Frame),
        }
    }

    /// Selection context: no functions yields the column list; exactly one
    /// function is applied to each column *name*.
    pub(crate) fn evaluate_select(&self) -> Result<Vec<String>> {
        if self.fns.is_empty() {
            return Ok(self.cols.clone());
        }
        if self.fns.len() > 1 {
            return Err(FrameError::TooManyFunctions {
                what: "across in selection context",
            });
        }
        let func = &self.fns[0].func;
        let mut out = Vec::with_capacity(self.cols.len());
        for col in &self.cols {
            let name_series = Series::from_scalar(col.clone(), &Scalar::Utf8(col.clone()), 1)?;
            let result = func(&name_series, &substitute_args(&self.args, col))?;
            match (result.len(), result.scalar_at(0)?) {
                (1, Scalar::Utf8(name)) => out.push(name),
                _ => {
                    return Err(FrameError::type_mismatch(
                        Some(col.clone()),
                        "a single column name".to_string(),
                        result.dtype().to_string(),
                    ))
                }
            }
        }
        Ok(out)
    }

    /// Value context: column × function, assembled left-to-right.
    pub(crate) fn evaluate_frame(&self, data: &DataFrame) -> Result<DataFrame> {
        let identity: Vec<FnRecord> = vec![FnRecord {
            label: FnLabel::Single,
            func: Arc::new(|s: &Series, _: &[Scalar]| Ok(s.clone())),
        }];
        let fns = if self.fns.is_empty() {
            &identity
        } else {
            &self.fns
        };

        let mut ret: Option<DataFrame> = None;
        for col in &self.cols {
            let series = data.column(col)?;
            for record in fns {
                let name = render_name(self.names.as_deref(), col, &record.label);
                let args = substitute_args(&self.args, col);
                let value = (record.func)(&series, &args)?;
                append_aligned(&mut ret, &name, value)?;
            }
        }
        Ok(ret.unwrap_or_else(DataFrame::empty))
    }
}

/// Columns-combined-across: one function applied to each row's selected
/// columns as a vector, when the table is row-wise.
#[derive(Clone, Debug)]
pub struct CAcross {
    inner: Across,
}

impl CAcross {
    /// Build a row-combining descriptor; exactly one function is required.
    pub fn new(data: &DataFrame, cols: Option<Collection>, fns: AcrossFns) -> Result<Self> {
        let inner = Across::new(data, cols, fns)?;
        if !inner.has_fns() {
            return Err(FrameError::NoFunction { what: "c_across" });
        }
        if inner.fn_count() > 1 {
            return Err(FrameError::TooManyFunctions { what: "c_across" });
        }
        Ok(Self { inner })
    }

    /// Name the output column (mutate/summarise assign their binding key).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.inner.set_names(name);
        self
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        if self.inner.names().is_none() {
            self.inner.set_names(name);
        }
    }

    /// Evaluate: row-wise tables combine each row's selected columns into a
    /// vector input; otherwise this degrades to plain `Across` behavior.
    pub fn evaluate(&self, data: &DataFrame, rowwise: bool) -> Result<DataFrame> {
        if !rowwise {
            return self.inner.evaluate_frame(data);
        }

        let name = self.inner.names().unwrap_or("c_across").to_string();
        let args = self
            .inner
            .args
            .iter()
            .map(|a| match a {
                Arg::Value(v) => Ok(v.clone()),
                Arg::CurrentColumn => Err(FrameError::invalid_operation(
                    "current-column marker is not available in row-wise application",
                )),
            })
            .collect::<Result<Vec<_>>>()?;

        let columns = self
            .inner
            .cols
            .iter()
            .map(|c| data.column(c))
            .collect::<Result<Vec<_>>>()?;
        let func = &self.inner.fns[0].func;

        let mut out = Vec::with_capacity(data.height());
        for row in 0..data.height() {
            let values = columns
                .iter()
                .map(|s| s.scalar_at(row))
                .collect::<Result<Vec<_>>>()?;
            let row_series = Series::from_scalars(&name, &values)?;
            let result = func(&row_series, &args)?;
            if result.len() != 1 {
                return Err(FrameError::invalid_operation(format!(
                    "row-wise function must collapse each row to one value, got length {}",
                    result.len()
                )));
            }
            out.push(result.scalar_at(0)?);
        }
        DataFrame::new(vec![Series::from_scalars(name, &out)?])
    }

    pub(crate) fn inner(&self) -> &Across {
        &self.inner
    }
}

impl Across {
    pub(crate) fn records(&self) -> &[FnRecord] {
        &self.fns
    }

    pub(crate) fn args(&self) -> &[Arg] {
        &self.args
    }
}

pub(crate) fn substitute_args(args: &[Arg], column: &str) -> Vec<Scalar> {
    args.iter()
        .map(|a| match a {
            Arg::Value(v) => v.clone(),
            Arg::CurrentColumn => Scalar::Utf8(column.to_string()),
        })
        .collect()
}

pub(crate) fn render_name(template: Option<&str>, col: &str, label: &FnLabel) -> String {
    let fn_label = match label {
        FnLabel::Single => String::new(),
        FnLabel::Indexed(i) => i.to_string(),
        FnLabel::Named(name) => name.clone(),
    };
    let template = match template {
        Some(t) => t,
        None => match label {
            FnLabel::Single => "{col}",
            _ => "{col}_{fn}",
        },
    };
    template.replace("{col}", col).replace("{fn}", &fn_label)
}

#[cfg(test)]
mod tests {
    use super::{Across, AcrossFns, Arg, CAcross};
    use crate::across::series_fn;
    use crate::dataframe::{DataFrame, Series};
    use crate::expr::{Context, Scalar};
    use crate::funcs;

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::int64("x", [1, 2]),
            Series::int64("y", [3, 4]),
        ])
        .unwrap()
    }

    #[test]
    fn selection_context_without_fns_returns_columns() {
        let a = Across::new(&df(), None, AcrossFns::None).unwrap();
        match a.evaluate(&df(), Context::Select).unwrap() {
            super::AcrossResult::Columns(cols) => {
                assert_eq!(cols, vec!["x".to_string(), "y".to_string()])
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn selection_context_applies_one_fn_to_names() {
        let upper = series_fn(|s: &Series, _| {
            let Scalar::Utf8(name) = s.scalar_at(0)? else {
                unreachable!()
            };
            Series::from_scalar(s.name(), &Scalar::Utf8(name.to_uppercase()), 1)
        });
        let a = Across::new(&df(), None, AcrossFns::Single(upper)).unwrap();
        assert_eq!(
            a.evaluate_select().unwrap(),
            vec!["X".to_string(), "Y".to_string()]
        );
    }

    #[test]
    fn selection_context_rejects_multiple_fns() {
        let f = series_fn(|s: &Series, _| Ok(s.clone()));
        let a = Across::new(&df(), None, AcrossFns::List(vec![f.clone(), f])).unwrap();
        let err = a.evaluate_select().unwrap_err();
        assert!(matches!(err, crate::FrameError::TooManyFunctions { .. }));
    }

    #[test]
    fn value_context_names_columns_by_fn_index() {
        let a = Across::new(
            &df(),
            None,
            AcrossFns::List(vec![funcs::sum(), funcs::sum()]),
        )
        .unwrap();
        let out = a.evaluate_frame(&df()).unwrap();
        assert_eq!(out.column_names(), vec!["x_0", "x_1", "y_0", "y_1"]);
        assert_eq!(
            out.column("y_1").unwrap().i64_values().unwrap(),
            vec![Some(7)]
        );
    }

    #[test]
    fn current_column_marker_substitutes_per_column() {
        let f = series_fn(|s: &Series, args: &[Scalar]| {
            assert_eq!(args.len(), 1);
            let Scalar::Utf8(col) = &args[0] else {
                panic!("expected substituted column name")
            };
            Series::from_scalar(s.name(), &Scalar::Utf8(col.clone()), s.len())
        });
        let a = Across::new(&df(), None, AcrossFns::Single(f))
            .unwrap()
            .with_args(vec![Arg::CurrentColumn]);
        let out = a.evaluate_frame(&df()).unwrap();
        assert_eq!(
            out.column("x").unwrap().str_values().unwrap(),
            vec![Some("x".to_string()), Some("x".to_string())]
        );
    }

    #[test]
    fn c_across_requires_exactly_one_fn() {
        let err = CAcross::new(&df(), None, AcrossFns::None).unwrap_err();
        assert!(matches!(err, crate::FrameError::NoFunction { .. }));

        let f = series_fn(|s: &Series, _| Ok(s.clone()));
        let err = CAcross::new(&df(), None, AcrossFns::List(vec![f.clone(), f])).unwrap_err();
        assert!(matches!(err, crate::FrameError::TooManyFunctions { .. }));
    }

    #[test]
    fn c_across_combines_rows_when_rowwise() {
        let c = CAcross::new(&df(), None, AcrossFns::Single(funcs::sum()))
            .unwrap()
            .with_name("total");
        let out = c.evaluate(&df(), true).unwrap();
        assert_eq!(
            out.column("total").unwrap().i64_values().unwrap(),
            vec![Some(4), Some(6)]
        );
    }
}
