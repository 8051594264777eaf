use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray};
use arrow::compute::kernels::{boolean, cmp, numeric};
use arrow::datatypes::DataType;

use crate::dataframe::{DataFrame, Series};
use crate::expr::{AggFunc, Context, EvalCx, Expr, Operator, Scalar, UnaryOperator};
use crate::{FrameError, Result};

/// Resolve `expr` to concrete values against `df`.
///
/// Column reads are recorded in `cx`. Aggregations collapse to length-1
/// series; binary operations broadcast a length-1 side to the other side's
/// length before applying the Arrow kernel.
pub fn evaluate_series(expr: &Expr, df: &DataFrame, cx: &mut EvalCx) -> Result<Series> {
    match cx.context() {
        Context::Eval | Context::Mixed => {}
        other => {
            return Err(FrameError::invalid_operation(format!(
                "cannot resolve expression to values under {other:?} context"
            )))
        }
    }
    let name = expr.name_hint().unwrap_or("").to_string();
    let array = eval_array(expr, df, cx)?;
    Ok(Series::new(name, array))
}

/// Resolve `expr` to column identifiers (Select context).
pub fn evaluate_names(expr: &Expr, df: &DataFrame) -> Result<Vec<String>> {
    match expr {
        Expr::Column(name) => {
            if !df.has_column(name) {
                return Err(FrameError::column_not_found(name.clone()));
            }
            Ok(vec![name.clone()])
        }
        Expr::Literal(Scalar::Utf8(name)) => {
            if !df.has_column(name) {
                return Err(FrameError::column_not_found(name.clone()));
            }
            Ok(vec![name.clone()])
        }
        Expr::Alias { expr, .. } | Expr::Desc(expr) => evaluate_names(expr, df),
        other => Err(FrameError::invalid_operation(format!(
            "expression does not resolve to column identifiers: {other:?}"
        ))),
    }
}

fn eval_array(expr: &Expr, df: &DataFrame, cx: &mut EvalCx) -> Result<ArrayRef> {
    match expr {
        Expr::Column(name) => {
            cx.track(name);
            Ok(df.column(name)?.array().clone())
        }
        Expr::Literal(s) => Series::from_scalar("", s, df.height().max(1)).map(|s| s.array().clone()),
        Expr::Alias { expr, .. } => eval_array(expr, df, cx),
        Expr::Len => {
            Series::from_scalar("", &Scalar::Int64(df.height() as i64), 1).map(|s| s.array().clone())
        }
        Expr::Desc(_) => Err(FrameError::invalid_operation(
            "descending marker is only valid inside arrange",
        )),
        Expr::UnaryOp { op, expr } => {
            let v = eval_array(expr, df, cx)?;
            match op {
                UnaryOperator::Not => {
                    let b = as_boolean(&v)?;
                    Ok(Arc::new(boolean::not(b)?))
                }
                UnaryOperator::Neg => Ok(numeric::neg(v.as_ref())?),
            }
        }
        Expr::BinaryOp { left, op, right } => {
            let l = eval_array(left, df, cx)?;
            let r = eval_array(right, df, cx)?;
            let (l, r) = align_pair(l, r)?;
            eval_binary(*op, &l, &r)
        }
        Expr::Agg { func, expr } => {
            let v = eval_array(expr, df, cx)?;
            let out = aggregate(*func, &Series::new("", v))?;
            Series::from_scalar("", &out, 1).map(|s| s.array().clone())
        }
    }
}

/// Broadcast a length-1 side of a binary operation to the other's length.
fn align_pair(l: ArrayRef, r: ArrayRef) -> Result<(ArrayRef, ArrayRef)> {
    if l.len() == r.len() {
        return Ok((l, r));
    }
    if l.len() == 1 {
        let l = Series::new("", l).broadcast(r.len())?;
        return Ok((l.array().clone(), r));
    }
    if r.len() == 1 {
        let r = Series::new("", r).broadcast(l.len())?;
        return Ok((l, r.array().clone()));
    }
    Err(FrameError::schema_mismatch(format!(
        "operand length mismatch: {} vs {}",
        l.len(),
        r.len()
    )))
}

fn eval_binary(op: Operator, lhs: &ArrayRef, rhs: &ArrayRef) -> Result<ArrayRef> {
    let l = lhs.as_ref();
    let r = rhs.as_ref();

    match op {
        Operator::Add => Ok(numeric::add(&l, &r)?),
        Operator::Sub => Ok(numeric::sub(&l, &r)?),
        Operator::Mul => Ok(numeric::mul(&l, &r)?),
        Operator::Div => Ok(numeric::div(&l, &r)?),
        Operator::Rem => Ok(numeric::rem(&l, &r)?),
        Operator::Eq => Ok(Arc::new(cmp::eq(&l, &r)?)),
        Operator::Neq => Ok(Arc::new(cmp::neq(&l, &r)?)),
        Operator::Gt => Ok(Arc::new(cmp::gt(&l, &r)?)),
        Operator::Lt => Ok(Arc::new(cmp::lt(&l, &r)?)),
        Operator::Ge => Ok(Arc::new(cmp::gt_eq(&l, &r)?)),
        Operator::Le => Ok(Arc::new(cmp::lt_eq(&l, &r)?)),
        Operator::And => {
            let l = as_boolean(lhs)?;
            let r = as_boolean(rhs)?;
            Ok(Arc::new(boolean::and_kleene(l, r)?))
        }
        Operator::Or => {
            let l = as_boolean(lhs)?;
            let r = as_boolean(rhs)?;
            Ok(Arc::new(boolean::or_kleene(l, r)?))
        }
    }
}

fn as_boolean(array: &ArrayRef) -> Result<&BooleanArray> {
    array.as_any().downcast_ref::<BooleanArray>().ok_or_else(|| {
        FrameError::type_mismatch(
            None::<String>,
            DataType::Boolean.to_string(),
            array.data_type().to_string(),
        )
    })
}

/// Collapse a series to a single scalar with `func`.
pub(crate) fn aggregate(func: AggFunc, series: &Series) -> Result<Scalar> {
    let len = series.len();

    if func == AggFunc::Count {
        let nulls = series.array().null_count();
        return Ok(Scalar::Int64((len - nulls) as i64));
    }

    let integer_input = matches!(
        series.dtype(),
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    );

    let mut acc: Option<f64> = None;
    let mut count = 0_i64;
    for row in 0..len {
        let v = match series.scalar_at(row)? {
            Scalar::Null => continue,
            Scalar::Int64(v) => v as f64,
            Scalar::Float64(v) => v,
            other => {
                return Err(FrameError::type_mismatch(
                    Some(series.name().to_string()),
                    "numeric".to_string(),
                    format!("{other:?}"),
                ))
            }
        };
        count += 1;
        acc = Some(match (func, acc) {
            (_, None) => v,
            (AggFunc::Sum | AggFunc::Mean, Some(a)) => a + v,
            (AggFunc::Min, Some(a)) => a.min(v),
            (AggFunc::Max, Some(a)) => a.max(v),
            (AggFunc::Count, _) => unreachable!("handled above"),
        });
    }

    let Some(acc) = acc else {
        return Ok(Scalar::Null);
    };

    Ok(match func {
        AggFunc::Mean => Scalar::Float64(acc / count as f64),
        AggFunc::Sum | AggFunc::Min | AggFunc::Max if integer_input => Scalar::Int64(acc as i64),
        _ => Scalar::Float64(acc),
    })
}

#[cfg(test)]
mod tests {
    use crate::dataframe::{DataFrame, Series};
    use crate::expr::{col, lit, n, Context, EvalCx, Scalar};

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::int64("a", [1, 2, 3]),
            Series::int64("b", [10, 20, 30]),
        ])
        .unwrap()
    }

    #[test]
    fn column_arithmetic_with_literal_broadcast() {
        let mut cx = EvalCx::new(Context::Eval);
        let out = super::evaluate_series(&(col("a") * lit(2_i64)), &df(), &mut cx).unwrap();
        assert_eq!(out.i64_values().unwrap(), vec![Some(2), Some(4), Some(6)]);
        assert_eq!(cx.used_refs(), &["a".to_string()]);
    }

    #[test]
    fn aggregation_collapses_to_length_one() {
        let mut cx = EvalCx::new(Context::Eval);
        let out = super::evaluate_series(&col("b").sum(), &df(), &mut cx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.scalar_at(0).unwrap(), Scalar::Int64(60));
    }

    #[test]
    fn len_reports_frame_height() {
        let mut cx = EvalCx::new(Context::Eval);
        let out = super::evaluate_series(&n(), &df(), &mut cx).unwrap();
        assert_eq!(out.scalar_at(0).unwrap(), Scalar::Int64(3));
    }

    #[test]
    fn select_context_rejects_value_evaluation() {
        let mut cx = EvalCx::new(Context::Select);
        let err = super::evaluate_series(&col("a"), &df(), &mut cx).unwrap_err();
        assert!(matches!(err, crate::FrameError::InvalidOperation { .. }));
    }

    #[test]
    fn evaluate_names_resolves_columns_only() {
        let names = super::evaluate_names(&col("a"), &df()).unwrap();
        assert_eq!(names, vec!["a".to_string()]);
        let err = super::evaluate_names(&col("missing"), &df()).unwrap_err();
        assert!(matches!(err, crate::FrameError::ColumnNotFound { .. }));
    }
}
