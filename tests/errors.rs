use tidyframe::expr::col;
use tidyframe::{
    filter, group_by, if_any, mutate, relocate, select, AcrossFns, CAcross, DataFrame, FrameError,
    Series, Table, Verb,
};

fn df() -> DataFrame {
    DataFrame::new(vec![
        Series::int64("a", [1, 2]),
        Series::int64("b", [3, 4]),
    ])
    .unwrap()
}

#[test]
fn unknown_selector_name_is_a_column_not_found_error() {
    let err = select("missing").apply(Table::Plain(df())).unwrap_err();
    assert!(matches!(err, FrameError::ColumnNotFound { name } if name == "missing"));
}

#[test]
fn unknown_expression_column_is_reported_with_its_name() {
    let err = mutate()
        .col("x", col("missing"))
        .apply(Table::Plain(df()))
        .unwrap_err();
    assert!(matches!(err, FrameError::ColumnNotFound { name } if name == "missing"));
}

#[test]
fn group_by_unknown_key_errors() {
    let err = group_by("missing").apply(Table::Plain(df())).unwrap_err();
    assert!(matches!(err, FrameError::ColumnNotFound { .. }));
}

#[test]
fn c_across_without_function_is_a_no_function_error() {
    let err = CAcross::new(&df(), None, AcrossFns::None).unwrap_err();
    assert!(matches!(err, FrameError::NoFunction { .. }));
    assert!(err.to_string().contains("c_across"));
}

#[test]
fn if_any_with_two_functions_is_a_too_many_functions_error() {
    let f = tidyframe::series_fn(|s: &Series, _| Ok(s.clone()));
    let err = if_any(&df(), None, AcrossFns::List(vec![f.clone(), f])).unwrap_err();
    assert!(matches!(err, FrameError::TooManyFunctions { .. }));
}

#[test]
fn relocate_with_both_directives_is_a_conflict_error() {
    let err = relocate("a")
        .before("b")
        .after("b")
        .apply(Table::Plain(df()))
        .unwrap_err();
    assert!(matches!(
        err,
        FrameError::ConflictingDirective {
            first: "_before",
            second: "_after",
            ..
        }
    ));
}

#[test]
fn non_boolean_filter_condition_is_a_type_error() {
    let data = DataFrame::new(vec![Series::utf8("s", ["x", "y"])]).unwrap();
    let err = filter(col("s")).apply(Table::Plain(data)).unwrap_err();
    assert!(matches!(err, FrameError::TypeMismatch { .. }));
}

#[test]
fn length_mismatch_in_mutate_is_a_schema_error() {
    let bad = tidyframe::series_fn(|s: &Series, _| Ok(Series::int64(s.name(), [1, 2, 3])));
    let a = tidyframe::Across::new(&df(), Some("a".into()), AcrossFns::Single(bad)).unwrap();
    let err = mutate().across(a).apply(Table::Plain(df())).unwrap_err();
    assert!(matches!(err, FrameError::SchemaMismatch { .. }));
}
