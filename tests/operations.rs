use tidyframe::expr::{col, desc, lit};
use tidyframe::{
    arrange, filter, funcs, if_any, mutate, select, slice_head, summarise, transmute, Across,
    AcrossFns, DataFrame, Keep, Mutation, Series, Table, Verb,
};

fn df() -> DataFrame {
    DataFrame::new(vec![
        Series::int64("x", [1, 2]),
        Series::int64("y", [3, 4]),
    ])
    .unwrap()
}

#[test]
fn across_value_context_uses_fn_index_naming() {
    // Across(cols = [x, y], fns = [sum, sum]) in value context
    let a = Across::new(
        &df(),
        None,
        AcrossFns::List(vec![funcs::sum(), funcs::sum()]),
    )
    .unwrap();

    let out = mutate()
        .across(a)
        .keep(Keep::None)
        .apply(Table::Plain(df()))
        .unwrap()
        .into_frame();
    assert_eq!(out.column_names(), vec!["x_0", "x_1", "y_0", "y_1"]);
    assert_eq!(
        out.column("x_0").unwrap().i64_values().unwrap(),
        vec![Some(3), Some(3)]
    );
    assert_eq!(
        out.column("y_1").unwrap().i64_values().unwrap(),
        vec![Some(7), Some(7)]
    );
}

#[test]
fn across_named_fns_use_labels() {
    let a = Across::new(
        &df(),
        Some("x".into()),
        AcrossFns::Named(vec![
            ("lo".to_string(), funcs::min()),
            ("hi".to_string(), funcs::max()),
        ]),
    )
    .unwrap();
    let out = summarise().across(a).apply(Table::Plain(df())).unwrap().into_frame();
    assert_eq!(out.column_names(), vec!["x_lo", "x_hi"]);
}

#[test]
fn across_naming_template_overrides_default() {
    let a = Across::new(
        &df(),
        Some("x".into()),
        AcrossFns::Named(vec![("total".to_string(), funcs::sum())]),
    )
    .unwrap()
    .with_names("{fn}_of_{col}");
    let out = summarise().across(a).apply(Table::Plain(df())).unwrap().into_frame();
    assert_eq!(out.column_names(), vec!["total_of_x"]);
}

#[test]
fn if_any_filters_rows_with_any_positive() {
    let data = DataFrame::new(vec![
        Series::int64("a", [1, -1, 2]),
        Series::int64("b", [-1, -1, 2]),
    ])
    .unwrap();

    let positive = AcrossFns::Single(tidyframe::series_fn(|s: &Series, _| {
        let flags: Vec<bool> = s
            .i64_values()?
            .into_iter()
            .map(|v| v.map(|x| x > 0).unwrap_or(false))
            .collect();
        Ok(Series::boolean(s.name(), flags))
    }));

    let cond = if_any(&data, Some(["a", "b"].into()), positive).unwrap();
    let out = filter(cond).apply(Table::Plain(data)).unwrap().into_frame();
    assert_eq!(
        out.column("a").unwrap().i64_values().unwrap(),
        vec![Some(1), Some(2)]
    );
}

#[test]
fn arrange_mixes_directions() {
    let data = DataFrame::new(vec![
        Series::utf8("g", ["b", "a", "a", "b"]),
        Series::int64("x", [1, 2, 3, 4]),
    ])
    .unwrap();
    let out = arrange([col("g"), desc(col("x"))])
        .apply(Table::Plain(data))
        .unwrap()
        .into_frame();
    assert_eq!(
        out.column("x").unwrap().i64_values().unwrap(),
        vec![Some(3), Some(2), Some(4), Some(1)]
    );
}

#[test]
fn transmute_keeps_declaration_order() {
    let out = transmute()
        .col("b", col("y"))
        .col("a", col("x"))
        .apply(Table::Plain(df()))
        .unwrap()
        .into_frame();
    assert_eq!(out.column_names(), vec!["b", "a"]);
}

#[test]
fn mutate_keep_all_preserves_untouched_values() {
    let original = df();
    let out = mutate()
        .col("z", col("x") + lit(1_i64))
        .apply(Table::Plain(original.clone()))
        .unwrap()
        .into_frame();
    assert!(out
        .column("y")
        .unwrap()
        .array()
        .eq(original.column("y").unwrap().array()));
}

#[test]
fn select_then_slice_pipeline() {
    let out = (df() >> select(["y", "x"]) >> slice_head().n(1))
        .frame()
        .unwrap();
    assert_eq!(out.column_names(), vec!["y", "x"]);
    assert_eq!(out.height(), 1);
}

#[test]
fn inverted_selects_everything_except() {
    let data = df();
    let inv = tidyframe::Inverted::new("x", &data);
    let out = select(inv).apply(Table::Plain(data)).unwrap().into_frame();
    assert_eq!(out.column_names(), vec!["y"]);
}

#[test]
fn negated_selection_drops_columns() {
    let out = select(tidyframe::Negated::new("y"))
        .apply(Table::Plain(df()))
        .unwrap()
        .into_frame();
    assert_eq!(out.column_names(), vec!["x"]);
}

#[test]
fn multi_column_values_pack_under_compound_names() {
    let a = Across::new(
        &df(),
        None,
        AcrossFns::List(vec![funcs::min(), funcs::max()]),
    )
    .unwrap();
    let out = mutate()
        .col("stats", a)
        .apply(Table::Plain(df()))
        .unwrap()
        .into_frame();
    assert!(out.has_column("stats$x_0"));
    assert!(out.has_column("stats$y_1"));

    match tidyframe::pull("stats").apply(Table::Plain(out)).unwrap() {
        tidyframe::Pulled::Frame(packed) => {
            assert_eq!(packed.column_names(), vec!["x_0", "x_1", "y_0", "y_1"]);
        }
        other => panic!("unexpected pull result: {other:?}"),
    }
}

#[test]
fn summarise_across_with_ready_made_fns() {
    let a = Across::new(
        &df(),
        Some("x".into()),
        AcrossFns::Named(vec![
            ("avg".to_string(), funcs::mean()),
            ("nonnull".to_string(), funcs::count()),
        ]),
    )
    .unwrap();
    let out = summarise().across(a).apply(Table::Plain(df())).unwrap().into_frame();
    assert_eq!(out.column_names(), vec!["x_avg", "x_nonnull"]);
    assert_eq!(
        out.column("x_nonnull").unwrap().i64_values().unwrap(),
        vec![Some(2)]
    );
}

#[test]
fn mutate_drop_via_none_equivalent() {
    let out = mutate()
        .col("x", Mutation::Drop)
        .apply(Table::Plain(df()))
        .unwrap()
        .into_frame();
    assert_eq!(out.column_names(), vec!["y"]);
}
