use tidyframe::config::{ast_fallback_for, AstFallback};
use tidyframe::expr::{col, lit};
use tidyframe::{
    arrange, filter, group_by, mutate, pipe, select, summarise, ungroup, Context, DataFrame,
    Series, Table, Verb,
};

fn df() -> DataFrame {
    DataFrame::new(vec![
        Series::int64("x", [4, 1, 3, 2]),
        Series::utf8("g", ["a", "a", "b", "b"]),
    ])
    .unwrap()
}

#[test]
fn verbs_chain_through_the_pipe_operator() {
    let out = (df()
        >> filter(col("x").gt(lit(1_i64)))
        >> arrange([col("x")])
        >> select(["x"]))
    .frame()
    .unwrap();
    assert_eq!(
        out.column("x").unwrap().i64_values().unwrap(),
        vec![Some(2), Some(3), Some(4)]
    );
}

#[test]
fn direct_calls_and_piping_agree() {
    let piped = (df() >> mutate().col("y", col("x") * lit(2_i64)))
        .frame()
        .unwrap();
    let direct = mutate()
        .col("y", col("x") * lit(2_i64))
        .apply(Table::Plain(df()))
        .unwrap()
        .into_frame();
    assert!(piped.content_eq(&direct));
}

#[test]
fn errors_short_circuit_the_chain() {
    let out = (df() >> select(["missing"]) >> arrange([col("x")])).into_result();
    assert!(matches!(
        out.unwrap_err(),
        tidyframe::FrameError::ColumnNotFound { .. }
    ));
}

#[test]
fn pipe_applies_arbitrary_functions() {
    let out = (df()
        >> pipe(|t| {
            let df = t.into_frame();
            Ok(Table::Plain(df.with_column(Series::int64(
                "ones",
                vec![1; 4],
            ))?))
        })
        >> select(["ones"]))
    .frame()
    .unwrap();
    assert_eq!(out.column_names(), vec!["ones"]);
}

#[test]
fn grouped_pipeline_round_trip() {
    let out = (df()
        >> group_by("g")
        >> summarise().col("total", col("x").sum())
        >> ungroup())
    .frame()
    .unwrap();
    assert_eq!(out.column_names(), vec!["g", "total"]);
    assert_eq!(
        out.column("total").unwrap().i64_values().unwrap(),
        vec![Some(5), Some(5)]
    );
}

#[test]
fn verbs_declare_their_evaluation_context() {
    assert_eq!(mutate().context(), Context::Pending);
    assert_eq!(group_by("g").context(), Context::Pending);
    assert_eq!(filter(col("x")).context(), Context::Eval);
    assert_eq!(summarise().context(), Context::Eval);
    assert_eq!(select(["x"]).context(), Context::Select);
    assert_eq!(arrange([col("x")]).context(), Context::Eval);
}

#[test]
fn ast_fallback_policy_resolves_through_the_environment() {
    std::env::remove_var("TIDYFRAME_VERB_AST_FALLBACK");
    std::env::remove_var("TIDYFRAME_ARRANGE_AST_FALLBACK");

    // default policy when nothing is configured
    assert_eq!(
        arrange([col("x")]).ast_fallback().unwrap(),
        AstFallback::Normal
    );

    std::env::set_var("TIDYFRAME_VERB_AST_FALLBACK", "raise");
    assert_eq!(
        arrange([col("x")]).ast_fallback().unwrap(),
        AstFallback::Raise
    );

    std::env::set_var("TIDYFRAME_ARRANGE_AST_FALLBACK", "piping");
    assert_eq!(
        arrange([col("x")]).ast_fallback().unwrap(),
        AstFallback::Piping
    );
    assert_eq!(ast_fallback_for("arrange").unwrap(), AstFallback::Piping);
    // other verbs still fall back to the global setting
    assert_eq!(ast_fallback_for("select").unwrap(), AstFallback::Raise);

    std::env::remove_var("TIDYFRAME_VERB_AST_FALLBACK");
    std::env::remove_var("TIDYFRAME_ARRANGE_AST_FALLBACK");
}
