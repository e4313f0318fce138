//! End-to-end folds of `group_replace` through the registry and driver.

use std::thread;

use greplace::{Aggregation, Cx, ReplaceConfig, ReplaceError, SqliteValue, registry_with_config};
use proptest::prelude::*;

fn text(s: &str) -> SqliteValue {
    SqliteValue::from(s)
}

fn prepare(num_args: usize) -> Aggregation {
    prepare_with(num_args, ReplaceConfig::default())
}

fn prepare_with(num_args: usize, config: ReplaceConfig) -> Aggregation {
    let registry = registry_with_config(&config).unwrap();
    Aggregation::prepare(&registry, "group_replace", num_args).unwrap()
}

fn rows3(template: &str, pairs: &[(&str, &str)]) -> Vec<Vec<SqliteValue>> {
    pairs
        .iter()
        .map(|(k, v)| vec![text(template), text(k), text(v)])
        .collect()
}

#[test]
fn placeholders_filled_across_rows() {
    let template = "Hello, my name is NAME, i'm AGE years old";
    let result = prepare(3)
        .run_group(&Cx::new(), rows3(template, &[("NAME", "Anthony"), ("AGE", "25")]))
        .unwrap();
    assert_eq!(result, text("Hello, my name is Anthony, i'm 25 years old"));
}

#[test]
fn every_occurrence_replaced_in_one_row() {
    let template = "this example contains two keys, %key and %key";
    let result = prepare(3)
        .run_group(&Cx::new(), rows3(template, &[("%key", "value")]))
        .unwrap();
    assert_eq!(result, text("this example contains two keys, value and value"));
}

#[test]
fn framed_key_replaces_whole_placeholder() {
    let result = prepare(5)
        .run_group(
            &Cx::new(),
            [vec![
                text("cost: {AMOUNT}"),
                text("AMOUNT"),
                text("42"),
                text("{"),
                text("}"),
            ]],
        )
        .unwrap();
    assert_eq!(result, text("cost: 42"));
}

#[test]
fn numeric_key_fails_group_without_text() {
    let err = prepare(3)
        .run_group(
            &Cx::new(),
            [vec![text("total: N"), SqliteValue::Integer(7), text("x")]],
        )
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidArgumentType");
}

#[test]
fn self_reintroducing_value_terminates() {
    // The scan resumes after each inserted value, so one row makes one pass.
    let result = prepare(3)
        .run_group(&Cx::new(), rows3("a", &[("a", "aa")]))
        .unwrap();
    assert_eq!(result, text("aa"));
}

#[test]
fn iteration_limit_bounds_one_step() {
    let agg = prepare_with(3, ReplaceConfig::default().with_max_iterations(3));
    let err = agg
        .run_group(&Cx::new(), rows3("a a a a", &[("a", "b")]))
        .unwrap_err();
    assert_eq!(err, ReplaceError::IterationLimitExceeded { limit: 3 });

    let ok = agg
        .run_group(&Cx::new(), rows3("a a a", &[("a", "b")]))
        .unwrap();
    assert_eq!(ok, text("b b b"));
}

#[test]
fn growth_across_rows_hits_length_limit() {
    let agg = prepare_with(3, ReplaceConfig::default().with_max_length(1024));
    let rows = vec![vec![text("a"), text("a"), text("aa")]; 64];
    let err = agg.run_group(&Cx::new(), rows).unwrap_err();
    assert!(matches!(
        err,
        ReplaceError::AllocationFailure {
            requested: 1025,
            max: 1024
        }
    ));
}

#[test]
fn row_order_matters() {
    let agg = prepare(3);
    let forward = agg
        .run_group(&Cx::new(), rows3("A", &[("A", "B"), ("B", "C")]))
        .unwrap();
    let reversed = agg
        .run_group(&Cx::new(), rows3("A", &[("B", "C"), ("A", "B")]))
        .unwrap();
    assert_eq!(forward, text("C"));
    assert_eq!(reversed, text("B"));
}

#[test]
fn interleaved_groups_are_independent() {
    let agg = prepare(3);
    let rows = vec![
        ("en", vec![text("Hi NAME"), text("NAME"), text("Ada")]),
        ("fr", vec![text("Salut NAME"), text("NAME"), text("Lin")]),
        ("bad", vec![text("x"), SqliteValue::Null, text("y")]),
        ("en", vec![text("Hi NAME"), text("Hi"), text("Hello")]),
        ("bad", vec![text("x"), text("x"), text("y")]),
    ];
    let outcomes = agg.run(&Cx::new(), rows);
    let keys: Vec<_> = outcomes.iter().map(|o| o.key).collect();
    assert_eq!(keys, ["en", "fr", "bad"]);
    assert_eq!(outcomes[0].result, Ok(text("Hello Ada")));
    assert_eq!(outcomes[1].result, Ok(text("Salut Lin")));
    assert_eq!(
        outcomes[2].result.as_ref().map_err(ReplaceError::kind),
        Err("InvalidArgumentType")
    );
}

#[test]
fn cancellation_mid_run_interrupts_open_groups() {
    let agg = prepare(3);
    let cx = Cx::new();
    let mut first = agg.begin_group();
    first.accumulate(&cx, &[text("a"), text("a"), text("b")]).unwrap();

    cx.cancel();
    let err = first
        .accumulate(&cx, &[text("a"), text("b"), text("c")])
        .unwrap_err();
    assert_eq!(err, ReplaceError::Interrupted);
    assert_eq!(first.finish(), Err(ReplaceError::Interrupted));
}

#[test]
fn unsupported_arity_fails_at_prepare() {
    let registry = registry_with_config(&ReplaceConfig::default()).unwrap();
    for n in [2, 6] {
        let err = Aggregation::prepare(&registry, "group_replace", n).unwrap_err();
        assert!(matches!(err, ReplaceError::NoSuchFunction { num_args, .. } if num_args == n));
    }
}

#[test]
fn empty_group_finishes_null() {
    let agg = prepare(3);
    assert_eq!(agg.begin_group().finish(), Ok(SqliteValue::Null));
}

#[test]
fn groups_fold_on_separate_threads() {
    let agg = prepare(3);
    let cx = Cx::new();
    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let agg = &agg;
                let cx = &cx;
                s.spawn(move || {
                    let value = i.to_string();
                    agg.run_group(cx, rows3("id=ID", &[("ID", value.as_str())]))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result, Ok(SqliteValue::Text(format!("id={i}"))));
    }
}

#[test]
fn folds_can_move_between_threads() {
    let agg = prepare(3);
    let cx = Cx::new();
    let mut fold = agg.begin_group();
    fold.accumulate(&cx, &[text("x y"), text("x"), text("1")]).unwrap();
    let result = thread::spawn(move || {
        fold.accumulate(&Cx::new(), &[text("x y"), text("y"), text("2")])
            .unwrap();
        fold.finish()
    })
    .join()
    .unwrap();
    assert_eq!(result, Ok(text("1 2")));
}

proptest! {
    #[test]
    fn absent_key_leaves_text_unchanged(template in "[a-m ]{0,40}", key in "[n-z]{1,5}") {
        let result = prepare(3)
            .run_group(&Cx::new(), rows3(&template, &[(key.as_str(), "VALUE")]))
            .unwrap();
        prop_assert_eq!(result, SqliteValue::Text(template));
    }

    #[test]
    fn single_row_matches_std_replace(
        template in "[ab ]{0,40}",
        key in "[ab]{1,3}",
        value in "[a-c]{0,4}",
    ) {
        let result = prepare(3)
            .run_group(&Cx::new(), rows3(&template, &[(key.as_str(), value.as_str())]))
            .unwrap();
        prop_assert_eq!(result, SqliteValue::Text(template.replace(&key, &value)));
    }

    #[test]
    fn framing_equals_concatenated_key(
        template in "[a-d{}]{0,30}",
        key in "[a-d]{1,3}",
        value in "[x-z]{0,3}",
    ) {
        let agg3 = prepare(3);
        let agg5 = prepare(5);
        let framed_key = format!("{{{key}}}");
        let plain = agg3
            .run_group(&Cx::new(), rows3(&template, &[(framed_key.as_str(), value.as_str())]))
            .unwrap();
        let framed = agg5
            .run_group(
                &Cx::new(),
                [vec![text(&template), text(&key), text(&value), text("{"), text("}")]],
            )
            .unwrap();
        prop_assert_eq!(plain, framed);
    }
}
