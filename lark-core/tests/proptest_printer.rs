//! Property tests for the printer: every source-producible value prints
//! to text that parses back to an equal value, and `quote` is the
//! identity under evaluation.

use std::sync::Arc;

use proptest::prelude::*;

use lark_core::{parse, MapValue, Session, SessionOptions, Value};

fn dedup_map(entries: Vec<(Value, Value)>) -> Value {
    // Literal maps with duplicate keys are not reflexive under map
    // equality, so the generator folds through assoc.
    let map = entries
        .into_iter()
        .fold(MapValue::default(), |m, (k, v)| m.assoc(k, v));
    Value::Map(Arc::new(map))
}

fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        (-1.0e6..1.0e6f64).prop_map(Value::Number),
        (0u32..1000u32).prop_map(|n| Value::Number(f64::from(n))),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Nil),
        "[a-z][a-z0-9+*!?<>=-]{0,8}".prop_map(|s| Value::symbol(&format!("s{s}"))),
        "[a-z]{1,8}".prop_map(|s| Value::keyword(&format!(":{s}"))),
        "[ -~]{0,12}".prop_map(Value::Str),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(|items| Value::list(items)),
            prop::collection::vec(inner.clone(), 0..4).prop_map(|items| Value::vector(items)),
            prop::collection::vec((inner.clone(), inner), 0..3).prop_map(dedup_map),
        ]
    })
}

proptest! {
    #[test]
    fn print_then_parse_round_trips(value in value_strategy()) {
        let printed = value.to_string();
        let forms = parse(&printed).unwrap();
        prop_assert_eq!(forms.len(), 1, "printed form: {}", printed);
        prop_assert_eq!(&forms[0], &value, "printed form: {}", printed);
    }

    #[test]
    fn quote_is_identity_under_evaluation(value in value_strategy()) {
        let mut sess = Session::new(SessionOptions::default()).unwrap();
        let form = Value::list([Value::symbol("quote"), value.clone()]);
        let result = sess.evaluate_forms(&[form]).unwrap();
        prop_assert_eq!(result, value);
    }
}
