use lark_core::convert::{from_json, to_json};
use lark_core::{Session, SessionOptions, Value};
use serde_json::json;

fn eval(input: &str) -> Value {
    let mut sess = Session::new(SessionOptions::default()).unwrap();
    sess.evaluate(input).unwrap()
}

// ============================================================================
// Value -> JSON
// ============================================================================

#[test]
fn scalars_cross_directly() {
    assert_eq!(to_json(&Value::Nil).unwrap(), json!(null));
    assert_eq!(to_json(&Value::Bool(true)).unwrap(), json!(true));
    assert_eq!(to_json(&Value::Number(1.5)).unwrap(), json!(1.5));
    assert_eq!(
        to_json(&Value::Str("hi".to_string())).unwrap(),
        json!("hi")
    );
}

#[test]
fn keywords_cross_as_bare_strings() {
    assert_eq!(to_json(&eval(":port")).unwrap(), json!("port"));
    assert_eq!(to_json(&eval("'sym")).unwrap(), json!("sym"));
}

#[test]
fn sequences_cross_as_arrays() {
    assert_eq!(to_json(&eval("[1 \"a\" nil]")).unwrap(), json!([1.0, "a", null]));
    assert_eq!(to_json(&eval("'(1 2)")).unwrap(), json!([1.0, 2.0]));
}

#[test]
fn maps_with_scalar_keys_cross_as_objects() {
    let value = eval("{:name \"ada\" :age 36}");
    assert_eq!(
        to_json(&value).unwrap(),
        json!({"name": "ada", "age": 36.0})
    );
    assert_eq!(to_json(&eval("{1 :one}")).unwrap(), json!({"1": "one"}));
}

#[test]
fn collection_keys_cannot_cross() {
    let err = to_json(&eval("{[1 2] :v}")).unwrap_err();
    assert!(err.to_string().contains("key"));
}

#[test]
fn callables_cannot_cross() {
    let err = to_json(&eval("(fn [x] x)")).unwrap_err();
    assert!(err.to_string().contains("cannot cross"));
    let err = to_json(&eval("inc")).unwrap_err();
    assert!(err.to_string().contains("cannot cross"));
}

// ============================================================================
// JSON -> Value
// ============================================================================

#[test]
fn objects_become_keyword_keyed_maps() {
    let value = from_json(&json!({"name": "ada", "tags": ["a", "b"]}));
    assert_eq!(value, eval("{:name \"ada\" :tags [\"a\" \"b\"]}"));
}

#[test]
fn arrays_become_vectors() {
    assert_eq!(from_json(&json!([1, 2])), eval("[1 2]"));
}

#[test]
fn scalars_round_trip() {
    for src in ["nil", "true", "1.5", "\"hi\"", "[1 [2 {:a 3}]]"] {
        let value = eval(src);
        let back = from_json(&to_json(&value).unwrap());
        // Keyword values flatten to strings on the way out; keys and
        // everything else round-trip exactly.
        assert_eq!(back, value, "round-tripping {src}");
    }
}

#[test]
fn keyword_keys_round_trip_through_objects() {
    let value = eval("{:a 1 :b [true nil]}");
    let back = from_json(&to_json(&value).unwrap());
    assert_eq!(back, value);
}
