use lark_core::{parse, Error, Value};

fn parse_one(input: &str) -> Value {
    let forms = parse(input).unwrap();
    assert_eq!(forms.len(), 1, "expected exactly one form from {input}");
    forms.into_iter().next().unwrap()
}

fn printed(input: &str) -> String {
    parse_one(input).to_string()
}

// ============================================================================
// Atoms
// ============================================================================

#[test]
fn atoms() {
    assert_eq!(parse_one("42"), Value::Number(42.0));
    assert_eq!(parse_one("\"hi\""), Value::Str("hi".to_string()));
    assert_eq!(parse_one(":k"), Value::keyword(":k"));
    assert_eq!(parse_one("sym"), Value::symbol("sym"));
}

#[test]
fn boolean_and_nil_literals() {
    assert_eq!(parse_one("true"), Value::Bool(true));
    assert_eq!(parse_one("false"), Value::Bool(false));
    assert_eq!(parse_one("nil"), Value::Nil);
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn lists_vectors_maps() {
    assert_eq!(printed("(1 2 3)"), "(1 2 3)");
    assert_eq!(printed("[1 [2] 3]"), "[1 [2] 3]");
    assert_eq!(printed("{:a 1 :b 2}"), "{:a 1 :b 2}");
}

#[test]
fn empty_collections() {
    assert_eq!(printed("()"), "()");
    assert_eq!(printed("[]"), "[]");
    assert_eq!(printed("{}"), "{}");
}

#[test]
fn map_entries_keep_insertion_order() {
    let Value::Map(map) = parse_one("{:b 2 :a 1}") else {
        panic!("expected a map");
    };
    assert_eq!(map.entries[0].0, Value::keyword(":b"));
    assert_eq!(map.entries[1].0, Value::keyword(":a"));
}

#[test]
fn odd_map_is_an_error() {
    let err = parse("{:a 1 :b}").unwrap_err();
    match err {
        Error::Parser { message, .. } => assert!(message.contains("even number")),
        other => panic!("expected parser error, got {other:?}"),
    }
}

// ============================================================================
// Reader Macros
// ============================================================================

#[test]
fn quote_expands_to_a_list() {
    assert_eq!(printed("'x"), "(quote x)");
    assert_eq!(printed("'(1 2)"), "(quote (1 2))");
}

#[test]
fn quasiquote_family_expands_to_lists() {
    assert_eq!(printed("`x"), "(quasiquote x)");
    assert_eq!(printed("~x"), "(unquote x)");
    assert_eq!(printed("~@xs"), "(unquote-splicing xs)");
    assert_eq!(printed("`(a ~b ~@c)"), "(quasiquote (a (unquote b) (unquote-splicing c)))");
}

#[test]
fn dangling_quote_is_an_error() {
    assert!(parse("'").is_err());
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn unclosed_list_reports_where_it_started() {
    let err = parse("  (1 2").unwrap_err();
    match err {
        Error::Parser { message, line, col } => {
            assert!(message.contains("1:3"), "message was: {message}");
            assert_eq!((line, col), (1, 3));
        }
        other => panic!("expected parser error, got {other:?}"),
    }
}

#[test]
fn unclosed_vector_is_an_error() {
    assert!(parse("[1 2").is_err());
}

#[test]
fn unexpected_closer_is_an_error() {
    let err = parse(")").unwrap_err();
    match err {
        Error::Parser { message, .. } => assert!(message.contains(")")),
        other => panic!("expected parser error, got {other:?}"),
    }
}

#[test]
fn multiple_top_level_forms() {
    let forms = parse("(def a 1) a").unwrap();
    assert_eq!(forms.len(), 2);
    assert_eq!(forms[1], Value::symbol("a"));
}

#[test]
fn comments_are_dropped_before_parsing() {
    let forms = parse("; leading\n1 ; trailing\n2").unwrap();
    assert_eq!(forms, vec![Value::Number(1.0), Value::Number(2.0)]);
}
