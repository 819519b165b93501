use std::cell::RefCell;
use std::rc::Rc;

use lark_core::{parse, Session, SessionOptions, Value};

fn session() -> Session {
    Session::new(SessionOptions::default()).unwrap()
}

// ============================================================================
// Namespace Basics
// ============================================================================

#[test]
fn sessions_start_in_user() {
    let sess = session();
    assert_eq!(sess.current_ns(), "user");
    assert!(sess.get_ns("clojure.core").is_some());
    assert!(sess.get_ns("user").is_some());
    assert!(sess.get_ns("nope").is_none());
}

#[test]
fn set_ns_switches_and_creates() {
    let mut sess = session();
    sess.set_ns("scratch");
    assert_eq!(sess.current_ns(), "scratch");
    sess.evaluate("(def x 1)").unwrap();
    assert_eq!(sess.evaluate("x").unwrap(), Value::Number(1.0));

    sess.set_ns("user");
    assert!(sess.evaluate("x").is_err());

    sess.set_ns("scratch");
    assert_eq!(sess.evaluate("x").unwrap(), Value::Number(1.0));
}

#[test]
fn namespaces_see_core_through_their_outer_scope() {
    let mut sess = session();
    sess.set_ns("fresh");
    assert_eq!(sess.evaluate("(+ 1 2)").unwrap(), Value::Number(3.0));
    assert_eq!(sess.evaluate("(when true :ok)").unwrap(), Value::keyword(":ok"));
}

// ============================================================================
// load_file
// ============================================================================

#[test]
fn load_file_targets_the_ns_form() {
    let mut sess = session();
    sess.load_file("(ns m) (def pi 3.14)", None).unwrap();
    let m = sess.get_ns("m").unwrap();
    assert_eq!(m.lookup("pi"), Some(Value::Number(3.14)));
    // The current namespace did not change.
    assert_eq!(sess.current_ns(), "user");
}

#[test]
fn load_file_falls_back_to_the_hint() {
    let mut sess = session();
    sess.load_file("(def x 1)", Some("hinted")).unwrap();
    let env = sess.get_ns("hinted").unwrap();
    assert_eq!(env.lookup("x"), Some(Value::Number(1.0)));
}

#[test]
fn load_file_defaults_to_user() {
    let mut sess = session();
    sess.load_file("(def y 2)", None).unwrap();
    assert_eq!(sess.evaluate("y").unwrap(), Value::Number(2.0));
}

#[test]
fn load_file_returns_the_last_value() {
    let mut sess = session();
    let result = sess.load_file("(def a 1) (+ a 41)", None).unwrap();
    assert_eq!(result, Value::Number(42.0));
}

// ============================================================================
// require :as / :refer
// ============================================================================

#[test]
fn alias_resolves_qualified_symbols() {
    let mut sess = session();
    sess.load_file("(ns m) (def pi 3.14)", None).unwrap();
    let result = sess
        .load_file("(ns u (:require [m :as m])) m/pi", None)
        .unwrap();
    assert_eq!(result, Value::Number(3.14));
}

#[test]
fn alias_may_differ_from_the_namespace_name() {
    let mut sess = session();
    sess.load_file("(ns geometry) (def tau 6.28)", None).unwrap();
    let result = sess
        .load_file("(ns app (:require [geometry :as geo])) geo/tau", None)
        .unwrap();
    assert_eq!(result, Value::Number(6.28));
}

#[test]
fn aliases_are_live_references() {
    let mut sess = session();
    sess.load_file("(ns m) (def pi 3.14)", None).unwrap();
    sess.load_file("(ns u (:require [m :as mm]))", None).unwrap();
    // Added after the alias was installed; still visible through it.
    sess.load_file("(ns m) (def e 2.72)", None).unwrap();
    let result = sess.load_file("(ns u) mm/e", None).unwrap();
    assert_eq!(result, Value::Number(2.72));
}

#[test]
fn refer_copies_bindings_into_the_requiring_ns() {
    let mut sess = session();
    sess.load_file("(ns m) (def pi 3.14) (defn twice [x] (* 2 x))", None)
        .unwrap();
    let result = sess
        .load_file("(ns u (:require [m :refer [pi twice]])) (twice pi)", None)
        .unwrap();
    assert_eq!(result, Value::Number(6.28));
}

#[test]
fn refer_missing_symbol_is_an_error() {
    let mut sess = session();
    sess.load_file("(ns m) (def pi 3.14)", None).unwrap();
    let err = sess
        .load_file("(ns u (:require [m :refer [nope]]))", None)
        .unwrap_err();
    assert!(err.to_string().contains("nope"), "was: {err}");
}

#[test]
fn unknown_require_option_is_an_error() {
    let mut sess = session();
    sess.load_file("(ns m)", None).unwrap();
    let err = sess
        .load_file("(ns u (:require [m :wat x]))", None)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unknown require option :wat. Supported: :as, :refer"
    );
}

#[test]
fn unknown_ns_clause_is_rejected() {
    let mut sess = session();
    let err = sess.load_file("(ns u (:import foo))", None).unwrap_err();
    assert_eq!(err.to_string(), "Unknown ns clause :import. Supported: :require");
}

#[test]
fn require_native_works_mid_session() {
    let mut sess = session();
    sess.load_file("(ns m) (def pi 3.14)", None).unwrap();
    let result = sess
        .evaluate("(require '[m :as alias]) alias/pi")
        .unwrap();
    assert_eq!(result, Value::Number(3.14));
}

#[test]
fn missing_namespace_is_an_error() {
    let mut sess = session();
    let err = sess.evaluate("(require '[ghost :as g])").unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

// ============================================================================
// Lazy File Loading
// ============================================================================

#[test]
fn lazy_loading_resolves_through_source_roots() {
    let reads = Rc::new(RefCell::new(Vec::<String>::new()));
    let reads_in_reader = reads.clone();
    let mut sess = Session::new(SessionOptions {
        source_roots: vec!["src".to_string(), "lib".to_string()],
        read_file: Some(Box::new(move |path: &str| {
            reads_in_reader.borrow_mut().push(path.to_string());
            if path == "lib/util/math.clj" {
                Some("(ns util.math) (def two 2)".to_string())
            } else {
                None
            }
        })),
        ..SessionOptions::default()
    })
    .unwrap();

    let result = sess
        .load_file("(ns app (:require [util.math :as um])) um/two", None)
        .unwrap();
    assert_eq!(result, Value::Number(2.0));
    // Dots became path separators and both roots were probed in order.
    assert_eq!(
        *reads.borrow(),
        vec!["src/util/math.clj".to_string(), "lib/util/math.clj".to_string()]
    );
}

#[test]
fn registered_namespaces_never_trigger_reads() {
    let count = Rc::new(RefCell::new(0));
    let count_in_reader = count.clone();
    let mut sess = Session::new(SessionOptions {
        source_roots: vec!["src".to_string()],
        read_file: Some(Box::new(move |path: &str| {
            *count_in_reader.borrow_mut() += 1;
            if path == "src/m.clj" {
                Some("(ns m) (def pi 3.14)".to_string())
            } else {
                None
            }
        })),
        ..SessionOptions::default()
    })
    .unwrap();

    sess.evaluate("(require '[m :as m1])").unwrap();
    sess.evaluate("(require '[m :as m2])").unwrap();
    assert_eq!(*count.borrow(), 1);
    assert_eq!(sess.evaluate("m2/pi").unwrap(), Value::Number(3.14));
}

// ============================================================================
// Output and Entries
// ============================================================================

#[test]
fn println_emits_one_string_per_call() {
    let lines = Rc::new(RefCell::new(Vec::<String>::new()));
    let sink_lines = lines.clone();
    let mut sess = Session::new(SessionOptions {
        output: Some(Box::new(move |line: &str| {
            sink_lines.borrow_mut().push(line.to_string())
        })),
        ..SessionOptions::default()
    })
    .unwrap();

    let result = sess.evaluate("(println \"a\" 1 :k) (println [1 2])").unwrap();
    assert_eq!(result, Value::Nil);
    assert_eq!(*lines.borrow(), vec!["a 1 :k".to_string(), "[1 2]".to_string()]);
}

#[test]
fn println_is_absent_without_a_sink() {
    let mut sess = session();
    let err = sess.evaluate("(println 1)").unwrap_err();
    assert_eq!(err.to_string(), "Symbol println not found");
}

#[test]
fn entries_load_at_construction() {
    let mut sess = Session::new(SessionOptions {
        entries: vec!["(def greeting \"hi\")".to_string()],
        ..SessionOptions::default()
    })
    .unwrap();
    assert_eq!(
        sess.evaluate("greeting").unwrap(),
        Value::Str("hi".to_string())
    );
}

// ============================================================================
// evaluate / evaluate_forms
// ============================================================================

#[test]
fn evaluate_returns_the_last_form() {
    let mut sess = session();
    assert_eq!(sess.evaluate("1 2 3").unwrap(), Value::Number(3.0));
    assert_eq!(sess.evaluate("").unwrap(), Value::Nil);
}

#[test]
fn evaluate_forms_runs_parsed_forms() {
    let mut sess = session();
    let forms = parse("(def a 2) (* a 21)").unwrap();
    assert_eq!(sess.evaluate_forms(&forms).unwrap(), Value::Number(42.0));
}

#[test]
fn stray_recur_becomes_an_evaluation_error() {
    let mut sess = session();
    let err = sess.evaluate("(recur 1)").unwrap_err();
    assert_eq!(err.to_string(), "recur called outside of loop or fn");
}
