//! Native standard library.
//!
//! Every native here is installed on the `clojure.core` environment at
//! session creation. Natives receive evaluated arguments plus the
//! session, which carries the output sink, the namespace registry, and
//! the entry point back into application for the higher-order functions.

use std::fs;
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::environment::Environment;
use crate::error::Error;
use crate::interpreter;
use crate::language::{display_string, MapValue, NativeCell, NativeFn, Value};
use crate::native::{
    as_map_entry, check_arity_exact, check_arity_min, check_arity_range, entry_vector,
    expect_index, expect_number, expect_seq, expect_string, list_from, map_from, vector_from,
};
use crate::session::Session;

fn native(name: &'static str, func: NativeFn) -> Value {
    Value::NativeFn(NativeCell { name, func })
}

// ============================================================================
// Arithmetic
// ============================================================================

/// Usage: (+ 1 2 3) => 6; (+) => 0
pub fn add(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    let mut total = 0.0;
    for arg in args {
        total += expect_number("+", arg)?;
    }
    Ok(Value::Number(total))
}

/// Usage: (- 10 1 2) => 7; (- 3) => -3
pub fn sub(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_min("-", args, 1)?;
    let first = expect_number("-", &args[0])?;
    if args.len() == 1 {
        return Ok(Value::Number(-first));
    }
    let mut total = first;
    for arg in &args[1..] {
        total -= expect_number("-", arg)?;
    }
    Ok(Value::Number(total))
}

/// Usage: (* 2 3 4) => 24; (*) => 1
pub fn mul(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    let mut total = 1.0;
    for arg in args {
        total *= expect_number("*", arg)?;
    }
    Ok(Value::Number(total))
}

/// Usage: (/ 12 2 3) => 2; (/ 4) => 0.25
pub fn div(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_min("/", args, 1)?;
    let first = expect_number("/", &args[0])?;
    if args.len() == 1 {
        if first == 0.0 {
            return Err(Error::eval("/ cannot divide by zero"));
        }
        return Ok(Value::Number(1.0 / first));
    }
    let mut total = first;
    for arg in &args[1..] {
        let divisor = expect_number("/", arg)?;
        if divisor == 0.0 {
            return Err(Error::eval("/ cannot divide by zero"));
        }
        total /= divisor;
    }
    Ok(Value::Number(total))
}

/// Usage: (mod 10 3) => 1
pub fn modulo(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("mod", args, 2)?;
    let a = expect_number("mod", &args[0])?;
    let b = expect_number("mod", &args[1])?;
    if b == 0.0 {
        return Err(Error::eval("mod cannot divide by zero"));
    }
    Ok(Value::Number(a.rem_euclid(b)))
}

/// Usage: (inc 1) => 2
pub fn inc(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("inc", args, 1)?;
    Ok(Value::Number(expect_number("inc", &args[0])? + 1.0))
}

/// Usage: (dec 1) => 0
pub fn dec(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("dec", args, 1)?;
    Ok(Value::Number(expect_number("dec", &args[0])? - 1.0))
}

/// Usage: (min 3 1 2) => 1
pub fn min_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_min("min", args, 1)?;
    let mut best = expect_number("min", &args[0])?;
    for arg in &args[1..] {
        best = best.min(expect_number("min", arg)?);
    }
    Ok(Value::Number(best))
}

/// Usage: (max 3 1 2) => 3
pub fn max_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_min("max", args, 1)?;
    let mut best = expect_number("max", &args[0])?;
    for arg in &args[1..] {
        best = best.max(expect_number("max", arg)?);
    }
    Ok(Value::Number(best))
}

// ============================================================================
// Comparison and Equality
// ============================================================================

fn compare(name: &str, args: &[Value], holds: fn(f64, f64) -> bool) -> Result<Value, Error> {
    check_arity_min(name, args, 2)?;
    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        numbers.push(expect_number(name, arg)?);
    }
    Ok(Value::Bool(numbers.windows(2).all(|w| holds(w[0], w[1]))))
}

pub fn lt(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    compare("<", args, |a, b| a < b)
}

pub fn lte(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    compare("<=", args, |a, b| a <= b)
}

pub fn gt(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    compare(">", args, |a, b| a > b)
}

pub fn gte(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    compare(">=", args, |a, b| a >= b)
}

/// Structural equality across every variant, left to right.
/// Usage: (= 1 1.0) => true; (= {:a 1} {:a 1}) => true
pub fn equals(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_min("=", args, 2)?;
    Ok(Value::Bool(args.windows(2).all(|w| w[0] == w[1])))
}

// ============================================================================
// Type Predicates
// ============================================================================

fn predicate(
    name: &'static str,
    args: &[Value],
    test: fn(&Value) -> bool,
) -> Result<Value, Error> {
    check_arity_exact(name, args, 1)?;
    Ok(Value::Bool(test(&args[0])))
}

pub fn nil_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("nil?", args, |v| matches!(v, Value::Nil))
}

pub fn true_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("true?", args, |v| matches!(v, Value::Bool(true)))
}

pub fn false_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("false?", args, |v| matches!(v, Value::Bool(false)))
}

pub fn truthy_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("truthy?", args, Value::is_truthy)
}

pub fn falsy_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("falsy?", args, |v| !v.is_truthy())
}

pub fn not_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("not", args, |v| !v.is_truthy())
}

pub fn number_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("number?", args, |v| matches!(v, Value::Number(_)))
}

pub fn string_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("string?", args, |v| matches!(v, Value::Str(_)))
}

pub fn boolean_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("boolean?", args, |v| matches!(v, Value::Bool(_)))
}

pub fn keyword_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("keyword?", args, |v| matches!(v, Value::Keyword(_)))
}

pub fn symbol_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("symbol?", args, |v| matches!(v, Value::Symbol(_)))
}

pub fn vector_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("vector?", args, |v| matches!(v, Value::Vector(_)))
}

pub fn list_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("list?", args, |v| matches!(v, Value::List(_)))
}

pub fn map_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("map?", args, |v| matches!(v, Value::Map(_)))
}

pub fn fn_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("fn?", args, |v| {
        matches!(v, Value::Lambda(_) | Value::NativeFn(_))
    })
}

pub fn coll_p(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    predicate("coll?", args, |v| {
        matches!(v, Value::List(_) | Value::Vector(_) | Value::Map(_))
    })
}

// ============================================================================
// Collection Operations
// ============================================================================

/// Usage: (count [1 2 3]) => 3
pub fn count(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("count", args, 1)?;
    let n = match &args[0] {
        Value::List(items) | Value::Vector(items) => items.len(),
        Value::Map(map) => map.len(),
        other => return Err(Error::eval(format!("count expects a collection, got {other}"))),
    };
    Ok(Value::Number(n as f64))
}

/// Usage: (first [1 2]) => 1; (first {:a 1}) => [:a 1]; (first []) => nil
pub fn first_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("first", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::List(items) | Value::Vector(items) => {
            Ok(items.front().cloned().unwrap_or(Value::Nil))
        }
        Value::Map(map) => Ok(map
            .entries
            .first()
            .map(|(k, v)| entry_vector(k, v))
            .unwrap_or(Value::Nil)),
        other => Err(Error::eval(format!("first expects a collection, got {other}"))),
    }
}

/// Drops the first element, preserving the collection shape.
/// Usage: (rest [1 2 3]) => [2 3]; (rest []) => []
pub fn rest_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("rest", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::List(im::Vector::new())),
        Value::List(items) => Ok(Value::List(items.iter().skip(1).cloned().collect())),
        Value::Vector(items) => Ok(Value::Vector(items.iter().skip(1).cloned().collect())),
        Value::Map(map) => {
            let entries = map.entries.iter().skip(1).cloned().collect();
            Ok(Value::Map(Arc::new(MapValue::new(entries))))
        }
        other => Err(Error::eval(format!("rest expects a collection, got {other}"))),
    }
}

/// Usage: (cons 0 '(1 2)) => (0 1 2); (cons 0 [1 2]) => [0 1 2]
pub fn cons_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("cons", args, 2)?;
    let item = args[0].clone();
    match &args[1] {
        Value::Nil => Ok(Value::list([item])),
        Value::List(items) => {
            let mut out = items.clone();
            out.push_front(item);
            Ok(Value::List(out))
        }
        Value::Vector(items) => {
            let mut out = items.clone();
            out.push_front(item);
            Ok(Value::Vector(out))
        }
        Value::Map(_) => Err(Error::eval("cons cannot prepend to a map")),
        other => Err(Error::eval(format!(
            "cons expects a collection as its second argument, got {other}"
        ))),
    }
}

/// Appends to Vectors, prepends to Lists (each argument in turn),
/// merges [k v] pairs into Maps.
/// Usage: (conj [1] 2 3) => [1 2 3]; (conj '(1) 2 3) => (3 2 1)
pub fn conj(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_min("conj", args, 1)?;
    let items = &args[1..];
    match &args[0] {
        Value::Nil => {
            let mut out = im::Vector::new();
            for item in items {
                out.push_front(item.clone());
            }
            Ok(Value::List(out))
        }
        Value::List(existing) => {
            let mut out = existing.clone();
            for item in items {
                out.push_front(item.clone());
            }
            Ok(Value::List(out))
        }
        Value::Vector(existing) => {
            let mut out = existing.clone();
            for item in items {
                out.push_back(item.clone());
            }
            Ok(Value::Vector(out))
        }
        Value::Map(existing) => {
            let mut out = (**existing).clone();
            for item in items {
                let (k, v) = as_map_entry("conj", item)?;
                out = out.assoc(k, v);
            }
            Ok(Value::Map(Arc::new(out)))
        }
        other => Err(Error::eval(format!("conj expects a collection, got {other}"))),
    }
}

/// Usage: (assoc {:a 1} :b 2) => {:a 1 :b 2}; (assoc [1 2] 0 9) => [9 2]
pub fn assoc(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_min("assoc", args, 3)?;
    if (args.len() - 1) % 2 != 0 {
        return Err(Error::eval("assoc expects key/value pairs after the collection"));
    }
    match &args[0] {
        Value::Map(map) => {
            let mut out = (**map).clone();
            for pair in args[1..].chunks_exact(2) {
                out = out.assoc(pair[0].clone(), pair[1].clone());
            }
            Ok(Value::Map(Arc::new(out)))
        }
        Value::Vector(items) => {
            let mut out = items.clone();
            for pair in args[1..].chunks_exact(2) {
                let idx = expect_index("assoc", &pair[0])?;
                // Writing one past the end extends the vector by one.
                if idx < out.len() {
                    out.set(idx, pair[1].clone());
                } else if idx == out.len() {
                    out.push_back(pair[1].clone());
                } else {
                    return Err(Error::eval(format!(
                        "assoc index {idx} is out of bounds for vector of length {}",
                        out.len()
                    )));
                }
            }
            Ok(Value::Vector(out))
        }
        other => Err(Error::eval(format!(
            "assoc expects a map or vector, got {other}"
        ))),
    }
}

/// Usage: (dissoc {:a 1 :b 2} :a) => {:b 2}; (dissoc [1 2 3] 1) => [1 3]
pub fn dissoc(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_min("dissoc", args, 2)?;
    match &args[0] {
        Value::Map(map) => {
            let mut out = (**map).clone();
            for key in &args[1..] {
                out = out.dissoc(key);
            }
            Ok(Value::Map(Arc::new(out)))
        }
        Value::Vector(items) => {
            let mut out = items.clone();
            for key in &args[1..] {
                let idx = expect_index("dissoc", key)?;
                if idx >= out.len() {
                    return Err(Error::eval(format!(
                        "dissoc index {idx} is out of bounds for vector of length {}",
                        out.len()
                    )));
                }
                out.remove(idx);
            }
            Ok(Value::Vector(out))
        }
        other => Err(Error::eval(format!(
            "dissoc expects a map or vector, got {other}"
        ))),
    }
}

/// Usage: (get {:a 1} :a) => 1; (get [1 2] 5 :missing) => :missing
pub fn get_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_range("get", args, 2, 3)?;
    let default = args.get(2).cloned().unwrap_or(Value::Nil);
    match &args[0] {
        Value::Map(map) => Ok(map.get(&args[1]).cloned().unwrap_or(default)),
        Value::Vector(items) => match &args[1] {
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && (*n as usize) < items.len() => {
                Ok(items[*n as usize].clone())
            }
            _ => Ok(default),
        },
        _ => Ok(default),
    }
}

/// Usage: (seq [1 2]) => (1 2); (seq []) => nil; (seq {:a 1}) => ([:a 1])
pub fn seq_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("seq", args, 1)?;
    let elements = expect_seq("seq", &args[0])?;
    if elements.is_empty() {
        Ok(Value::Nil)
    } else {
        Ok(list_from(elements))
    }
}

/// Usage: (nth [1 2 3] 1) => 2; (nth [1] 5 :missing) => :missing
pub fn nth(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_range("nth", args, 2, 3)?;
    let (items, shape) = match &args[0] {
        Value::List(items) => (items, "list"),
        Value::Vector(items) => (items, "vector"),
        other => {
            return Err(Error::eval(format!(
                "nth expects a list or vector, got {other}"
            )))
        }
    };
    let idx = expect_index("nth", &args[1])?;
    match items.get(idx) {
        Some(value) => Ok(value.clone()),
        None => match args.get(2) {
            Some(default) => Ok(default.clone()),
            None => Err(Error::eval(format!(
                "nth index {idx} is out of bounds for {shape} of length {}",
                items.len()
            ))),
        },
    }
}

/// Usage: (take 2 [1 2 3]) => (1 2)
pub fn take_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("take", args, 2)?;
    let n = expect_index("take", &args[0])?;
    let mut elements = expect_seq("take", &args[1])?;
    elements.truncate(n);
    Ok(list_from(elements))
}

/// Usage: (drop 2 [1 2 3]) => (3)
pub fn drop_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("drop", args, 2)?;
    let n = expect_index("drop", &args[0])?;
    let elements = expect_seq("drop", &args[1])?;
    Ok(list_from(elements.into_iter().skip(n).collect()))
}

/// Usage: (concat [1] '(2) {:a 3}) => (1 2 [:a 3])
pub fn concat_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    let mut out = Vec::new();
    for arg in args {
        out.extend(expect_seq("concat", arg)?);
    }
    Ok(list_from(out))
}

/// Repeated conj of `from`'s elements onto `to`.
/// Usage: (into [] '(1 2)) => [1 2]; (into '() [1 2]) => (2 1)
pub fn into_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("into", args, 2)?;
    let elements = expect_seq("into", &args[1])?;
    match &args[0] {
        Value::Nil => {
            let mut out = im::Vector::new();
            for item in elements {
                out.push_front(item);
            }
            Ok(Value::List(out))
        }
        Value::List(existing) => {
            let mut out = existing.clone();
            for item in elements {
                out.push_front(item);
            }
            Ok(Value::List(out))
        }
        Value::Vector(existing) => {
            let mut out = existing.clone();
            for item in elements {
                out.push_back(item);
            }
            Ok(Value::Vector(out))
        }
        Value::Map(existing) => {
            let mut out = (**existing).clone();
            for item in elements {
                let (k, v) = as_map_entry("into", &item)?;
                out = out.assoc(k, v);
            }
            Ok(Value::Map(Arc::new(out)))
        }
        other => Err(Error::eval(format!(
            "into expects a collection destination, got {other}"
        ))),
    }
}

/// Usage: (zipmap [:a :b] [1 2 3]) => {:a 1 :b 2}
pub fn zipmap(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("zipmap", args, 2)?;
    let keys = expect_seq("zipmap", &args[0])?;
    let vals = expect_seq("zipmap", &args[1])?;
    let mut out = map_from(Vec::new());
    for (k, v) in keys.into_iter().zip(vals.into_iter()) {
        out = out.assoc(k, v);
    }
    Ok(Value::Map(Arc::new(out)))
}

/// Usage: (keys {:a 1 :b 2}) => [:a :b]
pub fn keys_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("keys", args, 1)?;
    match &args[0] {
        Value::Map(map) => Ok(vector_from(
            map.entries.iter().map(|(k, _)| k.clone()).collect(),
        )),
        other => Err(Error::eval(format!("keys expects a map, got {other}"))),
    }
}

/// Usage: (vals {:a 1 :b 2}) => [1 2]
pub fn vals_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("vals", args, 1)?;
    match &args[0] {
        Value::Map(map) => Ok(vector_from(
            map.entries.iter().map(|(_, v)| v.clone()).collect(),
        )),
        other => Err(Error::eval(format!("vals expects a map, got {other}"))),
    }
}

/// Usage: (last [1 2 3]) => 3
pub fn last_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("last", args, 1)?;
    let elements = expect_seq("last", &args[0])?;
    Ok(elements.last().cloned().unwrap_or(Value::Nil))
}

/// Usage: (reverse [1 2 3]) => (3 2 1)
pub fn reverse_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("reverse", args, 1)?;
    let mut elements = expect_seq("reverse", &args[0])?;
    elements.reverse();
    Ok(list_from(elements))
}

/// Usage: (range 3) => (0 1 2); (range 1 7 2) => (1 3 5)
pub fn range_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_range("range", args, 1, 3)?;
    let (start, end, step) = match args.len() {
        1 => (0.0, expect_number("range", &args[0])?, 1.0),
        2 => (
            expect_number("range", &args[0])?,
            expect_number("range", &args[1])?,
            1.0,
        ),
        _ => (
            expect_number("range", &args[0])?,
            expect_number("range", &args[1])?,
            expect_number("range", &args[2])?,
        ),
    };
    if step == 0.0 {
        return Err(Error::eval("range expects a non-zero step"));
    }
    let mut out = Vec::new();
    let mut i = start;
    while (step > 0.0 && i < end) || (step < 0.0 && i > end) {
        out.push(Value::Number(i));
        i += step;
    }
    Ok(list_from(out))
}

/// Usage: (repeat 3 :x) => (:x :x :x)
pub fn repeat_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("repeat", args, 2)?;
    let n = expect_index("repeat", &args[0])?;
    Ok(list_from(vec![args[1].clone(); n]))
}

// ============================================================================
// Strings and Output
// ============================================================================

/// Usage: (str "a" 1 :k) => "a1:k"
pub fn str_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    let mut out = String::new();
    for arg in args {
        out.push_str(&display_string(arg));
    }
    Ok(Value::Str(out))
}

/// Joins arguments with single spaces and emits one string through the
/// session output sink. Only installed when a sink is configured.
pub fn println_fn(args: &[Value], sess: &mut Session) -> Result<Value, Error> {
    let line = args
        .iter()
        .map(display_string)
        .collect::<Vec<_>>()
        .join(" ");
    sess.emit(&line);
    Ok(Value::Nil)
}

/// The `println` native, handed to the session when it has a sink.
pub fn println_value() -> Value {
    native("println", println_fn)
}

/// Usage: (slurp "notes.txt") => "file contents"
pub fn slurp(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("slurp", args, 1)?;
    let path = expect_string("slurp", &args[0])?;
    let content = fs::read_to_string(&path)
        .map_err(|e| Error::eval(format!("slurp failed to read '{path}': {e}")))?;
    Ok(Value::Str(content))
}

/// Usage: (spit "notes.txt" "content") => nil
pub fn spit(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("spit", args, 2)?;
    let path = expect_string("spit", &args[0])?;
    let content = expect_string("spit", &args[1])?;
    fs::write(&path, content)
        .map_err(|e| Error::eval(format!("spit failed to write '{path}': {e}")))?;
    Ok(Value::Nil)
}

// ============================================================================
// Processes and Time
// ============================================================================

/// Runs a shell command and returns a map of its outcome.
/// Usage: (shell "ls") => {:out "..." :err "" :exit 0 :success true}
pub fn shell(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("shell", args, 1)?;
    let command = expect_string("shell", &args[0])?;

    let output = if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", &command]).output()
    } else {
        Command::new("sh").arg("-c").arg(&command).output()
    };
    let output = output.map_err(|e| Error::eval(format!("shell failed to execute: {e}")))?;

    Ok(Value::map(vec![
        (
            Value::keyword(":out"),
            Value::Str(String::from_utf8_lossy(&output.stdout).to_string()),
        ),
        (
            Value::keyword(":err"),
            Value::Str(String::from_utf8_lossy(&output.stderr).to_string()),
        ),
        (
            Value::keyword(":exit"),
            Value::Number(f64::from(output.status.code().unwrap_or(-1))),
        ),
        (
            Value::keyword(":success"),
            Value::Bool(output.status.success()),
        ),
    ]))
}

/// Seconds since the Unix epoch.
/// Usage: (now) => 1699564800
pub fn now(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("now", args, 0)?;
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::eval(format!("now failed to read the clock: {e}")))?;
    Ok(Value::Number(duration.as_secs_f64()))
}

// ============================================================================
// Higher-Order Functions
// ============================================================================

/// Usage: (map inc [1 2]) => [2 3]; (map inc '(1 2)) => (2 3)
pub fn map_fn(args: &[Value], sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("map", args, 2)?;
    let elements = expect_seq("map", &args[1])?;
    let mut out = Vec::with_capacity(elements.len());
    for item in elements {
        out.push(interpreter::apply(&args[0], vec![item], sess)?);
    }
    if matches!(args[1], Value::Vector(_)) {
        Ok(vector_from(out))
    } else {
        Ok(list_from(out))
    }
}

/// Usage: (filter odd? [1 2 3]) => [1 3]
pub fn filter_fn(args: &[Value], sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("filter", args, 2)?;
    let elements = expect_seq("filter", &args[1])?;
    let mut out = Vec::new();
    for item in elements {
        if interpreter::apply(&args[0], vec![item.clone()], sess)?.is_truthy() {
            out.push(item);
        }
    }
    if matches!(args[1], Value::Vector(_)) {
        Ok(vector_from(out))
    } else {
        Ok(list_from(out))
    }
}

/// Left fold. Without an initial value the first element seeds the
/// accumulator and an empty collection is an error.
/// Usage: (reduce + [1 2 3]) => 6; (reduce + 10 [1 2]) => 13
pub fn reduce_fn(args: &[Value], sess: &mut Session) -> Result<Value, Error> {
    check_arity_range("reduce", args, 2, 3)?;
    let (mut acc, elements) = if args.len() == 2 {
        let mut elements = expect_seq("reduce", &args[1])?.into_iter();
        let first = elements.next().ok_or_else(|| {
            Error::eval("reduce of an empty collection with no initial value")
        })?;
        (first, elements.collect::<Vec<_>>())
    } else {
        (args[1].clone(), expect_seq("reduce", &args[2])?)
    };
    for item in elements {
        acc = interpreter::apply(&args[0], vec![acc, item], sess)?;
    }
    Ok(acc)
}

/// Usage: (apply + 1 2 [3 4]) => 10
pub fn apply_fn(args: &[Value], sess: &mut Session) -> Result<Value, Error> {
    check_arity_min("apply", args, 2)?;
    let mut call_args: Vec<Value> = args[1..args.len() - 1].to_vec();
    call_args.extend(expect_seq("apply", &args[args.len() - 1])?);
    interpreter::apply(&args[0], call_args, sess)
}

// ============================================================================
// Introspection
// ============================================================================

/// Evaluates a form in the session's current namespace environment.
/// Usage: (eval '(+ 1 2)) => 3
pub fn eval_fn(args: &[Value], sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("eval", args, 1)?;
    let env = sess.current_env();
    interpreter::run(&args[0], &env, sess)
}

/// Usage: (type 1) => :number; (type inc) => :function
pub fn type_fn(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("type", args, 1)?;
    let name = match &args[0] {
        Value::Number(_) => ":number",
        Value::Str(_) => ":string",
        Value::Bool(_) => ":boolean",
        Value::Nil => ":nil",
        Value::Keyword(_) => ":keyword",
        Value::Symbol(_) => ":symbol",
        Value::List(_) => ":list",
        Value::Vector(_) => ":vector",
        Value::Map(_) => ":map",
        Value::Lambda(_) | Value::NativeFn(_) | Value::Macro(_) => ":function",
    };
    Ok(Value::keyword(name))
}

/// Usage: (macroexpand-1 '(when c x)) => (if c (do x) nil)
pub fn macroexpand_1_fn(args: &[Value], sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("macroexpand-1", args, 1)?;
    let env = sess.current_env();
    interpreter::macroexpand_once(&args[0], &env, sess)
}

/// Expands repeatedly until a fixed point.
pub fn macroexpand_fn(args: &[Value], sess: &mut Session) -> Result<Value, Error> {
    check_arity_exact("macroexpand", args, 1)?;
    let env = sess.current_env();
    let mut form = args[0].clone();
    loop {
        let next = interpreter::macroexpand_once(&form, &env, sess)?;
        if next == form {
            return Ok(form);
        }
        form = next;
    }
}

static GENSYM_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Generates a unique symbol for non-hygienic macro plumbing.
/// Usage: (gensym) => g__0; (gensym "tmp") => tmp__1
pub fn gensym(args: &[Value], _sess: &mut Session) -> Result<Value, Error> {
    check_arity_range("gensym", args, 0, 1)?;
    let prefix = match args.first() {
        Some(value) => expect_string("gensym", value)?,
        None => "g".to_string(),
    };
    let counter = GENSYM_COUNTER.fetch_add(1, Ordering::SeqCst);
    Ok(Value::symbol(&format!("{prefix}__{counter}")))
}

// ============================================================================
// Namespaces
// ============================================================================

/// Each argument is a require spec: `[ns-sym :as alias]`,
/// `[ns-sym :refer [sym ...]]`, or both.
pub fn require_fn(args: &[Value], sess: &mut Session) -> Result<Value, Error> {
    let env = sess.current_env();
    for spec in args {
        sess.process_require_spec(spec, &env)?;
    }
    Ok(Value::Nil)
}

// ============================================================================
// Registration
// ============================================================================

/// Install every native on `env`. `println` is installed separately by
/// the session, and only when an output sink is configured.
pub fn register_stdlib(env: &Environment) {
    // Arithmetic
    env.define("+", native("+", add));
    env.define("-", native("-", sub));
    env.define("*", native("*", mul));
    env.define("/", native("/", div));
    env.define("mod", native("mod", modulo));
    env.define("inc", native("inc", inc));
    env.define("dec", native("dec", dec));
    env.define("min", native("min", min_fn));
    env.define("max", native("max", max_fn));

    // Comparison and equality
    env.define("<", native("<", lt));
    env.define("<=", native("<=", lte));
    env.define(">", native(">", gt));
    env.define(">=", native(">=", gte));
    env.define("=", native("=", equals));

    // Predicates
    env.define("nil?", native("nil?", nil_p));
    env.define("true?", native("true?", true_p));
    env.define("false?", native("false?", false_p));
    env.define("truthy?", native("truthy?", truthy_p));
    env.define("falsy?", native("falsy?", falsy_p));
    env.define("not", native("not", not_fn));
    env.define("number?", native("number?", number_p));
    env.define("string?", native("string?", string_p));
    env.define("boolean?", native("boolean?", boolean_p));
    env.define("keyword?", native("keyword?", keyword_p));
    env.define("symbol?", native("symbol?", symbol_p));
    env.define("vector?", native("vector?", vector_p));
    env.define("list?", native("list?", list_p));
    env.define("map?", native("map?", map_p));
    env.define("fn?", native("fn?", fn_p));
    env.define("coll?", native("coll?", coll_p));

    // Collections
    env.define("count", native("count", count));
    env.define("first", native("first", first_fn));
    env.define("rest", native("rest", rest_fn));
    env.define("cons", native("cons", cons_fn));
    env.define("conj", native("conj", conj));
    env.define("assoc", native("assoc", assoc));
    env.define("dissoc", native("dissoc", dissoc));
    env.define("get", native("get", get_fn));
    env.define("seq", native("seq", seq_fn));
    env.define("nth", native("nth", nth));
    env.define("take", native("take", take_fn));
    env.define("drop", native("drop", drop_fn));
    env.define("concat", native("concat", concat_fn));
    env.define("into", native("into", into_fn));
    env.define("zipmap", native("zipmap", zipmap));
    env.define("keys", native("keys", keys_fn));
    env.define("vals", native("vals", vals_fn));
    env.define("last", native("last", last_fn));
    env.define("reverse", native("reverse", reverse_fn));
    env.define("range", native("range", range_fn));
    env.define("repeat", native("repeat", repeat_fn));

    // Strings and files
    env.define("str", native("str", str_fn));
    env.define("slurp", native("slurp", slurp));
    env.define("spit", native("spit", spit));

    // Processes and time
    env.define("shell", native("shell", shell));
    env.define("now", native("now", now));

    // Higher-order
    env.define("map", native("map", map_fn));
    env.define("filter", native("filter", filter_fn));
    env.define("reduce", native("reduce", reduce_fn));
    env.define("apply", native("apply", apply_fn));

    // Introspection
    env.define("eval", native("eval", eval_fn));
    env.define("type", native("type", type_fn));
    env.define("macroexpand-1", native("macroexpand-1", macroexpand_1_fn));
    env.define("macroexpand", native("macroexpand", macroexpand_fn));
    env.define("gensym", native("gensym", gensym));

    // Namespaces
    env.define("require", native("require", require_fn));
}
