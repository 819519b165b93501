//! Helpers shared by the native standard library: argument extraction,
//! arity checks, and sequence views over the collection types.

use im::Vector as ImVector;

use crate::error::Error;
use crate::language::{MapValue, Value};

// ============================================================================
// Argument Checking
// ============================================================================

pub fn check_arity_exact(name: &str, args: &[Value], expected: usize) -> Result<(), Error> {
    if args.len() != expected {
        return Err(Error::eval(format!(
            "{name} expects {expected} argument{}, got {}",
            if expected == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

pub fn check_arity_min(name: &str, args: &[Value], min: usize) -> Result<(), Error> {
    if args.len() < min {
        return Err(Error::eval(format!(
            "{name} expects at least {min} argument{}, got {}",
            if min == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

pub fn check_arity_range(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), Error> {
    if args.len() < min || args.len() > max {
        return Err(Error::eval(format!(
            "{name} expects {min}-{max} arguments, got {}",
            args.len()
        )));
    }
    Ok(())
}

// ============================================================================
// Value Extraction
// ============================================================================

pub fn expect_number(name: &str, value: &Value) -> Result<f64, Error> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(Error::eval(format!(
            "{name} expects all arguments to be numbers, got {other}"
        ))),
    }
}

pub fn expect_string(name: &str, value: &Value) -> Result<String, Error> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(Error::eval(format!("{name} expects a string, got {other}"))),
    }
}

/// An in-range integral index, or an error naming the operator.
pub fn expect_index(name: &str, value: &Value) -> Result<usize, Error> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => Ok(*n as usize),
        other => Err(Error::eval(format!(
            "{name} expects a non-negative integer index, got {other}"
        ))),
    }
}

// ============================================================================
// Sequence Views
// ============================================================================

/// Uniform element view: Lists and Vectors yield their elements, Maps
/// yield `[k v]` two-element Vectors, Nil yields nothing. Returns `None`
/// for non-sequence values.
pub fn seq_elements(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Nil => Some(Vec::new()),
        Value::List(items) | Value::Vector(items) => Some(items.iter().cloned().collect()),
        Value::Map(map) => Some(map.entries.iter().map(|(k, v)| entry_vector(k, v)).collect()),
        _ => None,
    }
}

/// Same view, erroring in the caller's name on non-sequences.
pub fn expect_seq(name: &str, value: &Value) -> Result<Vec<Value>, Error> {
    seq_elements(value)
        .ok_or_else(|| Error::eval(format!("{name} expects a collection, got {value}")))
}

pub fn entry_vector(key: &Value, val: &Value) -> Value {
    Value::vector([key.clone(), val.clone()])
}

/// Interpret a value as a `[k v]` map entry.
pub fn as_map_entry(name: &str, value: &Value) -> Result<(Value, Value), Error> {
    if let Value::Vector(pair) = value {
        if pair.len() == 2 {
            return Ok((pair[0].clone(), pair[1].clone()));
        }
    }
    Err(Error::eval(format!(
        "{name} expects [key value] pairs, got {value}"
    )))
}

pub fn list_from(items: Vec<Value>) -> Value {
    Value::List(ImVector::from(items))
}

pub fn vector_from(items: Vec<Value>) -> Value {
    Value::Vector(ImVector::from(items))
}

pub fn map_from(entries: Vec<(Value, Value)>) -> MapValue {
    MapValue::new(entries)
}
