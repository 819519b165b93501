//! Host interop: bidirectional conversion between [`Value`] and JSON.
//!
//! Keywords cross as plain strings (`:port` <-> `"port"`), maps with
//! scalar keys cross as objects, Lists and Vectors cross as arrays.
//! Collections used as map keys cannot round-trip through a string-keyed
//! object, and callables cannot cross at all; both raise conversion
//! errors. Nothing here is reachable from pure evaluation.

use crate::error::Error;
use crate::language::Value;

/// Convert a value to JSON.
pub fn to_json(value: &Value) -> Result<serde_json::Value, Error> {
    match value {
        Value::Nil => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| Error::conversion(format!("number {n} has no JSON representation"))),
        Value::Str(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Keyword(name) | Value::Symbol(name) => {
            Ok(serde_json::Value::String(bare_name(&name.resolve())))
        }
        Value::List(items) | Value::Vector(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_json(item)?);
            }
            Ok(serde_json::Value::Array(out))
        }
        Value::Map(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in &map.entries {
                out.insert(key_string(k)?, to_json(v)?);
            }
            Ok(serde_json::Value::Object(out))
        }
        Value::Lambda(_) | Value::NativeFn(_) | Value::Macro(_) => Err(Error::conversion(
            "functions and macros cannot cross the host boundary",
        )),
    }
}

/// Convert JSON to a value. Objects become maps with keyword keys,
/// arrays become vectors.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::vector(items.iter().map(from_json)),
        serde_json::Value::Object(entries) => Value::map(
            entries
                .iter()
                .map(|(k, v)| (Value::keyword(&format!(":{k}")), from_json(v)))
                .collect(),
        ),
    }
}

/// Map keys must be scalars; a collection key has no string form.
fn key_string(key: &Value) -> Result<String, Error> {
    match key {
        Value::Str(s) => Ok(s.clone()),
        Value::Keyword(name) | Value::Symbol(name) => Ok(bare_name(&name.resolve())),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::conversion(format!(
            "map key {other} cannot become an object key"
        ))),
    }
}

fn bare_name(name: &str) -> String {
    name.strip_prefix(':').unwrap_or(name).to_string()
}
