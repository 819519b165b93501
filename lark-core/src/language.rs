use std::fmt;
use std::sync::Arc;

use im::Vector as ImVector;

use crate::environment::Environment;
use crate::error::Error;
use crate::interner::Interned;
use crate::session::Session;

// ============================================================================
// Core Type System
// ============================================================================

/// One parameter list and body of a function or macro.
///
/// `rest` is the variadic collector introduced by `&` in the parameter
/// vector; extra call arguments are gathered into a List bound to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Arity {
    pub params: Vec<Interned>,
    pub rest: Option<Interned>,
    pub body: Vec<Value>,
}

impl Arity {
    /// Render the arity's argument count for diagnostics: `2` or `2+`.
    pub fn describe(&self) -> String {
        if self.rest.is_some() {
            format!("{}+", self.params.len())
        } else {
            self.params.len().to_string()
        }
    }
}

/// A user function: its arities plus the lexically captured environment.
#[derive(Clone)]
pub struct LambdaCell {
    pub arities: Vec<Arity>,
    pub env: Environment,
}

/// Same shape as [`LambdaCell`], but applied to unevaluated forms at the
/// call site; the produced form is then evaluated in the caller's scope.
#[derive(Clone)]
pub struct MacroCell {
    pub arities: Vec<Arity>,
    pub env: Environment,
}

// Environments hold locks and cycles; compare and print cells by their
// arities only, the way closures are observably distinguishable.
impl fmt::Debug for LambdaCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaCell")
            .field("arities", &self.arities)
            .field("env", &"<environment>")
            .finish()
    }
}

impl PartialEq for LambdaCell {
    fn eq(&self, other: &Self) -> bool {
        self.arities == other.arities
    }
}

impl fmt::Debug for MacroCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroCell")
            .field("arities", &self.arities)
            .field("env", &"<environment>")
            .finish()
    }
}

impl PartialEq for MacroCell {
    fn eq(&self, other: &Self) -> bool {
        self.arities == other.arities
    }
}

/// Native function type - Rust functions callable from the language.
pub type NativeFn = fn(&[Value], &mut Session) -> Result<Value, Error>;

/// A named native function. The name is what `(native-fn NAME)` prints.
#[derive(Clone, Copy)]
pub struct NativeCell {
    pub name: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for NativeCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeCell({})", self.name)
    }
}

impl PartialEq for NativeCell {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.func as usize == other.func as usize
    }
}

/// Map payload: entries in insertion order, keyed by structural equality.
///
/// Iteration order is insertion order; equality is order-independent.
#[derive(Clone, Debug, Default)]
pub struct MapValue {
    pub entries: Vec<(Value, Value)>,
}

impl MapValue {
    pub fn new(entries: Vec<(Value, Value)>) -> Self {
        MapValue { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// New map with `key` bound to `val`: replaces in place when the key
    /// exists, appends otherwise.
    pub fn assoc(&self, key: Value, val: Value) -> MapValue {
        let mut entries = self.entries.clone();
        if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = val;
        } else {
            entries.push((key, val));
        }
        MapValue { entries }
    }

    /// New map without `key`; unchanged when the key is absent.
    pub fn dissoc(&self, key: &Value) -> MapValue {
        MapValue {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| k != key)
                .cloned()
                .collect(),
        }
    }
}

impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    /// IEEE-754 double; the only numeric type.
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
    /// Name stored with its leading `:`.
    Keyword(Interned),
    /// Name may contain `/` for `alias/name` qualified references.
    Symbol(Interned),
    List(ImVector<Value>),
    Vector(ImVector<Value>),
    Map(Arc<MapValue>),
    Lambda(Arc<LambdaCell>),
    NativeFn(NativeCell),
    Macro(Arc<MacroCell>),
}

impl Value {
    pub fn symbol(name: &str) -> Value {
        Value::Symbol(Interned::new(name))
    }

    pub fn keyword(name: &str) -> Value {
        Value::Keyword(Interned::new(name))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    pub fn vector(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Vector(items.into_iter().collect())
    }

    pub fn map(entries: Vec<(Value, Value)>) -> Value {
        Value::Map(Arc::new(MapValue::new(entries)))
    }

    /// True for everything except `nil` and `false`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

// Structural equality. Numbers compare numerically, maps compare as
// multisets of entries, closures by their arities, natives by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Lambda(a), Value::Lambda(b)) => a == b,
            (Value::Macro(a), Value::Macro(b)) => a == b,
            (Value::NativeFn(a), Value::NativeFn(b)) => a == b,
            _ => false,
        }
    }
}

// ============================================================================
// Printer
// ============================================================================

/// Canonical printed form; strings re-escaped and quoted.
pub fn print_string(value: &Value) -> String {
    value.to_string()
}

/// The `str`/`println` formatter: identical to the canonical printer
/// except strings are emitted unquoted.
pub fn display_string(value: &Value) -> String {
    let mut out = String::new();
    // fmt::Write on String cannot fail.
    let _ = write_value(&mut out, value, false);
    out
}

fn escape_string(s: &str) -> String {
    let mut result = String::new();
    for c in s.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            c => result.push(c),
        }
    }
    result
}

fn write_seq(
    f: &mut impl fmt::Write,
    items: &ImVector<Value>,
    readably: bool,
    open: &str,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write_value(f, item, readably)?;
    }
    f.write_str(close)
}

fn write_arity(f: &mut impl fmt::Write, arity: &Arity, readably: bool) -> fmt::Result {
    f.write_str("[")?;
    for (i, p) in arity.params.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{p}")?;
    }
    if let Some(rest) = &arity.rest {
        if !arity.params.is_empty() {
            f.write_str(" ")?;
        }
        write!(f, "& {rest}")?;
    }
    f.write_str("]")?;
    for form in &arity.body {
        f.write_str(" ")?;
        write_value(f, form, readably)?;
    }
    Ok(())
}

fn write_fn_form(
    f: &mut impl fmt::Write,
    head: &str,
    arities: &[Arity],
    readably: bool,
) -> fmt::Result {
    write!(f, "({head} ")?;
    if let [single] = arities {
        write_arity(f, single, readably)?;
    } else {
        for (i, arity) in arities.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str("(")?;
            write_arity(f, arity, readably)?;
            f.write_str(")")?;
        }
    }
    f.write_str(")")
}

fn write_value(f: &mut impl fmt::Write, value: &Value, readably: bool) -> fmt::Result {
    match value {
        Value::Number(n) => write!(f, "{n}"),
        Value::Str(s) if readably => write!(f, "\"{}\"", escape_string(s)),
        Value::Str(s) => f.write_str(s),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Nil => f.write_str("nil"),
        Value::Keyword(name) | Value::Symbol(name) => write!(f, "{name}"),
        Value::List(items) => write_seq(f, items, readably, "(", ")"),
        Value::Vector(items) => write_seq(f, items, readably, "[", "]"),
        Value::Map(map) => {
            f.write_str("{")?;
            for (i, (k, v)) in map.entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write_value(f, k, readably)?;
                f.write_str(" ")?;
                write_value(f, v, readably)?;
            }
            f.write_str("}")
        }
        Value::Lambda(cell) => write_fn_form(f, "fn", &cell.arities, readably),
        Value::Macro(cell) => write_fn_form(f, "macro", &cell.arities, readably),
        Value::NativeFn(cell) => write!(f, "(native-fn {})", cell.name),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, true)
    }
}
