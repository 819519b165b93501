//! The evaluator: special forms, macro expansion, function application
//! with the `recur` trampoline, and quasiquotation.
//!
//! `evaluate` returns `Result<Value, Signal>`; the `Signal::Recur` arm is
//! caught only by the function call-apply loop and by `loop`. Everything
//! public goes through [`run`]/[`apply`], which collapse a stray recur
//! into the user-facing error.

use std::sync::Arc;

use im::Vector as ImVector;

use crate::environment::Environment;
use crate::error::{Error, Signal};
use crate::interner::Interned;
use crate::language::{Arity, LambdaCell, MacroCell, Value};
use crate::session::Session;

// ============================================================================
// Entry Points
// ============================================================================

pub fn evaluate(expr: &Value, env: &Environment, sess: &mut Session) -> Result<Value, Signal> {
    match expr {
        Value::Number(_)
        | Value::Str(_)
        | Value::Bool(_)
        | Value::Nil
        | Value::Keyword(_)
        | Value::Lambda(_)
        | Value::NativeFn(_)
        | Value::Macro(_) => Ok(expr.clone()),
        Value::Symbol(sym) => resolve_symbol(sym, env).map_err(Signal::from),
        Value::Vector(items) => {
            let mut out = ImVector::new();
            for item in items {
                out.push_back(evaluate(item, env, sess)?);
            }
            Ok(Value::Vector(out))
        }
        Value::Map(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (k, v) in &map.entries {
                entries.push((evaluate(k, env, sess)?, evaluate(v, env, sess)?));
            }
            Ok(Value::map(entries))
        }
        Value::List(items) => eval_list(items, env, sess),
    }
}

/// Evaluate with the unwind channel collapsed to a plain error.
pub fn run(expr: &Value, env: &Environment, sess: &mut Session) -> Result<Value, Error> {
    evaluate(expr, env, sess).map_err(Signal::into_error)
}

/// Apply a callable to already-evaluated arguments. This is the entry
/// point for natives like `map` and `apply`.
pub fn apply(callee: &Value, args: Vec<Value>, sess: &mut Session) -> Result<Value, Error> {
    apply_value(callee, args, sess).map_err(Signal::into_error)
}

// ============================================================================
// Symbol Resolution
// ============================================================================

/// Plain symbols walk the lexical chain; `alias/name` symbols go through
/// the nearest namespace root's alias table.
fn resolve_symbol(sym: &Interned, env: &Environment) -> Result<Value, Error> {
    if let Some((alias, member)) = sym.split_qualified() {
        let target = env
            .namespace_env()
            .and_then(|ns| ns.alias(&alias))
            .ok_or_else(|| Error::eval(format!("No such namespace alias: {alias}")))?;
        return target
            .lookup(&member)
            .ok_or_else(|| Error::eval(format!("Symbol {member} not found")));
    }
    let name = sym.resolve();
    env.lookup(&name)
        .ok_or_else(|| Error::eval(format!("Symbol {name} not found")))
}

// ============================================================================
// List Evaluation
// ============================================================================

fn eval_list(items: &ImVector<Value>, env: &Environment, sess: &mut Session) -> Result<Value, Signal> {
    let Some(head) = items.front() else {
        return Err(Error::eval("cannot evaluate an empty list").into());
    };
    let tail: Vec<Value> = items.iter().skip(1).cloned().collect();

    if let Value::Symbol(sym) = head {
        let name = sym.resolve();
        if is_special_form(&name) {
            return eval_special_form(&name, &tail, env, sess);
        }
    }

    let callee = evaluate(head, env, sess)?;
    match callee {
        Value::Macro(mac) => {
            // One expansion step; the result is evaluated in the caller's
            // env, which expands nested macros recursively.
            let expansion = expand_macro(&mac, &tail, sess)?;
            evaluate(&expansion, env, sess)
        }
        Value::Lambda(_) | Value::NativeFn(_) => {
            let mut args = Vec::with_capacity(tail.len());
            for form in &tail {
                args.push(evaluate(form, env, sess)?);
            }
            apply_value(&callee, args, sess)
        }
        Value::Keyword(kw) => eval_keyword_lookup(kw, &tail, env, sess),
        _ => {
            if let Value::Symbol(sym) = head {
                Err(Error::eval_in(
                    format!("{sym} is not a function"),
                    Value::List(items.clone()),
                )
                .into())
            } else {
                Err(Error::eval_in(
                    "first element must be a function or special form",
                    Value::List(items.clone()),
                )
                .into())
            }
        }
    }
}

/// A keyword in call position looks itself up in a map argument.
fn eval_keyword_lookup(
    kw: Interned,
    tail: &[Value],
    env: &Environment,
    sess: &mut Session,
) -> Result<Value, Signal> {
    if tail.is_empty() || tail.len() > 2 {
        return Err(Error::eval(format!("{kw} expects one or two arguments")).into());
    }
    let target = evaluate(&tail[0], env, sess)?;
    let default = match tail.get(1) {
        Some(form) => evaluate(form, env, sess)?,
        None => Value::Nil,
    };
    match target {
        Value::Map(map) => Ok(map.get(&Value::Keyword(kw)).cloned().unwrap_or(default)),
        _ => Ok(default),
    }
}

// ============================================================================
// Special Forms
// ============================================================================

fn is_special_form(name: &str) -> bool {
    matches!(
        name,
        "quote"
            | "quasiquote"
            | "def"
            | "ns"
            | "if"
            | "do"
            | "let"
            | "fn"
            | "defmacro"
            | "loop"
            | "recur"
    )
}

fn eval_special_form(
    name: &str,
    tail: &[Value],
    env: &Environment,
    sess: &mut Session,
) -> Result<Value, Signal> {
    match name {
        "quote" => match tail {
            [form] => Ok(form.clone()),
            _ => Err(Error::eval("quote expects a single form").into()),
        },
        "quasiquote" => match tail {
            [form] => eval_quasiquote(form, env, sess),
            _ => Err(Error::eval("quasiquote expects a single form").into()),
        },
        "def" => eval_def(tail, env, sess),
        "ns" => match tail.first() {
            // The require clauses are interpreted by the session layer
            // before evaluation begins; the form itself is inert.
            Some(Value::Symbol(_)) => Ok(Value::Nil),
            _ => Err(Error::eval("ns expects a symbol name").into()),
        },
        "if" => eval_if(tail, env, sess),
        "do" => eval_body(tail, env, sess),
        "let" => eval_let(tail, env, sess),
        "fn" => {
            let arities = parse_arities("fn", tail)?;
            Ok(Value::Lambda(Arc::new(LambdaCell {
                arities,
                env: env.clone(),
            })))
        }
        "defmacro" => eval_defmacro(tail, env),
        "loop" => eval_loop(tail, env, sess),
        "recur" => {
            let mut args = Vec::with_capacity(tail.len());
            for form in tail {
                args.push(evaluate(form, env, sess)?);
            }
            Err(Signal::Recur(args))
        }
        _ => Err(Error::eval(format!("{name} is not a special form")).into()),
    }
}

fn eval_def(tail: &[Value], env: &Environment, sess: &mut Session) -> Result<Value, Signal> {
    let [name_form, init] = tail else {
        return Err(Error::eval("def expects a name and a value").into());
    };
    let Value::Symbol(name) = name_form else {
        return Err(Error::eval("def expects a symbol name").into());
    };
    let value = evaluate(init, env, sess)?;
    // def targets the enclosing namespace, not the local scope.
    let target = env.namespace_env().unwrap_or_else(|| env.root());
    target.define(name.resolve(), value);
    Ok(Value::Nil)
}

fn eval_if(tail: &[Value], env: &Environment, sess: &mut Session) -> Result<Value, Signal> {
    let (cond, then, other) = match tail {
        [cond, then] => (cond, then, None),
        [cond, then, other] => (cond, then, Some(other)),
        _ => return Err(Error::eval("if expects a condition, a then branch, and an optional else branch").into()),
    };
    if evaluate(cond, env, sess)?.is_truthy() {
        evaluate(then, env, sess)
    } else {
        match other {
            Some(form) => evaluate(form, env, sess),
            None => Ok(Value::Nil),
        }
    }
}

/// Evaluate `forms` as an implicit `do`.
pub(crate) fn eval_body(
    forms: &[Value],
    env: &Environment,
    sess: &mut Session,
) -> Result<Value, Signal> {
    let mut result = Value::Nil;
    for form in forms {
        result = evaluate(form, env, sess)?;
    }
    Ok(result)
}

/// Shared by `let` and `loop`: validate the binding vector and evaluate
/// the initializers left to right, each one seeing the bindings before it.
fn eval_bindings(
    owner: &str,
    tail: &[Value],
    env: &Environment,
    sess: &mut Session,
) -> Result<(Vec<Interned>, Vec<Value>, Environment), Signal> {
    let Some(Value::Vector(bindings)) = tail.first() else {
        return Err(Error::eval(format!("{owner} expects a binding vector")).into());
    };
    if bindings.len() % 2 != 0 {
        return Err(Error::eval(format!(
            "{owner} binding vector must have an even number of forms"
        ))
        .into());
    }
    let mut names = Vec::with_capacity(bindings.len() / 2);
    let mut values = Vec::with_capacity(bindings.len() / 2);
    let mut scope = env.clone();
    let mut iter = bindings.iter();
    while let (Some(name_form), Some(init)) = (iter.next(), iter.next()) {
        let Value::Symbol(name) = name_form else {
            return Err(Error::eval(format!("{owner} binding names must be symbols")).into());
        };
        let value = evaluate(init, &scope, sess)?;
        scope = scope.extend(&[*name], std::slice::from_ref(&value));
        names.push(*name);
        values.push(value);
    }
    Ok((names, values, scope))
}

fn eval_let(tail: &[Value], env: &Environment, sess: &mut Session) -> Result<Value, Signal> {
    let (_, _, scope) = eval_bindings("let", tail, env, sess)?;
    eval_body(&tail[1..], &scope, sess)
}

fn eval_loop(tail: &[Value], env: &Environment, sess: &mut Session) -> Result<Value, Signal> {
    let (names, mut current, _) = eval_bindings("loop", tail, env, sess)?;
    let body = &tail[1..];
    loop {
        // Each round binds the loop vars directly on the surrounding
        // scope, not on the accumulated initializer chain.
        let local = env.extend(&names, &current);
        match eval_body(body, &local, sess) {
            Ok(value) => return Ok(value),
            Err(Signal::Recur(next)) => {
                if next.len() != names.len() {
                    return Err(Error::eval(format!(
                        "recur expected {} arguments, got {}",
                        names.len(),
                        next.len()
                    ))
                    .into());
                }
                current = next;
            }
            Err(other) => return Err(other),
        }
    }
}

fn eval_defmacro(tail: &[Value], env: &Environment) -> Result<Value, Signal> {
    let Some(Value::Symbol(name)) = tail.first() else {
        return Err(Error::eval("defmacro expects a symbol name").into());
    };
    let arities = parse_arities("defmacro", &tail[1..])?;
    let cell = MacroCell {
        arities,
        env: env.clone(),
    };
    env.root().define(name.resolve(), Value::Macro(Arc::new(cell)));
    Ok(Value::Nil)
}

// ============================================================================
// Function Application
// ============================================================================

pub(crate) fn apply_value(
    callee: &Value,
    args: Vec<Value>,
    sess: &mut Session,
) -> Result<Value, Signal> {
    match callee {
        Value::NativeFn(cell) => (cell.func)(&args, sess).map_err(Signal::from),
        Value::Lambda(cell) => {
            let mut current = args;
            loop {
                // Re-resolve every round: recur may land on a different
                // arity of a multi-arity function.
                let arity = resolve_arity(&cell.arities, current.len())?;
                let local = bind_params(arity, &current, &cell.env)?;
                match eval_body(&arity.body, &local, sess) {
                    Ok(value) => return Ok(value),
                    Err(Signal::Recur(next)) => current = next,
                    Err(other) => return Err(other),
                }
            }
        }
        other => Err(Error::eval(format!("{other} is not a callable function")).into()),
    }
}

fn resolve_arity(arities: &[Arity], argc: usize) -> Result<&Arity, Error> {
    if let Some(arity) = arities
        .iter()
        .find(|a| a.rest.is_none() && a.params.len() == argc)
    {
        return Ok(arity);
    }
    if let Some(arity) = arities
        .iter()
        .find(|a| a.rest.is_some() && argc >= a.params.len())
    {
        return Ok(arity);
    }
    let available: Vec<String> = arities.iter().map(Arity::describe).collect();
    Err(Error::eval(format!(
        "No matching arity for {argc} arguments. Available arities: {}",
        available.join(", ")
    )))
}

fn bind_params(arity: &Arity, args: &[Value], outer: &Environment) -> Result<Environment, Error> {
    if args.len() < arity.params.len() || (arity.rest.is_none() && args.len() != arity.params.len())
    {
        return Err(Error::eval("Arguments length mismatch"));
    }
    let local = outer.extend(&arity.params, &args[..arity.params.len()]);
    if let Some(rest) = &arity.rest {
        let remaining = &args[arity.params.len()..];
        let rest_value = if remaining.is_empty() {
            Value::Nil
        } else {
            Value::list(remaining.iter().cloned())
        };
        local.define(rest.resolve(), rest_value);
    }
    Ok(local)
}

// ============================================================================
// Macro Expansion
// ============================================================================

/// Bind macro parameters to the unevaluated call-site forms and run the
/// macro body in the macro's captured environment.
fn expand_macro(mac: &MacroCell, forms: &[Value], sess: &mut Session) -> Result<Value, Signal> {
    let arity = resolve_arity(&mac.arities, forms.len())?;
    let local = bind_params(arity, forms, &mac.env)?;
    eval_body(&arity.body, &local, sess)
}

/// Expand `form` once if it is a call to a macro visible in `env`;
/// return it unchanged otherwise.
pub fn macroexpand_once(
    form: &Value,
    env: &Environment,
    sess: &mut Session,
) -> Result<Value, Error> {
    let Value::List(items) = form else {
        return Ok(form.clone());
    };
    let Some(Value::Symbol(sym)) = items.front() else {
        return Ok(form.clone());
    };
    let Some(Value::Macro(mac)) = env.lookup(&sym.resolve()) else {
        return Ok(form.clone());
    };
    let tail: Vec<Value> = items.iter().skip(1).cloned().collect();
    expand_macro(&mac, &tail, sess).map_err(Signal::into_error)
}

// ============================================================================
// Quasiquote
// ============================================================================

/// Walk the template: `(unquote x)` evaluates once, `(unquote-splicing
/// x)` evaluates and splices into the surrounding sequence, everything
/// else is preserved literally.
pub(crate) fn eval_quasiquote(
    form: &Value,
    env: &Environment,
    sess: &mut Session,
) -> Result<Value, Signal> {
    match form {
        Value::List(items) if is_tagged_pair(items, "unquote") => evaluate(&items[1], env, sess),
        Value::List(items) => Ok(Value::List(quasiquote_elements(items, env, sess)?)),
        Value::Vector(items) => Ok(Value::Vector(quasiquote_elements(items, env, sess)?)),
        Value::Map(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (k, v) in &map.entries {
                entries.push((
                    eval_quasiquote(k, env, sess)?,
                    eval_quasiquote(v, env, sess)?,
                ));
            }
            Ok(Value::map(entries))
        }
        _ => Ok(form.clone()),
    }
}

fn is_tagged_pair(items: &ImVector<Value>, tag: &str) -> bool {
    items.len() == 2 && matches!(items.front(), Some(Value::Symbol(sym)) if sym.is(tag))
}

fn quasiquote_elements(
    items: &ImVector<Value>,
    env: &Environment,
    sess: &mut Session,
) -> Result<ImVector<Value>, Signal> {
    let mut out = ImVector::new();
    for item in items {
        if let Value::List(inner) = item {
            if is_tagged_pair(inner, "unquote-splicing") {
                let spliced = evaluate(&inner[1], env, sess)?;
                match spliced {
                    Value::List(xs) | Value::Vector(xs) => {
                        for x in xs.iter() {
                            out.push_back(x.clone());
                        }
                    }
                    other => {
                        return Err(Error::eval(format!(
                            "unquote-splicing expects a list or vector, got {other}"
                        ))
                        .into())
                    }
                }
                continue;
            }
        }
        out.push_back(eval_quasiquote(item, env, sess)?);
    }
    Ok(out)
}

// ============================================================================
// Arity Parsing
// ============================================================================

/// Parse the tail of a `fn`/`defmacro` form: either a single parameter
/// vector followed by a body, or a sequence of `([params] body...)`
/// clauses.
pub fn parse_arities(owner: &str, tail: &[Value]) -> Result<Vec<Arity>, Error> {
    let arities = match tail.first() {
        Some(Value::Vector(params)) => vec![build_arity(owner, params, &tail[1..])?],
        Some(Value::List(_)) => {
            let mut arities = Vec::with_capacity(tail.len());
            for clause in tail {
                let Value::List(clause_items) = clause else {
                    return Err(Error::eval(format!("{owner} arity clauses must be lists")));
                };
                let Some(Value::Vector(params)) = clause_items.front() else {
                    return Err(Error::eval(format!(
                        "{owner} arity clauses must begin with a parameter vector"
                    )));
                };
                let body: Vec<Value> = clause_items.iter().skip(1).cloned().collect();
                arities.push(build_arity(owner, params, &body)?);
            }
            arities
        }
        _ => {
            return Err(Error::eval(format!(
                "{owner} expects a parameter vector or arity clauses"
            )))
        }
    };

    if arities.iter().filter(|a| a.rest.is_some()).count() > 1 {
        return Err(Error::eval(format!(
            "{owner} may define at most one variadic arity"
        )));
    }
    for (i, arity) in arities.iter().enumerate() {
        if arity.rest.is_none()
            && arities[..i]
                .iter()
                .any(|other| other.rest.is_none() && other.params.len() == arity.params.len())
        {
            return Err(Error::eval(format!(
                "{owner} defines more than one arity with {} parameters",
                arity.params.len()
            )));
        }
    }
    Ok(arities)
}

fn build_arity(owner: &str, params: &ImVector<Value>, body: &[Value]) -> Result<Arity, Error> {
    let mut names = Vec::with_capacity(params.len());
    for param in params {
        let Value::Symbol(sym) = param else {
            return Err(Error::eval(format!("{owner} parameters must be symbols")));
        };
        names.push(*sym);
    }

    let amp_positions: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, sym)| sym.is("&"))
        .map(|(i, _)| i)
        .collect();
    let (fixed, rest) = match amp_positions.as_slice() {
        [] => (names, None),
        [i] if i + 2 == names.len() => {
            let rest = names[i + 1];
            (names[..*i].to_vec(), Some(rest))
        }
        _ => {
            return Err(Error::eval(format!(
                "{owner} expects & to be followed by exactly one rest parameter"
            )))
        }
    };

    Ok(Arity {
        params: fixed,
        rest,
        body: body.to_vec(),
    })
}
