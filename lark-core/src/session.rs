//! Sessions: the namespace registry, `require`, and the public entry
//! points for evaluating source text.
//!
//! A session always carries two namespaces: `clojure.core`, seeded with
//! the natives and the standard macros, and `user`, whose outer scope is
//! `clojure.core`. Every other namespace is created on demand with
//! `clojure.core` as its outer scope.

use rustc_hash::FxHashMap;

use crate::environment::Environment;
use crate::error::Error;
use crate::interpreter;
use crate::language::Value;
use crate::parser;
use crate::stdlib;

pub const CORE_NS: &str = "clojure.core";
pub const USER_NS: &str = "user";

/// Standard macros loaded at construction, before user entries.
const PRELUDE: &str = include_str!("prelude.clj");

/// Receives one string per `println` call.
pub type OutputSink = Box<dyn FnMut(&str)>;

/// Resolves a path to file contents; `None` when the file is absent.
pub type FileReader = Box<dyn Fn(&str) -> Option<String>>;

#[derive(Default)]
pub struct SessionOptions {
    /// Print sink. When absent, `println` is not installed at all.
    pub output: Option<OutputSink>,
    /// Sources evaluated at creation, after the standard macros.
    pub entries: Vec<String>,
    /// Roots searched by lazy namespace resolution.
    pub source_roots: Vec<String>,
    /// File resolver for lazy namespace loading.
    pub read_file: Option<FileReader>,
}

pub struct Session {
    registry: FxHashMap<String, Environment>,
    current_ns: String,
    output: Option<OutputSink>,
    source_roots: Vec<String>,
    read_file: Option<FileReader>,
}

impl Session {
    pub fn new(options: SessionOptions) -> Result<Session, Error> {
        let SessionOptions {
            output,
            entries,
            source_roots,
            read_file,
        } = options;

        let core = Environment::namespace_root(CORE_NS, None);
        stdlib::register_stdlib(&core);
        if output.is_some() {
            core.define("println", stdlib::println_value());
        }
        let user = Environment::namespace_root(USER_NS, Some(core.clone()));

        let mut registry = FxHashMap::default();
        registry.insert(CORE_NS.to_string(), core);
        registry.insert(USER_NS.to_string(), user);

        let mut sess = Session {
            registry,
            current_ns: USER_NS.to_string(),
            output,
            source_roots,
            read_file,
        };
        sess.load_file(PRELUDE, Some(CORE_NS))?;
        for entry in &entries {
            sess.load_file(entry, None)?;
        }
        Ok(sess)
    }

    pub fn current_ns(&self) -> &str {
        &self.current_ns
    }

    /// Switch the current namespace, creating it if needed.
    pub fn set_ns(&mut self, name: &str) {
        self.ensure_ns(name);
        self.current_ns = name.to_string();
    }

    pub fn get_ns(&self, name: &str) -> Option<Environment> {
        self.registry.get(name).cloned()
    }

    pub fn core_env(&self) -> Environment {
        self.registry
            .get(CORE_NS)
            .cloned()
            .expect("clojure.core is always registered")
    }

    pub fn current_env(&self) -> Environment {
        self.registry
            .get(&self.current_ns)
            .cloned()
            .expect("the current namespace is always registered")
    }

    fn ensure_ns(&mut self, name: &str) -> Environment {
        if let Some(env) = self.registry.get(name) {
            return env.clone();
        }
        log::debug!("creating namespace {name}");
        let outer = self.registry.get(CORE_NS).cloned();
        let env = Environment::namespace_root(name, outer);
        self.registry.insert(name.to_string(), env.clone());
        env
    }

    /// Load a source file: the first top-level `(ns NAME ...)` form picks
    /// the target namespace, falling back to `ns_hint`, then `user`. The
    /// ns form's `(:require ...)` clauses are processed before any form
    /// is evaluated.
    pub fn load_file(&mut self, source: &str, ns_hint: Option<&str>) -> Result<Value, Error> {
        let forms = parser::parse(source)?;
        let ns_name = forms
            .iter()
            .find_map(ns_form_name)
            .unwrap_or_else(|| ns_hint.unwrap_or(USER_NS).to_string());
        let env = self.ensure_ns(&ns_name);
        if let Some(ns_form) = forms.iter().find(|form| ns_form_name(form).is_some()) {
            self.process_ns_clauses(ns_form, &env)?;
        }
        log::debug!("loading {} top-level forms into {ns_name}", forms.len());
        let mut result = Value::Nil;
        for form in &forms {
            result = interpreter::run(form, &env, self)?;
        }
        Ok(result)
    }

    /// Evaluate source in the current namespace. Any top-level `ns`
    /// form's require clauses apply to the current namespace; the forms
    /// themselves evaluate here regardless.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, Error> {
        let forms = parser::parse(source)?;
        let env = self.current_env();
        for form in &forms {
            if ns_form_name(form).is_some() {
                self.process_ns_clauses(form, &env)?;
            }
        }
        let mut result = Value::Nil;
        for form in &forms {
            result = interpreter::run(form, &env, self)?;
        }
        Ok(result)
    }

    /// Evaluate already-parsed forms in the current namespace.
    pub fn evaluate_forms(&mut self, forms: &[Value]) -> Result<Value, Error> {
        let env = self.current_env();
        let mut result = Value::Nil;
        for form in forms {
            result = interpreter::run(form, &env, self)?;
        }
        Ok(result)
    }

    pub(crate) fn emit(&mut self, line: &str) {
        if let Some(sink) = self.output.as_mut() {
            sink(line);
        }
    }

    fn process_ns_clauses(&mut self, form: &Value, env: &Environment) -> Result<(), Error> {
        let Value::List(items) = form else {
            return Ok(());
        };
        for clause in items.iter().skip(2) {
            let Value::List(clause_items) = clause else {
                return Err(Error::eval("ns clauses must be lists starting with a keyword"));
            };
            match clause_items.front() {
                Some(Value::Keyword(kw)) if kw.is(":require") => {
                    for spec in clause_items.iter().skip(1) {
                        self.process_require_spec(spec, env)?;
                    }
                }
                Some(Value::Keyword(kw)) => {
                    return Err(Error::eval(format!(
                        "Unknown ns clause {kw}. Supported: :require"
                    )));
                }
                _ => {
                    return Err(Error::eval("ns clauses must be lists starting with a keyword"))
                }
            }
        }
        Ok(())
    }

    /// A require spec is `[ns-sym clause*]` where each clause is
    /// `:as alias` or `:refer [sym ...]`.
    pub(crate) fn process_require_spec(
        &mut self,
        spec: &Value,
        env: &Environment,
    ) -> Result<(), Error> {
        let Value::Vector(items) = spec else {
            return Err(Error::eval(format!(
                "require expects a vector spec, got {spec}"
            )));
        };
        let Some(Value::Symbol(ns_sym)) = items.front() else {
            return Err(Error::eval("require spec must begin with a namespace symbol"));
        };
        let ns_name = ns_sym.resolve();
        let target = self.resolve_namespace(&ns_name)?;

        let mut i = 1;
        while i < items.len() {
            match &items[i] {
                Value::Keyword(kw) if kw.is(":as") => {
                    let Some(Value::Symbol(alias)) = items.get(i + 1) else {
                        return Err(Error::eval(":as expects an alias symbol"));
                    };
                    env.add_alias(&alias.resolve(), &target);
                    i += 2;
                }
                Value::Keyword(kw) if kw.is(":refer") => {
                    let Some(Value::Vector(names)) = items.get(i + 1) else {
                        return Err(Error::eval(":refer expects a vector of symbols"));
                    };
                    for name in names {
                        let Value::Symbol(sym) = name else {
                            return Err(Error::eval(":refer expects a vector of symbols"));
                        };
                        let member = sym.resolve();
                        let value = target.lookup(&member).ok_or_else(|| {
                            Error::eval(format!(
                                "Symbol {member} not found in namespace {ns_name}"
                            ))
                        })?;
                        env.define(member, value);
                    }
                    i += 2;
                }
                Value::Keyword(kw) => {
                    return Err(Error::eval(format!(
                        "Unknown require option {kw}. Supported: :as, :refer"
                    )));
                }
                other => {
                    return Err(Error::eval(format!(
                        "require options must be keywords, got {other}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look a namespace up in the registry, lazily loading it through the
    /// configured file resolver on a miss. A namespace that is already
    /// registered never triggers a file read.
    fn resolve_namespace(&mut self, name: &str) -> Result<Environment, Error> {
        if let Some(env) = self.registry.get(name) {
            return Ok(env.clone());
        }
        let mut loaded = None;
        if let Some(reader) = self.read_file.as_ref() {
            let rel = format!("{}.clj", name.replace('.', "/"));
            for root in &self.source_roots {
                let path = format!("{root}/{rel}");
                if let Some(content) = reader(&path) {
                    log::debug!("resolved namespace {name} from {path}");
                    loaded = Some(content);
                    break;
                }
            }
        }
        if let Some(content) = loaded {
            self.load_file(&content, Some(name))?;
        }
        self.registry
            .get(name)
            .cloned()
            .ok_or_else(|| Error::eval(format!("No such namespace: {name}")))
    }
}

/// `Some(name)` when `form` is a `(ns NAME ...)` list.
fn ns_form_name(form: &Value) -> Option<String> {
    let Value::List(items) = form else {
        return None;
    };
    match (items.front(), items.get(1)) {
        (Some(Value::Symbol(head)), Some(Value::Symbol(name))) if head.is("ns") => {
            Some(name.resolve())
        }
        _ => None,
    }
}
