//! Lexical environments and namespace roots.
//!
//! An `Environment` is a chain of scopes. Cloning is an `Arc` increment,
//! so closures capture scopes by sharing them; `def` mutates the shared
//! state and is visible to every holder. Namespace-root environments
//! additionally carry the namespace name and a live alias table.
//!
//! Namespace environments form reference cycles (a function defined in a
//! namespace captures that namespace's env). Those cycles are never
//! collected; the session owns every namespace root for its lifetime.

use std::fmt;
use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;

use crate::interner::Interned;
use crate::language::Value;

struct EnvState {
    bindings: FxHashMap<String, Value>,
    outer: Option<Environment>,
    /// Set only on namespace roots.
    namespace: Option<String>,
    /// Alias -> target namespace root. Live references, not snapshots.
    aliases: FxHashMap<String, Environment>,
}

#[derive(Clone)]
pub struct Environment {
    state: Arc<RwLock<EnvState>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// New empty root environment.
    pub fn new() -> Self {
        Environment {
            state: Arc::new(RwLock::new(EnvState {
                bindings: FxHashMap::default(),
                outer: None,
                namespace: None,
                aliases: FxHashMap::default(),
            })),
        }
    }

    /// New empty child scope.
    pub fn child(&self) -> Self {
        Environment {
            state: Arc::new(RwLock::new(EnvState {
                bindings: FxHashMap::default(),
                outer: Some(self.clone()),
                namespace: None,
                aliases: FxHashMap::default(),
            })),
        }
    }

    /// New namespace-root environment named `name`.
    pub fn namespace_root(name: &str, outer: Option<Environment>) -> Self {
        Environment {
            state: Arc::new(RwLock::new(EnvState {
                bindings: FxHashMap::default(),
                outer,
                namespace: Some(name.to_string()),
                aliases: FxHashMap::default(),
            })),
        }
    }

    /// Install a binding directly in this scope.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        let mut state = self.state.write().unwrap();
        state.bindings.insert(name.into(), value);
    }

    /// Look `name` up, walking the outer chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut env = self.clone();
        loop {
            let outer = {
                let state = env.state.read().unwrap();
                if let Some(value) = state.bindings.get(name) {
                    return Some(value.clone());
                }
                state.outer.clone()
            };
            match outer {
                Some(next) => env = next,
                None => return None,
            }
        }
    }

    /// Child scope binding each `(name, value)` pair. The slices must be
    /// the same length; the evaluator checks arity before calling this.
    pub fn extend(&self, names: &[Interned], values: &[Value]) -> Environment {
        let env = self.child();
        {
            let mut state = env.state.write().unwrap();
            for (name, value) in names.iter().zip(values.iter()) {
                state.bindings.insert(name.resolve(), value.clone());
            }
        }
        env
    }

    /// Topmost environment of the outer chain.
    pub fn root(&self) -> Environment {
        let mut env = self.clone();
        loop {
            let outer = env.state.read().unwrap().outer.clone();
            match outer {
                Some(next) => env = next,
                None => return env,
            }
        }
    }

    /// Nearest enclosing environment with a namespace name, if any.
    /// This is the target of `def` and the carrier of aliases.
    pub fn namespace_env(&self) -> Option<Environment> {
        let mut env = self.clone();
        loop {
            let outer = {
                let state = env.state.read().unwrap();
                if state.namespace.is_some() {
                    return Some(env.clone());
                }
                state.outer.clone()
            };
            match outer {
                Some(next) => env = next,
                None => return None,
            }
        }
    }

    pub fn namespace(&self) -> Option<String> {
        self.state.read().unwrap().namespace.clone()
    }

    pub fn add_alias(&self, alias: &str, target: &Environment) {
        let mut state = self.state.write().unwrap();
        state.aliases.insert(alias.to_string(), target.clone());
    }

    pub fn alias(&self, name: &str) -> Option<Environment> {
        self.state.read().unwrap().aliases.get(name).cloned()
    }

    /// Identity comparison; used by tests to check alias liveness.
    pub fn same_env(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().unwrap();
        match &state.namespace {
            Some(ns) => write!(f, "<env {ns}>"),
            None => write!(f, "<env>"),
        }
    }
}
