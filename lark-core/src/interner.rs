//! Global name table for symbols and keywords.
//!
//! Every symbol and keyword is a handle into one process-wide table, so
//! equality checks and special-form dispatch never compare strings.
//! Reads vastly outnumber inserts once a program is parsed; interning
//! therefore probes under a read lock first and only takes the write
//! lock for names seen for the first time.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::RwLock;
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

static NAMES: Lazy<RwLock<StringInterner<DefaultBackend>>> =
    Lazy::new(|| RwLock::new(StringInterner::new()));

/// Handle to a name in the global table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interned(DefaultSymbol);

impl Interned {
    /// Intern `name`. A name already in the table resolves to its
    /// existing handle without touching the write lock.
    pub fn new(name: &str) -> Self {
        if let Some(existing) = NAMES.read().unwrap().get(name) {
            return Interned(existing);
        }
        Interned(NAMES.write().unwrap().get_or_intern(name))
    }

    /// The interned text as an owned string.
    pub fn resolve(&self) -> String {
        let table = NAMES.read().unwrap();
        table
            .resolve(self.0)
            .expect("interned handles never dangle")
            .to_string()
    }

    /// Borrow the interned text without allocating.
    pub fn with_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let table = NAMES.read().unwrap();
        f(table.resolve(self.0).expect("interned handles never dangle"))
    }

    /// Whether this handle names `literal`. Probes the table for the
    /// literal and compares handles; a literal that was never interned
    /// cannot match, and no string comparison happens either way.
    pub fn is(&self, literal: &str) -> bool {
        NAMES.read().unwrap().get(literal) == Some(self.0)
    }

    /// Split an `alias/name` reference into its two sides. The slash
    /// must have text on both sides: `/` alone, `lead/`, and `/trail`
    /// are plain names, which keeps the division symbol resolvable.
    pub fn split_qualified(&self) -> Option<(String, String)> {
        self.with_str(|s| {
            let split = s.find('/')?;
            if split == 0 || split + 1 == s.len() {
                return None;
            }
            Some((s[..split].to_string(), s[split + 1..].to_string()))
        })
    }
}

impl fmt::Display for Interned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| f.write_str(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Value;
    use crate::parser::parse;

    #[test]
    fn parsing_the_same_name_twice_yields_one_handle() {
        let forms = parse("swap swap* swap").unwrap();
        let syms: Vec<Interned> = forms
            .iter()
            .map(|form| match form {
                Value::Symbol(sym) => *sym,
                other => panic!("expected a symbol, got {other}"),
            })
            .collect();
        assert_eq!(syms[0], syms[2]);
        assert_ne!(syms[0], syms[1]);
    }

    #[test]
    fn keyword_handles_keep_the_colon() {
        let forms = parse(":port").unwrap();
        let Value::Keyword(kw) = &forms[0] else {
            panic!("expected a keyword");
        };
        assert_eq!(kw.resolve(), ":port");
        assert!(kw.is(":port"));
        assert!(!kw.is("port"));
    }

    #[test]
    fn is_matches_only_the_interned_literal() {
        let sym = Interned::new("recur");
        assert!(sym.is("recur"));
        assert!(!sym.is("loop"));
        assert!(!sym.is("name-that-only-appears-in-this-probe"));
    }

    #[test]
    fn qualified_names_split_on_the_first_slash() {
        assert_eq!(
            Interned::new("geo/tau").split_qualified(),
            Some(("geo".to_string(), "tau".to_string()))
        );
        assert_eq!(
            Interned::new("a/b/c").split_qualified(),
            Some(("a".to_string(), "b/c".to_string()))
        );
    }

    #[test]
    fn division_and_edge_slashes_stay_plain() {
        assert_eq!(Interned::new("/").split_qualified(), None);
        assert_eq!(Interned::new("lead/").split_qualified(), None);
        assert_eq!(Interned::new("/trail").split_qualified(), None);
        assert_eq!(Interned::new("inc").split_qualified(), None);
    }
}
