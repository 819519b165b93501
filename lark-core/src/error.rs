//! Error types for the interpreter pipeline.
//!
//! One hierarchy, four kinds: tokenizer, parser, evaluation, and
//! host-conversion errors. The `recur` unwind is deliberately not an
//! error; it travels the same channel as [`Signal::Recur`] and is caught
//! only by the two trampolines in the evaluator.

use std::fmt;

use crate::language::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Lexical failure: unterminated string, malformed number.
    Tokenizer {
        message: String,
        line: usize,
        col: usize,
    },
    /// Structural failure: unmatched delimiter, odd map, unexpected token.
    Parser {
        message: String,
        line: usize,
        col: usize,
    },
    /// Runtime failure during evaluation. `form` carries the offending
    /// form when one is available, for diagnostics.
    Eval {
        message: String,
        form: Option<Value>,
    },
    /// Failure at the host-interop boundary; never raised by evaluation.
    Conversion { message: String },
}

impl Error {
    pub fn tokenizer(message: impl Into<String>, line: usize, col: usize) -> Self {
        Error::Tokenizer {
            message: message.into(),
            line,
            col,
        }
    }

    pub fn parser(message: impl Into<String>, line: usize, col: usize) -> Self {
        Error::Parser {
            message: message.into(),
            line,
            col,
        }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        Error::Eval {
            message: message.into(),
            form: None,
        }
    }

    pub fn eval_in(message: impl Into<String>, form: Value) -> Self {
        Error::Eval {
            message: message.into(),
            form: Some(form),
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Error::Conversion {
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Tokenizer { message, line, col } => {
                write!(f, "tokenizer error at {line}:{col}: {message}")
            }
            Error::Parser { message, line, col } => {
                write!(f, "parser error at {line}:{col}: {message}")
            }
            Error::Eval { message, .. } => write!(f, "{message}"),
            Error::Conversion { message } => write!(f, "conversion error: {message}"),
        }
    }
}

impl std::error::Error for Error {}

/// Unwind channel for the evaluator.
///
/// `Recur` carries the freshly evaluated arguments of a `(recur ...)`
/// form up to the nearest `loop` body or function call-apply loop, which
/// rebind and iterate instead of recursing.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Error(Error),
    Recur(Vec<Value>),
}

impl From<Error> for Signal {
    fn from(err: Error) -> Self {
        Signal::Error(err)
    }
}

impl Signal {
    /// Collapse into a user-facing error. A `Recur` that reaches a
    /// public boundary was evaluated outside of `loop`/`fn`.
    pub fn into_error(self) -> Error {
        match self {
            Signal::Error(err) => err,
            Signal::Recur(_) => Error::eval("recur called outside of loop or fn"),
        }
    }
}
