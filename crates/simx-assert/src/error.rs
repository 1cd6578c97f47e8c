//! Error types for assertion compilation and evaluation.
//!
//! A false verdict is never an error. Errors mean the assertion itself is
//! broken: bad syntax, unknown names, operands of the wrong shape, or symbols
//! that cannot be mapped back to recorded results.

use simx_core::CoreError;
use simx_results::ResultsError;

#[derive(Debug, thiserror::Error)]
pub enum AssertError {
    /// A character sequence that starts no token.
    #[error("unexpected '{text}' at position {position}")]
    Lex { position: usize, text: String },

    /// Malformed expression.
    #[error("syntax error: {0}")]
    Parse(String),

    /// An identifier that is neither a registered symbol nor a function.
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    /// A call target outside the function whitelist.
    #[error("function '{0}' is not available in assertions")]
    UnknownFunction(String),

    #[error("{func}() takes {expected} argument(s), {found} given")]
    Arity {
        func: String,
        expected: &'static str,
        found: usize,
    },

    /// Operands of the wrong kind or shape.
    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of range for vector of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// No assertion registered under this key.
    #[error("assertion '{0}' not found")]
    UnknownKey(String),

    /// A temporal spec that is not `A`, `F`, `T<time>` or a time.
    #[error("invalid temporal spec '{0}'")]
    Temporal(String),

    /// An evaluation over a series without samples.
    #[error("assertion '{0}' has no data to evaluate")]
    NoData(String),

    /// Wrong number of arguments passed to a compiled assertion.
    #[error("assertion '{key}' expects {expected} argument(s), {found} given")]
    Arguments {
        key: String,
        expected: usize,
        found: usize,
    },

    /// Truth value of a vector with more than one element.
    #[error("the truth value of a vector with {0} elements is ambiguous")]
    Ambiguous(usize),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Results(#[from] ResultsError),
}

pub type Result<T> = std::result::Result<T, AssertError>;
