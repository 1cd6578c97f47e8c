//! Assertions over simx case results.
//!
//! An assertion is a boolean expression over case-variable symbols and the
//! time `t`, plus a temporal quantifier saying when it must hold.
//!
//! ## Modules
//!
//! - [`lexer`] and [`parser`] turn expression text into an [`ast::Expr`]
//! - [`eval`] interprets the tree over numbers, booleans and vectors
//! - [`temporal`] folds a predicate series into a verdict (Always, Finally, at Time)
//! - [`engine`] keeps compiled assertions and evaluates them against [`simx_results::Results`]

pub mod ast;
pub mod engine;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod temporal;

pub use engine::{Assertion, AssertionEngine, AssertionResult, Observation, SymbolTarget, Verdict};
pub use error::{AssertError, Result};
pub use eval::Val;
pub use parser::parse;
pub use temporal::{Outcome, Temporal};
