//! # ci-exercise: arithmetic and string helpers
//!
//! A small library whose centrepiece is a restricted arithmetic evaluator:
//! text goes in, an `f64` or a typed error comes out, and nothing outside
//! plain arithmetic is ever executed.
//!
//! ## Evaluation Pipeline
//!
//! ```text
//! Source Text → Parser → Syntax Tree → Evaluator (allow-list) → f64
//! ```
//!
//! ### Stage 1: Parsing
//!
//! The [`parser`] module turns the input into an [`ast::Node`] tree with
//! `nom` combinators. It recognises more than it will evaluate (names,
//! calls, comparisons, conditionals) so that a well-formed but forbidden
//! expression is reported differently from text that is not an expression.
//!
//! ### Stage 2: Evaluation
//!
//! The [`eval`] module reduces the tree bottom-up. Only numeric literals,
//! unary `+`/`-` and binary `+ - * / **` pass the operator allow-list;
//! integers are promoted to `f64` first, so `1/2` is `0.5`.
//!
//! ## Helpers
//!
//! - [`calculator`]: `add`, `subtract`, `multiply`, `divide`, `power` and
//!   `run_calculation`
//! - [`string_utils`]: reversing, palindromes, vowels, capitalisation,
//!   truncation and JSON string payloads
//! - [`config`]: evaluator limits loaded from JSON
//!
//! ```
//! use ci_exercise::{evaluate, EvalError};
//!
//! assert_eq!(evaluate("2 + 3 * 4"), Ok(14.0));
//! assert_eq!(evaluate("1 / 0"), Err(EvalError::DivisionByZero));
//! ```

pub mod ast;
pub mod calculator;
pub mod config;
pub mod error;
pub mod eval;
pub mod parser;
pub mod string_utils;

// Re-exports
pub use error::*;
pub use eval::{evaluate, EvalError, EvalResult, Evaluator};
