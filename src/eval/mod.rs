//! Restricted arithmetic evaluation.
//!
//! The evaluator walks a [`Node`](crate::ast::Node) tree produced by the
//! [`parser`](crate::parser) and reduces it to an `f64`.
//!
//! # Components
//!
//! ## Evaluator
//! [`Evaluator`] owns the input limits and performs the parse, then the
//! bottom-up reduction. [`evaluate`] is the shorthand with default limits.
//!
//! ## Operators
//! [`operators`] holds the allow-list: two immutable tables from operator
//! kind to numeric function. An operator missing from a table cannot be
//! evaluated, whatever the parser accepted.
//!
//! # Failure modes
//!
//! Every rejected input produces exactly one [`EvalError`] kind:
//!
//! - [`EvalError::InvalidSyntax`]: the text is not an expression
//! - [`EvalError::DivisionByZero`]: `/` with a right operand equal to zero
//! - [`EvalError::UnsupportedExpression`]: a well-formed expression outside
//!   the arithmetic subset (names, calls, comparisons, strings, `//`, ...)

pub mod evaluator;
pub mod operators;

pub use evaluator::{evaluate, EvalError, EvalResult, Evaluator};
