//! Arithmetic helpers built around the restricted evaluator.

use tracing::{debug, instrument};

use crate::eval::{evaluate, EvalError, EvalResult};

pub fn add(a: f64, b: f64) -> f64 {
    a + b
}

/// Subtracts `b` from `a`.
pub fn subtract(a: f64, b: f64) -> f64 {
    a - b
}

pub fn multiply(a: f64, b: f64) -> f64 {
    a * b
}

/// Divides `a` by `b`, failing with [`EvalError::DivisionByZero`] when `b` is
/// zero (either sign).
pub fn divide(a: f64, b: f64) -> EvalResult<f64> {
    if b == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok(a / b)
}

pub fn power(base: f64, exponent: f64) -> f64 {
    base.powf(exponent)
}

/// Something that can be turned into a single expression line.
///
/// A plain string is used as is; a sequence of arguments is joined with single
/// spaces, so `["2", "+", "3"]` and `"2 + 3"` are the same calculation.
pub trait CalcCommand {
    fn to_expression(&self) -> String;
}

impl CalcCommand for str {
    fn to_expression(&self) -> String {
        self.to_string()
    }
}

impl CalcCommand for String {
    fn to_expression(&self) -> String {
        self.clone()
    }
}

impl<S: AsRef<str>> CalcCommand for [S] {
    fn to_expression(&self) -> String {
        self.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ")
    }
}

impl<S: AsRef<str>> CalcCommand for Vec<S> {
    fn to_expression(&self) -> String {
        self.as_slice().to_expression()
    }
}

/// Evaluates a calculation in-process and renders the result as text.
#[instrument(level = "debug", skip(command))]
pub fn run_calculation<C: CalcCommand + ?Sized>(command: &C) -> EvalResult<String> {
    let expression = command.to_expression();
    let expression = expression.trim();
    debug!("running calculation: {}", expression);
    evaluate(expression).map(format_number)
}

/// Shortest round-trip rendering of a float, always with a fractional part or
/// an exponent: `14.0`, `0.5`, `1e+16`, `1.5e-07`, `inf`, `nan`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    // Debug already switches to exponent form below 1e-4 and from 1e16
    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}
