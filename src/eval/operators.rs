use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::ast::{BinaryOperator, UnaryOperator};

pub type UnaryFn = fn(f64) -> f64;
pub type BinaryFn = fn(f64, f64) -> f64;

lazy_static! {
    static ref UNARY_OPERATIONS: HashMap<UnaryOperator, UnaryFn> = {
        let mut operations: HashMap<UnaryOperator, UnaryFn> = HashMap::new();
        operations.insert(UnaryOperator::UAdd, pos);
        operations.insert(UnaryOperator::USub, neg);
        operations
    };
    static ref BINARY_OPERATIONS: HashMap<BinaryOperator, BinaryFn> = {
        let mut operations: HashMap<BinaryOperator, BinaryFn> = HashMap::new();
        operations.insert(BinaryOperator::Add, add);
        operations.insert(BinaryOperator::Sub, sub);
        operations.insert(BinaryOperator::Mult, mul);
        operations.insert(BinaryOperator::Div, truediv);
        operations.insert(BinaryOperator::Pow, pow);
        operations
    };
}

/// Allow-listed function for a prefix operator, if any.
pub fn unary_operation(op: UnaryOperator) -> Option<UnaryFn> {
    UNARY_OPERATIONS.get(&op).copied()
}

/// Allow-listed function for an infix operator, if any.
pub fn binary_operation(op: BinaryOperator) -> Option<BinaryFn> {
    BINARY_OPERATIONS.get(&op).copied()
}

fn pos(x: f64) -> f64 {
    x
}

fn neg(x: f64) -> f64 {
    -x
}

fn add(a: f64, b: f64) -> f64 {
    a + b
}

fn sub(a: f64, b: f64) -> f64 {
    a - b
}

fn mul(a: f64, b: f64) -> f64 {
    a * b
}

// zero divisors are rejected by the evaluator before this is reached
fn truediv(a: f64, b: f64) -> f64 {
    a / b
}

/// IEEE `powf`: `0 ** -1` is `inf` and a negative base with a fractional
/// exponent is `NaN`; neither is an error.
fn pow(a: f64, b: f64) -> f64 {
    a.powf(b)
}
