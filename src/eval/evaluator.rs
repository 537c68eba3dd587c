use thiserror::Error;
use tracing::{debug, instrument, trace};

use super::operators::{binary_operation, unary_operation};
use crate::ast::{BinaryOperator, Constant, Node, UnaryOperator};
use crate::config::EvaluatorConfig;
use crate::parser;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The input is not a well-formed expression. `detail` carries the parser
    /// diagnostic and is informational only.
    #[error("{message}")]
    InvalidSyntax {
        message: String,
        detail: Option<String>,
    },
    #[error("Cannot divide by zero")]
    DivisionByZero,
    /// A well-formed expression outside the arithmetic subset.
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),
}

impl EvalError {
    pub fn invalid_syntax<S: Into<String>>(message: S) -> Self {
        EvalError::InvalidSyntax {
            message: message.into(),
            detail: None,
        }
    }

    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        EvalError::UnsupportedExpression(message.into())
    }
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Evaluates `expression` with the default [`EvaluatorConfig`].
pub fn evaluate(expression: &str) -> EvalResult<f64> {
    Evaluator::new().evaluate(expression)
}

#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Top level entry point: parse `expression`, then reduce the tree.
    #[instrument(level = "debug", skip(self))]
    pub fn evaluate(&self, expression: &str) -> EvalResult<f64> {
        self.check_limits(expression)?;
        let tree = parser::parse(expression)?;
        let depth = tree.depth();
        if depth > self.config.max_tree_depth {
            return Err(EvalError::invalid_syntax(format!(
                "expression is nested too deeply ({}, limit {})",
                depth, self.config.max_tree_depth
            )));
        }
        let result = self.eval_node(&tree);
        match &result {
            Ok(value) => debug!("evaluated to {}", value),
            Err(e) => debug!("rejected: {}", e),
        }
        result
    }

    fn check_limits(&self, expression: &str) -> EvalResult<()> {
        if expression.len() > self.config.max_expression_length {
            return Err(EvalError::invalid_syntax(format!(
                "expression is too long ({} bytes, limit {})",
                expression.len(),
                self.config.max_expression_length
            )));
        }
        let depth = parser::nesting_depth(expression);
        if depth > self.config.max_nesting_depth {
            return Err(EvalError::invalid_syntax(format!(
                "too many nested parentheses ({}, limit {})",
                depth, self.config.max_nesting_depth
            )));
        }
        Ok(())
    }

    /// Reduces a parsed tree bottom-up. Only literals, allow-listed unary
    /// operators and allow-listed binary operators are accepted.
    ///
    /// Operands are reduced left to right before their operator is checked.
    /// The walk keeps its own stack, so tree height does not consume
    /// thread stack.
    pub fn eval_node(&self, node: &Node) -> EvalResult<f64> {
        let mut tasks = vec![Task::Reduce(node)];
        let mut values: Vec<f64> = Vec::new();

        while let Some(task) = tasks.pop() {
            match task {
                Task::Reduce(node) => match node {
                    Node::Literal(constant) => values.push(Self::eval_literal(constant)?),
                    Node::UnaryOp { op, operand } => {
                        tasks.push(Task::Unary(*op));
                        tasks.push(Task::Reduce(operand));
                    }
                    Node::BinaryOp { op, left, right } => {
                        tasks.push(Task::Binary(*op));
                        tasks.push(Task::Reduce(right));
                        tasks.push(Task::Reduce(left));
                    }
                    Node::Name(name) => {
                        return Err(EvalError::unsupported(format!("name '{}'", name)))
                    }
                    other => return Err(EvalError::unsupported(other.kind())),
                },
                Task::Unary(op) => {
                    let value = pop_operand(&mut values)?;
                    values.push(Self::eval_unary_op(op, value)?);
                }
                Task::Binary(op) => {
                    let right = pop_operand(&mut values)?;
                    let left = pop_operand(&mut values)?;
                    values.push(Self::eval_binary_op(op, left, right)?);
                }
            }
        }
        pop_operand(&mut values)
    }

    fn eval_literal(constant: &Constant) -> EvalResult<f64> {
        match constant {
            Constant::Int(i) => Ok(*i as f64),
            Constant::Float(f) => Ok(*f),
            other => Err(EvalError::unsupported(format!(
                "{} literal {}",
                other.type_name(),
                other
            ))),
        }
    }

    fn eval_unary_op(op: UnaryOperator, value: f64) -> EvalResult<f64> {
        let apply = unary_operation(op)
            .ok_or_else(|| EvalError::unsupported(format!("unary operator '{}'", op)))?;
        trace!("{}{}", op, value);
        Ok(apply(value))
    }

    fn eval_binary_op(op: BinaryOperator, left: f64, right: f64) -> EvalResult<f64> {
        if op == BinaryOperator::Div && right == 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        let apply = binary_operation(op)
            .ok_or_else(|| EvalError::unsupported(format!("binary operator '{}'", op)))?;
        trace!("{} {} {}", left, op, right);
        Ok(apply(left, right))
    }
}

enum Task<'a> {
    Reduce(&'a Node),
    Unary(UnaryOperator),
    Binary(BinaryOperator),
}

// every operator task is preceded by the reductions of its operands
fn pop_operand(values: &mut Vec<f64>) -> EvalResult<f64> {
    values
        .pop()
        .ok_or_else(|| EvalError::invalid_syntax("operator without operand"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Node {
        Node::Literal(Constant::Int(i))
    }

    #[test]
    fn test_eval_literal() {
        let evaluator = Evaluator::new();
        assert_eq!(evaluator.eval_node(&int(3)), Ok(3.0));
        assert_eq!(evaluator.eval_node(&Node::Literal(Constant::Float(0.5))), Ok(0.5));
    }

    #[test]
    fn test_eval_rejects_non_numeric_literals() {
        let evaluator = Evaluator::new();
        for constant in [
            Constant::Str("1".to_string()),
            Constant::Bool(true),
            Constant::None,
            Constant::Imaginary(1.0),
        ] {
            assert!(matches!(
                evaluator.eval_node(&Node::Literal(constant)),
                Err(EvalError::UnsupportedExpression(_))
            ));
        }
    }

    #[test]
    fn test_division_by_zero_checked_before_operator() {
        let evaluator = Evaluator::new();
        let node = Node::binary(BinaryOperator::Div, int(1), int(0));
        assert_eq!(evaluator.eval_node(&node), Err(EvalError::DivisionByZero));

        let negative_zero = Node::binary(
            BinaryOperator::Div,
            int(1),
            Node::unary(UnaryOperator::USub, Node::Literal(Constant::Float(0.0))),
        );
        assert_eq!(evaluator.eval_node(&negative_zero), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_operands_evaluated_before_operator_check() {
        // left operand error wins over the disallowed operator
        let evaluator = Evaluator::new();
        let node = Node::binary(BinaryOperator::Mod, Node::Name("x".to_string()), int(2));
        assert_eq!(
            evaluator.eval_node(&node),
            Err(EvalError::unsupported("name 'x'"))
        );
        let node = Node::binary(
            BinaryOperator::FloorDiv,
            int(1),
            Node::binary(BinaryOperator::Div, int(1), int(0)),
        );
        assert_eq!(evaluator.eval_node(&node), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_eval_tall_tree_without_recursion() {
        let evaluator = Evaluator::new();
        let tall = (0..100_000).fold(int(1), |acc, _| {
            Node::binary(BinaryOperator::Add, acc, int(1))
        });
        assert_eq!(evaluator.eval_node(&tall), Ok(100_001.0));
        // 木を反復的に解放する
        let mut rest = vec![tall];
        while let Some(node) = rest.pop() {
            if let Node::BinaryOp { left, right, .. } = node {
                rest.push(*left);
                rest.push(*right);
            }
        }
    }

    #[test]
    fn test_limits() {
        let evaluator = Evaluator::with_config(EvaluatorConfig {
            max_expression_length: 8,
            max_nesting_depth: 2,
            max_tree_depth: 4,
        });
        assert_eq!(evaluator.evaluate("((1))"), Ok(1.0));
        assert!(matches!(
            evaluator.evaluate("(((1)))"),
            Err(EvalError::InvalidSyntax { .. })
        ));
        assert!(matches!(
            evaluator.evaluate("1 + 2 + 3"),
            Err(EvalError::InvalidSyntax { .. })
        ));
        assert_eq!(evaluator.evaluate("--1"), Ok(1.0));
        assert!(matches!(
            evaluator.evaluate("-----1"),
            Err(EvalError::InvalidSyntax { .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(EvalError::DivisionByZero.to_string(), "Cannot divide by zero");
        assert_eq!(
            EvalError::unsupported("call").to_string(),
            "Unsupported expression: call"
        );
        assert_eq!(
            EvalError::invalid_syntax("empty expression").to_string(),
            "empty expression"
        );
    }
}
