use ci_exercise::{config::EvaluatorConfig, evaluate, EvalError, Evaluator};
use pretty_assertions::assert_eq;

extern crate ci_exercise;

fn assert_invalid_syntax(expression: &str) {
    let result = evaluate(expression);
    assert!(
        matches!(result, Err(EvalError::InvalidSyntax { .. })),
        "{:?} should be a syntax error, got {:?}",
        expression,
        result
    );
}

fn assert_unsupported(expression: &str) {
    let result = evaluate(expression);
    assert!(
        matches!(result, Err(EvalError::UnsupportedExpression(_))),
        "{:?} should be unsupported, got {:?}",
        expression,
        result
    );
}

#[test]
fn it_evaluates_arithmetic() {
    assert_eq!(evaluate("2 + 3 * 4"), Ok(14.0));
    assert_eq!(evaluate("(2 + 3) * 4"), Ok(20.0));
    assert_eq!(evaluate("10 - 4 - 3"), Ok(3.0));
    assert_eq!(evaluate("2 * 3 / 4"), Ok(1.5));
    assert_eq!(evaluate("1/2"), Ok(0.5));
    assert_eq!(evaluate("7 / 2"), Ok(3.5));
    assert_eq!(evaluate("1.5 + 2.25"), Ok(3.75));
    assert_eq!(evaluate("0x10 + 0b11"), Ok(19.0));
    assert_eq!(evaluate("1_000 * 2"), Ok(2000.0));
}

#[test]
fn it_applies_power_precedence() {
    assert_eq!(evaluate("-2 ** 2"), Ok(-4.0));
    assert_eq!(evaluate("(-2) ** 2"), Ok(4.0));
    assert_eq!(evaluate("2 ** 3 ** 2"), Ok(512.0));
    assert_eq!(evaluate("2 ** -1"), Ok(0.5));
    assert_eq!(evaluate("4 ** 0.5"), Ok(2.0));
    assert_eq!(evaluate("2 * 3 ** 2"), Ok(18.0));
}

#[test]
fn it_applies_unary_operators() {
    assert_eq!(evaluate("-5"), Ok(-5.0));
    assert_eq!(evaluate("+5"), Ok(5.0));
    assert_eq!(evaluate("--5"), Ok(5.0));
    assert_eq!(evaluate("3 - -2"), Ok(5.0));
    assert_eq!(evaluate("-(1 + 2)"), Ok(-3.0));
}

#[test]
fn it_ignores_surrounding_whitespace() {
    assert_eq!(evaluate("  1 +\t2\n"), Ok(3.0));
}

#[test]
fn it_rejects_division_by_zero() {
    assert_eq!(evaluate("1 / 0"), Err(EvalError::DivisionByZero));
    assert_eq!(evaluate("1 / 0.0"), Err(EvalError::DivisionByZero));
    assert_eq!(evaluate("5 / (2 - 2)"), Err(EvalError::DivisionByZero));
    assert_eq!(evaluate("0 / 0"), Err(EvalError::DivisionByZero));
}

#[test]
fn it_allows_zero_elsewhere() {
    assert_eq!(evaluate("0 / 5"), Ok(0.0));
    assert_eq!(evaluate("0 * 5"), Ok(0.0));
    assert_eq!(evaluate("0 ** 0"), Ok(1.0));
}

#[test]
fn it_rejects_invalid_syntax() {
    for expression in [
        "2 +",
        "",
        "   ",
        "(1 + 2",
        "1 + 2)",
        "1 $ 2",
        "1 2",
        "* 2",
        "2 ** ",
        "1 +* 2",
        "1 if 2",
        "import os",
        "x = 1",
    ] {
        assert_invalid_syntax(expression);
    }
}

#[test]
fn it_rejects_names_and_calls() {
    assert_unsupported("x + 1");
    assert_unsupported("x");
    assert_unsupported("abs(-1)");
    assert_unsupported("__import__('os').system('ls')");
    assert_unsupported("math.pi");
    assert_unsupported("a[0]");
    assert_unsupported("a[1:2]");
    assert_unsupported("f(x=1)");
    assert_unsupported("f(*args, **kwargs)");
    assert_unsupported("lambda: 1");
    assert_unsupported("(lambda x: x)(2)");
    assert_unsupported("(x := 1)");
}

#[test]
fn it_rejects_displays_and_comprehensions() {
    for expression in [
        "{1: 2}",
        "{1}",
        "{}",
        "[x for x in y]",
        "{x for x in y}",
        "{k: v for k, v in y}",
        "(x for x in y)",
        "sum(x for x in range(3))",
        "*a, b",
    ] {
        assert_unsupported(expression);
    }
}

#[test]
fn it_rejects_control_flow_and_logic() {
    assert_unsupported("1 if True else 2");
    assert_unsupported("1 < 2");
    assert_unsupported("1 == 1");
    assert_unsupported("1 and 2");
    assert_unsupported("not 1");
}

#[test]
fn it_rejects_non_numeric_literals() {
    assert_unsupported("'a'");
    assert_unsupported("\"abc\" + 1");
    assert_unsupported("True");
    assert_unsupported("None");
    assert_unsupported("1j");
    assert_unsupported("[1, 2]");
    assert_unsupported("1, 2");
    assert_unsupported("b'ab'");
    assert_unsupported("f'ab'");
    assert_unsupported("...");
    assert_unsupported("'a' 'b'");
}

#[test]
fn it_follows_line_structure() {
    assert_invalid_syntax("1 +\n2");
    assert_invalid_syntax("1\n2");
    assert_eq!(evaluate("(1 +\n2)"), Ok(3.0));
    assert_eq!(evaluate("1 + \\\n2"), Ok(3.0));
    assert_eq!(evaluate("2 * 3  # six"), Ok(6.0));
}

#[test]
fn it_rejects_operators_outside_the_allow_list() {
    assert_unsupported("7 // 2");
    assert_unsupported("7 % 2");
    assert_unsupported("~1");
    assert_unsupported("1 << 2");
    assert_unsupported("6 & 3");
    assert_unsupported("6 | 3");
    assert_unsupported("6 ^ 3");
}

#[test]
fn it_is_idempotent() {
    for expression in ["2 + 3 * 4", "0.1 + 0.2", "-2 ** 0.5", "1 / 3"] {
        let first = evaluate(expression);
        let second = evaluate(expression);
        match (first, second) {
            (Ok(a), Ok(b)) => assert_eq!(a.to_bits(), b.to_bits()),
            (a, b) => assert_eq!(a, b),
        }
    }
}

#[test]
fn it_follows_ieee_for_power_edge_cases() {
    assert_eq!(evaluate("10.0 ** 400"), Ok(f64::INFINITY));
    assert_eq!(evaluate("0 ** -1"), Ok(f64::INFINITY));
    assert!(evaluate("(-8) ** (1 / 3)").unwrap().is_nan());
}

#[test]
fn it_enforces_configured_limits() {
    let evaluator = Evaluator::with_config(EvaluatorConfig {
        max_expression_length: 32,
        max_nesting_depth: 3,
        max_tree_depth: 16,
    });
    assert_eq!(evaluator.evaluate("(((1 + 2)))"), Ok(3.0));
    assert!(matches!(
        evaluator.evaluate("((((1 + 2))))"),
        Err(EvalError::InvalidSyntax { .. })
    ));
    assert!(matches!(
        evaluator.evaluate(&"1 + ".repeat(10).to_string()),
        Err(EvalError::InvalidSyntax { .. })
    ));
}

#[test]
fn it_rejects_deep_nesting_by_default() {
    let expression = format!("{}1{}", "(".repeat(500), ")".repeat(500));
    assert!(matches!(
        evaluate(&expression),
        Err(EvalError::InvalidSyntax { .. })
    ));
    let expression = format!("{}1{}", "(".repeat(20), ")".repeat(20));
    assert_eq!(evaluate(&expression), Ok(1.0));
}

fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn it_evaluates_at_the_default_limits_on_a_small_stack() {
    let depth = EvaluatorConfig::default().max_nesting_depth;
    let parens = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(on_small_stack(move || evaluate(&parens)), Ok(1.0));

    let lists = format!("{}1{}", "[".repeat(depth), "]".repeat(depth));
    assert!(matches!(
        on_small_stack(move || evaluate(&lists)),
        Err(EvalError::UnsupportedExpression(_))
    ));

    let calls = format!("{}1{}", "f(".repeat(depth), ")".repeat(depth));
    assert!(matches!(
        on_small_stack(move || evaluate(&calls)),
        Err(EvalError::UnsupportedExpression(_))
    ));

    let mixed = format!("{}1{}", "-(2 * ".repeat(depth), ")".repeat(depth));
    assert!(on_small_stack(move || evaluate(&mixed)).is_ok());

    let tree_depth = EvaluatorConfig::default().max_tree_depth;
    let negations = format!("{}1", "-".repeat(tree_depth - 1));
    assert_eq!(on_small_stack(move || evaluate(&negations)), Ok(-1.0));
}

#[test]
fn it_rejects_one_level_past_the_default_nesting() {
    let depth = EvaluatorConfig::default().max_nesting_depth + 1;
    let parens = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_invalid_syntax(&parens);
}

#[test]
fn it_rejects_overly_tall_trees() {
    let long_sum = vec!["1"; 2000].join("+");
    assert!(matches!(
        evaluate(&long_sum),
        Err(EvalError::InvalidSyntax { .. })
    ));
    let power_chain = vec!["1"; 2000].join("**");
    assert!(matches!(
        evaluate(&power_chain),
        Err(EvalError::InvalidSyntax { .. })
    ));
    let short_sum = vec!["1"; 100].join(" + ");
    assert_eq!(evaluate(&short_sum), Ok(100.0));
}

#[test]
fn it_is_shareable_across_threads() {
    let evaluator = std::sync::Arc::new(Evaluator::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let evaluator = evaluator.clone();
            std::thread::spawn(move || evaluator.evaluate(&format!("{} * 2", i)))
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Ok(i as f64 * 2.0));
    }
}
