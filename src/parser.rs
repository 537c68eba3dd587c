use crate::ast::*;
use crate::eval::{EvalError, EvalResult};
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take, take_till, take_while, take_while1},
    character::complete::{char, digit1, multispace1, one_of},
    combinator::{all_consuming, cut, map, not, opt, peek, recognize, value, verify},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, many1, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    Finish, IResult, Offset,
};
use tracing::{debug, instrument};

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

const SYNTAX_ERROR: &str = "Invalid numeric expression";

// True / False / None are literals, not reserved names
const RESERVED_KEYWORDS: [&str; 32] = [
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Parses a complete expression.
///
/// Surrounding whitespace is ignored; any other unconsumed input, an empty
/// string, a line break outside brackets, or a malformed construct is
/// reported as [`EvalError::InvalidSyntax`] with the parser diagnostic
/// attached.
#[instrument(level = "debug", skip(input), fields(length = input.len()))]
pub fn parse(input: &str) -> EvalResult<Node> {
    let source = input.trim();
    if source.is_empty() {
        return Err(EvalError::invalid_syntax("empty expression"));
    }
    if let Some(offset) = scan(source).line_break {
        return Err(EvalError::InvalidSyntax {
            message: SYNTAX_ERROR.to_string(),
            detail: Some(format!(
                "at offset {}: line break outside brackets",
                input.offset(source) + offset
            )),
        });
    }
    match all_consuming(ws(parse_expression_list))(source).finish() {
        Ok((_, node)) => {
            debug!("parsed {} node", node.kind());
            Ok(node)
        }
        Err(e) => {
            let detail = describe_error(input, &e);
            debug!("parse failed: {}", detail);
            Err(EvalError::InvalidSyntax {
                message: SYNTAX_ERROR.to_string(),
                detail: Some(detail),
            })
        }
    }
}

/// One line per error frame, innermost first: `at offset 3: expected ')'`.
fn describe_error(input: &str, error: &VerboseError<&str>) -> String {
    error
        .errors
        .iter()
        .map(|(rest, kind)| {
            let offset = input.offset(rest);
            match kind {
                VerboseErrorKind::Context(ctx) => format!("at offset {}: in {}", offset, ctx),
                VerboseErrorKind::Char(c) => format!("at offset {}: expected '{}'", offset, c),
                VerboseErrorKind::Nom(kind) => {
                    format!("at offset {}: {}", offset, kind.description())
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn failure<'a>(at: &'a str, what: &'static str) -> nom::Err<VerboseError<&'a str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(at, VerboseErrorKind::Context(what))],
    })
}

// The productions below recurse once per bracket level and are kept free of
// tracing spans; only leaf parsers are instrumented.

/// Entry point of the grammar: an expression or a bare tuple `a, *b`.
pub fn parse_expression_list(input: &str) -> ParserResult<Node> {
    let (input, first) = alt((starred, parse_expression))(input)?;
    tuple_tail(input, first, alt((starred, parse_expression)))
}

/// Finishes `first (, item)* [,]`; a comma anywhere makes a tuple.
fn tuple_tail<'a, F>(input: &'a str, first: Node, item: F) -> ParserResult<'a, Node>
where
    F: FnMut(&'a str) -> ParserResult<'a, Node>,
{
    let (input, rest) = many0(preceded(ws(char(',')), item))(input)?;
    let (input, trailing) = opt(ws(char(',')))(input)?;

    if rest.is_empty() && trailing.is_none() {
        if let Node::Starred(_) = first {
            return Err(failure(input, "starred expression"));
        }
        return Ok((input, first));
    }
    let mut items = vec![first];
    items.extend(rest);
    Ok((input, Node::Tuple(items)))
}

// Expressions
pub fn parse_expression(input: &str) -> ParserResult<Node> {
    alt((parse_lambda, parse_conditional))(input)
}

/// `name := value`, allowed inside brackets and call arguments.
fn parse_named_expression(input: &str) -> ParserResult<Node> {
    alt((
        map(
            separated_pair(ws(parse_name), ws(tag(":=")), cut(parse_expression)),
            |(target, value): (&str, Node)| Node::NamedExpr {
                target: target.to_string(),
                value: Box::new(value),
            },
        ),
        parse_expression,
    ))(input)
}

fn starred(input: &str) -> ParserResult<Node> {
    map(
        preceded(
            ws(terminated(char('*'), not(char('*')))),
            context("starred expression", cut(parse_bit_or)),
        ),
        |value| Node::Starred(Box::new(value)),
    )(input)
}

// 条件式 (a if c else b)
// `a if b else c if d else e` is folded from the right without recursing.
fn parse_conditional(input: &str) -> ParserResult<Node> {
    let (mut input, mut body) = parse_logical_or(input)?;
    let mut branches = Vec::new();

    loop {
        let (rest, test) = opt(preceded(keyword("if"), parse_logical_or))(input)?;
        let Some(test) = test else { break };
        let (rest, _) = context("conditional expression", cut(keyword("else")))(rest)?;
        let (rest, orelse) = cut(alt((parse_lambda, parse_logical_or)))(rest)?;
        branches.push((body, test));
        body = orelse;
        input = rest;
    }

    let node = branches
        .into_iter()
        .rev()
        .fold(body, |orelse, (body, test)| Node::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        });
    Ok((input, node))
}

// ラムダ式 (lambda x, y=1: body)
fn parse_lambda(input: &str) -> ParserResult<Node> {
    let (input, _) = keyword("lambda")(input)?;
    let (input, parameters) = context(
        "lambda parameters",
        cut(terminated(
            separated_list0(ws(char(',')), lambda_parameter),
            opt(ws(char(','))),
        )),
    )(input)?;
    let (input, _) = context("lambda", cut(ws(char(':'))))(input)?;
    let (input, body) = cut(parse_expression)(input)?;

    let (params, defaults): (Vec<_>, Vec<_>) = parameters.into_iter().unzip();
    Ok((
        input,
        Node::Lambda {
            params,
            defaults: defaults.into_iter().flatten().collect(),
            body: Box::new(body),
        },
    ))
}

fn lambda_parameter(input: &str) -> ParserResult<(String, Option<Node>)> {
    alt((
        map(preceded(ws(tag("**")), cut(ws(parse_name))), |name: &str| {
            (format!("**{}", name), None)
        }),
        map(preceded(ws(char('*')), opt(ws(parse_name))), |name: Option<&str>| {
            (format!("*{}", name.unwrap_or_default()), None)
        }),
        map(ws(char('/')), |_: char| ("/".to_string(), None)),
        map(
            pair(
                ws(parse_name),
                opt(preceded(ws(char('=')), cut(parse_expression))),
            ),
            |(name, default): (&str, Option<Node>)| (name.to_string(), default),
        ),
    ))(input)
}

// 論理OR (or)
fn parse_logical_or(input: &str) -> ParserResult<Node> {
    let (input, first) = parse_logical_and(input)?;
    let (input, rest) = many0(preceded(keyword("or"), cut(parse_logical_and)))(input)?;
    Ok((input, bool_op(BoolOperator::Or, first, rest)))
}

// 論理AND (and)
fn parse_logical_and(input: &str) -> ParserResult<Node> {
    let (input, first) = parse_logical_not(input)?;
    let (input, rest) = many0(preceded(keyword("and"), cut(parse_logical_not)))(input)?;
    Ok((input, bool_op(BoolOperator::And, first, rest)))
}

fn bool_op(op: BoolOperator, first: Node, rest: Vec<Node>) -> Node {
    if rest.is_empty() {
        return first;
    }
    let mut values = vec![first];
    values.extend(rest);
    Node::BoolOp { op, values }
}

// 論理NOT (not)
fn parse_logical_not(input: &str) -> ParserResult<Node> {
    let (input, nots) = many0(keyword("not"))(input)?;
    let (input, operand) = parse_comparison(input)?;
    let node = nots
        .into_iter()
        .fold(operand, |acc, _| Node::unary(UnaryOperator::Not, acc));
    Ok((input, node))
}

// 比較演算子 (==, !=, <, >, <=, >=, in, not in, is, is not)
fn parse_comparison(input: &str) -> ParserResult<Node> {
    let (input, first) = parse_bit_or(input)?;
    let (input, rest) = many0(pair(compare_operator, cut(parse_bit_or)))(input)?;

    if rest.is_empty() {
        return Ok((input, first));
    }
    let (ops, comparators) = rest.into_iter().unzip();
    Ok((
        input,
        Node::Compare {
            left: Box::new(first),
            ops,
            comparators,
        },
    ))
}

fn compare_operator(input: &str) -> ParserResult<CompareOperator> {
    alt((
        value(CompareOperator::Eq, ws(tag("=="))),
        value(CompareOperator::NotEq, ws(tag("!="))),
        value(CompareOperator::LtE, ws(tag("<="))),
        value(CompareOperator::GtE, ws(tag(">="))),
        value(CompareOperator::Lt, ws(terminated(char('<'), not(char('<'))))),
        value(CompareOperator::Gt, ws(terminated(char('>'), not(char('>'))))),
        value(CompareOperator::NotIn, pair(keyword("not"), keyword("in"))),
        value(CompareOperator::IsNot, pair(keyword("is"), keyword("not"))),
        value(CompareOperator::Is, keyword("is")),
        value(CompareOperator::In, keyword("in")),
    ))(input)
}

// ビット演算 (|, ^, &)
fn parse_bit_or(input: &str) -> ParserResult<Node> {
    binary_chain(
        input,
        parse_bit_xor,
        value(BinaryOperator::BitOr, ws(char('|'))),
    )
}

fn parse_bit_xor(input: &str) -> ParserResult<Node> {
    binary_chain(
        input,
        parse_bit_and,
        value(BinaryOperator::BitXor, ws(char('^'))),
    )
}

fn parse_bit_and(input: &str) -> ParserResult<Node> {
    binary_chain(
        input,
        parse_shift,
        value(BinaryOperator::BitAnd, ws(char('&'))),
    )
}

// シフト (<<, >>)
fn parse_shift(input: &str) -> ParserResult<Node> {
    binary_chain(
        input,
        parse_additive,
        alt((
            value(BinaryOperator::LShift, ws(tag("<<"))),
            value(BinaryOperator::RShift, ws(tag(">>"))),
        )),
    )
}

// 加減算 (+, -)
fn parse_additive(input: &str) -> ParserResult<Node> {
    binary_chain(
        input,
        parse_multiplicative,
        alt((
            value(BinaryOperator::Add, ws(char('+'))),
            value(BinaryOperator::Sub, ws(char('-'))),
        )),
    )
}

// 乗除算 (*, /, //, %, @)
fn parse_multiplicative(input: &str) -> ParserResult<Node> {
    binary_chain(
        input,
        parse_unary,
        alt((
            value(BinaryOperator::FloorDiv, ws(tag("//"))),
            value(BinaryOperator::Div, ws(char('/'))),
            value(BinaryOperator::Mult, ws(terminated(char('*'), not(char('*'))))),
            value(BinaryOperator::Mod, ws(char('%'))),
            value(BinaryOperator::MatMult, ws(char('@'))),
        )),
    )
}

/// Left-associative chain `operand (op operand)*`.
///
/// Once an operator has been consumed the right operand is mandatory, so
/// `2 +` fails instead of parsing `2` and leaving `+` behind.
fn binary_chain<'a, F, O>(input: &'a str, mut operand: F, operator: O) -> ParserResult<'a, Node>
where
    F: FnMut(&'a str) -> ParserResult<'a, Node>,
    O: FnMut(&'a str) -> ParserResult<'a, BinaryOperator>,
{
    let (input, first) = operand(input)?;
    let (input, rest) = many0(pair(
        operator,
        context("right operand", cut(|i: &'a str| operand(i))),
    ))(input)?;
    let result = rest
        .into_iter()
        .fold(first, |left, (op, right)| Node::binary(op, left, right));
    Ok((input, result))
}

fn unary_operator(input: &str) -> ParserResult<UnaryOperator> {
    ws(alt((
        value(UnaryOperator::UAdd, char('+')),
        value(UnaryOperator::USub, char('-')),
        value(UnaryOperator::Invert, char('~')),
    )))(input)
}

fn apply_unary(ops: Vec<UnaryOperator>, operand: Node) -> Node {
    ops.into_iter()
        .rev()
        .fold(operand, |acc, op| Node::unary(op, acc))
}

// 単項演算子 (+, -, ~)
fn parse_unary(input: &str) -> ParserResult<Node> {
    let (input, ops) = many0(unary_operator)(input)?;
    let (input, operand) = if ops.is_empty() {
        parse_power(input)?
    } else {
        context("unary operand", cut(parse_power))(input)?
    };
    Ok((input, apply_unary(ops, operand)))
}

// べき乗 (**) は右結合で、右辺に単項演算子を許す
// `2 ** -3 ** 2` is `2 ** (-(3 ** 2))`; the chain is collected and folded
// from the right instead of recursing per operator.
fn parse_power(input: &str) -> ParserResult<Node> {
    let (input, base) = parse_postfix(input)?;
    let (input, mut exponents) = many0(preceded(
        ws(tag("**")),
        context(
            "exponent",
            cut(pair(many0(unary_operator), parse_postfix)),
        ),
    ))(input)?;

    let Some(last) = exponents.pop() else {
        return Ok((input, base));
    };
    let (ops, exponent) = exponents.into_iter().rev().fold(
        last,
        |(exponent_ops, exponent), (ops, left)| {
            (
                ops,
                Node::binary(BinaryOperator::Pow, left, apply_unary(exponent_ops, exponent)),
            )
        },
    );
    Ok((
        input,
        Node::binary(BinaryOperator::Pow, base, apply_unary(ops, exponent)),
    ))
}

enum Trailer {
    Call(Vec<Node>, Vec<Keyword>),
    Attribute(String),
    Subscript(Node),
}

// 関数呼び出し・属性参照・添字
fn parse_postfix(input: &str) -> ParserResult<Node> {
    let (input, atom) = parse_atom(input)?;
    let (input, trailers) = many0(alt((
        parse_call,
        map(
            preceded(ws(char('.')), cut(ws(identifier))),
            |attr: &str| Trailer::Attribute(attr.to_string()),
        ),
        map(
            delimited(
                ws(char('[')),
                cut(parse_subscript),
                context("subscript", cut(ws(char(']')))),
            ),
            Trailer::Subscript,
        ),
    )))(input)?;

    let node = trailers
        .into_iter()
        .fold(atom, |acc, trailer| match trailer {
            Trailer::Call(arguments, keywords) => Node::Call {
                function: Box::new(acc),
                arguments,
                keywords,
            },
            Trailer::Attribute(attr) => Node::Attribute {
                value: Box::new(acc),
                attr,
            },
            Trailer::Subscript(index) => Node::Subscript {
                value: Box::new(acc),
                index: Box::new(index),
            },
        });
    Ok((input, node))
}

enum Argument {
    Positional(Node),
    Keyword(Keyword),
}

fn parse_call(input: &str) -> ParserResult<Trailer> {
    let (input, _) = ws(char('('))(input)?;
    let (input, mut arguments) = separated_list0(ws(char(',')), call_argument)(input)?;
    // f(x for x in y)
    let (input, clauses) = match arguments.as_slice() {
        [Argument::Positional(_)] => opt(comprehension_clauses)(input)?,
        _ => (input, None),
    };
    let (input, _) = opt(ws(char(',')))(input)?;
    let (input, _) = context("call", cut(ws(char(')'))))(input)?;

    if let Some(clauses) = clauses {
        if let Some(Argument::Positional(element)) = arguments.pop() {
            arguments.push(Argument::Positional(Node::comprehension(
                ComprehensionKind::Generator,
                element,
                None,
                clauses,
            )));
        }
    }
    let mut positional = Vec::new();
    let mut keywords = Vec::new();
    for argument in arguments {
        match argument {
            Argument::Positional(node) => positional.push(node),
            Argument::Keyword(keyword) => keywords.push(keyword),
        }
    }
    Ok((input, Trailer::Call(positional, keywords)))
}

fn call_argument(input: &str) -> ParserResult<Argument> {
    alt((
        map(preceded(ws(tag("**")), cut(parse_expression)), |value| {
            Argument::Keyword(Keyword { arg: None, value })
        }),
        map(starred, Argument::Positional),
        map(
            separated_pair(
                ws(parse_name),
                ws(terminated(char('='), not(char('=')))),
                cut(parse_expression),
            ),
            |(arg, value): (&str, Node)| {
                Argument::Keyword(Keyword {
                    arg: Some(arg.to_string()),
                    value,
                })
            },
        ),
        map(parse_named_expression, Argument::Positional),
    ))(input)
}

fn parse_subscript(input: &str) -> ParserResult<Node> {
    let (input, first) = slice_item(input)?;
    tuple_tail(input, first, slice_item)
}

/// An index or a `lower:upper:step` slice with every part optional.
fn slice_item(input: &str) -> ParserResult<Node> {
    let (input, lower) = opt(parse_named_expression)(input)?;
    let (input, colon) = opt(ws(char(':')))(input)?;
    if colon.is_none() {
        return match lower {
            Some(node) => Ok((input, node)),
            None => parse_named_expression(input),
        };
    }
    let (input, upper) = opt(parse_expression)(input)?;
    let (input, step) = opt(preceded(ws(char(':')), opt(parse_expression)))(input)?;
    Ok((
        input,
        Node::Slice {
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            step: step.flatten().map(Box::new),
        },
    ))
}

// 基本式
fn parse_atom(input: &str) -> ParserResult<Node> {
    context(
        "atom",
        ws(alt((
            // リテラル
            value(Node::Literal(Constant::Ellipsis), tag("...")),
            map(parse_number, Node::Literal),
            parse_string,
            // 括弧で囲まれた式・タプル・リスト・辞書・集合
            parse_parenthesized,
            parse_list,
            parse_braces,
            // 名前 (True/False/None を含む)
            map(parse_name, name_or_constant),
        ))),
    )(input)
}

fn parse_name(input: &str) -> ParserResult<&str> {
    verify(identifier, |id: &str| !RESERVED_KEYWORDS.contains(&id))(input)
}

fn name_or_constant(name: &str) -> Node {
    match name {
        "True" => Node::Literal(Constant::Bool(true)),
        "False" => Node::Literal(Constant::Bool(false)),
        "None" => Node::Literal(Constant::None),
        _ => Node::Name(name.to_string()),
    }
}

/// Element of a tuple, list or set display.
fn display_item(input: &str) -> ParserResult<Node> {
    alt((starred, parse_named_expression))(input)
}

fn display_tail(input: &str) -> ParserResult<Vec<Node>> {
    terminated(
        many0(preceded(ws(char(',')), display_item)),
        opt(ws(char(','))),
    )(input)
}

fn comprehension_clauses(input: &str) -> ParserResult<Vec<ComprehensionClause>> {
    many1(comprehension_clause)(input)
}

fn comprehension_clause(input: &str) -> ParserResult<ComprehensionClause> {
    let (input, _) = pair(opt(keyword("async")), keyword("for"))(input)?;
    let (input, mut targets) = context(
        "comprehension target",
        cut(separated_list1(ws(char(',')), alt((starred, parse_bit_or)))),
    )(input)?;
    let (input, _) = context("comprehension", cut(keyword("in")))(input)?;
    let (input, iter) = cut(parse_logical_or)(input)?;
    let (input, ifs) = many0(preceded(keyword("if"), cut(parse_logical_or)))(input)?;

    let target = if targets.len() == 1 {
        targets.remove(0)
    } else {
        Node::Tuple(targets)
    };
    Ok((input, ComprehensionClause { target, iter, ifs }))
}

fn parse_parenthesized(input: &str) -> ParserResult<Node> {
    let (input, _) = ws(char('('))(input)?;
    // `()` is the empty tuple
    let (input, close) = opt(ws(char(')')))(input)?;
    if close.is_some() {
        return Ok((input, Node::Tuple(vec![])));
    }
    let (input, first) = cut(display_item)(input)?;
    let (input, clauses) = opt(comprehension_clauses)(input)?;
    let (input, inner) = match clauses {
        Some(clauses) => (
            input,
            Node::comprehension(ComprehensionKind::Generator, first, None, clauses),
        ),
        None => tuple_tail(input, first, display_item)?,
    };
    let (input, _) = context("closing parenthesis", cut(ws(char(')'))))(input)?;
    Ok((input, inner))
}

fn parse_list(input: &str) -> ParserResult<Node> {
    let (input, _) = ws(char('['))(input)?;
    let (input, close) = opt(ws(char(']')))(input)?;
    if close.is_some() {
        return Ok((input, Node::List(vec![])));
    }
    let (input, first) = cut(display_item)(input)?;
    let (input, clauses) = opt(comprehension_clauses)(input)?;
    let (input, node) = match clauses {
        Some(clauses) => (
            input,
            Node::comprehension(ComprehensionKind::List, first, None, clauses),
        ),
        None => {
            let (input, rest) = display_tail(input)?;
            let mut items = vec![first];
            items.extend(rest);
            (input, Node::List(items))
        }
    };
    let (input, _) = context("closing bracket", cut(ws(char(']'))))(input)?;
    Ok((input, node))
}

enum BraceItem {
    Entry(Option<Node>, Node),
    Element(Node),
}

/// First item of a `{...}` display; decides between dict and set.
fn brace_item(input: &str) -> ParserResult<BraceItem> {
    let (input, unpacked) = opt(preceded(ws(tag("**")), cut(parse_bit_or)))(input)?;
    if let Some(value) = unpacked {
        return Ok((input, BraceItem::Entry(None, value)));
    }
    let (input, element) = opt(starred)(input)?;
    if let Some(element) = element {
        return Ok((input, BraceItem::Element(element)));
    }
    let (input, key) = parse_named_expression(input)?;
    let (input, value) = opt(preceded(ws(char(':')), cut(parse_expression)))(input)?;
    let item = match value {
        Some(value) => BraceItem::Entry(Some(key), value),
        None => BraceItem::Element(key),
    };
    Ok((input, item))
}

fn dict_entry(input: &str) -> ParserResult<(Option<Node>, Node)> {
    alt((
        map(preceded(ws(tag("**")), cut(parse_bit_or)), |value| {
            (None, value)
        }),
        map(
            separated_pair(parse_expression, ws(char(':')), cut(parse_expression)),
            |(key, value)| (Some(key), value),
        ),
    ))(input)
}

// 辞書・集合 ({k: v}, {a, b}, 内包表記)
fn parse_braces(input: &str) -> ParserResult<Node> {
    let (input, _) = ws(char('{'))(input)?;
    // `{}` is an empty dict
    let (input, close) = opt(ws(char('}')))(input)?;
    if close.is_some() {
        return Ok((
            input,
            Node::Dict {
                keys: vec![],
                values: vec![],
            },
        ));
    }
    let (input, first) = cut(brace_item)(input)?;
    let (input, clauses) = opt(comprehension_clauses)(input)?;
    let (input, node) = match (first, clauses) {
        (BraceItem::Entry(Some(key), value), Some(clauses)) => (
            input,
            Node::comprehension(ComprehensionKind::Dict, key, Some(value), clauses),
        ),
        (BraceItem::Element(element), Some(clauses)) => (
            input,
            Node::comprehension(ComprehensionKind::Set, element, None, clauses),
        ),
        (BraceItem::Entry(None, _), Some(_)) => {
            return Err(failure(input, "dict unpacking in comprehension"))
        }
        (BraceItem::Entry(key, value), None) => {
            let (input, rest) = terminated(
                many0(preceded(ws(char(',')), dict_entry)),
                opt(ws(char(','))),
            )(input)?;
            let (keys, values) = std::iter::once((key, value)).chain(rest).unzip();
            (input, Node::Dict { keys, values })
        }
        (BraceItem::Element(element), None) => {
            let (input, rest) = display_tail(input)?;
            let mut items = vec![element];
            items.extend(rest);
            (input, Node::Set(items))
        }
    };
    let (input, _) = context("closing brace", cut(ws(char('}'))))(input)?;
    Ok((input, node))
}

/// Numeric literal: decimal, hex/octal/binary integers, floats with optional
/// exponent, `_` separators, and an imaginary `j` suffix.
#[instrument(level = "debug", skip(input))]
pub fn parse_number(input: &str) -> ParserResult<Constant> {
    let (input, constant) = alt((parse_radix_int, parse_decimal))(input)?;
    // `1abc` or `1.2.3` is never a valid token sequence
    let (input, _) = not(peek(take_while1(|c: char| {
        c.is_alphanumeric() || c == '_' || c == '.'
    })))(input)?;
    Ok((input, constant))
}

fn parse_radix_int(input: &str) -> ParserResult<Constant> {
    let (input, _) = char('0')(input)?;
    let (input, radix) = alt((
        value(16u32, one_of("xX")),
        value(8u32, one_of("oO")),
        value(2u32, one_of("bB")),
    ))(input)?;
    let (input, text) = context(
        "integer literal",
        cut(recognize(pair(
            take_while1(move |c: char| c.is_digit(radix)),
            many0(pair(char('_'), take_while1(move |c: char| c.is_digit(radix)))),
        ))),
    )(input)?;

    let digits = text.replace('_', "");
    let constant = match i64::from_str_radix(&digits, radix) {
        Ok(i) => Constant::Int(i),
        // too wide for i64; promoted to float anyway at evaluation time
        Err(_) => Constant::Float(
            digits
                .chars()
                .filter_map(|c| c.to_digit(radix))
                .fold(0.0, |acc, d| acc * radix as f64 + d as f64),
        ),
    };
    Ok((input, constant))
}

fn digit_part(input: &str) -> ParserResult<&str> {
    recognize(pair(digit1, many0(pair(char('_'), digit1))))(input)
}

fn parse_decimal(input: &str) -> ParserResult<Constant> {
    let (input, text) = recognize(tuple((
        alt((
            recognize(pair(digit_part, opt(pair(char('.'), opt(digit_part))))),
            recognize(pair(char('.'), digit_part)),
        )),
        opt(tuple((
            one_of("eE"),
            opt(one_of("+-")),
            context("exponent", cut(digit_part)),
        ))),
    )))(input)?;
    let (input, imaginary) = opt(one_of("jJ"))(input)?;

    let cleaned = text.replace('_', "");
    let is_float = cleaned.contains(&['.', 'e', 'E'][..]);
    let constant = if imaginary.is_some() {
        Constant::Imaginary(
            cleaned
                .parse::<f64>()
                .map_err(|_| failure(text, "imaginary literal"))?,
        )
    } else if is_float {
        Constant::Float(
            cleaned
                .parse::<f64>()
                .map_err(|_| failure(text, "float literal"))?,
        )
    } else {
        // leading zeros in decimal integers are not permitted
        if cleaned.len() > 1 && cleaned.starts_with('0') && cleaned.bytes().any(|b| b != b'0') {
            return Err(failure(text, "integer literal"));
        }
        match cleaned.parse::<i64>() {
            Ok(i) => Constant::Int(i),
            Err(_) => Constant::Float(
                cleaned
                    .parse::<f64>()
                    .map_err(|_| failure(text, "integer literal"))?,
            ),
        }
    };
    Ok((input, constant))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    Text,
    Bytes,
    Formatted,
}

/// One or more adjacent string literals (`'a' "b"`), optionally prefixed
/// with `r`, `u`, `b` or `f`. Escapes are kept verbatim.
#[instrument(level = "debug", skip(input))]
fn parse_string(input: &str) -> ParserResult<Node> {
    let (rest, pieces) = many1(ws(string_piece))(input)?;

    let bytes = pieces
        .iter()
        .filter(|(kind, _)| *kind == StringKind::Bytes)
        .count();
    if bytes != 0 && bytes != pieces.len() {
        return Err(failure(input, "mixed bytes and str literals"));
    }
    let text: String = pieces.iter().map(|(_, body)| *body).collect();
    let node = if bytes > 0 {
        Node::Literal(Constant::Bytes(text))
    } else if pieces.iter().any(|(kind, _)| *kind == StringKind::Formatted) {
        Node::FormattedString(text)
    } else {
        Node::Literal(Constant::Str(text))
    };
    Ok((rest, node))
}

fn string_piece(input: &str) -> ParserResult<(StringKind, &str)> {
    let (input, prefix) = opt(alt((
        tag_no_case("rb"),
        tag_no_case("br"),
        tag_no_case("rf"),
        tag_no_case("fr"),
        tag_no_case("r"),
        tag_no_case("u"),
        tag_no_case("b"),
        tag_no_case("f"),
    )))(input)?;
    let (input, body) = alt((
        triple_quoted("\"\"\""),
        triple_quoted("'''"),
        quoted('"'),
        quoted('\''),
    ))(input)?;

    let prefix = prefix.unwrap_or_default().to_ascii_lowercase();
    let kind = if prefix.contains('b') {
        StringKind::Bytes
    } else if prefix.contains('f') {
        StringKind::Formatted
    } else {
        StringKind::Text
    };
    Ok((input, (kind, body)))
}

fn quoted<'a>(q: char) -> impl FnMut(&'a str) -> ParserResult<'a, &'a str> {
    delimited(
        char(q),
        recognize(many0(alt((
            recognize(pair(char('\\'), take(1usize))),
            take_while1(move |c: char| c != q && c != '\\' && c != '\n'),
        )))),
        context("string literal", cut(char(q))),
    )
}

fn triple_quoted<'a>(delimiter: &'static str) -> impl FnMut(&'a str) -> ParserResult<'a, &'a str> {
    delimited(
        tag(delimiter),
        recognize(many0(alt((
            recognize(pair(char('\\'), take(1usize))),
            recognize(pair(not(tag(delimiter)), take(1usize))),
        )))),
        context("string literal", cut(tag(delimiter))),
    )
}

#[instrument(level = "debug", skip(input))]
fn identifier(input: &str) -> ParserResult<&str> {
    let id_chars = |c: char| c.is_alphanumeric() || c == '_';
    let start_chars = |c: char| c.is_alphabetic() || c == '_';

    recognize(pair(take_while1(start_chars), take_while(id_chars)))(input)
}

/// Keyword that is not the prefix of a longer identifier (`or` but not `order`).
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParserResult<'a, &'a str> {
    ws(terminated(
        tag(word),
        not(peek(take_while1(|c: char| c.is_alphanumeric() || c == '_'))),
    ))
}

/// Blanks between tokens: whitespace, `\` line continuations and comments.
/// Line breaks outside brackets never get this far, see [`scan`].
fn blank(input: &str) -> ParserResult<&str> {
    recognize(many0(alt((
        multispace1,
        tag("\\\n"),
        tag("\\\r\n"),
        recognize(pair(char('#'), take_till(|c: char| c == '\n'))),
    ))))(input)
}

/// 空白文字のスキップ
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> ParserResult<'a, O>
where
    F: FnMut(&'a str) -> ParserResult<'a, O>,
{
    delimited(blank, inner, blank)
}

/// Bracket and line structure of a source text. String literals and comments
/// are skipped.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Layout {
    pub max_depth: usize,
    /// Byte offset of the first line break outside any bracket.
    pub line_break: Option<usize>,
}

pub(crate) fn scan(input: &str) -> Layout {
    let bytes = input.as_bytes();
    let mut layout = Layout::default();
    let mut depth = 0usize;
    let mut i = 0;

    // multi-byte UTF-8 sequences never contain ASCII bytes
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'#' => {
                while i + 1 < bytes.len() && bytes[i + 1] != b'\n' {
                    i += 1;
                }
            }
            // line continuation
            b'\\' if bytes[i + 1..].starts_with(b"\r\n") => i += 2,
            b'\\' => i += 1,
            b'(' | b'[' | b'{' => {
                depth += 1;
                layout.max_depth = layout.max_depth.max(depth);
            }
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'\n' | b'\r' if depth == 0 && layout.line_break.is_none() => {
                layout.line_break = Some(i)
            }
            _ => {}
        }
        i += 1;
    }
    layout
}

/// Index of the last byte of the string literal opening at `start`.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let q = bytes[start];
    let delimiter = [q, q, q];
    let width = if bytes[start..].starts_with(&delimiter) { 3 } else { 1 };
    let mut i = start + width;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
        } else if bytes[i..].starts_with(&delimiter[..width]) {
            return i + width - 1;
        } else {
            i += 1;
        }
    }
    bytes.len()
}

/// Deepest nesting of `(`, `[` and `{` in `input`, ignoring string literals.
pub(crate) fn nesting_depth(input: &str) -> usize {
    scan(input).max_depth
}
