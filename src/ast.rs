//! # Expression Syntax Tree
//!
//! [`Node`] is the tree produced by [`crate::parser::parse`]. Only three of its
//! variants can be evaluated:
//!
//! * [`Node::Literal`] holding an integer or float [`Constant`]
//! * [`Node::UnaryOp`] with an allow-listed [`UnaryOperator`]
//! * [`Node::BinaryOp`] with an allow-listed [`BinaryOperator`]
//!
//! The remaining variants describe shapes the parser understands but the
//! evaluator refuses (names, calls, comparisons and so on). Keeping them in the
//! tree lets a caller tell "this is not an expression at all" apart from
//! "this is an expression we will not run".

use core::fmt;

use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Constant),
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Node>,
    },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    // Recognised but never evaluated.
    Name(String),
    Call {
        function: Box<Node>,
        arguments: Vec<Node>,
        keywords: Vec<Keyword>,
    },
    Attribute {
        value: Box<Node>,
        attr: String,
    },
    Subscript {
        value: Box<Node>,
        index: Box<Node>,
    },
    /// `lower:upper:step` inside a subscript.
    Slice {
        lower: Option<Box<Node>>,
        upper: Option<Box<Node>>,
        step: Option<Box<Node>>,
    },
    Compare {
        left: Box<Node>,
        ops: Vec<CompareOperator>,
        comparators: Vec<Node>,
    },
    BoolOp {
        op: BoolOperator,
        values: Vec<Node>,
    },
    IfExp {
        test: Box<Node>,
        body: Box<Node>,
        orelse: Box<Node>,
    },
    Lambda {
        params: Vec<String>,
        defaults: Vec<Node>,
        body: Box<Node>,
    },
    /// `name := value`
    NamedExpr {
        target: String,
        value: Box<Node>,
    },
    Starred(Box<Node>),
    /// f-string body, kept as written.
    FormattedString(String),
    Tuple(Vec<Node>),
    List(Vec<Node>),
    Set(Vec<Node>),
    /// `None` keys are `**mapping` unpackings.
    Dict {
        keys: Vec<Option<Node>>,
        values: Vec<Node>,
    },
    Comprehension {
        kind: ComprehensionKind,
        element: Box<Node>,
        // only dict comprehensions carry a value
        value: Option<Box<Node>>,
        clauses: Vec<ComprehensionClause>,
    },
}

/// `name=value` or `**value` in a call.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub arg: Option<String>,
    pub value: Node,
}

/// One `for target in iter if ...` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ComprehensionClause {
    pub target: Node,
    pub iter: Node,
    pub ifs: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ComprehensionKind {
    #[strum(serialize = "list comprehension")]
    List,
    #[strum(serialize = "set comprehension")]
    Set,
    #[strum(serialize = "dict comprehension")]
    Dict,
    #[strum(serialize = "generator expression")]
    Generator,
}

impl Node {
    pub fn unary(op: UnaryOperator, operand: Node) -> Self {
        Node::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOperator, left: Node, right: Node) -> Self {
        Node::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn comprehension(
        kind: ComprehensionKind,
        element: Node,
        value: Option<Node>,
        clauses: Vec<ComprehensionClause>,
    ) -> Self {
        Node::Comprehension {
            kind,
            element: Box::new(element),
            value: value.map(Box::new),
            clauses,
        }
    }

    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Literal(_) | Node::Name(_) | Node::FormattedString(_) => vec![],
            Node::UnaryOp { operand, .. } => vec![operand.as_ref()],
            Node::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Node::Call {
                function,
                arguments,
                keywords,
            } => std::iter::once(function.as_ref())
                .chain(arguments.iter())
                .chain(keywords.iter().map(|keyword| &keyword.value))
                .collect(),
            Node::Attribute { value, .. } => vec![value.as_ref()],
            Node::Subscript { value, index } => vec![value.as_ref(), index.as_ref()],
            Node::Slice { lower, upper, step } => [lower, upper, step]
                .into_iter()
                .flatten()
                .map(|bound| bound.as_ref())
                .collect(),
            Node::Compare {
                left, comparators, ..
            } => std::iter::once(left.as_ref())
                .chain(comparators.iter())
                .collect(),
            Node::BoolOp { values, .. }
            | Node::Tuple(values)
            | Node::List(values)
            | Node::Set(values) => values.iter().collect(),
            Node::IfExp { test, body, orelse } => vec![body.as_ref(), test.as_ref(), orelse.as_ref()],
            Node::Lambda { defaults, body, .. } => {
                defaults.iter().chain(std::iter::once(body.as_ref())).collect()
            }
            Node::NamedExpr { value, .. } | Node::Starred(value) => vec![value.as_ref()],
            Node::Dict { keys, values } => keys.iter().flatten().chain(values.iter()).collect(),
            Node::Comprehension {
                element,
                value,
                clauses,
                ..
            } => {
                let mut nodes = vec![element.as_ref()];
                nodes.extend(value.as_deref());
                for clause in clauses {
                    nodes.push(&clause.target);
                    nodes.push(&clause.iter);
                    nodes.extend(clause.ifs.iter());
                }
                nodes
            }
        }
    }

    /// Height of the tree; a lone literal has depth 1. Walks with an explicit
    /// stack so arbitrarily deep trees can be measured.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            stack.extend(node.children().into_iter().map(|child| (child, depth + 1)));
        }
        max_depth
    }

    /// Short name of the node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Literal(_) => "literal",
            Node::UnaryOp { .. } => "unary operation",
            Node::BinaryOp { .. } => "binary operation",
            Node::Name(_) => "name",
            Node::Call { .. } => "call",
            Node::Attribute { .. } => "attribute access",
            Node::Subscript { .. } => "subscript",
            Node::Slice { .. } => "slice",
            Node::Compare { .. } => "comparison",
            Node::BoolOp { .. } => "boolean operation",
            Node::IfExp { .. } => "conditional expression",
            Node::Lambda { .. } => "lambda",
            Node::NamedExpr { .. } => "assignment expression",
            Node::Starred(_) => "starred expression",
            Node::FormattedString(_) => "f-string",
            Node::Tuple(_) => "tuple",
            Node::List(_) => "list",
            Node::Set(_) => "set",
            Node::Dict { .. } => "dict",
            Node::Comprehension { kind, .. } => (*kind).into(),
        }
    }
}

// リテラル値
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(String),
    Bool(bool),
    None,
    Ellipsis,
    Imaginary(f64),
}

impl Constant {
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::Int(_) => "int",
            Constant::Float(_) => "float",
            Constant::Str(_) => "str",
            Constant::Bytes(_) => "bytes",
            Constant::Bool(_) => "bool",
            Constant::None => "NoneType",
            Constant::Ellipsis => "ellipsis",
            Constant::Imaginary(_) => "complex",
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Float(x) => write!(f, "{:?}", x),
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::Bytes(s) => write!(f, "b{:?}", s),
            Constant::Bool(true) => write!(f, "True"),
            Constant::Bool(false) => write!(f, "False"),
            Constant::None => write!(f, "None"),
            Constant::Ellipsis => write!(f, "Ellipsis"),
            Constant::Imaginary(x) => write!(f, "{:?}j", x),
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
pub enum UnaryOperator {
    #[strum(serialize = "+")]
    UAdd,
    #[strum(serialize = "-")]
    USub,
    #[strum(serialize = "~")]
    Invert,
    #[strum(serialize = "not")]
    Not,
}

/// Infix arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mult,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "**")]
    Pow,
    #[strum(serialize = "//")]
    FloorDiv,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "@")]
    MatMult,
    #[strum(serialize = "<<")]
    LShift,
    #[strum(serialize = ">>")]
    RShift,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "^")]
    BitXor,
    #[strum(serialize = "&")]
    BitAnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
pub enum CompareOperator {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    LtE,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    GtE,
    #[strum(serialize = "is")]
    Is,
    #[strum(serialize = "is not")]
    IsNot,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "not in")]
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
pub enum BoolOperator {
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
}
