use std::fmt;

use rust_decimal::Decimal;

use crate::ast::{BinOp, UnaryOp};
use crate::span::Span;

/// Expression tree node.
///
/// Every node owns its children and carries the byte range it was parsed
/// from. Trees are built fresh for each query and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 'text'
    /// null
    /// ```
    Literal(Literal),

    /// Bare name, resolved against the scope
    ///
    /// # Example
    /// ```text
    /// initiator
    /// ```
    Identifier(String),

    /// Property access with `.`
    ///
    /// `name` is `None` when the input stops right after the dot (`a.`).
    /// `name_span` is then the empty span right after the dot, so completion
    /// can still anchor on it.
    ///
    /// # Examples
    /// ```text
    /// initiator.username
    /// a.
    /// ```
    Property {
        target: Box<Expr>,
        name: Option<String>,
        name_span: Span,
    },

    /// Index access with `[...]`
    ///
    /// # Example
    /// ```text
    /// items[0]
    /// ```
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },

    /// Function or method call. A method call is a `Call` whose target is a
    /// `Property`.
    ///
    /// # Examples
    /// ```text
    /// uuid()
    /// context.eval('${x}')
    /// ```
    Call {
        target: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Binary operation
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Prefix operation
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// `condition ? then : otherwise`
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },

    /// List literal
    ///
    /// # Example
    /// ```text
    /// [1, 2, 3]
    /// ```
    List(Vec<Expr>),

    /// Set literal
    ///
    /// # Example
    /// ```text
    /// {1, 2}
    /// ```
    Set(Vec<Expr>),

    /// Map literal
    ///
    /// # Example
    /// ```text
    /// {'a': 1, 'b': 2}
    /// ```
    Map(Vec<(Expr, Expr)>),

    /// Lambda expression
    ///
    /// # Examples
    /// ```text
    /// x -> x + 1
    /// (x, y) -> x + y
    /// ```
    Lambda { params: Vec<Param>, body: Box<Expr> },

    /// Placeholder for input that could not be parsed. A diagnostic covering
    /// the same range is always reported alongside it.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Boolean(bool),
    Null,
}

/// Lambda parameter name with its declaration range.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    pub fn error(span: Span) -> Self {
        Expr {
            kind: ExprKind::Error,
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error)
    }

    /// Direct children, left to right in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::Error => vec![],
            ExprKind::Property { target, .. } => vec![target.as_ref()],
            ExprKind::Index { target, index } => vec![target.as_ref(), index.as_ref()],
            ExprKind::Call { target, args } => {
                let mut children = vec![target.as_ref()];
                children.extend(args);
                children
            }
            ExprKind::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprKind::UnaryOp { operand, .. } => vec![operand.as_ref()],
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => vec![condition.as_ref(), then.as_ref(), otherwise.as_ref()],
            ExprKind::List(items) | ExprKind::Set(items) => items.iter().collect(),
            ExprKind::Map(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            ExprKind::Lambda { body, .. } => vec![body.as_ref()],
        }
    }

    /// Source ranges of every leaf: literals, identifiers, error placeholders,
    /// property names and lambda parameters.
    pub fn leaf_spans(&self) -> Vec<Span> {
        let mut spans = Vec::new();
        self.collect_leaf_spans(&mut spans);
        spans
    }

    fn collect_leaf_spans(&self, spans: &mut Vec<Span>) {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::Error => spans.push(self.span),
            ExprKind::Property {
                target, name_span, ..
            } => {
                target.collect_leaf_spans(spans);
                spans.push(*name_span);
            }
            ExprKind::Lambda { params, body } => {
                spans.extend(params.iter().map(|p| p.span));
                body.collect_leaf_spans(spans);
            }
            _ => {
                for child in self.children() {
                    child.collect_leaf_spans(spans);
                }
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Decimal(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}

/// Renders the tree as an s-expression, e.g. `(+ 1 (* 2 3))`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{}", lit),
            ExprKind::Identifier(name) => f.write_str(name),
            ExprKind::Property { target, name, .. } => match name {
                Some(name) => write!(f, "(. {} {})", target, name),
                None => write!(f, "(. {} <missing>)", target),
            },
            ExprKind::Index { target, index } => write!(f, "([] {} {})", target, index),
            ExprKind::Call { target, args } => {
                write!(f, "(call {}", target)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                f.write_str(")")
            }
            ExprKind::BinaryOp { op, left, right } => write!(f, "({} {} {})", op, left, right),
            ExprKind::UnaryOp { op, operand } => write!(f, "({} {})", op, operand),
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => write!(f, "(? {} {} {})", condition, then, otherwise),
            ExprKind::List(items) => write_seq(f, "list", items),
            ExprKind::Set(items) => write_seq(f, "set", items),
            ExprKind::Map(entries) => {
                f.write_str("(map")?;
                for (key, value) in entries {
                    write!(f, " ({} {})", key, value)?;
                }
                f.write_str(")")
            }
            ExprKind::Lambda { params, body } => {
                f.write_str("(-> (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(&param.name)?;
                }
                write!(f, ") {})", body)
            }
            ExprKind::Error => f.write_str("<error>"),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, tag: &str, items: &[Expr]) -> fmt::Result {
    write!(f, "({}", tag)?;
    for item in items {
        write!(f, " {}", item)?;
    }
    f.write_str(")")
}
