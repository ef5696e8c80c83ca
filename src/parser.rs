use std::mem;

use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, ExprKind, Literal, Param, Token, TokenKind, UnaryOp},
    lexer::{LexError, Lexer},
    span::Span,
};

/// Syntax problems. Parsing always continues past them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },

    #[error("expected property name after '.'")]
    MissingPropertyName,

    #[error("missing closing '{0}'")]
    Unclosed(char),

    #[error("assignment is not supported in expressions")]
    Assignment,

    #[error("empty expression")]
    EmptyExpression,

    #[error("expression is nested too deeply")]
    TooDeeplyNested,

    #[error(transparent)]
    Lex(#[from] LexError),
}

/// A recorded parse or lex problem with the range it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDiagnostic {
    pub span: Span,
    pub error: ParseError,
}

impl ParseDiagnostic {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl From<LexError> for ParseDiagnostic {
    fn from(error: LexError) -> Self {
        ParseDiagnostic {
            span: error.span(),
            error: ParseError::Lex(error),
        }
    }
}

/// Best-effort tree plus everything that went wrong building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub root: Expr,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl Parsed {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Parses an already tokenized expression.
pub fn parse(tokens: Vec<Token>) -> (Expr, Vec<ParseDiagnostic>) {
    let mut parser = Parser::new(tokens);
    let root = parser.parse();
    (root, parser.diagnostics)
}

/// Lexes and parses `source`, whose first byte sits at `start_offset` in the
/// owning document. Lex errors are reported as diagnostics too.
pub fn parse_expression(source: &str, start_offset: usize) -> Parsed {
    parse_with(Lexer::with_offset(source, start_offset), |span| span)
}

/// Like [`parse_expression`], for source whose bytes are not contiguous in
/// the document (an expression inside a quoted YAML scalar with escapes).
/// `offsets[i]` is the document offset of byte `i`; one extra entry holds
/// the end.
pub fn parse_mapped(source: &str, offsets: &[usize]) -> Parsed {
    let at = |i: usize| offsets.get(i).or(offsets.last()).copied().unwrap_or(i);
    parse_with(Lexer::new(source), |span| Span::new(at(span.start), at(span.end)))
}

fn parse_with(mut lexer: Lexer<'_>, to_document: impl Fn(Span) -> Span) -> Parsed {
    let tokens = lexer
        .tokenize()
        .into_iter()
        .map(|mut token| {
            token.span = to_document(token.span);
            token
        })
        .collect();
    let (root, parse_diagnostics) = parse(tokens);

    let mut diagnostics: Vec<ParseDiagnostic> = lexer
        .into_errors()
        .into_iter()
        .map(|mut error| {
            let span = to_document(error.span());
            *error.span_mut() = span;
            error.into()
        })
        .collect();
    diagnostics.extend(parse_diagnostics);
    diagnostics.sort_by_key(|d| d.span.start);

    Parsed { root, diagnostics }
}

/// Limit on nested expressions, unary operators and operator chains, so the
/// tree stays shallow enough to walk recursively.
pub const MAX_DEPTH: usize = 128;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    last_end: usize,
    depth: usize,
    // Set once nesting ran out of budget and the rest of the input was skipped
    truncated: bool,
    diagnostics: Vec<ParseDiagnostic>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token::new(TokenKind::Eof, "", Span::empty(end)));
        }
        let last_end = tokens[0].span.start;
        Parser {
            tokens,
            position: 0,
            last_end,
            depth: 0,
            truncated: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let idx = (self.position + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !token.is_eof() {
            self.position += 1;
            self.last_end = token.span.end;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        mem::discriminant(&self.current().kind) == mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn report(&mut self, span: Span, error: ParseError) {
        if !self.truncated {
            self.diagnostics.push(ParseDiagnostic { span, error });
        }
    }

    /// Takes one level of nesting budget. False when none is left.
    fn descend(&mut self) -> bool {
        if self.depth >= MAX_DEPTH {
            return false;
        }
        self.depth += 1;
        true
    }

    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Expr) -> Expr {
        if !self.descend() {
            return self.too_deep();
        }
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    /// Reports the nesting limit and skips to the closing delimiter that
    /// matches the enclosing construct, or to the end of input.
    fn too_deep(&mut self) -> Expr {
        let start = self.current().span.start;
        self.report(self.current().span, ParseError::TooDeeplyNested);

        let mut balance = 0usize;
        loop {
            match self.current().kind {
                TokenKind::Eof => {
                    self.truncated = true;
                    break;
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => balance += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if balance == 0 {
                        break;
                    }
                    balance -= 1;
                }
                _ => {}
            }
            self.advance();
        }
        Expr::error(Span::new(start, self.last_end.max(start)))
    }

    fn unexpected(&mut self, expected: &'static str) {
        let token = self.current();
        let (span, found) = (token.span, token.kind.describe());
        self.report(span, ParseError::UnexpectedToken { expected, found });
    }

    /// Consumes the closing delimiter, or reports it missing. Returns the end
    /// offset of the construct either way.
    fn expect_closing(&mut self, kind: TokenKind, ch: char) -> usize {
        match self.eat(&kind) {
            Some(token) => token.span.end,
            None => {
                let at = Span::empty(self.current().span.start);
                self.report(at, ParseError::Unclosed(ch));
                self.last_end
            }
        }
    }

    /// Parse a complete expression; trailing input is reported and skipped.
    pub fn parse(&mut self) -> Expr {
        if self.current().is_eof() {
            let at = Span::empty(self.current().span.start);
            self.report(at, ParseError::EmptyExpression);
            return Expr::error(at);
        }

        let expr = self.parse_expression();

        if !self.current().is_eof() {
            match self.current().kind {
                TokenKind::Assign => {
                    let span = self.current().span;
                    self.report(span, ParseError::Assignment);
                }
                // Already reported by the lexer
                TokenKind::Invalid => {}
                _ => self.unexpected("end of expression"),
            }
            while !self.current().is_eof() {
                self.advance();
            }
        }
        expr
    }

    pub fn parse_expression(&mut self) -> Expr {
        self.nested(|parser| {
            if parser.lambda_ahead() {
                parser.parse_lambda()
            } else {
                parser.parse_ternary()
            }
        })
    }

    /// `x ->`, `() ->` or `(x, y) ->`
    fn lambda_ahead(&self) -> bool {
        match self.peek_kind(0) {
            TokenKind::Identifier(_) => matches!(self.peek_kind(1), TokenKind::Arrow),
            TokenKind::LParen => {
                let mut i = 1;
                if !matches!(self.peek_kind(i), TokenKind::RParen) {
                    loop {
                        if !matches!(self.peek_kind(i), TokenKind::Identifier(_)) {
                            return false;
                        }
                        i += 1;
                        if matches!(self.peek_kind(i), TokenKind::Comma) {
                            i += 1;
                        } else {
                            break;
                        }
                    }
                    if !matches!(self.peek_kind(i), TokenKind::RParen) {
                        return false;
                    }
                }
                matches!(self.peek_kind(i + 1), TokenKind::Arrow)
            }
            _ => false,
        }
    }

    fn parse_lambda(&mut self) -> Expr {
        let start = self.current().span.start;
        let mut params = Vec::new();

        if self.eat(&TokenKind::LParen).is_some() {
            while let TokenKind::Identifier(name) = &self.current().kind {
                let name = name.clone();
                let token = self.advance();
                params.push(Param {
                    name,
                    span: token.span,
                });
                if self.eat(&TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect_closing(TokenKind::RParen, ')');
        } else if let TokenKind::Identifier(name) = &self.current().kind {
            let name = name.clone();
            let token = self.advance();
            params.push(Param {
                name,
                span: token.span,
            });
        }

        self.advance(); // Consume '->'
        let body = self.parse_expression();
        let span = Span::new(start, body.span.end);

        Expr::new(
            ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            span,
        )
    }

    fn parse_ternary(&mut self) -> Expr {
        let condition = self.parse_or();

        if self.eat(&TokenKind::Question).is_none() {
            return condition;
        }

        let then = self.parse_expression();
        let otherwise = if self.eat(&TokenKind::Colon).is_some() {
            // Right-associative: the else branch is a full expression
            self.parse_expression()
        } else {
            self.unexpected("':'");
            Expr::error(Span::empty(self.current().span.start))
        };

        let span = Span::new(condition.span.start, otherwise.span.end.max(then.span.end));
        Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        )
    }

    /// One left-associative level: `next (op next)*`. Every operator in the
    /// chain deepens the tree, so each one takes nesting budget.
    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Expr,
        operator: fn(&TokenKind) -> Option<BinOp>,
    ) -> Expr {
        let base = self.depth;
        let mut left = next(self);

        while let Some(op) = operator(&self.current().kind) {
            self.advance();
            let right = if self.descend() {
                next(self)
            } else {
                self.too_deep()
            };
            left = binary(op, left, right);
        }
        self.depth = base;
        left
    }

    fn parse_or(&mut self) -> Expr {
        self.binary_level(Self::parse_and, |kind| match kind {
            TokenKind::Or => Some(BinOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Expr {
        self.binary_level(Self::parse_equality, |kind| match kind {
            TokenKind::And => Some(BinOp::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Expr {
        self.binary_level(Self::parse_relational, |kind| match kind {
            TokenKind::EqEq => Some(BinOp::Equal),
            TokenKind::NotEq => Some(BinOp::NotEqual),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Expr {
        self.binary_level(Self::parse_concat, |kind| match kind {
            TokenKind::Lt => Some(BinOp::LessThan),
            TokenKind::Gt => Some(BinOp::GreaterThan),
            TokenKind::LtEq => Some(BinOp::LessEqual),
            TokenKind::GtEq => Some(BinOp::GreaterEqual),
            TokenKind::Instanceof => Some(BinOp::Instanceof),
            _ => None,
        })
    }

    fn parse_concat(&mut self) -> Expr {
        self.binary_level(Self::parse_additive, |kind| match kind {
            TokenKind::PlusEqual => Some(BinOp::Concat),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Expr {
        self.binary_level(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Expr {
        self.binary_level(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinOp::Multiply),
            TokenKind::Slash => Some(BinOp::Divide),
            TokenKind::Percent => Some(BinOp::Modulo),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Expr {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Empty => UnaryOp::Empty,
            _ => return self.parse_access(),
        };

        let op_token = self.advance();
        let operand = self.nested(Self::parse_unary); // Right-associative
        let span = Span::new(op_token.span.start, operand.span.end);
        Expr::new(
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    /// Parse postfix chains: `.name`, `[index]` and `(args)`, left to right
    fn parse_access(&mut self) -> Expr {
        let base = self.depth;
        let mut expr = self.parse_primary();

        loop {
            let postfix = matches!(
                self.current().kind,
                TokenKind::Dot | TokenKind::LBracket | TokenKind::LParen
            );
            if postfix && !self.descend() {
                self.too_deep();
                break;
            }
            match self.current().kind {
                TokenKind::Dot => {
                    let dot = self.advance();
                    let start = expr.span.start;

                    expr = match self.current().member_name().map(str::to_string) {
                        Some(name) => {
                            let name_token = self.advance();
                            Expr::new(
                                ExprKind::Property {
                                    target: Box::new(expr),
                                    name: Some(name),
                                    name_span: name_token.span,
                                },
                                Span::new(start, name_token.span.end),
                            )
                        }
                        None => {
                            self.report(dot.span, ParseError::MissingPropertyName);
                            Expr::new(
                                ExprKind::Property {
                                    target: Box::new(expr),
                                    name: None,
                                    name_span: Span::empty(dot.span.end),
                                },
                                Span::new(start, dot.span.end),
                            )
                        }
                    };
                }
                TokenKind::LBracket => {
                    self.advance(); // Consume '['
                    let index = self.parse_expression();
                    let end = self.expect_closing(TokenKind::RBracket, ']');
                    let span = Span::new(expr.span.start, end);

                    expr = Expr::new(
                        ExprKind::Index {
                            target: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    self.advance(); // Consume '('
                    let args = self.parse_comma_separated(&TokenKind::RParen);
                    let end = self.expect_closing(TokenKind::RParen, ')');
                    let span = Span::new(expr.span.start, end);

                    expr = Expr::new(
                        ExprKind::Call {
                            target: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        self.depth = base;
        expr
    }

    fn parse_comma_separated(&mut self, closing: &TokenKind) -> Vec<Expr> {
        let mut items = Vec::new();
        if self.check(closing) {
            return items;
        }
        loop {
            items.push(self.parse_expression());
            if self.eat(&TokenKind::Comma).is_none() {
                break;
            }
        }
        items
    }

    /// Parse primary expressions: literals, identifiers, parentheses and
    /// collection literals
    fn parse_primary(&mut self) -> Expr {
        let token = self.current().clone();

        let kind = match token.kind {
            TokenKind::Integer(n) => ExprKind::Literal(Literal::Integer(n)),
            TokenKind::Decimal(n) => ExprKind::Literal(Literal::Decimal(n)),
            TokenKind::String(s) => ExprKind::Literal(Literal::String(s)),
            TokenKind::Boolean(b) => ExprKind::Literal(Literal::Boolean(b)),
            TokenKind::Null => ExprKind::Literal(Literal::Null),
            TokenKind::Identifier(name) => ExprKind::Identifier(name),

            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression();
                self.expect_closing(TokenKind::RParen, ')');
                return expr;
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.parse_comma_separated(&TokenKind::RBracket);
                let end = self.expect_closing(TokenKind::RBracket, ']');
                return Expr::new(ExprKind::List(items), Span::new(token.span.start, end));
            }
            TokenKind::LBrace => {
                self.advance();
                return self.parse_brace_literal(token.span.start);
            }

            // Already reported by the lexer
            TokenKind::Invalid => {
                self.advance();
                return Expr::error(token.span);
            }

            // Nothing to consume: leave the delimiter to whoever owns it
            TokenKind::Eof
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
            | TokenKind::Comma
            | TokenKind::Colon => {
                self.unexpected("expression");
                return Expr::error(Span::empty(token.span.start));
            }

            _ => {
                self.unexpected("expression");
                self.advance();
                return Expr::error(token.span);
            }
        };

        self.advance();
        Expr::new(kind, token.span)
    }

    /// Map `{k: v, ...}` or set `{a, b}` literal, after the opening brace
    fn parse_brace_literal(&mut self, start: usize) -> Expr {
        if let Some(close) = self.eat(&TokenKind::RBrace) {
            return Expr::new(ExprKind::Map(vec![]), Span::new(start, close.span.end));
        }

        let first = self.parse_expression();

        if self.eat(&TokenKind::Colon).is_none() {
            let mut items = vec![first];
            while self.eat(&TokenKind::Comma).is_some() {
                items.push(self.parse_expression());
            }
            let end = self.expect_closing(TokenKind::RBrace, '}');
            return Expr::new(ExprKind::Set(items), Span::new(start, end));
        }

        let mut entries = vec![(first, self.parse_expression())];
        while self.eat(&TokenKind::Comma).is_some() {
            let key = self.parse_expression();
            let value = if self.eat(&TokenKind::Colon).is_some() {
                self.parse_expression()
            } else {
                self.unexpected("':'");
                Expr::error(Span::empty(self.current().span.start))
            };
            entries.push((key, value));
        }
        let end = self.expect_closing(TokenKind::RBrace, '}');
        Expr::new(ExprKind::Map(entries), Span::new(start, end))
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.to(right.span);
    Expr::new(
        ExprKind::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}
