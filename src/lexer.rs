use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::ast::{Token, TokenKind};
use crate::span::Span;

/// Problems found while scanning. None of them stop the lexer: the offending
/// input becomes an [`TokenKind::Invalid`] token (or a best-effort literal)
/// and scanning resumes right after it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, span: Span },

    #[error("unterminated string literal")]
    UnterminatedString { span: Span },

    #[error("invalid escape sequence '\\{ch}'")]
    InvalidEscape { ch: char, span: Span },

    #[error("invalid number literal '{text}'")]
    InvalidNumber { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::InvalidEscape { span, .. }
            | LexError::InvalidNumber { span, .. } => *span,
        }
    }

    pub(crate) fn span_mut(&mut self) -> &mut Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::InvalidEscape { span, .. }
            | LexError::InvalidNumber { span, .. } => span,
        }
    }
}

/// Tokenizes `source`, whose first byte sits at `start_offset` in the owning
/// document. The result always ends with an [`TokenKind::Eof`] token.
pub fn tokenize(source: &str, start_offset: usize) -> Vec<Token> {
    Lexer::with_offset(source, start_offset).tokenize()
}

pub struct Lexer<'a> {
    source: &'a str,
    input: Vec<(usize, char)>,
    position: usize,
    base: usize,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_offset(source, 0)
    }

    pub fn with_offset(source: &'a str, base: usize) -> Self {
        Lexer {
            source,
            input: source.char_indices().collect(),
            position: 0,
            base,
            errors: Vec::new(),
        }
    }

    /// Errors recorded so far.
    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<LexError> {
        self.errors
    }

    /// Scans the remaining input, `Eof` included.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).map(|&(_, c)| c)
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).map(|&(_, c)| c)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Byte offset (relative to `source`) of the current character.
    fn byte_pos(&self) -> usize {
        self.input
            .get(self.position)
            .map(|&(i, _)| i)
            .unwrap_or(self.source.len())
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.base + start, self.base + self.byte_pos())
    }

    fn make(&self, kind: TokenKind, start: usize) -> Token {
        let end = self.byte_pos();
        Token::new(kind, &self.source[start..end], self.span_from(start))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn is_identifier_start(ch: char) -> bool {
        ch.is_alphabetic() || ch == '_' || ch == '$'
    }

    fn is_identifier_part(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_' || ch == '$'
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if Self::is_identifier_part(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> TokenKind {
        let start = self.byte_pos();
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return TokenKind::String(result);
                }
                '\\' => {
                    let escape_start = self.byte_pos();
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(c @ ('"' | '\'' | '\\' | '$' | '#' | '{' | '}')) => result.push(c),
                        Some(other) => {
                            self.advance();
                            self.errors.push(LexError::InvalidEscape {
                                ch: other,
                                span: self.span_from(escape_start),
                            });
                            result.push('\\');
                            result.push(other);
                            continue;
                        }
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        self.errors.push(LexError::UnterminatedString {
            span: self.span_from(start),
        });
        TokenKind::String(result)
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.current_char().filter(|c| c.is_ascii_digit()) {
            text.push(ch);
            self.advance();
        }
    }

    fn read_number(&mut self) -> TokenKind {
        let start = self.byte_pos();
        let mut number = String::new();
        let mut is_decimal = false;

        self.read_digits(&mut number);

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            is_decimal = true;
            number.push('.');
            self.advance();
            self.read_digits(&mut number);
        }

        let has_exponent = matches!(self.current_char(), Some('e' | 'E'))
            && match self.peek_char(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.peek_char(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
        if has_exponent {
            is_decimal = true;
            number.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.current_char() {
                number.push(sign);
                self.advance();
            }
            self.read_digits(&mut number);
        }

        let parsed = if is_decimal {
            parse_decimal(&number).map(TokenKind::Decimal)
        } else {
            number
                .parse::<i64>()
                .ok()
                .map(TokenKind::Integer)
                .or_else(|| Decimal::from_str(&number).ok().map(TokenKind::Decimal))
        };

        parsed.unwrap_or_else(|| {
            self.errors.push(LexError::InvalidNumber {
                text: number,
                span: self.span_from(start),
            });
            TokenKind::Invalid
        })
    }

    /// Consumes one character and yields `single`, or two characters and
    /// yields `double` when the second one is `second`.
    fn one_or_two(&mut self, second: char, double: TokenKind, single: TokenKind) -> TokenKind {
        self.advance();
        if self.current_char() == Some(second) {
            self.advance();
            double
        } else {
            single
        }
    }

    fn invalid(&mut self, ch: char) -> TokenKind {
        let start = self.byte_pos();
        self.advance();
        self.errors.push(LexError::UnexpectedCharacter {
            ch,
            span: self.span_from(start),
        });
        TokenKind::Invalid
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.byte_pos();

        let kind = match self.current_char() {
            None => TokenKind::Eof,
            Some('.') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()
            }
            Some('.') => {
                self.advance();
                TokenKind::Dot
            }
            Some(',') => {
                self.advance();
                TokenKind::Comma
            }
            Some('*') => {
                self.advance();
                TokenKind::Star
            }
            Some('/') => {
                self.advance();
                TokenKind::Slash
            }
            Some('%') => {
                self.advance();
                TokenKind::Percent
            }
            Some('?') => {
                self.advance();
                TokenKind::Question
            }
            Some(':') => {
                self.advance();
                TokenKind::Colon
            }
            Some('(') => {
                self.advance();
                TokenKind::LParen
            }
            Some(')') => {
                self.advance();
                TokenKind::RParen
            }
            Some('[') => {
                self.advance();
                TokenKind::LBracket
            }
            Some(']') => {
                self.advance();
                TokenKind::RBracket
            }
            Some('{') => {
                self.advance();
                TokenKind::LBrace
            }
            Some('}') => {
                self.advance();
                TokenKind::RBrace
            }
            Some('+') => self.one_or_two('=', TokenKind::PlusEqual, TokenKind::Plus),
            Some('-') => self.one_or_two('>', TokenKind::Arrow, TokenKind::Minus),
            Some('=') => self.one_or_two('=', TokenKind::EqEq, TokenKind::Assign),
            Some('!') => self.one_or_two('=', TokenKind::NotEq, TokenKind::Not),
            Some('<') => self.one_or_two('=', TokenKind::LtEq, TokenKind::Lt),
            Some('>') => self.one_or_two('=', TokenKind::GtEq, TokenKind::Gt),
            Some('&') if self.peek_char(1) == Some('&') => {
                self.advance();
                self.advance();
                TokenKind::And
            }
            Some('|') if self.peek_char(1) == Some('|') => {
                self.advance();
                self.advance();
                TokenKind::Or
            }
            Some(quote @ ('"' | '\'')) => self.read_string(quote),
            Some(ch) if Self::is_identifier_start(ch) => {
                let ident = self.read_identifier();
                TokenKind::keyword(&ident).unwrap_or(TokenKind::Identifier(ident))
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) => self.invalid(ch),
        };

        self.make(kind, start)
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let normalized = if text.starts_with('.') {
        format!("0{}", text)
    } else {
        text.to_string()
    };
    if normalized.contains(['e', 'E']) {
        Decimal::from_scientific(&normalized).ok()
    } else {
        Decimal::from_str(&normalized).ok()
    }
}

#[test]
fn test_keywords() {
    let kinds: Vec<TokenKind> = tokenize("and or not true false null", 0)
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Not,
            TokenKind::Boolean(true),
            TokenKind::Boolean(false),
            TokenKind::Null,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_offsets_are_absolute() {
    let tokens = tokenize("a.b", 10);
    assert_eq!(tokens[0].span, Span::new(10, 11));
    assert_eq!(tokens[1].span, Span::new(11, 12));
    assert_eq!(tokens[2].span, Span::new(12, 13));
    assert_eq!(tokens[3].span, Span::new(13, 13));
}
