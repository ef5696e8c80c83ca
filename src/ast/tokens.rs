use rust_decimal::Decimal;

use crate::span::Span;

/// A lexical token with its source text and absolute byte range.
///
/// Tokens are immutable once produced by the [`Lexer`](crate::lexer::Lexer).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text of the token, quotes and escapes included.
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Name usable after `.`: identifiers, and any keyword spelled with
    /// letters (`obj.class`, `obj.empty`, `obj.true`).
    pub fn member_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ if self.kind.is_keyword() => Some(&self.text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 0
    /// ```
    Integer(i64),

    /// Decimal literal, with optional fraction and exponent
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// .5
    /// 1e5
    /// ```
    Decimal(Decimal),

    /// String literal in single or double quotes, escapes already applied
    ///
    /// # Examples
    /// ```text
    /// 'hello'
    /// "it's"
    /// 'it\'s'
    /// ```
    String(String),

    /// `true` / `false`
    Boolean(bool),

    /// `null`
    Null,

    /// Variable, property or function name
    ///
    /// Starts with a letter, `_` or `$`, followed by letters, digits, `_` or `$`.
    ///
    /// # Examples
    /// ```text
    /// initiator
    /// _private
    /// $dollar
    /// ```
    Identifier(String),

    // Comparison (symbolic and keyword forms share a kind)
    /// `==` or `eq`
    EqEq,
    /// `!=` or `ne`
    NotEq,
    /// `<` or `lt`
    Lt,
    /// `>` or `gt`
    Gt,
    /// `<=` or `le`
    LtEq,
    /// `>=` or `ge`
    GtEq,

    // Arithmetic
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/` or `div`
    Slash,
    /// `%` or `mod`
    Percent,
    /// String concatenation, `+=`
    PlusEqual,

    // Logical
    /// `&&` or `and`
    And,
    /// `||` or `or`
    Or,
    /// `!` or `not`
    Not,
    /// `empty` prefix operator
    Empty,
    /// `instanceof`
    Instanceof,

    // Punctuation
    /// Ternary condition marker
    Question,
    /// Ternary separator and map entry separator
    Colon,
    /// `=`, recognised so that assignments can be reported precisely
    Assign,
    /// Lambda arrow, `->`
    Arrow,

    // Delimiters
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Dot,
    Comma,

    /// Unrecognised input. The lexer records a
    /// [`LexError`](crate::lexer::LexError) and keeps going.
    Invalid,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Whether the token is one of the arithmetic, comparison or logical
    /// operators.
    pub fn is_operator(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            EqEq | NotEq
                | Lt
                | Gt
                | LtEq
                | GtEq
                | Plus
                | Minus
                | Star
                | Slash
                | Percent
                | PlusEqual
                | And
                | Or
                | Not
                | Empty
                | Instanceof
                | Question
                | Colon
        )
    }

    /// Whether the kind can be spelled as a word in source.
    pub fn is_keyword(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Boolean(_)
                | Null
                | EqEq
                | NotEq
                | Lt
                | Gt
                | LtEq
                | GtEq
                | Slash
                | Percent
                | And
                | Or
                | Not
                | Empty
                | Instanceof
        )
    }

    /// Keyword lookup for a scanned word.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            "null" => TokenKind::Null,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "eq" => TokenKind::EqEq,
            "ne" => TokenKind::NotEq,
            "lt" => TokenKind::Lt,
            "gt" => TokenKind::Gt,
            "le" => TokenKind::LtEq,
            "ge" => TokenKind::GtEq,
            "div" => TokenKind::Slash,
            "mod" => TokenKind::Percent,
            "empty" => TokenKind::Empty,
            "instanceof" => TokenKind::Instanceof,
            _ => return None,
        };
        Some(kind)
    }

    /// Coarse token class: `IDENT`, `NUMBER`, `STRING`, `OPERATOR`, ...
    pub fn category(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Integer(_) | Decimal(_) => "NUMBER",
            String(_) => "STRING",
            Boolean(_) | Null => "KEYWORD",
            Identifier(_) => "IDENT",
            Dot => "DOT",
            Comma => "COMMA",
            Colon => "COLON",
            Question => "QUESTION",
            Arrow => "ARROW",
            LBracket => "LBRACKET",
            RBracket => "RBRACKET",
            LParen => "LPAREN",
            RParen => "RPAREN",
            LBrace => "LBRACE",
            RBrace => "RBRACE",
            Invalid => "INVALID",
            Eof => "EOF",
            _ => "OPERATOR",
        }
    }

    /// Short human-readable description used in diagnostics.
    pub fn describe(&self) -> String {
        use TokenKind::*;
        match self {
            Integer(n) => format!("number {}", n),
            Decimal(n) => format!("number {}", n),
            String(_) => "string literal".to_string(),
            Boolean(b) => format!("'{}'", b),
            Null => "'null'".to_string(),
            Identifier(name) => format!("identifier '{}'", name),
            Invalid => "invalid input".to_string(),
            Eof => "end of expression".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        use TokenKind::*;
        match self {
            EqEq => "==",
            NotEq => "!=",
            Lt => "<",
            Gt => ">",
            LtEq => "<=",
            GtEq => ">=",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            PlusEqual => "+=",
            And => "&&",
            Or => "||",
            Not => "!",
            Empty => "empty",
            Instanceof => "instanceof",
            Question => "?",
            Colon => ":",
            Assign => "=",
            Arrow => "->",
            LBracket => "[",
            RBracket => "]",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            Dot => ".",
            Comma => ",",
            _ => "?",
        }
    }
}
