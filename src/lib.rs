pub mod analysis;
pub mod ast;
pub mod builtins;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod document;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod schema;
pub mod scope;
pub mod span;
pub mod symbol;

pub use analysis::{Analyzer, Diagnostic, Error, Location, Severity};
pub use ast::{BinOp, Expr, ExprKind, Literal, Token, TokenKind, UnaryOp};
pub use config::{ConfigError, Settings};
pub use document::{Document, DocumentError};
pub use lexer::{tokenize, LexError, Lexer};
pub use output::{to_json, to_json_pretty};
pub use parser::{parse, parse_expression, parse_mapped, ParseDiagnostic, ParseError, Parsed, Parser};
pub use resolver::{candidates, resolve, ResolutionResult};
pub use schema::{Shape, TypeHint};
pub use scope::{build_scope, Scope, SymbolSource};
pub use span::Span;
pub use symbol::{Declaration, Symbol, SymbolOrigin};
