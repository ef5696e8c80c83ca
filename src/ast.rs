//! # Concord Expression Language - Abstract Syntax Tree
//!
//! Concord workflow files embed expressions in YAML scalars using the
//! `${...}` syntax. This module defines the tokens and the expression tree
//! for the language found between the delimiters.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer, with byte ranges
//! - **[expressions]** - Expression nodes (literals, access chains, operations)
//! - **[operators]** - Binary and prefix operators
//!
//! ## Quick Start
//!
//! ```text
//! initiator.username == 'admin' ? projectInfo.orgName : 'Default'
//! ```
//!
//! ## Core Concepts
//!
//! ### Access Chains
//!
//! Property access, index access and calls bind tightest and associate left
//! to right:
//!
//! ```text
//! a.b(c).d        ->  (. (call (. a b) c) d)
//! items[0].name   ->  (. ([] items 0) name)
//! ```
//!
//! ### Keyword Operators
//!
//! Every symbolic operator with a word form (`and`, `or`, `not`, `eq`, `ne`,
//! `lt`, `gt`, `le`, `ge`, `div`, `mod`) produces the same token kind as its
//! symbol. `empty` and `instanceof` only exist as words. Keywords remain
//! usable as property names after a dot (`obj.empty`).
//!
//! ### Partial Input
//!
//! Expressions are parsed while the user is typing. The parser never gives
//! up: unparseable fragments become [`ExprKind::Error`](expressions::ExprKind::Error)
//! nodes and a property access without a name (`a.`) keeps its target, so
//! completion can still work from the prefix.
//!
//! ## Examples
//!
//! ### Precedence
//!
//! ```text
//! 1 + 2 * 3       ->  (+ 1 (* 2 3))
//! a ? b : c ? d : e  ->  (? a b (? c d e))
//! ```
//!
//! ### Lambdas
//!
//! ```text
//! items.stream().filter(x -> x > 5).toList()
//! ```
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::{Expr, ExprKind, Literal, Param};
pub use operators::{BinOp, UnaryOp};
pub use tokens::{Token, TokenKind};
