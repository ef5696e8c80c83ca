//! Navigation, completion and diagnostics over a [`Document`] snapshot.
//!
//! Every query re-parses the expressions it needs and rebuilds the scope
//! from the snapshot; nothing is cached between calls.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::ast::ExprKind;
use crate::config::Settings;
use crate::document::{Document, EmbeddedExpression};
use crate::parser::{parse_mapped, Parsed};
use crate::resolver::{self, ResolutionResult, with_lambda_params};
use crate::scope::{build_scope, Scope};
use crate::span::Span;
use crate::symbol::Symbol;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("offset {offset} is out of bounds (document length {len})")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("analysis cancelled")]
    Cancelled,
}

/// A range in the analyzed document with its 1-based start position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: Span,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    pub message: String,
}

pub struct Analyzer<'a> {
    document: &'a Document,
    settings: Settings,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Analyzer<'a> {
    pub fn new(document: &'a Document) -> Self {
        Analyzer {
            document,
            settings: Settings::default(),
            cancel: None,
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Queries stop with [`Error::Cancelled`] once `flag` is set. The flag is
    /// checked between the parse and resolve stages of each expression.
    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            debug!("analysis cancelled");
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn check_offset(&self, offset: usize) -> Result<(), Error> {
        let len = self.document.len();
        if offset > len {
            return Err(Error::OffsetOutOfBounds { offset, len });
        }
        Ok(())
    }

    pub fn location(&self, span: Span) -> Location {
        let (line, column) = self.document.position(span.start);
        Location { span, line, column }
    }

    fn diagnostic(&self, span: Span, severity: Severity, message: String) -> Diagnostic {
        let (line, column) = self.document.position(span.start);
        Diagnostic {
            span,
            line,
            column,
            severity,
            message,
        }
    }

    /// The embedded expression whose source contains `offset`.
    pub fn expression_at(&self, offset: usize) -> Option<&'a EmbeddedExpression> {
        self.document
            .expressions()
            .iter()
            .find(|e| e.inner.touches(offset))
    }

    pub fn parse(&self, expression: &EmbeddedExpression) -> Parsed {
        parse_mapped(&expression.source, &expression.offsets)
    }

    pub fn scope_at(&self, offset: usize) -> Scope {
        build_scope(self.document, offset, &self.settings)
    }

    /// Resolves the name under `offset`.
    pub fn resolve_at(&self, offset: usize) -> Result<ResolutionResult, Error> {
        self.check_offset(offset)?;
        let Some(expression) = self.expression_at(offset) else {
            return Ok(ResolutionResult::Unresolved);
        };

        let parsed = self.parse(expression);
        self.check_cancelled()?;

        let Some(reference) = resolver::locate(&parsed.root, offset) else {
            return Ok(ResolutionResult::Unresolved);
        };
        let scope = with_lambda_params(&self.scope_at(offset), &reference.lambda_params);
        Ok(resolver::resolve(&scope, reference.node))
    }

    /// Declaration site of the name under `offset`. Built-ins have none.
    pub fn go_to_declaration(&self, offset: usize) -> Result<Option<Location>, Error> {
        let resolution = self.resolve_at(offset)?;
        Ok(resolution
            .symbol()
            .and_then(Symbol::declaration_span)
            .map(|span| self.location(span)))
    }

    /// Completion candidates at `offset`, not filtered by the typed prefix.
    pub fn complete(&self, offset: usize) -> Result<Vec<Symbol>, Error> {
        self.check_offset(offset)?;
        let Some(expression) = self.expression_at(offset) else {
            return Ok(Vec::new());
        };

        let parsed = self.parse(expression);
        self.check_cancelled()?;

        let scope = self.scope_at(offset);
        let candidates = match resolver::locate(&parsed.root, offset) {
            Some(reference) => {
                let scope = with_lambda_params(&scope, &reference.lambda_params);
                resolver::candidates(&scope, reference.node)
            }
            None => resolver::scope_candidates(&scope),
        };
        debug!(offset, candidates = candidates.len(), "completion");
        Ok(candidates)
    }

    /// The symbol declared at `offset`: a `set:` or `out:` variable, a flow
    /// parameter in a documentation comment, or an argument.
    pub fn symbol_at(&self, offset: usize) -> Result<Option<Symbol>, Error> {
        self.check_offset(offset)?;
        Ok(self
            .document
            .declarations()
            .into_iter()
            .find(|s| s.declaration_span().is_some_and(|span| span.touches(offset)))
            .cloned())
    }

    /// Every expression range referring to `symbol`. Lazy: expressions are
    /// parsed as the iterator advances, and iteration ends early once the
    /// cancellation flag is set.
    pub fn find_usages(&self, symbol: &Symbol) -> impl Iterator<Item = Location> + '_ {
        let symbol = symbol.clone();
        self.document
            .expressions()
            .iter()
            .take_while(move |_| !self.is_cancelled())
            .flat_map(move |expression| self.usages_in(expression, &symbol))
    }

    fn usages_in(&self, expression: &EmbeddedExpression, symbol: &Symbol) -> Vec<Location> {
        let parsed = self.parse(expression);
        let scope = self.scope_at(expression.inner.start);

        resolver::references(&parsed.root)
            .into_iter()
            .filter(|reference| {
                let scope = with_lambda_params(&scope, &reference.lambda_params);
                resolver::resolve(&scope, reference.node)
                    .symbol()
                    .is_some_and(|found| same_symbol(found, symbol))
            })
            .map(|reference| self.location(reference.name_span))
            .collect()
    }

    /// Usages of the symbol declared or referenced at `offset`.
    pub fn usages_at(&self, offset: usize) -> Result<Vec<Location>, Error> {
        let symbol = match self.symbol_at(offset)? {
            Some(symbol) => Some(symbol),
            None => self.resolve_at(offset)?.symbol().cloned(),
        };
        let Some(symbol) = symbol else {
            return Ok(Vec::new());
        };

        let usages: Vec<Location> = self.find_usages(&symbol).collect();
        self.check_cancelled()?;
        Ok(usages)
    }

    /// Lex and parse errors of every expression, plus warnings for names
    /// that resolve to nothing.
    pub fn diagnostics(&self) -> Result<Vec<Diagnostic>, Error> {
        let mut found = Vec::new();

        if let Some(err) = self.document.load_error() {
            found.push(self.diagnostic(Span::empty(0), Severity::Error, err.to_string()));
        }

        for expression in self.document.expressions() {
            self.check_cancelled()?;
            if !expression.terminated {
                found.push(self.diagnostic(
                    expression.span,
                    Severity::Error,
                    "unterminated expression: missing '}'".to_string(),
                ));
            }

            let parsed = self.parse(expression);
            found.extend(
                parsed
                    .diagnostics
                    .iter()
                    .map(|d| self.diagnostic(d.span, Severity::Error, d.message())),
            );
            self.check_cancelled()?;

            if self.settings.unresolved_diagnostics {
                let scope = self.scope_at(expression.inner.start);
                for reference in resolver::references(&parsed.root) {
                    // Properties of dynamic values are too often unknown to report
                    let message = match &reference.node.kind {
                        ExprKind::Identifier(name) => format!("unresolved variable '{}'", name),
                        ExprKind::Call { target, .. } => match &target.kind {
                            ExprKind::Identifier(name) => format!("unresolved function '{}'", name),
                            _ => continue,
                        },
                        _ => continue,
                    };
                    let scope = with_lambda_params(&scope, &reference.lambda_params);
                    if resolver::resolve(&scope, reference.node).is_unresolved() {
                        found.push(self.diagnostic(reference.name_span, Severity::Warning, message));
                    }
                }
            }
        }

        debug!(diagnostics = found.len(), "checked document");
        Ok(found)
    }
}

fn same_symbol(a: &Symbol, b: &Symbol) -> bool {
    a.name == b.name && a.declared_at == b.declared_at && a.origin == b.origin
}
