//! Check whole documents or single expressions

use serde::Serialize;

use super::CliError;
use crate::analysis::{Analyzer, Diagnostic};
use crate::config::Settings;
use crate::document::Document;
use crate::parser::parse_expression;
use crate::span::Span;

/// Result of checking a single expression
#[derive(Debug, Clone, Serialize)]
pub struct ExpressionReport {
    /// The parse tree as an s-expression
    pub tree: String,
    pub diagnostics: Vec<ExpressionDiagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionDiagnostic {
    pub span: Span,
    pub message: String,
}

impl ExpressionReport {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parse a bare expression (without `${}`)
pub fn check_expression(source: &str) -> ExpressionReport {
    let parsed = parse_expression(source, 0);
    ExpressionReport {
        tree: parsed.root.to_string(),
        diagnostics: parsed
            .diagnostics
            .iter()
            .map(|d| ExpressionDiagnostic {
                span: d.span,
                message: d.message(),
            })
            .collect(),
    }
}

/// Diagnostics for every expression in a Concord document
pub fn check_document(document: &Document, settings: Settings) -> Result<Vec<Diagnostic>, CliError> {
    let analyzer = Analyzer::new(document).with_settings(settings);
    Ok(analyzer.diagnostics()?)
}
