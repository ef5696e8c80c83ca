//! Cursor-based queries: completion, go to declaration, usages

use serde::Serialize;

use super::CliError;
use crate::analysis::Analyzer;
use crate::config::Settings;
use crate::document::Document;
use crate::lexer::tokenize;
use crate::span::Span;

/// Query to run at a cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Complete,
    Goto,
    Usages,
    Resolve,
}

/// Run `query` at byte `offset` and return the result as JSON
pub fn execute_query(
    document: &Document,
    settings: Settings,
    query: Query,
    offset: usize,
) -> Result<serde_json::Value, CliError> {
    let analyzer = Analyzer::new(document).with_settings(settings);

    let value = match query {
        Query::Complete => serde_json::to_value(analyzer.complete(offset)?)?,
        Query::Goto => serde_json::to_value(analyzer.go_to_declaration(offset)?)?,
        Query::Usages => serde_json::to_value(analyzer.usages_at(offset)?)?,
        Query::Resolve => serde_json::to_value(analyzer.resolve_at(offset)?)?,
    };
    Ok(value)
}

/// A token as printed by `concord-el tokens`
#[derive(Debug, Clone, Serialize)]
pub struct TokenInfo {
    pub kind: &'static str,
    pub text: String,
    pub span: Span,
}

pub fn list_tokens(source: &str) -> Vec<TokenInfo> {
    tokenize(source, 0)
        .into_iter()
        .map(|token| TokenInfo {
            kind: token.kind.category(),
            text: token.text,
            span: token.span,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_tokens() {
        let kinds: Vec<&str> = list_tokens("a.b + 1").iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec!["IDENT", "DOT", "IDENT", "OPERATOR", "NUMBER", "EOF"]);
    }

    #[test]
    fn test_goto_outside_expression_is_null() {
        let document = Document::parse("flows:\n  main:\n    - log: hello\n");
        let value = execute_query(&document, Settings::default(), Query::Goto, 3).unwrap();
        assert!(value.is_null());
    }
}
