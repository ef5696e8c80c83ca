//! CLI support for concord-el
//!
//! Provides programmatic access to the CLI commands so editors and scripts
//! can embed them without spawning the binary.

mod check;
mod docs;
mod navigate;

pub use check::{check_document, check_expression, ExpressionDiagnostic, ExpressionReport};
pub use docs::{get_doc_topic, get_docs_overview, DocTopic};
pub use navigate::{execute_query, list_tokens, Query, TokenInfo};

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::document::Document;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Analysis(#[from] crate::analysis::Error),

    #[error("No input provided. Pass a file or pipe a document to stdin.")]
    NoInput,

    #[error("Invalid cursor '{0}': expected a byte offset or line:column")]
    InvalidCursor(String),

    #[error("Unknown documentation topic: '{0}'\nRun 'concord-el docs' to list topics.")]
    UnknownTopic(String),
}

/// Converts a cursor given as a byte offset (`120`) or a 1-based
/// `line:column` pair (`7:15`) to a byte offset.
pub fn parse_cursor(document: &Document, cursor: &str) -> Result<usize, CliError> {
    let invalid = || CliError::InvalidCursor(cursor.to_string());

    match cursor.split_once(':') {
        Some((line, column)) => {
            let line: usize = line.trim().parse().map_err(|_| invalid())?;
            let column: usize = column.trim().parse().map_err(|_| invalid())?;
            document
                .lines()
                .offset(document.text(), line, column)
                .ok_or_else(invalid)
        }
        None => cursor.trim().parse().map_err(|_| invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cursor_forms() {
        let document = Document::parse("flows:\n  main:\n    - log: ${x}\n");
        assert_eq!(parse_cursor(&document, "5").unwrap(), 5);
        assert_eq!(parse_cursor(&document, "2:3").unwrap(), 9);
        assert!(matches!(
            parse_cursor(&document, "two"),
            Err(CliError::InvalidCursor(_))
        ));
    }
}
