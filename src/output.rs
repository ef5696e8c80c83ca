//! Output formatting for analysis results.
//!
//! Results are emitted either as JSON (compact or pretty) through `serde_json`,
//! or as one-line human-readable reports for diagnostics and symbols.
//!
//! # Examples
//!
//! ```
//! use concord_el::output::to_json;
//! use concord_el::span::Span;
//!
//! assert_eq!(to_json(&Span::new(3, 7)).unwrap(), r#"{"start":3,"end":7}"#);
//! ```

use serde::Serialize;

use crate::analysis::{Diagnostic, Severity};
use crate::symbol::{Declaration, Symbol};

/// Compact JSON with no extra whitespace.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// JSON with 2-space indentation, one property per line.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// `path:line:column: severity: message`
pub fn format_diagnostic(path: &str, diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    format!(
        "{}:{}:{}: {}: {}",
        path, diagnostic.line, diagnostic.column, severity, diagnostic.message
    )
}

/// `name: type`, marked when built in, then the last line of the
/// documentation.
pub fn format_symbol(symbol: &Symbol) -> String {
    let mut line = format!("{}: {}", symbol.name, symbol.type_hint);
    if let Declaration::Builtin = symbol.declared_at {
        line.push_str(" (built-in)");
    }
    if let Some(doc) = &symbol.documentation {
        let summary = doc.lines().last().unwrap_or_default();
        if !summary.is_empty() {
            line.push_str(" - ");
            line.push_str(summary);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeHint;
    use crate::span::Span;

    #[test]
    fn test_format_diagnostic() {
        let diagnostic = Diagnostic {
            span: Span::new(10, 12),
            line: 3,
            column: 7,
            severity: Severity::Warning,
            message: "unresolved variable 'x'".to_string(),
        };
        assert_eq!(
            format_diagnostic("concord.yml", &diagnostic),
            "concord.yml:3:7: warning: unresolved variable 'x'"
        );
    }

    #[test]
    fn test_format_builtin_symbol() {
        let symbol = Symbol::builtin("txId", TypeHint::String, "Process instance ID");
        assert_eq!(format_symbol(&symbol), "txId: string (built-in) - Process instance ID");
    }
}
