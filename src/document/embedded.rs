use super::scalars::{self, Decoded};
use crate::span::Span;

/// A `${...}` region found in a scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedExpression {
    /// The whole region, delimiters included.
    pub span: Span,
    /// The expression source between `${` and `}`.
    pub inner: Span,
    /// False when no closing brace was found; `inner` then stops at the end
    /// of the line the expression starts on.
    pub terminated: bool,
    /// Expression source with the scalar's YAML quoting decoded.
    pub source: String,
    /// Document offset of every byte of `source`, plus one entry for its end.
    pub offsets: Vec<usize>,
}

/// Finds every `${...}` region in the scalar values of `text`, in order.
/// Comments are skipped and quoted scalars are unquoted first, so
/// `"${a == \"x\"}"` holds the expression `a == "x"`. Braces and quotes
/// inside the expression are tracked, so `${ {'a': '}'} }` is one region,
/// and the search for the closing brace never leaves the scalar. `\${` is
/// not an expression.
pub fn scan(text: &str) -> Vec<EmbeddedExpression> {
    scalars::scan(text)
        .iter()
        .flat_map(|scalar| in_scalar(&scalar.decode(text)))
        .collect()
}

fn in_scalar(decoded: &Decoded) -> Vec<EmbeddedExpression> {
    let text = decoded.text.as_str();
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] != b'$' || bytes[i + 1] != b'{' || (i > 0 && bytes[i - 1] == b'\\') {
            i += 1;
            continue;
        }

        let start = i;
        let inner_start = i + 2;
        let (inner_end, end, terminated) = match closing_brace(bytes, inner_start, bytes.len()) {
            Some(close) => (close, close + 1, true),
            None => {
                let line_end = text[inner_start..]
                    .find('\n')
                    .map_or(text.len(), |n| inner_start + n);
                let inner_end = inner_start + text[inner_start..line_end].trim_end_matches('\r').len();
                (inner_end, line_end, false)
            }
        };

        let at = |index: usize| decoded.offsets[index];
        found.push(EmbeddedExpression {
            span: Span::new(at(start), at(if terminated { end } else { inner_end })),
            inner: Span::new(at(inner_start), at(inner_end)),
            terminated,
            source: text[inner_start..inner_end].to_string(),
            offsets: decoded.offsets[inner_start..=inner_end].to_vec(),
        });
        i = end;
    }
    found
}

/// Index of the `}` closing a region whose content starts at `from`, looking
/// no further than `limit`.
pub(super) fn closing_brace(bytes: &[u8], from: usize, limit: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < limit {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(text: &str) -> Vec<String> {
        scan(text).into_iter().map(|e| e.source).collect()
    }

    #[test]
    fn test_nested_braces_and_quotes() {
        let text = "x: ${ {'a': '}'} }";
        let found = scan(text);
        assert_eq!(found.len(), 1);
        assert_eq!(&text[found[0].inner.start..found[0].inner.end], " {'a': '}'} ");
    }

    #[test]
    fn test_unterminated_stops_at_scalar_end() {
        let text = "a: \"${foo.\"\nb: ${bar}";
        let found = scan(text);
        assert_eq!(found.len(), 2);
        assert!(!found[0].terminated);
        assert_eq!(found[0].source, "foo.");
        assert_eq!(found[0].inner, Span::new(6, 10));
        assert_eq!(found[1].source, "bar");
    }

    #[test]
    fn test_escaped_dollar() {
        assert!(scan(r"a: \${not}").is_empty());
    }

    #[test]
    fn test_comments_hold_no_expressions() {
        let text = "# prints ${oops} later\nflows:\n  main:\n    - log: ${a} # and ${b}\n";
        assert_eq!(sources(text), vec!["a"]);
    }

    #[test]
    fn test_double_quoted_scalar_is_unescaped() {
        let text = r#"- log: "${a == \"x\"}""#;
        let found = scan(text);
        assert_eq!(found.len(), 1);
        assert!(found[0].terminated);
        assert_eq!(found[0].source, r#"a == "x""#);

        // Ranges stay in document offsets
        let raw_inner = &text[found[0].inner.start..found[0].inner.end];
        assert_eq!(raw_inner, r#"a == \"x\""#);
        assert_eq!(&text[found[0].span.start..found[0].span.end], r#"${a == \"x\"}"#);
        let x = found[0].source.find('x').unwrap();
        assert_eq!(&text[found[0].offsets[x]..found[0].offsets[x] + 1], "x");
    }

    #[test]
    fn test_single_quoted_scalar_is_unescaped() {
        let text = "- log: '${a == ''x''}'";
        let found = scan(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, "a == 'x'");
        assert_eq!(&text[found[0].inner.start..found[0].inner.end], "a == ''x''");
    }

    #[test]
    fn test_unbalanced_quote_stays_in_its_scalar() {
        let text = "a: ${'x}\nb: ${y} 'z'\n";
        let found = scan(text);
        assert_eq!(found.len(), 2);
        assert!(!found[0].terminated);
        assert_eq!(found[0].source, "'x}");
        assert!(found[1].terminated);
        assert_eq!(found[1].source, "y");
    }
}
