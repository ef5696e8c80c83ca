//! Property tests for the lexer, parser and embedded-expression scanner.
//!
//! Properties:
//! - Parsing never fails and is deterministic for any input
//! - Leaf ranges stay inside the source and never overlap
//! - Well-formed expressions parse without diagnostics
//! - Queries succeed at every offset of a document

use concord_el::ast::TokenKind;
use concord_el::document::embedded;
use concord_el::parser::parse_expression;
use concord_el::{Analyzer, Document};
use proptest::prelude::*;

// ============================================================================
// STRATEGIES
// ============================================================================

fn arb_identifier() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9]{0,5}".prop_filter("keywords are not identifiers", |s| {
        TokenKind::keyword(s).is_none()
    })
}

fn arb_leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_identifier(),
        (0u32..1000).prop_map(|n| n.to_string()),
        "[a-z ]{0,6}".prop_map(|s| format!("'{}'", s)),
        Just("true".to_string()),
        Just("null".to_string()),
    ]
}

fn arb_operator() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("+"),
        Just("-"),
        Just("*"),
        Just("/"),
        Just("=="),
        Just("!="),
        Just("<"),
        Just(">="),
        Just("&&"),
        Just("||"),
        Just("and"),
        Just("or"),
        Just("+="),
    ]
}

/// Source text of a syntactically valid expression.
fn arb_expression() -> impl Strategy<Value = String> {
    arb_leaf().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), arb_operator(), inner.clone())
                .prop_map(|(l, op, r)| format!("({} {} {})", l, op, r)),
            (inner.clone(), arb_identifier()).prop_map(|(t, name)| format!("{}.{}", t, name)),
            (inner.clone(), inner.clone()).prop_map(|(t, i)| format!("{}[{}]", t, i)),
            (arb_identifier(), prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(f, args)| format!("{}({})", f, args.join(", "))),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, a, b)| format!("({} ? {} : {})", c, a, b)),
            prop::collection::vec(inner.clone(), 0..3)
                .prop_map(|items| format!("[{}]", items.join(", "))),
            (arb_identifier(), inner.clone()).prop_map(|(p, body)| format!("({} -> {})", p, body)),
            inner.prop_map(|e| format!("not {}", e)),
        ]
    })
}

/// Arbitrary text over the characters expressions are made of.
fn arb_fragment() -> impl Strategy<Value = String> {
    r#"[a-z0-9 .,()\[\]{}'"+*/%<>=!&|?:$#-]{0,40}"#
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_parse_is_deterministic(source in arb_fragment(), offset in 0usize..100) {
        let first = parse_expression(&source, offset);
        let second = parse_expression(&source, offset);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_spans_in_bounds(source in arb_fragment(), offset in 0usize..100) {
        let parsed = parse_expression(&source, offset);
        let end = offset + source.len();

        prop_assert!(parsed.root.span.start >= offset && parsed.root.span.end <= end);
        for span in parsed.root.leaf_spans() {
            prop_assert!(span.start >= offset && span.start <= span.end && span.end <= end,
                "leaf {:?} outside {}..{}", span, offset, end);
        }
        for diagnostic in &parsed.diagnostics {
            prop_assert!(diagnostic.span.start >= offset && diagnostic.span.end <= end);
        }
    }

    #[test]
    fn prop_leaf_spans_do_not_overlap(source in arb_fragment()) {
        let parsed = parse_expression(&source, 0);
        let leaves: Vec<_> = parsed
            .root
            .leaf_spans()
            .into_iter()
            .filter(|span| !span.is_empty())
            .collect();

        for (i, a) in leaves.iter().enumerate() {
            for b in &leaves[i + 1..] {
                prop_assert!(!a.overlaps(b), "{:?} overlaps {:?} in {:?}", a, b, source);
            }
        }
    }

    #[test]
    fn prop_valid_expressions_parse_cleanly(source in arb_expression()) {
        let parsed = parse_expression(&source, 0);
        prop_assert!(parsed.diagnostics.is_empty(),
            "{:?} produced {:?}", source, parsed.diagnostics);
        prop_assert!(!parsed.root.is_error());
    }

    #[test]
    fn prop_embedded_regions_are_ordered(text in r#"[a-z${}'" \n:-]{0,60}"#) {
        let found = embedded::scan(&text);
        let mut last_end = 0;
        for expression in &found {
            prop_assert!(expression.span.start >= last_end);
            prop_assert!(expression.inner.start >= expression.span.start);
            prop_assert!(expression.inner.end <= expression.span.end);
            prop_assert!(expression.span.end <= text.len());
            last_end = expression.span.end;
        }
    }
}

const DOCUMENT: &str = r#"configuration:
  arguments:
    env: dev

flows:
  main:
    - set:
        cfg:
          region: us-east-1
    - task: http
      out:
        status: "${result.ok}"
      loop:
        items: ${cfg.region}
    - if: "${status.ok && env == 'dev'}"
      then:
        - log: "${items.stream().map(x -> x.name).toList()} ${cfg.}"
"#;

proptest! {
    #[test]
    fn prop_queries_succeed_at_any_offset(offset in 0usize..=DOCUMENT.len()) {
        let document = Document::parse(DOCUMENT);
        let analyzer = Analyzer::new(&document);

        prop_assert!(analyzer.complete(offset).is_ok());
        prop_assert!(analyzer.resolve_at(offset).is_ok());
        prop_assert!(analyzer.go_to_declaration(offset).is_ok());
        prop_assert!(analyzer.usages_at(offset).is_ok());
    }
}
