// tests/parser_tests.rs

use concord_el::ast::{BinOp, ExprKind, Literal};
use concord_el::parser::{parse_expression, ParseError};
use concord_el::span::Span;

fn tree(source: &str) -> String {
    parse_expression(source, 0).root.to_string()
}

fn assert_clean(source: &str) {
    let parsed = parse_expression(source, 0);
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected diagnostics for {:?}: {:?}",
        source,
        parsed.diagnostics
    );
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_arithmetic() {
    let parsed = parse_expression("1 + 2 * 3", 0);
    assert!(parsed.diagnostics.is_empty());

    // Should be: Add(1, Multiply(2, 3))
    match parsed.root.kind {
        ExprKind::BinaryOp {
            op: BinOp::Add,
            left,
            right,
        } => {
            assert!(matches!(left.kind, ExprKind::Literal(Literal::Integer(1))));
            assert!(matches!(
                right.kind,
                ExprKind::BinaryOp {
                    op: BinOp::Multiply,
                    ..
                }
            ));
        }
        other => panic!("Expected addition, got {:?}", other),
    }
}

#[test]
fn test_parentheses() {
    assert_eq!(tree("(1 + 2) * 3"), "(* (+ 1 2) 3)");
}

#[test]
fn test_left_associative() {
    assert_eq!(tree("a - b - c"), "(- (- a b) c)");
}

#[test]
fn test_logical_below_comparison() {
    assert_eq!(
        tree("a > 1 && b == 'x' || !c"),
        "(|| (&& (> a 1) (== b \"x\")) (! c))"
    );
}

#[test]
fn test_keyword_operators() {
    assert_eq!(tree("a gt 1 and not b"), "(&& (> a 1) (! b))");
    assert_eq!(tree("x mod 2 eq 0"), "(== (% x 2) 0)");
    assert_eq!(tree("empty items"), "(empty items)");
}

#[test]
fn test_ternary_is_right_associative() {
    assert_eq!(tree("a ? b : c ? d : e"), "(? a b (? c d e))");
}

#[test]
fn test_concat_between_relational_and_additive() {
    assert_eq!(tree("a += b + c"), "(+= a (+ b c))");
    assert_eq!(tree("a += b < c"), "(< (+= a b) c)");
}

#[test]
fn test_unary_minus() {
    assert_eq!(tree("-a * b"), "(* (- a) b)");
}

// ============================================================================
// Postfix chains
// ============================================================================

#[test]
fn test_property_chain() {
    assert_eq!(tree("a.b.c"), "(. (. a b) c)");
}

#[test]
fn test_method_call_chain() {
    assert_eq!(tree("a.b(c).d"), "(. (call (. a b) c) d)");
}

#[test]
fn test_index_access() {
    assert_eq!(tree("items[0].name"), "(. ([] items 0) name)");
}

#[test]
fn test_keyword_member_names() {
    assert_clean("obj.empty");
    assert_eq!(tree("obj.empty"), "(. obj empty)");
    assert_eq!(tree("obj.class.name"), "(. (. obj class) name)");
}

#[test]
fn test_function_call() {
    assert_eq!(tree("orDefault('x', 1)"), "(call orDefault \"x\" 1)");
    assert_eq!(tree("uuid()"), "(call uuid)");
}

#[test]
fn test_property_name_span() {
    let parsed = parse_expression("initiator.username", 100);
    match parsed.root.kind {
        ExprKind::Property { name, name_span, .. } => {
            assert_eq!(name.as_deref(), Some("username"));
            assert_eq!(name_span, Span::new(110, 118));
        }
        other => panic!("Expected property access, got {:?}", other),
    }
    assert_eq!(parsed.root.span, Span::new(100, 118));
}

// ============================================================================
// Collections and lambdas
// ============================================================================

#[test]
fn test_collection_literals() {
    assert_eq!(tree("[1, 2]"), "(list 1 2)");
    assert_eq!(tree("{'a': 1, 'b': x}"), "(map (\"a\" 1) (\"b\" x))");
    assert_eq!(tree("{1, 2}"), "(set 1 2)");
    assert_eq!(tree("{}"), "(map)");
    assert_eq!(tree("[]"), "(list)");
}

#[test]
fn test_lambdas() {
    assert_eq!(tree("x -> x + 1"), "(-> (x) (+ x 1))");
    assert_eq!(tree("(a, b) -> a * b"), "(-> (a b) (* a b))");
    assert_eq!(tree("() -> 1"), "(-> () 1)");
    assert_eq!(
        tree("items.stream().filter(x -> x > 5).toList()"),
        "(call (. (call (. (call (. items stream)) filter) (-> (x) (> x 5))) toList))"
    );
}

#[test]
fn test_parenthesized_is_not_lambda() {
    assert_eq!(tree("(a) + 1"), "(+ a 1)");
}

// ============================================================================
// Error recovery
// ============================================================================

#[test]
fn test_missing_property_name() {
    let parsed = parse_expression("a.", 10);

    assert_eq!(parsed.root.to_string(), "(. a <missing>)");
    match &parsed.root.kind {
        ExprKind::Property { name, name_span, .. } => {
            assert!(name.is_none());
            assert_eq!(*name_span, Span::empty(12));
        }
        other => panic!("Expected property access, got {:?}", other),
    }
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].error, ParseError::MissingPropertyName);
}

#[test]
fn test_empty_expression() {
    let parsed = parse_expression("   ", 5);
    assert!(parsed.root.is_error());
    assert_eq!(parsed.diagnostics[0].error, ParseError::EmptyExpression);
}

#[test]
fn test_missing_operand() {
    let parsed = parse_expression("a +", 0);
    assert_eq!(parsed.root.to_string(), "(+ a <error>)");
    assert_eq!(parsed.diagnostics.len(), 1);
}

#[test]
fn test_unclosed_call() {
    let parsed = parse_expression("f(a, b", 0);
    assert_eq!(parsed.root.to_string(), "(call f a b)");
    assert_eq!(parsed.diagnostics[0].error, ParseError::Unclosed(')'));
}

#[test]
fn test_invalid_token_reported_once() {
    let parsed = parse_expression("a + #", 0);
    assert_eq!(parsed.root.to_string(), "(+ a <error>)");
    assert_eq!(parsed.diagnostics.len(), 1);
    assert!(matches!(parsed.diagnostics[0].error, ParseError::Lex(_)));
}

#[test]
fn test_trailing_tokens() {
    let parsed = parse_expression("a b", 0);
    assert_eq!(parsed.root.to_string(), "a");
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].span, Span::new(2, 3));
}

#[test]
fn test_assignment_rejected() {
    let parsed = parse_expression("a = 1", 0);
    assert_eq!(parsed.diagnostics[0].error, ParseError::Assignment);
}

#[test]
fn test_missing_ternary_else() {
    let parsed = parse_expression("a ? b", 0);
    assert_eq!(parsed.root.to_string(), "(? a b <error>)");
    assert_eq!(parsed.diagnostics.len(), 1);
}

#[test]
fn test_diagnostics_sorted_by_position() {
    let parsed = parse_expression("# + a.", 0);
    let starts: Vec<usize> = parsed.diagnostics.iter().map(|d| d.span.start).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
    assert!(parsed.diagnostics.len() >= 2);
}

// ============================================================================
// Nesting limit
// ============================================================================

#[test]
fn test_nesting_below_limit_parses() {
    let source = format!("{}a{}", "(".repeat(100), ")".repeat(100));
    assert_clean(&source);
    assert_eq!(tree(&source), "a");
}

#[test]
fn test_deep_parentheses_are_reported() {
    let parsed = parse_expression(&"(".repeat(1_000), 0);
    assert!(parsed.root.is_error());
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].error, ParseError::TooDeeplyNested);
}

#[test]
fn test_deep_unary_chain_is_reported() {
    let source = format!("{}1", "-".repeat(5_000));
    let parsed = parse_expression(&source, 0);
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].error, ParseError::TooDeeplyNested);
}

#[test]
fn test_long_chains_are_reported() {
    let sum = vec!["a"; 5_000].join(" + ");
    let parsed = parse_expression(&sum, 0);
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].error, ParseError::TooDeeplyNested);

    let properties = format!("a{}", ".b".repeat(5_000));
    let parsed = parse_expression(&properties, 0);
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].error, ParseError::TooDeeplyNested);
}

#[test]
fn test_nesting_limit_skips_to_matching_close() {
    let source = format!("{}1{} + b", "(".repeat(300), ")".repeat(300));
    let parsed = parse_expression(&source, 0);
    assert_eq!(parsed.root.to_string(), "(+ <error> b)");
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].span, Span::new(128, 129));
}
