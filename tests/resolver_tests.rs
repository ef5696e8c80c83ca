// tests/resolver_tests.rs

use std::sync::Arc;

use concord_el::parser::parse_expression;
use concord_el::resolver::{candidates, locate, resolve, ResolutionResult};
use concord_el::schema::{Shape, TypeHint};
use concord_el::scope::{
    ArgumentSource, BuiltinContextSource, DeclaredVariableSource, Scope, SymbolSource,
};
use concord_el::span::Span;
use concord_el::symbol::{Declaration, Symbol, SymbolOrigin};

fn declared(name: &str, at: usize, hint: TypeHint) -> Symbol {
    Symbol::declared(
        name,
        Declaration::Document(Span::new(at, at + name.len())),
        hint,
        SymbolOrigin::SetStep,
    )
}

fn scope(layers: Vec<Vec<Symbol>>) -> Scope {
    let mut sources: Vec<Arc<dyn SymbolSource>> = layers
        .into_iter()
        .map(|symbols| Arc::new(DeclaredVariableSource::new(symbols)) as Arc<dyn SymbolSource>)
        .collect();
    sources.push(Arc::new(BuiltinContextSource));
    Scope::new(sources)
}

fn resolve_source(scope: &Scope, source: &str) -> ResolutionResult {
    let parsed = parse_expression(source, 0);
    resolve(scope, &parsed.root)
}

// ============================================================================
// Identifiers and shadowing
// ============================================================================

#[test]
fn test_inner_declaration_shadows_outer() {
    let scope = scope(vec![
        vec![declared("x", 10, TypeHint::Int)],
        vec![
            declared("x", 0, TypeHint::String),
            declared("y", 5, TypeHint::Boolean),
        ],
    ]);

    match resolve_source(&scope, "x") {
        ResolutionResult::Resolved(symbol) => {
            assert_eq!(symbol.type_hint, TypeHint::Int);
            assert_eq!(symbol.declaration_span(), Some(Span::new(10, 11)));
        }
        other => panic!("Expected resolved x, got {:?}", other),
    }

    let y = resolve_source(&scope, "y");
    assert_eq!(y.symbol().map(|s| s.type_hint), Some(TypeHint::Boolean));
}

#[test]
fn test_unknown_name_is_unresolved() {
    let scope = scope(vec![]);
    assert!(resolve_source(&scope, "foo").is_unresolved());
    assert!(resolve_source(&scope, "foo.bar").is_unresolved());
}

#[test]
fn test_declared_shadows_builtin() {
    let scope = scope(vec![vec![declared("initiator", 3, TypeHint::String)]]);
    let result = resolve_source(&scope, "initiator");
    assert_eq!(result.symbol().map(|s| s.is_builtin()), Some(false));
    // The shadowing declaration has no shape
    assert!(resolve_source(&scope, "initiator.username").is_unresolved());
}

#[test]
fn test_scope_symbols_are_deduplicated() {
    let scope = scope(vec![
        vec![declared("x", 10, TypeHint::Int)],
        vec![declared("x", 0, TypeHint::String)],
    ]);
    let xs: Vec<&Symbol> = scope.symbols().into_iter().filter(|s| s.name == "x").collect();
    assert_eq!(xs.len(), 1);
    assert_eq!(xs[0].type_hint, TypeHint::Int);
}

// ============================================================================
// Built-ins
// ============================================================================

#[test]
fn test_builtin_property_chain() {
    let scope = Scope::builtins_only();

    let result = resolve_source(&scope, "context.workingDirectory");
    let symbol = result.symbol().expect("workingDirectory resolves");
    assert_eq!(symbol.name, "workingDirectory");
    assert_eq!(symbol.type_hint, TypeHint::String);
    assert!(symbol.is_builtin());

    assert!(resolve_source(&scope, "initiator.username").is_resolved());
    assert!(resolve_source(&scope, "initiator.nope").is_unresolved());
}

#[test]
fn test_builtin_function_call() {
    let scope = Scope::builtins_only();

    let result = resolve_source(&scope, "orDefault('x', 1)");
    assert_eq!(
        result.symbol().map(|s| s.origin),
        Some(SymbolOrigin::BuiltinFunction)
    );

    let without = Scope::builtins_only().without_functions();
    assert!(resolve_source(&without, "uuid()").is_unresolved());
}

#[test]
fn test_method_call_resolves_through_callee() {
    let scope = Scope::builtins_only();
    let result = resolve_source(&scope, "context.getVariable('a')");
    assert_eq!(result.symbol().map(|s| s.name.as_str()), Some("getVariable"));
}

#[test]
fn test_index_and_call_results_have_no_shape() {
    let scope = Scope::builtins_only();
    assert!(resolve_source(&scope, "initiator['username']").is_unresolved());
    assert!(resolve_source(&scope, "uuid().length").is_unresolved());
}

// ============================================================================
// Shapes
// ============================================================================

fn owner_with(shape: Shape) -> Scope {
    let owner = declared("cfg", 0, TypeHint::Object).with_shape(shape);
    scope(vec![vec![owner]])
}

#[test]
fn test_nested_shape_lookup() {
    let mut shape = Shape::object([]);
    shape.insert_path(&["db", "host"], declared("host", 20, TypeHint::String));
    let scope = owner_with(shape);

    let result = resolve_source(&scope, "cfg.db.host");
    assert_eq!(result.symbol().map(|s| s.type_hint), Some(TypeHint::String));
    assert!(resolve_source(&scope, "cfg.db.port").is_unresolved());
}

#[test]
fn test_composite_same_type_resolves() {
    let shape = Shape::object([declared("id", 10, TypeHint::String)])
        .merge(Shape::object([declared("id", 30, TypeHint::String)]));
    let scope = owner_with(shape);

    match resolve_source(&scope, "cfg.id") {
        ResolutionResult::Resolved(symbol) => assert_eq!(symbol.type_hint, TypeHint::String),
        other => panic!("Expected resolved id, got {:?}", other),
    }
}

#[test]
fn test_composite_conflicting_types_is_ambiguous() {
    let shape = Shape::object([declared("id", 10, TypeHint::String)])
        .merge(Shape::object([declared("id", 30, TypeHint::Int)]));
    let scope = owner_with(shape);

    match resolve_source(&scope, "cfg.id") {
        ResolutionResult::Ambiguous(symbols) => {
            assert_eq!(symbols.len(), 2);
            assert_eq!(symbols[0].type_hint, TypeHint::String);
            assert_eq!(symbols[1].type_hint, TypeHint::Int);
        }
        other => panic!("Expected ambiguous id, got {:?}", other),
    }
}

// ============================================================================
// Completion candidates
// ============================================================================

#[test]
fn test_candidates_after_dot() {
    let scope = Scope::builtins_only();
    let parsed = parse_expression("initiator.", 0);

    let names: Vec<String> = candidates(&scope, &parsed.root)
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert!(names.contains(&"username".to_string()));
    assert!(names.contains(&"email".to_string()));
    assert!(!names.contains(&"initiator".to_string()));
}

#[test]
fn test_candidates_at_name_include_functions() {
    let scope = scope(vec![vec![declared("myVar", 0, TypeHint::Int)]]);
    let parsed = parse_expression("my", 0);

    let names: Vec<String> = candidates(&scope, &parsed.root)
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert!(names.contains(&"myVar".to_string()));
    assert!(names.contains(&"initiator".to_string()));
    assert!(names.contains(&"uuid".to_string()));
}

#[test]
fn test_argument_layer_is_outer() {
    let args = vec![declared("env", 40, TypeHint::String).with_origin(SymbolOrigin::Argument)];
    let sources: Vec<Arc<dyn SymbolSource>> = vec![
        Arc::new(DeclaredVariableSource::new(vec![declared("env", 5, TypeHint::Int)])),
        Arc::new(ArgumentSource::new(args)),
        Arc::new(BuiltinContextSource),
    ];
    let scope = Scope::new(sources);

    let result = resolve_source(&scope, "env");
    assert_eq!(result.symbol().map(|s| s.origin), Some(SymbolOrigin::SetStep));
}

// ============================================================================
// Locating nodes
// ============================================================================

#[test]
fn test_locate_property_name() {
    let parsed = parse_expression("initiator.username", 0);

    let at_name = locate(&parsed.root, 12).expect("node at offset");
    assert_eq!(at_name.name_span, Span::new(10, 18));

    let at_target = locate(&parsed.root, 3).expect("node at offset");
    assert_eq!(at_target.name_span, Span::new(0, 9));
}

#[test]
fn test_locate_collects_lambda_params() {
    let parsed = parse_expression("items.stream().map(x -> x.name)", 0);
    let offset = "items.stream().map(x -> x".len();

    let found = locate(&parsed.root, offset).expect("node at offset");
    let params: Vec<&str> = found.lambda_params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["x"]);
}
