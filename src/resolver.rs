//! Resolution of expression nodes against a [`Scope`].

use std::sync::Arc;

use serde::Serialize;

use crate::ast::{Expr, ExprKind, Param};
use crate::scope::{LambdaParameterSource, Scope};
use crate::schema::{Shape, TypeHint};
use crate::span::Span;
use crate::symbol::{Declaration, Symbol, SymbolOrigin};

/// Outcome of resolving one node. Failing to resolve is not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "symbols", rename_all = "lowercase")]
pub enum ResolutionResult {
    Resolved(Symbol),
    /// Several declarations with conflicting types, from alternative shapes.
    Ambiguous(Vec<Symbol>),
    Unresolved,
}

impl ResolutionResult {
    /// The resolved symbol, or the first candidate of an ambiguous result.
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            ResolutionResult::Resolved(symbol) => Some(symbol),
            ResolutionResult::Ambiguous(symbols) => symbols.first(),
            ResolutionResult::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionResult::Resolved(_))
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, ResolutionResult::Unresolved)
    }

    fn from_candidates(candidates: Vec<&Symbol>) -> ResolutionResult {
        match candidates.as_slice() {
            [] => ResolutionResult::Unresolved,
            [only] => ResolutionResult::Resolved((*only).clone()),
            [first, rest @ ..] => {
                if rest.iter().all(|s| s.type_hint == first.type_hint) {
                    let mut symbol = (*first).clone();
                    symbol.shape = merged_shape(candidates.iter().copied());
                    ResolutionResult::Resolved(symbol)
                } else {
                    ResolutionResult::Ambiguous(candidates.iter().map(|s| (*s).clone()).collect())
                }
            }
        }
    }
}

fn merged_shape<'s>(symbols: impl Iterator<Item = &'s Symbol>) -> Option<Shape> {
    symbols
        .filter_map(|s| s.shape.clone())
        .reduce(Shape::merge)
}

/// Resolves an identifier, property access or call to its declaration.
///
/// A call resolves through its callee: `uuid()` to the built-in function,
/// `context.eval(x)` to the `eval` property of `context`. Index access and
/// anything whose target has no known shape stays unresolved.
pub fn resolve(scope: &Scope, node: &Expr) -> ResolutionResult {
    match &node.kind {
        ExprKind::Identifier(name) => match scope.lookup(name) {
            Some(symbol) => ResolutionResult::Resolved(symbol.clone()),
            None => ResolutionResult::Unresolved,
        },
        ExprKind::Call { target, .. } => match &target.kind {
            ExprKind::Identifier(name) => scope
                .lookup(name)
                .or_else(|| scope.function(name))
                .map(|symbol| ResolutionResult::Resolved(symbol.clone()))
                .unwrap_or(ResolutionResult::Unresolved),
            _ => resolve(scope, target),
        },
        ExprKind::Property {
            target,
            name: Some(name),
            ..
        } => match shape_of(scope, target) {
            Some(shape) => ResolutionResult::from_candidates(shape.lookup(name)),
            None => ResolutionResult::Unresolved,
        },
        _ => ResolutionResult::Unresolved,
    }
}

/// Statically known shape of the value `node` evaluates to.
pub fn shape_of(scope: &Scope, node: &Expr) -> Option<Shape> {
    match &node.kind {
        ExprKind::Identifier(_) | ExprKind::Property { .. } => match resolve(scope, node) {
            ResolutionResult::Resolved(symbol) => symbol.shape,
            ResolutionResult::Ambiguous(symbols) => merged_shape(symbols.iter()),
            ResolutionResult::Unresolved => None,
        },
        // Call results and indexed elements have no static shape
        _ => None,
    }
}

/// Completion candidates for `node`, not filtered by prefix.
///
/// At a name: every visible symbol plus the built-in functions. After a dot:
/// the properties of the target's shape.
pub fn candidates(scope: &Scope, node: &Expr) -> Vec<Symbol> {
    match &node.kind {
        ExprKind::Property { target, .. } => shape_of(scope, target)
            .map(|shape| shape.properties().into_iter().cloned().collect())
            .unwrap_or_default(),
        ExprKind::Identifier(_) | ExprKind::Error => scope_candidates(scope),
        ExprKind::Call { target, .. } if matches!(target.kind, ExprKind::Identifier(_)) => {
            scope_candidates(scope)
        }
        _ => Vec::new(),
    }
}

/// Every visible symbol and the built-in functions.
pub fn scope_candidates(scope: &Scope) -> Vec<Symbol> {
    let mut found: Vec<Symbol> = scope.symbols().into_iter().cloned().collect();
    for function in scope.functions() {
        if !found.iter().any(|s| s.name == function.name) {
            found.push(function.clone());
        }
    }
    found
}

/// A node naming a symbol, with the lambda parameters in scope there.
#[derive(Debug, Clone)]
pub struct Reference<'a> {
    pub node: &'a Expr,
    /// The identifier, or the property name of an access.
    pub name_span: Span,
    pub lambda_params: Vec<&'a Param>,
}

/// Scope extended with the lambda parameters of `params`, outermost first.
pub fn with_lambda_params(scope: &Scope, params: &[&Param]) -> Scope {
    if params.is_empty() {
        return scope.clone();
    }
    let symbols = params
        .iter()
        .map(|param| {
            Symbol::declared(
                param.name.clone(),
                Declaration::Document(param.span),
                TypeHint::Unknown,
                SymbolOrigin::LambdaParameter,
            )
        })
        .collect();
    scope.with_innermost(Arc::new(LambdaParameterSource::new(symbols)))
}

/// Finds the innermost identifier, property access or built-in call at
/// `offset`. Ranges include their end so a cursor right after a name still
/// hits it.
pub fn locate(root: &Expr, offset: usize) -> Option<Reference<'_>> {
    let mut lambdas: Vec<&[Param]> = Vec::new();
    let found = locate_in(root, offset, &mut lambdas)?;
    Some(Reference {
        node: found.0,
        name_span: found.1,
        lambda_params: lambdas.iter().flat_map(|params| params.iter()).collect(),
    })
}

fn locate_in<'a>(
    node: &'a Expr,
    offset: usize,
    lambdas: &mut Vec<&'a [Param]>,
) -> Option<(&'a Expr, Span)> {
    if !node.span.touches(offset) {
        return None;
    }

    match &node.kind {
        ExprKind::Identifier(_) | ExprKind::Error => Some((node, node.span)),
        ExprKind::Property {
            target, name_span, ..
        } => {
            if name_span.touches(offset) {
                return Some((node, *name_span));
            }
            locate_in(target, offset, lambdas)
        }
        ExprKind::Call { target, args } => {
            if let ExprKind::Identifier(_) = target.kind
                && target.span.touches(offset)
            {
                return Some((node, target.span));
            }
            locate_in(target, offset, lambdas)
                .or_else(|| args.iter().find_map(|arg| locate_in(arg, offset, lambdas)))
        }
        ExprKind::Lambda { params, body } => {
            lambdas.push(params);
            let found = locate_in(body, offset, lambdas);
            if found.is_none() {
                lambdas.pop();
            }
            found
        }
        _ => node
            .children()
            .into_iter()
            .find_map(|child| locate_in(child, offset, lambdas)),
    }
}

/// Every reference site in the tree: identifiers, named property accesses
/// and calls of bare names, in source order.
pub fn references(root: &Expr) -> Vec<Reference<'_>> {
    let mut found = Vec::new();
    collect_references(root, &mut Vec::new(), &mut found);
    found
}

fn collect_references<'a>(
    node: &'a Expr,
    lambdas: &mut Vec<&'a Param>,
    found: &mut Vec<Reference<'a>>,
) {
    match &node.kind {
        ExprKind::Identifier(_) => found.push(Reference {
            node,
            name_span: node.span,
            lambda_params: lambdas.clone(),
        }),
        ExprKind::Property {
            target,
            name,
            name_span,
        } => {
            collect_references(target, lambdas, found);
            if name.is_some() {
                found.push(Reference {
                    node,
                    name_span: *name_span,
                    lambda_params: lambdas.clone(),
                });
            }
        }
        ExprKind::Call { target, args } => {
            if let ExprKind::Identifier(_) = target.kind {
                found.push(Reference {
                    node,
                    name_span: target.span,
                    lambda_params: lambdas.clone(),
                });
            } else {
                collect_references(target, lambdas, found);
            }
            for arg in args {
                collect_references(arg, lambdas, found);
            }
        }
        ExprKind::Lambda { params, body } => {
            let depth = lambdas.len();
            lambdas.extend(params);
            collect_references(body, lambdas, found);
            lambdas.truncate(depth);
        }
        _ => {
            for child in node.children() {
                collect_references(child, lambdas, found);
            }
        }
    }
}
