//! Layered symbol scopes.
//!
//! A [`Scope`] is an ordered stack of [`SymbolSource`]s, innermost first.
//! Lookups walk the stack and stop at the first hit, so inner declarations
//! shadow outer ones.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::builtins;
use crate::config::Settings;
use crate::document::{Document, Step};
use crate::schema::{Shape, TypeHint};
use crate::symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    LambdaParameter,
    TaskResult,
    Loop,
    DeclaredVariable,
    FlowParameter,
    Argument,
    BuiltinContext,
}

/// One level of name-to-declaration mappings.
pub trait SymbolSource: fmt::Debug + Send + Sync {
    fn kind(&self) -> SourceKind;

    fn lookup(&self, name: &str) -> Option<&Symbol>;

    fn list(&self) -> Vec<&Symbol>;
}

fn find<'s>(symbols: &'s [Symbol], name: &str) -> Option<&'s Symbol> {
    symbols.iter().find(|s| s.name == name)
}

/// Runtime-provided variables: `initiator`, `context`, `projectInfo`, ...
#[derive(Debug, Default)]
pub struct BuiltinContextSource;

impl SymbolSource for BuiltinContextSource {
    fn kind(&self) -> SourceKind {
        SourceKind::BuiltinContext
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        builtins::variable(name)
    }

    fn list(&self) -> Vec<&Symbol> {
        builtins::variables().iter().collect()
    }
}

/// `item` and `itemIndex` inside a looping step.
#[derive(Debug, Default)]
pub struct LoopSource;

impl SymbolSource for LoopSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Loop
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        find(builtins::loop_variables(), name)
    }

    fn list(&self) -> Vec<&Symbol> {
        builtins::loop_variables().iter().collect()
    }
}

/// `result` inside a task step's `out:` block.
#[derive(Debug, Default)]
pub struct TaskResultSource;

impl SymbolSource for TaskResultSource {
    fn kind(&self) -> SourceKind {
        SourceKind::TaskResult
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        Some(builtins::task_result()).filter(|s| s.name == name)
    }

    fn list(&self) -> Vec<&Symbol> {
        vec![builtins::task_result()]
    }
}

/// Variables declared by `set:` and `out:` of steps that run earlier.
#[derive(Debug, Default)]
pub struct DeclaredVariableSource {
    symbols: Vec<Symbol>,
}

impl DeclaredVariableSource {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        DeclaredVariableSource { symbols }
    }
}

impl SymbolSource for DeclaredVariableSource {
    fn kind(&self) -> SourceKind {
        SourceKind::DeclaredVariable
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        find(&self.symbols, name)
    }

    fn list(&self) -> Vec<&Symbol> {
        self.symbols.iter().collect()
    }
}

/// Input parameters from the enclosing flow's documentation comment.
#[derive(Debug)]
pub struct FlowParameterSource {
    flow: String,
    symbols: Vec<Symbol>,
}

impl FlowParameterSource {
    pub fn new(flow: impl Into<String>, symbols: Vec<Symbol>) -> Self {
        FlowParameterSource {
            flow: flow.into(),
            symbols,
        }
    }

    pub fn flow(&self) -> &str {
        &self.flow
    }
}

impl SymbolSource for FlowParameterSource {
    fn kind(&self) -> SourceKind {
        SourceKind::FlowParameter
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        find(&self.symbols, name)
    }

    fn list(&self) -> Vec<&Symbol> {
        self.symbols.iter().collect()
    }
}

/// `configuration.arguments`.
#[derive(Debug, Default)]
pub struct ArgumentSource {
    symbols: Vec<Symbol>,
}

impl ArgumentSource {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        ArgumentSource { symbols }
    }
}

impl SymbolSource for ArgumentSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Argument
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        find(&self.symbols, name)
    }

    fn list(&self) -> Vec<&Symbol> {
        self.symbols.iter().collect()
    }
}

/// Parameters of the lambdas enclosing the analyzed node.
#[derive(Debug, Default)]
pub struct LambdaParameterSource {
    symbols: Vec<Symbol>,
}

impl LambdaParameterSource {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        LambdaParameterSource { symbols }
    }
}

impl SymbolSource for LambdaParameterSource {
    fn kind(&self) -> SourceKind {
        SourceKind::LambdaParameter
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        // Inner lambdas are pushed last and shadow outer parameters
        self.symbols.iter().rev().find(|s| s.name == name)
    }

    fn list(&self) -> Vec<&Symbol> {
        self.symbols.iter().rev().collect()
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    sources: Vec<Arc<dyn SymbolSource>>,
    functions: bool,
}

impl Scope {
    /// `sources` must be ordered innermost first.
    pub fn new(sources: Vec<Arc<dyn SymbolSource>>) -> Self {
        Scope {
            sources,
            functions: true,
        }
    }

    pub fn builtins_only() -> Self {
        Scope::new(vec![Arc::new(BuiltinContextSource)])
    }

    pub fn without_functions(mut self) -> Self {
        self.functions = false;
        self
    }

    /// A copy of this scope with `source` pushed in front.
    pub fn with_innermost(&self, source: Arc<dyn SymbolSource>) -> Scope {
        let mut sources = Vec::with_capacity(self.sources.len() + 1);
        sources.push(source);
        sources.extend(self.sources.iter().cloned());
        Scope {
            sources,
            functions: self.functions,
        }
    }

    pub fn sources(&self) -> &[Arc<dyn SymbolSource>] {
        &self.sources
    }

    /// First declaration of `name`, innermost first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.sources.iter().find_map(|source| source.lookup(name))
    }

    /// Every visible symbol once, the innermost declaration winning.
    pub fn symbols(&self) -> Vec<&Symbol> {
        let mut seen: Vec<&Symbol> = Vec::new();
        for symbol in self.sources.iter().flat_map(|source| source.list()) {
            if !seen.iter().any(|s| s.name == symbol.name) {
                seen.push(symbol);
            }
        }
        seen
    }

    /// Shape of the first symbol named `name`, if any.
    pub fn shape_of(&self, name: &str) -> Option<&Shape> {
        self.lookup(name).and_then(|s| s.shape.as_ref())
    }

    pub fn function(&self, name: &str) -> Option<&'static Symbol> {
        if self.functions {
            builtins::function(name)
        } else {
            None
        }
    }

    pub fn functions(&self) -> &'static [Symbol] {
        if self.functions {
            builtins::functions()
        } else {
            &[]
        }
    }
}

/// Scope visible at byte `offset` of `document`.
///
/// Sources, innermost first: task `result` (inside a task's `out:`), loop
/// variables of enclosing steps, declarations of earlier steps at each
/// nesting level walking outward, flow parameters, arguments, built-ins.
/// Lambda parameters depend on the expression tree and are added by the
/// caller.
pub fn build_scope(document: &Document, offset: usize, settings: &Settings) -> Scope {
    // Built outermost first, reversed at the end
    let mut layers: Vec<Arc<dyn SymbolSource>> = vec![Arc::new(BuiltinContextSource)];

    if settings.include_arguments && !document.arguments().is_empty() {
        layers.push(Arc::new(ArgumentSource::new(document.arguments().to_vec())));
    }

    if let Some(flow) = document.flow_at(offset) {
        trace!(flow = %flow.name, offset, "building scope");
        if !flow.parameters.is_empty() {
            layers.push(Arc::new(FlowParameterSource::new(
                flow.name.clone(),
                flow.parameters.clone(),
            )));
        }
        visit_steps(&flow.steps, offset, settings, &mut layers);
    }

    layers.reverse();
    let scope = Scope::new(layers);
    if settings.builtin_functions {
        scope
    } else {
        scope.without_functions()
    }
}

fn visit_steps(
    steps: &[Step],
    offset: usize,
    settings: &Settings,
    layers: &mut Vec<Arc<dyn SymbolSource>>,
) {
    let current = steps.iter().position(|s| s.span.contains(offset)).or_else(|| {
        steps
            .last()
            .filter(|s| s.span.end == offset)
            .map(|_| steps.len() - 1)
    });
    let earlier = match current {
        Some(index) => &steps[..index],
        None => {
            let count = steps.iter().take_while(|s| s.span.end <= offset).count();
            &steps[..count]
        }
    };

    let mut declared = Vec::new();
    for step in earlier {
        collect_declarations(step, settings, &mut declared);
    }
    if !declared.is_empty() {
        layers.push(Arc::new(DeclaredVariableSource::new(declared)));
    }

    let Some(step) = current.map(|index| &steps[index]) else {
        return;
    };
    if step.has_loop {
        layers.push(Arc::new(LoopSource));
    }
    if step.is_task() && step.out_span.is_some_and(|span| span.touches(offset)) {
        layers.push(Arc::new(TaskResultSource));
    }
    if let Some(branch) = step.branches.iter().find(|b| b.span.touches(offset)) {
        visit_steps(&branch.steps, offset, settings, layers);
    }
}

/// Later declarations replace earlier ones of the same name.
fn declare(symbols: &mut Vec<Symbol>, symbol: Symbol) {
    symbols.retain(|s| s.name != symbol.name);
    symbols.push(symbol);
}

fn collect_declarations(step: &Step, settings: &Settings, out: &mut Vec<Symbol>) {
    if settings.branch_declarations {
        if step.kind.is_exclusive() {
            let alternatives: Vec<Vec<Symbol>> = step
                .branches
                .iter()
                .map(|branch| {
                    let mut declared = Vec::new();
                    for inner in &branch.steps {
                        collect_declarations(inner, settings, &mut declared);
                    }
                    declared
                })
                .collect();
            for symbol in merge_alternatives(alternatives) {
                declare(out, symbol);
            }
        } else {
            for inner in step.branches.iter().flat_map(|b| &b.steps) {
                collect_declarations(inner, settings, out);
            }
        }
    }

    for symbol in &step.declarations {
        declare(out, symbol.clone());
    }
}

/// Folds per-branch declarations of an exclusive step. A name declared in
/// several branches keeps its first declaration; shapes become alternatives
/// and disagreeing types become `Unknown`.
fn merge_alternatives(alternatives: Vec<Vec<Symbol>>) -> Vec<Symbol> {
    let mut merged: Vec<Symbol> = Vec::new();
    for symbol in alternatives.into_iter().flatten() {
        let Some(existing) = merged.iter_mut().find(|s| s.name == symbol.name) else {
            merged.push(symbol);
            continue;
        };
        if existing.type_hint != symbol.type_hint {
            existing.type_hint = TypeHint::Unknown;
        }
        existing.shape = match (existing.shape.take(), symbol.shape) {
            (Some(a), Some(b)) => Some(a.merge(b)),
            (a, b) => a.or(b),
        };
        if existing.shape.is_some() && existing.type_hint == TypeHint::Unknown {
            existing.type_hint = TypeHint::Object;
        }
    }
    merged
}
