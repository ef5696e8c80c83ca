use serde::Serialize;

use crate::schema::{Shape, TypeHint};
use crate::span::Span;

/// Where a symbol is declared: inside the analyzed document, or nowhere
/// (provided by the runtime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Declaration {
    Builtin,
    Document(Span),
}

impl Declaration {
    pub fn span(&self) -> Option<Span> {
        match self {
            Declaration::Builtin => None,
            Declaration::Document(span) => Some(*span),
        }
    }
}

/// Which kind of source declared a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolOrigin {
    Builtin,
    BuiltinFunction,
    Argument,
    FlowParameter,
    SetStep,
    StepOut,
    Loop,
    TaskResult,
    LambdaParameter,
}

/// A named declaration visible to expressions.
///
/// Symbols are plain values: `declared_at` holds offsets into the snapshot
/// they were built from, never a handle into a live document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub declared_at: Declaration,
    pub type_hint: TypeHint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    pub origin: SymbolOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
}

impl Symbol {
    pub fn builtin(name: &str, type_hint: TypeHint, documentation: &str) -> Self {
        Symbol {
            name: name.to_string(),
            declared_at: Declaration::Builtin,
            type_hint,
            documentation: Some(documentation.to_string()),
            origin: SymbolOrigin::Builtin,
            shape: None,
        }
    }

    pub fn declared(
        name: impl Into<String>,
        declared_at: Declaration,
        type_hint: TypeHint,
        origin: SymbolOrigin,
    ) -> Self {
        Symbol {
            name: name.into(),
            declared_at,
            type_hint,
            documentation: None,
            origin,
            shape: None,
        }
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn with_origin(mut self, origin: SymbolOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        let documentation = documentation.into();
        if !documentation.is_empty() {
            self.documentation = Some(documentation);
        }
        self
    }

    pub fn is_builtin(&self) -> bool {
        self.declared_at == Declaration::Builtin
    }

    pub fn declaration_span(&self) -> Option<Span> {
        self.declared_at.span()
    }
}
