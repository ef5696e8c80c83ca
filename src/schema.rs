//! Type hints and statically known object shapes.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::symbol::Symbol;

/// Coarse static type of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeHint {
    String,
    Int,
    Boolean,
    Number,
    Object,
    Collection,
    Map,
    Unknown,
}

impl TypeHint {
    /// Maps a type name used in flow documentation (`string`, `int`,
    /// `string[]`, ...) to a hint. Unknown names map to `Unknown`.
    pub fn from_doc_type(name: &str) -> TypeHint {
        let name = name.trim();
        if name.ends_with("[]") {
            return TypeHint::Collection;
        }
        match name.to_lowercase().as_str() {
            "string" => TypeHint::String,
            "int" | "integer" | "long" => TypeHint::Int,
            "number" | "float" | "double" | "decimal" => TypeHint::Number,
            "boolean" | "bool" => TypeHint::Boolean,
            "object" => TypeHint::Object,
            "map" => TypeHint::Map,
            "array" | "list" => TypeHint::Collection,
            _ => TypeHint::Unknown,
        }
    }

    /// Type of a plain YAML scalar as YAML would read it. Scalars containing
    /// an expression have no static type.
    pub fn of_scalar(text: &str) -> TypeHint {
        let text = text.trim();
        if text.contains("${") {
            return TypeHint::Unknown;
        }
        match text {
            "" | "~" | "null" | "Null" | "NULL" => TypeHint::Unknown,
            "true" | "false" | "True" | "False" | "TRUE" | "FALSE" => TypeHint::Boolean,
            _ if text.parse::<i64>().is_ok() => TypeHint::Int,
            _ if text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.')
                && text.parse::<f64>().is_ok() =>
            {
                TypeHint::Number
            }
            _ => TypeHint::String,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TypeHint::String => "string",
            TypeHint::Int => "int",
            TypeHint::Boolean => "boolean",
            TypeHint::Number => "number",
            TypeHint::Object => "object",
            TypeHint::Collection => "collection",
            TypeHint::Map => "map",
            TypeHint::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Property surface of an object-typed symbol.
///
/// `Composite` holds alternatives: a variable declared in both branches of an
/// `if` step has whichever shape the taken branch gave it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Object(BTreeMap<String, Symbol>),
    Composite(Vec<Shape>),
}

impl Shape {
    pub fn object(properties: impl IntoIterator<Item = Symbol>) -> Shape {
        Shape::Object(
            properties
                .into_iter()
                .map(|symbol| (symbol.name.clone(), symbol))
                .collect(),
        )
    }

    /// Every declaration of `name` across alternatives.
    pub fn lookup(&self, name: &str) -> Vec<&Symbol> {
        match self {
            Shape::Object(properties) => properties.get(name).into_iter().collect(),
            Shape::Composite(alternatives) => {
                let mut found: Vec<&Symbol> = Vec::new();
                for symbol in alternatives.iter().flat_map(|alt| alt.lookup(name)) {
                    if !found.iter().any(|f| f.declared_at == symbol.declared_at) {
                        found.push(symbol);
                    }
                }
                found
            }
        }
    }

    /// All properties, first alternative winning on name clashes.
    pub fn properties(&self) -> Vec<&Symbol> {
        match self {
            Shape::Object(properties) => properties.values().collect(),
            Shape::Composite(alternatives) => {
                let mut seen: Vec<&Symbol> = Vec::new();
                for symbol in alternatives.iter().flat_map(Shape::properties) {
                    if !seen.iter().any(|s| s.name == symbol.name) {
                        seen.push(symbol);
                    }
                }
                seen
            }
        }
    }

    /// Combines two alternative shapes, flattening nested composites.
    pub fn merge(self, other: Shape) -> Shape {
        let mut alternatives = Vec::new();
        for shape in [self, other] {
            match shape {
                Shape::Composite(inner) => alternatives.extend(inner),
                shape => alternatives.push(shape),
            }
        }
        Shape::Composite(alternatives)
    }

    /// Adds `symbol` under the dotted `path` below this shape, creating
    /// intermediate objects as needed. Composite shapes are left untouched.
    pub fn insert_path(&mut self, path: &[&str], symbol: Symbol) {
        let Shape::Object(properties) = self else {
            return;
        };
        match path {
            [] => {}
            [last] => {
                properties.insert((*last).to_string(), symbol);
            }
            [head, rest @ ..] => {
                let entry = properties.entry((*head).to_string()).or_insert_with(|| {
                    Symbol::declared(
                        *head,
                        symbol.declared_at,
                        TypeHint::Object,
                        symbol.origin,
                    )
                });
                entry.type_hint = TypeHint::Object;
                entry
                    .shape
                    .get_or_insert_with(|| Shape::Object(BTreeMap::new()))
                    .insert_path(rest, symbol);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;
    use crate::symbol::{Declaration, SymbolOrigin};

    #[test]
    fn test_scalar_types() {
        assert_eq!(TypeHint::of_scalar("42"), TypeHint::Int);
        assert_eq!(TypeHint::of_scalar("4.2"), TypeHint::Number);
        assert_eq!(TypeHint::of_scalar("true"), TypeHint::Boolean);
        assert_eq!(TypeHint::of_scalar("inf"), TypeHint::String);
        assert_eq!(TypeHint::of_scalar("${x}"), TypeHint::Unknown);
        assert_eq!(TypeHint::of_scalar("hello"), TypeHint::String);
    }

    #[test]
    fn test_doc_types() {
        assert_eq!(TypeHint::from_doc_type("string[]"), TypeHint::Collection);
        assert_eq!(TypeHint::from_doc_type("int"), TypeHint::Int);
        assert_eq!(TypeHint::from_doc_type("any"), TypeHint::Unknown);
    }

    #[test]
    fn test_insert_path_builds_nested_objects() {
        let span = Declaration::Document(Span::new(0, 5));
        let leaf = Symbol::declared("c", span, TypeHint::Int, SymbolOrigin::SetStep);
        let mut shape = Shape::Object(BTreeMap::new());
        shape.insert_path(&["b", "c"], leaf);

        let b = shape.lookup("b");
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].type_hint, TypeHint::Object);
        let c = b[0].shape.as_ref().map(|s| s.lookup("c")).unwrap_or_default();
        assert_eq!(c[0].type_hint, TypeHint::Int);
    }
}
