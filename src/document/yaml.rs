//! Builds the document model from `marked-yaml` nodes.
//!
//! Markers only give start positions, so every range here is derived: an
//! entry runs from its key to the next key of the same mapping, a step from
//! its first key to the next step.

use std::collections::HashMap;

use marked_yaml::types::{MarkedMappingNode, MarkedScalarNode, MarkedSequenceNode};
use marked_yaml::{Marker, Node};
use tracing::trace;

use super::{declare_path, flow_doc, Branch, DocumentError, Flow, FlowDoc, Step, StepKind};
use crate::builtins;
use crate::schema::{Shape, TypeHint};
use crate::span::{LineIndex, Span};
use crate::symbol::{Declaration, Symbol, SymbolOrigin};

const BRANCH_KEYS: &[&str] = &["then", "else", "try", "error", "block", "parallel"];

/// Mapping entry with derived ranges.
struct Entry<'n> {
    key: &'n str,
    key_span: Span,
    value: &'n Node,
    span: Span,
}

struct Loader<'t> {
    text: &'t str,
    lines: &'t LineIndex,
    docs: HashMap<String, FlowDoc>,
}

pub(super) fn load(text: &str, lines: &LineIndex) -> Result<(Vec<Flow>, Vec<Symbol>), DocumentError> {
    let root = marked_yaml::parse_yaml(0, text).map_err(|e| DocumentError::Yaml(e.to_string()))?;
    let root = root.as_mapping().ok_or(DocumentError::NotAMapping)?;

    let mut loader = Loader {
        text,
        lines,
        docs: HashMap::new(),
    };
    let sections = loader.entries(root, text.len());

    let arguments = sections
        .iter()
        .find(|e| e.key == "configuration")
        .and_then(|e| e.value.as_mapping().map(|m| (e, m)))
        .and_then(|(e, configuration)| {
            loader
                .entries(configuration, e.span.end)
                .into_iter()
                .find(|a| a.key == "arguments")
        })
        .map(|arguments| loader.mapping_symbols(&arguments, SymbolOrigin::Argument))
        .unwrap_or_default();

    let mut flows = Vec::new();
    if let Some(section) = sections.iter().find(|e| e.key == "flows")
        && let Some(mapping) = section.value.as_mapping()
    {
        let entries = loader.entries(mapping, section.span.end);

        // Documentation first: `call:` steps take output types from callees
        for entry in &entries {
            let (line, _) = lines.position(text, entry.key_span.start);
            if let Some(doc) = flow_doc::parse_above(text, lines, line) {
                loader.docs.insert(entry.key.to_string(), doc);
            }
        }

        for entry in &entries {
            let steps = entry
                .value
                .as_sequence()
                .map(|seq| loader.steps(seq, entry.span.end))
                .unwrap_or_default();
            let doc = loader.docs.get(entry.key).cloned();
            let parameters = doc.as_ref().map(FlowDoc::input_symbols).unwrap_or_default();
            trace!(flow = entry.key, steps = steps.len(), "loaded flow");

            flows.push(Flow {
                name: entry.key.to_string(),
                key_span: entry.key_span,
                span: entry.span,
                steps,
                doc,
                parameters,
            });
        }
    }

    Ok((flows, arguments))
}

impl<'t> Loader<'t> {
    /// Offset of `needle` on the marker's line, closest to the marker's
    /// column. Quoted scalars start at the quote, so the marker alone is not
    /// precise enough.
    fn locate(&self, marker: Option<&Marker>, needle: &str) -> Option<usize> {
        let marker = marker?;
        let line_start = self.lines.line_start(marker.line())?;
        let line_end = self.lines.line_end(self.text, marker.line())?;
        let approx = self.lines.offset(self.text, marker.line(), marker.column())?;
        if needle.is_empty() {
            return Some(approx);
        }

        let line = &self.text[line_start..line_end];
        line.match_indices(needle)
            .map(|(i, _)| line_start + i)
            .min_by_key(|&i| i.abs_diff(approx))
            .or(Some(approx))
    }

    fn scalar_span(&self, scalar: &MarkedScalarNode) -> Option<Span> {
        let text = scalar.as_str();
        let start = self.locate(scalar.span().start(), text)?;
        let line_end = self.lines.line_end(self.text, self.lines.position(self.text, start).0)?;
        Some(Span::new(start, (start + text.len()).min(line_end).max(start)))
    }

    fn node_start(&self, node: &Node) -> Option<usize> {
        match node {
            Node::Scalar(scalar) => self.scalar_span(scalar).map(|s| s.start),
            Node::Mapping(mapping) => mapping
                .iter()
                .filter_map(|(key, _)| self.scalar_span(key).map(|s| s.start))
                .min()
                .or_else(|| self.locate(node.span().start(), "")),
            Node::Sequence(_) => self.locate(node.span().start(), ""),
        }
    }

    fn entries<'n>(&self, mapping: &'n MarkedMappingNode, end: usize) -> Vec<Entry<'n>> {
        let mut located: Vec<(&'n str, Span, &'n Node)> = mapping
            .iter()
            .filter_map(|(key, value)| Some((key.as_str(), self.scalar_span(key)?, value)))
            .collect();
        located.sort_by_key(|(_, span, _)| span.start);

        let starts: Vec<usize> = located.iter().map(|(_, span, _)| span.start).collect();
        located
            .into_iter()
            .enumerate()
            .map(|(i, (key, key_span, value))| {
                let next = starts.get(i + 1).copied().unwrap_or(end).max(key_span.end);
                Entry {
                    key,
                    key_span,
                    value,
                    span: Span::new(key_span.start, next),
                }
            })
            .collect()
    }

    fn steps(&self, sequence: &MarkedSequenceNode, end: usize) -> Vec<Step> {
        let starts: Vec<Option<usize>> = sequence.iter().map(|n| self.node_start(n)).collect();
        let mut steps = Vec::new();

        for (i, node) in sequence.iter().enumerate() {
            let Some(start) = starts[i] else {
                continue;
            };
            let next = starts[i + 1..]
                .iter()
                .flatten()
                .next()
                .copied()
                .unwrap_or(end)
                .max(start);
            steps.push(self.step(node, Span::new(start, next)));
        }
        steps
    }

    fn step(&self, node: &Node, span: Span) -> Step {
        let mut step = Step::new(span);
        let Some(mapping) = node.as_mapping() else {
            return step;
        };
        let entries = self.entries(mapping, span.end);
        step.kind = step_kind(&entries);

        for entry in &entries {
            match entry.key {
                "set" => {
                    if let Some(variables) = entry.value.as_mapping() {
                        for variable in self.entries(variables, entry.span.end) {
                            let symbol = self.value_symbol(&variable, SymbolOrigin::SetStep);
                            declare_path(&mut step.declarations, variable.key, symbol);
                        }
                    }
                }
                "out" => {
                    step.out_span = Some(entry.span);
                    self.out_declarations(&step.kind, entry, &mut step.declarations);
                }
                "loop" | "withItems" => step.has_loop = true,
                key if BRANCH_KEYS.contains(&key) => {
                    if let Some(branch) = self.branch(entry) {
                        step.branches.push(branch);
                    }
                }
                // Any other list under a switch is a case
                key if step.kind == StepKind::Switch && key != "switch" => {
                    if let Some(branch) = self.branch(entry) {
                        step.branches.push(branch);
                    }
                }
                _ => {}
            }
        }
        step
    }

    fn branch(&self, entry: &Entry<'_>) -> Option<Branch> {
        let sequence = entry.value.as_sequence()?;
        Some(Branch {
            label: entry.key.to_string(),
            span: entry.span,
            steps: self.steps(sequence, entry.span.end),
        })
    }

    fn out_declarations(&self, kind: &StepKind, entry: &Entry<'_>, out: &mut Vec<Symbol>) {
        let names: Vec<(&str, Span)> = match entry.value {
            Node::Scalar(name) => self.scalar_span(name).map(|s| (name.as_str(), s)).into_iter().collect(),
            Node::Sequence(items) => items
                .iter()
                .filter_map(|item| {
                    let name = item.as_scalar()?;
                    Some((name.as_str(), self.scalar_span(name)?))
                })
                .collect(),
            Node::Mapping(_) => {
                for symbol in self.mapping_symbols(entry, SymbolOrigin::StepOut) {
                    let name = symbol.name.clone();
                    declare_path(out, &name, symbol);
                }
                return;
            }
        };

        for (name, span) in names {
            let declared_at = Declaration::Document(span);
            let symbol = match kind {
                StepKind::Call(flow) => self
                    .docs
                    .get(flow)
                    .and_then(|doc| {
                        doc.output_symbols(SymbolOrigin::StepOut)
                            .into_iter()
                            .find(|s| s.name == name)
                    })
                    .map(|mut s| {
                        s.declared_at = declared_at;
                        s
                    })
                    .unwrap_or_else(|| {
                        Symbol::declared(name, declared_at, TypeHint::Unknown, SymbolOrigin::StepOut)
                    }),
                StepKind::Task(_) => {
                    let result = builtins::task_result();
                    let mut symbol =
                        Symbol::declared(name, declared_at, TypeHint::Object, SymbolOrigin::StepOut);
                    symbol.shape = result.shape.clone();
                    symbol
                }
                _ => Symbol::declared(name, declared_at, TypeHint::Unknown, SymbolOrigin::StepOut),
            };
            declare_path(out, name, symbol);
        }
    }

    /// Symbols for the keys of a mapping-valued entry.
    fn mapping_symbols(&self, entry: &Entry<'_>, origin: SymbolOrigin) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        if let Some(mapping) = entry.value.as_mapping() {
            for child in self.entries(mapping, entry.span.end) {
                let symbol = self.value_symbol(&child, origin);
                declare_path(&mut symbols, child.key, symbol);
            }
        }
        symbols
    }

    fn value_symbol(&self, entry: &Entry<'_>, origin: SymbolOrigin) -> Symbol {
        let (type_hint, shape) = self.infer(entry, origin);
        let mut symbol = Symbol::declared(
            entry.key,
            Declaration::Document(entry.key_span),
            type_hint,
            origin,
        );
        symbol.shape = shape;
        symbol
    }

    fn infer(&self, entry: &Entry<'_>, origin: SymbolOrigin) -> (TypeHint, Option<Shape>) {
        match entry.value {
            Node::Scalar(scalar) => (TypeHint::of_scalar(scalar.as_str()), None),
            Node::Sequence(_) => (TypeHint::Collection, None),
            Node::Mapping(_) => (
                TypeHint::Object,
                Some(Shape::object(self.mapping_symbols(entry, origin))),
            ),
        }
    }
}

fn step_kind(entries: &[Entry<'_>]) -> StepKind {
    let scalar = |entry: &Entry<'_>| {
        entry
            .value
            .as_scalar()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default()
    };

    for entry in entries {
        let kind = match entry.key {
            "task" => StepKind::Task(scalar(entry)),
            "call" => StepKind::Call(scalar(entry)),
            "set" => StepKind::Set,
            "if" => StepKind::If,
            "switch" => StepKind::Switch,
            "try" => StepKind::Try,
            "block" => StepKind::Block,
            "parallel" => StepKind::Parallel,
            _ => continue,
        };
        return kind;
    }
    StepKind::Other
}
