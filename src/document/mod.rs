//! Structural model of a Concord YAML document.
//!
//! The model records what scope building needs and nothing more: flows with
//! their documentation, steps with the variables they declare and the branch
//! bodies they own, and `configuration.arguments`. Every element carries byte
//! offsets into the text it was built from.

pub mod embedded;
pub mod flow_doc;
mod scalars;
mod yaml;

use thiserror::Error;
use tracing::{debug, warn};

use crate::schema::{Shape, TypeHint};
use crate::span::{LineIndex, Span};
use crate::symbol::{Declaration, Symbol};

pub use embedded::EmbeddedExpression;
pub use flow_doc::{FlowDoc, FlowParam};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentError {
    #[error("invalid YAML: {0}")]
    Yaml(String),

    #[error("document root must be a mapping")]
    NotAMapping,
}

/// Immutable snapshot of a document and its structure.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    lines: LineIndex,
    flows: Vec<Flow>,
    arguments: Vec<Symbol>,
    expressions: Vec<EmbeddedExpression>,
    load_error: Option<DocumentError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub name: String,
    pub key_span: Span,
    /// From the flow key to the start of the next flow (or the end of the
    /// enclosing section).
    pub span: Span,
    pub steps: Vec<Step>,
    pub doc: Option<FlowDoc>,
    /// Input parameters from the documentation comment.
    pub parameters: Vec<Symbol>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Task(String),
    Call(String),
    Set,
    If,
    Switch,
    Try,
    Block,
    Parallel,
    Other,
}

impl StepKind {
    /// Only one of the branches runs.
    pub fn is_exclusive(&self) -> bool {
        matches!(self, StepKind::If | StepKind::Switch | StepKind::Try)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub kind: StepKind,
    pub span: Span,
    /// Variables the step declares through `set:` or `out:`.
    pub declarations: Vec<Symbol>,
    /// Range of the `out:` entry.
    pub out_span: Option<Span>,
    /// `loop:` or `withItems:` present.
    pub has_loop: bool,
    pub branches: Vec<Branch>,
}

/// Nested step list owned by a step: `then`, `else`, `try`, `error`,
/// `block`, `parallel` or a `switch` case.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub label: String,
    pub span: Span,
    pub steps: Vec<Step>,
}

impl Step {
    fn new(span: Span) -> Self {
        Step {
            kind: StepKind::Other,
            span,
            declarations: Vec::new(),
            out_span: None,
            has_loop: false,
            branches: Vec::new(),
        }
    }

    pub fn is_task(&self) -> bool {
        matches!(self.kind, StepKind::Task(_))
    }
}

impl Document {
    /// Builds the model. Invalid YAML is recorded in [`Document::load_error`]
    /// and leaves the structure empty, so only built-ins resolve.
    pub fn parse(text: impl Into<String>) -> Document {
        let text = text.into();
        match Self::build(text.clone()) {
            Ok(document) => document,
            Err(err) => {
                warn!(error = %err, "document structure unavailable");
                let mut document = Self::empty(text);
                document.load_error = Some(err);
                document
            }
        }
    }

    /// Like [`Document::parse`] but fails on invalid YAML.
    pub fn try_parse(text: impl Into<String>) -> Result<Document, DocumentError> {
        Self::build(text.into())
    }

    fn empty(text: String) -> Document {
        Document {
            lines: LineIndex::new(&text),
            expressions: embedded::scan(&text),
            text,
            flows: Vec::new(),
            arguments: Vec::new(),
            load_error: None,
        }
    }

    fn build(text: String) -> Result<Document, DocumentError> {
        let mut document = Self::empty(text);
        if document.text.trim().is_empty() {
            return Ok(document);
        }

        let (flows, arguments) = yaml::load(&document.text, &document.lines)?;
        debug!(
            flows = flows.len(),
            arguments = arguments.len(),
            expressions = document.expressions.len(),
            "loaded document"
        );
        document.flows = flows;
        document.arguments = arguments;
        Ok(document)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    /// 1-based `(line, column)` of a byte offset.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        self.lines.position(&self.text, offset)
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn flow(&self, name: &str) -> Option<&Flow> {
        self.flows.iter().find(|f| f.name == name)
    }

    pub fn flow_at(&self, offset: usize) -> Option<&Flow> {
        self.flows
            .iter()
            .find(|f| f.span.contains(offset))
            .or_else(|| self.flows.last().filter(|f| f.span.end == offset))
    }

    /// `configuration.arguments`.
    pub fn arguments(&self) -> &[Symbol] {
        &self.arguments
    }

    pub fn expressions(&self) -> &[EmbeddedExpression] {
        &self.expressions
    }

    /// Source of an embedded expression, delimiters excluded and YAML
    /// quoting decoded.
    pub fn expression_source<'e>(&self, expression: &'e EmbeddedExpression) -> &'e str {
        &expression.source
    }

    pub fn load_error(&self) -> Option<&DocumentError> {
        self.load_error.as_ref()
    }

    /// Every symbol declared in the document: arguments, flow parameters and
    /// step declarations, in document order.
    pub fn declarations(&self) -> Vec<&Symbol> {
        fn collect<'d>(steps: &'d [Step], out: &mut Vec<&'d Symbol>) {
            for step in steps {
                out.extend(&step.declarations);
                for branch in &step.branches {
                    collect(&branch.steps, out);
                }
            }
        }

        let mut found: Vec<&Symbol> = self.arguments.iter().collect();
        for flow in &self.flows {
            found.extend(&flow.parameters);
            collect(&flow.steps, &mut found);
        }
        found
    }
}

/// Adds `symbol`, declared under a possibly dotted `path`, to `symbols`.
///
/// `a.b.c` declares `a` as an object whose shape holds `b`, which holds `c`.
/// A plain name replaces an earlier declaration of the same name but keeps
/// the properties dotted entries gave it. A path with an empty segment, such
/// as `a.` or `a..b`, is a plain name.
pub(crate) fn declare_path(symbols: &mut Vec<Symbol>, path: &str, mut symbol: Symbol) {
    let mut segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        segments = vec![path];
    }
    let Some((root, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        symbol.name = path.to_string();
        match symbols.iter_mut().find(|s| s.name == *root) {
            Some(existing) => {
                let properties = existing.shape.take();
                *existing = symbol;
                if existing.shape.is_none() {
                    existing.shape = properties;
                }
            }
            None => symbols.push(symbol),
        }
        return;
    }

    let root_declared = match symbol.declared_at {
        Declaration::Document(span) => {
            Declaration::Document(Span::new(span.start, span.start + root.len().min(span.len())))
        }
        Declaration::Builtin => Declaration::Builtin,
    };
    if let Some(last) = rest.last() {
        symbol.name = (*last).to_string();
    }

    let index = match symbols.iter().position(|s| s.name == *root) {
        Some(index) => index,
        None => {
            symbols.push(Symbol::declared(
                *root,
                root_declared,
                TypeHint::Object,
                symbol.origin,
            ));
            symbols.len() - 1
        }
    };
    let owner = &mut symbols[index];
    owner.type_hint = TypeHint::Object;
    owner
        .shape
        .get_or_insert_with(|| Shape::object([]))
        .insert_path(rest, symbol);
}
