//! Flow documentation comments.
//!
//! A flow may be documented by a `##`-delimited comment block placed right
//! above its key:
//!
//! ```yaml
//! flows:
//!   ##
//!   # Process S3 files
//!   # in:
//!   #   s3Bucket: string, mandatory, S3 bucket name
//!   #   config.region: string, optional, AWS region
//!   # out:
//!   #   processed: int, mandatory, Files processed count
//!   ##
//!   processS3:
//!     - task: s3
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::TypeHint;
use crate::span::{LineIndex, Span};
use crate::symbol::{Declaration, Symbol, SymbolOrigin};

static PARAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\s*:\s*([^,]*?)\s*(?:,\s*([A-Za-z]+)\s*)?(?:,\s*(.*?))?\s*$")
        .expect("valid parameter regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct FlowDoc {
    pub description: String,
    pub inputs: Vec<FlowParam>,
    pub outputs: Vec<FlowParam>,
    /// From the opening `##` to the end of the closing one.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowParam {
    /// Possibly dotted (`config.region`).
    pub name: String,
    pub name_span: Span,
    pub type_name: String,
    pub mandatory: bool,
    pub description: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Description,
    In,
    Out,
}

impl FlowParam {
    pub fn type_hint(&self) -> TypeHint {
        TypeHint::from_doc_type(&self.type_name)
    }

    pub fn symbol(&self, origin: SymbolOrigin) -> Symbol {
        let requirement = if self.mandatory { "mandatory" } else { "optional" };
        let mut doc = format!("{} ({})", self.type_name, requirement);
        if !self.description.is_empty() {
            doc.push_str(": ");
            doc.push_str(&self.description);
        }
        Symbol::declared(
            self.name.clone(),
            Declaration::Document(self.name_span),
            self.type_hint(),
            origin,
        )
        .with_documentation(doc)
    }
}

impl FlowDoc {
    /// Input parameters as symbols, dotted names folded into object shapes.
    pub fn input_symbols(&self) -> Vec<Symbol> {
        fold_params(&self.inputs, SymbolOrigin::FlowParameter)
    }

    pub fn output_symbols(&self, origin: SymbolOrigin) -> Vec<Symbol> {
        fold_params(&self.outputs, origin)
    }
}

fn fold_params(params: &[FlowParam], origin: SymbolOrigin) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    for param in params {
        super::declare_path(&mut symbols, &param.name, param.symbol(origin));
    }
    symbols
}

/// Parses the documentation block ending right above 1-based line `key_line`.
pub fn parse_above(text: &str, lines: &LineIndex, key_line: usize) -> Option<FlowDoc> {
    let closing = key_line.checked_sub(1).filter(|&l| l >= 1)?;
    if line_text(text, lines, closing)?.trim() != "##" {
        return None;
    }

    let mut opening = closing;
    loop {
        opening = opening.checked_sub(1).filter(|&l| l >= 1)?;
        let line = line_text(text, lines, opening)?.trim();
        if line == "##" {
            break;
        }
        if !line.starts_with('#') {
            return None;
        }
    }

    let mut doc = FlowDoc {
        description: String::new(),
        inputs: Vec::new(),
        outputs: Vec::new(),
        span: Span::new(
            lines.line_start(opening)?,
            lines.line_end(text, closing)?,
        ),
    };
    let mut description: Vec<&str> = Vec::new();
    let mut section = Section::Description;

    for line_no in opening + 1..closing {
        let start = lines.line_start(line_no)?;
        let line = line_text(text, lines, line_no)?;
        let Some(hash) = line.find('#') else {
            continue;
        };
        let body = &line[hash + 1..];
        let body_offset = start + hash + 1;

        match body.trim() {
            "in:" => section = Section::In,
            "out:" => section = Section::Out,
            "" => {}
            content if section == Section::Description => description.push(content),
            _ => {
                let Some(param) = parse_param(body, body_offset) else {
                    continue;
                };
                match section {
                    Section::In => doc.inputs.push(param),
                    Section::Out => doc.outputs.push(param),
                    Section::Description => {}
                }
            }
        }
    }

    doc.description = description.join("\n");
    Some(doc)
}

fn parse_param(body: &str, offset: usize) -> Option<FlowParam> {
    let caps = PARAM_RE.captures(body)?;
    let name = caps.get(1)?;
    let requirement = caps.get(3).map(|m| m.as_str().to_lowercase());

    Some(FlowParam {
        name: name.as_str().to_string(),
        name_span: Span::new(offset + name.start(), offset + name.end()),
        type_name: caps.get(2).map(|m| m.as_str()).unwrap_or("any").to_string(),
        mandatory: matches!(requirement.as_deref(), Some("mandatory" | "required")),
        description: caps
            .get(4)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    })
}

fn line_text<'t>(text: &'t str, lines: &LineIndex, line: usize) -> Option<&'t str> {
    let start = lines.line_start(line)?;
    let end = lines.line_end(text, line)?;
    Some(&text[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOW: &str = "flows:\n  ##\n  # Process S3 files\n  # and more\n  # in:\n  #   s3Bucket: string, mandatory, S3 bucket name\n  #   files: string[], optional\n  # out:\n  #   processed: int, mandatory, Files processed count\n  ##\n  processS3:\n    - task: s3\n";

    #[test]
    fn test_parse_documentation_block() {
        let lines = LineIndex::new(FLOW);
        let doc = parse_above(FLOW, &lines, 11).unwrap();

        assert_eq!(doc.description, "Process S3 files\nand more");
        assert_eq!(doc.inputs.len(), 2);
        assert_eq!(doc.outputs.len(), 1);

        let bucket = &doc.inputs[0];
        assert_eq!(bucket.name, "s3Bucket");
        assert_eq!(bucket.type_name, "string");
        assert!(bucket.mandatory);
        assert_eq!(bucket.description, "S3 bucket name");
        assert_eq!(&FLOW[bucket.name_span.start..bucket.name_span.end], "s3Bucket");

        assert_eq!(doc.inputs[1].type_hint(), TypeHint::Collection);
        assert!(!doc.inputs[1].mandatory);
    }

    #[test]
    fn test_no_block_without_marker() {
        let text = "flows:\n  # just a comment\n  main:\n    - log: hi\n";
        let lines = LineIndex::new(text);
        assert!(parse_above(text, &lines, 3).is_none());
    }
}
