//! Documentation content for the concord-el CLI

use super::CliError;
use crate::builtins;
use crate::output::format_symbol;
use crate::symbol::Symbol;

/// Available documentation topics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocTopic {
    Syntax,
    Operators,
    Variables,
    Functions,
    Scopes,
    FlowDocs,
}

impl DocTopic {
    /// Parse topic name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "syntax" => Some(Self::Syntax),
            "operators" | "ops" => Some(Self::Operators),
            "variables" | "vars" | "builtins" => Some(Self::Variables),
            "functions" | "fns" => Some(Self::Functions),
            "scopes" | "scope" => Some(Self::Scopes),
            "flow_docs" | "flowdocs" | "flow_doc" => Some(Self::FlowDocs),
            _ => None,
        }
    }
}

/// Get the docs overview (topic listing)
pub fn get_docs_overview() -> &'static str {
    r#"CONCORD EL DOCUMENTATION

Concord workflow files embed expressions in YAML values using ${...}. The
expressions can read process variables, built-in objects and flow
parameters, and call built-in functions.

DOCUMENTATION TOPICS

  syntax            Literals, property access, index access, calls, lambdas
  operators         Arithmetic, comparison, logical and keyword operators
  variables         Built-in variables and their properties
  functions         Built-in functions
  scopes            Which variables are visible where
  flow-docs         Documenting flow parameters with ## comments

Run 'concord-el docs <topic>' for a topic, or 'concord-el docs <name>' for a
single built-in variable or function.
"#
}

/// Get documentation for a topic, a built-in variable or a built-in function
pub fn get_doc_topic(name: &str) -> Result<String, CliError> {
    match DocTopic::from_name(name) {
        Some(DocTopic::Syntax) => Ok(SYNTAX_DOC.to_string()),
        Some(DocTopic::Operators) => Ok(OPERATORS_DOC.to_string()),
        Some(DocTopic::Variables) => Ok(list_symbols("BUILT-IN VARIABLES", builtins::variables())),
        Some(DocTopic::Functions) => Ok(list_symbols("BUILT-IN FUNCTIONS", builtins::functions())),
        Some(DocTopic::Scopes) => Ok(SCOPES_DOC.to_string()),
        Some(DocTopic::FlowDocs) => Ok(FLOW_DOCS_DOC.to_string()),
        None => builtins::variable(name)
            .or_else(|| builtins::function(name))
            .map(describe_symbol)
            .ok_or_else(|| CliError::UnknownTopic(name.to_string())),
    }
}

fn list_symbols(title: &str, symbols: &[Symbol]) -> String {
    let mut out = format!("{}\n\n", title);
    for symbol in symbols {
        out.push_str("  ");
        out.push_str(&format_symbol(symbol));
        out.push('\n');
    }
    out
}

fn describe_symbol(symbol: &Symbol) -> String {
    let mut out = format!("{}: {}\n", symbol.name, symbol.type_hint);
    if let Some(doc) = &symbol.documentation {
        out.push('\n');
        for line in doc.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }
    if let Some(shape) = &symbol.shape {
        out.push_str("\nPROPERTIES\n");
        for property in shape.properties() {
            out.push_str("  ");
            out.push_str(&format_symbol(property));
            out.push('\n');
        }
    }
    out
}

const SYNTAX_DOC: &str = r#"SYNTAX - Expressions in Concord Files

EMBEDDING
  ${expression}
    Any YAML value may contain one or more expressions.

    Example:
      - log: "Started by ${initiator.username}"

LITERALS
  42  3.14  .5  1e5       Numbers
  'text'  "text"          Strings (escapes: \n \t \r \\ \' \" \$ \{)
  true  false  null       Keywords
  [1, 2, 3]               List
  {'a': 1, 'b': 2}        Map
  {1, 2}                  Set

PROPERTY ACCESS
  initiator.username
    Keywords are valid property names: obj.empty, obj.class

INDEX ACCESS
  items[0]
  headers['Content-Type']

CALLS
  uuid()
  context.getVariable('name')

LAMBDAS
  x -> x * 2
  (a, b) -> a + b

    Example:
      ${items.stream().filter(x -> x > 5).toList()}
"#;

const OPERATORS_DOC: &str = r#"OPERATORS - From Lowest to Highest Precedence

TERNARY
  cond ? a : b          Right-associative: a ? b : c ? d : e

LAMBDA
  x -> body

LOGICAL
  ||  or                Logical OR
  &&  and               Logical AND

EQUALITY
  ==  eq                Equal
  !=  ne                Not equal

RELATIONAL
  <   lt                Less than
  >   gt                Greater than
  <=  le                Less than or equal
  >=  ge                Greater than or equal
  instanceof            Type test

CONCATENATION
  +=                    String concatenation

ARITHMETIC
  +   -                 Addition, subtraction
  *   /  div  %  mod    Multiplication, division, modulo

UNARY
  -                     Negation
  !   not               Logical NOT
  empty                 True for null, "", [] and {}

POSTFIX
  .name  [index]  (args)
"#;

const SCOPES_DOC: &str = r#"SCOPES - Variable Visibility

An expression sees, from innermost to outermost:

  1. Lambda parameters of the enclosing lambdas
  2. result, inside the out: block of a task step
  3. item and itemIndex, inside a step with loop: or withItems:
  4. Variables set by earlier steps (set:, out:), walking outward through
     enclosing then/else/try/error/block/parallel bodies
  5. Input parameters from the flow's ## documentation comment
  6. configuration.arguments
  7. Built-in variables (see 'concord-el docs variables')

Inner declarations shadow outer ones with the same name.

SEQUENTIAL VISIBILITY
  A variable set by a step is visible only in later steps, never in the
  step itself or earlier ones.

    Example:
      - log: ${x}          # x is not visible yet
      - set:
          x: 1
      - log: ${x}          # x is visible

BRANCHES
  Variables set inside then/else, try/error or switch cases of an earlier
  step are visible afterwards. When several branches set the same variable,
  its properties are the union of what each branch declares.

DOTTED NAMES
  set:
    config.db.host: localhost
  declares config with property db, which has property host.
"#;

const FLOW_DOCS_DOC: &str = r#"FLOW DOCS - Documenting Flow Parameters

A ## comment block right above a flow key declares its inputs and outputs:

  flows:
    ##
    # Process S3 files
    # in:
    #   s3Bucket: string, mandatory, S3 bucket name
    #   files: string[], optional, Files to process
    #   config.region: string, optional, AWS region
    # out:
    #   processed: int, mandatory, Files processed count
    ##
    processS3:
      - log: ${s3Bucket}

PARAMETER LINES
  name: type[, mandatory|optional][, description]

TYPES
  string  int  number  boolean  object  map  any  and arrays such as string[]

  Input parameters are visible in every expression of the flow. Outputs type
  the variables a call: step receives through out:.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_aliases() {
        assert_eq!(DocTopic::from_name("flow-docs"), Some(DocTopic::FlowDocs));
        assert_eq!(DocTopic::from_name("OPS"), Some(DocTopic::Operators));
        assert_eq!(DocTopic::from_name("nope"), None);
    }

    #[test]
    fn test_builtin_lookup() {
        let doc = get_doc_topic("initiator").unwrap();
        assert!(doc.starts_with("initiator: object"));
        assert!(doc.contains("username: string"));
        assert!(matches!(get_doc_topic("nope"), Err(CliError::UnknownTopic(_))));
    }
}
