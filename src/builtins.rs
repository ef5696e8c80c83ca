//! Variables and functions every Concord process gets from the runtime.

use once_cell::sync::Lazy;

use crate::schema::{Shape, TypeHint};
use crate::symbol::{Symbol, SymbolOrigin};

fn prop(name: &str, type_hint: TypeHint, doc: &str) -> Symbol {
    Symbol::builtin(name, type_hint, doc)
}

fn user_shape() -> Shape {
    Shape::object([
        prop("username", TypeHint::String, "Login name"),
        prop("displayName", TypeHint::String, "Display name"),
        prop("email", TypeHint::String, "Email address"),
        prop("groups", TypeHint::Collection, "Groups the user belongs to"),
        prop("attributes", TypeHint::Map, "Additional user attributes"),
    ])
}

fn context_shape() -> Shape {
    Shape::object([
        prop("variables", TypeHint::Object, "Process variables"),
        prop("workingDirectory", TypeHint::String, "Working directory of the process"),
        prop("processInstanceId", TypeHint::String, "ID of the current process instance"),
        prop("defaultVariables", TypeHint::Object, "Default variables of the process"),
        prop("processConfiguration", TypeHint::Object, "Effective process configuration"),
        prop("currentFlowName", TypeHint::String, "Name of the flow being executed"),
        prop("eval", TypeHint::Unknown, "Evaluates an expression: eval(expression, type)"),
        prop("getVariable", TypeHint::Unknown, "Returns a variable value: getVariable(name)"),
        prop("setVariable", TypeHint::Unknown, "Sets a variable: setVariable(name, value)"),
        prop("suspend", TypeHint::Unknown, "Suspends the process until an event: suspend(eventName)"),
    ])
}

fn object(name: &str, doc: &str, shape: Shape) -> Symbol {
    Symbol::builtin(name, TypeHint::Object, doc).with_shape(shape)
}

static VARIABLES: Lazy<Vec<Symbol>> = Lazy::new(|| {
    vec![
        Symbol::builtin("txId", TypeHint::String, "Unique identifier of the current process instance"),
        Symbol::builtin("parentInstanceId", TypeHint::String, "Identifier of the parent process instance, if any"),
        Symbol::builtin("workDir", TypeHint::String, "Absolute path to the process working directory"),
        object("initiator", "User who started the process", user_shape()),
        object("currentUser", "User who triggered the current part of the process", user_shape()),
        Symbol::builtin("requestInfo", TypeHint::Object, "Parameters of the request that started the process"),
        object(
            "projectInfo",
            "Project and repository the process belongs to",
            Shape::object([
                prop("orgId", TypeHint::String, "Organization ID"),
                prop("orgName", TypeHint::String, "Organization name"),
                prop("projectId", TypeHint::String, "Project ID"),
                prop("projectName", TypeHint::String, "Project name"),
                prop("repoId", TypeHint::String, "Repository ID"),
                prop("repoName", TypeHint::String, "Repository name"),
                prop("repoUrl", TypeHint::String, "Repository URL"),
                prop("repoBranch", TypeHint::String, "Repository branch"),
                prop("repoPath", TypeHint::String, "Path inside the repository"),
                prop("repoCommitId", TypeHint::String, "Commit ID"),
                prop("repoCommitAuthor", TypeHint::String, "Commit author"),
                prop("repoCommitMessage", TypeHint::String, "Commit message"),
            ]),
        ),
        object(
            "processInfo",
            "Information about the running process",
            Shape::object([
                prop("activeProfiles", TypeHint::Collection, "Profiles the process runs with"),
                prop("sessionToken", TypeHint::String, "Session token of the process"),
            ]),
        ),
        object("context", "Process context", context_shape()),
        object("execution", "Process context (legacy name)", context_shape()),
        Symbol::builtin("tasks", TypeHint::Object, "Registry of available tasks"),
        object(
            "log",
            "Process log",
            Shape::object([
                prop("info", TypeHint::Unknown, "Logs a message at INFO level"),
                prop("warn", TypeHint::Unknown, "Logs a message at WARN level"),
                prop("error", TypeHint::Unknown, "Logs a message at ERROR level"),
                prop("debug", TypeHint::Unknown, "Logs a message at DEBUG level"),
            ]),
        ),
    ]
});

static LOOP_VARIABLES: Lazy<Vec<Symbol>> = Lazy::new(|| {
    vec![
        Symbol::builtin("item", TypeHint::Unknown, "Current element of the loop")
            .with_origin(SymbolOrigin::Loop),
        Symbol::builtin("itemIndex", TypeHint::Int, "Index of the current element, starting at 0")
            .with_origin(SymbolOrigin::Loop),
    ]
});

static TASK_RESULT: Lazy<Symbol> = Lazy::new(|| {
    Symbol::builtin("result", TypeHint::Object, "Result of the task call")
        .with_origin(SymbolOrigin::TaskResult)
        .with_shape(Shape::object([
            prop("ok", TypeHint::Boolean, "Whether the task succeeded"),
            prop("error", TypeHint::String, "Error message when the task failed"),
        ]))
});

struct FunctionDef {
    name: &'static str,
    returns: TypeHint,
    params: &'static [(&'static str, &'static str)],
    description: &'static str,
}

const FUNCTION_DEFS: &[FunctionDef] = &[
    FunctionDef {
        name: "allVariables",
        returns: TypeHint::Object,
        params: &[],
        description: "Returns all process variables as a map",
    },
    FunctionDef {
        name: "hasVariable",
        returns: TypeHint::Boolean,
        params: &[("variableName", "string")],
        description: "Checks whether a variable is defined",
    },
    FunctionDef {
        name: "hasNonNullVariable",
        returns: TypeHint::Boolean,
        params: &[("variableName", "string")],
        description: "Checks whether a variable is defined and not null",
    },
    FunctionDef {
        name: "currentFlowName",
        returns: TypeHint::String,
        params: &[],
        description: "Returns the name of the flow being executed",
    },
    FunctionDef {
        name: "evalAsMap",
        returns: TypeHint::Object,
        params: &[("value", "any")],
        description: "Evaluates every expression in the value and returns the result as a map",
    },
    FunctionDef {
        name: "hasFlow",
        returns: TypeHint::Boolean,
        params: &[("name", "string")],
        description: "Checks whether a flow with the given name exists",
    },
    FunctionDef {
        name: "isDebug",
        returns: TypeHint::Boolean,
        params: &[],
        description: "Returns true when the process runs in debug mode",
    },
    FunctionDef {
        name: "isDryRun",
        returns: TypeHint::Boolean,
        params: &[],
        description: "Returns true when the process runs in dry-run mode",
    },
    FunctionDef {
        name: "orDefault",
        returns: TypeHint::Unknown,
        params: &[("name", "string"), ("defaultValue", "any")],
        description: "Returns the variable value, or the default when it is undefined",
    },
    FunctionDef {
        name: "throw",
        returns: TypeHint::Unknown,
        params: &[("message", "string")],
        description: "Fails the process with the given message",
    },
    FunctionDef {
        name: "uuid",
        returns: TypeHint::String,
        params: &[],
        description: "Generates a random UUID",
    },
];

static FUNCTIONS: Lazy<Vec<Symbol>> = Lazy::new(|| {
    FUNCTION_DEFS
        .iter()
        .map(|def| {
            let params: Vec<String> = def
                .params
                .iter()
                .map(|(name, ty)| format!("{}: {}", name, ty))
                .collect();
            let doc = format!(
                "{}({}): {}\n\n{}",
                def.name,
                params.join(", "),
                def.returns,
                def.description
            );
            Symbol::builtin(def.name, def.returns, &doc).with_origin(SymbolOrigin::BuiltinFunction)
        })
        .collect()
});

/// Built-in process variables.
pub fn variables() -> &'static [Symbol] {
    &VARIABLES
}

pub fn variable(name: &str) -> Option<&'static Symbol> {
    VARIABLES.iter().find(|s| s.name == name)
}

/// `item` and `itemIndex`, visible inside steps with `loop:` or `withItems:`.
pub fn loop_variables() -> &'static [Symbol] {
    &LOOP_VARIABLES
}

/// `result`, visible inside a task step's `out:` block.
pub fn task_result() -> &'static Symbol {
    &TASK_RESULT
}

/// Built-in EL functions, callable without a target.
pub fn functions() -> &'static [Symbol] {
    &FUNCTIONS
}

pub fn function(name: &str) -> Option<&'static Symbol> {
    FUNCTIONS.iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_documentation_has_signature() {
        let f = function("orDefault").map(|s| s.documentation.clone());
        assert_eq!(
            f.flatten().as_deref().and_then(|d| d.lines().next()),
            Some("orDefault(name: string, defaultValue: any): unknown")
        );
    }

    #[test]
    fn test_context_has_working_directory() {
        let context = variable("context").and_then(|s| s.shape.as_ref());
        assert!(context.is_some_and(|shape| !shape.lookup("workingDirectory").is_empty()));
    }
}
