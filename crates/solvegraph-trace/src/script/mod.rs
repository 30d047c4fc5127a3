//! Interpreter for trace scripts.
//!
//! A trace script is a short Python-flavoured program that drives a single graph through
//! the four primitive calls:
//!
//! ```text
//! curr_state = (3, 4, 9, 9)
//! graph = GraphBuilder(curr_state)
//! new_state = graph.explore_operation(curr_state, operation="9-3=6",
//!     resulting_state=(4, 6, 9), comment="nine minus three")
//! curr_state = graph.move_to_node(new_state)
//! graph.set_subgoal((4, 6), comment="four times six")
//! ```
//!
//! Only assignments, tuple/list literals, variables, `GraphBuilder(...)` and the builder
//! methods are understood. Anything else is rejected with the line it appeared on; no host
//! code is ever run.

mod interp;
mod lexer;

use crate::builder::GraphBuilder;
use crate::settings::TraceSettings;
use crate::TraceError;

pub use self::interp::Interpreter;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct ScriptError {
    pub line: usize,
    #[source]
    pub kind: ScriptErrorKind,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ScriptErrorKind {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("expected {expected}, found {found}")]
    Syntax { expected: String, found: String },

    #[error("name {0:?} is not defined")]
    UndefinedVariable(String),

    #[error("unsupported call {0:?}")]
    UnknownFunction(String),

    #[error("GraphBuilder has no method {0:?}")]
    UnknownMethod(String),

    #[error("{0:?} is not a GraphBuilder")]
    NotAGraph(String),

    #[error("{call}() got an unexpected argument {name:?}")]
    UnexpectedArgument { call: &'static str, name: String },

    #[error("{call}() got multiple values for argument {name:?}")]
    DuplicateArgument { call: &'static str, name: String },

    #[error("{call}() missing required argument {name:?}")]
    MissingArgument { call: &'static str, name: &'static str },

    #[error("{call}() takes at most {max} positional argument(s)")]
    TooManyArguments { call: &'static str, max: usize },

    #[error("expected {expected}, found {found}")]
    Type { expected: &'static str, found: String },

    #[error("a GraphBuilder was already created")]
    GraphAlreadyCreated,

    #[error("no GraphBuilder has been created")]
    NoGraph,

    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// Strip the wrapping a model response usually carries around a script.
///
/// Only the text between the first `</think>` and the next one (or the end) is kept, and
/// Markdown fence lines are blanked so line numbers in errors still point into the remaining
/// text.
pub fn preprocess(source: &str) -> String {
    let body = source.split("</think>").nth(1).unwrap_or(source);
    body.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Preprocess and run `source`, returning the graph it built.
pub fn run_script(source: &str, settings: &TraceSettings) -> Result<GraphBuilder, ScriptError> {
    let mut interpreter = Interpreter::new(settings);
    interpreter.run(&preprocess(source))?;
    interpreter.into_graph()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn preprocess_drops_reasoning_and_fences() {
        let src = "<think>\nlet me try 6*4\n</think>\n```python\ngraph = GraphBuilder((1, 2))\n```\n";
        assert_eq!(preprocess(src), "\n\ngraph = GraphBuilder((1, 2))\n");
    }

    #[test]
    fn preprocess_keeps_the_text_after_the_first_closing_tag() {
        let src = "<think>a</think>\nx = (1, 2)\n</think>\ny = (3, 4)\n";
        assert_eq!(preprocess(src), "\nx = (1, 2)");
        assert_eq!(preprocess("x = (1, 2)</think>"), "");
    }

    #[test]
    fn preprocess_keeps_plain_scripts() {
        let src = "graph = GraphBuilder((1, 2))\ngraph.move_to_node((1, 2))";
        assert_eq!(preprocess(src), src);
    }
}
