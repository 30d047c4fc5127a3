use std::fmt;

use serde::Serialize;
use solvegraph_expr::Number;
use solvegraph_trace::State;

/// Where the operands of an unrunnable operation can be found instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "suggestion", rename_all = "snake_case")]
pub enum RunnabilityHint {
    /// Every operand is in the start state.
    MoveToStart { start_state: State },
    /// Every operand is in the resulting state of the most recent operation.
    MoveToRecent { recent_state: State },
    /// The operands appear nowhere the solver has been.
    Invented {
        start_state: Option<State>,
        recent_state: Option<State>,
    },
}

/// One finding about one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    Formatting {
        operation: String,
        message: String,
    },
    Runnability {
        operation: String,
        curr_state: State,
        missing: Vec<Number>,
        hint: RunnabilityHint,
    },
    ResultingState {
        operation: String,
        curr_state: State,
        resulting_state: State,
        correct_state: State,
        correct_operation: String,
    },
    Subgoal {
        subgoal_state: State,
        message: String,
    },
    /// The engine or builder rejected the action outright. Only hosts produce this.
    Execution {
        message: String,
    },
}

impl Problem {
    pub fn kind(&self) -> &'static str {
        match self {
            Problem::Formatting { .. } => "formatting",
            Problem::Runnability { .. } => "runnability",
            Problem::ResultingState { .. } => "resulting_state",
            Problem::Subgoal { .. } => "subgoal",
            Problem::Execution { .. } => "execution",
        }
    }
}

/// Operands as a tuple, in the order they were written.
struct Tuple<'a>(&'a [Number]);

impl fmt::Display for Tuple<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{n}")?;
        }
        if self.0.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}

fn write_optional(f: &mut fmt::Formatter<'_>, name: &str, state: Option<&State>) -> fmt::Result {
    match state {
        Some(state) => write!(f, "{name} {state}"),
        None => f.write_str(name),
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Formatting { operation, message } => write!(
                f,
                "PROBLEM TYPE: Operation formatting. DESCRIPTION: the operation {operation} is not well-formatted. {message}"
            ),
            Problem::Runnability {
                operation,
                curr_state,
                missing,
                hint,
            } => {
                write!(
                    f,
                    "PROBLEM TYPE: Operation runnability from curr_state. DESCRIPTION: the operation `{operation}` cannot be run from curr_state {curr_state}. You are missing the elements {} in curr_state {curr_state}",
                    Tuple(missing)
                )?;
                match hint {
                    RunnabilityHint::MoveToStart { start_state } => write!(
                        f,
                        ", but all elements needed for the operation are in the start_state {start_state}. Consider moving to start_state before running the operation from there."
                    ),
                    RunnabilityHint::MoveToRecent { recent_state } => write!(
                        f,
                        ", but all elements needed for the operation are in the new state {recent_state}. Consider moving to new_state before running the operation from there."
                    ),
                    RunnabilityHint::Invented {
                        start_state,
                        recent_state,
                    } => {
                        f.write_str(". They were not found in ")?;
                        write_optional(f, "start_state", start_state.as_ref())?;
                        f.write_str(" or ")?;
                        write_optional(f, "new_state", recent_state.as_ref())?;
                        f.write_str(
                            ". Make sure you are not inventing new elements. Consider ways the participant might have made the required numbers. Consider also that the participant might be setting a subgoal rather than exploring an operation.",
                        )
                    }
                }
            }
            Problem::ResultingState {
                operation,
                curr_state,
                resulting_state,
                correct_state,
                correct_operation,
            } => write!(
                f,
                "PROBLEM TYPE: Resulting state calculation error. DESCRIPTION: The resulting state {resulting_state} provided is not the correct resulting state for the operation {operation} from the current state {curr_state}. The correct resulting_state is {correct_state} (operation {correct_operation}). You could fix this by changing the resulting state to {correct_state}. If you think the participant made a calculation error, make sure to set result_calc_error to True. If you think the participant misspoke or there was a transcription error (e.g. saying \"2 times 1 is 3\" when they probably meant \"2 plus 1 is 3\"), consider other possible interpretations of the transcript."
            ),
            Problem::Subgoal {
                subgoal_state,
                message,
            } => write!(
                f,
                "PROBLEM TYPE: Subgoal setability. DESCRIPTION: The subgoal {subgoal_state} cannot be set. {message}"
            ),
            Problem::Execution { message } => write!(
                f,
                "PROBLEM TYPE: Execution error. DESCRIPTION: the trace could not be run: {message}"
            ),
        }
    }
}

/// Problems found for one action, addressed by its position in the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDiagnostics {
    pub index: usize,
    /// The action rendered as the call that produced it.
    pub action: String,
    pub problems: Vec<Problem>,
}

impl ActionDiagnostics {
    /// Route a failure to build the trace into the same channel as validation findings.
    pub fn execution_failure(
        index: usize,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            index,
            action: action.into(),
            problems: vec![Problem::Execution {
                message: message.into(),
            }],
        }
    }
}

/// Render diagnostics as the text block handed to a correction loop.
///
/// ```text
/// Action: explore_operation(...).
/// Problems:
/// - PROBLEM TYPE: ...
/// ```
pub fn render_problems(diagnostics: &[ActionDiagnostics]) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        out.push_str(&format!("\n\nAction: {}.\nProblems:", diagnostic.action));
        for problem in &diagnostic.problems {
            out.push_str(&format!("\n- {problem}"));
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tuple_formatting_keeps_written_order() {
        let values = [Number::from(3), Number::from(1)];
        assert_eq!(Tuple(&values).to_string(), "(3, 1)");
        assert_eq!(Tuple(&values[..1]).to_string(), "(3,)");
        assert_eq!(Tuple(&[]).to_string(), "()");
    }

    #[test]
    fn invented_hint_names_where_it_looked() {
        let problem = Problem::Runnability {
            operation: "5.5*8=44".to_string(),
            curr_state: State::from([5, 8]),
            missing: vec![Number::from(5.5)],
            hint: RunnabilityHint::Invented {
                start_state: Some(State::from([5, 8])),
                recent_state: None,
            },
        };
        let text = problem.to_string();
        assert!(text.contains("missing the elements (5.5,) in curr_state (5, 8)"));
        assert!(text.contains("They were not found in start_state (5, 8) or new_state."));
    }

    #[test]
    fn render_joins_actions_and_problems() {
        let diagnostics = vec![
            ActionDiagnostics::execution_failure(3, "move_to_node(new_state=(9, 9))", "boom"),
            ActionDiagnostics {
                index: 4,
                action: "set_subgoal(subgoal_state=(), state_after_subgoal=(24,))".to_string(),
                problems: vec![Problem::Subgoal {
                    subgoal_state: State::default(),
                    message: "empty".to_string(),
                }],
            },
        ];
        assert_eq!(
            render_problems(&diagnostics),
            "Action: move_to_node(new_state=(9, 9)).\nProblems:\n\
             - PROBLEM TYPE: Execution error. DESCRIPTION: the trace could not be run: boom\n\n\
             Action: set_subgoal(subgoal_state=(), state_after_subgoal=(24,)).\nProblems:\n\
             - PROBLEM TYPE: Subgoal setability. DESCRIPTION: The subgoal () cannot be set. empty"
        );
    }
}
