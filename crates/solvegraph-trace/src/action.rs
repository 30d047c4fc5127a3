use std::fmt;

use serde::{Deserialize, Serialize};
use solvegraph_expr::SubOperation;

use crate::state::State;

/// One logged primitive call. The action log is the authoritative replay record of a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Start {
        state: State,
        target: State,
    },
    ExploreOperation {
        curr_state: State,
        operation: String,
        resulting_state: State,
        #[serde(default)]
        result_calc_error: bool,
        #[serde(default)]
        comment: Option<String>,
        /// Decomposition of the operation's left-hand side, in application order.
        #[serde(default)]
        sub_operations: Vec<SubOperation>,
    },
    MoveToNode {
        new_state: State,
    },
    SetSubgoal {
        subgoal_state: State,
        state_after_subgoal: State,
        #[serde(default)]
        comment: Option<String>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Start { .. } => "start",
            Action::ExploreOperation { .. } => "explore_operation",
            Action::MoveToNode { .. } => "move_to_node",
            Action::SetSubgoal { .. } => "set_subgoal",
        }
    }
}

/// Renders the action as the call that produced it, e.g.
/// `explore_operation(curr_state=(1, 2, 3, 4), operation="1+2=3", resulting_state=(3, 3, 4))`.
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start { state, target } => {
                write!(f, "start(state={state}, target={target})")
            }
            Action::ExploreOperation {
                curr_state,
                operation,
                resulting_state,
                result_calc_error,
                comment,
                ..
            } => {
                write!(
                    f,
                    "explore_operation(curr_state={curr_state}, operation={operation:?}, resulting_state={resulting_state}"
                )?;
                if *result_calc_error {
                    f.write_str(", result_calc_error=True")?;
                }
                if let Some(comment) = comment {
                    write!(f, ", comment={comment:?}")?;
                }
                f.write_str(")")
            }
            Action::MoveToNode { new_state } => write!(f, "move_to_node(new_state={new_state})"),
            Action::SetSubgoal {
                subgoal_state,
                state_after_subgoal,
                comment,
            } => {
                write!(
                    f,
                    "set_subgoal(subgoal_state={subgoal_state}, state_after_subgoal={state_after_subgoal}"
                )?;
                if let Some(comment) = comment {
                    write!(f, ", comment={comment:?}")?;
                }
                f.write_str(")")
            }
        }
    }
}
