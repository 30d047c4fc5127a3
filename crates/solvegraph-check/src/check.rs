use solvegraph_expr::{
    evaluate, split_operation, tokenize, ExprError, Number, Operation, Token,
};
use solvegraph_trace::{Action, GraphBuilder, NumericPolicy, State};

use crate::problem::{ActionDiagnostics, Problem, RunnabilityHint};

/// Validate every action of a builder's log under the builder's numeric policy.
pub fn check_graph(graph: &GraphBuilder) -> Vec<ActionDiagnostics> {
    check_actions(graph.actions(), graph.policy())
}

/// Validate an action log in one forward pass.
///
/// Only actions with at least one problem are reported; an empty result means the log is
/// accepted.
pub fn check_actions(actions: &[Action], policy: NumericPolicy) -> Vec<ActionDiagnostics> {
    let mut start_state: Option<&State> = None;
    let mut recent_state: Option<&State> = None;
    let mut diagnostics = Vec::new();

    for (index, action) in actions.iter().enumerate() {
        let problems = match action {
            Action::Start { state, .. } => {
                start_state.get_or_insert(state);
                Vec::new()
            }
            Action::MoveToNode { .. } => Vec::new(),
            Action::ExploreOperation {
                curr_state,
                operation,
                resulting_state,
                result_calc_error,
                ..
            } => {
                let problem = check_operation(
                    curr_state,
                    operation,
                    resulting_state,
                    *result_calc_error,
                    Context {
                        start_state,
                        recent_state,
                        policy,
                    },
                );
                recent_state = Some(resulting_state);
                problem.into_iter().collect()
            }
            Action::SetSubgoal {
                subgoal_state,
                state_after_subgoal,
                ..
            } => check_subgoal(subgoal_state, state_after_subgoal)
                .into_iter()
                .collect(),
        };

        if !problems.is_empty() {
            log::debug!(
                "action {index} ({}): {} problem(s)",
                action.name(),
                problems.len()
            );
            diagnostics.push(ActionDiagnostics {
                index,
                action: action.to_string(),
                problems,
            });
        }
    }
    diagnostics
}

#[derive(Clone, Copy)]
struct Context<'a> {
    start_state: Option<&'a State>,
    recent_state: Option<&'a State>,
    policy: NumericPolicy,
}

/// Checks run in order and stop at the first failure.
fn check_operation(
    curr_state: &State,
    operation: &str,
    resulting_state: &State,
    result_calc_error: bool,
    cx: Context<'_>,
) -> Option<Problem> {
    let parsed = match well_formed(operation) {
        Ok(parsed) => parsed,
        Err(message) => {
            return Some(Problem::Formatting {
                operation: operation.to_string(),
                message,
            })
        }
    };

    let operands = parsed.operands();
    let missing = curr_state.missing(&operands, cx.policy.decimals);
    if !missing.is_empty() {
        let decimals = cx.policy.decimals;
        let hint = match (cx.start_state, cx.recent_state) {
            (Some(start), _) if start.contains_all(&operands, decimals) => {
                RunnabilityHint::MoveToStart {
                    start_state: start.clone(),
                }
            }
            (_, Some(recent)) if recent.contains_all(&operands, decimals) => {
                RunnabilityHint::MoveToRecent {
                    recent_state: recent.clone(),
                }
            }
            (start, recent) => RunnabilityHint::Invented {
                start_state: start.cloned(),
                recent_state: recent.cloned(),
            },
        };
        return Some(Problem::Runnability {
            operation: operation.to_string(),
            curr_state: curr_state.clone(),
            missing,
            hint,
        });
    }

    // `well_formed` already evaluated the expression, so this cannot fail.
    let (correct_state, correct_operation) =
        get_resulting_state(curr_state, operation, result_calc_error, cx.policy).ok()?;
    if correct_state.matches(resulting_state, cx.policy.decimals) {
        return None;
    }
    Some(Problem::ResultingState {
        operation: operation.to_string(),
        curr_state: curr_state.clone(),
        resulting_state: resulting_state.clone(),
        correct_state,
        correct_operation,
    })
}

fn invalid_number(found: &str, operation: &str) -> String {
    format!(
        "All operations must consist of valid numbers. Found {found} in operation {operation}. Please make sure all the numbers in the operation field of explore_operation are valid integers or floats."
    )
}

/// Parse `operation`, or explain why it is not a well-formed `"<expr>=<result>"` string.
fn well_formed(operation: &str) -> Result<Operation, String> {
    if operation.matches('=').count() != 1 {
        return Err("The operation does not contain exactly one '='.".to_string());
    }
    let (lhs, rhs) = split_operation(operation).map_err(|err| err.to_string())?;

    let tokens = match tokenize(lhs) {
        Ok(tokens) => tokens,
        Err(ExprError::Tokenize { offset, .. }) => {
            let found: String = lhs[offset..]
                .chars()
                .take_while(|c| !c.is_whitespace() && !"+-*/()".contains(*c))
                .collect();
            return Err(invalid_number(&found, operation));
        }
        Err(err) => return Err(format!("{err}.")),
    };
    if let Some(Token::Literal(text)) = tokens
        .iter()
        .find(|token| matches!(token, Token::Literal(_)) && token.as_number().is_none())
    {
        return Err(invalid_number(text, operation));
    }
    if Number::parse_literal(rhs.trim()).is_none() {
        return Err(format!(
            "The result {} is not a valid number.",
            rhs.trim()
        ));
    }

    let evaluation = evaluate(&tokens).map_err(|err| {
        format!("The left-hand side {} cannot be evaluated: {err}.", lhs.trim())
    })?;
    if evaluation.sub_operations.is_empty() {
        return Err(format!(
            "The left-hand side {} does not apply any operator.",
            lhs.trim()
        ));
    }

    Operation::parse(operation).map_err(|err| err.to_string())
}

/// The state and operation string a solver should have produced.
///
/// Each numeric operand is removed from `curr_state` once (operands that are not present
/// are skipped), and the result is added rounded to the policy precision: the stated result
/// when `result_calc_error` is set, the evaluated one otherwise.
pub fn get_resulting_state(
    curr_state: &State,
    operation: &str,
    result_calc_error: bool,
    policy: NumericPolicy,
) -> Result<(State, String), ExprError> {
    let parsed = Operation::parse(operation)?;
    let evaluation = parsed.evaluate()?;
    let result = if result_calc_error {
        parsed.stated_result
    } else {
        evaluation.value
    };
    let result = result.round_to(policy.decimals);

    let state = curr_state
        .without(&parsed.operands(), policy.decimals)
        .with(result);
    Ok((state, format!("{}={result}", parsed.expression)))
}

fn check_subgoal(subgoal_state: &State, state_after_subgoal: &State) -> Option<Problem> {
    let message = [
        ("subgoal_state", subgoal_state),
        ("state_after_subgoal", state_after_subgoal),
    ]
    .into_iter()
    .find_map(|(name, state)| {
        if state.is_empty() {
            Some(format!(
                "{name} must contain at least one number, e.g. {{'subgoal_state': (x, y), 'state_after_subgoal': (24,)}}."
            ))
        } else if !state.iter().all(|n| n.is_finite()) {
            Some(format!("{name} {state} contains a non-finite number."))
        } else {
            None
        }
    })?;
    Some(Problem::Subgoal {
        subgoal_state: subgoal_state.clone(),
        message,
    })
}
