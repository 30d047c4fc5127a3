use crate::action::Action;
use crate::builder::GraphBuilder;
use crate::settings::NumericPolicy;
use crate::TraceError;

/// A replay failure, pointing at the offending action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("action {index} ({name}): {source}")]
pub struct ReplayError {
    pub index: usize,
    pub name: &'static str,
    #[source]
    pub source: TraceError,
}

/// Rebuild a graph from an action log.
///
/// The log must begin with a `Start` action. A later `Start` opens another partial trace;
/// each partial trace is built on its own and united into the first in log order, which is
/// exactly the shape [`GraphBuilder::unite_with`] leaves behind. Recorded sub-operation
/// traces are ignored; they are recomputed from the operation strings.
pub fn replay(actions: &[Action], policy: NumericPolicy) -> Result<GraphBuilder, ReplayError> {
    let mut parts: Vec<GraphBuilder> = Vec::new();

    for (index, action) in actions.iter().enumerate() {
        let fail = |source: TraceError| ReplayError {
            index,
            name: action.name(),
            source,
        };

        if let Action::Start { state, target } = action {
            if let Some(first) = parts.first() {
                if first.start_state() != state {
                    return Err(fail(TraceError::StartStateMismatch {
                        left: first.start_state().clone(),
                        right: state.clone(),
                    }));
                }
            }
            parts.push(GraphBuilder::start_with_policy(state, target, policy));
            continue;
        }

        let graph = parts
            .last_mut()
            .ok_or_else(|| fail(TraceError::MissingStart))?;
        apply(graph, action).map_err(fail)?;
    }

    let mut parts = parts.into_iter();
    let mut merged = parts.next().ok_or(ReplayError {
        index: 0,
        name: "start",
        source: TraceError::MissingStart,
    })?;
    for part in parts {
        merged.unite_with(&part).map_err(|source| ReplayError {
            index: 0,
            name: "start",
            source,
        })?;
    }
    Ok(merged)
}

fn apply(graph: &mut GraphBuilder, action: &Action) -> Result<(), TraceError> {
    match action {
        // Handled by `replay`, which opens a new partial trace.
        Action::Start { .. } => {}
        Action::ExploreOperation {
            curr_state,
            operation,
            resulting_state,
            result_calc_error,
            comment,
            ..
        } => {
            graph.explore_operation(
                curr_state,
                operation,
                resulting_state,
                *result_calc_error,
                comment.as_deref(),
            )?;
        }
        Action::MoveToNode { new_state } => {
            graph.move_to_node(new_state)?;
        }
        Action::SetSubgoal {
            subgoal_state,
            state_after_subgoal,
            comment,
        } => {
            graph.set_subgoal(subgoal_state, state_after_subgoal, comment.as_deref());
        }
    }
    Ok(())
}
