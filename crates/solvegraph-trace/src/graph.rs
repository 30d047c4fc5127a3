use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::state::State;

/// Label carried by subgoal edges in place of an operation string.
pub const SUBGOAL_LABEL: &str = "subgoal";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub state: State,
    /// Node-visitation timesteps at which the solver was at this state. Empty for the target
    /// and for subgoal states that were never reached.
    pub visitation_timesteps: Vec<usize>,
    pub initialized_as_subgoal: bool,
}

impl Node {
    pub(crate) fn new(state: State, visitation_timesteps: Vec<usize>) -> Self {
        Self {
            state,
            visitation_timesteps,
            initialized_as_subgoal: false,
        }
    }

    pub fn is_visited(&self) -> bool {
        !self.visitation_timesteps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeKind {
    /// A forward arithmetic step labelled `l<op>r=result`.
    Operation { operation: String, is_correct: bool },
    /// A backward edge from the state a solver works back from to the subgoal it set.
    Subgoal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub source: State,
    pub destination: State,
    #[serde(flatten)]
    pub kind: EdgeKind,
    pub op_timesteps: Vec<usize>,
    /// One entry per op timestep.
    pub comments: Vec<Option<String>>,
}

impl Edge {
    pub fn operation(&self) -> &str {
        match &self.kind {
            EdgeKind::Operation { operation, .. } => operation,
            EdgeKind::Subgoal => SUBGOAL_LABEL,
        }
    }

    pub fn is_subgoal(&self) -> bool {
        matches!(self.kind, EdgeKind::Subgoal)
    }

    /// Arithmetic correctness. Subgoal edges are not arithmetic and always report `true`.
    pub fn is_correct(&self) -> bool {
        match self.kind {
            EdgeKind::Operation { is_correct, .. } => is_correct,
            EdgeKind::Subgoal => true,
        }
    }

    pub fn visits(&self) -> usize {
        self.op_timesteps.len()
    }
}

/// Serializable read-only view of a trace graph.
#[derive(Debug, Serialize)]
pub struct GraphSnapshot<'a> {
    pub start_state: &'a State,
    pub target_state: &'a State,
    pub node_visitation_timestep: usize,
    pub op_timestep: usize,
    pub nodes: Vec<&'a Node>,
    pub edges: Vec<&'a Edge>,
    pub actions: &'a [Action],
}
