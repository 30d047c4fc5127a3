//! Trace graphs of step-by-step numeric problem solving.
//!
//! A [`GraphBuilder`] turns the four primitive solver actions into a deduplicated,
//! timestamped graph of [`State`]s plus an append-only [`Action`] log. Logs can be replayed
//! ([`replay`]), traces written as scripts can be interpreted ([`script`]), and finished
//! graphs can be summarized ([`metrics`]) or compared ([`compare`]).

mod action;
mod builder;
mod graph;
mod replay;
mod settings;
mod state;

pub mod compare;
pub mod metrics;
pub mod script;

pub use crate::action::Action;
pub use crate::builder::{unite, GraphBuilder};
pub use crate::graph::{Edge, EdgeKind, GraphSnapshot, Node, SUBGOAL_LABEL};
pub use crate::replay::{replay, ReplayError};
pub use crate::settings::{NumericPolicy, TraceSettings};
pub use crate::state::{canonicalize, State};

use solvegraph_expr::ExprError;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error("operation {0:?} does not apply any operator")]
    NoOperation(String),

    #[error("state {0} is not in the graph")]
    UnknownState(State),

    #[error("cannot unite graphs with different start states: {left} vs {right}")]
    StartStateMismatch { left: State, right: State },

    #[error("action log does not begin with a start action")]
    MissingStart,
}
