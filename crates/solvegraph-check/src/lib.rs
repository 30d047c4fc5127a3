//! Validation of trace action logs.
//!
//! The checker replays a log in one forward pass and reports, per action, whether the
//! operation string is well formed, whether its operands are available in the state it is
//! applied to, and whether the stated resulting state follows from it. Findings are plain
//! data ([`Problem`]); rendering them for a correction loop is left to
//! [`render_problems`].

mod check;
mod problem;

pub use crate::check::{check_actions, check_graph, get_resulting_state};
pub use crate::problem::{render_problems, ActionDiagnostics, Problem, RunnabilityHint};
