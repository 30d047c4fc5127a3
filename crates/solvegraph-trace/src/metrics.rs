//! Summary statistics over a finished trace graph.

use serde::Serialize;

use crate::builder::GraphBuilder;
use crate::state::State;

/// Whether any edge enters the target state.
pub fn reached_goal(graph: &GraphBuilder) -> bool {
    graph.in_degree(graph.target_state()) > 0
}

/// Mean out-degree over all nodes.
pub fn mean_branching_factor(graph: &GraphBuilder) -> f64 {
    mean_over_nodes(graph, |state| graph.out_degree(state))
}

/// Mean of in-degree plus out-degree over all nodes.
pub fn mean_degree(graph: &GraphBuilder) -> f64 {
    mean_over_nodes(graph, |state| {
        graph.in_degree(state) + graph.out_degree(state)
    })
}

pub fn n_subgoals(graph: &GraphBuilder) -> usize {
    graph.edges().filter(|edge| edge.is_subgoal()).count()
}

pub fn n_nodes(graph: &GraphBuilder) -> usize {
    graph.node_count()
}

pub fn n_edges(graph: &GraphBuilder) -> usize {
    graph.edge_count()
}

// A builder always holds at least the start node, so the division is well defined.
fn mean_over_nodes<F>(graph: &GraphBuilder, degree: F) -> f64
where
    F: Fn(&State) -> usize,
{
    let total: usize = graph.nodes().map(|node| degree(&node.state)).sum();
    total as f64 / graph.node_count() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphMetrics {
    pub reached_goal: bool,
    pub mean_branching_factor: f64,
    pub mean_degree: f64,
    pub n_subgoals: usize,
    pub n_nodes: usize,
    pub n_edges: usize,
}

impl GraphMetrics {
    pub fn compute(graph: &GraphBuilder) -> Self {
        Self {
            reached_goal: reached_goal(graph),
            mean_branching_factor: mean_branching_factor(graph),
            mean_degree: mean_degree(graph),
            n_subgoals: n_subgoals(graph),
            n_nodes: n_nodes(graph),
            n_edges: n_edges(graph),
        }
    }
}
